//! # Docker-Compatible CLI Dialect
//!
//! File: cli/src/common/container/cli.rs
//!
//! Docker, nerdctl and Podman accept the same verbs for everything this tool
//! needs (`container ls`, `container inspect`, `image pull`, ...). `EngineCli`
//! runs those verbs against one binary and decodes the answers; the drivers
//! add only what differs per engine (readiness, published ports, health).
//!
use super::parse::{parse_containers, parse_json_list, parse_version, Version};
use super::ports::port_mapping_flag;
use super::types::{
    Container, HealthConfig, HealthStatus, Image, ImageHealthCheck, InspectData, RunFlags,
};
use crate::common::process::CommandRunner;
use crate::core::error::{engine_output_contains, DeployError, Result};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const LOCALHOST_IP: &str = "127.0.0.1";

/// Runs Docker-dialect commands against one engine binary.
pub struct EngineCli<R> {
    runner: R,
    engine: &'static str,
    program: String,
    /// Arguments placed before every verb, e.g. `nerdctl` when running through `lima`.
    prefix: Vec<String>,
}

impl<R: CommandRunner> EngineCli<R> {
    pub fn new(runner: R, engine: &'static str, program: impl Into<String>) -> Self {
        Self {
            runner,
            engine,
            program: program.into(),
            prefix: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: Vec<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn engine(&self) -> &'static str {
        self.engine
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn run<I, S>(&self, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<String> + Send,
    {
        let mut argv = self.prefix.clone();
        argv.extend(args.into_iter().map(Into::into));
        self.runner.run(&self.program, &argv).await
    }

    pub async fn run_text<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S> + Send,
        S: Into<String> + Send,
    {
        let out = self.run(args).await?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }

    /// Queries the client version and warns when it is below `minimum`.
    pub async fn verify_version(&self, minimum: Option<Version>) -> Result<Version> {
        let text = self
            .run_text(["version", "--format", "{{.Client.Version}}"])
            .await
            .map_err(|e| {
                anyhow!(DeployError::EngineVersion {
                    engine: self.engine.to_string(),
                    reason: format!("{:#}", e),
                })
            })?;
        let version = parse_version(&text).map_err(|e| {
            anyhow!(DeployError::EngineVersion {
                engine: self.engine.to_string(),
                reason: e.to_string(),
            })
        })?;
        debug!("Detected {} version {}", self.engine, version);
        if let Some(minimum) = minimum {
            if version < minimum {
                warn!(
                    "Detected {} version {}, the minimum supported {} version is {}.",
                    self.engine, version, self.engine, minimum
                );
            }
        }
        Ok(version)
    }

    pub async fn container_list(&self, labels: &[&str]) -> Result<Vec<Container>> {
        let mut args = vec![
            "container".to_string(),
            "ls".into(),
            "--all".into(),
            "--format".into(),
            "json".into(),
        ];
        for label in labels {
            args.push("-f".into());
            args.push(format!("label={}", label));
        }
        let out = self
            .run(args)
            .await
            .with_context(|| format!("{} container listing failed", self.engine))?;
        parse_containers(&out).with_context(|| format!("{} container parsing failed", self.engine))
    }

    pub async fn verb_on_names(&self, verb: &[&str], names: &[&str]) -> Result<()> {
        let args: Vec<String> = verb
            .iter()
            .chain(names.iter())
            .map(|s| s.to_string())
            .collect();
        self.run(args).await.map(|_| ())
    }

    pub async fn container_inspect(&self, names: &[&str]) -> Result<Vec<InspectData>> {
        let mut args = vec!["container", "inspect", "--format", "json"];
        args.extend_from_slice(names);
        let out = self.run(args).await?;
        parse_json_list::<InspectData>(&out, "container inspect output")
    }

    pub async fn container_logs(&self, name: &str) -> Result<Vec<String>> {
        let out = self.run(["container", "logs", name]).await?;
        Ok(String::from_utf8_lossy(&out)
            .split('\n')
            .map(str::to_string)
            .collect())
    }

    /// Reads `.State.Health.Status`. A template error about a missing health
    /// object reads as an empty status.
    pub async fn raw_health_status(&self, name: &str) -> Result<String> {
        match self
            .run_text(["inspect", "--format", "{{.State.Health.Status}}", name])
            .await
        {
            Ok(text) if text == "<no value>" => Ok(String::new()),
            Ok(text) => Ok(text),
            Err(e) if engine_output_contains(&e, &["health"]) => {
                debug!("No health state for '{}': {:#}", name, e);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn image_list(&self, references: &[&str], format: &str) -> Result<Vec<Image>> {
        let mut args = vec![
            "image".to_string(),
            "ls".into(),
            "--format".into(),
            format.to_string(),
        ];
        for reference in references {
            args.push("-f".into());
            args.push(format!("reference={}", reference));
        }
        let out = self.run(args).await?;
        parse_json_list::<Image>(&out, "image list")
    }

    pub async fn image_pull(&self, name: &str) -> Result<()> {
        self.run(["image", "pull", name]).await.map(|_| ())
    }

    pub async fn image_health_check(&self, name: &str) -> Result<Option<ImageHealthCheck>> {
        let out = self.run(["image", "inspect", "--format", "json", name]).await?;
        let images = parse_json_list::<ImageInspect>(&out, "image healthcheck")?;
        if images.len() != 1 {
            return Err(anyhow!(DeployError::Parse {
                what: "image healthcheck".to_string(),
                reason: format!("expected 1 image, got {}", images.len()),
            }));
        }
        Ok(images.into_iter().next().and_then(ImageInspect::health_check))
    }

    pub async fn version(&self) -> Result<serde_json::Value> {
        let out = self.run(["version", "--format", "json"]).await?;
        serde_json::from_slice(&out).map_err(|e| {
            anyhow!(DeployError::Parse {
                what: format!("{} version", self.engine),
                reason: e.to_string(),
            })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageInspectConfig {
    #[serde(default)]
    healthcheck: Option<HealthConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageInspect {
    #[serde(default)]
    config: Option<ImageInspectConfig>,
    /// Podman reports the check at the top level as well.
    #[serde(default)]
    healthcheck: Option<HealthConfig>,
}

impl ImageInspect {
    fn health_check(self) -> Option<ImageHealthCheck> {
        self.config
            .and_then(|c| c.healthcheck)
            .or(self.healthcheck)
            .filter(HealthConfig::is_enabled)
            .map(ImageHealthCheck::from)
    }
}

/// Maps a raw status string, rejecting values no engine documents.
pub fn health_status(engine: &str, raw: &str) -> Result<HealthStatus> {
    HealthStatus::from_engine(raw).ok_or_else(|| {
        anyhow!(DeployError::Parse {
            what: format!("{} health status", engine),
            reason: format!("unknown health status: {}", raw),
        })
    })
}

/// Time since an RFC 3339 `StartedAt` timestamp. `None` when absent or unparsable.
pub fn uptime(started_at: Option<&str>) -> Option<Duration> {
    let started: DateTime<Utc> = DateTime::parse_from_rfc3339(started_at?.trim())
        .ok()?
        .with_timezone(&Utc);
    (Utc::now() - started).to_std().ok()
}

/// Ports as `-p` arguments, bound to 127.0.0.1 unless `bind_ip_all` is set.
pub fn port_args(flags: &RunFlags) -> Vec<String> {
    flags
        .ports
        .iter()
        .flat_map(|mapping| {
            let mut mapping = mapping.clone();
            mapping.host_address = if flags.bind_ip_all {
                String::new()
            } else {
                LOCALHOST_IP.to_string()
            };
            ["-p".to_string(), port_mapping_flag(&mapping)]
        })
        .collect()
}

/// Renders a duration the way `--health-*` flags expect it (`30s`, `500ms`).
pub fn duration_flag(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

/// Full `run` argv: `run <flags> <image> [cmd] [args...]`. Published ports are
/// passed in already rendered so drivers can choose host ports themselves.
pub fn run_args(flags: &RunFlags, ports: Vec<String>, image: &str) -> Vec<String> {
    let mut args = vec!["run".to_string()];
    args.extend(ports);

    if flags.detach {
        args.push("--detach".into());
    }
    if flags.remove {
        args.push("--rm".into());
    }
    if let Some(name) = &flags.name {
        args.extend(["--name".to_string(), name.clone()]);
    }
    if let Some(hostname) = &flags.hostname {
        args.extend(["--hostname".to_string(), hostname.clone()]);
    }
    for (key, value) in &flags.env {
        args.extend(["-e".to_string(), format!("{}={}", key, value)]);
    }
    if let Some(network) = &flags.network {
        args.extend(["--network".to_string(), network.clone()]);
    }
    if let Some(ip) = &flags.ip {
        args.extend(["--ip".to_string(), ip.clone()]);
    }
    if let Some(entrypoint) = &flags.entrypoint {
        args.extend(["--entrypoint".to_string(), entrypoint.clone()]);
    }
    for volume in &flags.volumes {
        args.extend([
            "-v".to_string(),
            format!("{}:{}", volume.host_path, volume.container_path),
        ]);
    }
    if let Some(health) = &flags.health {
        args.extend(["--health-cmd".to_string(), health.cmd.join(" ")]);
        args.extend(["--health-interval".to_string(), duration_flag(health.interval)]);
        args.extend(["--health-timeout".to_string(), duration_flag(health.timeout)]);
        args.extend([
            "--health-start-period".to_string(),
            duration_flag(health.start_period),
        ]);
        args.extend(["--health-retries".to_string(), health.retries.to_string()]);
    }

    args.push(image.to_string());
    if let Some(cmd) = &flags.cmd {
        args.push(cmd.clone());
    }
    args.extend(flags.args.iter().cloned());
    args
}
