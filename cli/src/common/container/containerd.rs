//! # containerd Driver (nerdctl)
//!
//! File: cli/src/common/container/containerd.rs
//!
//! ## Overview
//!
//! Drives containerd through `nerdctl`. On macOS nerdctl lives inside a Lima
//! VM and every command is sent through `lima nerdctl ...`.
//!
//! Two behaviours differ from Docker:
//!
//! - **Host ports**: rootless nerdctl does not pick a host port when none is
//!   given. The driver discovers a free port itself (`find_free_port`) and
//!   publishes it explicitly. Another process can grab that port before
//!   nerdctl binds it, so a run that fails with a port conflict on a port the
//!   driver picked is retried with a fresh port, up to `MAX_PORT_ATTEMPTS`.
//!   Ports the caller asked for are never retried.
//! - **Health**: nerdctl does not evaluate health checks on a schedule. When
//!   no status is reported yet, the driver confirms a check is configured
//!   (on the container, else on its image), kicks it by hand with
//!   `nerdctl healthcheck` once the container has been up for
//!   `HEALTH_GRACE_PERIOD`, and reads the status again. A container with a
//!   check but still no status is `Starting`.
//!
use super::cli::{health_status, run_args, uptime, EngineCli, LOCALHOST_IP};
use super::ports::port_mapping_flag;
use super::types::{Container, HealthStatus, Image, ImageHealthCheck, InspectData, RunFlags};
use super::Engine;
use crate::common::network;
use crate::common::process::{CommandRunner, ProcessRunner};
use crate::common::system;
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const NERDCTL_BIN: &str = "nerdctl";
pub const LIMA_BIN: &str = "lima";
pub const HEALTH_GRACE_PERIOD: Duration = Duration::from_secs(5);
pub const MAX_PORT_ATTEMPTS: usize = 3;

pub struct ContainerdEngine<R = ProcessRunner> {
    cli: EngineCli<R>,
    through_lima: bool,
}

impl ContainerdEngine<ProcessRunner> {
    /// Uses `lima nerdctl` on macOS and `nerdctl` elsewhere.
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner::default(), system::is_macos())
    }
}

impl Default for ContainerdEngine<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> ContainerdEngine<R> {
    pub fn with_runner(runner: R, through_lima: bool) -> Self {
        let cli = if through_lima {
            EngineCli::new(runner, "containerd", LIMA_BIN).with_prefix(vec![NERDCTL_BIN.to_string()])
        } else {
            EngineCli::new(runner, "containerd", NERDCTL_BIN)
        };
        Self { cli, through_lima }
    }

    /// Renders `-p` flags, choosing host ports where none were requested.
    /// Returns whether any port was chosen here.
    async fn port_args(&self, flags: &RunFlags) -> (Vec<String>, bool) {
        let mut args = Vec::with_capacity(flags.ports.len() * 2);
        let mut picked = false;
        for mapping in &flags.ports {
            let mut mapping = mapping.clone();
            mapping.host_address = if flags.bind_ip_all {
                String::new()
            } else {
                LOCALHOST_IP.to_string()
            };
            if mapping.host_port == 0 {
                match network::find_free_port().await {
                    Ok(port) => {
                        debug!(
                            "Assigned random port {} for container port {}",
                            port, mapping.container_port
                        );
                        mapping.host_port = port;
                        picked = true;
                    }
                    Err(e) => {
                        warn!(
                            "Failed to find random unused port, using container port {}: {:#}",
                            mapping.container_port, e
                        );
                        mapping.host_port = mapping.container_port;
                    }
                }
            }
            args.push("-p".to_string());
            args.push(port_mapping_flag(&mapping));
        }
        (args, picked)
    }

    /// True when the container, or failing that its image, defines a health check.
    async fn has_health_check(&self, data: &InspectData) -> bool {
        let own = data
            .config
            .as_ref()
            .and_then(|c| c.healthcheck.as_ref())
            .is_some_and(|h| h.is_enabled());
        if own {
            return true;
        }
        let image = data
            .config
            .as_ref()
            .and_then(|c| c.image.clone())
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| data.image.clone());
        if image.is_empty() {
            return false;
        }
        match self.cli.image_health_check(&image).await {
            Ok(check) => check.is_some(),
            Err(e) => {
                debug!("Could not inspect image '{}' for a health check: {:#}", image, e);
                false
            }
        }
    }
}

#[async_trait]
impl<R: CommandRunner> Engine for ContainerdEngine<R> {
    fn name(&self) -> &'static str {
        "containerd"
    }

    async fn ready(&self) -> Result<()> {
        let binary = if self.through_lima { LIMA_BIN } else { NERDCTL_BIN };
        if system::binary_on_path(binary) {
            Ok(())
        } else {
            Err(anyhow!(DeployError::EngineNotFound {
                engine: "containerd".to_string()
            }))
        }
    }

    #[instrument(skip(self), fields(engine = "containerd"))]
    async fn verify_version(&self) -> Result<()> {
        match self.cli.verify_version(None).await {
            Ok(_) => Ok(()),
            Err(e) if self.through_lima => {
                Err(e.context("failed to connect to Lima nerdctl. Try: limactl start"))
            }
            Err(e) => Err(e.context(
                "failed to connect to nerdctl. Make sure containerd is running",
            )),
        }
    }

    #[instrument(skip(self), fields(engine = "containerd"))]
    async fn container_list(&self, labels: &[&str]) -> Result<Vec<Container>> {
        self.cli.container_list(labels).await
    }

    #[instrument(skip(self, flags), fields(engine = "containerd"))]
    async fn container_run(&self, image: &str, flags: &RunFlags) -> Result<String> {
        let mut attempt = 1;
        loop {
            let (ports, picked) = self.port_args(flags).await;
            match self.cli.run_text(run_args(flags, ports, image)).await {
                Ok(out) => return Ok(out),
                Err(e) if picked && attempt < MAX_PORT_ATTEMPTS && network::is_port_conflict(&e) => {
                    warn!(
                        "Chosen host port was taken before the container started (attempt {}/{}), retrying",
                        attempt, MAX_PORT_ATTEMPTS
                    );
                    // nerdctl can leave a created container behind after a failed bind.
                    if let Some(name) = &flags.name {
                        if let Err(rm_err) = self.container_rm(&[name.as_str()]).await {
                            debug!("Cleanup before retry failed: {:#}", rm_err);
                        }
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn container_rm(&self, names: &[&str]) -> Result<()> {
        self.cli.verb_on_names(&["container", "rm", "-v", "-f"], names).await
    }

    async fn container_start(&self, names: &[&str]) -> Result<()> {
        self.cli.verb_on_names(&["container", "start"], names).await
    }

    async fn container_stop(&self, names: &[&str]) -> Result<()> {
        self.cli.verb_on_names(&["container", "stop"], names).await
    }

    async fn container_unpause(&self, names: &[&str]) -> Result<()> {
        self.cli.verb_on_names(&["container", "unpause"], names).await
    }

    async fn container_inspect(&self, names: &[&str]) -> Result<Vec<InspectData>> {
        self.cli.container_inspect(names).await
    }

    async fn container_logs(&self, name: &str) -> Result<Vec<String>> {
        self.cli.container_logs(name).await
    }

    #[instrument(skip(self), fields(engine = "containerd"))]
    async fn container_health_status(&self, name: &str) -> Result<HealthStatus> {
        let mut raw = self.cli.raw_health_status(name).await?;
        if raw.is_empty() {
            let data = match self.cli.container_inspect(&[name]).await?.into_iter().next() {
                Some(data) => data,
                None => {
                    return Err(anyhow!(DeployError::DeploymentNotFound {
                        name: name.to_string()
                    }))
                }
            };
            if !self.has_health_check(&data).await {
                return Ok(HealthStatus::None);
            }

            let started_at = data.state.as_ref().and_then(|s| s.started_at.as_deref());
            if let Some(up) = uptime(started_at) {
                if up > HEALTH_GRACE_PERIOD {
                    debug!("Kicking health check of '{}' after {:?} of uptime", name, up);
                    if let Err(e) = self.cli.run(["healthcheck", name]).await {
                        debug!("Manual health check run failed: {:#}", e);
                    }
                    raw = self.cli.raw_health_status(name).await.unwrap_or_default();
                }
            }
            if raw.is_empty() {
                return Ok(HealthStatus::Starting);
            }
        }
        health_status("containerd", &raw)
    }

    async fn image_list(&self, references: &[&str]) -> Result<Vec<Image>> {
        self.cli.image_list(references, "{{. | json}}").await
    }

    #[instrument(skip(self), fields(engine = "containerd"))]
    async fn image_pull(&self, name: &str) -> Result<()> {
        self.cli.image_pull(name).await
    }

    async fn image_health_check(&self, name: &str) -> Result<Option<ImageHealthCheck>> {
        self.cli.image_health_check(name).await
    }

    async fn version(&self) -> Result<serde_json::Value> {
        self.cli.version().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::container::types::PortMapping;
    use crate::common::process::scripted::{Reply, ScriptedRunner};
    use chrono::Utc;

    const STATUS: &[&str] = &["nerdctl", "inspect", "--format", "{{.State.Health.Status}}", "local1"];

    fn started_secs_ago(secs: i64) -> String {
        (Utc::now() - chrono::Duration::seconds(secs)).to_rfc3339()
    }

    fn inspect_json(started_at: &str, container_check: bool) -> String {
        let healthcheck = if container_check {
            r#"{"Test":["CMD-SHELL","/usr/local/bin/runner healthcheck"],"Interval":30000000000}"#
        } else {
            "null"
        };
        format!(
            r#"{{"Id":"abc","Name":"local1","Image":"mongodb/mongodb-atlas-local:8","Config":{{"Image":"mongodb/mongodb-atlas-local:8","Healthcheck":{}}},"State":{{"Status":"running","StartedAt":"{}"}}}}"#,
            healthcheck, started_at
        )
    }

    #[tokio::test]
    async fn test_no_check_anywhere_is_none() {
        let runner = ScriptedRunner::new()
            .ok(STATUS, "")
            .ok(&["nerdctl", "container", "inspect"], &inspect_json(&started_secs_ago(60), false))
            .ok(&["nerdctl", "image", "inspect"], r#"{"Config":{"Healthcheck":null}}"#);
        let engine = ContainerdEngine::with_runner(runner, false);
        assert_eq!(engine.container_health_status("local1").await.unwrap(), HealthStatus::None);
        assert!(!engine.cli.runner().called_with(&["nerdctl", "healthcheck"]));
    }

    #[tokio::test]
    async fn test_kick_after_grace_period_converges() {
        let runner = ScriptedRunner::new()
            .on(
                STATUS,
                vec![Reply::Stdout(String::new()), Reply::Stdout("healthy".into())],
            )
            .ok(&["nerdctl", "container", "inspect"], &inspect_json(&started_secs_ago(60), true))
            .ok(&["nerdctl", "healthcheck", "local1"], "");
        let engine = ContainerdEngine::with_runner(runner, false);
        assert_eq!(
            engine.container_health_status("local1").await.unwrap(),
            HealthStatus::Healthy
        );
        assert!(engine.cli.runner().called_with(&["nerdctl", "healthcheck", "local1"]));
    }

    #[tokio::test]
    async fn test_young_container_is_starting_without_kick() {
        let runner = ScriptedRunner::new()
            .ok(STATUS, "")
            .ok(&["nerdctl", "container", "inspect"], &inspect_json(&started_secs_ago(1), true));
        let engine = ContainerdEngine::with_runner(runner, false);
        assert_eq!(
            engine.container_health_status("local1").await.unwrap(),
            HealthStatus::Starting
        );
        assert!(!engine.cli.runner().called_with(&["nerdctl", "healthcheck"]));
    }

    #[tokio::test]
    async fn test_run_assigns_free_host_port() {
        let runner = ScriptedRunner::new().ok(&["nerdctl", "run"], "abc\n");
        let engine = ContainerdEngine::with_runner(runner, false);
        let flags = RunFlags {
            ports: vec![PortMapping::new(0, 27017)],
            ..Default::default()
        };
        engine.container_run("img", &flags).await.unwrap();

        let calls = engine.cli.runner().calls();
        let mapping = &calls[0][3];
        assert!(mapping.starts_with("127.0.0.1:"));
        assert!(mapping.ends_with(":27017"));
        assert!(!mapping.contains("::"));
    }

    #[tokio::test]
    async fn test_run_retries_port_conflicts_on_picked_ports() {
        let runner = ScriptedRunner::new()
            .on(
                &["nerdctl", "run"],
                vec![
                    Reply::Stderr("bind: address already in use".into()),
                    Reply::Stdout("abc\n".into()),
                ],
            )
            .ok(&["nerdctl", "container", "rm"], "");
        let engine = ContainerdEngine::with_runner(runner, false);
        let flags = RunFlags {
            name: Some("local1".into()),
            ports: vec![PortMapping::new(0, 27017)],
            ..Default::default()
        };
        assert_eq!(engine.container_run("img", &flags).await.unwrap(), "abc");
        let runs = engine
            .cli
            .runner()
            .calls()
            .into_iter()
            .filter(|c| c[1] == "run")
            .count();
        assert_eq!(runs, 2);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_explicit_ports() {
        let runner = ScriptedRunner::new().fail(&["nerdctl", "run"], "port is already allocated");
        let engine = ContainerdEngine::with_runner(runner, false);
        let flags = RunFlags {
            ports: vec![PortMapping::new(27018, 27017)],
            ..Default::default()
        };
        assert!(engine.container_run("img", &flags).await.is_err());
        assert_eq!(engine.cli.runner().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_lima_prefix() {
        let runner = ScriptedRunner::new().ok(&["lima", "nerdctl", "container", "start"], "");
        let engine = ContainerdEngine::with_runner(runner, true);
        engine.container_start(&["local1"]).await.unwrap();
        assert!(engine
            .cli
            .runner()
            .called_with(&["lima", "nerdctl", "container", "start", "local1"]));
    }
}
