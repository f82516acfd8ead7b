//! # Podman Driver
//!
//! File: cli/src/common/container/podman.rs
//!
//! ## Overview
//!
//! Drives the `podman` CLI. On macOS and Windows Podman runs containers in a
//! machine VM, which `ready` creates and starts on demand.
//!
//! Podman only evaluates health checks while its systemd timer runs, which
//! is often absent in rootless setups. `container_health_status` therefore
//! treats an exited or paused container as unhealthy and, once the container
//! has been up for `HEALTH_GRACE_PERIOD`, runs `podman healthcheck run`
//! before reading the status.
//!
use super::cli::{health_status, port_args, run_args, uptime, EngineCli};
use super::parse::{parse_json_list, Version};
use super::types::{Container, HealthStatus, Image, ImageHealthCheck, InspectData, RunFlags};
use super::Engine;
use crate::common::process::{CommandRunner, ProcessRunner};
use crate::common::system::{self, HostResources};
use crate::core::error::{DeployError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const PODMAN_BIN: &str = "podman";
pub const MIN_PODMAN_VERSION: Version = Version::new(4, 0, 0);
pub const HEALTH_GRACE_PERIOD: Duration = Duration::from_secs(15);
/// Memory given to a new machine when the host can spare it, in MiB.
pub const MACHINE_MEMORY_MIB: u64 = 2048;
pub const MACHINE_CPUS: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MachineInspect {
    #[serde(default)]
    state: String,
}

pub struct PodmanEngine<R = ProcessRunner> {
    cli: EngineCli<R>,
}

impl PodmanEngine<ProcessRunner> {
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner::default())
    }
}

impl Default for PodmanEngine<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

/// `machine init` arguments sized to what the host has available.
pub fn machine_init_args(resources: HostResources) -> Vec<String> {
    let mut args = vec!["machine".to_string(), "init".to_string()];
    if resources.available_memory / (1024 * 1024) > MACHINE_MEMORY_MIB {
        args.extend(["--memory".to_string(), MACHINE_MEMORY_MIB.to_string()]);
    } else {
        warn!(
            "Less than {} MiB of memory available, the Podman machine will use its default size",
            MACHINE_MEMORY_MIB
        );
    }
    if resources.cpus >= MACHINE_CPUS {
        args.extend(["--cpus".to_string(), MACHINE_CPUS.to_string()]);
    } else {
        warn!(
            "Fewer than {} CPUs available, the Podman machine will use its default CPU count",
            MACHINE_CPUS
        );
    }
    args
}

impl<R: CommandRunner> PodmanEngine<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            cli: EngineCli::new(runner, "podman", PODMAN_BIN),
        }
    }

    /// Creates the Podman machine if it does not exist and starts it if it is not running.
    #[instrument(skip(self, resources))]
    pub async fn ensure_machine(&self, resources: HostResources) -> Result<()> {
        let state = match self.cli.run(["machine", "inspect"]).await {
            Ok(out) => parse_json_list::<MachineInspect>(&out, "podman machine inspect")?
                .into_iter()
                .next()
                .map(|m| m.state)
                .unwrap_or_default(),
            Err(e) => {
                debug!("No Podman machine found: {:#}", e);
                info!("Initializing Podman machine");
                self.cli
                    .run(machine_init_args(resources))
                    .await
                    .context("failed to initialize the Podman machine")?;
                String::new()
            }
        };

        if !state.eq_ignore_ascii_case("running") {
            info!("Starting Podman machine");
            self.cli
                .run(["machine", "start"])
                .await
                .context("failed to start the Podman machine")?;
        }
        Ok(())
    }

    async fn inspect_one(&self, name: &str) -> Result<InspectData> {
        self.cli
            .container_inspect(&[name])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                anyhow!(DeployError::DeploymentNotFound {
                    name: name.to_string()
                })
            })
    }
}

#[async_trait]
impl<R: CommandRunner> Engine for PodmanEngine<R> {
    fn name(&self) -> &'static str {
        "podman"
    }

    async fn ready(&self) -> Result<()> {
        if !system::binary_on_path(PODMAN_BIN) {
            return Err(anyhow!(DeployError::EngineNotFound {
                engine: "podman".to_string()
            }));
        }
        if system::requires_vm() {
            self.ensure_machine(HostResources::detect()).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(engine = "podman"))]
    async fn verify_version(&self) -> Result<()> {
        self.cli.verify_version(Some(MIN_PODMAN_VERSION)).await.map(|_| ())
    }

    #[instrument(skip(self), fields(engine = "podman"))]
    async fn container_list(&self, labels: &[&str]) -> Result<Vec<Container>> {
        self.cli.container_list(labels).await
    }

    #[instrument(skip(self, flags), fields(engine = "podman"))]
    async fn container_run(&self, image: &str, flags: &RunFlags) -> Result<String> {
        self.cli.run_text(run_args(flags, port_args(flags), image)).await
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

    #[instrument(skip(self), fields(engine = "podman"))]
    async fn container_health_status(&self, name: &str) -> Result<HealthStatus> {
        let mut data = self.inspect_one(name).await?;
        let state = data.state.clone().unwrap_or_default();
        if matches!(state.status.as_str(), "exited" | "paused") {
            return Ok(HealthStatus::Unhealthy);
        }

        if uptime(state.started_at.as_deref()).is_some_and(|up| up > HEALTH_GRACE_PERIOD) {
            match self.cli.run(["healthcheck", "run", name]).await {
                Ok(_) => data = self.inspect_one(name).await?,
                // A failing check exits non-zero; the recorded status still tells the story.
                Err(e) => {
                    debug!("podman healthcheck run for '{}' failed: {:#}", name, e);
                    data = self.inspect_one(name).await?;
                }
            }
        }

        let raw = data
            .state
            .and_then(|s| s.health)
            .map(|h| h.status)
            .unwrap_or_default();
        health_status("podman", &raw)
    }

    async fn image_list(&self, references: &[&str]) -> Result<Vec<Image>> {
        self.cli.image_list(references, "json").await
    }

    #[instrument(skip(self), fields(engine = "podman"))]
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
