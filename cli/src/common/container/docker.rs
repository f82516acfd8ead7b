//! # Docker Driver
//!
//! File: cli/src/common/container/docker.rs
//!
//! Drives the `docker` CLI. Docker evaluates health checks natively, so the
//! health status is read straight from `docker inspect`.
//!
use super::cli::{health_status, port_args, run_args, EngineCli};
use super::parse::Version;
use super::types::{Container, HealthStatus, Image, ImageHealthCheck, InspectData, RunFlags};
use super::Engine;
use crate::common::process::{CommandRunner, ProcessRunner};
use crate::common::system;
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use tracing::instrument;

pub const DOCKER_BIN: &str = "docker";
pub const MIN_DOCKER_VERSION: Version = Version::new(27, 0, 0);

pub struct DockerEngine<R = ProcessRunner> {
    cli: EngineCli<R>,
}

impl DockerEngine<ProcessRunner> {
    pub fn new() -> Self {
        Self::with_runner(ProcessRunner::default())
    }
}

impl Default for DockerEngine<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> DockerEngine<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            cli: EngineCli::new(runner, "docker", DOCKER_BIN),
        }
    }
}

#[async_trait]
impl<R: CommandRunner> Engine for DockerEngine<R> {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn ready(&self) -> Result<()> {
        if system::binary_on_path(DOCKER_BIN) {
            Ok(())
        } else {
            Err(anyhow!(DeployError::EngineNotFound {
                engine: "docker".to_string()
            }))
        }
    }

    #[instrument(skip(self), fields(engine = "docker"))]
    async fn verify_version(&self) -> Result<()> {
        self.cli.verify_version(Some(MIN_DOCKER_VERSION)).await.map(|_| ())
    }

    #[instrument(skip(self), fields(engine = "docker"))]
    async fn container_list(&self, labels: &[&str]) -> Result<Vec<Container>> {
        self.cli.container_list(labels).await
    }

    #[instrument(skip(self, flags), fields(engine = "docker"))]
    async fn container_run(&self, image: &str, flags: &RunFlags) -> Result<String> {
        let out = self.cli.run_text(run_args(flags, port_args(flags), image)).await?;
        Ok(out)
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

    #[instrument(skip(self), fields(engine = "docker"))]
    async fn container_health_status(&self, name: &str) -> Result<HealthStatus> {
        let raw = self.cli.raw_health_status(name).await?;
        health_status("docker", &raw)
    }

    async fn image_list(&self, references: &[&str]) -> Result<Vec<Image>> {
        self.cli.image_list(references, "{{. | json}}").await
    }

    #[instrument(skip(self), fields(engine = "docker"))]
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
