//! # mdbdeploy Container Engine Layer (`common::container`)
//!
//! File: cli/src/common/container/mod.rs
//!
//! ## Overview
//!
//! This module drives the container engine CLIs installed on the host
//! (Docker, containerd through nerdctl, Podman) through one canonical
//! lifecycle API, the `Engine` trait. Drivers spawn the engine binary as a
//! subprocess, then normalize its textual or JSON output into the types in
//! `types`.
//!
//! ## Architecture
//!
//! - **`types`**: `Container`, `PortMapping`, `RunFlags`, `InspectData`,
//!   `Image`, `ImageHealthCheck`, `HealthStatus`.
//! - **`ports`**: The `host:hostPort->containerPort/proto` grammar and the `-p`
//!   flag renderer.
//! - **`parse`**: Array-or-NDJSON decoding, label and state normalization,
//!   lenient version parsing.
//! - **`cli`**: The Docker-compatible argv dialect shared by every driver and
//!   the `EngineCli` wrapper that runs it.
//! - **`docker`**, **`containerd`**, **`podman`**: One driver per engine. Each
//!   is generic over a `CommandRunner`, so tests can script engine replies.
//! - **`select`**: Picks the engine for this invocation.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::container::{select, EngineKind};
//! use std::time::Duration;
//!
//! # async fn run_example() -> crate::core::error::Result<()> {
//! let engine = select::engine_for(EngineKind::Auto, Duration::from_secs(5)).await?;
//! let containers = engine.container_list(&["mongodb-atlas-local=container"]).await?;
//! println!("{} ({} containers)", engine.name(), containers.len());
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::Result;
use async_trait::async_trait;
use serde::Deserialize;

pub mod cli;
pub mod containerd;
pub mod docker;
pub mod parse;
pub mod podman;
pub mod ports;
pub mod select;
pub mod types;

pub use types::{
    Container, HealthCheckFlags, HealthStatus, Image, ImageHealthCheck, InspectData, PortMapping,
    RunFlags, VolumeMapping,
};

/// The canonical lifecycle API every engine driver implements.
#[async_trait]
pub trait Engine: Send + Sync {
    /// `docker`, `containerd` or `podman`.
    fn name(&self) -> &'static str;

    /// Succeeds when the engine binary is installed (and, where one is
    /// needed, its VM is running).
    async fn ready(&self) -> Result<()>;

    /// Fails when the engine does not answer a version query; warns when it
    /// is older than the supported minimum.
    async fn verify_version(&self) -> Result<()>;

    /// Lists all containers, running or not, carrying every given `key=value` label.
    async fn container_list(&self, labels: &[&str]) -> Result<Vec<Container>>;

    /// Runs `image` and returns the engine's stdout (usually the container id).
    async fn container_run(&self, image: &str, flags: &RunFlags) -> Result<String>;

    /// Force-removes containers along with their anonymous volumes.
    async fn container_rm(&self, names: &[&str]) -> Result<()>;
    async fn container_start(&self, names: &[&str]) -> Result<()>;
    async fn container_stop(&self, names: &[&str]) -> Result<()>;
    async fn container_unpause(&self, names: &[&str]) -> Result<()>;
    async fn container_inspect(&self, names: &[&str]) -> Result<Vec<InspectData>>;
    async fn container_logs(&self, name: &str) -> Result<Vec<String>>;
    async fn container_health_status(&self, name: &str) -> Result<HealthStatus>;

    async fn image_list(&self, references: &[&str]) -> Result<Vec<Image>>;
    async fn image_pull(&self, name: &str) -> Result<()>;
    /// The health check baked into the image, if any.
    async fn image_health_check(&self, name: &str) -> Result<Option<ImageHealthCheck>>;

    /// Raw version document as reported by the engine.
    async fn version(&self) -> Result<serde_json::Value>;
}

/// Which engine to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Docker if it answers, otherwise containerd.
    #[default]
    Auto,
    Docker,
    Containerd,
    Podman,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Docker => "docker",
            Self::Containerd => "containerd",
            Self::Podman => "podman",
        };
        f.write_str(s)
    }
}
