//! # mdbdeploy Deployment Coordinator (`deployment`)
//!
//! File: cli/src/deployment/mod.rs
//!
//! ## Overview
//!
//! The coordinator joins the two places a deployment can live, a local
//! container driven through an `Engine` and a cloud cluster reached through
//! a `ClusterStore`, into one `Deployment` view. It owns every lifecycle
//! transition (create, start, pause, delete) and the bounded health wait.
//!
//! Nothing is cached: every operation re-queries the engine or the store.
//!
//! ## Architecture
//!
//! - **`state`**: `Deployment`, `DeploymentKind` and the container-state to
//!   canonical-state table.
//! - **`atlas`**: The `ClusterStore` contract and the offline store shipped
//!   in the binary.
//! - **`listing`**: Merged local and Atlas listings, and selection of a single
//!   deployment by name, type and allowed states.
//! - **`health`**: The health polling loop.
//! - **`lifecycle`**: Setup validation and the create, start, pause, delete,
//!   logs and connect operations.
//!
//! ## Usage
//!
//! ```rust
//! use crate::deployment::{atlas::OfflineClusterStore, Coordinator, Settings};
//!
//! # async fn run_example(engine: Box<dyn crate::common::container::Engine>) -> crate::core::error::Result<()> {
//! let coordinator = Coordinator::new(
//!     engine,
//!     Box::new(OfflineClusterStore::new(false)),
//!     Settings::default(),
//! );
//! for d in coordinator.list(None).await? {
//!     println!("{} {} {}", d.name, d.kind, d.state);
//! }
//! # Ok(())
//! # }
//! ```
//!
use crate::common::container::Engine;
use crate::core::config::{Config, DEFAULT_LOCAL_IMAGE};
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use std::time::Duration;
use tracing::{info_span, Span};

pub mod atlas;
pub mod health;
pub mod lifecycle;
pub mod listing;
pub mod state;

#[cfg(test)]
pub(crate) mod fakes;

pub use atlas::ClusterStore;
pub use state::{Deployment, DeploymentKind, StateName};

/// Label every local deployment container carries (set by the image).
pub const CONTAINER_LABEL: &str = "mongodb-atlas-local=container";
pub const VERSION_LABEL: &str = "version";
pub const MONGOD_PORT: u16 = 27017;
pub const MONGOD_PORT_KEY: &str = "27017/tcp";
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Per-invocation knobs the coordinator needs from config and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Image repository without a tag; the major MongoDB version is appended.
    pub image: String,
    pub project_id: Option<String>,
    pub health_timeout: Duration,
    pub poll_interval: Duration,
    /// Default for `--bind-ip-all`.
    pub bind_ip_all: bool,
    /// Debug verbosity: container logs are forwarded and dumped on failure.
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image: DEFAULT_LOCAL_IMAGE.to_string(),
            project_id: None,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            poll_interval: POLL_INTERVAL,
            bind_ip_all: false,
            debug: false,
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config, verbosity: u8) -> Self {
        Self {
            image: config.local.image.clone(),
            project_id: config.atlas.project_id.clone(),
            health_timeout: config.local.health_timeout(),
            poll_interval: POLL_INTERVAL,
            bind_ip_all: config.local.bind_ip_all,
            debug: verbosity >= 2,
        }
    }
}

pub struct Coordinator {
    engine: Box<dyn Engine>,
    store: Box<dyn ClusterStore>,
    settings: Settings,
    span: Span,
}

impl Coordinator {
    pub fn new(engine: Box<dyn Engine>, store: Box<dyn ClusterStore>, settings: Settings) -> Self {
        let span = info_span!("deployment", engine = engine.name());
        Self {
            engine,
            store,
            settings,
            span,
        }
    }

    fn project_id(&self) -> Result<&str> {
        self.settings
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                anyhow!(DeployError::Config(
                    "no Atlas project ID set, use --project-id or MDBDEPLOY_PROJECT_ID".to_string()
                ))
            })
    }
}
