//! # mdbdeploy Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the subcommands of the mdbdeploy CLI. Each
//! subcommand lives in its own file with a clap `Args` struct and an async
//! `handle_*` function. Handlers stay thin: they validate flags, build a
//! `Coordinator` and print what it returns.
//!
//! ## Commands
//!
//! - `setup`: Create a local deployment.
//! - `list`: Show local and Atlas deployments.
//! - `connect`: Print a deployment's connection string.
//! - `pause`, `start`, `delete`: Lifecycle transitions.
//! - `logs`: Print a local deployment's logs.
//!
//! ## Shared Pieces
//!
//! - `GlobalOpts`: Flags accepted by every subcommand (`--engine`,
//!   `--project-id`, `--local-image`, verbosity).
//! - `DeploymentArgs`: The `[NAME] --type LOCAL|ATLAS` pair most subcommands take.
//! - `build_coordinator`: Loads config, applies the global overrides, selects
//!   the engine and wires the cluster store.
//!
use crate::common::container::{select, EngineKind};
use crate::core::config::{self, Config};
use crate::core::error::Result;
use crate::deployment::atlas::OfflineClusterStore;
use crate::deployment::{Coordinator, DeploymentKind, Settings};
use clap::Args;
use tracing::debug;

pub mod connect;
pub mod delete;
pub mod list;
pub mod logs;
pub mod pause;
pub mod setup;
pub mod start;

/// Options shared by every subcommand, collected from the top-level parser.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub verbosity: u8,
    pub engine: Option<EngineKind>,
    pub project_id: Option<String>,
    pub local_image: Option<String>,
}

impl GlobalOpts {
    /// Applies flag and environment overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(engine) = self.engine {
            config.local.engine = engine;
        }
        if let Some(project_id) = &self.project_id {
            config.atlas.project_id = Some(project_id.clone());
        }
        if let Some(image) = &self.local_image {
            config.local.image = image.clone();
        }
    }
}

/// The deployment a command acts on.
#[derive(Args, Debug, Clone, Default)]
pub struct DeploymentArgs {
    /// Name of the deployment. Without it, the only eligible deployment is used.
    pub name: Option<String>,

    /// Type of the deployment.
    #[arg(long = "type", value_enum, ignore_case = true)]
    pub kind: Option<DeploymentKind>,
}

pub fn load_config(globals: &GlobalOpts) -> Result<Config> {
    let mut config = config::load_config()?;
    globals.apply(&mut config);
    Ok(config)
}

/// Selects the engine and builds a coordinator for this invocation.
pub async fn build_coordinator(globals: &GlobalOpts, config: &Config) -> Result<Coordinator> {
    let engine = select::engine_for(config.local.engine, config.local.probe_timeout()).await?;
    let store = OfflineClusterStore::new(config.atlas.is_authenticated());
    debug!(
        "Coordinator using engine {} (Atlas keys configured: {})",
        engine.name(),
        config.atlas.is_authenticated()
    );
    Ok(Coordinator::new(
        engine,
        Box::new(store),
        Settings::from_config(config, globals.verbosity),
    ))
}
