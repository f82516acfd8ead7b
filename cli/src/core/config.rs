//! # mdbdeploy Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module implements loading, merging and validation of the tool's
//! configuration. Settings come from TOML files and are combined with
//! command-line flags (which may themselves fall back to environment
//! variables through clap) in the command layer.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Project-specific `.mdbdeploy.toml` in current directory or ancestors
//! 2. User-specific `config.toml` in the platform config directory
//! 3. Default values defined in the code
//!
//! ## Examples
//!
//! ```toml
//! [local]
//! image = "docker.io/mongodb/mongodb-atlas-local"
//! engine = "podman"
//! health_timeout_secs = 300
//!
//! [atlas]
//! project_id = "64f670f0bf789926667dad1a"
//! ```
//!
//! The configuration is loaded once per command execution and passed
//! to the modules that need it.
//!
use crate::common::container::EngineKind;
use crate::core::error::{DeployError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub atlas: AtlasConfig,
}

/// Settings for deployments running in a local container engine.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    /// Image repository; the MongoDB major version is appended as the tag.
    #[serde(default = "default_local_image")]
    pub image: String,
    /// Which engine to drive. `auto` probes Docker, then containerd.
    #[serde(default)]
    pub engine: EngineKind,
    /// Upper bound for the post-create health wait.
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
    /// Upper bound for each engine readiness probe during selection.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Publish ports on all interfaces instead of 127.0.0.1.
    #[serde(default)]
    pub bind_ip_all: bool,
    /// Default directory of init scripts mounted into new deployments (can use ~).
    #[serde(default)]
    pub initdb: Option<String>,
}

/// Settings for the cloud control plane.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AtlasConfig {
    pub project_id: Option<String>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            image: default_local_image(),
            engine: EngineKind::default(),
            health_timeout_secs: default_health_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            bind_ip_all: false,
            initdb: None,
        }
    }
}

impl LocalConfig {
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl AtlasConfig {
    /// A session counts as authenticated once both API keys are configured.
    pub fn is_authenticated(&self) -> bool {
        matches!((&self.public_key, &self.private_key), (Some(p), Some(k)) if !p.is_empty() && !k.is_empty())
    }
}

pub const DEFAULT_LOCAL_IMAGE: &str = "docker.io/mongodb/mongodb-atlas-local";

fn default_local_image() -> String {
    DEFAULT_LOCAL_IMAGE.to_string()
}
// Large on purpose: an unhealthy container is reported well before this.
fn default_health_timeout_secs() -> u64 {
    600
}
fn default_probe_timeout_secs() -> u64 {
    5
}

const PROJECT_CONFIG_FILENAME: &str = ".mdbdeploy.toml";

pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged_config);
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "mdbdeploy", "mdbdeploy") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.mdbdeploy.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

/// Walks up from `start` looking for the project file, stopping at a `.git` boundary.
fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let defaults = LocalConfig::default();
    let mut merged = Config::default();

    merged.local.image = if project_cfg.local.image != defaults.image {
        project_cfg.local.image
    } else {
        user.local.image
    };
    merged.local.engine = if project_cfg.local.engine != defaults.engine {
        project_cfg.local.engine
    } else {
        user.local.engine
    };
    merged.local.health_timeout_secs =
        if project_cfg.local.health_timeout_secs != defaults.health_timeout_secs {
            project_cfg.local.health_timeout_secs
        } else {
            user.local.health_timeout_secs
        };
    merged.local.probe_timeout_secs =
        if project_cfg.local.probe_timeout_secs != defaults.probe_timeout_secs {
            project_cfg.local.probe_timeout_secs
        } else {
            user.local.probe_timeout_secs
        };
    merged.local.bind_ip_all = project_cfg.local.bind_ip_all || user.local.bind_ip_all;
    merged.local.initdb = project_cfg.local.initdb.or(user.local.initdb);

    merged.atlas.project_id = project_cfg.atlas.project_id.or(user.atlas.project_id);
    // Keys travel as a pair so a project file cannot mix its public key with the user's private one.
    if project_cfg.atlas.public_key.is_some() || project_cfg.atlas.private_key.is_some() {
        merged.atlas.public_key = project_cfg.atlas.public_key;
        merged.atlas.private_key = project_cfg.atlas.private_key;
    } else {
        merged.atlas.public_key = user.atlas.public_key;
        merged.atlas.private_key = user.atlas.private_key;
    }
    merged
}

fn expand_config_paths(config: &mut Config) {
    if let Some(initdb) = config.local.initdb.as_mut() {
        *initdb = shellexpand::tilde(initdb).into_owned();
        debug!("Expanded initdb directory: {}", initdb);
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.local.image.trim().is_empty() {
        return Err(anyhow!(DeployError::Config(
            "local.image cannot be empty".to_string()
        )));
    }
    if config.local.image.contains('@') || config.local.image.rsplit('/').next().is_some_and(|last| last.contains(':')) {
        return Err(anyhow!(DeployError::Config(format!(
            "local.image '{}' must not carry a tag or digest; the MongoDB version selects the tag",
            config.local.image
        ))));
    }
    if config.local.health_timeout_secs == 0 {
        return Err(anyhow!(DeployError::Config(
            "local.health_timeout_secs must be greater than zero".to_string()
        )));
    }
    if config.local.probe_timeout_secs == 0 {
        return Err(anyhow!(DeployError::Config(
            "local.probe_timeout_secs must be greater than zero".to_string()
        )));
    }
    Ok(())
}
