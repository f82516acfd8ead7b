//! # Deployment States
//!
//! File: cli/src/deployment/state.rs
//!
//! Engine-native container states (`running`, `exited`, ...) and Atlas
//! cluster states both fold into `StateName`, the canonical label shown to
//! users and checked by lifecycle guards.
//!
//! | container state | canonical |
//! |-----------------|-----------|
//! | `running`       | `IDLE`    |
//! | `created`, `exited`, `dead` | `STOPPED` |
//! | `paused`        | `PAUSED`  |
//! | `removing`      | `DELETING` |
//! | `restarting`    | `RESTARTING` |
//! | anything else   | uppercased, unchanged |
//!
use std::fmt;

/// A container state as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Created,
    Exited,
    Dead,
    Paused,
    Removing,
    Restarting,
    Other(String),
}

impl ContainerState {
    pub fn from_engine(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "created" => Self::Created,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            "paused" => Self::Paused,
            "removing" => Self::Removing,
            "restarting" => Self::Restarting,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

/// Canonical deployment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateName {
    Idle,
    Paused,
    Stopped,
    Deleting,
    Restarting,
    /// Any other state, stored uppercased.
    Other(String),
}

impl StateName {
    /// Parses an already-canonical label such as an Atlas `stateName`.
    pub fn from_label(s: &str) -> Self {
        let upper = s.trim().to_uppercase();
        match upper.as_str() {
            "IDLE" => Self::Idle,
            "PAUSED" => Self::Paused,
            "STOPPED" => Self::Stopped,
            "DELETING" => Self::Deleting,
            "RESTARTING" => Self::Restarting,
            _ => Self::Other(upper),
        }
    }
}

impl From<&ContainerState> for StateName {
    fn from(state: &ContainerState) -> Self {
        match state {
            ContainerState::Running => Self::Idle,
            ContainerState::Created | ContainerState::Exited | ContainerState::Dead => Self::Stopped,
            ContainerState::Paused => Self::Paused,
            ContainerState::Removing => Self::Deleting,
            ContainerState::Restarting => Self::Restarting,
            ContainerState::Other(s) => Self::Other(s.to_uppercase()),
        }
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("IDLE"),
            Self::Paused => f.write_str("PAUSED"),
            Self::Stopped => f.write_str("STOPPED"),
            Self::Deleting => f.write_str("DELETING"),
            Self::Restarting => f.write_str("RESTARTING"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Where a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum DeploymentKind {
    #[value(name = "LOCAL", alias = "local")]
    Local,
    #[value(name = "ATLAS", alias = "atlas")]
    Atlas,
}

impl fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("LOCAL"),
            Self::Atlas => f.write_str("ATLAS"),
        }
    }
}

/// The engine-agnostic view of one deployment. (kind, name) is unique in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub kind: DeploymentKind,
    pub name: String,
    pub mongodb_version: String,
    pub state: StateName,
}
