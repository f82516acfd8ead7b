//! # mdbdeploy Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error taxonomy shared by the engine drivers, the
//! deployment coordinator and the command handlers.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `DeployError`: A `thiserror` enum naming every failure the tool classifies
//!   (engine missing, deployment exists, health timeout, disk space, ...)
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible error handling
//!
//! Classification happens by downcasting, never by string comparison at the
//! call site:
//!
//! ```rust
//! match coordinator.create_local(&opts).await {
//!     Err(e) if is_deploy_error(&e, |de| matches!(de, DeployError::DeploymentExists { .. })) => {
//!         // leave the existing deployment alone
//!     }
//!     other => other?,
//! }
//! ```
//!
//! Engine subprocess failures carry the process stderr in
//! `DeployError::ExternalCommand`, so helpers such as `is_disk_space_error`
//! can pattern-match the engine's own wording.
//!
use thiserror::Error;

/// Link printed with every "engine not found" message.
pub const REQUIREMENTS_URL: &str =
    "https://dochub.mongodb.org/core/atlas-cli-deploy-local-reqs";

/// Custom error type for mdbdeploy.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{engine} not found in your system, check requirements at {url}", url = REQUIREMENTS_URL)]
    EngineNotFound { engine: String },

    #[error("could not determine {engine} version: {reason}")]
    EngineVersion { engine: String, reason: String },

    #[error("deployment already exists: \"{name}\", state:\"{state}\"")]
    DeploymentExists { name: String, state: String },

    #[error("deployment '{name}' not found")]
    DeploymentNotFound { name: String },

    #[error("more than one deployment named '{name}' found, use --type to choose one")]
    AmbiguousDeployment { name: String },

    #[error("deployment '{name}' is in unexpected state: {state}")]
    UnexpectedState { name: String, state: String },

    #[error("deployment '{name}' cannot be started while in state {state}")]
    CannotStart { name: String, state: String },

    #[error("timed out waiting for the deployment '{name}' to be healthy")]
    HealthTimeout { name: String },

    #[error("the deployment '{name}' is unhealthy")]
    Unhealthy { name: String },

    #[error("the deployment '{name}' does not have a healthcheck")]
    NoHealthCheck { name: String },

    #[error("insufficient disk space to download the MongoDB image, free some space and try again")]
    InsufficientDiskSpace,

    #[error("failed to download the MongoDB image")]
    ImageDownload,

    #[error("you are not authenticated. Please, configure your Atlas API keys")]
    Unauthenticated,

    #[error("failed to retrieve atlas and local deployments")]
    AllSourcesFailed,

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("port {port} is not available on this host")]
    PortUnavailable { port: u16 },

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("External command failed: {cmd}, Status: {status}, Output:\n{output}")]
    ExternalCommand {
        cmd: String,
        status: String,
        output: String,
    },

    #[error("Argument parsing error: {0}")]
    ArgumentParsing(String),
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

/// Engine stderr fragments that mean the host ran out of disk.
const DISK_SPACE_MARKERS: &[&str] = &[
    "no space left on device",
    "not enough space on the disk",
    "disk quota exceeded",
];

/// Engine stderr fragments that mean the referenced object does not exist.
const NOT_FOUND_MARKERS: &[&str] = &["no such container", "no such object", "not found"];

/// Returns true if any `DeployError` in the chain satisfies `pred`, including
/// one attached with `.context(DeployError::...)`.
pub fn is_deploy_error(err: &anyhow::Error, pred: impl Fn(&DeployError) -> bool) -> bool {
    err.downcast_ref::<DeployError>().is_some_and(&pred)
        || err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<DeployError>())
            .any(&pred)
}

/// True when any cause in the chain mentions one of `markers` (case-insensitive).
/// For a failed engine command only its stderr is considered, never the
/// command line, so names and env values cannot trigger a match.
pub fn engine_output_contains(err: &anyhow::Error, markers: &[&str]) -> bool {
    err.chain().any(|cause| {
        let text = match cause.downcast_ref::<DeployError>() {
            Some(DeployError::ExternalCommand { output, .. }) => output.to_lowercase(),
            _ => cause.to_string().to_lowercase(),
        };
        markers.iter().any(|m| text.contains(m))
    })
}

/// Detects disk exhaustion reported by an engine during pull or run.
pub fn is_disk_space_error(err: &anyhow::Error) -> bool {
    is_deploy_error(err, |de| matches!(de, DeployError::InsufficientDiskSpace))
        || engine_output_contains(err, DISK_SPACE_MARKERS)
}

/// Detects "no such container"-style failures from an engine.
pub fn is_not_found_error(err: &anyhow::Error) -> bool {
    is_deploy_error(err, |de| matches!(de, DeployError::DeploymentNotFound { .. }))
        || engine_output_contains(err, NOT_FOUND_MARKERS)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_error_display() {
        let exists = DeployError::DeploymentExists {
            name: "local1".into(),
            state: "running".into(),
        };
        assert_eq!(
            exists.to_string(),
            "deployment already exists: \"local1\", state:\"running\""
        );

        let not_found = DeployError::EngineNotFound {
            engine: "docker".into(),
        };
        assert!(not_found.to_string().starts_with("docker not found in your system"));
        assert!(not_found.to_string().ends_with(REQUIREMENTS_URL));
    }

    #[test]
    fn test_disk_space_detected_through_context() {
        let err = Err::<(), _>(anyhow!(DeployError::ExternalCommand {
            cmd: "docker image pull x".into(),
            status: "exit status: 1".into(),
            output: "write /var/lib/docker/tmp: No space left on device".into(),
        }))
        .context("image download failed")
        .unwrap_err();

        assert!(is_disk_space_error(&err));
        assert!(!is_not_found_error(&err));
    }

    #[test]
    fn test_markers_ignore_the_command_line() {
        let err = anyhow!(DeployError::ExternalCommand {
            cmd: "docker container rm -v -f not-found-db".into(),
            status: "exit status: 1".into(),
            output: "Cannot connect to the Docker daemon".into(),
        });
        assert!(!is_not_found_error(&err));
        assert!(!engine_output_contains(&err, &["rm -v"]));
        assert!(engine_output_contains(&err, &["docker daemon"]));

        let wrapped = Err::<(), _>(err).context("removal failed").unwrap_err();
        assert!(!is_not_found_error(&wrapped));
    }

    #[test]
    fn test_deploy_error_as_context() {
        let err = Err::<(), _>(anyhow!("exit status: 1"))
            .context(DeployError::ImageDownload)
            .unwrap_err();
        assert!(is_deploy_error(&err, |de| matches!(de, DeployError::ImageDownload)));
        assert_eq!(err.to_string(), "failed to download the MongoDB image");
    }

    #[test]
    fn test_is_deploy_error_walks_chain() {
        let err = Err::<(), _>(anyhow!(DeployError::Unhealthy { name: "a".into() }))
            .context("container configuration failed")
            .unwrap_err();

        assert!(is_deploy_error(&err, |de| matches!(de, DeployError::Unhealthy { .. })));
        assert!(!is_deploy_error(&err, |de| matches!(de, DeployError::DeploymentExists { .. })));
    }
}
