//! # mdbdeploy Network Utilities (`common::network`)
//!
//! File: cli/src/common/network/mod.rs
//!
//! ## Overview
//!
//! Local port discovery for deployments:
//!
//! - **`find_free_port`**: Asks the OS for an ephemeral TCP port by binding
//!   `:0` and closing the listener straight away. Engines that do not assign
//!   host ports themselves (rootless containerd) are given this port. The
//!   port can be taken by another process between discovery and use; callers
//!   that care must retry on a bind conflict.
//! - **`check_port_available`**: Verifies that a user-requested port can be
//!   bound on localhost before any container is created.
//!
use crate::core::error::{engine_output_contains, DeployError, Result};
use anyhow::{anyhow, Context};
use tokio::net::TcpListener;
use tracing::debug;

/// Fragments engines print when a published host port is already bound.
const PORT_CONFLICT_MARKERS: &[&str] = &[
    "address already in use",
    "port is already allocated",
    "bind: address already in use",
];

/// Returns a currently unused TCP port chosen by the OS.
pub async fn find_free_port() -> Result<u16> {
    let listener = TcpListener::bind(("0.0.0.0", 0))
        .await
        .context("Failed to bind an ephemeral port")?;
    let port = listener
        .local_addr()
        .context("Failed to read the ephemeral port")?
        .port();
    drop(listener);
    debug!("Discovered free port {}", port);
    Ok(port)
}

/// Fails with `DeployError::PortUnavailable` if `port` cannot be bound on 127.0.0.1.
pub async fn check_port_available(port: u16) -> Result<()> {
    match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            debug!("Port {} is not bindable: {}", port, e);
            Err(anyhow!(DeployError::PortUnavailable { port }))
        }
    }
}

/// True when an engine error reports a host port that was already taken.
pub fn is_port_conflict(err: &anyhow::Error) -> bool {
    engine_output_contains(err, PORT_CONFLICT_MARKERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::is_deploy_error;

    #[tokio::test]
    async fn test_find_free_port_is_bindable() {
        let port = find_free_port().await.unwrap();
        assert_ne!(port, 0);
        check_port_available(port).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_port_available_detects_taken_port() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let err = check_port_available(port).await.unwrap_err();
        assert!(is_deploy_error(&err, |de| matches!(
            de,
            DeployError::PortUnavailable { port: p } if *p == port
        )));
    }

    #[test]
    fn test_is_port_conflict() {
        let err = anyhow!(DeployError::ExternalCommand {
            cmd: "nerdctl run".into(),
            status: "exit status: 1".into(),
            output: "listen tcp 127.0.0.1:40001: bind: address already in use".into(),
        });
        assert!(is_port_conflict(&err));
        assert!(!is_port_conflict(&anyhow!("image not found")));
    }
}
