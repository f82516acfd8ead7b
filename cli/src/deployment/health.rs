//! # Health Wait
//!
//! File: cli/src/deployment/health.rs
//!
//! Polls a container's health until it settles. `Starting` is polled again
//! after `Settings::poll_interval`; `Healthy` ends the wait; `Unhealthy` and
//! `None` (no check configured) fail it. The whole loop runs under
//! `Settings::health_timeout`; cancelling or timing out drops the in-flight
//! engine call, which kills its subprocess.
//!
use super::Coordinator;
use crate::common::container::HealthStatus;
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use tracing::{debug, instrument};

impl Coordinator {
    #[instrument(parent = &self.span, skip(self))]
    pub async fn wait_healthy(&self, name: &str) -> Result<()> {
        let poll = async {
            loop {
                match self.engine.container_health_status(name).await? {
                    HealthStatus::Healthy => return Ok::<(), anyhow::Error>(()),
                    HealthStatus::Unhealthy => {
                        return Err(anyhow!(DeployError::Unhealthy {
                            name: name.to_string()
                        }))
                    }
                    HealthStatus::None => {
                        return Err(anyhow!(DeployError::NoHealthCheck {
                            name: name.to_string()
                        }))
                    }
                    HealthStatus::Starting => {
                        debug!("Deployment '{}' is still starting", name);
                        tokio::time::sleep(self.settings.poll_interval).await;
                    }
                }
            }
        };

        tokio::time::timeout(self.settings.health_timeout, poll)
            .await
            .map_err(|_| {
                anyhow!(DeployError::HealthTimeout {
                    name: name.to_string()
                })
            })?
    }

    /// Writes the container's logs to the debug log. Failures are ignored.
    pub(crate) async fn dump_logs(&self, name: &str) {
        match self.engine.container_logs(name).await {
            Ok(lines) => {
                for line in lines.iter().filter(|l| !l.is_empty()) {
                    debug!("{}: {}", name, line);
                }
            }
            Err(e) => debug!("Could not read logs of '{}': {:#}", name, e),
        }
    }
}
