//! # Engine Selection
//!
//! File: cli/src/common/container/select.rs
//!
//! Chooses the engine for one invocation. An explicit `EngineKind` is used
//! as-is. `Auto` probes the default candidates in order (Docker, then
//! containerd) and takes the first whose binary is present and whose version
//! query answers within the probe timeout. When none answers, the first
//! candidate is returned so that the failure surfaces later with that
//! engine's own error message.
//!
use super::containerd::ContainerdEngine;
use super::docker::DockerEngine;
use super::podman::PodmanEngine;
use super::{Engine, EngineKind};
use crate::core::error::Result;
use anyhow::anyhow;
use std::time::Duration;
use tracing::{debug, info};

/// True when `engine` is installed and answers a version query in time.
pub async fn probe(engine: &dyn Engine, timeout: Duration) -> bool {
    let check = async {
        engine.ready().await?;
        engine.verify_version().await
    };
    match tokio::time::timeout(timeout, check).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("Engine {} is not usable: {:#}", engine.name(), e);
            false
        }
        Err(_) => {
            debug!("Engine {} did not answer within {:?}", engine.name(), timeout);
            false
        }
    }
}

/// Returns the first ready candidate, or the first candidate when none is ready.
pub async fn select_first_ready(
    candidates: Vec<Box<dyn Engine>>,
    timeout: Duration,
) -> Result<Box<dyn Engine>> {
    let mut ready = None;
    for (idx, engine) in candidates.iter().enumerate() {
        if probe(engine.as_ref(), timeout).await {
            ready = Some(idx);
            break;
        }
    }

    let idx = match ready {
        Some(idx) => idx,
        None => {
            debug!("No container engine answered, falling back to the first candidate");
            0
        }
    };
    candidates
        .into_iter()
        .nth(idx)
        .ok_or_else(|| anyhow!("no container engine candidates to choose from"))
}

/// Docker first, then containerd.
pub fn default_candidates() -> Vec<Box<dyn Engine>> {
    vec![
        Box::new(DockerEngine::new()),
        Box::new(ContainerdEngine::new()),
    ]
}

/// Builds the engine for `kind`, probing the defaults for `EngineKind::Auto`.
pub async fn engine_for(kind: EngineKind, probe_timeout: Duration) -> Result<Box<dyn Engine>> {
    let engine: Box<dyn Engine> = match kind {
        EngineKind::Docker => Box::new(DockerEngine::new()),
        EngineKind::Containerd => Box::new(ContainerdEngine::new()),
        EngineKind::Podman => Box::new(PodmanEngine::new()),
        EngineKind::Auto => select_first_ready(default_candidates(), probe_timeout).await?,
    };
    info!("Using container engine: {}", engine.name());
    Ok(engine)
}
