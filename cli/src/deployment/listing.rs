//! # Deployment Listing and Selection
//!
//! File: cli/src/deployment/listing.rs
//!
//! ## Overview
//!
//! Local containers and Atlas clusters are queried independently and merged
//! local first. With no `--type`, a source that fails is dropped with a
//! warning and the other source's results are still returned. Only when both
//! fail does the listing fail. An unauthenticated Atlas source is dropped
//! silently, since most local users never log in.
//!
//! With an explicit `--type`, only that source is queried and its error is
//! returned as-is.
//!
//! Selection narrows a listing to exactly one deployment: by name when one
//! is given, otherwise by the allowed states (Atlas deployments are never
//! filtered by state). Interactive choice is not offered, so zero matches is
//! `DeploymentNotFound` and several is `AmbiguousDeployment`.
//!
use super::atlas::ListOptions;
use super::state::{ContainerState, Deployment, DeploymentKind, StateName};
use super::{Coordinator, CONTAINER_LABEL, VERSION_LABEL};
use crate::common::container::Container;
use crate::core::error::{is_deploy_error, DeployError, Result};
use anyhow::anyhow;
use tracing::{debug, instrument, warn};

/// Builds the canonical view of a local deployment container.
pub fn local_deployment(container: &Container) -> Deployment {
    Deployment {
        kind: DeploymentKind::Local,
        name: container.name().to_string(),
        mongodb_version: container
            .labels
            .get(VERSION_LABEL)
            .cloned()
            .unwrap_or_default(),
        state: StateName::from(&ContainerState::from_engine(&container.state)),
    }
}

impl Coordinator {
    #[instrument(parent = &self.span, skip(self))]
    pub async fn local_deployments(&self) -> Result<Vec<Deployment>> {
        self.engine.ready().await?;
        let mut containers = self.engine.container_list(&[CONTAINER_LABEL]).await?;
        containers.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(containers.iter().map(local_deployment).collect())
    }

    #[instrument(parent = &self.span, skip(self))]
    pub async fn atlas_deployments(&self) -> Result<Vec<Deployment>> {
        if !self.store.is_authenticated() {
            return Err(anyhow!(DeployError::Unauthenticated));
        }
        let project_id = self.project_id()?;
        let clusters = self
            .store
            .project_clusters(project_id, &ListOptions::default())
            .await?;
        Ok(clusters
            .into_iter()
            .map(|c| Deployment {
                kind: DeploymentKind::Atlas,
                state: if c.paused {
                    StateName::Paused
                } else {
                    StateName::from_label(&c.state_name)
                },
                name: c.name,
                mongodb_version: c.mongodb_version,
            })
            .collect())
    }

    /// Lists deployments of `kind`, or of both kinds when `None`.
    #[instrument(parent = &self.span, skip(self))]
    pub async fn list(&self, kind: Option<DeploymentKind>) -> Result<Vec<Deployment>> {
        match kind {
            Some(DeploymentKind::Local) => return self.local_deployments().await,
            Some(DeploymentKind::Atlas) => return self.atlas_deployments().await,
            None => {}
        }

        let (local, atlas) = tokio::join!(self.local_deployments(), self.atlas_deployments());
        match (local, atlas) {
            (Ok(mut local), Ok(atlas)) => {
                local.extend(atlas);
                Ok(local)
            }
            (Ok(local), Err(e)) => {
                if is_deploy_error(&e, |de| matches!(de, DeployError::Unauthenticated)) {
                    debug!("Skipping Atlas deployments: {}", e);
                } else {
                    warn!("Warning: failed to retrieve Atlas deployments because \"{:#}\"", e);
                }
                Ok(local)
            }
            (Err(e), Ok(atlas)) => {
                warn!("Warning: failed to retrieve Local deployments because \"{:#}\"", e);
                Ok(atlas)
            }
            (Err(local_err), Err(atlas_err)) => {
                debug!("Atlas listing failed: {:#}", atlas_err);
                Err(local_err.context(DeployError::AllSourcesFailed))
            }
        }
    }

    /// Picks the single deployment named `name` (or, without a name, the single
    /// deployment in one of `states`). An empty `states` allows any state.
    #[instrument(parent = &self.span, skip(self))]
    pub async fn select(
        &self,
        name: Option<&str>,
        kind: Option<DeploymentKind>,
        states: &[StateName],
    ) -> Result<Deployment> {
        let deployments = self.list(kind).await?;
        let candidates: Vec<Deployment> = match name {
            Some(name) => deployments.into_iter().filter(|d| d.name == name).collect(),
            None if states.is_empty() => deployments,
            None => deployments
                .into_iter()
                .filter(|d| d.kind == DeploymentKind::Atlas || states.contains(&d.state))
                .collect(),
        };

        let label = name.unwrap_or("<any>").to_string();
        let mut candidates = candidates.into_iter();
        let deployment = match (candidates.next(), candidates.next()) {
            (Some(d), None) => d,
            (None, _) => return Err(anyhow!(DeployError::DeploymentNotFound { name: label })),
            (Some(_), Some(_)) => {
                return Err(anyhow!(DeployError::AmbiguousDeployment { name: label }))
            }
        };

        if deployment.kind == DeploymentKind::Local
            && !states.is_empty()
            && !states.contains(&deployment.state)
        {
            return Err(anyhow!(DeployError::UnexpectedState {
                name: deployment.name,
                state: deployment.state.to_string(),
            }));
        }
        Ok(deployment)
    }
}
