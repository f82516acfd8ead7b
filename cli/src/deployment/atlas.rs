//! # Atlas Cluster Store
//!
//! File: cli/src/deployment/atlas.rs
//!
//! The coordinator reaches cloud clusters only through `ClusterStore`. The
//! REST client behind it lives outside this crate. The binary ships with
//! `OfflineClusterStore`, which answers every call with `Unauthenticated`
//! when no API keys are configured and with `Unsupported` otherwise, so
//! listings degrade to local deployments only.
//!
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use async_trait::async_trait;

pub const DEFAULT_PAGE: u32 = 1;
pub const MAX_ITEMS_PER_PAGE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_num: u32,
    pub items_per_page: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_num: DEFAULT_PAGE,
            items_per_page: MAX_ITEMS_PER_PAGE,
        }
    }
}

/// One cluster as reported by the project cluster listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterDescription {
    pub name: String,
    pub mongodb_version: String,
    pub state_name: String,
    /// Paused clusters still report `IDLE` as their state name.
    pub paused: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterConnection {
    pub standard_srv: Option<String>,
}

#[async_trait]
pub trait ClusterStore: Send + Sync {
    fn is_authenticated(&self) -> bool;

    async fn project_clusters(
        &self,
        project_id: &str,
        opts: &ListOptions,
    ) -> Result<Vec<ClusterDescription>>;

    async fn pause_cluster(&self, project_id: &str, name: &str) -> Result<()>;
    async fn start_cluster(&self, project_id: &str, name: &str) -> Result<()>;
    async fn delete_cluster(&self, project_id: &str, name: &str) -> Result<()>;
    async fn atlas_cluster(&self, project_id: &str, name: &str) -> Result<ClusterConnection>;
}

/// A store with no network access.
#[derive(Debug, Clone, Default)]
pub struct OfflineClusterStore {
    authenticated: bool,
}

impl OfflineClusterStore {
    pub fn new(authenticated: bool) -> Self {
        Self { authenticated }
    }

    fn refuse<T>(&self) -> Result<T> {
        if self.authenticated {
            Err(anyhow!(DeployError::Unsupported(
                "Atlas API access in this build".to_string()
            )))
        } else {
            Err(anyhow!(DeployError::Unauthenticated))
        }
    }
}

#[async_trait]
impl ClusterStore for OfflineClusterStore {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn project_clusters(&self, _: &str, _: &ListOptions) -> Result<Vec<ClusterDescription>> {
        self.refuse()
    }

    async fn pause_cluster(&self, _: &str, _: &str) -> Result<()> {
        self.refuse()
    }

    async fn start_cluster(&self, _: &str, _: &str) -> Result<()> {
        self.refuse()
    }

    async fn delete_cluster(&self, _: &str, _: &str) -> Result<()> {
        self.refuse()
    }

    async fn atlas_cluster(&self, _: &str, _: &str) -> Result<ClusterConnection> {
        self.refuse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::is_deploy_error;

    #[tokio::test]
    async fn test_offline_store_refusals() {
        let anonymous = OfflineClusterStore::new(false);
        let err = anonymous
            .project_clusters("p", &ListOptions::default())
            .await
            .unwrap_err();
        assert!(is_deploy_error(&err, |de| matches!(de, DeployError::Unauthenticated)));

        let keyed = OfflineClusterStore::new(true);
        let err = keyed.pause_cluster("p", "c").await.unwrap_err();
        assert!(is_deploy_error(&err, |de| matches!(de, DeployError::Unsupported(_))));
    }

    #[test]
    fn test_default_list_options() {
        let opts = ListOptions::default();
        assert_eq!((opts.page_num, opts.items_per_page), (1, 500));
    }
}
