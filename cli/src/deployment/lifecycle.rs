//! # Deployment Lifecycle
//!
//! File: cli/src/deployment/lifecycle.rs
//!
//! ## Overview
//!
//! Transitions for a single deployment:
//!
//! - **Create** (local only): refuses a name any container already uses,
//!   pulls the image (keeping a local copy when the pull fails for reasons
//!   other than disk space), runs the container and waits for it to be
//!   healthy. Any failure after `run` removes the container again, unless
//!   the failure says the name belongs to someone else.
//! - **Start**: no-op on `IDLE`/`RESTARTING`, `start` on `STOPPED`,
//!   `unpause` on `PAUSED`, then waits for health. Anything else fails.
//! - **Pause**: no-op on `PAUSED`/`STOPPED`, `stop` on `IDLE`, otherwise fails.
//! - **Delete**: removes unconditionally.
//!
//! Atlas deployments delegate every transition to the `ClusterStore`.
//!
use super::state::{ContainerState, Deployment, DeploymentKind, StateName};
use super::{Coordinator, MONGOD_PORT, MONGOD_PORT_KEY};
use crate::common::container::{
    Container, HealthCheckFlags, PortMapping, RunFlags, VolumeMapping,
};
use crate::common::{network, system};
use crate::core::error::{
    engine_output_contains, is_deploy_error, is_disk_space_error, is_not_found_error, DeployError,
    Result,
};
use anyhow::{anyhow, Context};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const SUPPORTED_VERSIONS: &[&str] = &["7.0", "8.0"];
pub const DEFAULT_MDB_VERSION: &str = "8.0";
pub const INITDB_CONTAINER_PATH: &str = "/docker-entrypoint-initdb.d";

const TOOL_ENV: (&str, &str) = ("TOOL", "ATLASCLI");
const CREATE_STEPS: usize = 3;

/// Health check injected when the image carries none.
pub fn synthetic_health_check() -> HealthCheckFlags {
    HealthCheckFlags {
        cmd: vec!["/usr/local/bin/runner".to_string(), "healthcheck".to_string()],
        interval: Duration::from_secs(30),
        timeout: Duration::from_secs(30),
        start_period: Duration::from_secs(1),
        retries: 3,
    }
}

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*$").expect("deployment name pattern is valid")
});

pub fn validate_deployment_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(anyhow!(DeployError::ArgumentParsing(format!(
            "invalid deployment name: {}",
            name
        ))))
    }
}

/// `local<N>` with N below 10000.
pub fn generate_name() -> String {
    format!("local{}", rand::random_range(0..10_000))
}

/// Everything `setup --type LOCAL` needs to create a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSetup {
    pub name: String,
    pub mdb_version: String,
    /// Host port for mongod; `None` lets the engine choose.
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bind_ip_all: bool,
    pub initdb: Option<PathBuf>,
}

impl LocalSetup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mdb_version: DEFAULT_MDB_VERSION.to_string(),
            port: None,
            username: None,
            password: None,
            bind_ip_all: false,
            initdb: None,
        }
    }

    /// Checks the options that need no engine. Makes `initdb` absolute.
    pub fn validate(&mut self) -> Result<()> {
        validate_deployment_name(&self.name)?;

        if !SUPPORTED_VERSIONS.contains(&self.mdb_version.as_str()) {
            return Err(anyhow!(DeployError::ArgumentParsing(format!(
                "invalid MongoDB version '{}', supported versions: {}",
                self.mdb_version,
                SUPPORTED_VERSIONS.join(", ")
            ))));
        }
        if self.port == Some(0) {
            return Err(anyhow!(DeployError::ArgumentParsing(
                "invalid port 0, use a value between 1 and 65535".to_string()
            )));
        }
        if self.bind_ip_all && self.username.is_none() {
            return Err(anyhow!(DeployError::ArgumentParsing(
                "--bind-ip-all requires --username".to_string()
            )));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(anyhow!(DeployError::ArgumentParsing(
                "--username and --password must be given together".to_string()
            )));
        }

        if let Some(dir) = &self.initdb {
            let absolute = std::path::absolute(dir)
                .with_context(|| format!("Failed to resolve initdb path {}", dir.display()))?;
            if !absolute.is_dir() {
                return Err(anyhow!(DeployError::ArgumentParsing(format!(
                    "initdb path {} must be an existing directory",
                    absolute.display()
                ))));
            }
            self.initdb = Some(absolute);
        }
        Ok(())
    }

    /// `7.0` -> `7`.
    pub fn major_version(&self) -> &str {
        self.mdb_version.split('.').next().unwrap_or(&self.mdb_version)
    }
}

fn step(n: usize, message: &str) {
    warn!("{}/{}: {}", n, CREATE_STEPS, message);
}

fn credentials_prefix(username: Option<&str>, password: Option<&str>) -> String {
    match (username, password) {
        (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
        _ => String::new(),
    }
}

impl Coordinator {
    /// `<image>:<major>` for the requested MongoDB version.
    pub fn image_ref(&self, setup: &LocalSetup) -> String {
        format!("{}:{}", self.settings.image, setup.major_version())
    }

    /// Any container using `name`, with or without the deployment label.
    async fn find_container(&self, name: &str) -> Result<Option<Container>> {
        let containers = self.engine.container_list(&[]).await?;
        Ok(containers
            .into_iter()
            .find(|c| c.names.iter().any(|n| n == name)))
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        match self.engine.image_pull(image).await {
            Ok(()) => Ok(()),
            Err(e) if is_disk_space_error(&e) => Err(e.context(DeployError::InsufficientDiskSpace)),
            Err(e) => {
                let local = self.engine.image_list(&[image]).await.unwrap_or_else(|list_err| {
                    debug!("Could not list local images: {:#}", list_err);
                    Vec::new()
                });
                if local.is_empty() {
                    Err(e.context(DeployError::ImageDownload))
                } else {
                    warn!("Could not download the latest image, using the local copy: {:#}", e);
                    Ok(())
                }
            }
        }
    }

    async fn run_flags(&self, setup: &LocalSetup, image: &str) -> RunFlags {
        let mut env = BTreeMap::new();
        env.insert(TOOL_ENV.0.to_string(), TOOL_ENV.1.to_string());
        env.insert("DO_NOT_TRACK".to_string(), "1".to_string());
        if self.settings.debug {
            env.insert("RUNNER_LOG_FILE".to_string(), "/dev/stdout".to_string());
        }
        if let (Some(user), Some(pass)) = (&setup.username, &setup.password) {
            env.insert("MONGODB_INITDB_ROOT_USERNAME".to_string(), user.clone());
            env.insert("MONGODB_INITDB_ROOT_PASSWORD".to_string(), pass.clone());
        }

        let health = match self.engine.image_health_check(image).await {
            Ok(Some(check)) => {
                debug!("Image {} has a health check: {:?}", image, check.test);
                None
            }
            Ok(None) => Some(synthetic_health_check()),
            Err(e) => {
                debug!("Could not read the image health check, injecting one: {:#}", e);
                Some(synthetic_health_check())
            }
        };

        RunFlags {
            detach: true,
            name: Some(setup.name.clone()),
            hostname: Some(setup.name.clone()),
            env,
            ports: vec![PortMapping::new(setup.port.unwrap_or(0), MONGOD_PORT)],
            volumes: setup
                .initdb
                .iter()
                .map(|dir| VolumeMapping {
                    host_path: dir.display().to_string(),
                    container_path: INITDB_CONTAINER_PATH.to_string(),
                })
                .collect(),
            bind_ip_all: setup.bind_ip_all,
            health,
            ..Default::default()
        }
    }

    /// Removes the half-created container unless the name was never ours.
    async fn abort_create(&self, name: &str, err: anyhow::Error) -> anyhow::Error {
        if is_deploy_error(&err, |de| matches!(de, DeployError::DeploymentExists { .. })) {
            return err;
        }
        if self.settings.debug {
            self.dump_logs(name).await;
        }
        info!("Removing deployment '{}' after a failed setup", name);
        match self.engine.container_rm(&[name]).await {
            Ok(()) => {}
            Err(rm_err) if is_not_found_error(&rm_err) => {
                debug!("Nothing to remove for '{}'", name);
            }
            Err(rm_err) => warn!("Failed to remove deployment '{}': {:#}", name, rm_err),
        }
        err
    }

    #[instrument(parent = &self.span, skip(self, setup), fields(name = %setup.name))]
    pub async fn create_local(&self, setup: &LocalSetup) -> Result<Deployment> {
        let name = setup.name.as_str();
        self.engine.ready().await?;
        if let Some(existing) = self.find_container(name).await? {
            let state = StateName::from(&ContainerState::from_engine(&existing.state));
            return Err(anyhow!(DeployError::DeploymentExists {
                name: name.to_string(),
                state: state.to_string(),
            }));
        }

        system::check_minimum_requirements();
        if let Some(port) = setup.port {
            network::check_port_available(port).await?;
        }

        let image = self.image_ref(setup);
        step(1, "Downloading the latest MongoDB image to your local environment...");
        self.pull_image(&image).await?;

        step(2, &format!("Creating your deployment {}...", name));
        let flags = self.run_flags(setup, &image).await;
        if let Err(e) = self.engine.container_run(&image, &flags).await {
            let e = if is_disk_space_error(&e) {
                e.context(DeployError::InsufficientDiskSpace)
            } else if engine_output_contains(&e, &["is already in use"]) {
                e.context(DeployError::DeploymentExists {
                    name: name.to_string(),
                    state: "unknown".to_string(),
                })
            } else {
                e
            };
            return Err(self.abort_create(name, e).await);
        }

        step(3, "Waiting for your deployment to be ready...");
        if let Err(e) = self.wait_healthy(name).await {
            return Err(self.abort_create(name, e).await);
        }

        info!("Deployment '{}' created", name);
        Ok(Deployment {
            kind: DeploymentKind::Local,
            name: name.to_string(),
            mongodb_version: setup.mdb_version.clone(),
            state: StateName::Idle,
        })
    }

    #[instrument(parent = &self.span, skip(self, deployment), fields(name = %deployment.name))]
    pub async fn start(&self, deployment: &Deployment) -> Result<()> {
        let name = deployment.name.as_str();
        match deployment.kind {
            DeploymentKind::Atlas => {
                if deployment.state == StateName::Idle {
                    info!("Atlas deployment '{}' is already running", name);
                    return Ok(());
                }
                self.store.start_cluster(self.project_id()?, name).await
            }
            DeploymentKind::Local => {
                match &deployment.state {
                    StateName::Idle | StateName::Restarting => {
                        info!("Deployment '{}' is already running", name);
                        return Ok(());
                    }
                    StateName::Stopped => self.engine.container_start(&[name]).await?,
                    StateName::Paused => self.engine.container_unpause(&[name]).await?,
                    other => {
                        return Err(anyhow!(DeployError::CannotStart {
                            name: name.to_string(),
                            state: other.to_string(),
                        }))
                    }
                }
                self.wait_healthy(name).await
            }
        }
    }

    #[instrument(parent = &self.span, skip(self, deployment), fields(name = %deployment.name))]
    pub async fn pause(&self, deployment: &Deployment) -> Result<()> {
        let name = deployment.name.as_str();
        match (deployment.kind, &deployment.state) {
            (DeploymentKind::Local, StateName::Paused | StateName::Stopped)
            | (DeploymentKind::Atlas, StateName::Paused) => {
                info!("Deployment '{}' is already paused", name);
                Ok(())
            }
            (DeploymentKind::Local, StateName::Idle) => self.engine.container_stop(&[name]).await,
            (DeploymentKind::Atlas, StateName::Idle) => {
                self.store.pause_cluster(self.project_id()?, name).await
            }
            (_, other) => Err(anyhow!(DeployError::UnexpectedState {
                name: name.to_string(),
                state: other.to_string(),
            })),
        }
    }

    #[instrument(parent = &self.span, skip(self, deployment), fields(name = %deployment.name))]
    pub async fn delete(&self, deployment: &Deployment) -> Result<()> {
        match deployment.kind {
            DeploymentKind::Local => {
                let name = deployment.name.as_str();
                self.engine.container_rm(&[name]).await.map_err(|e| {
                    if is_not_found_error(&e) {
                        e.context(DeployError::DeploymentNotFound {
                            name: name.to_string(),
                        })
                    } else {
                        e
                    }
                })
            }
            DeploymentKind::Atlas => {
                self.store
                    .delete_cluster(self.project_id()?, &deployment.name)
                    .await
            }
        }
    }

    #[instrument(parent = &self.span, skip(self, deployment), fields(name = %deployment.name))]
    pub async fn logs(&self, deployment: &Deployment) -> Result<Vec<String>> {
        match deployment.kind {
            DeploymentKind::Local => self.engine.container_logs(&deployment.name).await,
            DeploymentKind::Atlas => Err(anyhow!(DeployError::Unsupported(
                "downloading Atlas deployment logs".to_string()
            ))),
        }
    }

    /// The connection string for a running deployment.
    #[instrument(parent = &self.span, skip(self, deployment, password), fields(name = %deployment.name))]
    pub async fn connection_string(
        &self,
        deployment: &Deployment,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<String> {
        let name = deployment.name.as_str();
        match deployment.kind {
            DeploymentKind::Atlas => self
                .store
                .atlas_cluster(self.project_id()?, name)
                .await?
                .standard_srv
                .ok_or_else(|| {
                    anyhow!(DeployError::UnexpectedState {
                        name: name.to_string(),
                        state: "no connection string available".to_string(),
                    })
                }),
            DeploymentKind::Local => {
                let data = self
                    .engine
                    .container_inspect(&[name])
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        anyhow!(DeployError::DeploymentNotFound {
                            name: name.to_string()
                        })
                    })?;
                let port = data.host_port_for(MONGOD_PORT_KEY).ok_or_else(|| {
                    anyhow!(DeployError::Parse {
                        what: format!("port bindings of '{}'", name),
                        reason: format!("no host port published for {}", MONGOD_PORT_KEY),
                    })
                })?;
                Ok(format!(
                    "mongodb://{}localhost:{}/?directConnection=true",
                    credentials_prefix(username, password),
                    port
                ))
            }
        }
    }
}
