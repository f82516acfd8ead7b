//! In-memory engine and cluster store for coordinator tests. Clones share
//! state, so a test can keep a handle after boxing one into a `Coordinator`.

use super::atlas::{ClusterConnection, ClusterDescription, ClusterStore, ListOptions};
use super::{Coordinator, Settings, CONTAINER_LABEL, VERSION_LABEL};
use crate::common::container::{
    Container, Engine, HealthStatus, Image, ImageHealthCheck, InspectData, RunFlags,
};
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn engine_failure(cmd: &str, stderr: &str) -> anyhow::Error {
    anyhow!(DeployError::ExternalCommand {
        cmd: cmd.to_string(),
        status: "exit status: 1".to_string(),
        output: stderr.to_string(),
    })
}

pub fn container(name: &str, state: &str, version: &str) -> Container {
    let mut labels = BTreeMap::new();
    let (key, value) = CONTAINER_LABEL.split_once('=').unwrap();
    labels.insert(key.to_string(), value.to_string());
    labels.insert(VERSION_LABEL.to_string(), version.to_string());
    Container {
        id: format!("id-{}", name),
        names: vec![name.to_string()],
        state: state.to_string(),
        image: "mongodb/mongodb-atlas-local:8".to_string(),
        ports: Vec::new(),
        labels,
    }
}

#[derive(Default)]
struct EngineState {
    containers: Vec<Container>,
    health: VecDeque<HealthStatus>,
    local_image: bool,
    image_check: Option<ImageHealthCheck>,
    list_error: Option<String>,
    pull_error: Option<String>,
    run_error: Option<String>,
    inspect: Vec<InspectData>,
    calls: Vec<String>,
    last_run: Option<RunFlags>,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    fn with(self, f: impl FnOnce(&mut EngineState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_container(self, name: &str, state: &str, version: &str) -> Self {
        self.with(|s| s.containers.push(container(name, state, version)))
    }

    /// Health replies in order; the last one repeats. Defaults to `Healthy`.
    pub fn with_health(self, replies: Vec<HealthStatus>) -> Self {
        self.with(|s| s.health = replies.into())
    }

    pub fn with_local_image(self) -> Self {
        self.with(|s| s.local_image = true)
    }

    pub fn with_image_check(self, check: ImageHealthCheck) -> Self {
        self.with(|s| s.image_check = Some(check))
    }

    pub fn with_inspect(self, data: InspectData) -> Self {
        self.with(|s| s.inspect.push(data))
    }

    pub fn failing_list(self, stderr: &str) -> Self {
        self.with(|s| s.list_error = Some(stderr.to_string()))
    }

    pub fn failing_pull(self, stderr: &str) -> Self {
        self.with(|s| s.pull_error = Some(stderr.to_string()))
    }

    /// `run` leaves a `created` container behind and then fails.
    pub fn failing_run(self, stderr: &str) -> Self {
        self.with(|s| s.run_error = Some(stderr.to_string()))
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    pub fn last_run(&self) -> Option<RunFlags> {
        self.state.lock().unwrap().last_run.clone()
    }

    pub fn container_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn set_state(&self, names: &[&str], state: &str) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        for name in names {
            let c = s
                .containers
                .iter_mut()
                .find(|c| c.name() == *name)
                .ok_or_else(|| engine_failure("container", "Error: No such container"))?;
            c.state = state.to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl Engine for FakeEngine {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    async fn verify_version(&self) -> Result<()> {
        Ok(())
    }

    async fn container_list(&self, labels: &[&str]) -> Result<Vec<Container>> {
        self.record(format!("ls {}", labels.join(",")));
        let s = self.state.lock().unwrap();
        if let Some(err) = &s.list_error {
            return Err(engine_failure("container ls", err));
        }
        Ok(s.containers.clone())
    }

    async fn container_run(&self, image: &str, flags: &RunFlags) -> Result<String> {
        let name = flags.name.clone().unwrap_or_default();
        self.record(format!("run {} {}", name, image));
        let mut s = self.state.lock().unwrap();
        s.last_run = Some(flags.clone());
        let version = image.rsplit(':').next().unwrap_or_default().to_string();
        if let Some(err) = s.run_error.clone() {
            s.containers.push(container(&name, "created", &version));
            return Err(engine_failure("run", &err));
        }
        s.containers.push(container(&name, "running", &version));
        Ok(format!("id-{}", name))
    }

    async fn container_rm(&self, names: &[&str]) -> Result<()> {
        self.record(format!("rm {}", names.join(" ")));
        let mut state = self.state.lock().unwrap();
        if let Some(missing) = names
            .iter()
            .find(|n| !state.containers.iter().any(|c| c.name() == **n))
        {
            return Err(anyhow!("Error response from daemon: No such container: {}", missing));
        }
        state.containers.retain(|c| !names.contains(&c.name()));
        Ok(())
    }

    async fn container_start(&self, names: &[&str]) -> Result<()> {
        self.record(format!("start {}", names.join(" ")));
        self.set_state(names, "running")
    }

    async fn container_stop(&self, names: &[&str]) -> Result<()> {
        self.record(format!("stop {}", names.join(" ")));
        self.set_state(names, "exited")
    }

    async fn container_unpause(&self, names: &[&str]) -> Result<()> {
        self.record(format!("unpause {}", names.join(" ")));
        self.set_state(names, "running")
    }

    async fn container_inspect(&self, names: &[&str]) -> Result<Vec<InspectData>> {
        self.record(format!("inspect {}", names.join(" ")));
        Ok(self
            .state
            .lock()
            .unwrap()
            .inspect
            .iter()
            .filter(|d| names.contains(&d.name.trim_start_matches('/')))
            .cloned()
            .collect())
    }

    async fn container_logs(&self, name: &str) -> Result<Vec<String>> {
        self.record(format!("logs {}", name));
        Ok(vec!["starting mongod".to_string(), "waiting for connections".to_string()])
    }

    async fn container_health_status(&self, name: &str) -> Result<HealthStatus> {
        self.record(format!("health {}", name));
        let mut s = self.state.lock().unwrap();
        let status = if s.health.len() > 1 {
            s.health.pop_front()
        } else {
            s.health.front().copied()
        };
        Ok(status.unwrap_or(HealthStatus::Healthy))
    }

    async fn image_list(&self, references: &[&str]) -> Result<Vec<Image>> {
        self.record(format!("images {}", references.join(" ")));
        if self.state.lock().unwrap().local_image {
            Ok(vec![Image {
                id: "sha256:abc".to_string(),
                ..Default::default()
            }])
        } else {
            Ok(Vec::new())
        }
    }

    async fn image_pull(&self, name: &str) -> Result<()> {
        self.record(format!("pull {}", name));
        match &self.state.lock().unwrap().pull_error {
            Some(err) => Err(engine_failure("image pull", err)),
            None => Ok(()),
        }
    }

    async fn image_health_check(&self, name: &str) -> Result<Option<ImageHealthCheck>> {
        self.record(format!("image-health {}", name));
        Ok(self.state.lock().unwrap().image_check.clone())
    }

    async fn version(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "Client": { "Version": "0.0.0" } }))
    }
}

#[derive(Default)]
struct StoreState {
    authenticated: bool,
    clusters: Vec<ClusterDescription>,
    list_error: Option<String>,
    standard_srv: Option<String>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    fn with(self, f: impl FnOnce(&mut StoreState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn authenticated(self) -> Self {
        self.with(|s| s.authenticated = true)
    }

    pub fn with_cluster(self, name: &str, state_name: &str, paused: bool) -> Self {
        self.with(|s| {
            s.authenticated = true;
            s.clusters.push(ClusterDescription {
                name: name.to_string(),
                mongodb_version: "7.0.14".to_string(),
                state_name: state_name.to_string(),
                paused,
            })
        })
    }

    pub fn with_srv(self, srv: &str) -> Self {
        self.with(|s| s.standard_srv = Some(srv.to_string()))
    }

    pub fn failing(self, message: &str) -> Self {
        self.with(|s| {
            s.authenticated = true;
            s.list_error = Some(message.to_string())
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn call(&self, call: String) -> Result<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(call);
        if s.authenticated {
            Ok(())
        } else {
            Err(anyhow!(DeployError::Unauthenticated))
        }
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    fn is_authenticated(&self) -> bool {
        self.state.lock().unwrap().authenticated
    }

    async fn project_clusters(
        &self,
        project_id: &str,
        opts: &ListOptions,
    ) -> Result<Vec<ClusterDescription>> {
        self.call(format!("list {} {} {}", project_id, opts.page_num, opts.items_per_page))?;
        let s = self.state.lock().unwrap();
        match &s.list_error {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(s.clusters.clone()),
        }
    }

    async fn pause_cluster(&self, project_id: &str, name: &str) -> Result<()> {
        self.call(format!("pause {} {}", project_id, name))
    }

    async fn start_cluster(&self, project_id: &str, name: &str) -> Result<()> {
        self.call(format!("start {} {}", project_id, name))
    }

    async fn delete_cluster(&self, project_id: &str, name: &str) -> Result<()> {
        self.call(format!("delete {} {}", project_id, name))
    }

    async fn atlas_cluster(&self, project_id: &str, name: &str) -> Result<ClusterConnection> {
        self.call(format!("describe {} {}", project_id, name))?;
        Ok(ClusterConnection {
            standard_srv: self.state.lock().unwrap().standard_srv.clone(),
        })
    }
}

pub fn test_settings() -> Settings {
    Settings {
        project_id: Some("proj".to_string()),
        health_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(5),
        ..Settings::default()
    }
}

pub fn coordinator(engine: FakeEngine, store: FakeStore) -> Coordinator {
    Coordinator::new(Box::new(engine), Box::new(store), test_settings())
}
