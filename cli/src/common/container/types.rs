//! # Canonical Container Data Model
//!
//! File: cli/src/common/container/types.rs
//!
//! Engine-agnostic structures every driver produces or consumes. Inspect and
//! image types deserialize straight from engine JSON; field aliases cover the
//! spelling differences between Docker, nerdctl and Podman (`Id`/`ID`,
//! `State`/`Status`).
//!
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// One published port. Every component except `container_port` is optional;
/// absent values are the empty string or `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub host_address: String,
    pub host_port: u16,
    pub container_port: u16,
    pub container_protocol: String,
}

impl PortMapping {
    pub fn new(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port,
            container_port,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMapping {
    pub host_path: String,
    pub container_path: String,
}

/// A container as reported by an engine's list command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    /// The first name is the deployment name.
    pub names: Vec<String>,
    /// Engine-native state (`running`, `exited`, ...).
    pub state: String,
    pub image: String,
    pub ports: Vec<PortMapping>,
    pub labels: BTreeMap<String, String>,
}

impl Container {
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }
}

/// Health check settings attached to `docker run`-style invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckFlags {
    pub cmd: Vec<String>,
    pub interval: Duration,
    pub timeout: Duration,
    pub start_period: Duration,
    pub retries: u32,
}

/// Engine-agnostic options for running a container. Each driver translates
/// these into its own CLI dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFlags {
    pub detach: bool,
    pub remove: bool,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMapping>,
    pub network: Option<String>,
    pub ip: Option<String>,
    pub entrypoint: Option<String>,
    /// Publish ports on every interface instead of 127.0.0.1.
    pub bind_ip_all: bool,
    pub health: Option<HealthCheckFlags>,
    /// Command placed after the image, followed by `args`.
    pub cmd: Option<String>,
    pub args: Vec<String>,
}

/// Health of a running container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// No health check is configured.
    None,
    Starting,
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Parses the engine's `.State.Health.Status` value. An empty value means
    /// the engine tracks no health for the container.
    pub fn from_engine(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "none" => Some(Self::None),
            "starting" => Some(Self::Starting),
            "healthy" => Some(Self::Healthy),
            "unhealthy" => Some(Self::Unhealthy),
            _ => None,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// Health check embedded in an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageHealthCheck {
    pub test: Vec<String>,
    pub interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub start_period: Option<Duration>,
    pub retries: Option<u32>,
}

/// Raw `Healthcheck` object as engines print it. Durations are nanoseconds.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HealthConfig {
    #[serde(default)]
    pub test: Option<Vec<String>>,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub start_period: Option<i64>,
    #[serde(default)]
    pub retries: Option<u32>,
}

impl HealthConfig {
    /// An absent or `NONE` test disables the check.
    pub fn is_enabled(&self) -> bool {
        match &self.test {
            Some(test) => !test.is_empty() && test[0] != "NONE",
            None => false,
        }
    }
}

impl From<HealthConfig> for ImageHealthCheck {
    fn from(raw: HealthConfig) -> Self {
        let nanos = |v: Option<i64>| v.filter(|n| *n > 0).map(|n| Duration::from_nanos(n as u64));
        Self {
            test: raw.test.unwrap_or_default(),
            interval: nanos(raw.interval),
            timeout: nanos(raw.timeout),
            start_period: nanos(raw.start_period),
            retries: raw.retries,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectHostPort {
    #[serde(default, alias = "HostIP")]
    pub host_ip: String,
    #[serde(default)]
    pub host_port: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectConfig {
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub healthcheck: Option<HealthConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectHostConfig {
    #[serde(default)]
    pub port_bindings: Option<BTreeMap<String, Option<Vec<InspectHostPort>>>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectNetworkSettings {
    #[serde(default)]
    pub ports: Option<BTreeMap<String, Option<Vec<InspectHostPort>>>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectHealth {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default, alias = "Healthcheck")]
    pub health: Option<InspectHealth>,
}

/// Point-in-time detail for one container.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct InspectData {
    #[serde(default, rename = "Id", alias = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub config: Option<InspectConfig>,
    #[serde(default)]
    pub host_config: Option<InspectHostConfig>,
    #[serde(default)]
    pub network_settings: Option<InspectNetworkSettings>,
    #[serde(default)]
    pub state: Option<InspectState>,
}

impl InspectData {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.config
            .as_ref()?
            .labels
            .as_ref()?
            .get(key)
            .map(String::as_str)
    }

    /// Host port bound to `container_port` (e.g. `27017/tcp`). Live network
    /// settings win over the configured bindings.
    pub fn host_port_for(&self, container_port: &str) -> Option<u16> {
        let from = |map: Option<&BTreeMap<String, Option<Vec<InspectHostPort>>>>| {
            map?.get(container_port)?
                .as_ref()?
                .iter()
                .find_map(|b| b.host_port.parse::<u16>().ok().filter(|p| *p != 0))
        };
        from(
            self.network_settings
                .as_ref()
                .and_then(|n| n.ports.as_ref()),
        )
        .or_else(|| {
            from(
                self.host_config
                    .as_ref()
                    .and_then(|h| h.port_bindings.as_ref()),
            )
        })
    }
}

/// An image known to an engine.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Image {
    #[serde(default, rename = "ID", alias = "Id")]
    pub id: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub names: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_from_engine() {
        assert_eq!(HealthStatus::from_engine(""), Some(HealthStatus::None));
        assert_eq!(HealthStatus::from_engine("healthy\n"), Some(HealthStatus::Healthy));
        assert_eq!(HealthStatus::from_engine("starting"), Some(HealthStatus::Starting));
        assert_eq!(HealthStatus::from_engine("bogus"), None);
    }

    #[test]
    fn test_host_port_prefers_network_settings() {
        let data: InspectData = serde_json::from_str(
            r#"{
                "Id": "abc",
                "Name": "/local1",
                "Config": {"Labels": {"version": "8.0.4"}},
                "HostConfig": {"PortBindings": {"27017/tcp": [{"HostIp": "127.0.0.1", "HostPort": "0"}]}},
                "NetworkSettings": {"Ports": {"27017/tcp": [{"HostIp": "127.0.0.1", "HostPort": "55001"}]}}
            }"#,
        )
        .unwrap();
        assert_eq!(data.host_port_for("27017/tcp"), Some(55001));
        assert_eq!(data.label("version"), Some("8.0.4"));
    }

    #[test]
    fn test_host_port_falls_back_to_port_bindings() {
        let data: InspectData = serde_json::from_str(
            r#"{
                "ID": "abc",
                "HostConfig": {"PortBindings": {"27017/tcp": [{"HostIp": "", "HostPort": "27018"}]}},
                "NetworkSettings": {"Ports": {"27017/tcp": null}}
            }"#,
        )
        .unwrap();
        assert_eq!(data.id, "abc");
        assert_eq!(data.host_port_for("27017/tcp"), Some(27018));
        assert_eq!(data.host_port_for("8080/tcp"), None);
    }

    #[test]
    fn test_health_config_conversion() {
        let raw = HealthConfig {
            test: Some(vec!["CMD".into(), "runner".into()]),
            interval: Some(30_000_000_000),
            timeout: Some(0),
            start_period: None,
            retries: Some(3),
        };
        assert!(raw.is_enabled());
        let check = ImageHealthCheck::from(raw);
        assert_eq!(check.interval, Some(Duration::from_secs(30)));
        assert_eq!(check.timeout, None);
        assert_eq!(check.retries, Some(3));

        let disabled = HealthConfig {
            test: Some(vec!["NONE".into()]),
            ..Default::default()
        };
        assert!(!disabled.is_enabled());
    }
}
