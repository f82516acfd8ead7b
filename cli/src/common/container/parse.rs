//! # Engine Output Parsers
//!
//! File: cli/src/common/container/parse.rs
//!
//! ## Overview
//!
//! Engines disagree on how they print the same logical answer:
//!
//! - Docker prints one JSON object per line for `--format json` listings,
//!   Podman prints a JSON array, nerdctl does either depending on version.
//!   `parse_json_list` accepts both, trying the array first.
//! - `Names` is a string (Docker, nerdctl) or an array (Podman).
//! - `Labels` is a map (Podman) or a comma-joined `k=v` string (Docker,
//!   nerdctl). Both normalize to a map.
//! - `Ports` is the `->` grammar string or a list of port objects (Podman).
//! - The lifecycle state lives in `State`, or only in a human `Status`
//!   such as `Up 2 minutes` (nerdctl).
//!
//! Version strings are compared leniently: a leading `v` and any pre-release
//! or build suffix are ignored.
//!
use super::ports::parse_port_mappings;
use super::types::{Container, PortMapping};
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Decodes a JSON array, falling back to a stream of objects (NDJSON or a
/// single object). Fails only when both readings fail.
pub fn parse_json_list<T: DeserializeOwned>(buf: &[u8], what: &str) -> Result<Vec<T>> {
    let text = String::from_utf8_lossy(buf);
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    trace!("Parsing {} from: {}", what, text);

    let array_err = match serde_json::from_str::<Vec<T>>(text) {
        Ok(items) => return Ok(items),
        Err(e) => e,
    };

    serde_json::Deserializer::from_str(text)
        .into_iter::<T>()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|stream_err| {
            anyhow!(DeployError::Parse {
                what: what.to_string(),
                reason: format!("not a JSON array ({}) nor JSON lines ({})", array_err, stream_err),
            })
        })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLabels {
    Map(BTreeMap<String, String>),
    Joined(String),
}

#[derive(Debug, Deserialize)]
struct RawPortObject {
    #[serde(default)]
    host_ip: String,
    #[serde(default)]
    host_port: u16,
    #[serde(default)]
    container_port: u16,
    #[serde(default)]
    protocol: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPorts {
    Joined(String),
    List(Vec<RawPortObject>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawContainer {
    #[serde(default, rename = "ID", alias = "Id")]
    id: String,
    #[serde(default)]
    names: Option<StringOrList>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    image: String,
    #[serde(default)]
    ports: Option<RawPorts>,
    #[serde(default)]
    labels: Option<RawLabels>,
}

/// Parses a container listing from any supported engine.
pub fn parse_containers(buf: &[u8]) -> Result<Vec<Container>> {
    parse_json_list::<RawContainer>(buf, "container list")?
        .into_iter()
        .map(into_container)
        .collect()
}

fn into_container(raw: RawContainer) -> Result<Container> {
    let names = match raw.names {
        Some(StringOrList::One(name)) => name
            .split(',')
            .map(|n| n.trim().trim_start_matches('/').to_string())
            .filter(|n| !n.is_empty())
            .collect(),
        Some(StringOrList::Many(names)) => names,
        None => Vec::new(),
    };

    let state = match (raw.state, raw.status) {
        (Some(state), _) if !state.is_empty() => state,
        (_, Some(status)) => state_from_status(&status),
        _ => String::new(),
    };

    let ports = match raw.ports {
        Some(RawPorts::Joined(s)) => parse_port_mappings(&s)?,
        Some(RawPorts::List(list)) => list
            .into_iter()
            .map(|p| PortMapping {
                host_address: p.host_ip,
                host_port: p.host_port,
                container_port: p.container_port,
                container_protocol: p.protocol,
            })
            .collect(),
        None => Vec::new(),
    };

    let labels = match raw.labels {
        Some(RawLabels::Map(map)) => map,
        Some(RawLabels::Joined(s)) => parse_joined_labels(&s),
        None => BTreeMap::new(),
    };

    Ok(Container {
        id: raw.id,
        names,
        state,
        image: raw.image,
        ports,
        labels,
    })
}

/// Normalizes a human status (`Up 3 minutes`, `Exited (0) 1 hour ago`) to the
/// lowercase lifecycle word the other engines report in `State`.
fn state_from_status(status: &str) -> String {
    let first = status
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match first.as_str() {
        "up" => "running".to_string(),
        _ => first,
    }
}

/// Parses `a=b,c=d`. A segment without `=` becomes a key with an empty value.
pub fn parse_joined_labels(s: &str) -> BTreeMap<String, String> {
    s.split(',')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (segment.to_string(), String::new()),
        })
        .collect()
}

/// A `major.minor.patch` triple compared numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parses `v27.3.1`, `1.7`, `4.9.3-dev` and similar. Missing components are zero.
pub fn parse_version(s: &str) -> Result<Version> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let core: &str = trimmed
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()
        .unwrap_or_default();

    let mut parts = core.split('.').filter(|p| !p.is_empty());
    let mut next = |required: bool| -> std::result::Result<u64, String> {
        match parts.next() {
            Some(p) => p.parse::<u64>().map_err(|e| e.to_string()),
            None if required => Err("no numeric version found".to_string()),
            None => Ok(0),
        }
    };
    let build = |reason: String| {
        anyhow!(DeployError::Parse {
            what: format!("version '{}'", s.trim()),
            reason,
        })
    };
    let major = next(true).map_err(build)?;
    let minor = next(false).map_err(build)?;
    let patch = next(false).map_err(build)?;
    Ok(Version::new(major, minor, patch))
}
