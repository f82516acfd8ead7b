//! # Port Mapping Grammar
//!
//! File: cli/src/common/container/ports.rs
//!
//! Engines list published ports as a comma-separated string of
//! `host:hostPort->containerPort/proto` entries, for example
//! `0.0.0.0:32768->27017/tcp, :::32768->27017/tcp`. Everything left of `->`
//! is optional, and so is the protocol. A single value on the host side is
//! a port when it is numeric and a host address otherwise.
//!
//! `-p` flags use a different shape, `[host:][hostPort]:containerPort[/proto]`,
//! produced by `port_mapping_flag`.
//!
use super::types::PortMapping;
use crate::core::error::{DeployError, Result};
use anyhow::anyhow;

fn parse_error(reason: String) -> anyhow::Error {
    anyhow!(DeployError::Parse {
        what: "port mapping".to_string(),
        reason,
    })
}

/// Parses an engine's `Ports` column. An empty string yields no mappings.
pub fn parse_port_mappings(s: &str) -> Result<Vec<PortMapping>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',').map(|m| parse_port_mapping(m.trim())).collect()
}

fn parse_port_mapping(mapping: &str) -> Result<PortMapping> {
    let (host_part, container_part) = match mapping.split_once("->") {
        Some((host, container)) => (host, container),
        None => ("", mapping),
    };
    let (host_address, host_port) = split_host_port(host_part)
        .map_err(|reason| parse_error(format!("host side of '{}': {}", mapping, reason)))?;
    let (container_port, container_protocol) = split_port_protocol(container_part)
        .map_err(|reason| parse_error(format!("container side of '{}': {}", mapping, reason)))?;
    Ok(PortMapping {
        host_address,
        host_port,
        container_port,
        container_protocol,
    })
}

fn split_port_protocol(s: &str) -> std::result::Result<(u16, String), String> {
    let (port, protocol) = match s.rsplit_once('/') {
        Some((port, protocol)) => (port, protocol.to_string()),
        None => (s, String::new()),
    };
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {}", port, e))?;
    Ok((port, protocol))
}

fn split_host_port(s: &str) -> std::result::Result<(String, u16), String> {
    if s.is_empty() {
        return Ok((String::new(), 0));
    }
    match s.rsplit_once(':') {
        Some((host, port)) => port
            .parse::<u16>()
            .map(|p| (host.to_string(), p))
            .map_err(|e| format!("invalid port '{}': {}", port, e)),
        // A lone value is either a port or a host address.
        None => Ok(match s.parse::<u16>() {
            Ok(port) => (String::new(), port),
            Err(_) => (s.to_string(), 0),
        }),
    }
}

/// Renders a mapping in the listing grammar; `parse_port_mappings` reads it back.
pub fn format_port_mapping(pm: &PortMapping) -> String {
    let mut out = match (pm.host_address.is_empty(), pm.host_port) {
        (true, 0) => String::new(),
        (true, port) => format!("{}->", port),
        (false, 0) => format!("{}->", pm.host_address),
        (false, port) => format!("{}:{}->", pm.host_address, port),
    };
    out.push_str(&pm.container_port.to_string());
    if !pm.container_protocol.is_empty() {
        out.push('/');
        out.push_str(&pm.container_protocol);
    }
    out
}

/// Renders a mapping as the value of a `-p` flag.
pub fn port_mapping_flag(pm: &PortMapping) -> String {
    let mut out = String::new();
    if !pm.host_address.is_empty() {
        out.push_str(&pm.host_address);
        out.push(':');
    }
    if pm.host_port != 0 {
        out.push_str(&pm.host_port.to_string());
    }
    out.push(':');
    out.push_str(&pm.container_port.to_string());
    if !pm.container_protocol.is_empty() {
        out.push('/');
        out.push_str(&pm.container_protocol);
    }
    out
}
