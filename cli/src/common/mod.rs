//! # mdbdeploy Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//!
//! ## Overview
//!
//! This module is the root of the shared utilities the command handlers and
//! the deployment coordinator build on. Nothing here knows about MongoDB
//! deployments; these are the host-facing pieces.
//!
//! ## Architecture
//!
//! - **`container`**: The `Engine` trait and its Docker, Podman and containerd
//!   drivers, plus engine selection.
//! - **`network`**: Free-port discovery and host port availability checks.
//! - **`process`**: Spawning external commands behind the `CommandRunner` trait.
//! - **`system`**: Host inspection: OS, binaries on PATH, disk space, memory.
//! - **`ui`**: Plain-text table rendering for `list`.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::container::{select, EngineKind};
//! use crate::common::network::check_port_available;
//! ```
//!

/// Container engine drivers and selection.
pub mod container;
/// Port discovery and availability checks.
pub mod network;
/// External command execution.
pub mod process;
/// Host inspection (OS, tools, resources).
pub mod system;
/// Terminal output helpers.
pub mod ui;
