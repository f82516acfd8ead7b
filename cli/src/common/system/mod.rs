//! # mdbdeploy System Utilities (`common::system`)
//!
//! File: cli/src/common/system/mod.rs
//!
//! ## Overview
//!
//! Host inspection used by engine selection and deployment setup:
//!
//! - **`binary_on_path`**: Looks up an engine binary (`docker`, `nerdctl`,
//!   `lima`, `podman`) with the `which` crate.
//! - **`requires_vm`**: macOS and Windows run Linux containers inside a VM
//!   (Podman machine, Lima).
//! - **`HostResources`** / **`check_minimum_requirements`**: Reads available
//!   memory and CPU count through `sysinfo` and warns when the host is below
//!   what a local MongoDB deployment needs. Falling short never blocks setup.
//!
use sysinfo::System;
use tracing::{debug, warn};

pub const BYTES_IN_GB: u64 = 1024 * 1024 * 1024;
pub const MINIMUM_RAM_BYTES: u64 = 2 * BYTES_IN_GB;
pub const MINIMUM_CORES: usize = 2;

/// True when `name` resolves to an executable on `PATH`.
pub fn binary_on_path(name: &str) -> bool {
    match which::which(name) {
        Ok(path) => {
            debug!("Found '{}' at {}", name, path.display());
            true
        }
        Err(e) => {
            debug!("'{}' not found on PATH: {}", name, e);
            false
        }
    }
}

pub fn is_macos() -> bool {
    cfg!(target_os = "macos")
}

/// Containers run inside a VM on this platform.
pub fn requires_vm() -> bool {
    cfg!(any(target_os = "macos", target_os = "windows"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub available_memory: u64,
    pub cpus: usize,
}

impl HostResources {
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu();
        Self {
            available_memory: sys.available_memory(),
            cpus: sys.cpus().len(),
        }
    }

    /// Human-readable shortfalls against the minimum requirements.
    pub fn shortfalls(&self) -> Vec<String> {
        let mut found = Vec::new();
        if self.available_memory < MINIMUM_RAM_BYTES {
            found.push(format!(
                "system does not meet the minimum system requirements: required to have 2GB of ram available. {}Gb available.",
                self.available_memory / BYTES_IN_GB
            ));
        }
        if self.cpus < MINIMUM_CORES {
            found.push(format!(
                "system does not meet the minimum system requirements: required to have at least 2 cpu cores. {} cpu cores available.",
                self.cpus
            ));
        }
        found
    }
}

/// Logs a warning for every minimum requirement the host misses.
pub fn check_minimum_requirements() {
    for shortfall in HostResources::detect().shortfalls() {
        warn!("{}", shortfall);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfalls() {
        let healthy = HostResources {
            available_memory: 4 * BYTES_IN_GB,
            cpus: 8,
        };
        assert!(healthy.shortfalls().is_empty());

        let small = HostResources {
            available_memory: BYTES_IN_GB,
            cpus: 1,
        };
        let found = small.shortfalls();
        assert_eq!(found.len(), 2);
        assert!(found[0].contains("1Gb available"));
        assert!(found[1].contains("1 cpu cores available"));
    }

    #[test]
    fn test_binary_on_path() {
        assert!(binary_on_path("sh"));
        assert!(!binary_on_path("mdbdeploy-definitely-not-a-binary"));
    }
}
