//! # mdbdeploy Setup Handler
//!
//! File: cli/src/commands/setup.rs
//!
//! ## Overview
//!
//! Implements `mdbdeploy setup`, which creates a local MongoDB deployment in
//! the selected container engine and prints its connection string.
//!
//! ## Workflow
//!
//! 1. Resolve the deployment name (generated as `local<N>` when omitted) and
//!    validate every flag that needs no engine: name, MongoDB version, port,
//!    `--bind-ip-all` with credentials, `--initdb` directory.
//! 2. Build the coordinator, which selects the engine.
//! 3. `Coordinator::create_local` pulls the image, runs the container and
//!    waits for it to be healthy. A failed setup leaves nothing behind.
//!
//! ## Usage
//!
//! ```bash
//! mdbdeploy setup
//! mdbdeploy setup dev1 --mdb-version 7.0 --port 27018
//! mdbdeploy setup shared --bind-ip-all --username admin --password secret
//! mdbdeploy setup seeded --initdb ./fixtures/initdb
//! ```
//!
//! Creating Atlas clusters is not supported by this tool.
//!
use super::{build_coordinator, load_config, GlobalOpts};
use crate::core::error::{DeployError, Result};
use crate::deployment::lifecycle::{generate_name, LocalSetup, DEFAULT_MDB_VERSION};
use crate::deployment::DeploymentKind;
use anyhow::anyhow;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Create a local MongoDB deployment")]
pub struct SetupArgs {
    /// Name of the deployment. Generated as `local<N>` when omitted.
    name: Option<String>,

    /// Type of the deployment. Only LOCAL can be created.
    #[arg(long = "type", value_enum, ignore_case = true)]
    kind: Option<DeploymentKind>,

    /// MongoDB server version (7.0 or 8.0).
    #[arg(long, default_value = DEFAULT_MDB_VERSION)]
    mdb_version: String,

    /// Host port for mongod. The engine picks a free one when omitted.
    #[arg(long)]
    port: Option<u16>,

    /// Root user created in the deployment.
    #[arg(long)]
    username: Option<String>,

    /// Password for `--username`.
    #[arg(long, env = "MDBDEPLOY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Publish the port on all interfaces instead of 127.0.0.1. Requires `--username`.
    #[arg(long)]
    bind_ip_all: bool,

    /// Directory of scripts run on first start (mounted at /docker-entrypoint-initdb.d).
    #[arg(long)]
    initdb: Option<PathBuf>,
}

pub async fn handle_setup(args: SetupArgs, globals: &GlobalOpts) -> Result<()> {
    if args.kind == Some(DeploymentKind::Atlas) {
        return Err(anyhow!(DeployError::Unsupported(
            "creating Atlas deployments".to_string()
        )));
    }

    let config = load_config(globals)?;
    let mut setup = LocalSetup::new(args.name.unwrap_or_else(generate_name));
    setup.mdb_version = args.mdb_version;
    setup.port = args.port;
    setup.username = args.username;
    setup.password = args.password;
    setup.bind_ip_all = args.bind_ip_all || config.local.bind_ip_all;
    setup.initdb = args
        .initdb
        .or_else(|| config.local.initdb.as_ref().map(PathBuf::from));
    setup.validate()?;
    info!("Setting up local deployment '{}' ({})", setup.name, setup.mdb_version);

    let coordinator = build_coordinator(globals, &config).await?;
    let deployment = coordinator.create_local(&setup).await?;
    let connection = coordinator
        .connection_string(
            &deployment,
            setup.username.as_deref(),
            setup.password.as_deref(),
        )
        .await?;

    println!("Deployment {} created.", deployment.name);
    println!("Connection string: \"{}\"", connection);
    Ok(())
}
