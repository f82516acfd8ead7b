//! # mdbdeploy Start Handler
//!
//! File: cli/src/commands/start.rs
//!
//! Starts a stopped or paused deployment. For local deployments the command
//! returns once the container reports healthy.
//!
use super::{build_coordinator, load_config, DeploymentArgs, GlobalOpts};
use crate::core::error::Result;
use crate::deployment::StateName;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Start a paused or stopped deployment")]
pub struct StartArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,
}

const STARTABLE: [StateName; 4] = [
    StateName::Stopped,
    StateName::Paused,
    StateName::Idle,
    StateName::Restarting,
];

pub async fn handle_start(args: StartArgs, globals: &GlobalOpts) -> Result<()> {
    let config = load_config(globals)?;
    let coordinator = build_coordinator(globals, &config).await?;
    let deployment = coordinator
        .select(args.deployment.name.as_deref(), args.deployment.kind, &STARTABLE)
        .await?;
    coordinator.start(&deployment).await?;
    println!("Starting deployment '{}'.", deployment.name);
    Ok(())
}
