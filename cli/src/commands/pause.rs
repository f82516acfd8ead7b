//! # mdbdeploy Pause Handler
//!
//! File: cli/src/commands/pause.rs
//!
//! Pauses a deployment. Local deployments are stopped (not frozen), so
//! `start` later restarts mongod cleanly. Atlas clusters are paused
//! through the cluster store.
//!
use super::{build_coordinator, load_config, DeploymentArgs, GlobalOpts};
use crate::core::error::Result;
use crate::deployment::StateName;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Pause a deployment")]
pub struct PauseArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,
}

const PAUSABLE: [StateName; 3] = [StateName::Idle, StateName::Paused, StateName::Stopped];

pub async fn handle_pause(args: PauseArgs, globals: &GlobalOpts) -> Result<()> {
    let config = load_config(globals)?;
    let coordinator = build_coordinator(globals, &config).await?;
    let deployment = coordinator
        .select(args.deployment.name.as_deref(), args.deployment.kind, &PAUSABLE)
        .await?;
    coordinator.pause(&deployment).await?;
    println!("Pausing deployment '{}'.", deployment.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_args() {
        let args = PauseArgs::try_parse_from(["pause", "dev1"]).unwrap();
        assert_eq!(args.deployment.name.as_deref(), Some("dev1"));
        assert!(PauseArgs::try_parse_from(["pause", "--type", "CLOUD"]).is_err());
    }
}
