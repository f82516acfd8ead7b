//! # mdbdeploy Connect Handler
//!
//! File: cli/src/commands/connect.rs
//!
//! Prints the connection string of a deployment. A local deployment that is
//! stopped or paused is started first, so the printed string is usable
//! straight away.
//!
use super::{build_coordinator, load_config, DeploymentArgs, GlobalOpts};
use crate::core::error::Result;
use crate::deployment::{DeploymentKind, StateName};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Print the connection string of a deployment")]
pub struct ConnectArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,

    /// User to embed in a local connection string.
    #[arg(long)]
    username: Option<String>,

    /// Password to embed in a local connection string.
    #[arg(long, env = "MDBDEPLOY_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

const CONNECTABLE: [StateName; 3] = [StateName::Idle, StateName::Stopped, StateName::Paused];

pub async fn handle_connect(args: ConnectArgs, globals: &GlobalOpts) -> Result<()> {
    let config = load_config(globals)?;
    let coordinator = build_coordinator(globals, &config).await?;
    let deployment = coordinator
        .select(
            args.deployment.name.as_deref(),
            args.deployment.kind,
            &CONNECTABLE,
        )
        .await?;

    if deployment.kind == DeploymentKind::Local && deployment.state != StateName::Idle {
        eprintln!("Starting deployment {}...", deployment.name);
        coordinator.start(&deployment).await?;
    }

    let connection = coordinator
        .connection_string(
            &deployment,
            args.username.as_deref(),
            args.password.as_deref(),
        )
        .await?;
    println!("{}", connection);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_args() {
        let args =
            ConnectArgs::try_parse_from(["connect", "dev1", "--type", "LOCAL", "--username", "u"])
                .unwrap();
        assert_eq!(args.deployment.name.as_deref(), Some("dev1"));
        assert_eq!(args.deployment.kind, Some(DeploymentKind::Local));
        assert_eq!(args.username.as_deref(), Some("u"));
    }

    #[test]
    fn test_connect_without_name() {
        let args = ConnectArgs::try_parse_from(["connect"]).unwrap();
        assert!(args.deployment.name.is_none());
        assert!(args.deployment.kind.is_none());
    }
}
