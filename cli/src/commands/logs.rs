//! # mdbdeploy Logs Handler
//!
//! File: cli/src/commands/logs.rs
//!
//! Prints the log lines of a local deployment. Atlas deployments report
//! that log download is not supported.
//!
use super::{build_coordinator, load_config, DeploymentArgs, GlobalOpts};
use crate::core::error::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Print the logs of a local deployment")]
pub struct LogsArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,
}

pub async fn handle_logs(args: LogsArgs, globals: &GlobalOpts) -> Result<()> {
    let config = load_config(globals)?;
    let coordinator = build_coordinator(globals, &config).await?;
    let deployment = coordinator
        .select(args.deployment.name.as_deref(), args.deployment.kind, &[])
        .await?;
    for line in coordinator.logs(&deployment).await? {
        println!("{}", line);
    }
    Ok(())
}
