//! # mdbdeploy Delete Handler
//!
//! File: cli/src/commands/delete.rs
//!
//! Deletes a deployment in any state. Local containers are force-removed
//! together with their anonymous volumes.
//!
use super::{build_coordinator, load_config, DeploymentArgs, GlobalOpts};
use crate::core::error::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Delete a deployment")]
pub struct DeleteArgs {
    #[command(flatten)]
    deployment: DeploymentArgs,
}

pub async fn handle_delete(args: DeleteArgs, globals: &GlobalOpts) -> Result<()> {
    let config = load_config(globals)?;
    let coordinator = build_coordinator(globals, &config).await?;
    let deployment = coordinator
        .select(args.deployment.name.as_deref(), args.deployment.kind, &[])
        .await?;
    coordinator.delete(&deployment).await?;
    println!("Deployment '{}' deleted.", deployment.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_args() {
        let args = DeleteArgs::try_parse_from(["delete", "old"]).unwrap();
        assert_eq!(args.deployment.name.as_deref(), Some("old"));
        assert!(DeleteArgs::try_parse_from(["delete", "a", "b"]).is_err());
    }
}
