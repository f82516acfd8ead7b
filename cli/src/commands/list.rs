//! # mdbdeploy List Handler
//!
//! File: cli/src/commands/list.rs
//!
//! Implements `mdbdeploy list`: local deployments first, then Atlas
//! deployments, as a `NAME TYPE MDB VER STATE` table on stdout. Without
//! `--type`, a source that cannot be reached is skipped with a warning.
//!
use super::{build_coordinator, load_config, GlobalOpts};
use crate::common::ui::render_table;
use crate::core::error::Result;
use crate::deployment::{Deployment, DeploymentKind};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "List local and Atlas deployments")]
pub struct ListArgs {
    /// Only list deployments of this type.
    #[arg(long = "type", value_enum, ignore_case = true)]
    kind: Option<DeploymentKind>,
}

pub const HEADERS: [&str; 4] = ["NAME", "TYPE", "MDB VER", "STATE"];

pub fn render(deployments: &[Deployment]) -> String {
    let rows: Vec<Vec<String>> = deployments
        .iter()
        .map(|d| {
            vec![
                d.name.clone(),
                d.kind.to_string(),
                d.mongodb_version.clone(),
                d.state.to_string(),
            ]
        })
        .collect();
    render_table(&HEADERS, &rows)
}

pub async fn handle_list(args: ListArgs, globals: &GlobalOpts) -> Result<()> {
    let config = load_config(globals)?;
    let coordinator = build_coordinator(globals, &config).await?;
    let deployments = coordinator.list(args.kind).await?;
    println!("{}", render(&deployments));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::StateName;

    #[test]
    fn test_render_rows() {
        let deployments = vec![
            Deployment {
                kind: DeploymentKind::Local,
                name: "localTest1".into(),
                mongodb_version: "7.0.0".into(),
                state: StateName::Stopped,
            },
            Deployment {
                kind: DeploymentKind::Atlas,
                name: "Cluster0".into(),
                mongodb_version: "8.0.4".into(),
                state: StateName::Idle,
            },
        ];
        let table = render(&deployments);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("localTest1"));
        assert!(lines[1].contains("LOCAL"));
        assert!(lines[1].ends_with("STOPPED"));
        assert!(lines[2].contains("ATLAS"));
    }

    #[test]
    fn test_type_is_case_insensitive() {
        let args = ListArgs::try_parse_from(["list", "--type", "atlas"]).unwrap();
        assert_eq!(args.kind, Some(DeploymentKind::Atlas));
    }
}
