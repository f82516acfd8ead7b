//! # mdbdeploy Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! This file serves as the main entry point for the mdbdeploy CLI application.
//! It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the command handlers
//! - Cancelling the running command on Ctrl-C
//!
//! ## Architecture
//!
//! - `commands`: One module per subcommand (`setup`, `list`, `connect`, ...).
//! - `deployment`: The `Coordinator` that turns those commands into engine
//!   and cluster-store calls (listing, selection, create, health waits).
//! - `common::container`: The engine drivers (Docker, Podman, containerd).
//! - `core`: Configuration and the error taxonomy.
//!
//! ## Examples
//!
//! ```bash
//! mdbdeploy setup dev1 --mdb-version 8.0
//! mdbdeploy list
//! mdbdeploy -vv --engine podman connect dev1
//! mdbdeploy delete dev1 --type LOCAL
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Route to the command handler, racing it against Ctrl-C
//! 4. Format and display any errors that occur
//!
use anyhow::anyhow;
use clap::Parser;
use commands::GlobalOpts;
use common::container::EngineKind;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod common;
mod core;
mod deployment;

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "mdbdeploy",
    about = "Manage local MongoDB deployments and Atlas clusters",
    long_about = "Create, list, connect to, pause, start, delete and read the logs of\n\
                  MongoDB deployments running in Docker, Podman or containerd, alongside\n\
                  Atlas clusters, with one set of commands.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Container engine to use. `auto` probes docker, then containerd.
    #[arg(long, value_enum, env = "MDBDEPLOY_ENGINE", global = true)]
    engine: Option<EngineKind>,

    /// Atlas project the ATLAS deployments belong to.
    #[arg(long, env = "MDBDEPLOY_PROJECT_ID", global = true)]
    project_id: Option<String>,

    /// Image used for new local deployments.
    #[arg(long, env = "MDBDEPLOY_LOCAL_IMAGE", global = true, hide = true)]
    local_image: Option<String>,
}

impl Cli {
    fn globals(&self) -> GlobalOpts {
        GlobalOpts {
            verbosity: self.verbose,
            engine: self.engine,
            project_id: self.project_id.clone(),
            local_image: self.local_image.clone(),
        }
    }
}

/// Enum defining all available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    Setup(commands::setup::SetupArgs),
    #[command(alias = "ls")]
    List(commands::list::ListArgs),
    Connect(commands::connect::ConnectArgs),
    Pause(commands::pause::PauseArgs),
    Start(commands::start::StartArgs),
    #[command(alias = "rm")]
    Delete(commands::delete::DeleteArgs),
    Logs(commands::logs::LogsArgs),
}

async fn run(command: Commands, globals: GlobalOpts) -> anyhow::Result<()> {
    match command {
        Commands::Setup(args) => commands::setup::handle_setup(args, &globals).await,
        Commands::List(args) => commands::list::handle_list(args, &globals).await,
        Commands::Connect(args) => commands::connect::handle_connect(args, &globals).await,
        Commands::Pause(args) => commands::pause::handle_pause(args, &globals).await,
        Commands::Start(args) => commands::start::handle_start(args, &globals).await,
        Commands::Delete(args) => commands::delete::handle_delete(args, &globals).await,
        Commands::Logs(args) => commands::logs::handle_logs(args, &globals).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let globals = cli.globals();
    // Dropping the command future kills any engine process it spawned.
    let command_result = tokio::select! {
        result = run(cli.command, globals) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn mdbdeploy_cmd() -> Command {
        Command::cargo_bin("mdbdeploy").expect("Failed to find mdbdeploy binary for testing")
    }

    #[test]
    fn test_main_help_flag() {
        mdbdeploy_cmd().arg("--help").assert().success();
    }

    #[test]
    fn test_main_version_flag() {
        mdbdeploy_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mdbdeploy",
            "list",
            "--engine",
            "podman",
            "--project-id",
            "p1",
            "-vv",
        ])
        .unwrap();
        let globals = cli.globals();
        assert_eq!(globals.engine, Some(EngineKind::Podman));
        assert_eq!(globals.project_id.as_deref(), Some("p1"));
        assert_eq!(globals.verbosity, 2);
    }
}
