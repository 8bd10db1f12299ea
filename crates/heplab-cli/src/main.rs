//! heplab - dependency detection and build orchestration CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use heplab_cli::cmd;
use heplab_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Detect { force_rebuild } => cmd::detect::detect(force_rebuild),
        Commands::Install {
            packages,
            offline,
            yes,
            jobs,
        } => cmd::install::install(&packages, offline, yes, jobs).await,
        Commands::Activate { package } => cmd::variant::activate(&package),
        Commands::Deactivate { package } => cmd::variant::deactivate(&package),
        Commands::Status => cmd::status::status(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
