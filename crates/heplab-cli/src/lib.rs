//! heplab - dependency detection and build orchestration
//!
//! Command-line frontend for the detection engine: probes the toolchain and
//! physics packages, decides whether the analysis core must be rebuilt,
//! installs bundled packages, and switches between the detector-simulation
//! variants.
//!
//! # Exit codes
//!
//! - `0` success
//! - `1` error (bad arguments, IO or build failure, a mandatory dependency
//!   undetectable, an installation failed)
//! - `2` installation skipped at the user's request
//! - `3` installation succeeded but the program must be restarted

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "heplab")]
#[command(author, version, about = "Dependency detection and build orchestration")]
pub struct Cli {
    /// Show debug-level diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Probe all dependencies and rebuild the analysis core if needed
    Detect {
        /// Rebuild even when nothing changed
        #[arg(long)]
        force_rebuild: bool,
    },
    /// Download, build and install bundled packages
    Install {
        /// Package name(s): zlib, histo, jetclu, fastsim, fastsim-tuned
        #[arg(required = true)]
        packages: Vec<String>,
        /// Never touch the network; fail instead of downloading
        #[arg(long)]
        offline: bool,
        /// Answer yes to every confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Parallel jobs for external builds (default: all cores)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },
    /// Make a detector-simulation variant the active one
    Activate {
        /// fastsim or fastsim-tuned
        package: String,
    },
    /// Switch a detector-simulation variant off without uninstalling it
    Deactivate {
        /// fastsim or fastsim-tuned
        package: String,
    },
    /// Show the persisted dependency snapshot
    Status,
}
