//! Status command: render the persisted snapshot.

use std::process::ExitCode;

use anyhow::Result;

use heplab_core::paths::Paths;
use heplab_schema::{ArchSnapshot, PackageId};

/// Show what the last detection pass recorded.
pub fn status() -> Result<ExitCode> {
    let paths = Paths::discover()?;

    let Some(snapshot) = ArchSnapshot::load(&paths.snapshot_path()) else {
        println!("No snapshot found. Run `heplab detect` first.");
        return Ok(ExitCode::SUCCESS);
    };

    println!();
    println!("Detected dependencies ({})", paths.root().display());
    println!();
    let width = 15;
    for package in PackageId::ALL {
        let record = snapshot.record(package);
        if record.present {
            let location = record
                .library_paths
                .first()
                .map_or_else(String::new, |p| format!("  {}", p.display()));
            let priority = if record.priority { "  (priority)" } else { "" };
            println!(
                "{:<width$}{}{location}{priority}",
                package.name(),
                record.version,
            );
        } else {
            println!("{:<width$}-", package.name());
        }
    }
    println!();
    Ok(ExitCode::SUCCESS)
}
