//! Console implementations of the engine's reporter and confirmation
//! traits. All user-facing status goes to stdout; diagnostics stay on the
//! tracing pipeline.

use std::io::Write;

use heplab_core::reporter::{Confirm, Reporter};
use heplab_schema::PackageId;

/// Prints one status line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn enabled(&self, package: PackageId, version: &str) {
        if version.is_empty() {
            println!("  [enabled]     {package}");
        } else {
            println!("  [enabled]     {package} ({version})");
        }
    }

    fn disabled(&self, package: PackageId, reason: &str) {
        println!("  [disabled]    {package}: {reason}");
    }

    fn deactivated(&self, package: PackageId) {
        println!("  [deactivated] {package}");
    }

    fn failure(&self, package: PackageId, reason: &str) {
        println!("  [FAILED]      {package}: {reason}");
    }

    fn stage(&self, package: PackageId, stage: &str) {
        println!("{package}: {stage}");
    }

    fn downloading(&self, _package: PackageId, file: &str, current: u64, total: Option<u64>) {
        match total {
            Some(total) if total > 0 => {
                let pct = current * 100 / total;
                print!("\r  {file}: {pct}% ({current}/{total} bytes)");
            }
            _ => print!("\r  {file}: {current} bytes"),
        }
        if Some(current) == total {
            println!();
        } else {
            std::io::stdout().flush().ok();
        }
    }

    fn info(&self, msg: &str) {
        println!("{msg}");
    }

    fn warning(&self, msg: &str) {
        println!("Warning: {msg}");
    }

    fn error(&self, msg: &str) {
        eprintln!("Error: {msg}");
    }
}

/// Interactive y/n prompt on stdin. EOF or unreadable input falls back to
/// the default answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!("{prompt} {hint} ");
        std::io::stdout().flush().ok();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return default;
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        }
    }
}
