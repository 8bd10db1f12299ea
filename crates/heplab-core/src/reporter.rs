//! Reporter and confirmation traits for dependency injection
//!
//! These traits allow core logic to report status and ask for confirmation
//! without being coupled to a terminal, which also makes the whole engine
//! testable without simulating stdin.

use heplab_schema::PackageId;

/// Status sink for the detection pass and installer pipeline.
///
/// The orchestrator emits exactly one `enabled`/`disabled`/`deactivated`/
/// `failure` line per package per detection pass; verbose diagnostics go
/// through `tracing` instead.
pub trait Reporter: Send + Sync {
    /// Package detected and recorded (with its version).
    fn enabled(&self, package: PackageId, version: &str);

    /// Package unavailable; startup continues without it.
    fn disabled(&self, package: PackageId, reason: &str);

    /// Package found but intentionally disabled.
    fn deactivated(&self, package: PackageId);

    /// Mandatory package undetectable or broken.
    fn failure(&self, package: PackageId, reason: &str);

    /// Indicates a new installer stage has started (e.g. "download").
    fn stage(&self, package: PackageId, stage: &str);

    /// Updates the progress of a download.
    fn downloading(&self, package: PackageId, file: &str, current: u64, total: Option<u64>);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

/// A reporter that swallows everything. Useful for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn enabled(&self, _: PackageId, _: &str) {}
    fn disabled(&self, _: PackageId, _: &str) {}
    fn deactivated(&self, _: PackageId) {}
    fn failure(&self, _: PackageId, _: &str) {}
    fn stage(&self, _: PackageId, _: &str) {}
    fn downloading(&self, _: PackageId, _: &str, _: u64, _: Option<u64>) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

/// Capability for destructive-action confirmation.
///
/// The engine never prompts when running non-interactively; callers inject
/// [`ForcedConfirm`] carrying the answer every prompt should receive.
pub trait Confirm: Send + Sync {
    /// Ask the user to confirm an action. `default` is the answer an
    /// interactive implementation should pre-select.
    fn confirm(&self, prompt: &str, default: bool) -> bool;
}

/// Non-interactive confirmation that always returns a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct ForcedConfirm(pub bool);

impl Confirm for ForcedConfirm {
    fn confirm(&self, _prompt: &str, _default: bool) -> bool {
        self.0
    }
}
