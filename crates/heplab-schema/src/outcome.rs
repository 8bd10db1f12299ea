//! Result enums shared between probes, the orchestrator and its callers.

use serde::{Deserialize, Serialize};

/// Outcome of a single detection stage.
///
/// Stage transitions in the orchestrator depend only on this enum; probes
/// never raise across a stage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// A usable candidate was located.
    Found,
    /// Nothing at this search location; the chain may fall through.
    NotFound,
    /// A candidate exists but is broken (e.g. a binary that crashes when
    /// probed). Stops the search chain immediately.
    Issue,
    /// Found, but intentionally disabled (install dir carries the
    /// deactivation prefix).
    Deactivated,
}

/// Terminal result of running one package through the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    /// Package detected and recorded in the snapshot.
    Enabled,
    /// Package absent, vetoed, deactivated, or with unmet sub-dependencies.
    /// Startup continues with the feature unavailable.
    Disabled,
    /// A mandatory package is undetectable or broken; startup must abort.
    Fatal,
}

impl DetectionStatus {
    /// Whether startup may continue after this result.
    pub fn ok(self) -> bool {
        !matches!(self, Self::Fatal)
    }
}
