pub mod outcome;
pub mod overrides;
pub mod package;
pub mod snapshot;

// Re-exports
pub use outcome::{DetectionStatus, ProbeOutcome};
pub use overrides::{OverridesError, UserOverrides};
pub use package::PackageId;
pub use snapshot::{ArchSnapshot, DependencyRecord, SnapshotError};

/// On-disk snapshot format version. Bump whenever a field is added, removed
/// or re-typed; a mismatch on load is treated as "no saved snapshot".
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Directory-name prefix marking a package install as deactivated.
pub const DEACTIVATED_PREFIX: &str = "deactivated_";
