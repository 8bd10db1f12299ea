pub mod installer;
pub mod io;
pub mod links;
pub mod paths;
pub mod probe;
pub mod process;
pub mod rebuild;
pub mod reporter;
pub mod variant;

pub use paths::*;
pub use reporter::{Confirm, ForcedConfirm, NullReporter, Reporter};

/// User Agent string for download operations
pub const USER_AGENT: &str = concat!("heplab-core/", env!("CARGO_PKG_VERSION"));
