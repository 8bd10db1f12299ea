pub mod detect;
pub mod install;
pub mod status;
pub mod variant;
