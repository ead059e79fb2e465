//! CLI command implementations

pub mod check;
pub mod clean;
pub mod install;

pub use check::execute as check;
pub use clean::execute as clean;
pub use install::execute as install;
