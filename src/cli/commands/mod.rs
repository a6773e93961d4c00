//! CLI command implementations

pub mod phase;
pub mod report;

pub use phase::execute as phase;
pub use report::execute as report;
