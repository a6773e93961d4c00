//! Persist - store-backed artifact cache for CI jobs
//!
//! Saves selected workspace paths into a mounted store keyed by repository
//! and scope, restores them into later workspaces by symlink, hard link or
//! copy, and removes run-scoped data once the job finishes.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod phase;
pub mod state;

pub use error::{PersistError, PersistResult};
