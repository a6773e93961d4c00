//! Phase orchestration
//!
//! The host runs `pre`, `main` and `post` as separate processes, strictly in
//! that order. The only memory shared between them is the state channel
//! (see [`crate::state`]) plus whatever inputs the host passes each time.
//!
//! | Phase | Work | Failure |
//! |-------|------|---------|
//! | pre | validate the store, record flags | fails the job |
//! | main | resolve roots, save or restore | fails the job |
//! | post | report and delete the run root | logged as a warning |

pub mod main;
pub mod post;
pub mod pre;

pub use main::MainOutcome;
pub use post::PostOutcome;

use crate::host::Host;
use std::fmt;

/// One of the three entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pre,
    Main,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Main => write!(f, "main"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Collapsible host log group, closed on drop
pub(crate) struct LogGroup<'a> {
    host: Option<&'a dyn Host>,
}

impl<'a> LogGroup<'a> {
    /// Open `title` when `enabled`; otherwise a no-op guard
    pub(crate) fn open(host: &'a dyn Host, title: &str, enabled: bool) -> Self {
        if enabled {
            host.start_group(title);
            Self { host: Some(host) }
        } else {
            Self { host: None }
        }
    }
}

impl Drop for LogGroup<'_> {
    fn drop(&mut self) {
        if let Some(host) = self.host {
            host.end_group();
        }
    }
}
