//! Error Taxonomy
//!
//! Recoverable scheduler errors. Everything here is either returned to a
//! control client or logged and skipped; the event loop keeps running.
//! Broken screen/group bindings are not represented as errors; they abort.

use thiserror::Error;

/// Failures surfaced by scheduler mutations and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Requested group name is not in the configured set.
    ///
    /// The display form doubles as the protocol-level error value.
    #[error("No such group")]
    NoSuchGroup,

    /// A removal was requested against a group that does not hold the window.
    #[error("window {0} is not a member of group '{1}'")]
    NotAMember(u32, String),

    /// An unmap notification named a handle the registry never saw.
    #[error("unknown window {0}")]
    UnknownWindow(u32),
}
