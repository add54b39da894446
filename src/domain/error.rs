//! Error types for server supervision domain validation.

use thiserror::Error;

/// Errors returned while constructing or transitioning domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The port input is neither `"default"` nor an unsigned 16-bit integer.
    #[error("port must be an integer in 0..=65535 or \"default\", got '{0}'")]
    InvalidPort(String),

    /// The bind host is empty after trimming.
    #[error("bind host must not be empty")]
    EmptyHost,

    /// A forced engine selection contradicts the application shape.
    #[error("{detected} application cannot be served by a forced {selected} engine")]
    SelectionMismatch {
        /// Forced engine selection in canonical string form.
        selected: &'static str,
        /// Detected application shape in canonical string form.
        detected: &'static str,
    },

    /// Transitioning between two lifecycle states is invalid.
    #[error("invalid server lifecycle transition: {from} -> {to}")]
    InvalidLifecycleTransition {
        /// Current lifecycle state.
        from: &'static str,
        /// Requested target lifecycle state.
        to: &'static str,
    },
}
