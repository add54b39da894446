//! Lifecycle states for a supervised background server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a background server.
///
/// `Stopped` is terminal: a stopped server is never restarted; a new
/// instance must be created to serve again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerLifecycleState {
    /// Engine constructed; serve loop not yet running.
    Created,
    /// Serve loop running on the background execution context.
    Serving,
    /// Shut down, or dropped before ever serving.
    Stopped,
}

impl ServerLifecycleState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Serving => "serving",
            Self::Stopped => "stopped",
        }
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Serving | Self::Stopped) | (Self::Serving, Self::Stopped)
        )
    }
}

impl fmt::Display for ServerLifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
