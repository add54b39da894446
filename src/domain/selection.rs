//! Engine variant detection and selection.

use super::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution shape of an application, as detected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Blocking handler served with one thread per request.
    Threaded,
    /// Router served on the asynchronous event loop.
    EventLoop,
}

impl EngineKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Threaded => "threaded",
            Self::EventLoop => "event_loop",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Caller's choice of engine variant.
///
/// `AutoDetect` follows the application shape, established by one
/// structural capability check at the boundary; the forced selections
/// assert a shape and fail when the application does not match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineSelection {
    /// Serve with the thread-per-request engine or fail.
    ForceThreaded,
    /// Serve with the event-loop engine or fail.
    ForceEventLoop,
    /// Follow the detected application shape.
    #[default]
    AutoDetect,
}

impl EngineSelection {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ForceThreaded => "force_threaded",
            Self::ForceEventLoop => "force_event_loop",
            Self::AutoDetect => "auto_detect",
        }
    }

    /// Resolves this selection against the detected application shape.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::SelectionMismatch`] when a forced selection
    /// contradicts the detected shape.
    pub const fn resolve(self, detected: EngineKind) -> Result<EngineKind, DomainError> {
        match (self, detected) {
            (Self::AutoDetect, kind)
            | (Self::ForceThreaded, kind @ EngineKind::Threaded)
            | (Self::ForceEventLoop, kind @ EngineKind::EventLoop) => Ok(kind),
            (selected, kind) => Err(DomainError::SelectionMismatch {
                selected: selected.as_str(),
                detected: kind.as_str(),
            }),
        }
    }
}

impl fmt::Display for EngineSelection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EngineSelection::AutoDetect, EngineKind::Threaded, Ok(EngineKind::Threaded))]
    #[case(EngineSelection::AutoDetect, EngineKind::EventLoop, Ok(EngineKind::EventLoop))]
    #[case(
        EngineSelection::ForceThreaded,
        EngineKind::Threaded,
        Ok(EngineKind::Threaded)
    )]
    #[case(
        EngineSelection::ForceEventLoop,
        EngineKind::EventLoop,
        Ok(EngineKind::EventLoop)
    )]
    fn selection_accepts_matching_shapes(
        #[case] selection: EngineSelection,
        #[case] detected: EngineKind,
        #[case] expected: Result<EngineKind, DomainError>,
    ) {
        assert_eq!(selection.resolve(detected), expected);
    }

    #[rstest]
    #[case(EngineSelection::ForceThreaded, EngineKind::EventLoop)]
    #[case(EngineSelection::ForceEventLoop, EngineKind::Threaded)]
    fn forced_mismatch_is_rejected(
        #[case] selection: EngineSelection,
        #[case] detected: EngineKind,
    ) {
        assert!(matches!(
            selection.resolve(detected),
            Err(DomainError::SelectionMismatch { .. })
        ));
    }
}
