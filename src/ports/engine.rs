//! Engine port for background server execution.

use crate::domain::ServerBinding;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for server engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Longest wait for a lazily binding engine to confirm startup.
pub const STARTUP_DEADLINE: Duration = Duration::from_secs(10);

/// Capability contract for a concrete server engine.
///
/// An engine binds a listen socket (eagerly at construction or lazily when
/// the serve loop starts), serves requests until shutdown is requested,
/// and reports the address it actually bound.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ServerEngine: Send + Sync {
    /// Serves requests until shutdown is requested.
    ///
    /// The serve loop is consumed by the first call; a second call fails
    /// with [`EngineError::AlreadyServed`].
    async fn run_forever(&self) -> EngineResult<()>;

    /// Signals the serve loop to stop.
    ///
    /// Returns without waiting; joining the serve loop is the supervisor's
    /// responsibility. Safe to call before, during, and after serving.
    fn request_shutdown(&self);

    /// Returns the resolved bind address.
    ///
    /// Engines that bind lazily wait for startup confirmation, bounded by
    /// [`STARTUP_DEADLINE`], and fail with [`EngineError::ServerDown`]
    /// when the deadline elapses or no listening socket came up.
    async fn binding(&self) -> EngineResult<ServerBinding>;
}

/// Errors returned by server engine adapters.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Binding the listen socket failed.
    #[error("failed to bind {host}:{port}: {source}")]
    Bind {
        /// Requested bind host.
        host: String,
        /// Requested bind port.
        port: u16,
        /// Underlying socket error.
        source: Arc<std::io::Error>,
    },

    /// The serve loop was already consumed.
    #[error("engine serve loop already consumed")]
    AlreadyServed,

    /// The server is down: startup was never confirmed or no listening
    /// socket exists.
    #[error("server is down: {0}")]
    ServerDown(String),

    /// Generic runtime failure inside the serve loop.
    #[error("engine runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    /// Wraps a bind failure.
    #[must_use]
    pub fn bind(host: impl Into<String>, port: u16, source: std::io::Error) -> Self {
        Self::Bind {
            host: host.into(),
            port,
            source: Arc::new(source),
        }
    }

    /// Wraps a runtime error from the serve loop.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
