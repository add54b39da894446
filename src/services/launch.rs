//! Start-or-reuse launch facade.

use super::background::{BackgroundServer, ServeError, ServeRequest};
use super::registry::{RegistryError, ServerRegistry};
use crate::domain::{EngineSelection, LOOPBACK_HOST, ServerKey};
use crate::ports::Application;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by the launch facade.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Registry access failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Starting the server failed.
    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Options for [`launch`].
///
/// Defaults to the `Default` key, the loopback host, no debug logging,
/// and engine auto-detection.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    key: ServerKey,
    debug: bool,
    host: String,
    selection: EngineSelection,
}

impl LaunchOptions {
    /// Creates the default launch options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: ServerKey::Default,
            debug: false,
            host: LOOPBACK_HOST.to_owned(),
            selection: EngineSelection::AutoDetect,
        }
    }

    /// Sets the registry key to launch under.
    #[must_use]
    pub fn with_key(mut self, key: ServerKey) -> Self {
        self.key = key;
        self
    }

    /// Sets the debug flag (verbose engine logging).
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Forces an engine variant or keeps auto-detection.
    #[must_use]
    pub fn with_engine(mut self, selection: EngineSelection) -> Self {
        self.selection = selection;
        self
    }
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts a server for the requested key or reuses the live one.
///
/// An already-live key is returned unchanged without creating a second
/// server. A `Default` key binds an ephemeral port while keeping `Default`
/// as the registry key; an explicit port 0 is re-keyed to the port the
/// operating system assigned: the effective key, fixed only after the
/// underlying bind completes. The new server is registered under the
/// effective key, which is returned.
///
/// The whole check-then-act sequence runs under the registry's launch
/// gate, so concurrent launches for the same new key yield exactly one
/// entry.
///
/// # Errors
///
/// Returns registry errors on lock poisoning and serve errors when the
/// server cannot be started.
pub async fn launch(
    registry: &ServerRegistry,
    application: Application,
    options: LaunchOptions,
) -> Result<ServerKey, LaunchError> {
    let LaunchOptions {
        key,
        debug,
        host,
        selection,
    } = options;

    let _guard = registry.launch_gate().lock().await;

    if registry.is_live(key)? {
        tracing::debug!(%key, "reusing live server");
        return Ok(key);
    }

    let request = ServeRequest::new(application)
        .with_host(host)
        .with_port(key.requested_port())
        .with_debug(debug)
        .with_engine(selection);
    let server = BackgroundServer::start(request).await?;

    let effective_key = match key {
        ServerKey::Default => ServerKey::Default,
        ServerKey::Port(0) => {
            let resolved = server.binding().await?;
            ServerKey::Port(resolved.port())
        }
        ServerKey::Port(port) => ServerKey::Port(port),
    };

    registry.add(effective_key, Arc::new(server))?;
    tracing::info!(key = %effective_key, "server registered");
    Ok(effective_key)
}
