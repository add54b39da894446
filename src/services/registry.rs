//! Process-wide registry of live background servers.

use super::background::BackgroundServer;
use crate::domain::ServerKey;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors returned by registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry exists for the key: the server was shut down or never
    /// started.
    #[error("server for key {0} has been shut down")]
    ServerDown(ServerKey),

    /// The registry lock was poisoned by a panicking writer.
    #[error("registry state lock poisoned")]
    LockPoisoned,
}

type ServerMap = HashMap<ServerKey, Arc<BackgroundServer>>;

/// Process-wide mapping from logical keys to live background servers.
///
/// The handle is cheap to clone and clones share state; construct one at
/// process start and thread it through the call sites that need it. At
/// most one server is tracked per key. All mutation goes through
/// [`add`](Self::add) and [`pop`](Self::pop), and the `Default` entry is
/// protected from unforced shutdown.
#[derive(Clone, Default)]
pub struct ServerRegistry {
    servers: Arc<RwLock<ServerMap>>,
    launch_gate: Arc<tokio::sync::Mutex<()>>,
}

impl ServerRegistry {
    /// Creates an empty registry handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of tracked entries.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] when the state lock is
    /// poisoned.
    pub fn count(&self) -> RegistryResult<usize> {
        Ok(self.read_state()?.len())
    }

    /// Returns whether an entry exists for `key` and its server is live.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] when the state lock is
    /// poisoned.
    pub fn is_live(&self, key: ServerKey) -> RegistryResult<bool> {
        Ok(self
            .read_state()?
            .get(&key)
            .is_some_and(|server| server.is_live()))
    }

    /// Inserts or overwrites the entry for `key`.
    ///
    /// A displaced entry is dropped; its drop safety net stops the engine.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] when the state lock is
    /// poisoned.
    pub fn add(&self, key: ServerKey, server: Arc<BackgroundServer>) -> RegistryResult<()> {
        self.write_state()?.insert(key, server);
        Ok(())
    }

    /// Removes and returns the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServerDown`] when no entry exists and
    /// [`RegistryError::LockPoisoned`] when the state lock is poisoned.
    pub fn pop(&self, key: ServerKey) -> RegistryResult<Arc<BackgroundServer>> {
        self.write_state()?
            .remove(&key)
            .ok_or(RegistryError::ServerDown(key))
    }

    /// Returns the entry for `key` without removing it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ServerDown`] when no entry exists and
    /// [`RegistryError::LockPoisoned`] when the state lock is poisoned.
    pub fn get(&self, key: ServerKey) -> RegistryResult<Arc<BackgroundServer>> {
        self.read_state()?
            .get(&key)
            .cloned()
            .ok_or(RegistryError::ServerDown(key))
    }

    /// Stops and removes the server for `key`.
    ///
    /// An unforced `Default` key is a deliberate no-op, protecting the
    /// shared default instance from accidental teardown by cooperating
    /// callers. An absent key is logged and treated as already satisfied,
    /// not raised, in contrast with [`get`](Self::get) and
    /// [`pop`](Self::pop).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] when the state lock is
    /// poisoned.
    pub async fn shutdown(&self, key: ServerKey, force: bool) -> RegistryResult<()> {
        if key.is_default() && !force {
            tracing::debug!("refusing to stop the default server without force");
            return Ok(());
        }
        match self.pop(key) {
            Ok(server) => {
                server.shutdown().await;
                Ok(())
            }
            Err(RegistryError::ServerDown(_)) => {
                tracing::error!(%key, "server for key not found");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) fn launch_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.launch_gate
    }

    fn read_state(&self) -> RegistryResult<RwLockReadGuard<'_, ServerMap>> {
        self.servers.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write_state(&self) -> RegistryResult<RwLockWriteGuard<'_, ServerMap>> {
        self.servers
            .write()
            .map_err(|_| RegistryError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::super::background::ServeRequest;
    use super::*;
    use crate::ports::Application;

    fn howdy_application() -> Application {
        Application::threaded(|request: tiny_http::Request| {
            let response = tiny_http::Response::from_string("howdy");
            request.respond(response).ok();
        })
    }

    async fn live_server() -> Arc<BackgroundServer> {
        let server = BackgroundServer::start(ServeRequest::new(howdy_application()))
            .await
            .expect("server should start");
        Arc::new(server)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tracks_entries_by_key() {
        let registry = ServerRegistry::new();
        assert_eq!(registry.count().expect("count"), 0);

        let server = live_server().await;
        registry
            .add(ServerKey::Default, server.clone())
            .expect("add");

        assert_eq!(registry.count().expect("count"), 1);
        assert!(registry.is_live(ServerKey::Default).expect("is_live"));
        let tracked = registry.get(ServerKey::Default).expect("get");
        assert_eq!(tracked.id(), server.id());

        server.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_and_pop_raise_for_absent_keys() {
        let registry = ServerRegistry::new();
        assert!(matches!(
            registry.get(ServerKey::Port(9999)),
            Err(RegistryError::ServerDown(ServerKey::Port(9999)))
        ));
        assert!(matches!(
            registry.pop(ServerKey::Port(9999)),
            Err(RegistryError::ServerDown(ServerKey::Port(9999)))
        ));
        assert!(!registry.is_live(ServerKey::Port(9999)).expect("is_live"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unforced_default_shutdown_is_a_noop() {
        let registry = ServerRegistry::new();
        let server = live_server().await;
        registry
            .add(ServerKey::Default, server.clone())
            .expect("add");

        registry
            .shutdown(ServerKey::Default, false)
            .await
            .expect("shutdown");

        assert_eq!(registry.count().expect("count"), 1);
        assert!(registry.is_live(ServerKey::Default).expect("is_live"));

        server.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forced_default_shutdown_removes_the_entry() {
        let registry = ServerRegistry::new();
        registry
            .add(ServerKey::Default, live_server().await)
            .expect("add");

        registry
            .shutdown(ServerKey::Default, true)
            .await
            .expect("shutdown");

        assert_eq!(registry.count().expect("count"), 0);
        assert!(matches!(
            registry.get(ServerKey::Default),
            Err(RegistryError::ServerDown(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_of_absent_key_is_swallowed() {
        let registry = ServerRegistry::new();
        registry
            .shutdown(ServerKey::Port(8123), true)
            .await
            .expect("absent key is not an error at this layer");
    }
}
