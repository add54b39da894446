//! Event-loop engine over the asynchronous HTTP stack.

use crate::domain::ServerBinding;
use crate::ports::{EngineError, EngineResult, STARTUP_DEADLINE, ServerEngine};
use async_trait::async_trait;
use axum::Router;
use std::sync::{Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Startup confirmation published by the serve loop.
#[derive(Debug, Clone)]
enum StartupState {
    Pending,
    Bound(ServerBinding),
    Failed(String),
}

/// Engine serving an [`axum::Router`] on the event loop.
///
/// Construction only configures the engine; the listen socket is bound
/// lazily when the serve loop starts. Address accessors wait for startup
/// confirmation on a watch channel, bounded by
/// [`STARTUP_DEADLINE`](crate::ports::STARTUP_DEADLINE). Shutdown cancels
/// the loop's token and returns; joining the loop is the supervisor's
/// responsibility.
pub struct EventLoopEngine {
    router: Mutex<Option<Router>>,
    host: String,
    port: u16,
    debug: bool,
    startup_tx: watch::Sender<StartupState>,
    startup_rx: watch::Receiver<StartupState>,
    cancel: CancellationToken,
}

impl EventLoopEngine {
    /// Configures an engine for the given router and bind target.
    #[must_use]
    pub fn new(router: Router, host: String, port: u16, debug: bool) -> Self {
        let (startup_tx, startup_rx) = watch::channel(StartupState::Pending);
        Self {
            router: Mutex::new(Some(router)),
            host,
            port,
            debug,
            startup_tx,
            startup_rx,
            cancel: CancellationToken::new(),
        }
    }

    fn take_router(&self) -> EngineResult<Router> {
        self.router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(EngineError::AlreadyServed)
    }
}

#[async_trait]
impl ServerEngine for EventLoopEngine {
    async fn run_forever(&self) -> EngineResult<()> {
        let router = self.take_router()?;

        let listener = match TcpListener::bind((self.host.as_str(), self.port)).await {
            Ok(listener) => listener,
            Err(err) => {
                self.startup_tx
                    .send_replace(StartupState::Failed(err.to_string()));
                return Err(EngineError::bind(self.host.clone(), self.port, err));
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(err) => {
                self.startup_tx
                    .send_replace(StartupState::Failed(err.to_string()));
                return Err(EngineError::runtime(err));
            }
        };

        let resolved = ServerBinding::new(self.host.clone(), local_addr.port());
        if self.debug {
            tracing::debug!(binding = %resolved, "event-loop engine bound");
        }
        self.startup_tx.send_replace(StartupState::Bound(resolved));

        let cancel = self.cancel.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
            .map_err(EngineError::runtime)?;
        Ok(())
    }

    fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    async fn binding(&self) -> EngineResult<ServerBinding> {
        let mut startup_rx = self.startup_rx.clone();
        let wait_for_confirmation = async move {
            loop {
                let startup = startup_rx.borrow_and_update().clone();
                match startup {
                    StartupState::Bound(resolved) => return Ok(resolved),
                    StartupState::Failed(reason) => {
                        return Err(EngineError::ServerDown(format!("startup failed: {reason}")));
                    }
                    StartupState::Pending => {}
                }
                if startup_rx.changed().await.is_err() {
                    return Err(EngineError::ServerDown(
                        "serve loop gone before startup confirmation".to_owned(),
                    ));
                }
            }
        };

        tokio::time::timeout(STARTUP_DEADLINE, wait_for_confirmation)
            .await
            .map_err(|_| EngineError::ServerDown("startup confirmation deadline elapsed".to_owned()))?
    }
}
