//! Thread-per-request engine over a blocking HTTP server.

use crate::domain::ServerBinding;
use crate::ports::{EngineError, EngineResult, RequestHandler, ServerEngine};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Engine serving a blocking [`RequestHandler`] with one thread per request.
///
/// The listen socket is bound at construction, so the binding is available
/// immediately. The accept loop runs on a detached OS thread, so a
/// forgotten server never blocks process exit; shutdown unblocks the loop and
/// releases the listener.
pub struct ThreadedEngine {
    state: Mutex<EngineState>,
    handler: Arc<dyn RequestHandler>,
    binding: ServerBinding,
    debug: bool,
}

struct EngineState {
    /// Present until shutdown releases the listener.
    server: Option<Arc<tiny_http::Server>>,
    served: bool,
}

impl ThreadedEngine {
    /// Binds the listen socket and prepares the serve loop.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Bind`] when the socket cannot be bound and
    /// [`EngineError::ServerDown`] when no listening address can be
    /// resolved after bind.
    pub fn bind(
        handler: Arc<dyn RequestHandler>,
        host: &str,
        port: u16,
        debug: bool,
    ) -> EngineResult<Self> {
        let server = tiny_http::Server::http((host, port))
            .map_err(|err| EngineError::bind(host, port, std::io::Error::other(err)))?;
        let resolved_port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| EngineError::ServerDown("no listening socket after bind".to_owned()))?;

        Ok(Self {
            state: Mutex::new(EngineState {
                server: Some(Arc::new(server)),
                served: false,
            }),
            handler,
            binding: ServerBinding::new(host.to_owned(), resolved_port),
            debug,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        // Recover from poisoning; the state itself stays consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ServerEngine for ThreadedEngine {
    async fn run_forever(&self) -> EngineResult<()> {
        let server = {
            let mut state = self.lock_state();
            if state.served {
                return Err(EngineError::AlreadyServed);
            }
            state.served = true;
            state
                .server
                .as_ref()
                .map(Arc::clone)
                .ok_or_else(|| EngineError::ServerDown("listener already released".to_owned()))?
        };

        let handler = Arc::clone(&self.handler);
        let debug = self.debug;
        let (done_tx, done_rx) = oneshot::channel();
        // The accept loop is detached; completion is observed through
        // done_rx rather than the thread handle.
        let _accept_loop = std::thread::Builder::new()
            .name("quayside-accept".to_owned())
            .spawn(move || {
                for request in server.incoming_requests() {
                    if debug {
                        tracing::debug!(
                            method = %request.method(),
                            url = request.url(),
                            "dispatching request"
                        );
                    }
                    let request_handler = Arc::clone(&handler);
                    let worker = std::thread::Builder::new()
                        .name("quayside-worker".to_owned())
                        .spawn(move || request_handler.handle(request));
                    if let Err(error) = worker {
                        tracing::error!(%error, "failed to spawn request worker");
                    }
                }
                // Last listener reference goes away before completion is
                // reported, so joiners observe a released socket.
                drop(server);
                if done_tx.send(()).is_err() {
                    tracing::debug!("engine owner gone before accept loop exit");
                }
            })
            .map_err(EngineError::runtime)?;

        done_rx
            .await
            .map_err(|_| EngineError::ServerDown("accept loop terminated abnormally".to_owned()))?;
        Ok(())
    }

    fn request_shutdown(&self) {
        if let Some(server) = self.lock_state().server.take() {
            server.unblock();
        }
    }

    async fn binding(&self) -> EngineResult<ServerBinding> {
        Ok(self.binding.clone())
    }
}
