//! Background server supervision.

use crate::adapters::{EventLoopEngine, ThreadedEngine};
use crate::domain::{
    DomainError, EngineKind, EngineSelection, LOOPBACK_HOST, ServerBinding, ServerId,
    ServerLifecycleState, effective_host,
};
use crate::ports::{
    Application, ApplicationContext, ApplicationPayload, EngineError, ServerEngine,
};
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Result type for supervisor operations.
pub type ServeResult<T> = Result<T, ServeError>;

/// Errors returned by supervisor operations.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The engine failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Parameter object for starting a background server.
///
/// Defaults to the loopback host, an ephemeral port, engine
/// auto-detection, and autostart.
pub struct ServeRequest {
    application: Application,
    host: String,
    port: u16,
    debug: bool,
    autostart: bool,
    selection: EngineSelection,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ServeRequest {
    /// Creates a request for serving `application`.
    #[must_use]
    pub fn new(application: Application) -> Self {
        Self {
            application,
            host: LOOPBACK_HOST.to_owned(),
            port: 0,
            debug: false,
            autostart: true,
            selection: EngineSelection::AutoDetect,
            clock: Arc::new(DefaultClock),
        }
    }

    /// Sets the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the bind port; 0 requests ephemeral allocation.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the debug flag (verbose engine logging).
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Chooses whether serving begins during [`BackgroundServer::start`].
    #[must_use]
    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Forces an engine variant or keeps auto-detection.
    #[must_use]
    pub fn with_engine(mut self, selection: EngineSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Overrides the clock used for lifecycle timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }
}

struct SupervisorState {
    lifecycle: ServerLifecycleState,
    task: Option<JoinHandle<()>>,
    binding: Option<ServerBinding>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

/// Supervisor owning one server engine and its background execution
/// context.
///
/// A background server is terminal once stopped: it is never restarted,
/// and a new instance must be created to serve again. Dropping a live
/// supervisor signals the engine and aborts the serve task as a
/// best-effort safety net; correctness never relies on drop timing. Call
/// [`shutdown`](Self::shutdown) for deterministic teardown.
pub struct BackgroundServer {
    id: ServerId,
    engine: Arc<dyn ServerEngine>,
    kind: EngineKind,
    debug: bool,
    context: Option<Arc<dyn ApplicationContext>>,
    clock: Arc<dyn Clock + Send + Sync>,
    state: Mutex<SupervisorState>,
}

impl BackgroundServer {
    /// Constructs the engine for `request` and, unless autostart was
    /// disabled, begins serving and resolves the bound address.
    ///
    /// The application's context, if any, is entered before serving.
    ///
    /// # Errors
    ///
    /// Returns domain errors for invalid configuration or a forced engine
    /// selection that contradicts the application shape, and engine errors
    /// when binding or startup confirmation fails.
    pub async fn start(request: ServeRequest) -> ServeResult<Self> {
        let ServeRequest {
            application,
            host,
            port,
            debug,
            autostart,
            selection,
            clock,
        } = request;

        let trimmed_host = host.trim();
        if trimmed_host.is_empty() {
            return Err(DomainError::EmptyHost.into());
        }
        let bind_host = effective_host(trimmed_host);

        let kind = selection.resolve(application.engine_kind())?;
        let (payload, context) = application.into_parts();
        let engine: Arc<dyn ServerEngine> = match payload {
            ApplicationPayload::Threaded(handler) => {
                Arc::new(ThreadedEngine::bind(handler, &bind_host, port, debug)?)
            }
            ApplicationPayload::EventLoop(router) => {
                Arc::new(EventLoopEngine::new(router, bind_host, port, debug))
            }
        };

        let server = Self {
            id: ServerId::new(),
            engine,
            kind,
            debug,
            context,
            clock,
            state: Mutex::new(SupervisorState {
                lifecycle: ServerLifecycleState::Created,
                task: None,
                binding: None,
                started_at: None,
                stopped_at: None,
            }),
        };

        if let Some(app_context) = &server.context {
            app_context.enter();
        }
        if autostart {
            server.serve().await?;
        }
        Ok(server)
    }

    /// Begins serving on a detached background task and resolves the
    /// bound address.
    ///
    /// The task's failure never crosses into the caller's thread of
    /// control; engine errors are logged from the task.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidLifecycleTransition`] when the server
    /// is already serving or has been stopped, and engine errors when the
    /// bound address cannot be confirmed.
    pub async fn serve(&self) -> ServeResult<()> {
        {
            let mut state = self.lock_state();
            if !state
                .lifecycle
                .can_transition_to(ServerLifecycleState::Serving)
            {
                return Err(DomainError::InvalidLifecycleTransition {
                    from: state.lifecycle.as_str(),
                    to: ServerLifecycleState::Serving.as_str(),
                }
                .into());
            }

            let engine = Arc::clone(&self.engine);
            let server_id = self.id;
            state.task = Some(tokio::spawn(async move {
                if let Err(error) = engine.run_forever().await {
                    tracing::error!(%server_id, %error, "engine serve loop ended with error");
                }
            }));
            state.lifecycle = ServerLifecycleState::Serving;
            state.started_at = Some(self.clock.utc());
        }

        let resolved = self.engine.binding().await?;
        tracing::info!(
            server_id = %self.id,
            engine = self.kind.as_str(),
            binding = %resolved,
            "background server started"
        );
        self.lock_state().binding = Some(resolved);
        Ok(())
    }

    /// Returns the supervisor identifier.
    #[must_use]
    pub const fn id(&self) -> ServerId {
        self.id
    }

    /// Returns the engine variant serving this application.
    #[must_use]
    pub const fn engine_kind(&self) -> EngineKind {
        self.kind
    }

    /// Returns whether verbose engine logging was requested.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Returns whether the background execution context has started and
    /// not yet terminated.
    #[must_use]
    pub fn is_live(&self) -> bool {
        let state = self.lock_state();
        state.lifecycle == ServerLifecycleState::Serving
            && state.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Returns the resolved bind address, waiting for lazily binding
    /// engines when necessary.
    ///
    /// The resolved value is cached and stays readable after shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ServerDown`] when startup confirmation times
    /// out or no listening socket exists.
    pub async fn binding(&self) -> ServeResult<ServerBinding> {
        if let Some(resolved) = self.lock_state().binding.clone() {
            return Ok(resolved);
        }
        let resolved = self.engine.binding().await?;
        self.lock_state().binding = Some(resolved.clone());
        Ok(resolved)
    }

    /// Returns the bound host once the binding has been resolved.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        self.lock_state()
            .binding
            .as_ref()
            .map(|resolved| resolved.host().to_owned())
    }

    /// Returns the bound port once the binding has been resolved.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.lock_state()
            .binding
            .as_ref()
            .map(ServerBinding::port)
    }

    /// Returns when serving began.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lock_state().started_at
    }

    /// Returns when the server stopped.
    #[must_use]
    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.lock_state().stopped_at
    }

    /// Stops the server and waits for the background execution context to
    /// fully terminate.
    ///
    /// Idempotent: calling it again, or on a server that never began
    /// serving, is a no-op. The engine is signalled first, the serve task
    /// joined, and the application context exited before returning.
    pub async fn shutdown(&self) {
        let task = {
            let mut state = self.lock_state();
            if state.lifecycle != ServerLifecycleState::Serving {
                return;
            }
            state.lifecycle = ServerLifecycleState::Stopped;
            state.stopped_at = Some(self.clock.utc());
            state.task.take()
        };

        self.engine.request_shutdown();
        if let Some(task) = task {
            if let Err(error) = task.await {
                tracing::warn!(server_id = %self.id, %error, "serve task ended abnormally");
            }
        }
        if let Some(app_context) = &self.context {
            app_context.exit();
        }
        tracing::info!(server_id = %self.id, "background server stopped");
    }

    fn lock_state(&self) -> MutexGuard<'_, SupervisorState> {
        // Recover from poisoning so shutdown keeps working after a panic
        // elsewhere.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn from_engine(
        engine: Arc<dyn ServerEngine>,
        context: Option<Arc<dyn ApplicationContext>>,
    ) -> Self {
        Self {
            id: ServerId::new(),
            engine,
            kind: EngineKind::Threaded,
            debug: false,
            context,
            clock: Arc::new(DefaultClock),
            state: Mutex::new(SupervisorState {
                lifecycle: ServerLifecycleState::Created,
                task: None,
                binding: None,
                started_at: None,
                stopped_at: None,
            }),
        }
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        let task = {
            let mut state = self.lock_state();
            if state.lifecycle == ServerLifecycleState::Stopped {
                return;
            }
            state.lifecycle = ServerLifecycleState::Stopped;
            state.stopped_at = Some(self.clock.utc());
            state.task.take()
        };

        self.engine.request_shutdown();
        if let Some(task) = task {
            task.abort();
        }
        if let Some(app_context) = &self.context {
            app_context.exit();
        }
        tracing::debug!(server_id = %self.id, "background server dropped before explicit shutdown");
    }
}
