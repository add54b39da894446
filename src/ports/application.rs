//! Application object contracts: the shapes an engine can serve.

use crate::domain::EngineKind;
use axum::Router;
use std::fmt;
use std::sync::Arc;

/// Blocking request handler served with one thread per request.
///
/// The handler owns the request and is responsible for responding to it;
/// failures inside a handler are the application's concern and never
/// propagate into the supervisor.
pub trait RequestHandler: Send + Sync {
    /// Handles one request.
    fn handle(&self, request: tiny_http::Request);
}

impl<F> RequestHandler for F
where
    F: Fn(tiny_http::Request) + Send + Sync,
{
    fn handle(&self, request: tiny_http::Request) {
        self(request);
    }
}

/// Request-scoped context an application may expose.
///
/// Entered once before serving begins and exited once during shutdown,
/// regardless of how many times shutdown is requested.
pub trait ApplicationContext: Send + Sync {
    /// Called before the serve loop starts.
    fn enter(&self);

    /// Called during shutdown.
    fn exit(&self);
}

/// Opaque application object handed to the supervisor.
///
/// Carries one of the two servable shapes plus an optional
/// [`ApplicationContext`]. The supervisor only introspects it to detect
/// the shape for engine auto-selection and to enter/exit the context.
pub struct Application {
    payload: ApplicationPayload,
    context: Option<Arc<dyn ApplicationContext>>,
}

pub(crate) enum ApplicationPayload {
    Threaded(Arc<dyn RequestHandler>),
    EventLoop(Router),
}

impl Application {
    /// Wraps a blocking handler served thread-per-request.
    #[must_use]
    pub fn threaded(handler: impl RequestHandler + 'static) -> Self {
        Self {
            payload: ApplicationPayload::Threaded(Arc::new(handler)),
            context: None,
        }
    }

    /// Wraps a router served on the event loop.
    #[must_use]
    pub fn event_loop(router: Router) -> Self {
        Self {
            payload: ApplicationPayload::EventLoop(router),
            context: None,
        }
    }

    /// Attaches a request-scoped context to this application.
    #[must_use]
    pub fn with_context(mut self, context: impl ApplicationContext + 'static) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Returns the engine shape this application satisfies.
    ///
    /// This is the single structural capability check auto-detection
    /// performs.
    #[must_use]
    pub fn engine_kind(&self) -> EngineKind {
        match self.payload {
            ApplicationPayload::Threaded(_) => EngineKind::Threaded,
            ApplicationPayload::EventLoop(_) => EngineKind::EventLoop,
        }
    }

    pub(crate) fn into_parts(self) -> (ApplicationPayload, Option<Arc<dyn ApplicationContext>>) {
        (self.payload, self.context)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Application")
            .field("kind", &self.engine_kind())
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopContext;

    impl ApplicationContext for NoopContext {
        fn enter(&self) {}
        fn exit(&self) {}
    }

    #[test]
    fn detects_threaded_shape() {
        let application = Application::threaded(|request: tiny_http::Request| {
            drop(request);
        });
        assert_eq!(application.engine_kind(), EngineKind::Threaded);
    }

    #[test]
    fn detects_event_loop_shape() {
        let application = Application::event_loop(Router::new());
        assert_eq!(application.engine_kind(), EngineKind::EventLoop);
    }

    #[test]
    fn carries_optional_context() {
        let application = Application::event_loop(Router::new()).with_context(NoopContext);
        let (_, context) = application.into_parts();
        assert!(context.is_some());
    }
}
