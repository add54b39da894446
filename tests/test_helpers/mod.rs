//! Shared fixtures for integration tests.

use axum::Router;
use axum::routing::get;
use once_cell::sync::Lazy;
use quayside::ports::Application;

static TRACING: Lazy<()> = Lazy::new(|| {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init()
        .ok();
});

/// Installs the test tracing subscriber once per process.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Blocking application answering every request with "howdy".
pub fn howdy_threaded() -> Application {
    Application::threaded(|request: tiny_http::Request| {
        let response = tiny_http::Response::from_string("howdy");
        request.respond(response).ok();
    })
}

/// Event-loop application answering `GET /` with a JSON howdy.
pub fn howdy_event_loop() -> Application {
    let router = Router::new().route(
        "/",
        get(|| async { axum::Json(serde_json::json!({"message": "Howdy!"})) }),
    );
    Application::event_loop(router)
}

/// Fetches `url` and returns the response body for a success status.
pub async fn get_text(url: &str) -> reqwest::Result<String> {
    reqwest::get(url).await?.error_for_status()?.text().await
}

/// Returns whether a GET to `url` fails (connection error, error status,
/// or hang), bounded so a lingering socket cannot stall the suite.
pub async fn get_fails(url: &str) -> bool {
    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), get_text(url)).await;
    !matches!(outcome, Ok(Ok(_)))
}
