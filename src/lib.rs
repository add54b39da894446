//! Quayside: background HTTP server supervision and registry.
//!
//! Quayside launches HTTP applications on supervised background tasks so
//! that callers (chiefly test harnesses) can start a server without
//! blocking, address it later by a stable key, and tear it down
//! deterministically. The HTTP engines themselves are pluggable; this
//! crate owns the lifecycle and registry layer: safe concurrent creation,
//! idempotent reuse, ephemeral-port resolution, ordered shutdown with
//! resource release, and protection of the shared default instance from
//! accidental termination.
//!
//! # Architecture
//!
//! Quayside follows hexagonal architecture principles:
//!
//! - **Domain**: pure values and rules with no infrastructure dependencies
//! - **Ports**: abstract trait interfaces for engines and applications
//! - **Adapters**: the two concrete engine variants
//! - **Services**: supervision, registry, and launch orchestration
//!
//! # Modules
//!
//! - [`domain`]: keys, bindings, engine selection, and lifecycle states
//! - [`ports`]: the [`ServerEngine`](ports::ServerEngine) contract and the
//!   application shapes it serves
//! - [`adapters`]: the thread-per-request and event-loop engines
//! - [`services`]: [`BackgroundServer`](services::BackgroundServer),
//!   [`ServerRegistry`](services::ServerRegistry), and
//!   [`launch`](services::launch)

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
