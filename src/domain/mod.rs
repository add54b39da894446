//! Domain model for background server supervision.
//!
//! Pure values and rules: registry keys, resolved bindings, engine
//! selection, lifecycle states, and identifiers. Infrastructure concerns
//! stay outside this boundary.

mod binding;
mod error;
mod ids;
mod key;
mod lifecycle;
mod selection;

pub use binding::{LOOPBACK_HOST, ServerBinding, effective_host};
pub use error::DomainError;
pub use ids::ServerId;
pub use key::ServerKey;
pub use lifecycle::ServerLifecycleState;
pub use selection::{EngineKind, EngineSelection};
