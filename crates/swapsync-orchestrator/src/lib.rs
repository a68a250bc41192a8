//! # swapsync-orchestrator
//!
//! Reactive side effects of store transitions.
//!
//! The [`Orchestrator`] registers observers on an
//! [`EventStore`](swapsync_store::EventStore). Each observer looks at one
//! [`Transition`](swapsync_store::Transition) and spawns backend calls;
//! their results come back to the store as actions.
//!
//! ## Modules
//!
//! - [`backend`]: the [`Backend`] trait and an in-memory implementation
//! - [`coalesce`]: per-key throttle/debounce actors
//! - [`readiness`]: availability edges between context statuses
//! - [`orchestrator`]: the reactions themselves

pub mod backend;
pub mod coalesce;
pub mod orchestrator;
pub mod readiness;

pub use backend::{Backend, BackendError, MemoryBackend};
pub use coalesce::{CoalesceConfig, Coalescer, CoalescerRegistry};
pub use orchestrator::Orchestrator;
pub use readiness::ReadinessEdges;

/// Error types for reactions and commands.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The store stopped accepting actions.
    #[error(transparent)]
    Store(#[from] swapsync_store::StoreError),
}

/// Convenience result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
