//! # swapsync-store
//!
//! The event store: a reducer over [`Action`]s plus an observer list.
//!
//! Every backend notification and every reaction result is an action. The
//! store applies them one at a time, in arrival order, then tells each
//! registered observer what changed. Observers never mutate state; they
//! dispatch further actions through a [`StoreHandle`].
//!
//! ## Modules
//!
//! - [`action`]: actions and the inbound wire envelope
//! - [`state`]: [`StoreState`] and the reducer
//! - [`store`]: [`EventStore`], observers, and handles

pub mod action;
pub mod state;
pub mod store;

pub use action::{Action, InboundEvent};
pub use state::{SharedLogBuffer, StoreState, WalletState};
pub use store::{when, EventStore, Observer, StoreHandle, Transition};

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store's driver has stopped; no further actions are applied.
    #[error("event store is closed")]
    Closed,

    /// Invalid store configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] swapsync_logs::LogError),
}

/// Convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
