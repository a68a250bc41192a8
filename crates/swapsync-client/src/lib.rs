//! # swapsync-client
//!
//! Host process for the synchronization layer. Reads the daemon's event
//! feed into the event store, runs the orchestrator's reactions against the
//! daemon's JSON-RPC socket, and serves derived state to the view.
//!
//! ## Modules
//!
//! - [`config`]: `config.toml` loading
//! - [`ipc_bridge`]: JSON-RPC client and the socket-backed [`RpcBackend`]
//! - [`feed`]: inbound event feed
//! - [`rpc`]: view-facing JSON-RPC server
//! - [`commands`]: view-facing command handlers

pub mod commands;
pub mod config;
pub mod feed;
pub mod ipc_bridge;
pub mod rpc;

use std::sync::Arc;

use swapsync_orchestrator::{Backend, Orchestrator};
use swapsync_store::{EventStore, StoreHandle};

pub use config::ClientConfig;
pub use feed::EventFeed;
pub use ipc_bridge::{IpcBridgeError, RpcBackend};
pub use rpc::RpcServer;

/// Error types for the client's own I/O.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Socket or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The event store has stopped.
    #[error(transparent)]
    Store(#[from] swapsync_store::StoreError),
}

/// Convenience result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// What the view-facing handlers need.
pub struct ClientContext {
    pub store: StoreHandle,
    pub orchestrator: Orchestrator,
}

/// Build the store and wire the orchestrator into it.
///
/// The store is returned unstarted; run it with [`EventStore::run`].
pub fn assemble(
    config: &ClientConfig,
    backend: Arc<dyn Backend>,
) -> std::result::Result<(EventStore, Arc<ClientContext>), swapsync_store::StoreError> {
    let mut store =
        EventStore::with_config(config.sync.log_high_water_mark, config.settings.clone())?;
    let orchestrator = Orchestrator::new(backend, store.handle(), config.coalesce());
    orchestrator.install(&mut store);
    let ctx = Arc::new(ClientContext {
        store: store.handle(),
        orchestrator,
    });
    Ok((store, ctx))
}
