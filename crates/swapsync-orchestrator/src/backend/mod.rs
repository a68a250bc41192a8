//! The daemon's request surface, as seen by reactions.
//!
//! Every outbound call the middleware makes goes through [`Backend`], so the
//! transport (JSON-RPC over a socket in the client, memory in tests) is
//! pluggable.

use swapsync_types::approval::{ApprovalDecision, ApprovalRequest};
use swapsync_types::settings::MoneroNodeConfig;
use swapsync_types::wallet::{
    ExchangeRates, MoneroBalance, MoneroSyncProgress, MoneroTransfer, SwapInfo, SwapTimelock,
};
use swapsync_types::Satoshis;

mod memory;

pub use self::memory::MemoryBackend;

/// Errors returned by a backend call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The daemon could not be reached or the connection broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The daemon answered with an error object.
    #[error("daemon error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The daemon's answer did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The daemon does not know the requested entity.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Convenience result type for backend calls.
pub type Result<T> = std::result::Result<T, BackendError>;

#[async_trait::async_trait]
/// Outbound commands to the swap daemon.
pub trait Backend: Send + Sync {
    async fn get_swap_infos_all(&self) -> Result<Vec<SwapInfo>>;

    async fn get_swap_info(&self, swap_id: &str) -> Result<SwapInfo>;

    /// `None` once the swap no longer has a running timelock.
    async fn get_swap_timelock(&self, swap_id: &str) -> Result<Option<SwapTimelock>>;

    async fn get_bitcoin_balance(&self) -> Result<Satoshis>;

    /// A fresh deposit address of the internal bitcoin wallet.
    async fn get_bitcoin_address(&self) -> Result<String>;

    async fn get_monero_main_address(&self) -> Result<String>;

    async fn get_monero_balance(&self) -> Result<MoneroBalance>;

    async fn get_monero_sync_progress(&self) -> Result<MoneroSyncProgress>;

    async fn get_monero_history(&self) -> Result<Vec<MoneroTransfer>>;

    async fn get_pending_approvals(&self) -> Result<Vec<ApprovalRequest>>;

    /// Deliver the user's decision. Succeeds once the daemon has recorded it.
    async fn resolve_approval(&self, decision: ApprovalDecision) -> Result<()>;

    /// Point the monero wallet at another node (or the node pool).
    async fn change_monero_node(&self, node: &MoneroNodeConfig) -> Result<()>;

    async fn get_exchange_rates(&self, fiat_currency: &str) -> Result<ExchangeRates>;
}
