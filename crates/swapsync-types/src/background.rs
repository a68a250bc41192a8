//! Background task progress and daemon readiness.

use serde::{Deserialize, Serialize};

/// Long-running daemon tasks the view may show progress for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskComponent {
    OpeningDatabase,
    OpeningBitcoinWallet,
    OpeningMoneroWallet,
    SyncingMoneroWallet,
    FullScanningBitcoinWallet,
    SyncingBitcoinWallet,
    EstablishingTorCircuits,
    BackgroundRefund,
    /// A component this client does not know by name.
    #[serde(untagged)]
    Other(String),
}

/// Progress of one task, as a fraction `consumed / total` when known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub consumed: u64,
    pub total: u64,
}

/// Current phase of a background task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum BackgroundTaskStatus {
    Pending(Option<TaskProgress>),
    Done,
}

impl BackgroundTaskStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, BackgroundTaskStatus::Pending(_))
    }
}

/// A status update for one background task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundTaskUpdate {
    /// Daemon-assigned id; several tasks may share a component.
    pub id: String,
    pub component: TaskComponent,
    pub status: BackgroundTaskStatus,
}

/// Which daemon subsystems are up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStatus {
    #[serde(default)]
    pub bitcoin_wallet_available: bool,
    #[serde(default)]
    pub monero_wallet_available: bool,
    #[serde(default)]
    pub database_available: bool,
    #[serde(default)]
    pub tor_available: bool,
}
