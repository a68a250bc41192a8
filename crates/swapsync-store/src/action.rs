//! Actions applied by the reducer.

use serde::{Deserialize, Serialize};
use swapsync_types::approval::ApprovalRequest;
use swapsync_types::background::{BackgroundTaskUpdate, ContextStatus};
use swapsync_types::events::ProtocolEvent;
use swapsync_types::settings::Settings;
use swapsync_types::wallet::{
    ExchangeRates, MoneroBalance, MoneroSyncProgress, MoneroTransfer, SwapInfo, SwapTimelock,
};
use swapsync_types::{RequestId, Satoshis, SwapId};

/// Everything that can change the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    // Backend notifications
    SwapProgress {
        swap_id: SwapId,
        event: ProtocolEvent,
    },
    LogBatch(String),
    BackgroundTask(BackgroundTaskUpdate),
    ContextStatus(ContextStatus),
    ApprovalRequested(ApprovalRequest),
    ApprovalResolved {
        request_id: RequestId,
        accepted: bool,
    },

    // User intent
    SettingsChanged(Settings),
    /// Forget the active swap (user abandoned it or left mock mode).
    ResetSwap,

    // Reaction results
    SwapInfos(Vec<SwapInfo>),
    SwapInfo(SwapInfo),
    SwapTimelock {
        swap_id: SwapId,
        timelock: SwapTimelock,
    },
    PendingApprovals(Vec<ApprovalRequest>),
    BitcoinBalance(Satoshis),
    BitcoinAddress(String),
    MoneroMainAddress(String),
    MoneroBalance(MoneroBalance),
    MoneroSyncProgress(MoneroSyncProgress),
    MoneroHistory(Vec<MoneroTransfer>),
    ExchangeRates(ExchangeRates),
}

impl Action {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::SwapProgress { .. } => "swap_progress",
            Action::LogBatch(_) => "log_batch",
            Action::BackgroundTask(_) => "background_task",
            Action::ContextStatus(_) => "context_status",
            Action::ApprovalRequested(_) => "approval_requested",
            Action::ApprovalResolved { .. } => "approval_resolved",
            Action::SettingsChanged(_) => "settings_changed",
            Action::ResetSwap => "reset_swap",
            Action::SwapInfos(_) => "swap_infos",
            Action::SwapInfo(_) => "swap_info",
            Action::SwapTimelock { .. } => "swap_timelock",
            Action::PendingApprovals(_) => "pending_approvals",
            Action::BitcoinBalance(_) => "bitcoin_balance",
            Action::BitcoinAddress(_) => "bitcoin_address",
            Action::MoneroMainAddress(_) => "monero_main_address",
            Action::MoneroBalance(_) => "monero_balance",
            Action::MoneroSyncProgress(_) => "monero_sync_progress",
            Action::MoneroHistory(_) => "monero_history",
            Action::ExchangeRates(_) => "exchange_rates",
        }
    }
}

/// One notification on the daemon's event feed.
///
/// Wire form: `{"event": "swap_progress", "payload": {...}}`, one per line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum InboundEvent {
    SwapProgress {
        swap_id: SwapId,
        event: ProtocolEvent,
    },
    CliLog {
        buffer: String,
    },
    BackgroundProgress(BackgroundTaskUpdate),
    ContextStatus(ContextStatus),
    Approval(ApprovalRequest),
    ApprovalResolved {
        request_id: RequestId,
        accepted: bool,
    },
}

impl From<InboundEvent> for Action {
    fn from(event: InboundEvent) -> Self {
        match event {
            InboundEvent::SwapProgress { swap_id, event } => Action::SwapProgress { swap_id, event },
            InboundEvent::CliLog { buffer } => Action::LogBatch(buffer),
            InboundEvent::BackgroundProgress(update) => Action::BackgroundTask(update),
            InboundEvent::ContextStatus(status) => Action::ContextStatus(status),
            InboundEvent::Approval(request) => Action::ApprovalRequested(request),
            InboundEvent::ApprovalResolved {
                request_id,
                accepted,
            } => Action::ApprovalResolved {
                request_id,
                accepted,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_swap_progress() {
        let line = r#"{"event":"swap_progress","payload":{"swap_id":"s1","event":{"type":"BtcPunished"}}}"#;
        let inbound: InboundEvent = serde_json::from_str(line).expect("deserialize");
        assert_eq!(
            Action::from(inbound),
            Action::SwapProgress {
                swap_id: "s1".to_string(),
                event: ProtocolEvent::BtcPunished,
            }
        );
    }

    #[test]
    fn test_inbound_log_and_context() {
        let log: InboundEvent =
            serde_json::from_str(r#"{"event":"cli_log","payload":{"buffer":"a\nb\n"}}"#)
                .expect("deserialize");
        assert_eq!(Action::from(log), Action::LogBatch("a\nb\n".to_string()));

        let status: InboundEvent = serde_json::from_str(
            r#"{"event":"context_status","payload":{"database_available":true}}"#,
        )
        .expect("deserialize");
        match Action::from(status) {
            Action::ContextStatus(status) => {
                assert!(status.database_available);
                assert!(!status.bitcoin_wallet_available);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }
}
