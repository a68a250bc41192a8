//! Swap protocol events pushed by the daemon.
//!
//! Each event names the phase the daemon-side state machine just entered.
//! Payloads carry what the view needs to show progress (txids, confirmation
//! counts); they never carry enough to reconstruct the protocol itself.

use serde::{Deserialize, Serialize};

use crate::{Satoshis, TxId};

/// A maker's price offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidQuote {
    /// Price of one XMR in satoshis.
    pub price: Satoshis,
    /// Smallest BTC amount the maker accepts.
    pub min_quantity: Satoshis,
    /// Largest BTC amount the maker accepts.
    pub max_quantity: Satoshis,
}

/// One phase of an atomic swap, as reported by the daemon.
///
/// Serialized adjacently tagged: `{"type": "BtcCancelled", "content": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content")]
pub enum ProtocolEvent {
    // Setup: no funds locked yet
    RequestingQuote,
    ReceivedQuote(BidQuote),
    WaitingForBtcDeposit {
        deposit_address: String,
        max_giveable: Satoshis,
        min_bitcoin_lock_tx_fee: Satoshis,
    },
    SwapSetupInflight {
        btc_lock_amount: Satoshis,
    },
    RetrievingMoneroBlockheight,
    BtcLockPublishInflight,

    // Happy path
    BtcLockTxInMempool {
        btc_lock_txid: TxId,
        #[serde(default)]
        btc_lock_confirmations: Option<u64>,
    },
    XmrLockTxInMempool {
        xmr_lock_txid: TxId,
        #[serde(default)]
        xmr_lock_tx_confirmations: Option<u64>,
        xmr_lock_tx_target_confirmations: u64,
    },
    XmrLocked,
    EncryptedSignatureSent,
    BtcRedeemed,
    WaitingForXmrConfirmationsBeforeRedeem {
        xmr_lock_txid: TxId,
        xmr_lock_tx_confirmations: u64,
        xmr_lock_tx_target_confirmations: u64,
    },
    RedeemingMonero,
    XmrRedeemInMempool {
        xmr_redeem_txids: Vec<TxId>,
        #[serde(default)]
        xmr_receive_address: Option<String>,
    },

    // Cancellation
    WaitingForCancelTimelockExpiration,
    CancelTimelockExpired,
    BtcCancelled {
        btc_cancel_txid: TxId,
    },

    // Full refund
    BtcRefundPublished {
        btc_refund_txid: TxId,
    },
    BtcEarlyRefundPublished {
        btc_early_refund_txid: TxId,
    },
    BtcRefunded {
        btc_refund_txid: TxId,
    },
    BtcEarlyRefunded {
        btc_early_refund_txid: TxId,
    },

    // Partial refund with amnesty
    BtcPartialRefundPublished {
        btc_partial_refund_txid: TxId,
    },
    BtcPartiallyRefunded {
        btc_partial_refund_txid: TxId,
    },
    BtcAmnestyPublished {
        btc_amnesty_txid: TxId,
    },
    BtcAmnestyReceived {
        btc_amnesty_txid: TxId,
    },
    BtcFinalAmnestyConfirmed {
        btc_final_amnesty_txid: TxId,
    },
    BtcRefundBurnPublished {
        btc_refund_burn_txid: TxId,
    },
    BtcRefundBurnt {
        btc_refund_burn_txid: TxId,
    },

    // Punishment and cooperative redeem
    BtcPunished,
    AttemptingCooperativeRedeem,
    CooperativeRedeemAccepted,
    CooperativeRedeemRejected {
        reason: String,
    },

    /// The daemon is rebuilding session state for a swap loaded from disk.
    Resuming,

    /// The swap task has ended. Carries no detail; the meaning comes from
    /// the event it followed.
    Released,

    /// A tag this client does not know.
    #[serde(other)]
    Unknown,
}

impl ProtocolEvent {
    /// Whether this is the terminal wrapper.
    pub fn is_released(&self) -> bool {
        matches!(self, ProtocolEvent::Released)
    }

    /// The variant name, as it appears in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolEvent::RequestingQuote => "RequestingQuote",
            ProtocolEvent::ReceivedQuote(_) => "ReceivedQuote",
            ProtocolEvent::WaitingForBtcDeposit { .. } => "WaitingForBtcDeposit",
            ProtocolEvent::SwapSetupInflight { .. } => "SwapSetupInflight",
            ProtocolEvent::RetrievingMoneroBlockheight => "RetrievingMoneroBlockheight",
            ProtocolEvent::BtcLockPublishInflight => "BtcLockPublishInflight",
            ProtocolEvent::BtcLockTxInMempool { .. } => "BtcLockTxInMempool",
            ProtocolEvent::XmrLockTxInMempool { .. } => "XmrLockTxInMempool",
            ProtocolEvent::XmrLocked => "XmrLocked",
            ProtocolEvent::EncryptedSignatureSent => "EncryptedSignatureSent",
            ProtocolEvent::BtcRedeemed => "BtcRedeemed",
            ProtocolEvent::WaitingForXmrConfirmationsBeforeRedeem { .. } => {
                "WaitingForXmrConfirmationsBeforeRedeem"
            }
            ProtocolEvent::RedeemingMonero => "RedeemingMonero",
            ProtocolEvent::XmrRedeemInMempool { .. } => "XmrRedeemInMempool",
            ProtocolEvent::WaitingForCancelTimelockExpiration => {
                "WaitingForCancelTimelockExpiration"
            }
            ProtocolEvent::CancelTimelockExpired => "CancelTimelockExpired",
            ProtocolEvent::BtcCancelled { .. } => "BtcCancelled",
            ProtocolEvent::BtcRefundPublished { .. } => "BtcRefundPublished",
            ProtocolEvent::BtcEarlyRefundPublished { .. } => "BtcEarlyRefundPublished",
            ProtocolEvent::BtcRefunded { .. } => "BtcRefunded",
            ProtocolEvent::BtcEarlyRefunded { .. } => "BtcEarlyRefunded",
            ProtocolEvent::BtcPartialRefundPublished { .. } => "BtcPartialRefundPublished",
            ProtocolEvent::BtcPartiallyRefunded { .. } => "BtcPartiallyRefunded",
            ProtocolEvent::BtcAmnestyPublished { .. } => "BtcAmnestyPublished",
            ProtocolEvent::BtcAmnestyReceived { .. } => "BtcAmnestyReceived",
            ProtocolEvent::BtcFinalAmnestyConfirmed { .. } => "BtcFinalAmnestyConfirmed",
            ProtocolEvent::BtcRefundBurnPublished { .. } => "BtcRefundBurnPublished",
            ProtocolEvent::BtcRefundBurnt { .. } => "BtcRefundBurnt",
            ProtocolEvent::BtcPunished => "BtcPunished",
            ProtocolEvent::AttemptingCooperativeRedeem => "AttemptingCooperativeRedeem",
            ProtocolEvent::CooperativeRedeemAccepted => "CooperativeRedeemAccepted",
            ProtocolEvent::CooperativeRedeemRejected { .. } => "CooperativeRedeemRejected",
            ProtocolEvent::Resuming => "Resuming",
            ProtocolEvent::Released => "Released",
            ProtocolEvent::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_tagging() {
        let event = ProtocolEvent::BtcCancelled {
            btc_cancel_txid: "ab".repeat(32),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "BtcCancelled");
        assert_eq!(json["content"]["btc_cancel_txid"], "ab".repeat(32));

        let parsed: ProtocolEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unit_variant_without_content() {
        let parsed: ProtocolEvent =
            serde_json::from_str(r#"{"type":"Released"}"#).expect("deserialize");
        assert!(parsed.is_released());
    }

    #[test]
    fn test_unknown_tag_is_tolerated() {
        let parsed: ProtocolEvent =
            serde_json::from_str(r#"{"type":"SomethingFromTheFuture"}"#).expect("deserialize");
        assert_eq!(parsed, ProtocolEvent::Unknown);
    }

    #[test]
    fn test_missing_confirmations_default_to_none() {
        let parsed: ProtocolEvent = serde_json::from_str(
            r#"{"type":"BtcLockTxInMempool","content":{"btc_lock_txid":"00"}}"#,
        )
        .expect("deserialize");
        assert_eq!(
            parsed,
            ProtocolEvent::BtcLockTxInMempool {
                btc_lock_txid: "00".to_string(),
                btc_lock_confirmations: None,
            }
        );
    }

    #[test]
    fn test_name_matches_tag() {
        let event = ProtocolEvent::CooperativeRedeemRejected {
            reason: "timeout".to_string(),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], event.name());
    }
}
