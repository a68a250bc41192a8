//! # swapsync-interpreter
//!
//! Maps a swap's (previous, current) protocol events onto a position in one
//! of the view's step ladders.
//!
//! `Released` carries no protocol detail of its own; it only says the swap
//! task ended. What the ending means (success, refund, punishment) is
//! decided by the event it followed, so the interpreter works on the pair
//! rather than on a single snapshot.
//!
//! ## Ladders
//!
//! | path | steps |
//! |---|---|
//! | happy | 0 BTC lock unconfirmed, 1 BTC confirmed / XMR lock, 2 signature exchange, 3 redeeming, 4 XMR redeemed |
//! | generic recovery | 0 cancel timelock, 1 cancelled |
//! | full refund | 1 published, 2 refunded |
//! | partial refund | 1 published, 2 partially refunded / amnesty published / burn, 3 amnesty received |
//! | cooperative redeem | 1 punished, 2 redeem attempted / accepted / rejected |

use swapsync_types::display::{DisplayResult, DisplayState, RecoveryScenario};
use swapsync_types::events::ProtocolEvent;
use swapsync_types::progress::SwapProgress;

/// Reasons a swap progress cannot be placed on any ladder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpretError {
    /// `Released` arrived with no event before it.
    #[error("swap {swap_id} was released but no previous state is known")]
    ReleasedWithoutPrevious { swap_id: String },

    /// Two `Released` events in a row.
    #[error("swap {swap_id}: both the current and the previous state are Released")]
    DoubleRelease { swap_id: String },

    /// The daemon sent a state this client does not know.
    #[error("swap {swap_id}: unknown protocol state (current {current})")]
    UnknownState { swap_id: String, current: String },
}

/// Convenience result type for interpretation.
pub type Result<T> = std::result::Result<T, InterpretError>;

/// Where `progress` belongs, or `None` when there is nothing to show.
///
/// Protocol violations and unknown states are logged with the full pair and
/// degrade to `None`. Use [`explain`] to get the diagnostic instead.
pub fn interpret(progress: Option<&SwapProgress>) -> DisplayResult {
    explain(progress).unwrap_or_else(|err| {
        tracing::error!(
            error = %err,
            current = ?progress.map(SwapProgress::current),
            previous = ?progress.and_then(SwapProgress::previous),
            "unable to choose a display state for swap"
        );
        None
    })
}

/// Like [`interpret`], but returns the reason the fallback path was taken.
pub fn explain(progress: Option<&SwapProgress>) -> Result<DisplayResult> {
    let Some(progress) = progress else {
        // Initial render before the first event.
        return Ok(Some(DisplayState::happy(0, false)));
    };

    let released = progress.is_released();
    let effective = if released {
        progress
            .previous()
            .ok_or_else(|| InterpretError::ReleasedWithoutPrevious {
                swap_id: progress.swap_id.clone(),
            })?
    } else {
        progress.current()
    };

    classify(effective, released).ok_or_else(|| match effective {
        ProtocolEvent::Released => InterpretError::DoubleRelease {
            swap_id: progress.swap_id.clone(),
        },
        other => InterpretError::UnknownState {
            swap_id: progress.swap_id.clone(),
            current: other.name().to_string(),
        },
    })
}

/// Classify one substantive event.
///
/// The outer `Option` is `None` for events that cannot be effective
/// (`Released`, `Unknown`); the inner one is `None` for events with nothing
/// to display.
fn classify(event: &ProtocolEvent, released: bool) -> Option<DisplayResult> {
    use ProtocolEvent as E;
    use RecoveryScenario::{CooperativeRedeem, FullRefund, Generic, PartialRefund};

    let state = match event {
        // No funds locked yet
        E::RequestingQuote
        | E::ReceivedQuote(_)
        | E::WaitingForBtcDeposit { .. }
        | E::SwapSetupInflight { .. }
        | E::RetrievingMoneroBlockheight
        | E::BtcLockPublishInflight => None,

        // Happy path
        E::BtcLockTxInMempool {
            btc_lock_confirmations,
            ..
        } => {
            let step = match btc_lock_confirmations {
                Some(confirmations) if *confirmations > 0 => 1,
                _ => 0,
            };
            Some(DisplayState::happy(step, released))
        }
        // Both sides are locked; ending here leaves the swap resumable.
        E::XmrLockTxInMempool { .. } => Some(DisplayState::happy(1, false)),
        E::XmrLocked | E::EncryptedSignatureSent | E::BtcRedeemed => {
            Some(DisplayState::happy(2, released))
        }
        E::WaitingForXmrConfirmationsBeforeRedeem { .. } | E::RedeemingMonero => {
            Some(DisplayState::happy(3, released))
        }
        E::XmrRedeemInMempool { .. } => Some(DisplayState::happy(4, false)),

        // Generic recovery
        E::WaitingForCancelTimelockExpiration | E::CancelTimelockExpired => {
            Some(DisplayState::recovery(Generic, 0, released))
        }
        E::BtcCancelled { .. } => Some(DisplayState::recovery(Generic, 1, released)),

        // Full refund
        E::BtcRefundPublished { .. } | E::BtcEarlyRefundPublished { .. } => {
            Some(DisplayState::recovery(FullRefund, 1, released))
        }
        E::BtcRefunded { .. } | E::BtcEarlyRefunded { .. } => {
            Some(DisplayState::recovery(FullRefund, 2, false))
        }

        // Partial refund
        E::BtcPartialRefundPublished { .. } => {
            Some(DisplayState::recovery(PartialRefund, 1, released))
        }
        E::BtcPartiallyRefunded { .. } | E::BtcAmnestyPublished { .. } => {
            Some(DisplayState::recovery(PartialRefund, 2, released))
        }
        E::BtcAmnestyReceived { .. } | E::BtcFinalAmnestyConfirmed { .. } => {
            Some(DisplayState::recovery(PartialRefund, 3, false))
        }
        E::BtcRefundBurnPublished { .. } | E::BtcRefundBurnt { .. } => {
            Some(DisplayState::recovery(PartialRefund, 2, true))
        }

        // Punished, cooperative redeem
        E::BtcPunished => Some(DisplayState::recovery(CooperativeRedeem, 1, true)),
        E::AttemptingCooperativeRedeem | E::CooperativeRedeemAccepted => {
            Some(DisplayState::recovery(CooperativeRedeem, 2, released))
        }
        E::CooperativeRedeemRejected { .. } => {
            Some(DisplayState::recovery(CooperativeRedeem, 2, true))
        }

        // Session state is still being rebuilt
        E::Resuming => None,

        E::Released | E::Unknown => return None,
    };

    Some(state)
}
