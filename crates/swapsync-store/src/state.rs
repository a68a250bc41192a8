//! Store state and the reducer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use swapsync_logs::{HashedLogEntry, LogBuffer};
use swapsync_types::approval::{ApprovalRequest, ApprovalStatus};
use swapsync_types::background::{BackgroundTaskUpdate, ContextStatus, TaskComponent};
use swapsync_types::display::DisplayResult;
use swapsync_types::events::ProtocolEvent;
use swapsync_types::progress::SwapProgress;
use swapsync_types::settings::Settings;
use swapsync_types::wallet::{
    ExchangeRates, MoneroBalance, MoneroSyncProgress, MoneroTransfer, SwapInfo,
};
use swapsync_types::{RequestId, Satoshis, SwapId};

use crate::action::Action;

/// The log buffer, shared between the store and its readers.
///
/// Log batches are too large to copy on every state transition, so every
/// snapshot points at the same buffer.
#[derive(Clone, Debug, Default)]
pub struct SharedLogBuffer(Arc<Mutex<LogBuffer>>);

impl SharedLogBuffer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self(Arc::new(Mutex::new(buffer)))
    }

    fn lock(&self) -> MutexGuard<'_, LogBuffer> {
        // The buffer has no invariant a panicking reader could break.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ingest(&self, raw_batch: &str) -> usize {
        self.lock().ingest(raw_batch)
    }

    /// Copy of the newest `limit` entries, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<HashedLogEntry> {
        self.lock().latest(limit)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// `(total ingested, total evicted)` since creation.
    pub fn totals(&self) -> (u64, u64) {
        let buffer = self.lock();
        (buffer.total_ingested(), buffer.total_evicted())
    }
}

/// Wallet data fetched by reactions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WalletState {
    pub bitcoin_balance: Option<Satoshis>,
    pub bitcoin_address: Option<String>,
    pub monero_main_address: Option<String>,
    pub monero_balance: Option<MoneroBalance>,
    pub monero_sync: Option<MoneroSyncProgress>,
    pub monero_history: Vec<MoneroTransfer>,
    pub rates: Option<ExchangeRates>,
}

/// Decided approvals kept for the view; older ones are dropped first.
pub const MAX_DECIDED_APPROVALS: usize = 32;

/// Everything the store knows.
///
/// Collections sit behind `Arc` so a reducer step only copies the part it
/// touches; the rest is shared with the previous snapshot.
#[derive(Clone, Debug, Default)]
pub struct StoreState {
    /// Progress of every swap that has emitted events, by id.
    pub swaps: Arc<BTreeMap<SwapId, SwapProgress>>,
    /// Swap the view follows: the one that most recently made progress.
    pub active_swap: Option<SwapId>,
    pub swap_infos: Arc<BTreeMap<SwapId, SwapInfo>>,
    /// Approval requests in arrival order.
    pub approvals: Arc<Vec<ApprovalRequest>>,
    /// Background tasks by daemon-assigned id.
    pub background_tasks: Arc<BTreeMap<String, BackgroundTaskUpdate>>,
    pub context: ContextStatus,
    pub settings: Settings,
    pub wallet: Arc<WalletState>,
    pub logs: SharedLogBuffer,
}

impl StoreState {
    /// Fresh state around an existing log buffer.
    pub fn with_logs(logs: LogBuffer, settings: Settings) -> Self {
        Self {
            logs: SharedLogBuffer::new(logs),
            settings,
            ..Self::default()
        }
    }

    pub fn active_progress(&self) -> Option<&SwapProgress> {
        self.active_swap.as_ref().and_then(|id| self.swaps.get(id))
    }

    pub fn progress(&self, swap_id: &str) -> Option<&SwapProgress> {
        self.swaps.get(swap_id)
    }

    /// Display state of the active swap.
    pub fn display(&self) -> DisplayResult {
        swapsync_interpreter::interpret(self.active_progress())
    }

    /// Pending approvals, oldest first.
    pub fn pending_approvals(&self) -> impl Iterator<Item = &ApprovalRequest> {
        self.approvals.iter().filter(|a| a.status.is_pending())
    }

    pub fn approval(&self, request_id: &str) -> Option<&ApprovalRequest> {
        self.approvals.iter().find(|a| a.request_id == request_id)
    }

    /// Whether any task for `component` is still pending.
    pub fn is_task_pending(&self, component: &TaskComponent) -> bool {
        self.background_tasks
            .values()
            .any(|task| &task.component == component && task.status.is_pending())
    }

    /// The monero wallet is up but still opening or syncing.
    pub fn is_monero_wallet_busy(&self) -> bool {
        self.is_task_pending(&TaskComponent::OpeningMoneroWallet)
            || self.is_task_pending(&TaskComponent::SyncingMoneroWallet)
    }

    /// Apply one action. Returns whether anything changed.
    pub(crate) fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::SwapProgress { swap_id, event } => self.advance_swap(swap_id, event),
            Action::LogBatch(batch) => self.logs.ingest(batch) > 0,
            Action::BackgroundTask(update) => {
                if self.background_tasks.get(&update.id) == Some(update) {
                    return false;
                }
                Arc::make_mut(&mut self.background_tasks).insert(update.id.clone(), update.clone());
                true
            }
            Action::ContextStatus(status) => set(&mut self.context, *status),
            Action::ApprovalRequested(request) => self.upsert_approval(request),
            Action::ApprovalResolved {
                request_id,
                accepted,
            } => self.resolve_approval(request_id, *accepted),
            Action::PendingApprovals(requests) => self.sync_approvals(requests),
            Action::SettingsChanged(settings) => set(&mut self.settings, settings.clone()),
            Action::ResetSwap => match self.active_swap.take() {
                Some(id) => {
                    Arc::make_mut(&mut self.swaps).remove(&id);
                    true
                }
                None => false,
            },
            Action::SwapInfos(infos) => {
                let next: BTreeMap<_, _> = infos
                    .iter()
                    .map(|info| (info.swap_id.clone(), info.clone()))
                    .collect();
                if *self.swap_infos == next {
                    return false;
                }
                self.swap_infos = Arc::new(next);
                true
            }
            Action::SwapInfo(info) => {
                if self.swap_infos.get(&info.swap_id) == Some(info) {
                    return false;
                }
                Arc::make_mut(&mut self.swap_infos).insert(info.swap_id.clone(), info.clone());
                true
            }
            Action::SwapTimelock { swap_id, timelock } => {
                let Some(info) = self.swap_infos.get(swap_id) else {
                    return false;
                };
                if info.timelock.as_ref() == Some(timelock) {
                    return false;
                }
                Arc::make_mut(&mut self.swap_infos)
                    .get_mut(swap_id)
                    .is_some_and(|info| set(&mut info.timelock, Some(timelock.clone())))
            }
            Action::BitcoinBalance(balance) => {
                self.update_wallet(|w| set(&mut w.bitcoin_balance, Some(*balance)))
            }
            Action::BitcoinAddress(address) => {
                self.update_wallet(|w| set(&mut w.bitcoin_address, Some(address.clone())))
            }
            Action::MoneroMainAddress(address) => {
                self.update_wallet(|w| set(&mut w.monero_main_address, Some(address.clone())))
            }
            Action::MoneroBalance(balance) => {
                self.update_wallet(|w| set(&mut w.monero_balance, Some(*balance)))
            }
            Action::MoneroSyncProgress(progress) => {
                self.update_wallet(|w| set(&mut w.monero_sync, Some(*progress)))
            }
            Action::MoneroHistory(history) => {
                self.update_wallet(|w| set(&mut w.monero_history, history.clone()))
            }
            Action::ExchangeRates(rates) => {
                self.update_wallet(|w| set(&mut w.rates, Some(rates.clone())))
            }
        }
    }

    fn advance_swap(&mut self, swap_id: &SwapId, event: &ProtocolEvent) -> bool {
        let redelivered = self.swaps.get(swap_id).map(|p| p.current() == event);
        let changed = match redelivered {
            // Nothing moves, not even the view.
            Some(true) => false,
            Some(false) => Arc::make_mut(&mut self.swaps)
                .get_mut(swap_id)
                .is_some_and(|progress| progress.advance(event.clone())),
            None => {
                Arc::make_mut(&mut self.swaps).insert(
                    swap_id.clone(),
                    SwapProgress::new(swap_id.clone(), event.clone()),
                );
                true
            }
        };
        if !changed {
            return false;
        }
        // A late Released for another swap does not steal the view.
        let is_active = self.active_swap.as_deref() == Some(swap_id.as_str());
        if !is_active && (self.active_swap.is_none() || !event.is_released()) {
            self.active_swap = Some(swap_id.clone());
        }
        true
    }

    fn update_wallet(&mut self, apply: impl FnOnce(&mut WalletState) -> bool) -> bool {
        apply(Arc::make_mut(&mut self.wallet))
    }

    fn upsert_approval(&mut self, request: &ApprovalRequest) -> bool {
        match self
            .approvals
            .iter()
            .position(|a| a.request_id == request.request_id)
        {
            // Redelivered notifications must not reopen a decided request.
            Some(index) if self.approvals[index].status.is_final() => false,
            Some(index) if self.approvals[index] == *request => false,
            Some(index) => {
                Arc::make_mut(&mut self.approvals)[index] = request.clone();
                true
            }
            None => {
                Arc::make_mut(&mut self.approvals).push(request.clone());
                true
            }
        }
    }

    /// Merge the daemon's pending list, which is authoritative: anything
    /// still pending here but missing there has expired or was answered
    /// elsewhere.
    fn sync_approvals(&mut self, listed: &[ApprovalRequest]) -> bool {
        let mut changed = listed
            .iter()
            .fold(false, |changed, r| self.upsert_approval(r) || changed);

        let is_listed = |a: &ApprovalRequest| listed.iter().any(|l| l.request_id == a.request_id);
        if self
            .approvals
            .iter()
            .any(|a| a.status.is_pending() && !is_listed(a))
        {
            for approval in Arc::make_mut(&mut self.approvals).iter_mut() {
                if approval.status.is_pending() && !is_listed(approval) {
                    tracing::debug!(
                        request_id = %approval.request_id,
                        "approval no longer pending on daemon"
                    );
                    approval.status = ApprovalStatus::Expired;
                }
            }
            changed = true;
        }
        self.prune_decided_approvals() || changed
    }

    fn resolve_approval(&mut self, request_id: &RequestId, accepted: bool) -> bool {
        let status = if accepted {
            ApprovalStatus::Resolved
        } else {
            ApprovalStatus::Rejected
        };
        match self.approvals.iter().position(|a| &a.request_id == request_id) {
            Some(index) if self.approvals[index].status == status => false,
            Some(index) => {
                Arc::make_mut(&mut self.approvals)[index].status = status;
                self.prune_decided_approvals();
                true
            }
            None => {
                tracing::debug!(%request_id, "resolution for unknown approval request");
                false
            }
        }
    }

    /// Drop the oldest decided requests beyond [`MAX_DECIDED_APPROVALS`].
    fn prune_decided_approvals(&mut self) -> bool {
        let decided = self.approvals.iter().filter(|a| !a.status.is_pending()).count();
        let mut excess = decided.saturating_sub(MAX_DECIDED_APPROVALS);
        if excess == 0 {
            return false;
        }
        Arc::make_mut(&mut self.approvals).retain(|a| {
            if excess > 0 && !a.status.is_pending() {
                excess -= 1;
                return false;
            }
            true
        });
        true
    }
}

/// Assign `value` to `slot`, reporting whether it differed.
fn set<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
