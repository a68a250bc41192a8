//! Reactions wired to store transitions.

use std::future::Future;
use std::sync::Arc;

use swapsync_store::{when, Action, EventStore, StoreHandle, Transition};
use swapsync_types::approval::ApprovalDecision;
use swapsync_types::{RequestId, SwapId};

use crate::backend::{self, Backend};
use crate::coalesce::{CoalesceConfig, CoalescerRegistry};
use crate::readiness::ReadinessEdges;
use crate::{OrchestratorError, Result};

/// Derives backend calls from store transitions.
///
/// Cheap to clone; every clone shares the backend, the store handle and
/// the per-swap coalescers.
#[derive(Clone)]
pub struct Orchestrator {
    backend: Arc<dyn Backend>,
    store: StoreHandle,
    swap_updates: Arc<CoalescerRegistry<SwapId, SwapId>>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn Backend>, store: StoreHandle, config: CoalesceConfig) -> Self {
        Self {
            backend,
            store,
            swap_updates: Arc::new(CoalescerRegistry::new(config)),
        }
    }

    /// Register every reaction on `store`.
    pub fn install(&self, store: &mut EventStore) {
        let this = self.clone();
        store.subscribe(when(
            |t| matches!(t.action, Action::ContextStatus(_)),
            move |t| this.on_context_status(t),
        ));

        let this = self.clone();
        store.subscribe(when(
            |t| matches!(t.action, Action::SwapProgress { .. }),
            move |t| this.on_swap_progress(t),
        ));

        let this = self.clone();
        store.subscribe(when(
            |t| matches!(t.action, Action::SettingsChanged(_)),
            move |t| this.on_settings_changed(t),
        ));

        let this = self.clone();
        store.subscribe(when(
            |t| {
                matches!(t.action, Action::ApprovalRequested(_))
                    && t.after.context.database_available
            },
            move |_| this.fetch_pending_approvals(),
        ));

        // A monero wallet that finished opening or syncing has new numbers.
        let this = self.clone();
        store.subscribe(when(
            |t| {
                matches!(t.action, Action::BackgroundTask(_))
                    && t.before.is_monero_wallet_busy()
                    && !t.after.is_monero_wallet_busy()
                    && t.after.context.monero_wallet_available
            },
            move |_| this.refresh_monero(),
        ));

        tracing::debug!("orchestrator installed");
    }

    /// Deliver the user's decision on an approval request.
    ///
    /// The store only learns the outcome once the daemon confirmed it.
    pub async fn resolve_approval(
        &self,
        request_id: RequestId,
        accept: bool,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.backend
            .resolve_approval(ApprovalDecision {
                request_id: request_id.clone(),
                accept,
                payload,
            })
            .await?;
        tracing::info!(%request_id, accept, "approval resolved");
        self.store.dispatch(Action::ApprovalResolved {
            request_id,
            accepted: accept,
        })?;
        Ok(())
    }

    fn on_context_status(&self, transition: &Transition) {
        let edges = ReadinessEdges::between(&transition.before.context, &transition.after.context);
        if !edges.any() {
            return;
        }
        tracing::info!(?edges, "daemon subsystems became available");

        if edges.database {
            self.fetch("swap_infos", |b| async move {
                b.get_swap_infos_all().await.map(Action::SwapInfos)
            });
            self.fetch_pending_approvals();
        }
        if edges.bitcoin_wallet {
            self.fetch_bitcoin_balance();
            self.fetch("bitcoin_address", |b| async move {
                b.get_bitcoin_address().await.map(Action::BitcoinAddress)
            });
        }
        if edges.monero_wallet {
            let this = self.clone();
            self.spawn("monero_wallet_ready", async move { this.on_monero_ready().await });
        }
    }

    fn on_swap_progress(&self, transition: &Transition) {
        let Action::SwapProgress { swap_id, event } = &transition.action else {
            return;
        };

        let this = self.clone();
        self.swap_updates
            .push(swap_id.clone(), swap_id.clone(), move || {
                move |swap_id: SwapId| {
                    let this = this.clone();
                    async move { this.refresh_swap(&swap_id).await }
                }
            });

        // Funds moved: refresh balances regardless of the coalescer's cooldown.
        if event.is_released() {
            tracing::info!(%swap_id, "swap released, refreshing balances");
            self.fetch_bitcoin_balance();
            self.fetch("monero_balance", |b| async move {
                b.get_monero_balance().await.map(Action::MoneroBalance)
            });
        }
    }

    fn on_settings_changed(&self, transition: &Transition) {
        let before = &transition.before.settings;
        let after = &transition.after.settings;

        if after.fetch_fiat_prices
            && (!before.fetch_fiat_prices || before.fiat_currency != after.fiat_currency)
        {
            let currency = after.fiat_currency.clone();
            self.fetch("exchange_rates", |b| async move {
                b.get_exchange_rates(&currency).await.map(Action::ExchangeRates)
            });
        }
        if before.bitcoin_unit != after.bitcoin_unit {
            self.fetch_bitcoin_balance();
        }
        if before.monero_node != after.monero_node && transition.after.context.monero_wallet_available
        {
            let backend = self.backend.clone();
            let node = after.monero_node.clone();
            self.spawn("change_monero_node", async move {
                backend
                    .change_monero_node(&node)
                    .await
                    .map_err(OrchestratorError::from)
            });
        }
    }

    async fn on_monero_ready(&self) -> Result<()> {
        let node = self.store.state().settings.monero_node.clone();
        if let Err(e) = self.backend.change_monero_node(&node).await {
            tracing::warn!(error = %e, "could not apply monero node, keeping the wallet's own");
        }

        let (address, sync) = tokio::join!(
            self.backend.get_monero_main_address(),
            self.backend.get_monero_sync_progress(),
        );
        self.deliver("monero_main_address", address.map(Action::MoneroMainAddress));
        self.deliver("monero_sync_progress", sync.map(Action::MoneroSyncProgress));

        self.load_monero_funds().await
    }

    fn refresh_monero(&self) {
        self.fetch("monero_sync_progress", |b| async move {
            b.get_monero_sync_progress().await.map(Action::MoneroSyncProgress)
        });
        let this = self.clone();
        self.spawn("monero_funds", async move { this.load_monero_funds().await });
    }

    /// Balance first, then history: the history is only worth showing once
    /// the balance it explains is known.
    async fn load_monero_funds(&self) -> Result<()> {
        let balance = self.backend.get_monero_balance().await?;
        self.store.dispatch(Action::MoneroBalance(balance))?;
        let history = self.backend.get_monero_history().await?;
        self.store.dispatch(Action::MoneroHistory(history))?;
        Ok(())
    }

    /// Coalesced per-swap refresh. Errors stop here; the next event retries.
    async fn refresh_swap(&self, swap_id: &str) {
        let info = self.backend.get_swap_info(swap_id).await;
        self.deliver("swap_info", info.map(Action::SwapInfo));

        match self.backend.get_swap_timelock(swap_id).await {
            Ok(Some(timelock)) => self.deliver(
                "swap_timelock",
                Ok(Action::SwapTimelock {
                    swap_id: swap_id.to_string(),
                    timelock,
                }),
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!(%swap_id, error = %e, "timelock refresh failed"),
        }
    }

    fn fetch_pending_approvals(&self) {
        self.fetch("pending_approvals", |b| async move {
            b.get_pending_approvals().await.map(Action::PendingApprovals)
        });
    }

    fn fetch_bitcoin_balance(&self) {
        self.fetch("bitcoin_balance", |b| async move {
            b.get_bitcoin_balance().await.map(Action::BitcoinBalance)
        });
    }

    /// Spawn a single backend call whose result becomes one action.
    fn fetch<F, Fut>(&self, name: &'static str, call: F)
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = backend::Result<Action>> + Send + 'static,
    {
        let request = call(self.backend.clone());
        let this = self.clone();
        tokio::spawn(async move { this.deliver(name, request.await) });
    }

    /// Spawn a multi-step reaction, logging its failure.
    fn spawn(&self, name: &'static str, reaction: impl Future<Output = Result<()>> + Send + 'static) {
        tokio::spawn(async move {
            match reaction.await {
                Ok(()) => tracing::debug!(reaction = name, "reaction finished"),
                Err(e) => tracing::warn!(reaction = name, error = %e, "reaction failed"),
            }
        });
    }

    fn deliver(&self, name: &'static str, result: backend::Result<Action>) {
        match result {
            Ok(action) => {
                if self.store.dispatch(action).is_err() {
                    tracing::debug!(reaction = name, "store closed, dropping result");
                }
            }
            Err(e) => tracing::warn!(reaction = name, error = %e, "reaction failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use swapsync_store::StoreState;
    use swapsync_types::approval::{ApprovalRequest, ApprovalStatus};
    use swapsync_types::background::{
        BackgroundTaskStatus, BackgroundTaskUpdate, ContextStatus, TaskComponent,
    };
    use swapsync_types::events::ProtocolEvent;
    use swapsync_types::settings::{BitcoinUnit, MoneroNodeConfig, Settings};
    use swapsync_types::wallet::{ExchangeRates, MoneroBalance, MoneroSyncProgress, SwapInfo};
    use tokio::sync::broadcast;

    use super::*;
    use crate::MemoryBackend;

    struct Harness {
        backend: Arc<MemoryBackend>,
        orchestrator: Orchestrator,
        handle: StoreHandle,
        _shutdown: broadcast::Sender<()>,
    }

    impl Harness {
        fn start(backend: MemoryBackend) -> Self {
            let backend = Arc::new(backend);
            let mut store = EventStore::new(StoreState::default());
            let orchestrator =
                Orchestrator::new(backend.clone(), store.handle(), CoalesceConfig::default());
            orchestrator.install(&mut store);
            let handle = store.handle();
            let (shutdown, rx) = broadcast::channel(1);
            tokio::spawn(store.run(rx));
            Self {
                backend,
                orchestrator,
                handle,
                _shutdown: shutdown,
            }
        }

        fn send(&self, action: Action) {
            self.handle.dispatch(action).expect("dispatch");
        }

        fn context(&self, database: bool, bitcoin: bool, monero: bool) {
            self.send(Action::ContextStatus(ContextStatus {
                database_available: database,
                bitcoin_wallet_available: bitcoin,
                monero_wallet_available: monero,
                tor_available: false,
            }));
        }

        fn progress(&self, swap_id: &str, event: ProtocolEvent) {
            self.send(Action::SwapProgress {
                swap_id: swap_id.to_string(),
                event,
            });
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn swap(id: &str) -> SwapInfo {
        SwapInfo {
            swap_id: id.to_string(),
            state_name: "btc is locked".to_string(),
            completed: false,
            btc_amount: 100_000,
            xmr_amount: 1_000_000_000_000,
            start_date: "2024-01-01T00:00:00Z".to_string(),
            timelock: None,
        }
    }

    fn pending(id: &str) -> ApprovalRequest {
        ApprovalRequest {
            request_id: id.to_string(),
            request_type: "LockBitcoin".to_string(),
            content: serde_json::Value::Null,
            status: ApprovalStatus::Pending,
            expiration_ts: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_database_edge_loads_swaps_and_approvals_once() {
        let backend = MemoryBackend::new();
        backend.put_swap(swap("a"));
        backend.push_approval(pending("r1"));
        let h = Harness::start(backend);

        h.context(true, false, false);
        settle().await;
        let state = h.handle.state();
        assert!(state.swap_infos.contains_key("a"));
        assert_eq!(state.pending_approvals().count(), 1);

        // Steady state: no refetch.
        h.context(true, false, false);
        h.context(true, true, false);
        settle().await;
        assert_eq!(h.backend.call_count("get_swap_infos_all"), 1);

        // Lost and regained: a new edge.
        h.context(false, true, false);
        h.context(true, true, false);
        settle().await;
        assert_eq!(h.backend.call_count("get_swap_infos_all"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_does_not_abort_siblings() {
        let backend = MemoryBackend::new();
        backend.fail("get_swap_infos_all");
        backend.push_approval(pending("r1"));
        let h = Harness::start(backend);

        h.context(true, false, false);
        settle().await;
        let state = h.handle.state();
        assert!(state.swap_infos.is_empty());
        assert_eq!(state.pending_approvals().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bitcoin_edge_loads_balance_and_address() {
        let backend = MemoryBackend::new();
        backend.set_bitcoin(42_000, "bc1qexample");
        let h = Harness::start(backend);

        h.context(false, true, false);
        settle().await;
        let wallet = h.handle.state().wallet.clone();
        assert_eq!(wallet.bitcoin_balance, Some(42_000));
        assert_eq!(wallet.bitcoin_address.as_deref(), Some("bc1qexample"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monero_edge_applies_node_before_fetching() {
        let backend = MemoryBackend::new();
        backend.set_monero(
            "4Aexample",
            MoneroBalance {
                total: 5,
                unlocked: 3,
            },
            MoneroSyncProgress {
                current_block: 10,
                target_block: 10,
            },
        );
        let h = Harness::start(backend);
        let node = MoneroNodeConfig::SingleNode {
            url: "http://node.example:18081".to_string(),
        };
        h.send(Action::SettingsChanged(Settings {
            monero_node: node.clone(),
            ..Settings::default()
        }));

        h.context(false, false, true);
        settle().await;

        let calls = h.backend.calls();
        let position = |name: &str| {
            calls
                .iter()
                .position(|c| *c == name)
                .expect("expected backend call was not made")
        };
        assert!(position("change_monero_node") < position("get_monero_main_address"));
        assert!(position("change_monero_node") < position("get_monero_sync_progress"));
        assert!(position("get_monero_sync_progress") < position("get_monero_balance"));
        assert!(position("get_monero_balance") < position("get_monero_history"));
        assert_eq!(h.backend.monero_node(), Some(node));

        let wallet = h.handle.state().wallet.clone();
        assert_eq!(wallet.monero_main_address.as_deref(), Some("4Aexample"));
        assert_eq!(wallet.monero_balance.map(|b| b.unlocked), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_refreshes_balances_during_cooldown() {
        let backend = MemoryBackend::new();
        backend.put_swap(swap("a"));
        let h = Harness::start(backend);

        h.progress("a", ProtocolEvent::XmrLocked);
        settle().await;
        assert_eq!(h.backend.call_count("get_swap_info"), 1);

        h.progress("a", ProtocolEvent::Released);
        settle().await;
        // The coalescer is still inside its window; balances are not.
        assert_eq!(h.backend.call_count("get_swap_info"), 1);
        assert_eq!(h.backend.call_count("get_bitcoin_balance"), 1);
        assert_eq!(h.backend.call_count("get_monero_balance"), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.backend.call_count("get_swap_info"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_event_triggers_nothing() {
        let h = Harness::start(MemoryBackend::new());
        h.progress("a", ProtocolEvent::Released);
        settle().await;
        h.backend.clear_calls();

        h.progress("a", ProtocolEvent::Released);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_reactions() {
        let backend = MemoryBackend::new();
        backend.set_rates(ExchangeRates {
            fiat_currency: "EUR".to_string(),
            btc_price: 60_000.0,
            xmr_price: 150.0,
            xmr_btc_rate: 0.0025,
        });
        let h = Harness::start(backend);

        h.send(Action::SettingsChanged(Settings {
            fetch_fiat_prices: true,
            fiat_currency: "EUR".to_string(),
            ..Settings::default()
        }));
        settle().await;
        assert_eq!(
            h.handle.state().wallet.rates.as_ref().map(|r| r.fiat_currency.as_str()),
            Some("EUR")
        );

        h.send(Action::SettingsChanged(Settings {
            fetch_fiat_prices: true,
            fiat_currency: "EUR".to_string(),
            bitcoin_unit: BitcoinUnit::Sats,
            monero_node: MoneroNodeConfig::SingleNode {
                url: "http://node.example:18081".to_string(),
            },
        }));
        settle().await;
        assert_eq!(h.backend.call_count("get_exchange_rates"), 1);
        assert_eq!(h.backend.call_count("get_bitcoin_balance"), 1);
        // Monero wallet is not up yet.
        assert_eq!(h.backend.call_count("change_monero_node"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_approval_refetches_when_database_ready() {
        let backend = MemoryBackend::new();
        backend.push_approval(pending("r1"));
        backend.push_approval(pending("r2"));
        let h = Harness::start(backend);

        h.send(Action::ApprovalRequested(pending("r1")));
        settle().await;
        assert_eq!(h.backend.call_count("get_pending_approvals"), 0);

        h.context(true, false, false);
        h.backend.push_approval(pending("r3"));
        h.send(Action::ApprovalRequested(pending("r3")));
        settle().await;
        assert_eq!(h.backend.call_count("get_pending_approvals"), 2);
        let ids: Vec<String> = h
            .handle
            .state()
            .pending_approvals()
            .map(|a| a.request_id.clone())
            .collect();
        assert_eq!(ids, vec!["r1", "r3", "r2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_retires_requests_answered_elsewhere() {
        let backend = MemoryBackend::new();
        backend.push_approval(pending("r1"));
        let h = Harness::start(backend);
        h.context(true, false, false);
        settle().await;
        assert_eq!(h.handle.state().pending_approvals().count(), 1);

        h.backend
            .resolve_approval(ApprovalDecision {
                request_id: "r1".to_string(),
                accept: true,
                payload: serde_json::Value::Null,
            })
            .await
            .expect("resolve");
        h.backend.push_approval(pending("r2"));
        h.send(Action::ApprovalRequested(pending("r2")));
        settle().await;

        let state = h.handle.state();
        let ids: Vec<&str> = state.pending_approvals().map(|a| a.request_id.as_str()).collect();
        assert_eq!(ids, vec!["r2"]);
        assert_eq!(
            state.approval("r1").map(|a| a.status),
            Some(ApprovalStatus::Expired)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_approval_round_trip() {
        let backend = MemoryBackend::new();
        backend.push_approval(pending("r1"));
        let h = Harness::start(backend);
        h.send(Action::ApprovalRequested(pending("r1")));

        h.orchestrator
            .resolve_approval("r1".to_string(), false, serde_json::Value::Null)
            .await
            .expect("resolve");
        let state = h
            .handle
            .wait_for(|s| s.pending_approvals().count() == 0)
            .await
            .expect("wait");
        assert_eq!(
            state.approval("r1").map(|a| a.status),
            Some(ApprovalStatus::Rejected)
        );

        assert!(h
            .orchestrator
            .resolve_approval("missing".to_string(), true, serde_json::Value::Null)
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monero_wallet_settling_refreshes_balance() {
        let h = Harness::start(MemoryBackend::new());
        h.context(false, false, true);
        let mut task = BackgroundTaskUpdate {
            id: "sync".to_string(),
            component: TaskComponent::SyncingMoneroWallet,
            status: BackgroundTaskStatus::Pending(None),
        };
        h.send(Action::BackgroundTask(task.clone()));
        settle().await;
        h.backend.clear_calls();

        task.status = BackgroundTaskStatus::Done;
        h.send(Action::BackgroundTask(task));
        settle().await;
        assert_eq!(h.backend.call_count("get_monero_balance"), 1);
        assert_eq!(h.backend.call_count("get_monero_history"), 1);
    }
}
