use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use swapsync_types::approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus};
use swapsync_types::settings::MoneroNodeConfig;
use swapsync_types::wallet::{
    ExchangeRates, MoneroBalance, MoneroSyncProgress, MoneroTransfer, SwapInfo, SwapTimelock,
};
use swapsync_types::{Satoshis, SwapId};

use super::{Backend, BackendError, Result};

#[derive(Debug, Default)]
struct Inner {
    swaps: BTreeMap<SwapId, SwapInfo>,
    timelocks: BTreeMap<SwapId, SwapTimelock>,
    bitcoin_balance: Satoshis,
    bitcoin_address: String,
    monero_main_address: String,
    monero_balance: MoneroBalance,
    monero_sync: MoneroSyncProgress,
    monero_history: Vec<MoneroTransfer>,
    approvals: Vec<ApprovalRequest>,
    monero_node: Option<MoneroNodeConfig>,
    rates: Option<ExchangeRates>,
    failing: HashSet<&'static str>,
    calls: Vec<&'static str>,
}

/// In-memory backend.
///
/// Answers from whatever was last stored with the setters, records every
/// call by method name, and can be told to fail specific methods. Not
/// shared between instances nor persisted.
#[derive(Debug, Default)]
pub struct MemoryBackend(Mutex<Inner>);

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call to `method`, failing if it was marked as failing.
    fn call(&self, method: &'static str) -> Result<MutexGuard<'_, Inner>> {
        let mut inner = self.inner();
        inner.calls.push(method);
        if inner.failing.contains(method) {
            return Err(BackendError::Rpc {
                code: -32000,
                message: format!("{method} is unavailable"),
            });
        }
        Ok(inner)
    }

    /// Make every later call to `method` fail.
    pub fn fail(&self, method: &'static str) {
        self.inner().failing.insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.inner().failing.remove(method);
    }

    /// Method names called so far, in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.inner().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.inner().calls.iter().filter(|c| **c == method).count()
    }

    pub fn clear_calls(&self) {
        self.inner().calls.clear();
    }

    pub fn put_swap(&self, info: SwapInfo) {
        self.inner().swaps.insert(info.swap_id.clone(), info);
    }

    pub fn put_timelock(&self, swap_id: &str, timelock: SwapTimelock) {
        self.inner().timelocks.insert(swap_id.to_string(), timelock);
    }

    pub fn set_bitcoin(&self, balance: Satoshis, address: &str) {
        let mut inner = self.inner();
        inner.bitcoin_balance = balance;
        inner.bitcoin_address = address.to_string();
    }

    pub fn set_monero(&self, address: &str, balance: MoneroBalance, sync: MoneroSyncProgress) {
        let mut inner = self.inner();
        inner.monero_main_address = address.to_string();
        inner.monero_balance = balance;
        inner.monero_sync = sync;
    }

    pub fn set_monero_history(&self, history: Vec<MoneroTransfer>) {
        self.inner().monero_history = history;
    }

    pub fn push_approval(&self, request: ApprovalRequest) {
        self.inner().approvals.push(request);
    }

    pub fn set_rates(&self, rates: ExchangeRates) {
        self.inner().rates = Some(rates);
    }

    /// The node config last applied through [`Backend::change_monero_node`].
    pub fn monero_node(&self) -> Option<MoneroNodeConfig> {
        self.inner().monero_node.clone()
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn get_swap_infos_all(&self) -> Result<Vec<SwapInfo>> {
        Ok(self.call("get_swap_infos_all")?.swaps.values().cloned().collect())
    }

    async fn get_swap_info(&self, swap_id: &str) -> Result<SwapInfo> {
        self.call("get_swap_info")?
            .swaps
            .get(swap_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("swap {swap_id}")))
    }

    async fn get_swap_timelock(&self, swap_id: &str) -> Result<Option<SwapTimelock>> {
        Ok(self.call("get_swap_timelock")?.timelocks.get(swap_id).cloned())
    }

    async fn get_bitcoin_balance(&self) -> Result<Satoshis> {
        Ok(self.call("get_bitcoin_balance")?.bitcoin_balance)
    }

    async fn get_bitcoin_address(&self) -> Result<String> {
        Ok(self.call("get_bitcoin_address")?.bitcoin_address.clone())
    }

    async fn get_monero_main_address(&self) -> Result<String> {
        Ok(self.call("get_monero_main_address")?.monero_main_address.clone())
    }

    async fn get_monero_balance(&self) -> Result<MoneroBalance> {
        Ok(self.call("get_monero_balance")?.monero_balance)
    }

    async fn get_monero_sync_progress(&self) -> Result<MoneroSyncProgress> {
        Ok(self.call("get_monero_sync_progress")?.monero_sync)
    }

    async fn get_monero_history(&self) -> Result<Vec<MoneroTransfer>> {
        Ok(self.call("get_monero_history")?.monero_history.clone())
    }

    async fn get_pending_approvals(&self) -> Result<Vec<ApprovalRequest>> {
        Ok(self
            .call("get_pending_approvals")?
            .approvals
            .iter()
            .filter(|a| a.status.is_pending())
            .cloned()
            .collect())
    }

    async fn resolve_approval(&self, decision: ApprovalDecision) -> Result<()> {
        let mut inner = self.call("resolve_approval")?;
        let request = inner
            .approvals
            .iter_mut()
            .find(|a| a.request_id == decision.request_id)
            .ok_or_else(|| BackendError::NotFound(format!("request {}", decision.request_id)))?;
        request.status = if decision.accept {
            ApprovalStatus::Resolved
        } else {
            ApprovalStatus::Rejected
        };
        Ok(())
    }

    async fn change_monero_node(&self, node: &MoneroNodeConfig) -> Result<()> {
        self.call("change_monero_node")?.monero_node = Some(node.clone());
        Ok(())
    }

    async fn get_exchange_rates(&self, fiat_currency: &str) -> Result<ExchangeRates> {
        let inner = self.call("get_exchange_rates")?;
        match &inner.rates {
            Some(rates) if rates.fiat_currency == fiat_currency => Ok(rates.clone()),
            _ => Err(BackendError::NotFound(format!("rates in {fiat_currency}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_method_is_recorded() {
        let backend = MemoryBackend::new();
        backend.fail("get_bitcoin_balance");
        assert!(backend.get_bitcoin_balance().await.is_err());
        backend.recover("get_bitcoin_balance");
        assert_eq!(backend.get_bitcoin_balance().await.ok(), Some(0));
        assert_eq!(backend.call_count("get_bitcoin_balance"), 2);
    }

    #[tokio::test]
    async fn test_resolved_approval_leaves_pending_list() {
        let backend = MemoryBackend::new();
        backend.push_approval(ApprovalRequest {
            request_id: "r1".to_string(),
            request_type: "LockBitcoin".to_string(),
            content: serde_json::Value::Null,
            status: ApprovalStatus::Pending,
            expiration_ts: None,
        });
        backend
            .resolve_approval(ApprovalDecision {
                request_id: "r1".to_string(),
                accept: true,
                payload: serde_json::Value::Null,
            })
            .await
            .expect("resolve");
        let pending = backend.get_pending_approvals().await.expect("pending");
        assert!(pending.is_empty());
    }
}
