//! JSON-RPC client for the swap daemon's Unix socket.
//!
//! The daemon speaks newline-delimited JSON-RPC 2.0 (one request per line,
//! one response per line). [`send_rpc_request`] handles a single exchange;
//! [`RpcBackend`] maps the [`Backend`] commands onto daemon methods.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use swapsync_orchestrator::backend::{self, Backend, BackendError};
use swapsync_types::approval::{ApprovalDecision, ApprovalRequest};
use swapsync_types::settings::MoneroNodeConfig;
use swapsync_types::wallet::{
    ExchangeRates, MoneroBalance, MoneroSyncProgress, MoneroTransfer, SwapInfo, SwapTimelock,
};
use swapsync_types::Satoshis;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::{debug, error};

/// Send a single JSON-RPC request to the daemon and return the parsed
/// response.
///
/// # Errors
///
/// Returns an error if the connection fails, the write fails, or the
/// response cannot be parsed.
pub async fn send_rpc_request(
    socket_path: &Path,
    request: &serde_json::Value,
) -> Result<serde_json::Value, IpcBridgeError> {
    let stream = UnixStream::connect(socket_path).await.map_err(|e| {
        error!("Failed to connect to daemon socket at {:?}: {}", socket_path, e);
        IpcBridgeError::ConnectionFailed {
            path: socket_path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_json = serde_json::to_string(request)
        .map_err(|e| IpcBridgeError::SerializationFailed(e.to_string()))?;
    request_json.push('\n');

    writer
        .write_all(request_json.as_bytes())
        .await
        .map_err(|e| IpcBridgeError::WriteFailed(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| IpcBridgeError::WriteFailed(e.to_string()))?;

    let mut response_line = String::new();
    let bytes_read = reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| IpcBridgeError::ReadFailed(e.to_string()))?;

    if bytes_read == 0 {
        return Err(IpcBridgeError::DaemonDisconnected);
    }

    serde_json::from_str(&response_line).map_err(|e| IpcBridgeError::ParseFailed {
        reason: e.to_string(),
        raw: response_line.clone(),
    })
}

/// Errors that can occur during IPC communication with the daemon.
#[derive(Debug, thiserror::Error)]
pub enum IpcBridgeError {
    /// Failed to connect to the daemon socket.
    #[error("Failed to connect to daemon at '{path}': {reason}")]
    ConnectionFailed { path: String, reason: String },

    /// Failed to serialize the request.
    #[error("Failed to serialize RPC request: {0}")]
    SerializationFailed(String),

    /// Failed to write to the socket.
    #[error("Failed to write to daemon socket: {0}")]
    WriteFailed(String),

    /// Failed to read from the socket.
    #[error("Failed to read from daemon socket: {0}")]
    ReadFailed(String),

    /// The daemon closed the connection unexpectedly.
    #[error("Daemon disconnected unexpectedly (EOF)")]
    DaemonDisconnected,

    /// Failed to parse the daemon's response as JSON.
    #[error("Failed to parse daemon response: {reason} (raw: {raw})")]
    ParseFailed { reason: String, raw: String },

    /// No response within the configured timeout.
    #[error("Daemon did not answer within {0:?}")]
    TimedOut(Duration),
}

impl From<IpcBridgeError> for BackendError {
    fn from(e: IpcBridgeError) -> Self {
        match e {
            IpcBridgeError::ParseFailed { reason, .. } => BackendError::Decode(reason),
            other => BackendError::Transport(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: Satoshis,
}

#[derive(Deserialize)]
struct AddressResponse {
    address: String,
}

#[derive(Deserialize)]
struct TimelockResponse {
    #[serde(default)]
    timelock: Option<SwapTimelock>,
}

#[derive(Deserialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Deserialize)]
struct ApprovalsResponse {
    approvals: Vec<ApprovalRequest>,
}

#[derive(Deserialize)]
struct SwapInfosResponse {
    swaps: Vec<SwapInfo>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    transactions: Vec<MoneroTransfer>,
}

/// [`Backend`] over the daemon's JSON-RPC socket. One connection per call.
#[derive(Debug)]
pub struct RpcBackend {
    socket_path: PathBuf,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcBackend {
    pub fn new(socket_path: PathBuf, timeout: Duration) -> Self {
        Self {
            socket_path,
            timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `method` and decode its `result` member.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> backend::Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "daemon request");

        let mut response = tokio::time::timeout(
            self.timeout,
            send_rpc_request(&self.socket_path, &request),
        )
        .await
        .map_err(|_| IpcBridgeError::TimedOut(self.timeout))??;

        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let error: ErrorObject = serde_json::from_value(error.clone())
                .map_err(|e| BackendError::Decode(e.to_string()))?;
            return Err(BackendError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .get_mut("result")
            .map(serde_json::Value::take)
            .ok_or_else(|| BackendError::Decode(format!("{method}: response has no result")))?;
        serde_json::from_value(result).map_err(|e| BackendError::Decode(format!("{method}: {e}")))
    }

    async fn expect_success(&self, method: &str, params: serde_json::Value) -> backend::Result<()> {
        let response: SuccessResponse = self.call(method, params).await?;
        if response.success {
            Ok(())
        } else {
            Err(BackendError::Rpc {
                code: 0,
                message: format!("{method} was refused"),
            })
        }
    }
}

#[async_trait::async_trait]
impl Backend for RpcBackend {
    async fn get_swap_infos_all(&self) -> backend::Result<Vec<SwapInfo>> {
        let response: SwapInfosResponse = self.call("get_swap_infos_all", json!({})).await?;
        Ok(response.swaps)
    }

    async fn get_swap_info(&self, swap_id: &str) -> backend::Result<SwapInfo> {
        self.call("get_swap_info", json!({ "swap_id": swap_id })).await
    }

    async fn get_swap_timelock(&self, swap_id: &str) -> backend::Result<Option<SwapTimelock>> {
        let response: TimelockResponse = self
            .call("get_swap_timelock", json!({ "swap_id": swap_id }))
            .await?;
        Ok(response.timelock)
    }

    async fn get_bitcoin_balance(&self) -> backend::Result<Satoshis> {
        let response: BalanceResponse = self
            .call("get_bitcoin_balance", json!({ "force_refresh": false }))
            .await?;
        Ok(response.balance)
    }

    async fn get_bitcoin_address(&self) -> backend::Result<String> {
        let response: AddressResponse = self.call("get_bitcoin_address", json!({})).await?;
        Ok(response.address)
    }

    async fn get_monero_main_address(&self) -> backend::Result<String> {
        let response: AddressResponse = self.call("get_monero_main_address", json!({})).await?;
        Ok(response.address)
    }

    async fn get_monero_balance(&self) -> backend::Result<MoneroBalance> {
        self.call("get_monero_balance", json!({})).await
    }

    async fn get_monero_sync_progress(&self) -> backend::Result<MoneroSyncProgress> {
        self.call("get_monero_sync_progress", json!({})).await
    }

    async fn get_monero_history(&self) -> backend::Result<Vec<MoneroTransfer>> {
        let response: HistoryResponse = self.call("get_monero_history", json!({})).await?;
        Ok(response.transactions)
    }

    async fn get_pending_approvals(&self) -> backend::Result<Vec<ApprovalRequest>> {
        let response: ApprovalsResponse = self.call("get_pending_approvals", json!({})).await?;
        Ok(response.approvals)
    }

    async fn resolve_approval(&self, decision: ApprovalDecision) -> backend::Result<()> {
        // The daemon has separate methods for the two answers.
        if decision.accept {
            self.call::<serde_json::Value>(
                "resolve_approval",
                json!({ "request_id": decision.request_id, "accept": decision.payload }),
            )
            .await
            .map(|_| ())
        } else {
            self.expect_success(
                "reject_approval",
                json!({ "request_id": decision.request_id }),
            )
            .await
        }
    }

    async fn change_monero_node(&self, node: &MoneroNodeConfig) -> backend::Result<()> {
        self.expect_success("change_monero_node", json!({ "node_config": node }))
            .await
    }

    async fn get_exchange_rates(&self, fiat_currency: &str) -> backend::Result<ExchangeRates> {
        self.call(
            "get_exchange_rates",
            json!({ "fiat_currency": fiat_currency }),
        )
        .await
    }
}
