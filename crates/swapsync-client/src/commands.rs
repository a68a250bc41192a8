//! View-facing command handlers.

use serde_json::{json, Value};
use swapsync_orchestrator::OrchestratorError;
use swapsync_store::{Action, StoreError};
use swapsync_types::settings::Settings;

use crate::rpc::RpcError;
use crate::ClientContext;

type Result = std::result::Result<Value, RpcError>;

/// Log entries returned when the view does not ask for a count.
const DEFAULT_LOG_LIMIT: usize = 200;

fn to_json<T: serde::Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&e.to_string()))
}

fn dispatch(ctx: &ClientContext, action: Action) -> std::result::Result<(), RpcError> {
    ctx.store.dispatch(action).map_err(|_| RpcError::store_closed())
}

/// Display state of the active swap.
///
/// When the interpreter cannot classify the progress, `display` is null and
/// `diagnostic` says why.
pub fn get_swap_display(ctx: &ClientContext) -> Result {
    let state = ctx.store.state();
    let progress = state.active_progress();
    let (display, diagnostic) = match swapsync_interpreter::explain(progress) {
        Ok(display) => (display, None),
        Err(e) => {
            tracing::error!(error = %e, "swap display unavailable");
            (None, Some(e.to_string()))
        }
    };
    let swap_info = state
        .active_swap
        .as_ref()
        .and_then(|id| state.swap_infos.get(id));

    Ok(json!({
        "swap_id": state.active_swap,
        "display": to_json(&display)?,
        "current_event": progress.map(|p| p.current().name()),
        "previous_event": progress.and_then(|p| p.previous()).map(|e| e.name()),
        "diagnostic": diagnostic,
        "swap_info": to_json(&swap_info)?,
    }))
}

/// Newest buffered log entries, oldest first.
pub fn get_logs(ctx: &ClientContext, params: &Value) -> Result {
    let limit = match params.get("limit") {
        None | Some(Value::Null) => DEFAULT_LOG_LIMIT,
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| RpcError::invalid_params("limit must be a non-negative integer"))?,
    };

    let state = ctx.store.state();
    let entries = state.logs.latest(limit);
    let (total_ingested, total_evicted) = state.logs.totals();
    Ok(json!({
        "entries": to_json(&entries)?,
        "buffered": state.logs.len(),
        "total_ingested": total_ingested,
        "total_evicted": total_evicted,
    }))
}

/// Pending approvals, oldest first.
pub fn get_pending_approvals(ctx: &ClientContext) -> Result {
    let state = ctx.store.state();
    let approvals: Vec<_> = state.pending_approvals().collect();
    Ok(json!({ "approvals": to_json(&approvals)? }))
}

pub fn get_background_tasks(ctx: &ClientContext) -> Result {
    let state = ctx.store.state();
    let tasks: Vec<_> = state.background_tasks.values().collect();
    Ok(json!({
        "tasks": to_json(&tasks)?,
        "context": to_json(&state.context)?,
        "monero_wallet_busy": state.is_monero_wallet_busy(),
    }))
}

pub fn get_wallet_state(ctx: &ClientContext) -> Result {
    let state = ctx.store.state();
    let swaps: Vec<_> = state.swap_infos.values().collect();
    Ok(json!({
        "wallet": to_json(&*state.wallet)?,
        "swaps": to_json(&swaps)?,
        "settings": to_json(&state.settings)?,
    }))
}

/// Accept or reject an approval request.
pub async fn resolve_approval(ctx: &ClientContext, params: &Value) -> Result {
    let request_id = params
        .get("request_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("request_id required"))?;
    let accept = params
        .get("accept")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params("accept must be a boolean"))?;
    let payload = params.get("payload").cloned().unwrap_or(Value::Null);

    match ctx
        .orchestrator
        .resolve_approval(request_id.to_string(), accept, payload)
        .await
    {
        Ok(()) => Ok(json!({ "success": true })),
        Err(OrchestratorError::Backend(e)) => Err(RpcError::daemon_error(&e.to_string())),
        Err(OrchestratorError::Store(StoreError::Closed)) => Err(RpcError::store_closed()),
        Err(e) => Err(RpcError::internal_error(&e.to_string())),
    }
}

/// Forget the active swap.
pub fn reset_swap(ctx: &ClientContext) -> Result {
    dispatch(ctx, Action::ResetSwap)?;
    Ok(json!({ "success": true }))
}

/// Replace the user settings. Reactions to the change run asynchronously.
pub fn update_settings(ctx: &ClientContext, params: &Value) -> Result {
    let settings: Settings = serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    settings
        .validate()
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
    dispatch(ctx, Action::SettingsChanged(settings))?;
    Ok(json!({ "success": true }))
}
