//! Integration test: the client against a daemon on real Unix sockets.
//!
//! Stands up a stand-in daemon with a JSON-RPC socket and an event socket,
//! runs the client pieces the binary runs, and talks to the view socket:
//! 1. Feed notifications reach the store over the event socket
//! 2. Readiness and progress reactions call the daemon over JSON-RPC
//! 3. Coalesced swap refreshes bring back swap info and its timelock
//! 4. The view reads all of it through `send_rpc_request`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use swapsync_client::ipc_bridge::send_rpc_request;
use swapsync_client::{assemble, ClientConfig, EventFeed, RpcBackend, RpcServer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast;

fn socket(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("swapsync-it-{}-{name}.sock", std::process::id()))
}

fn swap_info(swap_id: &str) -> Value {
    json!({
        "swap_id": swap_id,
        "state_name": "xmr is locked",
        "completed": false,
        "btc_amount": 120_000,
        "xmr_amount": 1_500_000_000_000u64,
        "start_date": "2024-06-01T12:00:00Z",
        "timelock": {"type": "Cancel", "content": {"blocks_left": 12}},
    })
}

fn answer(method: &str, params: &Value) -> Result<Value, (i64, &'static str)> {
    match method {
        "get_swap_infos_all" => Ok(json!({"swaps": [swap_info("s1")]})),
        "get_pending_approvals" => Ok(json!({"approvals": []})),
        "get_swap_info" => Ok(swap_info(params["swap_id"].as_str().unwrap_or_default())),
        "get_swap_timelock" => Ok(json!({"timelock": {"type": "Cancel", "content": {"blocks_left": 12}}})),
        "get_bitcoin_balance" => Ok(json!({"balance": 5_000})),
        "get_bitcoin_address" => Ok(json!({"address": "bc1qstandin"})),
        _ => Err((-32601, "METHOD_NOT_FOUND")),
    }
}

/// Stand-in daemon JSON-RPC socket.
fn serve_rpc(path: &Path) {
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path).expect("bind rpc");
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (reader, mut writer) = stream.into_split();
                let mut lines = BufReader::new(reader).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let request: Value = serde_json::from_str(&line).expect("request");
                    let method = request["method"].as_str().unwrap_or_default();
                    let response = match answer(method, &request["params"]) {
                        Ok(result) => json!({"jsonrpc": "2.0", "id": request["id"], "result": result}),
                        Err((code, message)) => json!({
                            "jsonrpc": "2.0",
                            "id": request["id"],
                            "error": {"code": code, "message": message}
                        }),
                    };
                    let _ = writer.write_all(format!("{response}\n").as_bytes()).await;
                }
            });
        }
    });
}

/// Stand-in daemon event socket: writes `events` to each subscriber and
/// keeps the connection open.
fn serve_events(path: &Path, events: Vec<Value>) {
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path).expect("bind events");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            for event in &events {
                let _ = stream.write_all(format!("{event}\n").as_bytes()).await;
            }
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(stream);
            });
        }
    });
}

async fn view_call(path: &Path, method: &str) -> Value {
    let request = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": {}});
    for _ in 0..100 {
        if let Ok(response) = send_rpc_request(path, &request).await {
            return response["result"].clone();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("view socket never answered {method}");
}

#[tokio::test]
async fn test_client_follows_daemon_over_sockets() {
    let rpc_path = socket("daemon");
    let events_path = socket("events");
    let view_path = socket("view");

    serve_rpc(&rpc_path);
    serve_events(
        &events_path,
        vec![
            json!({"event": "context_status", "payload": {
                "database_available": true,
                "bitcoin_wallet_available": true
            }}),
            json!({"event": "swap_progress", "payload": {
                "swap_id": "s1",
                "event": {"type": "XmrLocked"}
            }}),
            json!({"event": "cli_log", "payload": {"buffer": "INFO swap started\n"}}),
        ],
    );

    let mut config = ClientConfig::default();
    config.daemon.rpc_socket = rpc_path.display().to_string();
    config.daemon.event_socket = events_path.display().to_string();
    config.daemon.view_socket = view_path.display().to_string();
    config.daemon.request_timeout_secs = 5;

    let backend = Arc::new(RpcBackend::new(config.rpc_socket(), config.request_timeout()));
    let (store, ctx) = assemble(&config, backend).expect("assemble");
    let (shutdown_tx, _) = broadcast::channel(1);
    tokio::spawn(store.run(shutdown_tx.subscribe()));
    tokio::spawn(
        EventFeed::new(config.event_socket(), config.reconnect_delay(), ctx.store.clone())
            .run(shutdown_tx.subscribe()),
    );
    let server = RpcServer::new(ctx, config.view_socket());
    tokio::spawn(async move { server.run().await });

    let mut display = Value::Null;
    for _ in 0..100 {
        display = view_call(&view_path, "get_swap_display").await;
        if display["swap_info"]["timelock"]["type"] == "Cancel" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(display["swap_id"], "s1");
    assert_eq!(display["display"]["step_index"], 2);
    assert_eq!(display["swap_info"]["state_name"], "xmr is locked");
    assert_eq!(display["swap_info"]["timelock"]["content"]["blocks_left"], 12);

    let wallet = view_call(&view_path, "get_wallet_state").await;
    assert_eq!(wallet["wallet"]["bitcoin_balance"], 5_000);
    assert_eq!(wallet["wallet"]["bitcoin_address"], "bc1qstandin");

    let logs = view_call(&view_path, "get_logs").await;
    assert_eq!(logs["entries"][0]["record"], "INFO swap started");

    let _ = shutdown_tx.send(());
    for path in [&rpc_path, &events_path, &view_path] {
        let _ = std::fs::remove_file(path);
    }
}
