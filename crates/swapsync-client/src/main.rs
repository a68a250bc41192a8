//! swapsync-client: keeps a swap view in step with the swap daemon.
//!
//! Single OS process running a Tokio async runtime. The daemon is reached
//! over two Unix sockets (JSON-RPC requests and an event feed); the view
//! talks to this process over a third.

use std::sync::Arc;

use swapsync_client::{assemble, ClientConfig, EventFeed, RpcBackend, RpcServer};
use tokio::sync::broadcast;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = ClientConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_directive().parse()?),
        )
        .init();

    info!("swapsync client starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Daemon backend, store and reactions
    let backend = Arc::new(RpcBackend::new(config.rpc_socket(), config.request_timeout()));
    let (store, ctx) = assemble(&config, backend)?;

    // 4. Shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Store driver and event feed
    let driver = tokio::spawn(store.run(shutdown_tx.subscribe()));
    let feed = EventFeed::new(
        config.event_socket(),
        config.reconnect_delay(),
        ctx.store.clone(),
    );
    let feed = tokio::spawn(feed.run(shutdown_tx.subscribe()));

    // 6. Serve the view until shutdown
    let socket_path = config.view_socket();
    let rpc_server = RpcServer::new(ctx, socket_path.clone());
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    let _ = shutdown_tx.send(());
    let _ = tokio::join!(driver, feed);
    let _ = std::fs::remove_file(&socket_path);

    info!("swapsync client stopped");
    Ok(())
}
