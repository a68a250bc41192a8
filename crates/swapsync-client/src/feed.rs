//! Inbound event feed from the daemon.
//!
//! The daemon pushes one JSON [`InboundEvent`] per line on its event socket.
//! Every line becomes an action on the store; lines that do not parse are
//! logged and skipped so one bad notification never stalls the feed.

use std::path::PathBuf;
use std::time::Duration;

use swapsync_store::{Action, InboundEvent, StoreHandle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{ClientError, Result};

/// Parse one feed line and dispatch it. Returns whether an action was sent.
pub fn ingest_line(line: &str, store: &StoreHandle) -> Result<bool> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(false);
    }
    match serde_json::from_str::<InboundEvent>(line) {
        Ok(event) => {
            let action = Action::from(event);
            debug!(action = action.kind(), "feed event");
            store.dispatch(action)?;
            Ok(true)
        }
        Err(e) => {
            warn!(error = %e, "skipping malformed feed line");
            Ok(false)
        }
    }
}

/// Read feed lines from `reader` until it ends. Returns how many events were
/// dispatched.
pub async fn pump<R: AsyncBufRead + Unpin>(reader: R, store: &StoreHandle) -> Result<usize> {
    let mut lines = reader.lines();
    let mut dispatched = 0;
    while let Some(line) = lines.next_line().await? {
        if ingest_line(&line, store)? {
            dispatched += 1;
        }
    }
    Ok(dispatched)
}

/// Connection to the daemon's event socket, re-established when it drops.
pub struct EventFeed {
    socket_path: PathBuf,
    reconnect_delay: Duration,
    store: StoreHandle,
}

impl EventFeed {
    pub fn new(socket_path: PathBuf, reconnect_delay: Duration, store: StoreHandle) -> Self {
        Self {
            socket_path,
            reconnect_delay,
            store,
        }
    }

    /// Follow the feed until shutdown or until the store closes.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                result = self.follow_once() => match result {
                    Ok(count) => info!(events = count, "event feed ended, reconnecting"),
                    Err(ClientError::Store(_)) => {
                        info!("store closed, stopping event feed");
                        return;
                    }
                    Err(e) => warn!(error = %e, "event feed unavailable"),
                },
                _ = shutdown.recv() => return,
            }
            tokio::select! {
                _ = tokio::time::sleep(self.reconnect_delay) => {}
                _ = shutdown.recv() => return,
            }
        }
    }

    async fn follow_once(&self) -> Result<usize> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        info!("Connected to event feed at {:?}", self.socket_path);
        pump(BufReader::new(stream), &self.store).await
    }
}
