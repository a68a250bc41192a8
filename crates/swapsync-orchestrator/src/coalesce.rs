//! Per-key update coalescing: a throttle wrapped around a debounce.
//!
//! A [`Coalescer`] is a small actor task owning its timer state. The first
//! value after a quiet spell runs immediately and opens a throttle window.
//! Values arriving inside the window replace each other; the last one runs
//! once the input has been quiet for the debounce period, but no later than
//! one extra throttle interval past the window. That trailing run opens the
//! next window. Superseded values are dropped; a run that has started always
//! completes.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Default minimum spacing between runs for one key.
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(2);

/// Default quiet period before a trailing run.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Timing of a coalescer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoalesceConfig {
    pub throttle: Duration,
    pub debounce: Duration,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            throttle: DEFAULT_THROTTLE,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Handle to one coalescing actor.
#[derive(Debug)]
pub struct Coalescer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> Coalescer<T> {
    /// Spawn the actor on the current tokio runtime.
    pub fn spawn<F, Fut>(config: CoalesceConfig, run: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(rx, config, run));
        Self { tx }
    }

    /// Offer a value. Returns false if the actor has stopped.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

async fn drive<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<T>, config: CoalesceConfig, mut run: F)
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    // Idle: wait for a leading edge.
    'idle: while let Some(value) = rx.recv().await {
        run(value).await;
        // Windows open when a run finishes, so a slow run cannot let the
        // values queued behind it through one by one.
        let mut window_start = Instant::now();
        let mut last_input = window_start;
        let mut pending = newest_queued(&mut rx);
        loop {
            let window_end = window_start + config.throttle;
            match pending.take() {
                None => {
                    tokio::select! {
                        biased;
                        _ = sleep_until(window_end) => continue 'idle,
                        next = rx.recv() => match next {
                            Some(value) => {
                                pending = Some(value);
                                last_input = Instant::now();
                            }
                            None => return,
                        },
                    }
                }
                Some(value) => {
                    let quiet = (last_input + config.debounce).max(window_end);
                    let deadline = quiet.min(window_end + config.throttle);
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            run(value).await;
                            window_start = Instant::now();
                            last_input = window_start;
                            pending = newest_queued(&mut rx);
                        }
                        next = rx.recv() => match next {
                            Some(newer) => {
                                pending = Some(newer);
                                last_input = Instant::now();
                            }
                            None => {
                                run(value).await;
                                return;
                            }
                        },
                    }
                }
            }
        }
    }
}

/// Take everything queued during a run, keeping only the newest value.
fn newest_queued<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Option<T> {
    let mut newest = None;
    while let Ok(value) = rx.try_recv() {
        newest = Some(value);
    }
    newest
}

/// Lazily created coalescers, one per key, kept for the process lifetime.
#[derive(Debug)]
pub struct CoalescerRegistry<K, T> {
    config: CoalesceConfig,
    coalescers: Mutex<HashMap<K, Coalescer<T>>>,
}

impl<K: Eq + Hash, T: Send + 'static> CoalescerRegistry<K, T> {
    pub fn new(config: CoalesceConfig) -> Self {
        Self {
            config,
            coalescers: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> CoalesceConfig {
        self.config
    }

    /// Offer `value` to the coalescer bound to `key`, spawning it with
    /// `make_run` on first use.
    pub fn push<F, Fut>(&self, key: K, value: T, make_run: impl FnOnce() -> F)
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut coalescers = self
            .coalescers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let value = match coalescers.get(&key) {
            Some(coalescer) => match coalescer.tx.send(value) {
                Ok(()) => return,
                // The actor died with a panicking run; replace it.
                Err(mpsc::error::SendError(value)) => {
                    tracing::warn!("coalescer stopped, respawning");
                    value
                }
            },
            None => value,
        };
        let coalescer = Coalescer::spawn(self.config, make_run());
        coalescer.push(value);
        coalescers.insert(key, coalescer);
    }

    pub fn len(&self) -> usize {
        self.coalescers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
