//! The store driver, observer registration, and handles.

use std::sync::Arc;

use swapsync_logs::LogBuffer;
use swapsync_types::settings::Settings;
use tokio::sync::{broadcast, mpsc, watch};

use crate::action::Action;
use crate::state::StoreState;
use crate::{Result, StoreError};

/// One reducer step, as seen by observers.
#[derive(Clone, Debug)]
pub struct Transition {
    pub action: Action,
    pub before: Arc<StoreState>,
    pub after: Arc<StoreState>,
}

impl Transition {
    /// Whether `f` went from false to true in this step.
    pub fn rose(&self, f: impl Fn(&StoreState) -> bool) -> bool {
        !f(&self.before) && f(&self.after)
    }
}

/// Something that wants to hear about every applied action.
///
/// Called synchronously on the driver task; implementations must return
/// quickly and spawn for anything that awaits.
pub trait Observer: Send {
    fn notify(&mut self, transition: &Transition);
}

struct PredicateObserver<P, R> {
    predicate: P,
    reaction: R,
}

impl<P, R> Observer for PredicateObserver<P, R>
where
    P: Fn(&Transition) -> bool + Send,
    R: FnMut(&Transition) + Send,
{
    fn notify(&mut self, transition: &Transition) {
        if (self.predicate)(transition) {
            (self.reaction)(transition);
        }
    }
}

/// Observer that runs `reaction` only for transitions matching `predicate`.
pub fn when<P, R>(predicate: P, reaction: R) -> impl Observer
where
    P: Fn(&Transition) -> bool + Send + 'static,
    R: FnMut(&Transition) + Send + 'static,
{
    PredicateObserver {
        predicate,
        reaction,
    }
}

/// Cloneable access to a running store.
#[derive(Clone, Debug)]
pub struct StoreHandle {
    actions: mpsc::UnboundedSender<Action>,
    snapshot: watch::Receiver<Arc<StoreState>>,
}

impl StoreHandle {
    /// Queue an action behind everything already dispatched.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        self.actions.send(action).map_err(|_| StoreError::Closed)
    }

    /// The latest published snapshot.
    pub fn state(&self) -> Arc<StoreState> {
        self.snapshot.borrow().clone()
    }

    /// A receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<StoreState>> {
        self.snapshot.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&StoreState) -> bool,
    ) -> Result<Arc<StoreState>> {
        let mut rx = self.snapshot.clone();
        let state = rx
            .wait_for(|state| predicate(state.as_ref()))
            .await
            .map_err(|_| StoreError::Closed)?;
        Ok(state.clone())
    }
}

/// The event store.
///
/// Owns the state and the observer list. Actions from every source go
/// through one queue and are applied strictly in arrival order.
pub struct EventStore {
    state: Arc<StoreState>,
    observers: Vec<Box<dyn Observer>>,
    actions_tx: mpsc::UnboundedSender<Action>,
    actions_rx: mpsc::UnboundedReceiver<Action>,
    snapshot: watch::Sender<Arc<StoreState>>,
}

impl EventStore {
    pub fn new(state: StoreState) -> Self {
        let state = Arc::new(state);
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(state.clone());
        Self {
            state,
            observers: Vec::new(),
            actions_tx,
            actions_rx,
            snapshot,
        }
    }

    /// Create a store with a log buffer bounded at `log_high_water_mark`.
    pub fn with_config(log_high_water_mark: usize, settings: Settings) -> Result<Self> {
        let logs = LogBuffer::with_high_water_mark(log_high_water_mark)?;
        Ok(Self::new(StoreState::with_logs(logs, settings)))
    }

    pub fn handle(&self) -> StoreHandle {
        StoreHandle {
            actions: self.actions_tx.clone(),
            snapshot: self.snapshot.subscribe(),
        }
    }

    pub fn state(&self) -> &Arc<StoreState> {
        &self.state
    }

    /// Register an observer. Observers are notified in registration order.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Apply a single action right away. Returns whether the state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let before = self.state.clone();
        let mut next = StoreState::clone(&before);
        if !next.reduce(&action) {
            tracing::trace!(action = action.kind(), "action left state unchanged");
            return false;
        }
        tracing::debug!(action = action.kind(), "applied action");

        let after = Arc::new(next);
        self.state = after.clone();
        self.snapshot.send_replace(after.clone());

        let transition = Transition {
            action,
            before,
            after,
        };
        for observer in &mut self.observers {
            observer.notify(&transition);
        }
        true
    }

    /// Apply everything currently queued. Returns how many actions ran.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(action) = self.actions_rx.try_recv() {
            self.dispatch(action);
            applied += 1;
        }
        applied
    }

    /// Drive the store until shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(observers = self.observers.len(), "event store started");
        loop {
            tokio::select! {
                Some(action) = self.actions_rx.recv() => {
                    self.dispatch(action);
                }
                _ = shutdown.recv() => {
                    tracing::info!("event store shutting down");
                    break;
                }
            }
        }
    }
}
