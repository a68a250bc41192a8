//! Swap progress with one step of lookback.

use serde::{Deserialize, Serialize};

use crate::events::ProtocolEvent;
use crate::SwapId;

/// The latest value and the one it replaced.
///
/// Exactly one step of history is kept: pushing a new value moves the
/// current one into `previous` and drops whatever was there.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback<T> {
    current: T,
    previous: Option<T>,
}

impl<T> Lookback<T> {
    /// Start a history with no predecessor.
    pub fn new(current: T) -> Self {
        Self {
            current,
            previous: None,
        }
    }

    /// Make `next` current, keeping the old current as `previous`.
    pub fn push(&mut self, next: T) {
        let old = std::mem::replace(&mut self.current, next);
        self.previous = Some(old);
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }
}

/// Progress of the swap currently running in the daemon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapProgress {
    pub swap_id: SwapId,
    events: Lookback<ProtocolEvent>,
}

impl SwapProgress {
    /// Progress for a swap that has just emitted its first event.
    pub fn new(swap_id: SwapId, first: ProtocolEvent) -> Self {
        Self {
            swap_id,
            events: Lookback::new(first),
        }
    }

    /// Build a progress from an explicit pair, mainly for replay and tests.
    pub fn from_pair(
        swap_id: SwapId,
        previous: Option<ProtocolEvent>,
        current: ProtocolEvent,
    ) -> Self {
        let events = match previous {
            Some(previous) => {
                let mut events = Lookback::new(previous);
                events.push(current);
                events
            }
            None => Lookback::new(current),
        };
        Self { swap_id, events }
    }

    /// Record the next event for this swap.
    ///
    /// Returns `false` when `event` equals the current one: redelivered
    /// events must not shift the lookback.
    pub fn advance(&mut self, event: ProtocolEvent) -> bool {
        if *self.events.current() == event {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn current(&self) -> &ProtocolEvent {
        self.events.current()
    }

    pub fn previous(&self) -> Option<&ProtocolEvent> {
        self.events.previous()
    }

    /// Whether the swap task has ended.
    pub fn is_released(&self) -> bool {
        self.current().is_released()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookback_keeps_one_step() {
        let mut history = Lookback::new(1);
        assert_eq!(history.previous(), None);

        history.push(2);
        history.push(3);
        assert_eq!(*history.current(), 3);
        assert_eq!(history.previous(), Some(&2));
    }

    #[test]
    fn test_advance_ignores_redelivery() {
        let mut progress = SwapProgress::new("swap-1".to_string(), ProtocolEvent::XmrLocked);
        assert!(progress.advance(ProtocolEvent::EncryptedSignatureSent));
        assert!(!progress.advance(ProtocolEvent::EncryptedSignatureSent));

        assert_eq!(progress.current(), &ProtocolEvent::EncryptedSignatureSent);
        assert_eq!(progress.previous(), Some(&ProtocolEvent::XmrLocked));
    }

    #[test]
    fn test_from_pair() {
        let progress = SwapProgress::from_pair(
            "swap-1".to_string(),
            Some(ProtocolEvent::BtcPunished),
            ProtocolEvent::Released,
        );
        assert!(progress.is_released());
        assert_eq!(progress.previous(), Some(&ProtocolEvent::BtcPunished));
    }
}
