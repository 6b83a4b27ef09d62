//! Recording lock events emitted by an ability.

use std::sync::{Arc, Mutex, PoisonError};

use blink_lock::{BlinkLockAbility, LockEvent, SubscriptionId};

/// Shared, cloneable log of every event an ability emitted.
#[derive(Clone, Debug, Default)]
pub struct EventLog(Arc<Mutex<Vec<LockEvent>>>);

impl EventLog {
    /// Subscribes the log to `ability`.
    pub fn attach(&self, ability: &mut BlinkLockAbility) -> SubscriptionId {
        let sink = Arc::clone(&self.0);
        ability.subscribe(move |event| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        })
    }

    /// Returns and forgets everything recorded so far.
    #[must_use]
    pub fn drain(&self) -> Vec<LockEvent> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<LockEvent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Progress values reported so far, in order.
    #[must_use]
    pub fn progress(&self) -> Vec<f32> {
        self.snapshot()
            .into_iter()
            .filter_map(|event| match event {
                LockEvent::LockProgressChanged { progress } => Some(progress),
                _ => None,
            })
            .collect()
    }

    /// Whether any recorded event satisfies `predicate`.
    #[must_use]
    pub fn any(&self, predicate: impl Fn(&LockEvent) -> bool) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(predicate)
    }
}
