//! Lock lifecycle notifications for the view layer.
//!
//! Subscribers are plain callbacks invoked synchronously, in subscription
//! order, from inside the ability's tick. They only ever see a shared
//! reference to the event, so they cannot reach back into the ability that
//! is emitting it.

use crate::blink::BlinkResult;
use crate::entity::EntityRef;

/// Why a charge ended without a blink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The target left view for longer than the grace period.
    TargetLost,
    /// The lock input stopped asking for a charge.
    InputReleased,
    /// A cooldown started while charging.
    Cooldown,
    /// The ability was disabled or its caster died.
    Disabled,
}

/// Something the view may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum LockEvent {
    /// A charge began on a new target, or switched to another one.
    LockStarted {
        /// Canonical handle of the target.
        target: EntityRef,
    },
    /// The lock timer moved.
    LockProgressChanged {
        /// Fraction of the lock duration accumulated, in `0.0..=1.0`.
        progress: f32,
    },
    /// The lock is complete and a blink may be spent.
    LockReady {
        /// Canonical handle of the target.
        target: EntityRef,
    },
    /// A charging or ready lock was dropped.
    LockCanceled {
        /// Why the lock ended.
        reason: CancelReason,
    },
    /// The caster teleported.
    BlinkExecuted {
        /// Where it went and what happened there.
        result: BlinkResult,
    },
}

/// Identifies a subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&LockEvent) + Send + Sync>;

/// Ordered list of event subscribers.
#[derive(Default)]
pub struct LockEvents {
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_id: u64,
}

impl std::fmt::Debug for LockEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockEvents")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl LockEvents {
    /// Registers `callback`; it runs synchronously for every emitted event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&LockEvent) + Send + Sync + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Number of live subscriptions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is listening.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub(crate) fn emit(&mut self, event: &LockEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }
}
