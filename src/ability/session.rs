//! Per-instance lock bookkeeping.

use crate::entity::EntityRef;
use crate::targeting::StickinessMemory;

/// Phase of the lock cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LockState {
    /// Waiting for the charge signal.
    #[default]
    Idle,
    /// Holding a target while the lock timer fills.
    Charging,
    /// Lock complete; a blink may be spent.
    Ready,
    /// Blocked until the cooldown deadline passes.
    Cooldown,
}

impl LockState {
    /// Whether a target is held.
    #[must_use]
    pub const fn is_locking(self) -> bool {
        matches!(self, Self::Charging | Self::Ready)
    }
}

/// Mutable state of one ability instance.
///
/// `charging_target` is only set while [`LockState::is_locking`] holds, and
/// `lock_timer` never exceeds the configured lock duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockSession {
    /// Current phase.
    pub state: LockState,
    /// Canonical handle of the locked entity.
    pub charging_target: Option<EntityRef>,
    /// Seconds of lock accumulated on the current target.
    pub lock_timer: f32,
    /// Clock time at which the cooldown ends.
    pub cooldown_until: f64,
    /// Last observation of the target, for hysteresis.
    pub stickiness: StickinessMemory,
}

impl LockSession {
    /// Drops the current target and returns to [`LockState::Idle`]. The
    /// cooldown deadline survives.
    pub fn clear_target(&mut self) {
        self.state = LockState::Idle;
        self.charging_target = None;
        self.lock_timer = 0.0;
        self.stickiness.clear();
    }

    /// Restarts the charge on `target`.
    pub fn start(&mut self, target: EntityRef) {
        self.state = LockState::Charging;
        self.charging_target = Some(target);
        self.lock_timer = 0.0;
    }

    /// Seconds of cooldown left at `now`.
    #[must_use]
    pub fn cooldown_remaining(&self, now: f64) -> f64 {
        (self.cooldown_until - now).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn clearing_keeps_cooldown_deadline() {
        let mut session = LockSession {
            cooldown_until: 4.0,
            ..LockSession::default()
        };
        session.start(EntityRef(2));
        session.lock_timer = 0.3;
        session.clear_target();
        assert_eq!(session.state, LockState::Idle);
        assert_eq!(session.charging_target, None);
        assert!(session.lock_timer.abs() < f32::EPSILON);
        assert!((session.cooldown_until - 4.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(1.0, 3.0)]
    #[case(5.0, 0.0)]
    fn remaining_cooldown_is_floored(#[case] now: f64, #[case] expected: f64) {
        let session = LockSession {
            cooldown_until: 4.0,
            ..LockSession::default()
        };
        assert!((session.cooldown_remaining(now) - expected).abs() < 1e-9);
    }
}
