//! Process-wide, reference-counted slow motion.
//!
//! Any number of ability instances may ask for slow motion at once. The first
//! owner snapshots the host's time scale and fixed step; the last owner to
//! leave restores that snapshot verbatim. Owners in between never restore
//! real-time speed early, which is the failure mode of a last-writer-wins
//! global.
//!
//! Ownership is tracked with [`SlowMotionToken`] values: [`SlowMotionRegistry::acquire`]
//! hands one out and [`SlowMotionRegistry::release`] consumes it, so a token can
//! never be released twice. An owner that disappears without a host at hand
//! passes its token to [`SlowMotionRegistry::abandon`]; the registry that
//! issued it releases the claim the next time it is driven.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_SLOW_TIME_SCALE, MAX_TIME_SCALE, MIN_TIME_SCALE};

/// Owner of the global time multiplier and fixed physics step.
#[cfg_attr(test, mockall::automock)]
pub trait TimeScaleHost {
    /// Current multiplier applied to game time.
    fn time_scale(&self) -> f32;
    /// Replaces the multiplier applied to game time.
    fn set_time_scale(&mut self, scale: f32);
    /// Fixed physics step in seconds.
    fn fixed_step(&self) -> f32;
    /// Replaces the fixed physics step, in seconds.
    fn set_fixed_step(&mut self, seconds: f32);
}

/// How an ability slows time while charging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowMotionSettings {
    /// Whether charging slows time at all.
    pub enabled: bool,
    /// Requested multiplier, clamped to `[0.01, 1.0]` when applied.
    pub time_scale: f32,
    /// Scale the fixed physics step with the time multiplier so physics
    /// keeps the same number of steps per simulated second.
    pub scale_fixed_step: bool,
    /// Real-time seconds to ease from the original scale to `time_scale`.
    /// Zero applies the slow scale immediately.
    pub ramp_in_seconds: f32,
}

impl Default for SlowMotionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            time_scale: DEFAULT_SLOW_TIME_SCALE,
            scale_fixed_step: true,
            ramp_in_seconds: 0.0,
        }
    }
}

impl SlowMotionSettings {
    /// The multiplier actually applied for these settings.
    #[must_use]
    pub fn clamped_scale(&self) -> f32 {
        if self.time_scale.is_finite() {
            self.time_scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE)
        } else {
            MAX_TIME_SCALE
        }
    }
}

/// Proof of one slow-motion ownership claim.
#[must_use = "slow motion stays active until the token is released"]
#[derive(Debug, PartialEq, Eq)]
pub struct SlowMotionToken {
    registry: u64,
    generation: u64,
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

static GLOBAL: Lazy<Mutex<SlowMotionRegistry>> =
    Lazy::new(|| Mutex::new(SlowMotionRegistry::new()));

/// Claims whose owners went away without reaching a host. Kept apart from
/// `GLOBAL` so `Drop` impls can push here while the global registry is locked.
static ABANDONED: Lazy<Mutex<Vec<SlowMotionToken>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Reference-counted override of the host's time scale.
#[derive(Debug)]
pub struct SlowMotionRegistry {
    id: u64,
    owner_count: u32,
    original_time_scale: f32,
    original_fixed_step: f32,
    captured: bool,
    generation: u64,
    target_scale: f32,
    fixed_step_scaled: bool,
    ramp_seconds: f32,
    ramp_elapsed: f32,
}

impl Default for SlowMotionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SlowMotionRegistry {
    /// Creates a registry independent of the process-wide instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            owner_count: 0,
            original_time_scale: 1.0,
            original_fixed_step: 0.0,
            captured: false,
            generation: 0,
            target_scale: 1.0,
            fixed_step_scaled: false,
            ramp_seconds: 0.0,
            ramp_elapsed: 0.0,
        }
    }

    /// Locks the process-wide registry shared by every ability instance.
    ///
    /// All mutation happens on the update thread, so the lock is never
    /// contended in practice. A poisoned lock is recovered rather than
    /// propagated because the registry holds no invariants a panic could
    /// break halfway.
    pub fn global() -> MutexGuard<'static, Self> {
        GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of outstanding claims.
    #[must_use]
    pub const fn owner_count(&self) -> u32 {
        self.owner_count
    }

    /// Whether any claim is outstanding.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.owner_count > 0
    }

    /// Time scale captured by the first owner, if one is currently held.
    #[must_use]
    pub const fn original_time_scale(&self) -> Option<f32> {
        if self.captured {
            Some(self.original_time_scale)
        } else {
            None
        }
    }

    /// Hands back a claim whose owner cannot reach a time host, e.g. from a
    /// `Drop` impl.
    ///
    /// The issuing registry releases it on its next [`acquire`](Self::acquire)
    /// or [`advance`](Self::advance).
    pub fn abandon(token: SlowMotionToken) {
        ABANDONED
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token);
    }

    /// Claims slow motion and applies `settings` to `host`.
    pub fn acquire<H>(&mut self, host: &mut H, settings: &SlowMotionSettings) -> SlowMotionToken
    where
        H: TimeScaleHost + ?Sized,
    {
        self.reclaim_abandoned(host);
        if self.owner_count == 0 {
            self.original_time_scale = host.time_scale();
            self.original_fixed_step = host.fixed_step();
            self.captured = true;
            self.generation += 1;
            self.fixed_step_scaled = false;
            self.ramp_elapsed = 0.0;
            info!(
                "slow motion engaged (baseline scale {:.3}, fixed step {:.4}s)",
                self.original_time_scale, self.original_fixed_step
            );
        }
        self.owner_count += 1;
        self.target_scale = settings.clamped_scale();
        self.ramp_seconds = settings.ramp_in_seconds.max(0.0);
        self.fixed_step_scaled |= settings.scale_fixed_step;
        debug!(
            "slow motion owners: {} (target scale {:.3})",
            self.owner_count, self.target_scale
        );
        self.apply_current(host);
        SlowMotionToken {
            registry: self.id,
            generation: self.generation,
        }
    }

    /// Gives up one ownership claim, restoring the original timing when the
    /// last owner leaves.
    pub fn release<H>(&mut self, host: &mut H, token: SlowMotionToken)
    where
        H: TimeScaleHost + ?Sized,
    {
        if token.registry != self.id || token.generation != self.generation {
            warn!("ignoring slow-motion token from another registry or session");
            return;
        }
        if self.owner_count == 0 {
            debug!("slow-motion release with no owners ignored");
            return;
        }
        self.owner_count -= 1;
        debug!("slow motion owners: {}", self.owner_count);
        if self.owner_count == 0 {
            host.set_time_scale(self.original_time_scale);
            if self.fixed_step_scaled {
                host.set_fixed_step(self.original_fixed_step);
            }
            self.captured = false;
            self.fixed_step_scaled = false;
            info!(
                "slow motion released, scale restored to {:.3}",
                self.original_time_scale
            );
        }
    }

    /// Advances the ramp-in by `unscaled_delta` real seconds.
    ///
    /// Abandoned claims are released first. The ramp itself does nothing
    /// while no owner holds slow motion or once it has completed.
    pub fn advance<H>(&mut self, host: &mut H, unscaled_delta: f32)
    where
        H: TimeScaleHost + ?Sized,
    {
        self.reclaim_abandoned(host);
        if self.owner_count == 0 || self.ramp_elapsed >= self.ramp_seconds {
            return;
        }
        self.ramp_elapsed = (self.ramp_elapsed + unscaled_delta.max(0.0)).min(self.ramp_seconds);
        self.apply_current(host);
    }

    fn reclaim_abandoned<H>(&mut self, host: &mut H)
    where
        H: TimeScaleHost + ?Sized,
    {
        let mine: Vec<SlowMotionToken> = {
            let mut abandoned = ABANDONED.lock().unwrap_or_else(PoisonError::into_inner);
            let (issued_here, others) = std::mem::take(&mut *abandoned)
                .into_iter()
                .partition(|token| token.registry == self.id);
            *abandoned = others;
            issued_here
        };
        for token in mine {
            warn!("releasing slow-motion claim abandoned by a dropped owner");
            self.release(host, token);
        }
    }

    fn current_scale(&self) -> f32 {
        if self.ramp_seconds <= 0.0 {
            return self.target_scale;
        }
        let t = (self.ramp_elapsed / self.ramp_seconds).clamp(0.0, 1.0);
        self.original_time_scale + (self.target_scale - self.original_time_scale) * t
    }

    fn apply_current<H>(&self, host: &mut H)
    where
        H: TimeScaleHost + ?Sized,
    {
        let scale = self.current_scale();
        host.set_time_scale(scale);
        if self.fixed_step_scaled {
            host.set_fixed_step(self.original_fixed_step * scale);
        }
    }
}
