//! The blink-lock controller.
//!
//! [`BlinkLockAbility`] owns one caster's lock session and drives it once per
//! tick: acquire a candidate, canonicalize it, filter it through stickiness,
//! then transition and emit events. A ready lock can be spent on a blink,
//! which starts the cooldown.
//!
//! The ability never owns the world or the clock. Both are borrowed for the
//! duration of a call, together with the [`SlowMotionRegistry`] it claims
//! slow motion from.

mod session;
#[cfg(test)]
mod tests;

use glam::Vec3;
use log::{debug, info, warn};

use crate::blink::{self, BlinkError, BlinkResult};
use crate::clock::FrameTime;
use crate::config::BlinkLockConfig;
use crate::entity::EntityRef;
use crate::events::{CancelReason, LockEvent, LockEvents, SubscriptionId};
use crate::input::{ChargeGate, LockInput, LockStartMode};
use crate::slow_motion::{SlowMotionRegistry, SlowMotionToken, TimeScaleHost};
use crate::targeting::{acquire, canonicalize, stickiness, AcquisitionQuery};
use crate::world::{BlinkWorld, EntityRegistry, QueryService};
use crate::LOCK_TIMER_EPSILON;

pub use session::{LockSession, LockState};

/// Lock-on and blink ability of a single caster.
#[derive(Debug)]
pub struct BlinkLockAbility {
    config: BlinkLockConfig,
    caster: EntityRef,
    camera: Option<EntityRef>,
    session: LockSession,
    gate: ChargeGate,
    slow_motion: Option<SlowMotionToken>,
    events: LockEvents,
    enabled: bool,
}

impl BlinkLockAbility {
    /// Creates an enabled, idle ability. `config` is trusted as validated.
    #[must_use]
    pub fn new(config: BlinkLockConfig, caster: EntityRef, camera: Option<EntityRef>) -> Self {
        Self {
            config,
            caster,
            camera,
            session: LockSession::default(),
            gate: ChargeGate::default(),
            slow_motion: None,
            events: LockEvents::default(),
            enabled: true,
        }
    }

    /// Configuration the ability was built with.
    #[must_use]
    pub const fn config(&self) -> &BlinkLockConfig {
        &self.config
    }

    /// Node that teleports on a blink.
    #[must_use]
    pub const fn caster(&self) -> EntityRef {
        self.caster
    }

    /// Node whose forward axis aims the sphere cast.
    #[must_use]
    pub const fn camera(&self) -> Option<EntityRef> {
        self.camera
    }

    /// Points the ability at another camera. An active lock is kept; the
    /// stickiness filter decides on the next tick whether it survives.
    pub const fn set_camera(&mut self, camera: Option<EntityRef>) {
        self.camera = camera;
    }

    /// Read-only view of the lock bookkeeping.
    #[must_use]
    pub const fn session(&self) -> &LockSession {
        &self.session
    }

    /// Current phase of the lock cycle.
    #[must_use]
    pub const fn state(&self) -> LockState {
        self.session.state
    }

    /// Entity being locked onto, if any.
    #[must_use]
    pub const fn charging_target(&self) -> Option<EntityRef> {
        self.session.charging_target
    }

    /// Seconds of lock accumulated so far.
    #[must_use]
    pub const fn lock_timer(&self) -> f32 {
        self.session.lock_timer
    }

    /// Clock time at which the last cooldown ends.
    #[must_use]
    pub const fn cooldown_until(&self) -> f64 {
        self.session.cooldown_until
    }

    /// Whether ticks currently do anything.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether this instance currently owns a share of slow motion.
    #[must_use]
    pub const fn holds_slow_motion(&self) -> bool {
        self.slow_motion.is_some()
    }

    /// Fraction of the lock duration accumulated, in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        let duration = self.config.lock_on_time_seconds;
        if duration <= 0.0 {
            return if self.session.state == LockState::Ready { 1.0 } else { 0.0 };
        }
        (self.session.lock_timer / duration).clamp(0.0, 1.0)
    }

    /// Subscriber list for lock events.
    pub const fn events_mut(&mut self) -> &mut LockEvents {
        &mut self.events
    }

    /// Shorthand for [`LockEvents::subscribe`].
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&LockEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Shorthand for [`LockEvents::unsubscribe`].
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Advances the lock cycle by one frame.
    ///
    /// Returns the blink performed this tick, if any. Slow-motion ramping is
    /// not advanced here; the host advances the shared registry once per
    /// frame.
    pub fn tick<W, H>(
        &mut self,
        world: &mut W,
        host: &mut H,
        registry: &mut SlowMotionRegistry,
        frame: FrameTime,
        input: &LockInput,
    ) -> Option<BlinkResult>
    where
        W: BlinkWorld + ?Sized,
        H: TimeScaleHost + ?Sized,
    {
        let now = frame.now_for(self.config.clock);
        if self.session.state == LockState::Cooldown && now >= self.session.cooldown_until {
            debug!("{} cooldown over", self.caster);
            self.session.state = LockState::Idle;
        }

        if !self.enabled || !world.is_alive(self.caster) {
            self.force_reset(host, registry);
            return None;
        }

        let mode = self.config.lock_start_mode;
        let usable = self.session.state != LockState::Cooldown;
        let charging = self.gate.evaluate(mode, input, usable);
        let hold_released =
            mode == LockStartMode::OnKeyHold && input.lock_released && !input.lock_held;

        match self.session.state {
            LockState::Idle => {
                if charging && !hold_released {
                    let (found, _) = self.select_target(&*world, None, now);
                    if let Some(target) = found {
                        self.begin_lock(host, registry, target);
                    }
                }
                None
            }
            LockState::Cooldown => None,
            LockState::Charging | LockState::Ready => {
                if !charging {
                    self.cancel(host, registry, CancelReason::InputReleased);
                    return None;
                }
                self.tick_locked(world, host, registry, frame, input, hold_released)
            }
        }
    }

    fn tick_locked<W, H>(
        &mut self,
        world: &mut W,
        host: &mut H,
        registry: &mut SlowMotionRegistry,
        frame: FrameTime,
        input: &LockInput,
        hold_released: bool,
    ) -> Option<BlinkResult>
    where
        W: BlinkWorld + ?Sized,
        H: TimeScaleHost + ?Sized,
    {
        let now = frame.now_for(self.config.clock);
        let previous = self.session.charging_target;
        let (kept, seen) = self.select_target(&*world, previous, now);
        let Some(target) = kept else {
            self.cancel(host, registry, CancelReason::TargetLost);
            return None;
        };

        if Some(target) != previous {
            self.begin_lock(host, registry, target);
        } else if seen && self.session.state == LockState::Charging {
            self.accumulate(frame, target);
        }

        let mut performed = None;
        if self.session.state == LockState::Ready {
            let wants_blink = input.blink_pressed
                || self.config.auto_blink
                || (hold_released && self.config.blink_on_release);
            if wants_blink {
                performed = self.try_blink(world, host, registry, frame).ok();
            }
        }
        if hold_released && self.session.state.is_locking() {
            self.cancel(host, registry, CancelReason::InputReleased);
        }
        performed
    }

    /// Spends a ready lock on a blink.
    ///
    /// # Errors
    /// Rejects the request with a [`BlinkError`] when the lock is not ready,
    /// the ability is cooling down, there is no target, or either node has
    /// vanished. A rejection changes nothing.
    pub fn try_blink<W, H>(
        &mut self,
        world: &mut W,
        host: &mut H,
        registry: &mut SlowMotionRegistry,
        frame: FrameTime,
    ) -> Result<BlinkResult, BlinkError>
    where
        W: BlinkWorld + ?Sized,
        H: TimeScaleHost + ?Sized,
    {
        let outcome = self.blink_now(world, host, registry, frame);
        if let Err(err) = &outcome {
            debug!("{} blink rejected: {err}", self.caster);
        }
        outcome
    }

    fn blink_now<W, H>(
        &mut self,
        world: &mut W,
        host: &mut H,
        registry: &mut SlowMotionRegistry,
        frame: FrameTime,
    ) -> Result<BlinkResult, BlinkError>
    where
        W: BlinkWorld + ?Sized,
        H: TimeScaleHost + ?Sized,
    {
        let now = frame.now_for(self.config.clock);
        match self.session.state {
            LockState::Ready => {}
            LockState::Cooldown => {
                return Err(BlinkError::OnCooldown {
                    remaining: self.session.cooldown_remaining(now),
                })
            }
            state => return Err(BlinkError::NotReady { state }),
        }
        let target = self.session.charging_target.ok_or(BlinkError::NoTarget)?;
        let result = blink::execute(world, self.caster, target, &self.config.blink)?;

        self.session.clear_target();
        self.session.state = LockState::Cooldown;
        self.session.cooldown_until = now + f64::from(self.config.cooldown_seconds);
        self.gate.reset();
        self.events.emit(&LockEvent::BlinkExecuted { result });
        self.release_slow_motion(host, registry);
        Ok(result)
    }

    /// Starts the cooldown from outside the ability, cancelling any lock.
    pub fn begin_cooldown<H>(
        &mut self,
        host: &mut H,
        registry: &mut SlowMotionRegistry,
        frame: FrameTime,
    ) where
        H: TimeScaleHost + ?Sized,
    {
        if self.session.state.is_locking() {
            self.cancel(host, registry, CancelReason::Cooldown);
        }
        let now = frame.now_for(self.config.clock);
        self.session.state = LockState::Cooldown;
        self.session.cooldown_until = now + f64::from(self.config.cooldown_seconds);
        self.gate.reset();
    }

    /// Enables or disables the ability. Disabling mid-lock resets it at once.
    pub fn set_enabled<H>(&mut self, enabled: bool, host: &mut H, registry: &mut SlowMotionRegistry)
    where
        H: TimeScaleHost + ?Sized,
    {
        self.enabled = enabled;
        if !enabled {
            self.force_reset(host, registry);
        }
    }

    /// Hard reset: cancels any lock and gives up slow motion unconditionally.
    pub fn force_reset<H>(&mut self, host: &mut H, registry: &mut SlowMotionRegistry)
    where
        H: TimeScaleHost + ?Sized,
    {
        if self.session.state.is_locking() {
            self.cancel(host, registry, CancelReason::Disabled);
        }
        self.release_slow_motion(host, registry);
        self.gate.reset();
    }

    /// Tears the session down, cooldown included. The ability may be ticked
    /// again afterwards.
    pub fn shutdown<H>(&mut self, host: &mut H, registry: &mut SlowMotionRegistry)
    where
        H: TimeScaleHost + ?Sized,
    {
        self.force_reset(host, registry);
        self.session = LockSession::default();
    }

    /// Target the camera is aimed at right now, using the idle search radius.
    ///
    /// Read-only; intended for crosshair highlighting.
    #[must_use]
    pub fn probe_aimed_target<W>(&self, world: &W) -> Option<EntityRef>
    where
        W: QueryService + EntityRegistry + ?Sized,
    {
        let query = self.query(self.config.targeting.search_radius);
        acquire(world, self.camera, &query).map(|candidate| canonicalize(world, candidate.handle))
    }

    fn query(&self, search_radius: f32) -> AcquisitionQuery<'_> {
        let targeting = &self.config.targeting;
        AcquisitionQuery {
            search_radius,
            max_distance: targeting.max_distance,
            layer_mask: targeting.layer_mask,
            required_tag: &targeting.required_tag,
            require_line_of_sight: targeting.require_line_of_sight,
            occlusion_mask: targeting.occlusion_mask,
        }
    }

    /// Runs acquisition, canonicalization, and stickiness. The flag reports
    /// whether anything was actually seen this tick.
    fn select_target<W>(
        &mut self,
        world: &W,
        previous: Option<EntityRef>,
        now: f64,
    ) -> (Option<EntityRef>, bool)
    where
        W: QueryService + EntityRegistry + ?Sized,
    {
        let radius = if self.session.state.is_locking() {
            self.config.targeting.radius_at(self.progress())
        } else {
            self.config.targeting.search_radius
        };
        let candidate = {
            let query = self.query(radius);
            acquire(world, self.camera, &query).map(|c| canonicalize(world, c.handle))
        };
        let camera_position = self
            .camera
            .and_then(|camera| world.pose(camera))
            .map_or(Vec3::ZERO, |pose| pose.translation);
        let kept = stickiness::apply(
            world,
            previous,
            candidate,
            camera_position,
            now,
            &mut self.session.stickiness,
            &self.config.stickiness,
        );
        (kept, candidate.is_some())
    }

    fn begin_lock<H>(&mut self, host: &mut H, registry: &mut SlowMotionRegistry, target: EntityRef)
    where
        H: TimeScaleHost + ?Sized,
    {
        if self.config.slow_motion.enabled && self.slow_motion.is_none() {
            self.slow_motion = Some(registry.acquire(host, &self.config.slow_motion));
        }
        self.session.start(target);
        info!("{} locking onto {target}", self.caster);
        self.events.emit(&LockEvent::LockStarted { target });
    }

    fn accumulate(&mut self, frame: FrameTime, target: EntityRef) {
        let delta = if self.slow_motion.is_some() && self.config.unscaled_timer_while_slowed {
            frame.unscaled_delta
        } else {
            frame.delta_for(self.config.clock)
        };
        let duration = self.config.lock_on_time_seconds.max(0.0);
        self.session.lock_timer = (self.session.lock_timer + delta.max(0.0)).min(duration);
        let ready = self.session.lock_timer + LOCK_TIMER_EPSILON >= duration;
        if ready {
            self.session.lock_timer = duration;
            self.session.state = LockState::Ready;
        }
        let progress = self.progress();
        self.events.emit(&LockEvent::LockProgressChanged { progress });
        if ready {
            info!("{} lock on {target} ready", self.caster);
            self.events.emit(&LockEvent::LockReady { target });
        }
    }

    fn cancel<H>(&mut self, host: &mut H, registry: &mut SlowMotionRegistry, reason: CancelReason)
    where
        H: TimeScaleHost + ?Sized,
    {
        self.release_slow_motion(host, registry);
        self.session.clear_target();
        info!("{} lock canceled: {reason:?}", self.caster);
        self.events.emit(&LockEvent::LockCanceled { reason });
    }

    fn release_slow_motion<H>(&mut self, host: &mut H, registry: &mut SlowMotionRegistry)
    where
        H: TimeScaleHost + ?Sized,
    {
        if let Some(token) = self.slow_motion.take() {
            registry.release(host, token);
        }
    }
}

impl Drop for BlinkLockAbility {
    fn drop(&mut self) {
        if let Some(token) = self.slow_motion.take() {
            warn!(
                "ability of {} dropped while holding slow motion; handing the claim back",
                self.caster
            );
            SlowMotionRegistry::abandon(token);
        }
    }
}
