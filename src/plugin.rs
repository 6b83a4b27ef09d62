//! Bevy plugin driving blink-lock abilities from the ECS schedule.
//!
//! Each entity carrying a [`BlinkLockCaster`] is ticked once per `Update`
//! against the shared [`WorldHandle`] resource. Bevy's virtual clock is the
//! time host, and the abilities share the process-wide
//! [`SlowMotionRegistry`]. Lock events leave the ability as
//! [`BlinkLockNotice`] observer events. Removing a caster, or despawning its
//! entity, shuts its ability down first so a charge in progress gives slow
//! motion back.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bevy::ecs::prelude::On;
use bevy::prelude::*;
use log::info;

use crate::ability::BlinkLockAbility;
use crate::clock::FrameTime;
use crate::events::LockEvent;
use crate::input::LockInput;
use crate::slow_motion::{SlowMotionRegistry, TimeScaleHost};
use crate::world_handle::WorldHandle;

/// Lock event raised by the ability on `caster`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct BlinkLockNotice {
    /// Entity carrying the [`BlinkLockCaster`].
    pub caster: Entity,
    /// What happened.
    pub event: LockEvent,
}

type Outbox = Arc<Mutex<Vec<LockEvent>>>;

/// Component owning one ability instance.
#[derive(Component, Debug)]
pub struct BlinkLockCaster {
    ability: BlinkLockAbility,
    outbox: Outbox,
}

impl BlinkLockCaster {
    /// Wraps `ability`, forwarding its events into the ECS.
    #[must_use]
    pub fn new(mut ability: BlinkLockAbility) -> Self {
        let outbox = Outbox::default();
        let sink = Arc::clone(&outbox);
        ability.subscribe(move |event| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });
        Self { ability, outbox }
    }

    /// The wrapped ability.
    #[must_use]
    pub const fn ability(&self) -> &BlinkLockAbility {
        &self.ability
    }

    /// Mutable access for configuration changes between ticks.
    pub const fn ability_mut(&mut self) -> &mut BlinkLockAbility {
        &mut self.ability
    }

    fn take_events(&self) -> Vec<LockEvent> {
        std::mem::take(&mut *self.outbox.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn forward_events(&self, commands: &mut Commands, caster: Entity) {
        for event in self.take_events() {
            commands.trigger(BlinkLockNotice { caster, event });
        }
    }
}

/// Time host over Bevy's virtual and fixed clocks.
pub struct BevyTimeHost<'a> {
    virtual_time: &'a mut Time<Virtual>,
    fixed_time: &'a mut Time<Fixed>,
}

impl<'a> BevyTimeHost<'a> {
    /// Borrows both clocks for the duration of one system run.
    pub const fn new(virtual_time: &'a mut Time<Virtual>, fixed_time: &'a mut Time<Fixed>) -> Self {
        Self {
            virtual_time,
            fixed_time,
        }
    }
}

impl TimeScaleHost for BevyTimeHost<'_> {
    fn time_scale(&self) -> f32 {
        self.virtual_time.relative_speed()
    }

    fn set_time_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale >= 0.0 {
            self.virtual_time.set_relative_speed(scale);
        }
    }

    fn fixed_step(&self) -> f32 {
        self.fixed_time.timestep().as_secs_f32()
    }

    fn set_fixed_step(&mut self, seconds: f32) {
        // A zero timestep is rejected by Bevy.
        if seconds.is_finite() && seconds > 0.0 {
            self.fixed_time.set_timestep(Duration::from_secs_f32(seconds));
        }
    }
}

/// Ticks every caster and re-emits its lock events.
pub fn tick_blink_lock_casters(
    mut commands: Commands,
    mut world: ResMut<WorldHandle>,
    real_time: Res<Time<Real>>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut fixed_time: ResMut<Time<Fixed>>,
    mut casters: Query<(Entity, &mut BlinkLockCaster, Option<&mut LockInput>)>,
) {
    let frame = FrameTime {
        delta: virtual_time.delta_secs(),
        unscaled_delta: real_time.delta_secs(),
        elapsed: virtual_time.elapsed_secs_f64(),
        unscaled_elapsed: real_time.elapsed_secs_f64(),
    };
    let mut host = BevyTimeHost::new(&mut virtual_time, &mut fixed_time);
    let mut registry = SlowMotionRegistry::global();
    registry.advance(&mut host, frame.unscaled_delta);

    for (entity, mut caster, input) in &mut casters {
        let sampled = input.as_deref().copied().unwrap_or_default();
        caster
            .ability
            .tick(&mut *world, &mut host, &mut registry, frame, &sampled);
        if let Some(mut edges) = input {
            edges.clear_edges();
        }
        caster.forward_events(&mut commands, entity);
    }
}

/// Shuts down the ability of a caster that is being removed or despawned.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value."
)]
fn shut_down_removed_caster(
    removed: On<Remove, BlinkLockCaster>,
    mut commands: Commands,
    mut casters: Query<&mut BlinkLockCaster>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut fixed_time: ResMut<Time<Fixed>>,
) {
    let entity = removed.event().entity;
    let Ok(mut caster) = casters.get_mut(entity) else {
        return;
    };
    let mut host = BevyTimeHost::new(&mut virtual_time, &mut fixed_time);
    caster
        .ability
        .shutdown(&mut host, &mut SlowMotionRegistry::global());
    caster.forward_events(&mut commands, entity);
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value."
)]
fn log_blink_lock_notice(notice: On<BlinkLockNotice>) {
    let BlinkLockNotice { caster, event } = notice.event();
    info!("blink lock {caster:?}: {event:?}");
}

/// Plugin installing the blink-lock tick and notice logging.
#[derive(Default)]
pub struct BlinkLockPlugin;

impl Plugin for BlinkLockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WorldHandle>();
        app.add_observer(log_blink_lock_notice);
        app.add_observer(shut_down_removed_caster);
        app.add_systems(Update, tick_blink_lock_casters);
    }
}
