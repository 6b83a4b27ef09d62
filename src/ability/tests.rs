use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use glam::Vec3;
use rstest::{fixture, rstest};

use super::*;
use crate::clock::{AbilityClock, SimulationClock};
use crate::entity::Pose;
use crate::world::{TargetServices, TransformGraph};
use crate::world_handle::WorldHandle;

const TICK: f32 = 0.1;
const DEG: f32 = std::f32::consts::PI / 180.0;

fn test_config() -> BlinkLockConfig {
    let mut config = BlinkLockConfig {
        lock_on_time_seconds: 0.3,
        cooldown_seconds: 1.0,
        clock: AbilityClock::Unscaled,
        ..BlinkLockConfig::default()
    };
    config.targeting.required_tag = "enemy".into();
    config.stickiness.retain_grace_seconds = 0.25;
    config
}

struct Rig {
    world: WorldHandle,
    clock: SimulationClock,
    registry: SlowMotionRegistry,
    ability: BlinkLockAbility,
    seen: Arc<Mutex<Vec<LockEvent>>>,
    caster: EntityRef,
    enemy: EntityRef,
}

impl Rig {
    fn with_config(config: BlinkLockConfig) -> Self {
        let mut world = WorldHandle::default();
        let camera = world.spawn(Pose::IDENTITY);
        let caster = world.spawn(Pose::from_translation(Vec3::new(0.0, 0.0, -1.0)));
        world.add_rigid_body(caster, Vec3::new(0.0, 0.0, 5.0));
        let enemy = spawn_enemy(&mut world, 0.0, 10.0);

        let mut ability = BlinkLockAbility::new(config, caster, Some(camera));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        ability.subscribe(move |event| sink.lock().expect("event log").push(event.clone()));
        Self {
            world,
            clock: SimulationClock::new(0.02),
            registry: SlowMotionRegistry::new(),
            ability,
            seen,
            caster,
            enemy,
        }
    }

    fn step(&mut self, input: LockInput) -> Option<BlinkResult> {
        let frame = self.clock.advance(TICK);
        self.ability
            .tick(&mut self.world, &mut self.clock, &mut self.registry, frame, &input)
    }

    fn drain(&self) -> Vec<LockEvent> {
        std::mem::take(&mut *self.seen.lock().expect("event log"))
    }

    fn hide(&mut self, node: EntityRef) {
        assert!(self
            .world
            .set_pose(node, Pose::from_translation(Vec3::new(50.0, 0.0, 0.0))));
    }

    fn charge_to_ready(&mut self) {
        self.step(LockInput::press());
        for _ in 0..3 {
            self.step(LockInput::hold());
        }
        assert_eq!(self.ability.state(), LockState::Ready);
        self.drain();
    }
}

fn spawn_enemy(world: &mut WorldHandle, degrees: f32, distance: f32) -> EntityRef {
    let angle = degrees * DEG;
    let node = world.spawn(Pose::from_translation(Vec3::new(
        angle.sin() * distance,
        0.0,
        angle.cos() * distance,
    )));
    world
        .set_collider(node, 0.5, 1)
        .register_entity_root(node, None)
        .add_tag(node, "enemy")
        .add_health(node);
    node
}

#[fixture]
fn rig() -> Rig {
    Rig::with_config(test_config())
}

fn progress_values(events: &[LockEvent]) -> Vec<f32> {
    events
        .iter()
        .filter_map(|event| match event {
            LockEvent::LockProgressChanged { progress } => Some(*progress),
            _ => None,
        })
        .collect()
}

#[rstest]
fn lock_progress_reaches_ready_on_third_charging_tick(mut rig: Rig) {
    rig.step(LockInput::press());
    assert_eq!(
        rig.drain(),
        vec![LockEvent::LockStarted { target: rig.enemy }]
    );
    assert_eq!(rig.ability.state(), LockState::Charging);

    rig.step(LockInput::hold());
    rig.step(LockInput::hold());
    assert_eq!(rig.ability.state(), LockState::Charging);
    rig.step(LockInput::hold());
    assert_eq!(rig.ability.state(), LockState::Ready);

    let events = rig.drain();
    let progress = progress_values(&events);
    assert_eq!(progress.len(), 3);
    for (got, expected) in progress.iter().zip([1.0 / 3.0, 2.0 / 3.0, 1.0]) {
        assert_relative_eq!(*got, expected, epsilon = 1e-3);
    }
    assert_eq!(events.last(), Some(&LockEvent::LockReady { target: rig.enemy }));
    assert_relative_eq!(rig.ability.lock_timer(), 0.3);
}

#[rstest]
fn charging_engages_slow_motion(mut rig: Rig) {
    rig.step(LockInput::press());
    assert!(rig.ability.holds_slow_motion());
    assert_relative_eq!(rig.clock.time_scale(), 0.25);
    rig.step(LockInput::release());
    assert!(!rig.ability.holds_slow_motion());
    assert_relative_eq!(rig.clock.time_scale(), 1.0);
}

#[rstest]
fn aim_jitter_keeps_target_and_accumulates(mut rig: Rig) {
    rig.step(LockInput::press());
    rig.step(LockInput::hold());
    assert_relative_eq!(rig.ability.lock_timer(), 0.1, epsilon = 1e-5);

    let neighbour = spawn_enemy(&mut rig.world, 3.0, 10.2);
    let enemy = rig.enemy;
    rig.hide(enemy);
    rig.step(LockInput::hold());

    assert_eq!(rig.ability.charging_target(), Some(rig.enemy));
    assert_ne!(rig.ability.charging_target(), Some(neighbour));
    assert_relative_eq!(rig.ability.lock_timer(), 0.2, epsilon = 1e-5);
    assert!(!rig
        .drain()
        .iter()
        .any(|e| matches!(e, LockEvent::LockStarted { .. })));
}

#[rstest]
fn deliberate_retarget_restarts_timer_but_keeps_slow_motion(mut rig: Rig) {
    rig.step(LockInput::press());
    rig.step(LockInput::hold());
    let other = spawn_enemy(&mut rig.world, 0.0, 20.0);
    let enemy = rig.enemy;
    rig.hide(enemy);
    rig.drain();
    rig.step(LockInput::hold());

    assert_eq!(rig.ability.charging_target(), Some(other));
    assert_relative_eq!(rig.ability.lock_timer(), 0.0);
    assert_eq!(rig.drain(), vec![LockEvent::LockStarted { target: other }]);
    assert_eq!(rig.registry.owner_count(), 1);
}

#[rstest]
fn short_occlusion_is_bridged_without_progress(mut rig: Rig) {
    rig.step(LockInput::press());
    rig.step(LockInput::hold());
    let enemy = rig.enemy;
    let home = rig.world.pose(enemy).expect("enemy exists");
    rig.hide(enemy);
    rig.step(LockInput::hold());
    assert_eq!(rig.ability.state(), LockState::Charging);
    assert_relative_eq!(rig.ability.lock_timer(), 0.1, epsilon = 1e-5);

    assert!(rig.world.set_pose(enemy, home));
    rig.step(LockInput::hold());
    assert_eq!(rig.ability.charging_target(), Some(enemy));
    assert_relative_eq!(rig.ability.lock_timer(), 0.2, epsilon = 1e-5);
}

#[rstest]
fn long_occlusion_cancels_and_restores_time(mut rig: Rig) {
    rig.step(LockInput::press());
    let enemy = rig.enemy;
    rig.hide(enemy);
    rig.drain();
    rig.step(LockInput::hold());
    rig.step(LockInput::hold());
    assert_eq!(rig.ability.state(), LockState::Charging);
    rig.step(LockInput::hold());

    assert_eq!(rig.ability.state(), LockState::Idle);
    assert_eq!(
        rig.drain(),
        vec![LockEvent::LockCanceled {
            reason: CancelReason::TargetLost
        }]
    );
    assert_relative_eq!(rig.clock.time_scale(), 1.0);
    assert!(!rig.ability.session().stickiness.is_valid());
}

#[rstest]
fn releasing_while_charging_cancels(mut rig: Rig) {
    rig.step(LockInput::press());
    rig.step(LockInput::hold());
    rig.drain();
    assert!(rig.step(LockInput::release()).is_none());
    assert_eq!(
        rig.drain(),
        vec![LockEvent::LockCanceled {
            reason: CancelReason::InputReleased
        }]
    );
    assert_eq!(rig.ability.state(), LockState::Idle);
}

#[rstest]
fn releasing_a_ready_lock_blinks(mut rig: Rig) {
    rig.charge_to_ready();
    let result = rig.step(LockInput::release()).expect("blink on release");

    assert_eq!(result.target, rig.enemy);
    assert!(result.destination.abs_diff_eq(Vec3::new(0.0, 0.0, 8.75), 1e-5));
    let pose = rig.world.pose(rig.caster).expect("caster exists");
    assert!(pose.translation.abs_diff_eq(result.destination, 1e-5));
    assert_eq!(rig.world.velocity(rig.caster), Some(Vec3::ZERO));
    assert_eq!(rig.ability.state(), LockState::Cooldown);
    assert_eq!(rig.ability.charging_target(), None);
    assert_relative_eq!(rig.clock.time_scale(), 1.0);
    assert_eq!(rig.drain(), vec![LockEvent::BlinkExecuted { result }]);
}

#[rstest]
fn release_without_blink_on_release_cancels_ready_lock() {
    let mut rig = Rig::with_config(BlinkLockConfig {
        blink_on_release: false,
        ..test_config()
    });
    rig.charge_to_ready();
    assert!(rig.step(LockInput::release()).is_none());
    assert_eq!(rig.ability.state(), LockState::Idle);
}

#[rstest]
fn blink_button_spends_ready_lock(mut rig: Rig) {
    rig.charge_to_ready();
    let result = rig.step(LockInput::hold().with_blink());
    assert!(result.is_some());
    assert_eq!(rig.ability.state(), LockState::Cooldown);
}

#[rstest]
fn cooldown_blocks_new_locks_until_it_expires(mut rig: Rig) {
    rig.charge_to_ready();
    rig.step(LockInput::hold().with_blink());
    let blink_time = rig.ability.cooldown_until() - 1.0;
    rig.drain();

    let mut restarted_at = None;
    for _ in 0..20 {
        rig.step(LockInput::hold());
        if rig
            .drain()
            .iter()
            .any(|e| matches!(e, LockEvent::LockStarted { .. }))
        {
            restarted_at = Some(rig.clock.advance(0.0).unscaled_elapsed);
            break;
        }
        assert_eq!(rig.ability.state(), LockState::Cooldown);
    }
    let resumed = restarted_at.expect("lock resumes after cooldown");
    assert!(resumed >= blink_time + 1.0 - 1e-6);
}

#[rstest]
fn blink_requests_outside_ready_are_rejected(mut rig: Rig) {
    let idle_frame = rig.clock.advance(TICK);
    let idle_err = rig
        .ability
        .try_blink(&mut rig.world, &mut rig.clock, &mut rig.registry, idle_frame)
        .expect_err("idle ability cannot blink");
    assert_eq!(
        idle_err,
        BlinkError::NotReady {
            state: LockState::Idle
        }
    );

    rig.charge_to_ready();
    rig.step(LockInput::hold().with_blink());
    let frame = rig.clock.advance(TICK);
    let err = rig
        .ability
        .try_blink(&mut rig.world, &mut rig.clock, &mut rig.registry, frame)
        .expect_err("cooling down");
    assert!(matches!(err, BlinkError::OnCooldown { remaining } if remaining > 0.0));
    assert_eq!(rig.ability.state(), LockState::Cooldown);
}

#[rstest]
fn external_cooldown_cancels_charge(mut rig: Rig) {
    rig.step(LockInput::press());
    rig.drain();
    let frame = rig.clock.advance(0.0);
    rig.ability
        .begin_cooldown(&mut rig.clock, &mut rig.registry, frame);
    assert_eq!(
        rig.drain(),
        vec![LockEvent::LockCanceled {
            reason: CancelReason::Cooldown
        }]
    );
    assert_eq!(rig.ability.state(), LockState::Cooldown);
    assert!(!rig.registry.is_active());
}

#[rstest]
fn auto_blink_fires_on_ready() {
    let mut rig = Rig::with_config(BlinkLockConfig {
        auto_blink: true,
        ..test_config()
    });
    rig.step(LockInput::press());
    rig.step(LockInput::hold());
    rig.step(LockInput::hold());
    assert!(rig.step(LockInput::hold()).is_some());
    let events = rig.drain();
    let ready = events
        .iter()
        .position(|e| matches!(e, LockEvent::LockReady { .. }))
        .expect("ready fired");
    assert!(matches!(
        events.get(ready + 1),
        Some(LockEvent::BlinkExecuted { .. })
    ));
}

#[rstest]
fn press_mode_toggles_charging() {
    let mut rig = Rig::with_config(BlinkLockConfig {
        lock_start_mode: LockStartMode::OnKeyPress,
        ..test_config()
    });
    rig.step(LockInput::press());
    rig.step(LockInput::default());
    assert_eq!(rig.ability.state(), LockState::Charging);
    assert_relative_eq!(rig.ability.lock_timer(), 0.1, epsilon = 1e-5);
    rig.step(LockInput::press());
    assert_eq!(rig.ability.state(), LockState::Idle);
}

#[rstest]
fn automatic_mode_charges_without_input() {
    let mut rig = Rig::with_config(BlinkLockConfig {
        lock_start_mode: LockStartMode::Automatic,
        ..test_config()
    });
    rig.step(LockInput::default());
    assert_eq!(rig.ability.charging_target(), Some(rig.enemy));
}

#[rstest]
fn disabling_mid_charge_forces_reset(mut rig: Rig) {
    rig.step(LockInput::press());
    rig.drain();
    rig.ability
        .set_enabled(false, &mut rig.clock, &mut rig.registry);
    assert_eq!(
        rig.drain(),
        vec![LockEvent::LockCanceled {
            reason: CancelReason::Disabled
        }]
    );
    assert_relative_eq!(rig.clock.time_scale(), 1.0);
    rig.step(LockInput::hold());
    assert_eq!(rig.ability.state(), LockState::Idle);
    assert!(rig.drain().is_empty());
}

#[rstest]
fn caster_death_forces_reset(mut rig: Rig) {
    let caster = rig.caster;
    rig.world.add_health(caster);
    rig.step(LockInput::press());
    rig.drain();
    assert!(rig.world.insta_kill(caster, Vec3::ZERO));
    rig.step(LockInput::hold());
    assert_eq!(
        rig.drain(),
        vec![LockEvent::LockCanceled {
            reason: CancelReason::Disabled
        }]
    );
    assert!(!rig.registry.is_active());
}

#[rstest]
fn shared_slow_motion_restores_after_last_owner(mut rig: Rig) {
    let second_caster = rig.world.spawn(Pose::IDENTITY);
    let mut second = BlinkLockAbility::new(test_config(), second_caster, rig.ability.camera());

    let frame = rig.clock.advance(TICK);
    rig.ability.tick(
        &mut rig.world,
        &mut rig.clock,
        &mut rig.registry,
        frame,
        &LockInput::press(),
    );
    second.tick(
        &mut rig.world,
        &mut rig.clock,
        &mut rig.registry,
        frame,
        &LockInput::press(),
    );
    assert_eq!(rig.registry.owner_count(), 2);

    rig.step(LockInput::release());
    assert_relative_eq!(rig.clock.time_scale(), 0.25);

    second.shutdown(&mut rig.clock, &mut rig.registry);
    assert_relative_eq!(rig.clock.time_scale(), 1.0);
    assert!(!rig.registry.is_active());
}

#[rstest]
fn dropping_a_charging_ability_hands_slow_motion_back(mut rig: Rig) {
    rig.step(LockInput::press());
    assert!(rig.registry.is_active());

    let replacement = BlinkLockAbility::new(test_config(), rig.caster, None);
    drop(std::mem::replace(&mut rig.ability, replacement));
    rig.registry.advance(&mut rig.clock, 0.0);

    assert_eq!(rig.registry.owner_count(), 0);
    assert_relative_eq!(rig.clock.time_scale(), 1.0);
}

#[rstest]
fn aimed_target_lookup_has_no_side_effects(mut rig: Rig) {
    let before = rig.ability.session().clone();
    assert_eq!(rig.ability.probe_aimed_target(&rig.world), Some(rig.enemy));
    assert_eq!(rig.ability.session(), &before);
    assert!(rig.drain().is_empty());
    assert!(!rig.registry.is_active());
}

#[rstest]
fn untagged_targets_are_ignored(mut rig: Rig) {
    let enemy = rig.enemy;
    rig.hide(enemy);
    let crate_node = rig.world.spawn(Pose::from_translation(Vec3::Z * 6.0));
    rig.world.set_collider(crate_node, 0.5, 1);
    rig.step(LockInput::press());
    assert_eq!(rig.ability.state(), LockState::Idle);
    assert!(!rig.registry.is_active());
}
