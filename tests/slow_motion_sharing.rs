//! Several casters sharing the process-wide slow-motion registry.

use blink_lock::{
    BlinkLockAbility, BlinkLockConfig, LockInput, LockState, SimulationClock, SlowMotionRegistry,
    SlowMotionSettings, TimeScaleHost,
};
use rstest::rstest;
use serial_test::serial;
use test_utils::Arena;

const TICK: f32 = 0.05;

fn config() -> BlinkLockConfig {
    BlinkLockConfig {
        slow_motion: SlowMotionSettings {
            time_scale: 0.2,
            ..SlowMotionSettings::default()
        },
        ..BlinkLockConfig::default()
    }
}

struct Squad {
    arena: Arena,
    clock: SimulationClock,
    casters: Vec<BlinkLockAbility>,
}

impl Squad {
    fn new(size: usize) -> Self {
        let mut arena = Arena::new();
        arena.enemy_at(0.0, 12.0);
        let casters = (0..size)
            .map(|_| BlinkLockAbility::new(config(), arena.caster, Some(arena.camera)))
            .collect();
        Self {
            arena,
            clock: SimulationClock::new(0.02),
            casters,
        }
    }

    fn step(&mut self, inputs: &[LockInput]) {
        let frame = self.clock.advance(TICK);
        let mut registry = SlowMotionRegistry::global();
        registry.advance(&mut self.clock, frame.unscaled_delta);
        for (ability, input) in self.casters.iter_mut().zip(inputs) {
            ability.tick(
                &mut self.arena.world,
                &mut self.clock,
                &mut registry,
                frame,
                input,
            );
        }
    }

    fn teardown(&mut self) {
        let mut registry = SlowMotionRegistry::global();
        for ability in &mut self.casters {
            ability.shutdown(&mut self.clock, &mut registry);
        }
    }
}

#[rstest]
#[case::first_out_first(&[0, 1])]
#[case::last_out_first(&[1, 0])]
#[serial]
fn time_returns_only_when_every_caster_lets_go(#[case] release_order: &[usize]) {
    let mut squad = Squad::new(2);
    squad.step(&[LockInput::press(), LockInput::press()]);
    assert_eq!(SlowMotionRegistry::global().owner_count(), 2);
    assert!((squad.clock.time_scale() - 0.2).abs() < 1e-6);

    let mut held = [true, true];
    for (released, &index) in release_order.iter().enumerate() {
        if let Some(slot) = held.get_mut(index) {
            *slot = false;
        }
        let inputs: Vec<LockInput> = held
            .iter()
            .map(|&h| if h { LockInput::hold() } else { LockInput::default() })
            .collect();
        squad.step(&inputs);
        let still_held = released + 1 < release_order.len();
        let slowed = (squad.clock.time_scale() - 0.2).abs() < 1e-6;
        assert_eq!(slowed, still_held, "after releasing caster {index}");
    }
    assert!(!SlowMotionRegistry::global().is_active());
    assert!((squad.clock.time_scale() - 1.0).abs() < 1e-6);
    squad.teardown();
}

#[rstest]
#[serial]
fn disabling_one_caster_keeps_the_other_slowed() {
    let mut squad = Squad::new(2);
    squad.step(&[LockInput::press(), LockInput::press()]);

    let mut registry = SlowMotionRegistry::global();
    if let Some(first) = squad.casters.first_mut() {
        first.set_enabled(false, &mut squad.clock, &mut registry);
        assert_eq!(first.state(), LockState::Idle);
    }
    assert_eq!(registry.owner_count(), 1);
    drop(registry);
    assert!((squad.clock.time_scale() - 0.2).abs() < 1e-6);

    squad.teardown();
    assert!((squad.clock.time_scale() - 1.0).abs() < 1e-6);
    assert!(!SlowMotionRegistry::global().is_active());
}

#[rstest]
#[serial]
fn external_baseline_survives_a_full_session() {
    let mut squad = Squad::new(3);
    squad.clock.set_time_scale(0.8);
    squad.step(&[LockInput::press(); 3]);
    assert_eq!(SlowMotionRegistry::global().original_time_scale(), Some(0.8));
    squad.step(&[LockInput::release(); 3]);
    assert!((squad.clock.time_scale() - 0.8).abs() < 1e-6);
    squad.teardown();
}
