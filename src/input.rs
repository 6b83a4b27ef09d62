//! Logical input for the lock ability and the charging gate derived from it.
use bevy::prelude::Component;
use serde::{Deserialize, Serialize};

/// How the player starts and sustains a charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStartMode {
    /// Charges whenever the ability is usable.
    Automatic,
    /// Charges while the lock button is held.
    #[default]
    OnKeyHold,
    /// Each press of the lock button toggles charging.
    OnKeyPress,
}

/// Button edges and levels sampled for one tick.
///
/// The host maps whatever devices it supports onto these logical buttons.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "Each flag is an independent edge or level of a logical button."
)]
pub struct LockInput {
    /// Lock button is down this tick.
    pub lock_held: bool,
    /// Lock button went down this tick.
    pub lock_pressed: bool,
    /// Lock button came up this tick.
    pub lock_released: bool,
    /// Blink button went down this tick.
    pub blink_pressed: bool,
}

impl LockInput {
    /// Input for a tick where the lock button goes down.
    #[must_use]
    pub const fn press() -> Self {
        Self {
            lock_held: true,
            lock_pressed: true,
            lock_released: false,
            blink_pressed: false,
        }
    }

    /// Input for a tick where the lock button stays down.
    #[must_use]
    pub const fn hold() -> Self {
        Self {
            lock_held: true,
            lock_pressed: false,
            lock_released: false,
            blink_pressed: false,
        }
    }

    /// Input for a tick where the lock button comes up.
    #[must_use]
    pub const fn release() -> Self {
        Self {
            lock_held: false,
            lock_pressed: false,
            lock_released: true,
            blink_pressed: false,
        }
    }

    /// Adds a blink press to this tick.
    #[must_use]
    pub const fn with_blink(mut self) -> Self {
        self.blink_pressed = true;
        self
    }

    /// Drops the one-tick edges, keeping only the held level.
    pub const fn clear_edges(&mut self) {
        self.lock_pressed = false;
        self.lock_released = false;
        self.blink_pressed = false;
    }
}

/// Turns per-tick input into the "charging-active" signal for one mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChargeGate {
    toggled_on: bool,
}

impl ChargeGate {
    /// Whether the ability should be charging this tick.
    ///
    /// `usable` folds together every other gate: enabled, caster alive, and
    /// off cooldown. A closed gate also switches a press-toggle off, so the
    /// player has to press again once the ability becomes usable.
    pub fn evaluate(&mut self, mode: LockStartMode, input: &LockInput, usable: bool) -> bool {
        if !usable {
            self.toggled_on = false;
            return false;
        }
        match mode {
            LockStartMode::Automatic => true,
            // The release tick still counts so a blink on release can see
            // that the lock was charging.
            LockStartMode::OnKeyHold => input.lock_held || input.lock_released,
            LockStartMode::OnKeyPress => {
                if input.lock_pressed {
                    self.toggled_on = !self.toggled_on;
                }
                self.toggled_on
            }
        }
    }

    /// Forgets any press-mode toggle.
    pub const fn reset(&mut self) {
        self.toggled_on = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LockInput::default(), false)]
    #[case(LockInput::press(), true)]
    #[case(LockInput::hold(), true)]
    #[case(LockInput::release(), true)]
    fn hold_mode_includes_release_tick(#[case] input: LockInput, #[case] expected: bool) {
        let mut gate = ChargeGate::default();
        assert_eq!(gate.evaluate(LockStartMode::OnKeyHold, &input, true), expected);
    }

    #[rstest]
    fn clearing_edges_keeps_hold_level() {
        let mut input = LockInput::press().with_blink();
        input.clear_edges();
        assert_eq!(input, LockInput::hold());
    }

    #[rstest]
    fn press_mode_toggles_on_each_press() {
        let mut gate = ChargeGate::default();
        let mode = LockStartMode::OnKeyPress;
        assert!(gate.evaluate(mode, &LockInput::press(), true));
        assert!(gate.evaluate(mode, &LockInput::default(), true));
        assert!(!gate.evaluate(mode, &LockInput::press(), true));
        assert!(!gate.evaluate(mode, &LockInput::default(), true));
    }

    #[rstest]
    fn closed_gate_forces_toggle_off() {
        let mut gate = ChargeGate::default();
        let mode = LockStartMode::OnKeyPress;
        assert!(gate.evaluate(mode, &LockInput::press(), true));
        assert!(!gate.evaluate(mode, &LockInput::default(), false));
        assert!(!gate.evaluate(mode, &LockInput::default(), true));
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn automatic_follows_usability(#[case] usable: bool, #[case] expected: bool) {
        let mut gate = ChargeGate::default();
        assert_eq!(
            gate.evaluate(LockStartMode::Automatic, &LockInput::default(), usable),
            expected
        );
    }
}
