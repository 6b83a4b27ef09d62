//! Frame timing handed to the ability each tick.
use serde::{Deserialize, Serialize};

use crate::slow_motion::TimeScaleHost;

/// Timing of one simulation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds of simulated (scaled) time since the previous tick.
    pub delta: f32,
    /// Real seconds since the previous tick, unaffected by slow motion.
    pub unscaled_delta: f32,
    /// Simulated seconds since start-up.
    pub elapsed: f64,
    /// Real seconds since start-up.
    pub unscaled_elapsed: f64,
}

/// Which clock an ability measures cooldowns and grace periods against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityClock {
    /// Simulated time; slows down with the world.
    #[default]
    Scaled,
    /// Real time.
    Unscaled,
}

impl FrameTime {
    /// Frame delta as seen by `clock`.
    #[must_use]
    pub const fn delta_for(&self, clock: AbilityClock) -> f32 {
        match clock {
            AbilityClock::Scaled => self.delta,
            AbilityClock::Unscaled => self.unscaled_delta,
        }
    }

    /// Elapsed time as seen by `clock`.
    #[must_use]
    pub const fn now_for(&self, clock: AbilityClock) -> f64 {
        match clock {
            AbilityClock::Scaled => self.elapsed,
            AbilityClock::Unscaled => self.unscaled_elapsed,
        }
    }
}

/// Stand-alone clock with a time multiplier and fixed physics step.
///
/// Hosts without an engine clock of their own (the demo binary, tests) drive
/// this directly; [`SimulationClock::advance`] turns a real-time delta into a
/// [`FrameTime`] honouring the current multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    time_scale: f32,
    fixed_step: f32,
    elapsed: f64,
    unscaled_elapsed: f64,
}

impl SimulationClock {
    /// Clock at time zero running at real-time speed.
    #[must_use]
    pub const fn new(fixed_step: f32) -> Self {
        Self {
            time_scale: 1.0,
            fixed_step,
            elapsed: 0.0,
            unscaled_elapsed: 0.0,
        }
    }

    /// Moves both clocks forward by `real_delta` seconds of wall time.
    ///
    /// # Examples
    ///
    /// ```
    /// use blink_lock::clock::SimulationClock;
    /// use blink_lock::slow_motion::TimeScaleHost;
    /// let mut clock = SimulationClock::new(0.02);
    /// clock.set_time_scale(0.5);
    /// let frame = clock.advance(0.1);
    /// assert!((frame.delta - 0.05).abs() < 1e-6);
    /// assert!((frame.unscaled_delta - 0.1).abs() < 1e-6);
    /// ```
    pub fn advance(&mut self, real_delta: f32) -> FrameTime {
        let unscaled_delta = real_delta.max(0.0);
        let delta = unscaled_delta * self.time_scale;
        self.elapsed += f64::from(delta);
        self.unscaled_elapsed += f64::from(unscaled_delta);
        FrameTime {
            delta,
            unscaled_delta,
            elapsed: self.elapsed,
            unscaled_elapsed: self.unscaled_elapsed,
        }
    }
}

impl TimeScaleHost for SimulationClock {
    fn time_scale(&self) -> f32 {
        self.time_scale
    }

    fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale;
    }

    fn fixed_step(&self) -> f32 {
        self.fixed_step
    }

    fn set_fixed_step(&mut self, seconds: f32) {
        self.fixed_step = seconds;
    }
}
