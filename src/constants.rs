//! Default tunables for the blink-lock ability.
//!
//! Configuration files override every value here; these are the figures a
//! freshly constructed [`crate::config::BlinkLockConfig`] starts from.

/// Seconds of steady lock before a blink is ready.
pub const DEFAULT_LOCK_ON_TIME_SECONDS: f32 = 0.6;
/// Seconds after a blink before the next lock.
pub const DEFAULT_COOLDOWN_SECONDS: f32 = 1.5;
/// Idle sphere-cast radius in metres.
pub const DEFAULT_SEARCH_RADIUS: f32 = 0.35;
/// Sphere-cast radius at full lock progress.
pub const DEFAULT_CHARGING_SEARCH_RADIUS: f32 = 0.9;
/// Sphere-cast length in metres.
pub const DEFAULT_MAX_DISTANCE: f32 = 40.0;
/// Aim drift, in degrees, that still counts as the same target.
pub const DEFAULT_ANGLE_TOLERANCE_DEG: f32 = 10.0;
/// Range drift, in metres, that still counts as the same target.
pub const DEFAULT_DISTANCE_TOLERANCE_M: f32 = 1.0;
/// Seconds a target may go unseen before the lock is lost.
pub const DEFAULT_RETAIN_GRACE_SECONDS: f32 = 0.2;
/// Time multiplier while charging.
pub const DEFAULT_SLOW_TIME_SCALE: f32 = 0.25;
/// Offset applied in the target's local frame: just behind its origin.
pub const DEFAULT_DESTINATION_OFFSET: [f32; 3] = [0.0, 0.0, -1.25];

/// Lower bound applied to any requested slow-motion time scale.
pub const MIN_TIME_SCALE: f32 = 0.01;
/// Upper bound applied to any requested slow-motion time scale.
pub const MAX_TIME_SCALE: f32 = 1.0;

/// Distance the occlusion ray stops short of a candidate hit point so the
/// candidate's own surface does not count as an occluder.
pub const LINE_OF_SIGHT_SKIN: f32 = 0.05;

/// Tolerance used when comparing the lock timer to its threshold.
pub const LOCK_TIMER_EPSILON: f32 = 1e-5;

/// Squared length below which a direction is treated as degenerate.
pub const DEGENERATE_DIRECTION_SQ: f32 = 1e-8;
