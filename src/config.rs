//! Load-time configuration of the blink-lock ability.
//!
//! Configuration is read once, validated once, and then trusted for the life
//! of the ability. Every field has a default so partial JSON documents are
//! accepted.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blink::BlinkSettings;
use crate::clock::AbilityClock;
use crate::entity::LayerMask;
use crate::input::LockStartMode;
use crate::slow_motion::SlowMotionSettings;
use crate::targeting::StickinessSettings;
use crate::{
    DEFAULT_CHARGING_SEARCH_RADIUS, DEFAULT_COOLDOWN_SECONDS, DEFAULT_LOCK_ON_TIME_SECONDS,
    DEFAULT_MAX_DISTANCE, DEFAULT_SEARCH_RADIUS, MAX_TIME_SCALE, MIN_TIME_SCALE,
};

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid JSON for [`BlinkLockConfig`].
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is outside its accepted range.
    #[error("{field} must be {requirement}, got {value}")]
    Invalid {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Human-readable constraint.
        requirement: &'static str,
        /// Value found in the document.
        value: f32,
    },
}

/// Shape of the search-radius growth while a lock charges.
///
/// Maps lock progress in `0..=1` to a blend weight in `0..=1` between the base
/// and charging radius.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum RadiusRamp {
    /// Jump to the charging radius as soon as a charge starts.
    Immediate,
    /// Grow at a constant rate.
    #[default]
    Linear,
    /// Grow slowly first (quadratic).
    EaseIn,
    /// Grow quickly first (inverse quadratic).
    EaseOut,
    /// Hermite smoothstep.
    SmoothStep,
    /// Evenly spaced samples over `0..=1`, linearly interpolated.
    Sampled(Vec<f32>),
}

impl RadiusRamp {
    /// Blend weight for `progress`.
    ///
    /// # Examples
    ///
    /// ```
    /// use blink_lock::config::RadiusRamp;
    /// assert_eq!(RadiusRamp::Linear.evaluate(0.25), 0.25);
    /// assert_eq!(RadiusRamp::Sampled(vec![0.0, 1.0, 1.0]).evaluate(0.5), 1.0);
    /// ```
    #[must_use]
    pub fn evaluate(&self, progress: f32) -> f32 {
        let t = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let weight = match self {
            Self::Immediate => 1.0,
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::SmoothStep => t * t * (3.0 - 2.0 * t),
            Self::Sampled(samples) => sample(samples, t),
        };
        weight.clamp(0.0, 1.0)
    }
}

fn sample(samples: &[f32], t: f32) -> f32 {
    match samples {
        [] => t,
        [only] => *only,
        _ => {
            let segments = samples.len() - 1;
            #[expect(
                clippy::cast_precision_loss,
                reason = "Sample tables are a handful of entries long."
            )]
            let scaled = t * segments as f32;
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "scaled lies in 0..=segments and is floored first."
            )]
            let index = (scaled.floor() as usize).min(segments - 1);
            let (Some(&a), Some(&b)) = (samples.get(index), samples.get(index + 1)) else {
                return t;
            };
            #[expect(clippy::cast_precision_loss, reason = "index is tiny.")]
            let local = scaled - index as f32;
            a + (b - a) * local
        }
    }
}

/// How the ability looks for targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingSettings {
    /// Sphere-cast radius while idle; also used by the aimed-target lookup.
    pub search_radius: f32,
    /// Sphere-cast radius reached at full lock progress.
    pub charging_search_radius: f32,
    /// Curve from base to charging radius.
    pub radius_ramp: RadiusRamp,
    /// Sphere-cast length in metres.
    pub max_distance: f32,
    /// Layers the sphere cast can strike.
    pub layer_mask: LayerMask,
    /// Layers that block line of sight.
    pub occlusion_mask: LayerMask,
    /// Tag the target's entity must carry. Empty accepts any entity.
    pub required_tag: String,
    /// Reject candidates hidden behind an occluder.
    pub require_line_of_sight: bool,
}

impl Default for TargetingSettings {
    fn default() -> Self {
        Self {
            search_radius: DEFAULT_SEARCH_RADIUS,
            charging_search_radius: DEFAULT_CHARGING_SEARCH_RADIUS,
            radius_ramp: RadiusRamp::Linear,
            max_distance: DEFAULT_MAX_DISTANCE,
            layer_mask: LayerMask::ALL,
            occlusion_mask: LayerMask::ALL,
            required_tag: String::new(),
            require_line_of_sight: true,
        }
    }
}

impl TargetingSettings {
    /// Sphere-cast radius for a charge at `progress`.
    #[must_use]
    pub fn radius_at(&self, progress: f32) -> f32 {
        let weight = self.radius_ramp.evaluate(progress);
        self.search_radius + (self.charging_search_radius - self.search_radius) * weight
    }
}

/// Complete configuration of one ability instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkLockConfig {
    /// How input turns into charging.
    pub lock_start_mode: LockStartMode,
    /// Seconds of steady lock before the blink is ready.
    pub lock_on_time_seconds: f32,
    /// Seconds after a blink before a new lock may start.
    pub cooldown_seconds: f32,
    /// Clock used for cooldowns, grace periods, and (by default) the timer.
    pub clock: AbilityClock,
    /// Fill the lock timer in real time while slow motion is held.
    pub unscaled_timer_while_slowed: bool,
    /// Blink as soon as the lock is ready.
    pub auto_blink: bool,
    /// In hold mode, releasing the lock button on a ready lock blinks.
    pub blink_on_release: bool,
    /// Time dilation while charging.
    pub slow_motion: SlowMotionSettings,
    /// Acquisition query.
    pub targeting: TargetingSettings,
    /// Hysteresis against aim jitter.
    pub stickiness: StickinessSettings,
    /// Landing placement and arrival effects.
    pub blink: BlinkSettings,
}

impl Default for BlinkLockConfig {
    fn default() -> Self {
        Self {
            lock_start_mode: LockStartMode::OnKeyHold,
            lock_on_time_seconds: DEFAULT_LOCK_ON_TIME_SECONDS,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            clock: AbilityClock::Scaled,
            unscaled_timer_while_slowed: true,
            auto_blink: false,
            blink_on_release: true,
            slow_motion: SlowMotionSettings::default(),
            targeting: TargetingSettings::default(),
            stickiness: StickinessSettings::default(),
            blink: BlinkSettings::default(),
        }
    }
}

fn require(
    field: &'static str,
    value: f32,
    requirement: &'static str,
    ok: bool,
) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            requirement,
            value,
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    require(field, value, "finite and non-negative", value >= 0.0)
}

impl BlinkLockConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    ///
    /// # Examples
    ///
    /// ```
    /// use blink_lock::config::BlinkLockConfig;
    /// let config = BlinkLockConfig::from_json_str(r#"{ "cooldown_seconds": 3.0 }"#).unwrap();
    /// assert_eq!(config.cooldown_seconds, 3.0);
    /// assert!(BlinkLockConfig::from_json_str(r#"{ "cooldown_seconds": -1.0 }"#).is_err());
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON file.
    ///
    /// # Errors
    /// Propagates I/O failures as [`ConfigError::Io`] in addition to the
    /// errors of [`Self::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks ranges once at load time.
    ///
    /// # Errors
    /// Returns the first out-of-range field as [`ConfigError::Invalid`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("lock_on_time_seconds", self.lock_on_time_seconds)?;
        non_negative("cooldown_seconds", self.cooldown_seconds)?;

        let targeting = &self.targeting;
        non_negative("targeting.search_radius", targeting.search_radius)?;
        non_negative(
            "targeting.charging_search_radius",
            targeting.charging_search_radius,
        )?;
        require(
            "targeting.max_distance",
            targeting.max_distance,
            "finite and positive",
            targeting.max_distance > 0.0,
        )?;
        if let RadiusRamp::Sampled(samples) = &targeting.radius_ramp {
            for &value in samples {
                require("targeting.radius_ramp", value, "finite", true)?;
            }
        }

        let sticky = &self.stickiness;
        non_negative("stickiness.angle_tolerance_deg", sticky.angle_tolerance_deg)?;
        non_negative("stickiness.distance_tolerance_m", sticky.distance_tolerance_m)?;
        non_negative("stickiness.retain_grace_seconds", sticky.retain_grace_seconds)?;

        let slow = &self.slow_motion;
        require("slow_motion.time_scale", slow.time_scale, "finite", true)?;
        non_negative("slow_motion.ramp_in_seconds", slow.ramp_in_seconds)?;
        if !(MIN_TIME_SCALE..=MAX_TIME_SCALE).contains(&slow.time_scale) {
            warn!(
                "slow_motion.time_scale {} will be clamped to {}",
                slow.time_scale,
                slow.clamped_scale()
            );
        }

        let offset = self.blink.offset;
        require("blink.offset", offset.length(), "finite", true)?;
        Ok(())
    }
}
