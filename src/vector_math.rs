//! Vector helpers shared by targeting and the blink executor.
//!
//! Poses in this crate follow a +Z-forward, +Y-up convention: an identity
//! rotation faces `Vec3::Z`.
use glam::{Quat, Vec3};

use crate::DEGENERATE_DIRECTION_SQ;

/// Forward axis of an identity rotation.
pub const FORWARD: Vec3 = Vec3::Z;

/// Returns the unit vector of `vector`, or `None` when it is non-finite or
/// too short to carry a direction.
///
/// # Examples
///
/// ```
/// use blink_lock::vector_math::try_direction;
/// use glam::Vec3;
/// let dir = try_direction(Vec3::new(3.0, 0.0, 4.0)).unwrap();
/// assert!((dir.z - 0.8).abs() < 1e-6);
/// assert!(try_direction(Vec3::ZERO).is_none());
/// assert!(try_direction(Vec3::new(f32::NAN, 1.0, 0.0)).is_none());
/// ```
#[must_use]
pub fn try_direction(vector: Vec3) -> Option<Vec3> {
    if !vector.is_finite() || vector.length_squared() <= DEGENERATE_DIRECTION_SQ {
        return None;
    }
    vector.try_normalize()
}

/// Angle between two directions in degrees.
///
/// Degenerate inputs compare as `0.0` so that a target sitting on the camera
/// never reads as a deliberate retarget.
#[must_use]
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f32 {
    match (try_direction(a), try_direction(b)) {
        (Some(a), Some(b)) => a.dot(b).clamp(-1.0, 1.0).acos().to_degrees(),
        _ => 0.0,
    }
}

/// Full 3D rotation turning [`FORWARD`] onto `direction`.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    try_direction(direction).map(|dir| Quat::from_rotation_arc(FORWARD, dir))
}

/// Yaw-only rotation facing from `from` towards `to`.
///
/// The vertical component is discarded. When the flattened direction is
/// degenerate (target straight above or below) the full 3D direction is used
/// instead; when that is degenerate too, `None` is returned and callers keep
/// their current rotation.
///
/// # Examples
///
/// ```
/// use blink_lock::vector_math::yaw_look_rotation;
/// use glam::{Quat, Vec3};
/// let rot = yaw_look_rotation(Vec3::new(0.0, 0.0, -1.25), Vec3::ZERO).unwrap();
/// assert!(rot.abs_diff_eq(Quat::IDENTITY, 1e-6));
/// ```
#[must_use]
pub fn yaw_look_rotation(from: Vec3, to: Vec3) -> Option<Quat> {
    let delta = to - from;
    let flat = Vec3::new(delta.x, 0.0, delta.z);
    if let Some(dir) = try_direction(flat) {
        return Some(Quat::from_rotation_y(dir.x.atan2(dir.z)));
    }
    look_rotation(delta)
}
