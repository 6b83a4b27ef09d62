//! Handles and small value types describing the world the ability aims into.
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::vector_math::FORWARD;

/// Opaque handle to a node of the world-transform graph.
///
/// The ability never owns what a handle points at; it only looks nodes up
/// through [`crate::world::TransformGraph`] each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef(pub u64);

impl From<u64> for EntityRef {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl EntityRef {
    /// Raw id behind the handle.
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// World-space placement of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position.
    pub translation: Vec3,
    /// World orientation; +Z is forward.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// At the origin, unrotated, unit scale.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Unrotated, unit-scale pose at `translation`.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Replaces the rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Replaces the scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Direction the node faces in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * FORWARD
    }

    /// Maps a local-space vector into world space, ignoring translation.
    ///
    /// # Examples
    ///
    /// ```
    /// use blink_lock::Pose;
    /// use glam::{Quat, Vec3};
    /// let pose = Pose::from_translation(Vec3::new(4.0, 0.0, 0.0))
    ///     .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
    /// let world = pose.transform_vector(Vec3::Z);
    /// assert!((world - Vec3::X).length() < 1e-5);
    /// ```
    #[must_use]
    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.rotation * (self.scale * local)
    }

    /// Maps a local-space point into world space.
    #[must_use]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.translation + self.transform_vector(local)
    }

    /// Composes a child's local pose under this pose.
    #[must_use]
    pub fn mul_pose(&self, local: &Self) -> Self {
        Self {
            translation: self.transform_point(local.translation),
            rotation: self.rotation * local.rotation,
            scale: self.scale * local.scale,
        }
    }
}

/// Bit set of collision layers, one bit per layer index `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl LayerMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer.
    pub const NONE: Self = Self(0);

    /// Mask containing only `layer`. Layers outside `0..32` yield an empty
    /// mask.
    #[must_use]
    pub const fn layer(layer: u8) -> Self {
        if layer < 32 {
            Self(1 << layer)
        } else {
            Self::NONE
        }
    }

    /// Adds `layer` to the mask.
    #[must_use]
    pub const fn with(self, layer: u8) -> Self {
        Self(self.0 | Self::layer(layer).0)
    }

    /// Whether `layer` is in the mask.
    #[must_use]
    pub const fn contains(self, layer: u8) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }
}

/// One surface reported by the query service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Collision node that was struck; possibly a sub-part of an entity.
    pub handle: EntityRef,
    /// Contact point in world space.
    pub point: Vec3,
    /// Distance travelled along the cast when the contact happened.
    pub distance: f32,
}

/// Best target found by a single acquisition poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    /// Collision node that was struck, before canonicalization.
    pub handle: EntityRef,
    /// Distance along the cast.
    pub distance: f32,
    /// Contact point in world space.
    pub point: Vec3,
}

impl From<Hit> for TargetCandidate {
    fn from(hit: Hit) -> Self {
        Self {
            handle: hit.handle,
            distance: hit.distance,
            point: hit.point,
        }
    }
}
