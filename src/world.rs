//! Interfaces to the collaborators the ability consumes.
//!
//! The ability never talks to a physics engine, scene graph, or health system
//! directly. Each concern is a trait; [`BlinkWorld`] bundles them for the
//! state machine and is implemented automatically for anything providing all
//! four. [`crate::world_handle::WorldHandle`] is the in-memory implementation.
use glam::Vec3;

use crate::entity::{EntityRef, Hit, LayerMask, Pose};

/// Collision queries against the current physics snapshot.
pub trait QueryService {
    /// Sweeps a sphere of `radius` from `origin` along `direction`.
    ///
    /// Hits are returned ordered by increasing distance.
    fn sphere_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<Hit>;

    /// Casts a thin ray and reports the nearest surface, if any.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask)
        -> Option<Hit>;
}

/// Read and write access to the transform hierarchy.
pub trait TransformGraph {
    /// World-space pose of `node`, or `None` if it no longer exists.
    fn pose(&self, node: EntityRef) -> Option<Pose>;

    /// Parent of `node` in the hierarchy, if any.
    fn parent(&self, node: EntityRef) -> Option<EntityRef>;

    /// Whether `node` itself carries `tag`.
    fn has_tag(&self, node: EntityRef, tag: &str) -> bool;

    /// Places `node` at `pose` in world space. Returns `false` if the node is
    /// unknown.
    fn set_pose(&mut self, node: EntityRef, pose: Pose) -> bool;

    /// Zeroes linear and angular velocity. Returns `false` when the node has
    /// no rigid body.
    fn zero_velocity(&mut self, node: EntityRef) -> bool;

    /// Whether `node` still takes part in the simulation. A dead caster
    /// force-resets its ability.
    fn is_alive(&self, node: EntityRef) -> bool {
        self.pose(node).is_some()
    }

    /// Whether `node` is `ancestor` or sits anywhere beneath it.
    fn is_self_or_descendant_of(&self, node: EntityRef, ancestor: EntityRef) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }
}

/// Registry of gameplay entity roots.
pub trait EntityRegistry: TransformGraph {
    /// Whether `node` is registered as the root of a gameplay entity.
    fn is_entity_root(&self, node: EntityRef) -> bool;

    /// The node representing `root` for targeting purposes, usually a child
    /// placed at the entity's centre of mass. Defaults to the root itself.
    fn entity_origin(&self, root: EntityRef) -> EntityRef {
        root
    }

    /// Walks upward from `node` (inclusive) to the nearest entity root.
    fn find_owning_entity_root(&self, node: EntityRef) -> Option<EntityRef> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if self.is_entity_root(candidate) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }
}

/// Ways a target can be eliminated, in the order the executor tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KillCapability {
    /// Explosive hazards detonate instead of dying quietly.
    AreaEffect,
    /// Health component able to kill outright.
    InstaKill,
    /// Controller that accepts a generic destroy notification.
    DestroyNotify,
}

impl KillCapability {
    /// Order in which the blink executor tries capabilities.
    pub const PRIORITY: [Self; 3] = [Self::AreaEffect, Self::InstaKill, Self::DestroyNotify];
}

/// Gameplay services exposed by potential targets.
pub trait TargetServices {
    /// Whether `target` exposes `capability`.
    fn has_capability(&self, target: EntityRef, capability: KillCapability) -> bool;

    /// Kills `target` outright, struck at `point`. Returns `false` if it cannot.
    fn insta_kill(&mut self, target: EntityRef, point: Vec3) -> bool;

    /// Asks the controller of `target` to destroy it. Returns `false` if it cannot.
    fn destroy_notify(&mut self, target: EntityRef) -> bool;

    /// Detonates `target` at `origin`. Returns `false` if it is not a hazard.
    fn trigger_area_effect(&mut self, target: EntityRef, origin: Vec3) -> bool;
}

/// Everything the lock state machine needs from its surroundings.
pub trait BlinkWorld: QueryService + EntityRegistry + TargetServices {}

impl<T> BlinkWorld for T where T: QueryService + EntityRegistry + TargetServices {}
