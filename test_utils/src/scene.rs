//! Scene builders on top of the in-memory world.

use blink_lock::{EntityRef, Pose, TransformGraph, WorldHandle};
use glam::Vec3;

/// Tag carried by every enemy the builders spawn.
pub const ENEMY_TAG: &str = "enemy";

/// Layer enemy colliders live on.
pub const ENEMY_LAYER: u8 = 1;

/// Point `distance` metres from the origin, `degrees` to the right of +Z.
///
/// # Examples
/// ```
/// use test_utils::at_angle;
/// let ahead = at_angle(0.0, 10.0);
/// assert!((ahead.z - 10.0).abs() < 1e-6);
/// ```
#[must_use]
pub fn at_angle(degrees: f32, distance: f32) -> Vec3 {
    let radians = degrees.to_radians();
    Vec3::new(radians.sin() * distance, 0.0, radians.cos() * distance)
}

/// A camera at the origin looking down +Z and a caster standing behind it.
#[derive(Debug)]
pub struct Arena {
    pub world: WorldHandle,
    pub camera: EntityRef,
    pub caster: EntityRef,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        let mut world = WorldHandle::default();
        let camera = world.spawn(Pose::IDENTITY);
        let caster = world.spawn(Pose::from_translation(Vec3::NEG_Z));
        world.add_rigid_body(caster, Vec3::new(0.0, 0.0, 4.0));
        Self {
            world,
            camera,
            caster,
        }
    }

    /// Spawns a single-node enemy with health.
    pub fn enemy_at(&mut self, degrees: f32, distance: f32) -> EntityRef {
        let node = self.world.spawn(Pose::from_translation(at_angle(degrees, distance)));
        self.world
            .set_collider(node, 0.5, ENEMY_LAYER)
            .register_entity_root(node, None)
            .add_tag(node, ENEMY_TAG)
            .add_health(node);
        node
    }

    /// Spawns an enemy whose root has a separate origin node and two
    /// collidable limbs. Returns `(root, origin, limbs)`.
    pub fn rigged_enemy_at(&mut self, at: Vec3) -> (EntityRef, EntityRef, [EntityRef; 2]) {
        let root = self.world.spawn(Pose::from_translation(at));
        let origin = self.world.spawn_child(root, Pose::from_translation(Vec3::Y * 0.5));
        let head = self.world.spawn_child(root, Pose::from_translation(Vec3::Y * 1.2));
        let arm = self
            .world
            .spawn_child(root, Pose::from_translation(Vec3::new(0.3, 0.6, 0.0)));
        self.world
            .set_collider(head, 0.25, ENEMY_LAYER)
            .set_collider(arm, 0.2, ENEMY_LAYER)
            .register_entity_root(root, Some(origin))
            .add_tag(root, ENEMY_TAG)
            .add_health(root);
        (root, origin, [head, arm])
    }

    /// Moves `node` far to the side, out of every cast from the camera.
    pub fn hide(&mut self, node: EntityRef) {
        self.world
            .set_pose(node, Pose::from_translation(Vec3::new(500.0, 0.0, 0.0)));
    }

    /// Moves `node` back into view at `at`.
    pub fn place(&mut self, node: EntityRef, at: Vec3) {
        self.world.set_pose(node, Pose::from_translation(at));
    }
}
