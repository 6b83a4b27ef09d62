//! In-memory world used by tests, the demo binary, and the Bevy plugin.
//!
//! The handle stores a small transform hierarchy with sphere colliders and
//! answers sphere-cast and raycast queries analytically. It also tracks the
//! gameplay capabilities of each node so blink eliminations can be observed.

use bevy::prelude::Resource;
use glam::Vec3;
use hashbrown::HashMap;
use log::{debug, info};
use ordered_float::OrderedFloat;

use crate::entity::{EntityRef, Hit, LayerMask, Pose};
use crate::vector_math::try_direction;
use crate::world::{EntityRegistry, KillCapability, QueryService, TargetServices, TransformGraph};

/// Sphere collider attached to a node, centred on the node's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereCollider {
    /// Radius before the node's scale is applied.
    pub radius: f32,
    /// Layer queried against [`LayerMask`]s.
    pub layer: u8,
}

#[derive(Debug, Clone, Default)]
struct SceneNode {
    local: Pose,
    parent: Option<EntityRef>,
    collider: Option<SphereCollider>,
    tags: Vec<String>,
    velocity: Option<(Vec3, Vec3)>,
    /// `Some(origin)` when this node is a registered entity root.
    root_origin: Option<EntityRef>,
    health: bool,
    controller: bool,
    hazard_radius: Option<f32>,
    active: bool,
}

/// Record of a target removed from play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elimination {
    /// Entity root that was removed.
    pub target: EntityRef,
    /// Capability that removed it.
    pub method: KillCapability,
    /// Where it happened.
    pub at: Vec3,
}

#[derive(Resource, Default, Debug)]
/// Snapshot of the scene the ability aims into.
pub struct WorldHandle {
    nodes: HashMap<EntityRef, SceneNode>,
    next_id: u64,
    eliminations: Vec<Elimination>,
}

impl WorldHandle {
    /// Adds a top-level node at `pose`.
    pub fn spawn(&mut self, pose: Pose) -> EntityRef {
        self.insert(pose, None)
    }

    /// Adds a node parented under `parent` with a local `pose`.
    pub fn spawn_child(&mut self, parent: EntityRef, pose: Pose) -> EntityRef {
        self.insert(pose, Some(parent))
    }

    fn insert(&mut self, local: Pose, parent: Option<EntityRef>) -> EntityRef {
        self.next_id += 1;
        let id = EntityRef(self.next_id);
        self.nodes.insert(
            id,
            SceneNode {
                local,
                parent,
                active: true,
                ..SceneNode::default()
            },
        );
        id
    }

    fn node_mut(&mut self, node: EntityRef) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&node)
    }

    /// Gives `node` a sphere collider on `layer`.
    pub fn set_collider(&mut self, node: EntityRef, radius: f32, layer: u8) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.collider = Some(SphereCollider { radius, layer });
        }
        self
    }

    /// Adds a gameplay tag to `node`.
    pub fn add_tag(&mut self, node: EntityRef, tag: impl Into<String>) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.tags.push(tag.into());
        }
        self
    }

    /// Registers `root` as a gameplay entity whose targeting origin is
    /// `origin` (the root itself when `None`).
    pub fn register_entity_root(
        &mut self,
        root: EntityRef,
        origin: Option<EntityRef>,
    ) -> &mut Self {
        if let Some(n) = self.node_mut(root) {
            n.root_origin = Some(origin.unwrap_or(root));
        }
        self
    }

    /// Gives `node` a rigid body moving at `velocity`.
    pub fn add_rigid_body(&mut self, node: EntityRef, velocity: Vec3) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.velocity = Some((velocity, Vec3::ZERO));
        }
        self
    }

    /// Gives `node` health, enabling insta-kills.
    pub fn add_health(&mut self, node: EntityRef) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.health = true;
        }
        self
    }

    /// Gives `node` a controller that honours destroy notifications.
    pub fn add_controller(&mut self, node: EntityRef) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.controller = true;
        }
        self
    }

    /// Marks `node` as an explosive hazard eliminating every entity within
    /// `radius` when it goes off.
    pub fn add_hazard(&mut self, node: EntityRef, radius: f32) -> &mut Self {
        if let Some(n) = self.node_mut(node) {
            n.hazard_radius = Some(radius);
        }
        self
    }

    /// Moves `node` to a new local pose without touching its children.
    pub fn set_local_pose(&mut self, node: EntityRef, pose: Pose) -> bool {
        self.node_mut(node).map(|n| n.local = pose).is_some()
    }

    /// Linear velocity of a rigid body.
    #[must_use]
    pub fn velocity(&self, node: EntityRef) -> Option<Vec3> {
        self.nodes.get(&node).and_then(|n| n.velocity).map(|(v, _)| v)
    }

    /// Whether the node still takes part in queries.
    #[must_use]
    pub fn is_active(&self, node: EntityRef) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.active)
    }

    /// Every elimination so far, oldest first.
    #[must_use]
    pub fn eliminations(&self) -> &[Elimination] {
        &self.eliminations
    }

    /// Iterates nodes that can currently be struck, with their world pose.
    fn colliders(&self, mask: LayerMask) -> impl Iterator<Item = (EntityRef, Vec3, f32)> + '_ {
        self.nodes.iter().filter_map(move |(&id, node)| {
            let collider = node.collider?;
            if !node.active || !mask.contains(collider.layer) {
                return None;
            }
            let pose = self.pose(id)?;
            Some((id, pose.translation, collider.radius * pose.scale.max_element()))
        })
    }

    /// Finds where a sphere of `sweep` radius moving along `dir` first touches
    /// a collider of `radius` at `centre`.
    fn sweep_contact(
        origin: Vec3,
        dir: Vec3,
        sweep: f32,
        max_distance: f32,
        centre: Vec3,
        radius: f32,
    ) -> Option<(f32, Vec3)> {
        let reach = radius + sweep;
        let offset = origin - centre;
        let c = offset.length_squared() - reach * reach;
        let surface_towards = |from: Vec3| {
            centre + try_direction(from - centre).unwrap_or(-dir) * radius
        };
        if c <= 0.0 {
            // Already overlapping at the start of the sweep.
            return Some((0.0, surface_towards(origin)));
        }
        let b = offset.dot(dir);
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t = -b - discriminant.sqrt();
        if !(0.0..=max_distance).contains(&t) {
            return None;
        }
        Some((t, surface_towards(origin + dir * t)))
    }

    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        sweep: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<Hit> {
        let Some(dir) = try_direction(direction) else {
            return Vec::new();
        };
        let mut hits: Vec<Hit> = self
            .colliders(mask)
            .filter_map(|(handle, centre, radius)| {
                Self::sweep_contact(origin, dir, sweep, max_distance, centre, radius)
                    .map(|(distance, point)| Hit { handle, point, distance })
            })
            .collect();
        hits.sort_by_key(|hit| (OrderedFloat(hit.distance), hit.handle));
        hits
    }

    fn capability_holder(
        &self,
        target: EntityRef,
        capability: KillCapability,
    ) -> Option<EntityRef> {
        let mut current = Some(target);
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            let has = match capability {
                KillCapability::AreaEffect => node.hazard_radius.is_some(),
                KillCapability::InstaKill => node.health,
                KillCapability::DestroyNotify => node.controller,
            };
            if has {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    /// Takes the entity owning `target` out of play.
    fn eliminate(&mut self, target: EntityRef, method: KillCapability) -> bool {
        let root = self.find_owning_entity_root(target).unwrap_or(target);
        if !self.is_active(root) {
            return false;
        }
        let at = self.pose(root).map_or(Vec3::ZERO, |p| p.translation);
        let subtree: Vec<EntityRef> = self
            .nodes
            .keys()
            .copied()
            .filter(|&id| self.is_self_or_descendant_of(id, root))
            .collect();
        for id in subtree {
            if let Some(node) = self.node_mut(id) {
                node.active = false;
            }
        }
        info!("eliminated {root} via {method:?}");
        self.eliminations.push(Elimination {
            target: root,
            method,
            at,
        });
        true
    }
}

impl QueryService for WorldHandle {
    fn sphere_cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> Vec<Hit> {
        self.cast(origin, direction, radius.max(0.0), max_distance, mask)
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<Hit> {
        self.cast(origin, direction, 0.0, max_distance, mask)
            .into_iter()
            .next()
    }
}

impl TransformGraph for WorldHandle {
    fn pose(&self, node: EntityRef) -> Option<Pose> {
        let entry = self.nodes.get(&node)?;
        match entry.parent {
            Some(parent) => Some(self.pose(parent)?.mul_pose(&entry.local)),
            None => Some(entry.local),
        }
    }

    fn parent(&self, node: EntityRef) -> Option<EntityRef> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn has_tag(&self, node: EntityRef, tag: &str) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|n| n.tags.iter().any(|t| t == tag))
    }

    fn set_pose(&mut self, node: EntityRef, pose: Pose) -> bool {
        let parent_pose = self.parent(node).and_then(|p| self.pose(p));
        let local = match parent_pose {
            Some(parent) => {
                let inverse = parent.rotation.inverse();
                Pose {
                    translation: (inverse * (pose.translation - parent.translation)) / parent.scale,
                    rotation: inverse * pose.rotation,
                    scale: pose.scale / parent.scale,
                }
            }
            None => pose,
        };
        self.set_local_pose(node, local)
    }

    fn zero_velocity(&mut self, node: EntityRef) -> bool {
        match self.node_mut(node).and_then(|n| n.velocity.as_mut()) {
            Some(velocity) => {
                *velocity = (Vec3::ZERO, Vec3::ZERO);
                true
            }
            None => false,
        }
    }

    fn is_alive(&self, node: EntityRef) -> bool {
        self.is_active(node)
    }
}

impl EntityRegistry for WorldHandle {
    fn is_entity_root(&self, node: EntityRef) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.root_origin.is_some())
    }

    fn entity_origin(&self, root: EntityRef) -> EntityRef {
        self.nodes
            .get(&root)
            .and_then(|n| n.root_origin)
            .unwrap_or(root)
    }
}

impl TargetServices for WorldHandle {
    fn has_capability(&self, target: EntityRef, capability: KillCapability) -> bool {
        self.capability_holder(target, capability).is_some()
    }

    fn insta_kill(&mut self, target: EntityRef, point: Vec3) -> bool {
        debug!("insta-kill requested on {target} at {point:?}");
        self.capability_holder(target, KillCapability::InstaKill)
            .is_some_and(|holder| self.eliminate(holder, KillCapability::InstaKill))
    }

    fn destroy_notify(&mut self, target: EntityRef) -> bool {
        self.capability_holder(target, KillCapability::DestroyNotify)
            .is_some_and(|holder| self.eliminate(holder, KillCapability::DestroyNotify))
    }

    fn trigger_area_effect(&mut self, target: EntityRef, origin: Vec3) -> bool {
        let Some(holder) = self.capability_holder(target, KillCapability::AreaEffect) else {
            return false;
        };
        let radius = self
            .nodes
            .get(&holder)
            .and_then(|n| n.hazard_radius)
            .unwrap_or(0.0);
        if !self.eliminate(holder, KillCapability::AreaEffect) {
            return false;
        }
        let caught: Vec<EntityRef> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.active && n.root_origin.is_some())
            .map(|(&id, _)| id)
            .filter(|&id| {
                self.pose(id)
                    .is_some_and(|p| p.translation.distance(origin) <= radius)
            })
            .collect();
        for id in caught {
            self.eliminate(id, KillCapability::AreaEffect);
        }
        true
    }
}
