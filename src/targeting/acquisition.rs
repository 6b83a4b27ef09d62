//! Camera-relative target acquisition.
//!
//! A thick ray is swept from the camera through the centre of the screen and
//! every surviving hit competes on distance. Acquisition holds no state; the
//! same world snapshot and query always produce the same candidate.

use log::debug;
use ordered_float::OrderedFloat;

use crate::entity::{EntityRef, Hit, LayerMask, TargetCandidate};
use crate::targeting::canonicalize;
use crate::vector_math::{try_direction, FORWARD};
use crate::world::{EntityRegistry, QueryService};
use crate::LINE_OF_SIGHT_SKIN;

/// Parameters of a single acquisition poll.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionQuery<'a> {
    /// Sphere-cast radius in metres.
    pub search_radius: f32,
    /// Sphere-cast length in metres.
    pub max_distance: f32,
    /// Layers the cast can strike.
    pub layer_mask: LayerMask,
    /// Tag the owning entity must carry; empty accepts everything.
    pub required_tag: &'a str,
    /// Reject hits hidden behind an occluder.
    pub require_line_of_sight: bool,
    /// Layers that can block line of sight.
    pub occlusion_mask: LayerMask,
}

/// Finds the nearest acceptable hit in front of `camera`.
///
/// Returns `None` when the camera is missing, nothing is struck, or every hit
/// is filtered out by tag or line of sight.
#[must_use]
pub fn acquire<W>(
    world: &W,
    camera: Option<EntityRef>,
    query: &AcquisitionQuery<'_>,
) -> Option<TargetCandidate>
where
    W: QueryService + EntityRegistry + ?Sized,
{
    let camera_pose = world.pose(camera?)?;
    let origin = camera_pose.translation;
    let direction = try_direction(camera_pose.forward()).unwrap_or(FORWARD);

    world
        .sphere_cast(
            origin,
            direction,
            query.search_radius,
            query.max_distance,
            query.layer_mask,
        )
        .into_iter()
        .filter(|hit| carries_tag(world, hit.handle, query.required_tag))
        .filter(|hit| !query.require_line_of_sight || in_line_of_sight(world, origin, hit, query))
        .min_by_key(|hit| OrderedFloat(hit.distance))
        .map(TargetCandidate::from)
}

fn carries_tag<W>(world: &W, node: EntityRef, tag: &str) -> bool
where
    W: EntityRegistry + ?Sized,
{
    if tag.is_empty() || world.has_tag(node, tag) {
        return true;
    }
    let owner = world.find_owning_entity_root(node);
    owner.is_some_and(|root| {
        world.has_tag(root, tag) || world.has_tag(world.entity_origin(root), tag)
    })
}

fn in_line_of_sight<W>(
    world: &W,
    origin: glam::Vec3,
    hit: &Hit,
    query: &AcquisitionQuery<'_>,
) -> bool
where
    W: QueryService + EntityRegistry + ?Sized,
{
    let to_hit = hit.point - origin;
    let reach = to_hit.length() - LINE_OF_SIGHT_SKIN;
    let Some(direction) = try_direction(to_hit) else {
        return true;
    };
    if reach <= 0.0 {
        return true;
    }
    match world.raycast(origin, direction, reach, query.occlusion_mask) {
        None => true,
        Some(occluder) => {
            let visible = world.is_self_or_descendant_of(occluder.handle, hit.handle)
                || canonicalize(world, occluder.handle) == canonicalize(world, hit.handle);
            if !visible {
                debug!(
                    "candidate {} occluded by {} at {:.2}m",
                    hit.handle, occluder.handle, occluder.distance
                );
            }
            visible
        }
    }
}
