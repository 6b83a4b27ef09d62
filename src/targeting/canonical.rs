//! Mapping raw collision nodes onto the gameplay entity that owns them.
use hashbrown::HashSet;

use crate::entity::EntityRef;
use crate::world::EntityRegistry;

/// Resolves `raw` to the targeting origin of its owning entity.
///
/// Walks up from `raw` (inclusive) to the nearest registered entity root and
/// takes that root's origin node, repeating while the origin itself belongs to
/// another root. Nodes outside any entity come back unchanged. The result is a
/// fixed point, so applying the function twice gives the same answer as
/// applying it once for every handle. Origins that refer to each other in a
/// loop settle on the smallest handle of the loop.
#[must_use]
pub fn canonicalize<W>(world: &W, raw: EntityRef) -> EntityRef
where
    W: EntityRegistry + ?Sized,
{
    let mut visited = HashSet::new();
    let mut current = raw;
    loop {
        let next = origin_of(world, current);
        if next == current {
            return current;
        }
        if !visited.insert(current) {
            return smallest_in_loop(world, current);
        }
        current = next;
    }
}

fn origin_of<W>(world: &W, node: EntityRef) -> EntityRef
where
    W: EntityRegistry + ?Sized,
{
    world
        .find_owning_entity_root(node)
        .map_or(node, |root| world.entity_origin(root))
}

/// `start` must lie on a loop of origins.
fn smallest_in_loop<W>(world: &W, start: EntityRef) -> EntityRef
where
    W: EntityRegistry + ?Sized,
{
    let mut smallest = start;
    let mut current = origin_of(world, start);
    while current != start {
        smallest = smallest.min(current);
        current = origin_of(world, current);
    }
    smallest
}
