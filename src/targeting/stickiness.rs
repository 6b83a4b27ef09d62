//! Target hysteresis.
//!
//! Small aim tremor and single-frame occlusion would otherwise flip the lock
//! between neighbouring targets and reset the timer. The filter keeps the
//! previous target while a new candidate stays inside an angular and distance
//! band around the last observation, and keeps it through short gaps in
//! visibility.

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;
use crate::vector_math::{angle_between_deg, try_direction};
use crate::world::TransformGraph;
use crate::{
    DEFAULT_ANGLE_TOLERANCE_DEG, DEFAULT_DISTANCE_TOLERANCE_M, DEFAULT_RETAIN_GRACE_SECONDS,
};

/// Tolerance band of the stickiness filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickinessSettings {
    /// Aim drift, in degrees, that still counts as the same target.
    pub angle_tolerance_deg: f32,
    /// Range drift, in metres, that still counts as the same target.
    pub distance_tolerance_m: f32,
    /// How long a target that dropped out of view is still held.
    pub retain_grace_seconds: f32,
}

impl Default for StickinessSettings {
    fn default() -> Self {
        Self {
            angle_tolerance_deg: DEFAULT_ANGLE_TOLERANCE_DEG,
            distance_tolerance_m: DEFAULT_DISTANCE_TOLERANCE_M,
            retain_grace_seconds: DEFAULT_RETAIN_GRACE_SECONDS,
        }
    }
}

/// Last observation of the locked target as seen from the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickinessMemory {
    /// Clock time of the last sighting.
    pub last_seen_time: f64,
    /// Unit direction from the camera at the last sighting.
    pub last_direction_from_camera: Vec3,
    /// Camera distance at the last sighting.
    pub last_distance_from_camera: f32,
    valid: bool,
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    direction: Vec3,
    distance: f32,
}

impl StickinessMemory {
    /// Whether anything has been remembered since the last clear.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Forgets the last observation.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn remember(&mut self, observation: Observation, now: f64) {
        self.last_seen_time = now;
        self.last_direction_from_camera = observation.direction;
        self.last_distance_from_camera = observation.distance;
        self.valid = true;
    }

    fn within_band(&self, observation: &Observation, settings: &StickinessSettings) -> bool {
        if !self.valid {
            return false;
        }
        let angle = angle_between_deg(self.last_direction_from_camera, observation.direction);
        let distance = (observation.distance - self.last_distance_from_camera).abs();
        angle <= settings.angle_tolerance_deg && distance <= settings.distance_tolerance_m
    }
}

fn observe<W>(world: &W, camera_position: Vec3, target: EntityRef) -> Option<Observation>
where
    W: TransformGraph + ?Sized,
{
    let offset = world.pose(target)?.translation - camera_position;
    Some(Observation {
        direction: try_direction(offset).unwrap_or(Vec3::ZERO),
        distance: offset.length(),
    })
}

/// Decides which target the lock follows this tick.
///
/// `candidate` must already be canonicalized so that comparisons always use
/// entity origins rather than whichever sub-part the cast struck. `memory` is
/// updated in place and cleared when the lock is lost.
///
/// When a different candidate falls inside the tolerance band, the held
/// target is kept but `memory` takes the candidate's direction and distance,
/// not only its timestamp. The band therefore moves with the aim: every
/// consecutive pair of observations is compared, never an observation against
/// the one the lock started from. A slow sweep that stays within tolerance
/// from tick to tick keeps the original target however far the aim ends up
/// from it.
pub fn apply<W>(
    world: &W,
    previous: Option<EntityRef>,
    candidate: Option<EntityRef>,
    camera_position: Vec3,
    now: f64,
    memory: &mut StickinessMemory,
    settings: &StickinessSettings,
) -> Option<EntityRef>
where
    W: TransformGraph + ?Sized,
{
    let observed = candidate.and_then(|c| observe(world, camera_position, c).map(|o| (c, o)));

    match (previous, observed) {
        (None, None) => {
            memory.clear();
            None
        }
        (None, Some((fresh, observation))) => {
            memory.remember(observation, now);
            Some(fresh)
        }
        (Some(held), Some((fresh, observation))) if held == fresh => {
            memory.remember(observation, now);
            Some(held)
        }
        (Some(held), Some((fresh, observation))) => {
            if memory.within_band(&observation, settings) {
                // Jitter: the band re-centres on the candidate.
                memory.remember(observation, now);
                Some(held)
            } else {
                debug!("retarget {held} -> {fresh}");
                memory.remember(observation, now);
                Some(fresh)
            }
        }
        (Some(held), None) => {
            if now - memory.last_seen_time < f64::from(settings.retain_grace_seconds) {
                Some(held)
            } else {
                debug!("lost {held} after grace period");
                memory.clear();
                None
            }
        }
    }
}
