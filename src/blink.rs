//! Blink execution: teleporting the caster next to its locked target.
//!
//! The move is instantaneous. The caster's pose is written directly, its
//! momentum optionally discarded, and the target optionally eliminated using
//! the first kill capability it exposes.

use glam::{Quat, Vec3};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ability::LockState;
use crate::entity::{EntityRef, Pose};
use crate::vector_math::yaw_look_rotation;
use crate::world::{BlinkWorld, KillCapability, TargetServices};
use crate::DEFAULT_DESTINATION_OFFSET;

/// Frame the destination offset is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetSpace {
    /// Rotated and scaled with the target.
    #[default]
    TargetLocal,
    /// Added to the target position as-is.
    World,
}

/// Where the caster lands and what happens on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkSettings {
    /// Landing offset from the target position.
    pub offset: Vec3,
    /// Frame `offset` is expressed in.
    pub offset_space: OffsetSpace,
    /// Turn the caster to face the target after landing (yaw only).
    pub snap_rotation: bool,
    /// Clear the caster's linear and angular velocity after landing.
    pub zero_out_velocity: bool,
    /// Eliminate the target on arrival.
    pub kill_on_blink: bool,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            offset: Vec3::from_array(DEFAULT_DESTINATION_OFFSET),
            offset_space: OffsetSpace::TargetLocal,
            snap_rotation: true,
            zero_out_velocity: true,
            kill_on_blink: false,
        }
    }
}

/// Outcome of a completed blink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkResult {
    /// Entity the caster blinked to.
    pub target: EntityRef,
    /// World position the caster landed on.
    pub destination: Vec3,
    /// Caster rotation after landing.
    pub rotation: Quat,
    /// Whether a kill capability succeeded.
    pub killed_target: bool,
}

/// Reasons a blink request is turned down. None of them change any state.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BlinkError {
    /// The lock has not reached [`LockState::Ready`].
    #[error("blink requested while {state:?}")]
    NotReady {
        /// Phase the ability was in.
        state: LockState,
    },
    /// The previous blink is still cooling down.
    #[error("blink requested during cooldown ({remaining:.2}s left)")]
    OnCooldown {
        /// Seconds until the cooldown ends.
        remaining: f64,
    },
    /// Ready without a target; only reachable through inconsistent state.
    #[error("no locked target")]
    NoTarget,
    /// The locked target vanished from the world.
    #[error("target {0} no longer has a transform")]
    MissingTarget(EntityRef),
    /// The caster vanished from the world.
    #[error("caster {0} has no transform")]
    MissingCaster(EntityRef),
}

/// World-space landing point for a target at `target`.
///
/// # Examples
///
/// ```
/// use blink_lock::blink::{destination, BlinkSettings, OffsetSpace};
/// use blink_lock::Pose;
/// use glam::Vec3;
/// let settings = BlinkSettings {
///     offset: Vec3::new(0.0, 0.0, -1.25),
///     offset_space: OffsetSpace::TargetLocal,
///     ..BlinkSettings::default()
/// };
/// assert_eq!(destination(&Pose::IDENTITY, &settings), Vec3::new(0.0, 0.0, -1.25));
/// ```
#[must_use]
pub fn destination(target: &Pose, settings: &BlinkSettings) -> Vec3 {
    let offset = match settings.offset_space {
        OffsetSpace::TargetLocal => target.transform_vector(settings.offset),
        OffsetSpace::World => settings.offset,
    };
    target.translation + offset
}

/// Teleports `caster` next to `target` and applies the arrival effects.
///
/// # Errors
/// Returns [`BlinkError::MissingTarget`] or [`BlinkError::MissingCaster`]
/// when either node has vanished from the world; nothing is moved then.
pub fn execute<W>(
    world: &mut W,
    caster: EntityRef,
    target: EntityRef,
    settings: &BlinkSettings,
) -> Result<BlinkResult, BlinkError>
where
    W: BlinkWorld + ?Sized,
{
    let target_pose = world.pose(target).ok_or(BlinkError::MissingTarget(target))?;
    let caster_pose = world.pose(caster).ok_or(BlinkError::MissingCaster(caster))?;

    let landing = destination(&target_pose, settings);
    let rotation = if settings.snap_rotation {
        yaw_look_rotation(landing, target_pose.translation).unwrap_or(caster_pose.rotation)
    } else {
        caster_pose.rotation
    };

    world.set_pose(
        caster,
        Pose {
            translation: landing,
            rotation,
            scale: caster_pose.scale,
        },
    );
    if settings.zero_out_velocity && !world.zero_velocity(caster) {
        debug!("caster {caster} has no rigid body to stop");
    }

    let killed_target = settings.kill_on_blink && eliminate(world, target, target_pose.translation);
    info!("blinked {caster} to {landing:?} beside {target} (killed: {killed_target})");

    Ok(BlinkResult {
        target,
        destination: landing,
        rotation,
        killed_target,
    })
}

/// Tries each kill capability of `target` in priority order and stops at the
/// first that succeeds.
pub fn eliminate<W>(world: &mut W, target: EntityRef, point: Vec3) -> bool
where
    W: TargetServices + ?Sized,
{
    for capability in KillCapability::PRIORITY {
        if !world.has_capability(target, capability) {
            continue;
        }
        let done = match capability {
            KillCapability::AreaEffect => world.trigger_area_effect(target, point),
            KillCapability::InstaKill => world.insta_kill(target, point),
            KillCapability::DestroyNotify => world.destroy_notify(target),
        };
        if done {
            return true;
        }
        debug!("{capability:?} on {target} declined, trying next capability");
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::FORWARD;
    use crate::world::TransformGraph;
    use crate::world_handle::WorldHandle;
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    struct Arena {
        world: WorldHandle,
        caster: EntityRef,
        target: EntityRef,
    }

    #[fixture]
    fn arena() -> Arena {
        let mut world = WorldHandle::default();
        let caster = world.spawn(Pose::from_translation(Vec3::new(0.0, 0.0, -20.0)));
        let target = world.spawn(Pose::IDENTITY);
        world
            .add_rigid_body(caster, Vec3::new(0.0, 0.0, 12.0))
            .register_entity_root(target, None);
        Arena {
            world,
            caster,
            target,
        }
    }

    fn settings(offset: Vec3, space: OffsetSpace) -> BlinkSettings {
        BlinkSettings {
            offset,
            offset_space: space,
            ..BlinkSettings::default()
        }
    }

    #[rstest]
    fn lands_behind_target_in_local_space(mut arena: Arena) {
        let result = execute(
            &mut arena.world,
            arena.caster,
            arena.target,
            &settings(Vec3::new(0.0, 0.0, -1.25), OffsetSpace::TargetLocal),
        )
        .expect("both nodes exist");
        assert_eq!(result.destination, Vec3::new(0.0, 0.0, -1.25));
        let pose = arena.world.pose(arena.caster).expect("caster exists");
        assert!(pose.translation.abs_diff_eq(Vec3::new(0.0, 0.0, -1.25), 1e-6));
        assert!((pose.rotation * FORWARD).abs_diff_eq(Vec3::Z, 1e-5));
        assert_eq!(arena.world.velocity(arena.caster), Some(Vec3::ZERO));
        assert!(!result.killed_target);
    }

    #[rstest]
    fn local_offset_follows_target_rotation(mut arena: Arena) {
        let turned =
            Pose::IDENTITY.with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!(arena.world.set_pose(arena.target, turned));
        let local = execute(
            &mut arena.world,
            arena.caster,
            arena.target,
            &settings(Vec3::new(0.0, 0.0, -2.0), OffsetSpace::TargetLocal),
        )
        .expect("both nodes exist");
        assert_relative_eq!(local.destination.x, -2.0, epsilon = 1e-5);
        let world_space = execute(
            &mut arena.world,
            arena.caster,
            arena.target,
            &settings(Vec3::new(0.0, 0.0, -2.0), OffsetSpace::World),
        )
        .expect("both nodes exist");
        assert_relative_eq!(world_space.destination.z, -2.0, epsilon = 1e-5);
    }

    #[rstest]
    fn overhead_landing_keeps_finite_rotation(mut arena: Arena) {
        let result = execute(
            &mut arena.world,
            arena.caster,
            arena.target,
            &settings(Vec3::new(0.0, 3.0, 0.0), OffsetSpace::World),
        )
        .expect("both nodes exist");
        assert!(result.rotation.is_finite());
        assert!((result.rotation * FORWARD).abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[rstest]
    fn missing_target_moves_nothing(mut arena: Arena) {
        let err = execute(
            &mut arena.world,
            arena.caster,
            EntityRef(404),
            &BlinkSettings::default(),
        )
        .expect_err("unknown target");
        assert_eq!(err, BlinkError::MissingTarget(EntityRef(404)));
        let pose = arena.world.pose(arena.caster).expect("caster exists");
        assert_relative_eq!(pose.translation.z, -20.0);
    }

    #[rstest]
    #[case(true, true, true, KillCapability::AreaEffect)]
    #[case(false, true, true, KillCapability::InstaKill)]
    #[case(false, false, true, KillCapability::DestroyNotify)]
    fn kill_uses_highest_priority_capability(
        mut arena: Arena,
        #[case] hazard: bool,
        #[case] health: bool,
        #[case] controller: bool,
        #[case] expected: KillCapability,
    ) {
        if hazard {
            arena.world.add_hazard(arena.target, 2.0);
        }
        if health {
            arena.world.add_health(arena.target);
        }
        if controller {
            arena.world.add_controller(arena.target);
        }
        let kill = BlinkSettings {
            kill_on_blink: true,
            ..BlinkSettings::default()
        };
        let result = execute(&mut arena.world, arena.caster, arena.target, &kill)
            .expect("both nodes exist");
        assert!(result.killed_target);
        let methods: Vec<KillCapability> =
            arena.world.eliminations().iter().map(|e| e.method).collect();
        assert_eq!(methods.first(), Some(&expected));
    }

    #[rstest]
    fn targets_without_capabilities_survive(mut arena: Arena) {
        assert!(!eliminate(&mut arena.world, arena.target, Vec3::ZERO));
        assert!(arena.world.is_active(arena.target));
    }
}
