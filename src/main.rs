//! Demo binary: a scripted two-caster run of the blink-lock ability.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Quat, Vec3};
use log::info;

use blink_lock::{
    init_logging, BlinkLockAbility, BlinkLockConfig, EntityRef, LockInput, Pose, SimulationClock,
    SlowMotionRegistry, TimeScaleHost, TransformGraph, WorldHandle,
};

const FRAME_SECONDS: f32 = 1.0 / 60.0;
const FIXED_STEP: f32 = 1.0 / 50.0;

/// Scripted two-caster run of the blink-lock ability
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// Number of 60 Hz frames to simulate
    #[arg(short, long, default_value_t = 240)]
    ticks: u32,
    /// JSON file overriding the default configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// When a caster presses, releases, and (optionally) blinks.
struct Script {
    press_at: u32,
    release_at: u32,
    blink_at: Option<u32>,
}

impl Script {
    fn input(&self, tick: u32) -> LockInput {
        let mut input = if tick == self.press_at {
            LockInput::press()
        } else if tick == self.release_at {
            LockInput::release()
        } else if (self.press_at..self.release_at).contains(&tick) {
            LockInput::hold()
        } else {
            LockInput::default()
        };
        if self.blink_at == Some(tick) {
            input = input.with_blink();
        }
        input
    }
}

struct Actor {
    name: &'static str,
    ability: BlinkLockAbility,
    script: Script,
}

fn spawn_enemy(world: &mut WorldHandle, at: Vec3) -> EntityRef {
    let root = world.spawn(Pose::from_translation(at));
    let chest = world.spawn_child(root, Pose::from_translation(Vec3::Y));
    world
        .set_collider(chest, 0.6, 1)
        .register_entity_root(root, Some(chest))
        .add_tag(root, "enemy")
        .add_health(root);
    root
}

fn spawn_caster(world: &mut WorldHandle, at: Vec3, facing: Quat) -> (EntityRef, EntityRef) {
    let body = world.spawn(Pose::from_translation(at).with_rotation(facing));
    world.add_rigid_body(body, Vec3::new(0.0, 0.0, 3.0));
    let camera = world.spawn_child(body, Pose::from_translation(Vec3::Y));
    (body, camera)
}

fn build_scene(world: &mut WorldHandle, config: &BlinkLockConfig) -> Vec<Actor> {
    spawn_enemy(world, Vec3::new(0.0, 0.0, 14.0));
    let barrel = world.spawn(Pose::from_translation(Vec3::new(-12.0, 1.0, 0.0)));
    world
        .set_collider(barrel, 0.5, 1)
        .register_entity_root(barrel, None)
        .add_tag(barrel, "enemy")
        .add_hazard(barrel, 4.0);
    spawn_enemy(world, Vec3::new(-14.0, 0.0, 1.5));

    let (runner, runner_camera) = spawn_caster(world, Vec3::ZERO, Quat::IDENTITY);
    let (hunter, hunter_camera) = spawn_caster(
        world,
        Vec3::ZERO,
        Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2),
    );

    let mut hunter_config = config.clone();
    hunter_config.blink.kill_on_blink = true;

    vec![
        Actor {
            name: "runner",
            ability: BlinkLockAbility::new(config.clone(), runner, Some(runner_camera)),
            script: Script {
                press_at: 10,
                release_at: 150,
                blink_at: Some(90),
            },
        },
        Actor {
            name: "hunter",
            ability: BlinkLockAbility::new(hunter_config, hunter, Some(hunter_camera)),
            script: Script {
                press_at: 40,
                release_at: 120,
                blink_at: None,
            },
        },
    ]
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => BlinkLockConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BlinkLockConfig::default(),
    };

    let mut world = WorldHandle::default();
    let mut clock = SimulationClock::new(FIXED_STEP);
    let mut actors = build_scene(&mut world, &config);
    for actor in &mut actors {
        let name = actor.name;
        actor
            .ability
            .subscribe(move |event| info!("[{name}] {event:?}"));
        info!(
            "[{name}] aiming at {:?}",
            actor.ability.probe_aimed_target(&world)
        );
    }

    let mut registry = SlowMotionRegistry::global();
    for tick in 0..args.ticks {
        let frame = clock.advance(FRAME_SECONDS);
        registry.advance(&mut clock, frame.unscaled_delta);
        for actor in &mut actors {
            let input = actor.script.input(tick);
            actor
                .ability
                .tick(&mut world, &mut clock, &mut registry, frame, &input);
        }
    }

    for actor in &mut actors {
        actor.ability.shutdown(&mut clock, &mut registry);
        let position = world
            .pose(actor.ability.caster())
            .map(|pose| pose.translation)
            .context("caster vanished from the scene")?;
        info!("[{}] finished at {position:?}", actor.name);
    }
    for elimination in world.eliminations() {
        info!(
            "{} eliminated via {:?} at {:?}",
            elimination.target, elimination.method, elimination.at
        );
    }
    info!("final time scale {:.2}", clock.time_scale());
    Ok(())
}
