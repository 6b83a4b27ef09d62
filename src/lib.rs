//! Lock-on and blink ability.
//!
//! A caster aims its camera at a target, holds the lock until it is ready,
//! then teleports next to the target. Time slows down while a lock charges,
//! and any number of casters may share that slow motion safely.
//!
//! The world is reached only through the traits in [`world`]; [`WorldHandle`]
//! is an in-memory implementation used by the demo, the Bevy plugin, and the
//! tests.
pub mod ability;
pub mod blink;
pub mod clock;
pub mod config;
pub mod constants;
pub mod entity;
pub mod events;
pub mod input;
pub mod logging;
pub mod plugin;
pub mod slow_motion;
pub mod targeting;
pub mod vector_math;
pub mod world;
pub mod world_handle;
pub use constants::*;

// Re-export commonly used items
pub use ability::{BlinkLockAbility, LockSession, LockState};
pub use blink::{BlinkError, BlinkResult, BlinkSettings, OffsetSpace};
pub use clock::{AbilityClock, FrameTime, SimulationClock};
pub use config::{BlinkLockConfig, ConfigError, RadiusRamp, TargetingSettings};
pub use entity::{EntityRef, Hit, LayerMask, Pose, TargetCandidate};
pub use events::{CancelReason, LockEvent, LockEvents, SubscriptionId};
pub use input::{LockInput, LockStartMode};
pub use logging::init as init_logging;
pub use plugin::{BlinkLockCaster, BlinkLockNotice, BlinkLockPlugin};
pub use slow_motion::{SlowMotionRegistry, SlowMotionSettings, SlowMotionToken, TimeScaleHost};
pub use world::{
    BlinkWorld, EntityRegistry, KillCapability, QueryService, TargetServices, TransformGraph,
};
pub use world_handle::WorldHandle;

pub mod prelude {
    //! Prelude exports used in documentation examples.
    //!
    //! ```rust,no_run
    //! use blink_lock::prelude::*;
    //! ```

    pub use crate::BlinkLockAbility;
    pub use crate::BlinkLockConfig;
    pub use crate::BlinkLockPlugin;
    pub use crate::LockEvent;
    pub use crate::LockInput;
    pub use crate::SimulationClock;
    pub use crate::SlowMotionRegistry;
    pub use crate::TimeScaleHost;
    pub use crate::WorldHandle;
    pub use crate::{EntityRef, Pose};
}
