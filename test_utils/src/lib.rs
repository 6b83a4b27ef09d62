//! Utility helpers for tests.
pub mod events;
pub mod notices;
pub mod scene;

pub use events::EventLog;
pub use notices::{install_notice_observer, CapturedNotices};
pub use scene::{at_angle, Arena, ENEMY_TAG};
