//! Target selection pipeline: acquisition, canonicalization, and stickiness.
//!
//! The three stages always run in that order within a tick. Acquisition and
//! canonicalization are pure; only the stickiness filter carries memory, and
//! that memory belongs to the lock session that owns it.

mod acquisition;
mod canonical;
pub mod stickiness;

pub use acquisition::{acquire, AcquisitionQuery};
pub use canonical::canonicalize;
pub use stickiness::{StickinessMemory, StickinessSettings};
