//! Time subsystem.
//!
//! `FrameClock` yields one `FrameTime` per presented frame. The renderer uses
//! `elapsed` to animate transforms and `dt` for frame pacing logs.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
