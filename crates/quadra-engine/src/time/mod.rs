//! Frame timing.
//!
//! The runtime keeps one [`FrameClock`] and hands each `App::tick` the
//! [`FrameTime`] it produced. Animation code should step by `dt`, never by
//! frame count.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
