//! Quadra engine crate.
//!
//! A quad batch renderer on wgpu plus the window, device and timing pieces
//! an application needs to drive it once per frame.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod gfx;
pub mod paint;
pub mod scene;
