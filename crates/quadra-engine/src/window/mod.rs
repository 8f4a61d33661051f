//! Window + event loop.
//!
//! Owns the `winit` event loop and one window, and calls `App::tick` on
//! every redraw.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
