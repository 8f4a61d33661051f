//! Coordinate and geometry types shared by the batch renderer and producers.
//!
//! Canonical CPU space:
//! - Surface pixels
//! - Origin bottom-left
//! - +X right, +Y up
//!
//! The batch renderer maps this space to clip space with an orthographic
//! projection built from the current viewport (see [`Viewport::projection`]).

mod bezier;
mod mat4;
mod rect;
mod vec2;
mod viewport;

pub use bezier::quadratic_bezier;
pub use mat4::Mat4;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
