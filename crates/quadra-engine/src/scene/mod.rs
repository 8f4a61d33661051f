//! Producer-side shapes: positioned rectangles that submit themselves as quads.

mod path;
mod shape;

pub use path::BezierPath;
pub use shape::Shape;
