//! Color model for quad submissions.

mod color;

pub use color::Color;
