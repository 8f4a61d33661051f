use crate::coords::{Rect, Vec2};
use crate::gfx::{BatchRenderer, Quad, RenderBackend, TextureId};
use crate::paint::Color;

/// A rectangle the app moves around and submits once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Bottom-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub color: Color,
    pub texture: Option<TextureId>,
    grabbed: bool,
}

impl Shape {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            color: Color::WHITE,
            texture: None,
            grabbed: false,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    /// Half-open hit test in the same Y-up space as `position`.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        self.bounds().contains(point)
    }

    #[inline]
    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn set_grabbed(&mut self, grabbed: bool) {
        self.grabbed = grabbed;
    }

    /// Steps each axis toward `dest` by at most `step`. Returns `true` once there.
    pub fn move_towards(&mut self, dest: Vec2, step: f32) -> bool {
        let step = step.max(0.0);
        self.position.x = approach(self.position.x, dest.x, step);
        self.position.y = approach(self.position.y, dest.y, step);
        self.position == dest
    }

    pub fn quad(&self) -> Quad {
        Quad {
            position: self.position,
            size: self.size,
            color: self.color,
            texture: self.texture,
        }
    }

    pub fn submit<B: RenderBackend>(&self, renderer: &mut BatchRenderer<B>) {
        renderer.submit(self.quad());
    }
}

fn approach(from: f32, to: f32, step: f32) -> f32 {
    let delta = to - from;
    if delta.abs() <= step {
        to
    } else {
        from + step * delta.signum()
    }
}
