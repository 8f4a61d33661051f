use anyhow::Result;
use winit::window::Window;

use crate::coords::{Vec2, Viewport};
use crate::device::{Gpu, SurfaceErrorAction};
use crate::time::FrameTime;

use super::app::AppControl;

/// What `App::tick` gets for one frame.
///
/// `'a` is the callback, `'w` the window borrow carried by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
    /// Cursor in surface pixels, Y-up. `None` while outside the window.
    pub pointer: Option<Vec2>,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.gpu.viewport()
    }

    /// Acquires the next surface image, runs `draw` against it, and presents.
    ///
    /// `draw` must submit all of its work before returning. Surface errors
    /// are recovered where possible; a draw error or a fatal surface error
    /// ends the app.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&wgpu::TextureView, Viewport) -> Result<()>,
    {
        let viewport = self.gpu.viewport();
        if !viewport.is_valid() {
            return AppControl::Continue;
        }

        let frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        if let Err(e) = draw(&frame.view, viewport) {
            log::error!("frame {} failed: {e:#}", self.time.frame_index);
            return AppControl::Exit;
        }

        self.window.pre_present_notify();
        self.gpu.present(frame);
        AppControl::Continue
    }
}
