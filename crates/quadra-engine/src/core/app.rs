use winit::event::WindowEvent;

use super::ctx::FrameCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Implemented by the application; driven by `window::Runtime`.
pub trait App {
    /// Raw window events, before the runtime handles resize and close.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw. Update state and render here.
    fn tick(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
