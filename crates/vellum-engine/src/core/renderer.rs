use crate::device::Platform;

use super::ctx::FrameCtx;

/// Renderer callback set implemented by the embedding view.
///
/// Calls arrive on the render thread in the order
/// `on_context_created` -> `on_surface_changed` -> zero or more `on_draw_frame`,
/// with `on_surface_changed` repeated whenever the drawable size changes. After a
/// context loss or a release on pause the sequence starts over.
pub trait Renderer<P: Platform>: Send + 'static {
    /// A fresh context exists. Every GPU resource from an earlier context is gone.
    fn on_context_created(&mut self, context: &P::Context, config: &P::Config);

    /// The drawable surface was (re)created with the given size in physical pixels.
    fn on_surface_changed(&mut self, context: &P::Context, width: u32, height: u32);

    /// Draws one frame. The frame is presented after this returns.
    fn on_draw_frame(&mut self, frame: &mut FrameCtx<'_, P>);
}

impl<P: Platform> Renderer<P> for Box<dyn Renderer<P>> {
    fn on_context_created(&mut self, context: &P::Context, config: &P::Config) {
        (**self).on_context_created(context, config);
    }

    fn on_surface_changed(&mut self, context: &P::Context, width: u32, height: u32) {
        (**self).on_surface_changed(context, width, height);
    }

    fn on_draw_frame(&mut self, frame: &mut FrameCtx<'_, P>) {
        (**self).on_draw_frame(frame);
    }
}
