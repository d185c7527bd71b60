use crate::device::Platform;
use crate::time::FrameTime;

/// Per-frame context passed to [`Renderer::on_draw_frame`](super::Renderer::on_draw_frame).
pub struct FrameCtx<'a, P: Platform> {
    pub context: &'a P::Context,
    pub frame: &'a mut P::Frame,
    pub time: FrameTime,
}

impl<'a, P: Platform> FrameCtx<'a, P> {
    pub fn new(context: &'a P::Context, frame: &'a mut P::Frame, time: FrameTime) -> Self {
        Self {
            context,
            frame,
            time,
        }
    }
}
