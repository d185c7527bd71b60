use std::collections::VecDeque;
use std::thread::{self, ThreadId};

use winit::dpi::PhysicalSize;

use crate::device::Platform;

/// Whether frames are produced continuously or only when requested.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RenderMode {
    /// Draw only after `request_render` (or a resize/resume).
    OnDemand,
    /// Draw as fast as presentation allows.
    #[default]
    Continuous,
}

/// Work posted by the owning thread, run on the render thread between frames.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Coarse lifecycle phase derived from the state flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderPhase {
    Idle,
    AcquiringContext,
    HasContextNoSurface,
    Ready,
    WaitingForSurface,
    Paused,
    Exited,
}

/// Snapshot of a view's render state, taken under its lock.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ViewStatus {
    pub has_surface: bool,
    pub surface_is_bad: bool,
    pub waiting_for_surface: bool,
    pub has_context: bool,
    pub has_drawable_surface: bool,
    pub paused: bool,
    pub render_mode: RenderMode,
    pub size: PhysicalSize<u32>,
    pub exited: bool,
}

impl ViewStatus {
    pub fn phase(&self) -> RenderPhase {
        let can_render = !self.paused
            && self.has_surface
            && !self.surface_is_bad
            && self.size.width > 0
            && self.size.height > 0;

        if self.exited {
            RenderPhase::Exited
        } else if self.paused {
            RenderPhase::Paused
        } else if self.waiting_for_surface {
            RenderPhase::WaitingForSurface
        } else if self.has_context && self.has_drawable_surface && can_render {
            RenderPhase::Ready
        } else if self.has_context {
            RenderPhase::HasContextNoSurface
        } else if can_render {
            RenderPhase::AcquiringContext
        } else {
            RenderPhase::Idle
        }
    }
}

/// State shared between the owning thread and the render thread.
///
/// Only ever read or written while holding the view's lock.
pub(crate) struct RenderState<P: Platform> {
    pub(crate) has_surface: bool,
    pub(crate) surface_is_bad: bool,
    pub(crate) waiting_for_surface: bool,
    pub(crate) has_context: bool,
    pub(crate) has_drawable_surface: bool,
    pub(crate) should_release_context: bool,
    pub(crate) paused: bool,
    pub(crate) requested_pause: bool,
    pub(crate) preserve_context_on_pause: bool,
    pub(crate) render_mode: RenderMode,
    pub(crate) render_requested: bool,
    pub(crate) render_complete: bool,
    /// Set by `request_render_and_wait`; handed to the next drawn frame.
    pub(crate) want_render_notification: bool,
    pub(crate) size: PhysicalSize<u32>,
    pub(crate) size_changed: bool,
    pub(crate) should_exit: bool,
    pub(crate) exited: bool,
    pub(crate) window: Option<P::Window>,
    pub(crate) event_queue: VecDeque<Task>,
    pub(crate) exit_error: Option<anyhow::Error>,
    pub(crate) render_thread: Option<ThreadId>,
}

impl<P: Platform> RenderState<P> {
    pub(crate) fn new(render_mode: RenderMode, preserve_context_on_pause: bool) -> Self {
        Self {
            has_surface: false,
            surface_is_bad: false,
            waiting_for_surface: false,
            has_context: false,
            has_drawable_surface: false,
            should_release_context: false,
            paused: false,
            requested_pause: false,
            preserve_context_on_pause,
            render_mode,
            render_requested: true,
            render_complete: false,
            want_render_notification: false,
            size: PhysicalSize::new(0, 0),
            size_changed: true,
            should_exit: false,
            exited: false,
            window: None,
            event_queue: VecDeque::new(),
            exit_error: None,
            render_thread: None,
        }
    }

    /// Draw prerequisites that do not depend on the render thread's own resources
    /// or on whether a frame was asked for.
    pub(crate) fn can_render(&self) -> bool {
        !self.paused
            && self.has_surface
            && !self.surface_is_bad
            && self.size.width > 0
            && self.size.height > 0
    }

    pub(crate) fn wants_frame(&self) -> bool {
        self.render_requested || self.render_mode == RenderMode::Continuous
    }

    pub(crate) fn on_render_thread(&self) -> bool {
        self.render_thread == Some(thread::current().id())
    }

    pub(crate) fn status(&self) -> ViewStatus {
        ViewStatus {
            has_surface: self.has_surface,
            surface_is_bad: self.surface_is_bad,
            waiting_for_surface: self.waiting_for_surface,
            has_context: self.has_context,
            has_drawable_surface: self.has_drawable_surface,
            paused: self.paused,
            render_mode: self.render_mode,
            size: self.size,
            exited: self.exited,
        }
    }
}
