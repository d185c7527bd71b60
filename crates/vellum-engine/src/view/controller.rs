use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use parking_lot::MutexGuard;
use winit::dpi::PhysicalSize;

use crate::arbiter::ContextArbiter;
use crate::core::Renderer;
use crate::device::{ConfigChooser, ContextFactory, Platform, Strategies, SurfaceFactory};
use crate::thread::{self, Parts, RenderMode, RenderState, Shared, ViewStatus};

use super::builder::ViewConfig;

/// Locks the view state for a mutating call.
///
/// Returns `None` once the render thread has exited; calling after an explicit exit
/// request is a caller bug.
fn lock_live<'a, P: Platform>(
    shared: &'a Shared<P>,
    op: &str,
) -> Option<MutexGuard<'a, RenderState<P>>> {
    let st = shared.state.lock();
    if st.exited {
        debug_assert!(!st.should_exit, "{op} called after the render thread was asked to exit");
        log::debug!("{op} ignored: render thread has exited");
        return None;
    }
    Some(st)
}

/// Cloneable, non-blocking access to a view, usable from any thread (the renderer included).
pub struct ViewHandle<P: Platform> {
    shared: Arc<Shared<P>>,
}

impl<P: Platform> Clone for ViewHandle<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: Platform> ViewHandle<P> {
    /// Asks for one frame. Requests made before the next draw coalesce into it.
    pub fn request_render(&self) {
        let Some(mut st) = lock_live(&self.shared, "request_render") else {
            return;
        };
        st.render_requested = true;
        self.shared.cond.notify_all();
    }

    /// Queues `task` to run on the render thread before its next frame. Tasks run in order.
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(mut st) = lock_live(&self.shared, "post_task") else {
            return;
        };
        st.event_queue.push_back(Box::new(task));
        self.shared.cond.notify_all();
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        let Some(mut st) = lock_live(&self.shared, "set_render_mode") else {
            return;
        };
        st.render_mode = mode;
        self.shared.cond.notify_all();
    }

    pub fn render_mode(&self) -> RenderMode {
        self.shared.state.lock().render_mode
    }

    pub fn status(&self) -> ViewStatus {
        self.shared.state.lock().status()
    }
}

enum Attachment<P: Platform> {
    Running(JoinHandle<Parts<P>>),
    Detached(Parts<P>),
    /// The render thread panicked and took the renderer with it.
    Lost,
}

/// Owning-thread side of one view: drives its render thread through the surface
/// lifecycle and blocks until the thread has acted on each change.
///
/// Dropping the view stops the render thread and waits for it.
pub struct GlView<P: Platform> {
    handle: ViewHandle<P>,
    strategies: Arc<Strategies<P>>,
    arbiter: Arc<ContextArbiter>,
    config: ViewConfig,
    attachment: Attachment<P>,
}

impl<P: Platform> GlView<P> {
    /// Starts a view with the platform's default strategies and the global arbiter.
    pub fn new<R: Renderer<P>>(platform: P, renderer: R) -> Result<Self> {
        super::ViewBuilder::new(platform).spawn(renderer)
    }

    pub(super) fn start(
        platform: P,
        renderer: Box<dyn Renderer<P>>,
        strategies: Strategies<P>,
        arbiter: Arc<ContextArbiter>,
        config: ViewConfig,
    ) -> Result<Self> {
        let shared = Arc::new(Shared::new(RenderState::new(
            config.render_mode,
            config.preserve_context_on_pause,
        )));
        let strategies = Arc::new(strategies);

        let join = thread::spawn(
            &config.thread_name,
            Arc::clone(&shared),
            Arc::downgrade(&strategies),
            platform,
            renderer,
            Arc::clone(&arbiter),
        )?;

        Ok(Self {
            handle: ViewHandle { shared },
            strategies,
            arbiter,
            config,
            attachment: Attachment::Running(join),
        })
    }

    fn shared(&self) -> &Shared<P> {
        &self.handle.shared
    }

    pub fn handle(&self) -> ViewHandle<P> {
        self.handle.clone()
    }

    pub fn arbiter(&self) -> &Arc<ContextArbiter> {
        &self.arbiter
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// A native surface for `window` became available. Returns once the render thread
    /// has stopped waiting for it.
    pub fn surface_created(&self, window: P::Window) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "surface_created") else {
            return;
        };

        st.window = Some(window);
        st.has_surface = true;
        if st.surface_is_bad {
            // Re-signalled availability retries a surface that failed.
            st.surface_is_bad = false;
            st.size_changed = true;
        }
        shared.cond.notify_all();

        while st.waiting_for_surface && !st.exited {
            shared.cond.wait(&mut st);
        }
    }

    /// The native surface is going away. Returns only after the render thread has
    /// destroyed its drawable surface, so the caller may tear the window down.
    pub fn surface_destroyed(&self) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "surface_destroyed") else {
            return;
        };

        st.has_surface = false;
        shared.cond.notify_all();

        while !st.waiting_for_surface && !st.exited {
            shared.cond.wait(&mut st);
        }
        st.window = None;
    }

    /// The surface was resized. Waits for the frame drawn at the new size unless
    /// nothing can be drawn (paused, no surface, zero size) or the caller is the render
    /// thread itself.
    pub fn size_changed(&self, width: u32, height: u32) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "size_changed") else {
            return;
        };

        st.size = PhysicalSize::new(width, height);
        st.size_changed = true;
        st.render_requested = true;
        st.render_complete = false;
        shared.cond.notify_all();

        if st.on_render_thread() {
            return;
        }

        while !st.exited && !st.paused && !st.render_complete && st.can_render() {
            shared.cond.wait(&mut st);
        }
    }

    /// Blocks until the render thread has paused and released what the pause policy says.
    pub fn pause(&self) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "pause") else {
            return;
        };

        st.requested_pause = true;
        shared.cond.notify_all();

        while !st.exited && !st.paused {
            shared.cond.wait(&mut st);
        }
    }

    pub fn resume(&self) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "resume") else {
            return;
        };

        st.requested_pause = false;
        st.render_requested = true;
        st.render_complete = false;
        shared.cond.notify_all();

        while !st.exited && st.paused && !st.render_complete {
            shared.cond.wait(&mut st);
        }
    }

    /// Stops the render thread and waits until it has released its surface, context
    /// and display. Idempotent.
    ///
    /// # Panics
    ///
    /// When called from the render thread.
    pub fn request_exit_and_wait(&self) {
        let shared = self.shared();
        let mut st = shared.state.lock();
        assert!(
            !st.on_render_thread(),
            "request_exit_and_wait called from the render thread"
        );

        st.should_exit = true;
        shared.cond.notify_all();

        while !st.exited {
            shared.cond.wait(&mut st);
        }
    }

    pub fn request_render(&self) {
        self.handle.request_render();
    }

    /// Requests a frame and waits until it has been drawn, or until drawing becomes
    /// impossible.
    pub fn request_render_and_wait(&self) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "request_render_and_wait") else {
            return;
        };

        st.want_render_notification = true;
        st.render_requested = true;
        st.render_complete = false;
        shared.cond.notify_all();

        if st.on_render_thread() {
            return;
        }

        while !st.exited && !st.paused && !st.render_complete && st.can_render() {
            shared.cond.wait(&mut st);
        }
    }

    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.post_task(task);
    }

    /// Makes the render thread drop its surface and context on its next iteration.
    /// They are re-created lazily. Does not wait.
    pub fn request_release_context(&self) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "request_release_context") else {
            return;
        };
        st.should_release_context = true;
        shared.cond.notify_all();
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        self.handle.set_render_mode(mode);
    }

    pub fn render_mode(&self) -> RenderMode {
        self.handle.render_mode()
    }

    /// Takes effect at the next pause.
    pub fn set_preserve_context_on_pause(&self, preserve: bool) {
        let shared = self.shared();
        let Some(mut st) = lock_live(shared, "set_preserve_context_on_pause") else {
            return;
        };
        st.preserve_context_on_pause = preserve;
    }

    pub fn preserve_context_on_pause(&self) -> bool {
        self.shared().state.lock().preserve_context_on_pause
    }

    pub fn status(&self) -> ViewStatus {
        self.handle.status()
    }

    /// The error that ended the render thread, if it died rather than being stopped.
    pub fn take_exit_error(&self) -> Option<anyhow::Error> {
        self.shared().state.lock().exit_error.take()
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.attachment, Attachment::Running(_))
    }

    /// Stops the render thread and keeps the renderer for a later [`GlView::attach`].
    pub fn detach(&mut self) -> Result<()> {
        let Attachment::Running(_) = self.attachment else {
            return Ok(());
        };

        self.request_exit_and_wait();

        let Attachment::Running(join) = std::mem::replace(&mut self.attachment, Attachment::Lost)
        else {
            return Ok(());
        };

        match join.join() {
            Ok(parts) => {
                self.attachment = Attachment::Detached(parts);
                log::debug!("view detached");
                Ok(())
            }
            Err(_) => anyhow::bail!("render thread panicked; renderer is lost"),
        }
    }

    /// Starts a fresh render thread with the renderer kept by [`GlView::detach`].
    ///
    /// The new thread starts without a surface; call [`GlView::surface_created`] and
    /// [`GlView::size_changed`] again.
    pub fn attach(&mut self) -> Result<()> {
        let parts = match std::mem::replace(&mut self.attachment, Attachment::Lost) {
            Attachment::Detached(parts) => parts,
            Attachment::Running(join) => {
                self.attachment = Attachment::Running(join);
                return Ok(());
            }
            Attachment::Lost => anyhow::bail!("cannot attach: renderer was lost"),
        };

        {
            let mut st = self.shared().state.lock();
            let render_mode = st.render_mode;
            let preserve = st.preserve_context_on_pause;
            *st = RenderState::new(render_mode, preserve);
        }

        let join = thread::spawn(
            &self.config.thread_name,
            Arc::clone(&self.handle.shared),
            Arc::downgrade(&self.strategies),
            parts.platform,
            parts.renderer,
            Arc::clone(&self.arbiter),
        )
        .context("failed to re-attach view")?;

        self.attachment = Attachment::Running(join);
        log::debug!("view attached");
        Ok(())
    }

    fn ensure_detached(&self, what: &str) -> Result<()> {
        anyhow::ensure!(
            !self.is_attached(),
            "{what} can only be changed while no render thread is attached"
        );
        Ok(())
    }

    pub fn set_config_chooser(&mut self, chooser: Arc<dyn ConfigChooser<P>>) -> Result<()> {
        self.ensure_detached("config chooser")?;
        let mut strategies = (*self.strategies).clone();
        strategies.config_chooser = chooser;
        self.strategies = Arc::new(strategies);
        Ok(())
    }

    pub fn set_context_factory(&mut self, factory: Arc<dyn ContextFactory<P>>) -> Result<()> {
        self.ensure_detached("context factory")?;
        let mut strategies = (*self.strategies).clone();
        strategies.context_factory = factory;
        self.strategies = Arc::new(strategies);
        Ok(())
    }

    pub fn set_surface_factory(&mut self, factory: Arc<dyn SurfaceFactory<P>>) -> Result<()> {
        self.ensure_detached("surface factory")?;
        let mut strategies = (*self.strategies).clone();
        strategies.surface_factory = factory;
        self.strategies = Arc::new(strategies);
        Ok(())
    }
}

impl<P: Platform> Drop for GlView<P> {
    fn drop(&mut self) {
        let Attachment::Running(_) = self.attachment else {
            return;
        };

        self.request_exit_and_wait();
        if let Attachment::Running(join) = std::mem::replace(&mut self.attachment, Attachment::Lost) {
            if join.join().is_err() {
                log::error!("render thread panicked");
            }
        }
    }
}
