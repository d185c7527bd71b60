use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;

use anyhow::Result;
use winit::dpi::PhysicalSize;

use crate::arbiter::{ArbiterClient, ContextArbiter, Outbox};
use crate::core::{FrameCtx, Renderer};
use crate::device::{ContextBridge, Platform, Strategies, SwapOutcome};
use crate::time::FrameClock;

use super::shared::Shared;
use super::state::{RenderState, Task};

/// What a render thread hands back once it has torn everything down.
pub(crate) struct Parts<P: Platform> {
    pub(crate) platform: P,
    pub(crate) renderer: Box<dyn Renderer<P>>,
}

/// Work decided under the lock and carried out after dropping it.
enum Next {
    Task(Task),
    Flush,
    Draw,
}

/// Thread-local bookkeeping that never needs the lock.
struct Pending<W> {
    create_context: bool,
    create_surface: bool,
    size_changed: bool,
    size: PhysicalSize<u32>,
    window: Option<W>,
    lost_context: bool,
    want_render_notification: bool,
    do_render_notification: bool,
}

impl<W> Pending<W> {
    fn new() -> Self {
        Self {
            create_context: false,
            create_surface: false,
            size_changed: false,
            size: PhysicalSize::new(0, 0),
            window: None,
            lost_context: false,
            want_render_notification: false,
            do_render_notification: false,
        }
    }
}

/// The body of one render thread.
pub(crate) struct RenderLoop<P: Platform> {
    shared: Arc<Shared<P>>,
    /// Strategies of the owning view; a dead reference means the view is gone.
    host: Weak<Strategies<P>>,
    bridge: ContextBridge<P>,
    renderer: Box<dyn Renderer<P>>,
    arbiter: Arc<ContextArbiter>,
    client: ArbiterClient,
    outbox: Outbox,
    clock: FrameClock,
}

impl<P: Platform> RenderLoop<P> {
    pub(crate) fn new(
        shared: Arc<Shared<P>>,
        host: Weak<Strategies<P>>,
        platform: P,
        renderer: Box<dyn Renderer<P>>,
        arbiter: Arc<ContextArbiter>,
        client: ArbiterClient,
    ) -> Self {
        Self {
            shared,
            host,
            bridge: ContextBridge::new(platform),
            renderer,
            arbiter,
            client,
            outbox: Outbox::new(),
            clock: FrameClock::new(),
        }
    }

    fn id(&self) -> u64 {
        self.client.id().get()
    }

    fn owner_alive(&self) -> bool {
        self.host.strong_count() > 0
    }

    /// Runs until exit is requested, the owner goes away, or a fatal error occurs.
    ///
    /// Whatever ends the loop, the surface, context and display are torn down, the
    /// arbiter is released and `exited` is published before returning. A renderer panic
    /// is re-raised after that cleanup.
    pub(crate) fn run(mut self) -> Parts<P> {
        self.shared.state.lock().render_thread = Some(thread::current().id());
        log::info!("render thread {} started", self.id());

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.guarded_run()));
        let (result, panicked) = match outcome {
            Ok(result) => (result, None),
            Err(payload) => (Err(anyhow::anyhow!("render thread panicked")), Some(payload)),
        };

        let shared = Arc::clone(&self.shared);
        {
            let mut st = shared.state.lock();
            self.stop_context(&mut st);
            self.bridge.terminate();
            self.arbiter.release(&self.client, &mut self.outbox);

            if let Err(err) = result {
                log::error!("render thread {} terminated: {err:#}", self.id());
                st.exit_error = Some(err);
            }
            st.exited = true;
            shared.cond.notify_all();
        }
        self.outbox.deliver();

        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }

        log::info!(
            "render thread {} exited after {} frames",
            self.id(),
            self.clock.frame_count()
        );
        Parts {
            platform: self.bridge.into_platform(),
            renderer: self.renderer,
        }
    }

    fn guarded_run(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let mut pending = Pending::new();

        loop {
            let next = {
                let mut st = shared.state.lock();
                loop {
                    if st.should_exit {
                        return Ok(());
                    }

                    if let Some(task) = st.event_queue.pop_front() {
                        break Next::Task(task);
                    }

                    // Pause edge.
                    let mut pausing = false;
                    if st.paused != st.requested_pause {
                        pausing = st.requested_pause;
                        st.paused = st.requested_pause;
                        shared.cond.notify_all();
                        if pausing {
                            log::debug!("render thread {} paused", self.id());
                        } else {
                            log::debug!("render thread {} resumed", self.id());
                            self.clock.reset();
                        }
                    }

                    let mut released_on_request = false;
                    if st.should_release_context {
                        log::debug!("render thread {} releasing context on request", self.id());
                        self.stop_context(&mut st);
                        st.should_release_context = false;
                        released_on_request = true;
                    }

                    if pending.lost_context {
                        self.stop_context(&mut st);
                        pending.lost_context = false;
                    }

                    if pausing {
                        self.stop_surface(&mut st);
                        if !st.preserve_context_on_pause || self.arbiter.should_release_on_pause() {
                            self.stop_context(&mut st);
                        }
                        if self.arbiter.should_terminate_on_pause() {
                            self.stop_context(&mut st);
                            if self.bridge.has_display() {
                                self.bridge.terminate();
                            }
                        }
                        if !st.has_context {
                            self.arbiter.release(&self.client, &mut self.outbox);
                        }
                    }

                    // Surface availability edges.
                    if !st.has_surface && !st.waiting_for_surface {
                        self.stop_surface(&mut st);
                        if !st.has_context {
                            self.arbiter.release(&self.client, &mut self.outbox);
                        }
                        st.waiting_for_surface = true;
                        st.surface_is_bad = false;
                        shared.cond.notify_all();
                    }
                    if st.has_surface && st.waiting_for_surface {
                        st.waiting_for_surface = false;
                        shared.cond.notify_all();
                    }

                    if pending.do_render_notification {
                        pending.want_render_notification = false;
                        pending.do_render_notification = false;
                        st.render_complete = true;
                        shared.cond.notify_all();
                    }

                    if st.can_render() {
                        // Only contend for the context when there is a frame to draw.
                        if !st.has_context && st.wants_frame() {
                            if released_on_request && self.arbiter.should_yield(&self.client) {
                                self.arbiter.wait_for_release(&self.client);
                            } else if self.arbiter.try_acquire(&self.client, &mut self.outbox) {
                                let Some(host) = self.host.upgrade() else {
                                    log::debug!("render thread {}: owner dropped", self.id());
                                    return Ok(());
                                };
                                if let Err(err) = self.bridge.start(&host) {
                                    self.arbiter.release(&self.client, &mut self.outbox);
                                    return Err(err);
                                }
                                st.has_context = true;
                                pending.create_context = true;
                                shared.cond.notify_all();
                            }
                        }

                        if st.has_context && !st.has_drawable_surface {
                            st.has_drawable_surface = true;
                            pending.create_surface = true;
                            pending.size_changed = true;
                        }

                        if st.has_drawable_surface {
                            if st.size_changed {
                                st.size_changed = false;
                                pending.create_surface = true;
                                pending.size_changed = true;
                                pending.want_render_notification = true;
                            }

                            if st.wants_frame() {
                                st.render_requested = false;
                                if st.want_render_notification {
                                    st.want_render_notification = false;
                                    pending.want_render_notification = true;
                                }
                                pending.size = st.size;
                                if pending.create_surface {
                                    pending.window = st.window.clone();
                                }
                                shared.cond.notify_all();
                                break Next::Draw;
                            }
                        }
                    }

                    if !self.outbox.is_empty() {
                        break Next::Flush;
                    }

                    shared.cond.wait(&mut st);
                }
            };

            match next {
                Next::Task(task) => {
                    task();
                    continue;
                }
                Next::Flush => {
                    self.outbox.deliver();
                    continue;
                }
                Next::Draw => {}
            }

            // Signals queued while deciding to draw go out before any slow work.
            self.outbox.deliver();

            if pending.create_surface {
                let Some(host) = self.host.upgrade() else {
                    return Ok(());
                };
                let created = match pending.window.take() {
                    Some(window) => self.bridge.create_surface(&host, &window, pending.size),
                    None => Err(anyhow::anyhow!("surface reported available without a window")),
                };
                if let Err(err) = created {
                    log::warn!("render thread {}: {err:#}", self.id());
                    let mut st = shared.state.lock();
                    st.surface_is_bad = true;
                    st.has_drawable_surface = false;
                    shared.cond.notify_all();
                    continue;
                }
                pending.create_surface = false;
            }

            if pending.create_context {
                if let Some(driver) = self.bridge.driver_string() {
                    self.arbiter.probe_capability(&driver);
                }
                if !self.owner_alive() {
                    return Ok(());
                }
                if let (Some(context), Some(config)) = (self.bridge.context(), self.bridge.config()) {
                    self.renderer.on_context_created(context, config);
                }
                pending.create_context = false;
            }

            if pending.size_changed {
                if !self.owner_alive() {
                    return Ok(());
                }
                if let Some(context) = self.bridge.context() {
                    self.renderer
                        .on_surface_changed(context, pending.size.width, pending.size.height);
                }
                pending.size_changed = false;
            }

            if !self.owner_alive() {
                return Ok(());
            }

            let outcome = match self.bridge.begin_frame() {
                Ok(mut frame) => {
                    if let Some(context) = self.bridge.context() {
                        let time = self.clock.tick();
                        self.renderer
                            .on_draw_frame(&mut FrameCtx::new(context, &mut frame, time));
                    }
                    self.bridge.present(frame)
                }
                Err(outcome) => outcome,
            };

            match outcome {
                SwapOutcome::Success | SwapOutcome::Skipped => {}
                SwapOutcome::ContextLost => {
                    log::warn!("render thread {}: graphics context lost", self.id());
                    pending.lost_context = true;
                }
                SwapOutcome::SurfaceBad => {
                    log::warn!("render thread {}: drawable surface is unusable", self.id());
                    let mut st = shared.state.lock();
                    st.surface_is_bad = true;
                    shared.cond.notify_all();
                }
            }

            if pending.want_render_notification {
                pending.do_render_notification = true;
            }
        }
    }

    fn stop_surface(&mut self, st: &mut RenderState<P>) {
        if st.has_drawable_surface {
            st.has_drawable_surface = false;
            self.bridge.destroy_surface();
        }
    }

    /// Surface first, then the context, then lets the arbiter hand it on.
    fn stop_context(&mut self, st: &mut RenderState<P>) {
        self.stop_surface(st);
        if st.has_context {
            self.bridge.destroy_context();
            st.has_context = false;
            self.arbiter.release(&self.client, &mut self.outbox);
        }
    }
}
