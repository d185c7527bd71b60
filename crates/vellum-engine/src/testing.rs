//! Deterministic platform and renderer doubles for the lifecycle tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::Mutex;
use winit::dpi::PhysicalSize;

use crate::arbiter::ContextArbiter;
use crate::core::{FrameCtx, Renderer};
use crate::device::{ConfigChooser, ContextFactory, Platform, SurfaceFactory, SwapOutcome};
use crate::view::{GlView, RenderMode, ViewBuilder};

/// Every platform and renderer call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DisplayOpened,
    DisplayClosed,
    ConfigChosen,
    ContextCreated(u32),
    ContextDestroyed(u32),
    SurfaceCreated { window: u32, width: u32, height: u32 },
    SurfaceDestroyed,
    Presented,
    // Renderer callbacks.
    GotContext(u32),
    SurfaceChanged(u32, u32),
    DrawFrame,
}

impl Event {
    pub fn is_draw(&self) -> bool {
        matches!(self, Event::DrawFrame)
    }
}

/// Faults the mock platform will inject.
#[derive(Debug, Default)]
pub struct Script {
    pub fail_context_creation: bool,
    /// Number of upcoming surface creations that fail.
    pub fail_surface_creation: u32,
    /// Results for upcoming presents; `Success` once drained.
    pub swap_outcomes: VecDeque<SwapOutcome>,
    pub driver: Option<String>,
    /// Makes the renderer panic inside its next draw.
    pub panic_on_draw: bool,
}

#[derive(Default)]
struct ProbeInner {
    events: Vec<Event>,
    script: Script,
    next_id: u32,
    live_contexts: usize,
    max_live_contexts: usize,
}

/// Shared recorder; several views may report into one probe.
#[derive(Default)]
pub struct Probe {
    inner: Mutex<ProbeInner>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, event: Event) {
        let mut inner = self.inner.lock();
        match event {
            Event::ContextCreated(_) => {
                inner.live_contexts += 1;
                inner.max_live_contexts = inner.max_live_contexts.max(inner.live_contexts);
            }
            Event::ContextDestroyed(_) => inner.live_contexts -= 1,
            _ => {}
        }
        inner.events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.inner.lock().events.iter().filter(|e| pred(e)).count()
    }

    pub fn draws(&self) -> usize {
        self.count(Event::is_draw)
    }

    pub fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.inner.lock().script);
    }

    pub fn live_contexts(&self) -> usize {
        self.inner.lock().live_contexts
    }

    pub fn max_live_contexts(&self) -> usize {
        self.inner.lock().max_live_contexts
    }

    fn next_id(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        inner.next_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSurface {
    pub window: u32,
    pub size: PhysicalSize<u32>,
}

/// Platform whose handles are plain integers.
pub struct MockPlatform {
    probe: Arc<Probe>,
    frames: u32,
}

impl MockPlatform {
    pub fn new(probe: Arc<Probe>) -> Self {
        Self { probe, frames: 0 }
    }
}

impl Platform for MockPlatform {
    type Display = u32;
    type Config = u32;
    type Context = u32;
    type Surface = MockSurface;
    type Window = u32;
    type Frame = u32;

    fn open_display(&mut self) -> Result<u32> {
        self.probe.record(Event::DisplayOpened);
        Ok(self.probe.next_id())
    }

    fn close_display(&mut self, _display: u32) {
        self.probe.record(Event::DisplayClosed);
    }

    fn driver_string(&self, _config: &u32, _context: &u32) -> String {
        let inner = self.probe.inner.lock();
        inner.script.driver.clone().unwrap_or_else(|| "Mock GPU".to_string())
    }

    fn begin_frame(
        &mut self,
        _context: &u32,
        _surface: &mut MockSurface,
    ) -> std::result::Result<u32, SwapOutcome> {
        self.frames += 1;
        Ok(self.frames)
    }

    fn present(&mut self, _context: &u32, _surface: &mut MockSurface, _frame: u32) -> SwapOutcome {
        self.probe.record(Event::Presented);
        self.probe
            .inner
            .lock()
            .script
            .swap_outcomes
            .pop_front()
            .unwrap_or(SwapOutcome::Success)
    }

    fn default_config_chooser(&self) -> Arc<dyn ConfigChooser<Self>> {
        Arc::new(MockStrategies(self.probe.clone()))
    }

    fn default_context_factory(&self) -> Arc<dyn ContextFactory<Self>> {
        Arc::new(MockStrategies(self.probe.clone()))
    }

    fn default_surface_factory(&self) -> Arc<dyn SurfaceFactory<Self>> {
        Arc::new(MockStrategies(self.probe.clone()))
    }
}

pub struct MockStrategies(Arc<Probe>);

impl ConfigChooser<MockPlatform> for MockStrategies {
    fn choose_config(&self, _display: &u32) -> Result<u32> {
        self.0.record(Event::ConfigChosen);
        Ok(self.0.next_id())
    }
}

impl ContextFactory<MockPlatform> for MockStrategies {
    fn create_context(&self, _display: &u32, _config: &u32) -> Result<u32> {
        if self.0.inner.lock().script.fail_context_creation {
            anyhow::bail!("driver refused the context");
        }
        let id = self.0.next_id();
        self.0.record(Event::ContextCreated(id));
        Ok(id)
    }

    fn destroy_context(&self, _display: &u32, context: u32) {
        self.0.record(Event::ContextDestroyed(context));
    }
}

impl SurfaceFactory<MockPlatform> for MockStrategies {
    fn create_surface(
        &self,
        _display: &u32,
        _config: &u32,
        _context: &u32,
        window: &u32,
        size: PhysicalSize<u32>,
    ) -> Result<MockSurface> {
        {
            let mut inner = self.0.inner.lock();
            if inner.script.fail_surface_creation > 0 {
                inner.script.fail_surface_creation -= 1;
                anyhow::bail!("window {window} rejected the surface");
            }
        }
        self.0.record(Event::SurfaceCreated {
            window: *window,
            width: size.width,
            height: size.height,
        });
        Ok(MockSurface {
            window: *window,
            size,
        })
    }

    fn destroy_surface(&self, _display: &u32, _surface: MockSurface) {
        self.0.record(Event::SurfaceDestroyed);
    }
}

/// Renderer that records its callbacks into a probe.
pub struct RecordingRenderer(pub Arc<Probe>);

impl Renderer<MockPlatform> for RecordingRenderer {
    fn on_context_created(&mut self, context: &u32, _config: &u32) {
        self.0.record(Event::GotContext(*context));
    }

    fn on_surface_changed(&mut self, _context: &u32, width: u32, height: u32) {
        self.0.record(Event::SurfaceChanged(width, height));
    }

    fn on_draw_frame(&mut self, _frame: &mut FrameCtx<'_, MockPlatform>) {
        self.0.record(Event::DrawFrame);
        let mut panic = false;
        self.0.script(|s| panic = s.panic_on_draw);
        if panic {
            panic!("renderer blew up");
        }
    }
}

/// A mock-backed view with its own arbiter of fixed capability.
pub fn mock_view(probe: &Arc<Probe>, mode: RenderMode, multi_context: bool) -> GlView<MockPlatform> {
    ViewBuilder::new(MockPlatform::new(probe.clone()))
        .render_mode(mode)
        .arbiter(Arc::new(ContextArbiter::with_capability(multi_context)))
        .spawn(RecordingRenderer(probe.clone()))
        .unwrap()
}

/// Polls `cond` until it holds or five seconds pass.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Gives the render thread time to do something it should not.
pub fn settle() {
    std::thread::sleep(Duration::from_millis(50));
}
