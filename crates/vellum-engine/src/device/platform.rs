use std::sync::Arc;

use anyhow::Result;
use winit::dpi::PhysicalSize;

use super::SwapOutcome;

/// A graphics platform: the handle types a render thread juggles plus frame submission.
///
/// Every method is called from the render thread only.
pub trait Platform: Sized + Send + 'static {
    /// Display-level session (one per render thread, torn down on terminate).
    type Display: Send;
    /// Chosen pixel format / adapter.
    type Config: Send;
    type Context: Send;
    /// Drawable surface bound to a native window.
    type Surface: Send;
    /// Native window handle supplied with surface-available notifications.
    type Window: Clone + Send + 'static;
    /// Per-frame render target handed to the renderer.
    type Frame;

    fn open_display(&mut self) -> Result<Self::Display>;

    fn close_display(&mut self, display: Self::Display);

    /// Driver identification used for the one-time capability probe.
    fn driver_string(&self, config: &Self::Config, context: &Self::Context) -> String;

    /// Acquires the next frame; on failure the outcome says what the loop must do.
    fn begin_frame(
        &mut self,
        context: &Self::Context,
        surface: &mut Self::Surface,
    ) -> std::result::Result<Self::Frame, SwapOutcome>;

    /// Submits and presents a frame obtained from [`Platform::begin_frame`].
    fn present(
        &mut self,
        context: &Self::Context,
        surface: &mut Self::Surface,
        frame: Self::Frame,
    ) -> SwapOutcome;

    fn default_config_chooser(&self) -> Arc<dyn ConfigChooser<Self>>;

    fn default_context_factory(&self) -> Arc<dyn ContextFactory<Self>>;

    fn default_surface_factory(&self) -> Arc<dyn SurfaceFactory<Self>>;
}

/// Picks the configuration contexts and surfaces are created with.
pub trait ConfigChooser<P: Platform>: Send + Sync {
    fn choose_config(&self, display: &P::Display) -> Result<P::Config>;
}

/// Creates and destroys contexts.
pub trait ContextFactory<P: Platform>: Send + Sync {
    fn create_context(&self, display: &P::Display, config: &P::Config) -> Result<P::Context>;

    fn destroy_context(&self, display: &P::Display, context: P::Context);
}

/// Creates and destroys drawable surfaces for a native window.
pub trait SurfaceFactory<P: Platform>: Send + Sync {
    fn create_surface(
        &self,
        display: &P::Display,
        config: &P::Config,
        context: &P::Context,
        window: &P::Window,
        size: PhysicalSize<u32>,
    ) -> Result<P::Surface>;

    fn destroy_surface(&self, display: &P::Display, surface: P::Surface);
}

/// The capability set a view hands to its render thread.
pub struct Strategies<P: Platform> {
    pub config_chooser: Arc<dyn ConfigChooser<P>>,
    pub context_factory: Arc<dyn ContextFactory<P>>,
    pub surface_factory: Arc<dyn SurfaceFactory<P>>,
}

impl<P: Platform> Strategies<P> {
    /// The platform's default strategies.
    pub fn defaults(platform: &P) -> Self {
        Self {
            config_chooser: platform.default_config_chooser(),
            context_factory: platform.default_context_factory(),
            surface_factory: platform.default_surface_factory(),
        }
    }
}

impl<P: Platform> Clone for Strategies<P> {
    fn clone(&self) -> Self {
        Self {
            config_chooser: Arc::clone(&self.config_chooser),
            context_factory: Arc::clone(&self.context_factory),
            surface_factory: Arc::clone(&self.surface_factory),
        }
    }
}
