use std::sync::Arc;

use anyhow::Result;

use crate::arbiter::ContextArbiter;
use crate::core::Renderer;
use crate::device::{ConfigChooser, ContextFactory, Platform, Strategies, SurfaceFactory};
use crate::thread::RenderMode;

use super::controller::GlView;

/// Per-view settings.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub render_mode: RenderMode,
    /// Keep the context across pause when the driver allows it.
    pub preserve_context_on_pause: bool,
    /// Prefix of the render thread's name; the client id is appended.
    pub thread_name: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Continuous,
            preserve_context_on_pause: false,
            thread_name: "vellum-render".to_string(),
        }
    }
}

/// Configures a [`GlView`] before its render thread exists.
///
/// Strategies can only be swapped here (or on a detached view); a running thread always
/// sees the set it was started with.
pub struct ViewBuilder<P: Platform> {
    platform: P,
    config: ViewConfig,
    config_chooser: Option<Arc<dyn ConfigChooser<P>>>,
    context_factory: Option<Arc<dyn ContextFactory<P>>>,
    surface_factory: Option<Arc<dyn SurfaceFactory<P>>>,
    arbiter: Option<Arc<ContextArbiter>>,
}

impl<P: Platform> ViewBuilder<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            config: ViewConfig::default(),
            config_chooser: None,
            context_factory: None,
            surface_factory: None,
            arbiter: None,
        }
    }

    pub fn config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.config.render_mode = mode;
        self
    }

    pub fn preserve_context_on_pause(mut self, preserve: bool) -> Self {
        self.config.preserve_context_on_pause = preserve;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    pub fn config_chooser(mut self, chooser: Arc<dyn ConfigChooser<P>>) -> Self {
        self.config_chooser = Some(chooser);
        self
    }

    pub fn context_factory(mut self, factory: Arc<dyn ContextFactory<P>>) -> Self {
        self.context_factory = Some(factory);
        self
    }

    pub fn surface_factory(mut self, factory: Arc<dyn SurfaceFactory<P>>) -> Self {
        self.surface_factory = Some(factory);
        self
    }

    /// Arbiter shared with other views on the same GPU. Defaults to [`ContextArbiter::global`].
    pub fn arbiter(mut self, arbiter: Arc<ContextArbiter>) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    /// Attaches `renderer` and starts the render thread.
    pub fn spawn<R: Renderer<P>>(self, renderer: R) -> Result<GlView<P>> {
        let defaults = Strategies::defaults(&self.platform);
        let strategies = Strategies {
            config_chooser: self.config_chooser.unwrap_or(defaults.config_chooser),
            context_factory: self.context_factory.unwrap_or(defaults.context_factory),
            surface_factory: self.surface_factory.unwrap_or(defaults.surface_factory),
        };
        let arbiter = self.arbiter.unwrap_or_else(ContextArbiter::global);

        GlView::start(self.platform, Box::new(renderer), strategies, arbiter, self.config)
    }
}
