use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use super::platform::{ContextFactory, Platform, Strategies, SurfaceFactory};
use super::SwapOutcome;

/// Per-render-thread owner of the display, context and drawable surface.
///
/// The factory that created a context or surface is retained next to it and used to
/// destroy it, so teardown does not depend on the owning view still being reachable.
pub struct ContextBridge<P: Platform> {
    platform: P,
    display: Option<P::Display>,
    config: Option<P::Config>,
    context: Option<(P::Context, Arc<dyn ContextFactory<P>>)>,
    surface: Option<(P::Surface, Arc<dyn SurfaceFactory<P>>)>,
}

impl<P: Platform> ContextBridge<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            display: None,
            config: None,
            context: None,
            surface: None,
        }
    }

    /// Creates a context, opening the display and choosing a config first if needed.
    pub fn start(&mut self, strategies: &Strategies<P>) -> Result<()> {
        self.destroy_context();

        let display = match self.display.take() {
            Some(display) => display,
            None => {
                let display = self
                    .platform
                    .open_display()
                    .context("failed to open graphics display")?;
                log::debug!("graphics display opened");
                display
            }
        };
        let display = &*self.display.insert(display);

        let config = match self.config.take() {
            Some(config) => config,
            None => strategies
                .config_chooser
                .choose_config(display)
                .context("failed to choose a graphics configuration")?,
        };
        let config = &*self.config.insert(config);

        let context = strategies
            .context_factory
            .create_context(display, config)
            .context("failed to create graphics context")?;

        log::debug!("graphics context created");
        self.context = Some((context, Arc::clone(&strategies.context_factory)));
        Ok(())
    }

    /// (Re)creates the drawable surface for `window`. Requires a context.
    pub fn create_surface(
        &mut self,
        strategies: &Strategies<P>,
        window: &P::Window,
        size: PhysicalSize<u32>,
    ) -> Result<()> {
        self.destroy_surface();

        let (Some(display), Some(config), Some((context, _))) =
            (&self.display, &self.config, &self.context)
        else {
            anyhow::bail!("cannot create a drawable surface without a graphics context");
        };

        let surface = strategies
            .surface_factory
            .create_surface(display, config, context, window, size)
            .context("failed to create drawable surface")?;

        log::debug!("drawable surface created ({}x{})", size.width, size.height);
        self.surface = Some((surface, Arc::clone(&strategies.surface_factory)));
        Ok(())
    }

    pub fn destroy_surface(&mut self) {
        let Some((surface, factory)) = self.surface.take() else {
            return;
        };

        match &self.display {
            Some(display) => factory.destroy_surface(display, surface),
            None => drop(surface),
        }
        log::debug!("drawable surface destroyed");
    }

    /// Destroys the context (and any surface bound to it). The display stays open.
    pub fn destroy_context(&mut self) {
        self.destroy_surface();

        let Some((context, factory)) = self.context.take() else {
            return;
        };

        match &self.display {
            Some(display) => factory.destroy_context(display, context),
            None => drop(context),
        }
        log::debug!("graphics context destroyed");
    }

    /// Tears down everything, including the display-level session.
    pub fn terminate(&mut self) {
        self.destroy_context();
        self.config = None;

        if let Some(display) = self.display.take() {
            self.platform.close_display(display);
            log::debug!("graphics display closed");
        }
    }

    pub fn has_display(&self) -> bool {
        self.display.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn context(&self) -> Option<&P::Context> {
        self.context.as_ref().map(|(context, _)| context)
    }

    pub fn config(&self) -> Option<&P::Config> {
        self.config.as_ref()
    }

    /// Driver identification of the live context, if any.
    pub fn driver_string(&self) -> Option<String> {
        let (Some(config), Some((context, _))) = (&self.config, &self.context) else {
            return None;
        };
        Some(self.platform.driver_string(config, context))
    }

    pub fn begin_frame(&mut self) -> std::result::Result<P::Frame, SwapOutcome> {
        let (Some((context, _)), Some((surface, _))) = (&self.context, &mut self.surface) else {
            return Err(SwapOutcome::SurfaceBad);
        };
        self.platform.begin_frame(context, surface)
    }

    pub fn present(&mut self, frame: P::Frame) -> SwapOutcome {
        let (Some((context, _)), Some((surface, _))) = (&self.context, &mut self.surface) else {
            return SwapOutcome::SurfaceBad;
        };
        self.platform.present(context, surface, frame)
    }

    /// Returns the platform; callers tear down first.
    pub fn into_platform(self) -> P {
        debug_assert!(self.display.is_none() && self.context.is_none());
        self.platform
    }
}
