use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::platform::{ConfigChooser, ContextFactory, Platform, SurfaceFactory};
use super::{surface, SwapOutcome, WgpuFrame, WgpuInit};

/// Adapter chosen for a render thread; plays the role of the pixel-format config.
pub struct WgpuConfig {
    pub adapter: wgpu::Adapter,
    pub info: wgpu::AdapterInfo,
}

/// Logical device and queue for one render thread.
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    lost: Arc<AtomicBool>,
}

impl WgpuContext {
    /// Whether the device-lost callback has fired.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }
}

/// Configured surface bound to a window.
pub struct WgpuSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

/// Default platform: wgpu over a `winit` window.
///
/// The display-level session is the `wgpu::Instance`.
#[derive(Debug, Clone, Default)]
pub struct WgpuPlatform {
    init: WgpuInit,
}

impl WgpuPlatform {
    pub fn new(init: WgpuInit) -> Self {
        Self { init }
    }

    pub fn init(&self) -> &WgpuInit {
        &self.init
    }
}

impl Platform for WgpuPlatform {
    type Display = wgpu::Instance;
    type Config = WgpuConfig;
    type Context = WgpuContext;
    type Surface = WgpuSurface;
    type Window = Arc<Window>;
    type Frame = WgpuFrame;

    fn open_display(&mut self) -> Result<wgpu::Instance> {
        Ok(wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.init.backends,
            ..Default::default()
        }))
    }

    fn close_display(&mut self, display: wgpu::Instance) {
        drop(display);
    }

    fn driver_string(&self, config: &WgpuConfig, _context: &WgpuContext) -> String {
        config.info.name.clone()
    }

    fn begin_frame(
        &mut self,
        context: &WgpuContext,
        surface: &mut WgpuSurface,
    ) -> std::result::Result<WgpuFrame, SwapOutcome> {
        if context.is_lost() {
            return Err(SwapOutcome::ContextLost);
        }

        let surface_texture = match surface.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                log::debug!("failed to acquire surface texture: {err}");
                return Err(surface::map_surface_error(
                    &surface.surface,
                    &context.device,
                    &surface.config,
                    err,
                ));
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vellum frame encoder"),
            });

        Ok(WgpuFrame {
            surface_texture,
            view,
            encoder,
            format: surface.config.format,
        })
    }

    fn present(
        &mut self,
        context: &WgpuContext,
        _surface: &mut WgpuSurface,
        frame: WgpuFrame,
    ) -> SwapOutcome {
        let WgpuFrame {
            surface_texture,
            view,
            encoder,
            ..
        } = frame;

        context.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();

        if context.is_lost() {
            SwapOutcome::ContextLost
        } else {
            SwapOutcome::Success
        }
    }

    fn default_config_chooser(&self) -> Arc<dyn ConfigChooser<Self>> {
        Arc::new(WgpuStrategies::new(self.init.clone()))
    }

    fn default_context_factory(&self) -> Arc<dyn ContextFactory<Self>> {
        Arc::new(WgpuStrategies::new(self.init.clone()))
    }

    fn default_surface_factory(&self) -> Arc<dyn SurfaceFactory<Self>> {
        Arc::new(WgpuStrategies::new(self.init.clone()))
    }
}

/// Default config/context/surface strategies for [`WgpuPlatform`].
#[derive(Debug, Clone)]
pub struct WgpuStrategies {
    init: WgpuInit,
}

impl WgpuStrategies {
    pub fn new(init: WgpuInit) -> Self {
        Self { init }
    }
}

impl ConfigChooser<WgpuPlatform> for WgpuStrategies {
    fn choose_config(&self, display: &wgpu::Instance) -> Result<WgpuConfig> {
        // No surface exists yet when the config is chosen; compatibility is
        // checked again when the surface is configured.
        let adapter = pollster::block_on(display.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.init.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {:?} ({:?}, {})", info.name, info.backend, info.driver);

        Ok(WgpuConfig { adapter, info })
    }
}

impl ContextFactory<WgpuPlatform> for WgpuStrategies {
    fn create_context(&self, _display: &wgpu::Instance, config: &WgpuConfig) -> Result<WgpuContext> {
        let (device, queue) = pollster::block_on(config.adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vellum device"),
                required_features: self.init.required_features,
                required_limits: self.init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            },
        ))
        .context("failed to create wgpu device/queue")?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });

        Ok(WgpuContext { device, queue, lost })
    }

    fn destroy_context(&self, _display: &wgpu::Instance, context: WgpuContext) {
        drop(context);
    }
}

impl SurfaceFactory<WgpuPlatform> for WgpuStrategies {
    fn create_surface(
        &self,
        display: &wgpu::Instance,
        config: &WgpuConfig,
        context: &WgpuContext,
        window: &Arc<Window>,
        size: PhysicalSize<u32>,
    ) -> Result<WgpuSurface> {
        anyhow::ensure!(size.width > 0 && size.height > 0, "surface has zero size");

        let surface = display
            .create_surface(Arc::clone(window))
            .context("failed to create wgpu surface")?;

        let caps = surface.get_capabilities(&config.adapter);
        let format = surface::choose_surface_format(&caps.formats, self.init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps.alpha_modes, self.init.alpha_mode);
        let present_mode = surface::choose_present_mode(&caps.present_modes, self.init.present_mode);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: self.init.desired_maximum_frame_latency,
        };

        surface.configure(&context.device, &surface_config);

        Ok(WgpuSurface {
            surface,
            config: surface_config,
        })
    }

    fn destroy_surface(&self, _display: &wgpu::Instance, surface: WgpuSurface) {
        drop(surface);
    }
}
