mod clear;

use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use vellum_engine::device::{WgpuInit, WgpuPlatform};
use vellum_engine::logging::{init_logging, LoggingConfig};
use vellum_engine::view::{GlView, RenderMode, ViewBuilder};

use clear::ClearRenderer;

/// Windowing glue: forwards winit lifecycle events to the view's render thread.
struct Demo {
    window: Option<Arc<Window>>,
    view: Option<GlView<WgpuPlatform>>,
}

impl Demo {
    fn new() -> Self {
        Self {
            window: None,
            view: None,
        }
    }

    fn create_view(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("vellum")
            .with_inner_size(LogicalSize::new(960.0, 540.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let view = ViewBuilder::new(WgpuPlatform::new(WgpuInit::default()))
            .render_mode(RenderMode::Continuous)
            .thread_name("vellum-demo-render")
            .spawn(ClearRenderer::default())
            .context("failed to start render thread")?;

        let size = window.inner_size();
        view.surface_created(Arc::clone(&window));
        view.size_changed(size.width, size.height);

        self.window = Some(window);
        self.view = Some(view);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(view) = self.view.take() {
            view.surface_destroyed();
            view.request_exit_and_wait();
            if let Some(err) = view.take_exit_error() {
                log::error!("render thread failed: {err:#}");
            }
        }
        self.window = None;
        event_loop.exit();
    }

    fn on_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Some(view) = &self.view else {
            return;
        };

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Space) => {
                let mode = match view.render_mode() {
                    RenderMode::Continuous => RenderMode::OnDemand,
                    RenderMode::OnDemand => RenderMode::Continuous,
                };
                log::info!("render mode: {mode:?}");
                view.set_render_mode(mode);
            }
            PhysicalKey::Code(KeyCode::KeyR) => view.request_render(),
            PhysicalKey::Code(KeyCode::KeyL) => view.request_release_context(),
            _ => {}
        }
    }
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        match (&self.window, &self.view) {
            (Some(window), Some(view)) => {
                let size = window.inner_size();
                view.surface_created(Arc::clone(window));
                view.size_changed(size.width, size.height);
                view.resume();
            }
            _ => {
                if let Err(e) = self.create_view(event_loop) {
                    log::error!("failed to start: {e:#}");
                    event_loop.exit();
                }
            }
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(view) = &self.view {
            view.pause();
            view.surface_destroyed();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                if let Some(view) = &self.view {
                    view.size_changed(size.width, size.height);
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let (Some(window), Some(view)) = (&self.window, &self.view) {
                    let size = window.inner_size();
                    view.size_changed(size.width, size.height);
                }
            }

            WindowEvent::Occluded(occluded) => {
                if let Some(view) = &self.view {
                    if occluded {
                        view.pause();
                    } else {
                        view.resume();
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => self.on_key(&event),

            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut demo = Demo::new();

    event_loop
        .run_app(&mut demo)
        .context("winit event loop terminated with error")?;

    Ok(())
}
