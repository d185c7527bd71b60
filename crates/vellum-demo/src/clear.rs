use vellum_engine::core::{FrameCtx, Renderer};
use vellum_engine::device::{WgpuConfig, WgpuContext, WgpuPlatform};

/// Clears the window to a slowly cycling colour.
#[derive(Default)]
pub struct ClearRenderer {
    elapsed: f32,
    size: (u32, u32),
}

impl Renderer<WgpuPlatform> for ClearRenderer {
    fn on_context_created(&mut self, _context: &WgpuContext, config: &WgpuConfig) {
        log::info!("context ready on {} ({:?})", config.info.name, config.info.backend);
    }

    fn on_surface_changed(&mut self, _context: &WgpuContext, width: u32, height: u32) {
        self.size = (width, height);
        log::info!("surface is {width}x{height}");
    }

    fn on_draw_frame(&mut self, ctx: &mut FrameCtx<'_, WgpuPlatform>) {
        self.elapsed += ctx.time.dt;

        let t = self.elapsed as f64;
        let color = wgpu::Color {
            r: 0.5 + 0.5 * (t * 0.7).sin(),
            g: 0.5 + 0.5 * (t * 0.9 + 2.0).sin(),
            b: 0.5 + 0.5 * (t * 1.1 + 4.0).sin(),
            a: 1.0,
        };

        let frame = &mut *ctx.frame;
        let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vellum clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if ctx.time.frame_index % 600 == 0 {
            log::debug!(
                "frame {} at {}x{}",
                ctx.time.frame_index,
                self.size.0,
                self.size.1
            );
        }
    }
}
