use super::SwapOutcome;

pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| formats.contains(f)) {
            return Some(f);
        }
    }

    formats.first().copied()
}

pub(crate) fn choose_alpha_mode(
    modes: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| modes.contains(m))
        .or_else(|| modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn choose_present_mode(
    modes: &[wgpu::PresentMode],
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    if modes.contains(&requested) {
        requested
    } else {
        wgpu::PresentMode::Fifo
    }
}

/// Maps a frame-acquisition error to what the render loop must do about it.
///
/// `Outdated` is repaired in place by reconfiguring the surface.
pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> SwapOutcome {
    match err {
        wgpu::SurfaceError::Outdated => {
            if config.width > 0 && config.height > 0 {
                surface.configure(device, config);
            }
            SwapOutcome::Skipped
        }
        wgpu::SurfaceError::Timeout => SwapOutcome::Skipped,
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Other => SwapOutcome::SurfaceBad,
        wgpu::SurfaceError::OutOfMemory => SwapOutcome::ContextLost,
    }
}
