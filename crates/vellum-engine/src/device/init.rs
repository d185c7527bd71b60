/// Configuration for the default wgpu platform.
///
/// Keep this structure small. Add options only when a concrete platform or backend
/// requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Backends the instance may use.
    pub backends: wgpu::Backends,

    /// Adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode. Falls back to FIFO when the surface does not support it.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference; an unsupported choice is replaced by a supported one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features. Favor an empty set for portability.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter.
    pub required_limits: wgpu::Limits,

    /// Hint for the surface's maximum frame latency.
    pub desired_maximum_frame_latency: u32,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
