/// One acquired wgpu frame.
///
/// Short-lived: holding the surface texture blocks acquisition of the next frame.
pub struct WgpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
    pub format: wgpu::TextureFormat,
}
