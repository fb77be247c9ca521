//! Render pipelines of the globe scene.
//!
//! - `basic` holds the shared pipeline and bind group layout helpers
//! - `stars` draws the starfield sprites
//! - `wire` draws the lit wireframe shell
//! - `globe` draws the displaced point cloud

pub mod basic;
pub mod globe;
pub mod stars;
pub mod wire;

/// Bind group layouts shared between the context and the flows that create
/// bind groups against them.
#[derive(Clone, Debug)]
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub globe: wgpu::BindGroupLayout,
    pub wire: wgpu::BindGroupLayout,
    pub stars: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: basic::mk_camera_bind_group_layout(device),
            globe: globe::mk_bind_group_layout(device),
            wire: wire::mk_bind_group_layout(device),
            stars: stars::mk_bind_group_layout(device),
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    pub stars: wgpu::RenderPipeline,
    pub wire: wgpu::RenderPipeline,
    pub points: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        layouts: &Layouts,
    ) -> Self {
        Self {
            stars: stars::mk_stars_pipeline(device, config, &layouts.camera, &layouts.stars),
            wire: wire::mk_wire_pipeline(device, config, &layouts.camera, &layouts.wire),
            points: globe::mk_globe_pipeline(device, config, &layouts.camera, &layouts.globe),
        }
    }
}
