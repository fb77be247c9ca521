//! Line-list pipeline for the globe's wireframe shell.

use cgmath::SquareMatrix;

use crate::{
    config::GlobeConfig,
    data_structures::geometry::WireVertex,
    pipelines::{
        basic::{self, PipelineState, uniform_entry},
        globe::model_matrix,
    },
};

/// Light intensity at which the shell's sky-facing side shows exactly
/// `wire_colour`.
pub const REFERENCE_LIGHT_INTENSITY: f32 = 10.0;

/// Uniform block of `wire.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireUniform {
    pub model: [[f32; 4]; 4],
    pub colour: [f32; 4],
    pub sky: [f32; 3],
    /// Light intensity relative to [`REFERENCE_LIGHT_INTENSITY`].
    pub intensity: f32,
    pub ground: [f32; 3],
    // Uniforms require 16 byte spacing
    _padding: f32,
}

impl WireUniform {
    pub fn new(config: &GlobeConfig) -> Self {
        let [r, g, b] = config.wire_colour;
        Self {
            model: cgmath::Matrix4::identity().into(),
            colour: [r, g, b, 1.0],
            sky: config.sky_colour,
            intensity: config.light_intensity / REFERENCE_LIGHT_INTENSITY,
            ground: config.ground_colour,
            _padding: 0.0,
        }
    }

    pub fn set_transform(&mut self, rotation_y: f32, radius: f32) {
        self.model = model_matrix(rotation_y, radius).into();
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        label: Some("wire_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.as_entire_binding(),
        }],
        label: Some("wire_bind_group"),
    })
}

pub fn mk_wire_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    wire_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Wire Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("wire.wgsl").into()),
    };
    basic::mk_render_pipeline(
        device,
        "Wire Pipeline",
        &[camera_bind_group_layout, wire_bind_group_layout],
        config.format,
        PipelineState {
            topology: wgpu::PrimitiveTopology::LineList,
            blend: Some(wgpu::BlendState::REPLACE),
            depth_write: true,
        },
        &[WireVertex::desc()],
        shader,
    )
}
