//! Sprite pipeline for the starfield.

use crate::{
    data_structures::{star::Star, texture::Texture},
    pipelines::basic::{self, PipelineState, sampler_entry, texture_entry, uniform_entry},
};

/// Uniform block of `stars.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StarsUniform {
    /// Sprite edge length in world units.
    pub size: f32,
    // Uniforms require 16 byte spacing
    _padding: [f32; 3],
}

impl StarsUniform {
    /// Matches a point sprite of `size` that shrinks with distance under a
    /// vertical field of view `fov_y`.
    pub fn new(size: f32, fov_y: cgmath::Rad<f32>) -> Self {
        Self {
            size: size * (fov_y.0 / 2.0).tan(),
            _padding: [0.0; 3],
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX),
            texture_entry(1, wgpu::ShaderStages::FRAGMENT),
            sampler_entry(2, wgpu::ShaderStages::FRAGMENT),
        ],
        label: Some("stars_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    sprite: &Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&sprite.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("stars_bind_group"),
    })
}

pub fn mk_stars_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    stars_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Stars Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("stars.wgsl").into()),
    };
    basic::mk_render_pipeline(
        device,
        "Stars Pipeline",
        &[camera_bind_group_layout, stars_bind_group_layout],
        config.format,
        PipelineState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_write: false,
        },
        &[Star::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use cgmath::Deg;

    use super::*;

    #[test]
    fn uniform_is_one_vec4() {
        assert_eq!(std::mem::size_of::<StarsUniform>(), 16);
    }

    #[test]
    fn sprite_size_scales_with_the_field_of_view() {
        let right_angle = StarsUniform::new(0.2, Deg(90.0).into());
        assert_abs_diff_eq!(right_angle.size, 0.2, epsilon = 1e-6);
        let narrow = StarsUniform::new(0.2, Deg(45.0).into());
        assert!(narrow.size < right_angle.size);
    }
}
