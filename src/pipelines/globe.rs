//! Point-sprite pipeline for the displaced, masked globe.

use cgmath::{Matrix4, Rad, SquareMatrix};

use crate::{
    config::GlobeConfig,
    data_structures::{geometry::GlobePoint, texture::Texture},
    pipelines::basic::{self, PipelineState, sampler_entry, texture_entry, uniform_entry},
};

/// Uniform block of `globe.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobeUniform {
    pub model: [[f32; 4]; 4],
    pub mouse_uv: [f32; 2],
    pub point_size: f32,
    pub displacement: f32,
    pub highlight_radius: f32,
    pub highlight_lift: f32,
    pub highlight_blend: f32,
    pub ocean_opacity: f32,
    pub highlight: u32,
    // Uniforms require 16 byte spacing
    _padding: [u32; 3],
}

impl GlobeUniform {
    pub fn new(config: &GlobeConfig) -> Self {
        let highlight = config.highlight.unwrap_or_default();
        Self {
            model: Matrix4::identity().into(),
            mouse_uv: [0.0, 0.0],
            point_size: config.point_size,
            displacement: config.displacement,
            highlight_radius: highlight.radius,
            highlight_lift: highlight.lift,
            highlight_blend: highlight.blend,
            ocean_opacity: config.ocean_opacity,
            highlight: config.highlight.is_some() as u32,
            _padding: [0; 3],
        }
    }

    /// Spin about +Y, scaled to the globe radius.
    pub fn set_transform(&mut self, rotation_y: f32, radius: f32) {
        self.model = model_matrix(rotation_y, radius).into();
    }
}

pub fn model_matrix(rotation_y: f32, radius: f32) -> Matrix4<f32> {
    Matrix4::from_angle_y(Rad(rotation_y)) * Matrix4::from_scale(radius)
}

/// The four maps sampled by the globe shader.
pub struct GlobeMaps<'a> {
    pub elevation: &'a Texture,
    pub colour: &'a Texture,
    pub ocean_mask: &'a Texture,
    pub highlight: &'a Texture,
    pub sampler: &'a wgpu::Sampler,
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    use wgpu::ShaderStages as S;
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0, S::VERTEX | S::FRAGMENT),
            texture_entry(1, S::VERTEX),
            texture_entry(2, S::FRAGMENT),
            texture_entry(3, S::FRAGMENT),
            texture_entry(4, S::FRAGMENT),
            sampler_entry(5, S::VERTEX | S::FRAGMENT),
        ],
        label: Some("globe_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    maps: GlobeMaps,
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
                resource: wgpu::BindingResource::TextureView(&maps.elevation.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&maps.colour.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&maps.ocean_mask.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::TextureView(&maps.highlight.view),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(maps.sampler),
            },
        ],
        label: Some("globe_bind_group"),
    })
}

pub fn mk_globe_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    globe_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Globe Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("globe.wgsl").into()),
    };
    basic::mk_render_pipeline(
        device,
        "Globe Pipeline",
        &[camera_bind_group_layout, globe_bind_group_layout],
        config.format,
        PipelineState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_write: true,
        },
        &[GlobePoint::desc()],
        shader,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use cgmath::Vector4;

    use super::*;
    use crate::config::Variant;

    #[test]
    fn uniform_layout_matches_the_shader_block() {
        assert_eq!(std::mem::size_of::<GlobeUniform>(), 112);
        assert_eq!(std::mem::offset_of!(GlobeUniform, mouse_uv), 64);
        assert_eq!(std::mem::offset_of!(GlobeUniform, highlight), 96);
    }

    #[test]
    fn highlight_flag_follows_the_preset() {
        let on = GlobeUniform::new(&GlobeConfig::preset(Variant::Raycast));
        assert_eq!(on.highlight, 1);
        assert_eq!(on.highlight_radius, 0.04);
        let off = GlobeUniform::new(&GlobeConfig::preset(Variant::Relief));
        assert_eq!(off.highlight, 0);
        assert_eq!(off.displacement, 0.25);
    }

    #[test]
    fn model_matrix_spins_about_y_and_scales() {
        let m = model_matrix(std::f32::consts::FRAC_PI_2, 2.0);
        let p = m * Vector4::new(0.0, 0.0, 1.0, 1.0);
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-5);
        let pole = m * Vector4::new(0.0, 1.0, 0.0, 0.0);
        assert_abs_diff_eq!(pole.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn highlight_mix_extrapolates_towards_the_centre() {
        let shader = include_str!("globe.wgsl");
        assert!(shader.contains(
            "mix(colour, rainbow, (globe.highlight_radius - in.dist) * globe.highlight_blend)"
        ));
        assert!(!shader.contains("clamp("));
        // at the cursor the default factor is 0.04 * 40
        let highlight = GlobeConfig::default().highlight.unwrap_or_default();
        assert_abs_diff_eq!(highlight.radius * highlight.blend, 1.6, epsilon = 1e-6);
    }
}
