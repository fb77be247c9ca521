use std::f32::consts::TAU;

use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::GlobeConfig,
    context::{BufferWriter, Context, InitContext},
    data_structures::{
        geometry::{globe_points, wire_shell},
        texture::{self, ColourSpace},
    },
    flow::{GraphicsFlow, Out},
    pipelines::{
        globe::{self as globe_pipeline, GlobeMaps, GlobeUniform},
        wire::{self, WireUniform},
    },
    raycast::{CursorHighlight, cursor_to_ndc},
    render::{Lines, Render, Sprites},
    resources::load_texture_or_placeholder,
};

// Fallback texels when a map is missing: flat, mid grey, all land, white.
const FLAT_ELEVATION: [u8; 4] = [0, 0, 0, 255];
const GREY: [u8; 4] = [128, 128, 128, 255];
const NO_OCEAN: [u8; 4] = [0, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// The spinning globe: a dark wireframe shell with the displaced point cloud
/// on top.
pub struct Globe {
    config: GlobeConfig,
    rotation_y: f32,
    highlight: CursorHighlight,

    uniform: GlobeUniform,
    uniform_buffer: wgpu::Buffer,
    points: wgpu::Buffer,
    point_count: u32,
    bind_group: wgpu::BindGroup,

    wire_uniform: WireUniform,
    wire_uniform_buffer: wgpu::Buffer,
    wire_vertices: wgpu::Buffer,
    wire_indices: wgpu::Buffer,
    wire_index_count: u32,
    wire_bind_group: wgpu::BindGroup,
}

impl Globe {
    pub async fn new(ctx: &InitContext, config: GlobeConfig) -> Self {
        let (device, queue) = (&ctx.device, &ctx.queue);
        let maps = &config.textures;
        let (elevation, colour, ocean_mask, highlight) = futures::join!(
            load_texture_or_placeholder(
                &maps.elevation,
                ColourSpace::Linear,
                FLAT_ELEVATION,
                device,
                queue
            ),
            load_texture_or_placeholder(&maps.colour, ColourSpace::Srgb, GREY, device, queue),
            load_texture_or_placeholder(
                &maps.ocean_mask,
                ColourSpace::Linear,
                NO_OCEAN,
                device,
                queue
            ),
            load_texture_or_placeholder(&maps.highlight, ColourSpace::Srgb, WHITE, device, queue),
        );

        let points = globe_points(config.detail);
        log::info!(
            "Globe variant {} with {} points",
            config.variant,
            points.len()
        );
        let point_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globe Point Buffer"),
            contents: bytemuck::cast_slice(&points),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut uniform = GlobeUniform::new(&config);
        uniform.set_transform(0.0, config.radius);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globe Uniform Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = texture::create_default_sampler(device);
        let bind_group = globe_pipeline::mk_bind_group(
            device,
            &ctx.layouts.globe,
            &uniform_buffer,
            GlobeMaps {
                elevation: &elevation,
                colour: &colour,
                ocean_mask: &ocean_mask,
                highlight: &highlight,
                sampler: &sampler,
            },
        );

        let (vertices, indices) = wire_shell(config.wire_detail);
        let wire_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wire Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let wire_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wire Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let mut wire_uniform = WireUniform::new(&config);
        wire_uniform.set_transform(0.0, config.radius);
        let wire_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wire Uniform Buffer"),
            contents: bytemuck::cast_slice(&[wire_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let wire_bind_group = wire::mk_bind_group(device, &ctx.layouts.wire, &wire_uniform_buffer);

        Self {
            config,
            rotation_y: 0.0,
            highlight: CursorHighlight::default(),
            uniform,
            uniform_buffer,
            points: point_buffer,
            point_count: points.len() as u32,
            bind_group,
            wire_uniform,
            wire_uniform_buffer,
            wire_vertices,
            wire_indices,
            wire_index_count: indices.len() as u32,
            wire_bind_group,
        }
    }
}

/// Spin angle after `dt` seconds, wrapped into `[0, 2π)`.
pub fn advance_rotation(rotation_y: f32, spin_speed: f32, dt: f32) -> f32 {
    (rotation_y + spin_speed * dt).rem_euclid(TAU)
}

impl BufferWriter for Globe {
    fn write_to_buffer(&mut self, ctx: &Context) {
        self.uniform
            .set_transform(self.rotation_y, self.config.radius);
        self.uniform.mouse_uv = self.highlight.uv();
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniform]));

        self.wire_uniform
            .set_transform(self.rotation_y, self.config.radius);
        ctx.queue.write_buffer(
            &self.wire_uniform_buffer,
            0,
            bytemuck::cast_slice(&[self.wire_uniform]),
        );
    }
}

impl<S> GraphicsFlow<S> for Globe {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S> {
        let camera = self.config.camera;
        let clear_colour = self.config.clear_colour;
        Out::Configure(Box::new(move |ctx: &mut Context| {
            ctx.clear_colour = clear_colour;
            ctx.configure_camera(&camera);
        }))
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, dt: Duration) -> Out<S> {
        self.rotation_y =
            advance_rotation(self.rotation_y, self.config.spin_speed, dt.as_secs_f32());
        if self.config.highlight.is_some() {
            let ndc = cursor_to_ndc(ctx.mouse.coords, ctx.config.width, ctx.config.height);
            self.highlight.track(
                &ctx.camera.camera,
                &ctx.projection,
                ndc,
                self.rotation_y,
                self.config.radius,
            );
        }
        self.write_to_buffer(ctx);
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S> {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::Wireframe(Lines {
                vertex: &self.wire_vertices,
                index: &self.wire_indices,
                amount: self.wire_index_count,
                group: &self.wire_bind_group,
            }),
            Render::Points(Sprites {
                instances: &self.points,
                amount: self.point_count,
                group: &self.bind_group,
            }),
        ])
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn one_second_at_the_default_speed() {
        let speed = GlobeConfig::default().spin_speed;
        assert_abs_diff_eq!(advance_rotation(0.0, speed, 1.0), 0.12, epsilon = 1e-6);
    }

    #[test]
    fn rotation_wraps_around_a_full_turn() {
        let r = advance_rotation(TAU - 0.1, 1.0, 0.2);
        assert_abs_diff_eq!(r, 0.1, epsilon = 1e-5);
        assert!(r >= 0.0 && r < TAU);
    }

    #[test]
    fn paused_frames_keep_the_angle() {
        assert_eq!(advance_rotation(1.5, 0.12, 0.0), 1.5);
    }
}
