use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::{DeviceEvent, WindowEvent};

use crate::{
    config::GlobeConfig,
    context::{Context, InitContext},
    data_structures::{
        star,
        texture::{self, ColourSpace, Texture},
    },
    flow::{GraphicsFlow, Out},
    pipelines::stars::{self, StarsUniform},
    render::{Render, Sprites},
    resources,
};

/// Edge length of the generated sprite when the sprite image is missing.
const FALLBACK_SPRITE_SIZE: u32 = 64;

/// Background stars. They stay fixed in world space; only the camera moves
/// past them.
pub struct Starfield {
    instances: wgpu::Buffer,
    amount: u32,
    bind_group: wgpu::BindGroup,
}

impl Starfield {
    pub async fn new(ctx: &InitContext, config: &GlobeConfig) -> Self {
        let stars = star::generate(&config.starfield);
        log::info!("Generated {} stars", stars.len());

        let instances = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Star Instance Buffer"),
                contents: bytemuck::cast_slice(&stars),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let sprite = match resources::load_texture(
            &config.textures.star_sprite,
            ColourSpace::Srgb,
            &ctx.device,
            &ctx.queue,
        )
        .await
        {
            Ok(sprite) => sprite,
            Err(e) => {
                log::warn!("{e:#}; using a generated star sprite");
                Texture::circle_sprite(&ctx.device, &ctx.queue, FALLBACK_SPRITE_SIZE)
            }
        };

        let uniform = StarsUniform::new(config.starfield.size, config.camera.fov_y.into());
        let uniform_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Stars Uniform Buffer"),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let sampler = texture::create_default_sampler(&ctx.device);
        let bind_group = stars::mk_bind_group(
            &ctx.device,
            &ctx.layouts.stars,
            &uniform_buffer,
            &sprite,
            &sampler,
        );

        Self {
            instances,
            amount: stars.len() as u32,
            bind_group,
        }
    }
}

impl<S> GraphicsFlow<S> for Starfield {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S> {
        Out::Empty
    }

    fn on_update(&mut self, _: &Context, _: &mut S, _: Duration) -> Out<S> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S> {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Stars(Sprites {
            instances: &self.instances,
            amount: self.amount,
            group: &self.bind_group,
        })
    }
}
