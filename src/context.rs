use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalPosition, window::Window};

use crate::{
    camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection},
    config::CameraConfig,
    data_structures::texture,
    pipelines::{Layouts, Pipelines},
};

/// Last known cursor position in physical window pixels. The position is
/// kept when the cursor leaves the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseState {
    pub coords: PhysicalPosition<f64>,
}

impl MouseState {
    /// Cursor parked in the middle of a `width` x `height` window.
    pub fn centred(width: u32, height: u32) -> Self {
        Self {
            coords: PhysicalPosition::new(f64::from(width) / 2.0, f64::from(height) / 2.0),
        }
    }
}

/// Implemented by everything that keeps a CPU-side copy of GPU data and
/// uploads it on demand.
pub trait BufferWriter {
    fn write_to_buffer(&mut self, ctx: &Context);
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub mouse: MouseState,
    pub layouts: Layouts,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("Adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("could not open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB surface for
        // the final encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &config, &layouts);

        let camera_config = CameraConfig::default();
        let camera = Camera::new(camera_config.position);
        let projection = Projection::new(
            config.width,
            config.height,
            camera_config.fov_y,
            camera_config.near,
            camera_config.far,
        );
        let controller = OrbitController::new(&camera_config, config.height);

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);
        uniform.update_viewport(config.width, config.height);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
        };

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let mouse = MouseState::centred(config.width, config.height);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            mouse,
            layouts,
            pipelines,
            clear_colour: wgpu::Color::BLACK,
        })
    }

    /// Reconfigures the surface and everything sized after it. Zero sizes
    /// (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        self.camera.controller.resize(height);
        self.camera.uniform.update_viewport(width, height);
        self.depth_texture =
            texture::Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        true
    }

    /// Replaces the camera, its projection parameters and the orbit
    /// controls. Pending orbit motion is discarded.
    pub fn configure_camera(&mut self, config: &CameraConfig) {
        self.camera.camera = Camera::new(config.position);
        self.projection = Projection::new(
            self.config.width,
            self.config.height,
            config.fov_y,
            config.near,
            config.far,
        );
        self.camera.controller = OrbitController::new(config, self.config.height);
        self.update_camera_uniform();
    }

    /// Recomputes the camera uniform and uploads it.
    pub fn update_camera_uniform(&mut self) {
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.camera
            .uniform
            .update_viewport(self.config.width, self.config.height);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
    }
}

/// The subset of [`Context`] flow constructors need to create GPU resources.
///
/// wgpu handles are reference counted internally, so cloning is cheap.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub layouts: Layouts,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            layouts: ctx.layouts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_starts_in_the_middle_of_the_window() {
        let mouse = MouseState::centred(800, 601);
        assert_eq!(mouse.coords, PhysicalPosition::new(400.0, 300.5));
    }
}
