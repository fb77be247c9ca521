//! Flow control and application event loop.
//!
//! A "flow" is one self-contained part of the scene (the starfield, the globe)
//! that reacts to input, updates its state every frame and describes what it
//! wants drawn. The event loop owns the GPU [`Context`] and drives every flow
//! through the same lifecycle.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S>`] is the trait for scene parts
//! - [`Out<S>`] lets a lifecycle hook reconfigure the context or mutate the
//!   shared state
//!
//! # Lifecycle
//!
//! Each frame:
//! 1. Window/device events are passed to the orbit controls and to every flow
//! 2. Every flow's [`on_render`](GraphicsFlow::on_render) is batched and drawn
//! 3. The orbit controls move the camera and the camera uniform is uploaded
//! 4. Every flow's [`on_update`](GraphicsFlow::on_update) runs with the frame time
//! 5. The next frame is requested

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
#[cfg(feature = "integration-tests")]
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    context::{Context, InitContext},
    render::Batches,
    render::Render,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Output of every lifecycle hook.
///
/// `Out::Configure` modifies the [`Context`] at runtime, for instance to move
/// the camera or change the clear colour.
///
/// `Out::Mut` mutates the state shared between all flows.
///
/// `Empty` is the default output when nothing needs to happen.
pub enum Out<S> {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Mut(Box<dyn FnOnce(&mut S)>),
    Empty,
}

impl<S> Default for Out<S> {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(feature = "integration-tests")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// Pixels read back from the offscreen target in integration tests.
#[cfg(feature = "integration-tests")]
pub type TestImage = image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>;

/// A renderable part of the scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after all flows were constructed
/// 2. `on_window_events()` and `on_device_events()` are called for each winit event
/// 3. `on_render()` is called every frame and specifies how to render `self`
/// 4. `on_update()` is called every frame after the camera moved
pub trait GraphicsFlow<S> {
    /// Initialize the flow and configure the context.
    ///
    /// Return `Out::Configure` to set the camera or the clear colour.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S>;

    /// Update state every frame.
    ///
    /// `dt` is the time since the previous frame. Flows upload their uniforms
    /// here.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S>;

    /// Handle raw device events.
    fn on_device_events(&mut self, ctx: &Context, state: &mut S, event: &DeviceEvent) -> Out<S>;

    /// Handle window events (cursor, buttons, resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<S>;

    /// Return what to draw this frame.
    fn on_render(&self) -> Render<'_>;

    /// Inspect the rendered frame. The test run ends once every flow passed.
    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut S,
        _texture: &TestImage,
    ) -> anyhow::Result<ImageTestResult> {
        Ok(ImageTestResult::Passed)
    }
}

// Dummy impl to make wasm work
impl<State> Debug for dyn GraphicsFlow<State> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// A flow constructor takes an [`InitContext`] and asynchronously returns a
/// boxed `GraphicsFlow`, so flows can load their assets before the first
/// frame.
pub type FlowConstructor<S> = Box<
    dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow<S>>>>>>,
>;

/// GPU context, shared state and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_texture(&self, extent3d: wgpu::Extent3d) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Golden Image Test Output Texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.ctx.config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_3d_extent(&self) -> wgpu::Extent3d {
        let (width, height) = padded_extent(self.ctx.config.width, self.ctx.config.height);
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    fn render(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State>>],
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] proxy: &EventLoopProxy<FlowEvent<State>>,
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        #[cfg(not(feature = "integration-tests"))]
        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        #[cfg(feature = "integration-tests")]
        let (tex, view, depth) = {
            let extent3d = self.get_test_3d_extent();
            let tex = self.get_test_texture(extent3d);
            let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
            let depth = crate::data_structures::texture::Texture::create_depth_texture(
                &self.ctx.device,
                [extent3d.width, extent3d.height],
                "golden_image_depth_texture",
            );
            (tex, view, depth)
        };
        #[cfg(feature = "integration-tests")]
        let depth_view = &depth.view;
        #[cfg(not(feature = "integration-tests"))]
        let depth_view = &self.ctx.depth_texture.view;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            // The padded test target keeps the window's aspect in its top-left corner
            #[cfg(feature = "integration-tests")]
            render_pass.set_viewport(
                0.0,
                0.0,
                self.ctx.config.width as f32,
                self.ctx.config.height as f32,
                0.0,
                1.0,
            );

            let mut batches = Batches::default();
            graphics_flows
                .iter()
                .for_each(|flow| flow.on_render().set_pipelines(&mut batches));
            log::trace!("drawing {} batches", batches.len());
            batches.draw(&self.ctx, &mut render_pass);
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let extent3d = self.get_test_3d_extent();
            let u32_size = std::mem::size_of::<u32>() as u32;
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Golden Image Readback Buffer"),
                size: (u32_size * extent3d.width * extent3d.height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * extent3d.width),
                        rows_per_image: Some(extent3d.height),
                    },
                },
                extent3d,
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        self.validate_frame(graphics_flows, async_runtime, proxy, &output_buffer);

        #[cfg(not(feature = "integration-tests"))]
        output.present();
        Ok(())
    }

    /// Maps the read-back frame and hands it to every flow. Sends
    /// [`FlowEvent::Exit`] once all of them passed.
    #[cfg(feature = "integration-tests")]
    fn validate_frame(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State>>],
        async_runtime: &Runtime,
        proxy: &EventLoopProxy<FlowEvent<State>>,
        output_buffer: &wgpu::Buffer,
    ) {
        let (width, height) = padded_extent(self.ctx.config.width, self.ctx.config.height);
        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        if let Err(e) = self.ctx.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(Duration::from_secs(3)),
        }) {
            panic!("GPU did not finish the frame: {e}");
        }
        match async_runtime.block_on(rx.receive()) {
            Some(Ok(())) => (),
            other => panic!("Could not map the golden image buffer: {other:?}"),
        }

        let all_passed = {
            let data = buffer_slice.get_mapped_range();
            let img = TestImage::from_raw(width, height, data)
                .expect("readback buffer matches the texture extent");
            let state = &mut self.state;
            graphics_flows
                .iter()
                .map(|flow| flow.render_to_texture(&self.ctx, state, &img))
                .map(|res| match res {
                    Err(e) => panic!("{e}"),
                    Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                    Ok(ImageTestResult::Passed) => true,
                    Ok(ImageTestResult::Waiting) => false,
                })
                .fold(true, |all, passed| all && passed)
        };
        output_buffer.unmap();

        if all_passed {
            proxy
                .send_event(FlowEvent::Exit)
                .expect("All assertions passed but the winit event-loop could not safely exit")
        }
    }
}

/// Texture extent whose rows satisfy wgpu's copy alignment for RGBA8.
#[cfg_attr(not(feature = "integration-tests"), allow(dead_code))]
pub(crate) fn padded_extent(width: u32, height: u32) -> (u32, u32) {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT / 4;
    (width.max(1).div_ceil(align) * align, height.max(1))
}

pub struct App<State: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent<State>>,
    state: Option<AppState<State>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State>>>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConstructor<State>>>,
    last_time: Instant,
}

impl<State: 'static> App<State> {
    fn new(
        event_loop: &EventLoop<FlowEvent<State>>,
        constructors: Vec<FlowConstructor<State>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
        })
    }
}

impl<State: Default + 'static> App<State> {
    /// Runs `on_init` on every flow and sizes the surface after the window.
    fn finish_init(&mut self, mut app_state: AppState<State>) {
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        self.graphics_flows.iter_mut().for_each(|flow| {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(&mut app_state.state, &mut app_state.ctx, out);
        });
        log::info!("{} flows initialised", self.graphics_flows.len());
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(app_state);
    }
}

/// User events sent to the event loop.
pub enum FlowEvent<State: 'static> {
    #[allow(dead_code)]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State>>>,
    },
    #[allow(dead_code)]
    Exit,
}

impl<State> Debug for FlowEvent<State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Exit => f.write_str("Exit"),
        }
    }
}

impl<State: 'static + Default> ApplicationHandler<FlowEvent<State>> for App<State> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("point-globe");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let app_state = AppState::<State>::new(window).await?;
            let flow_futures: Vec<_> = constructors
                .into_iter()
                // Device and Queue are Arcs internally, so this only clones handles
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows = futures::future::join_all(flow_futures)
                .await
                .into_iter()
                .collect::<anyhow::Result<Vec<_>>>()?;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => {
                    self.graphics_flows = flows;
                    self.finish_init(app_state);
                }
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => {
                        log::error!("App initialization failed: {e:#}");
                        FlowEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State>) {
        match event {
            FlowEvent::Initialized { state, flows } => {
                // This is the message from our wasm `spawn_local`
                self.graphics_flows = flows;
                self.finish_init(state);
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        self.graphics_flows.iter_mut().for_each(|f| {
            let out = f.on_device_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(&mut state.state, &mut state.ctx, out);
        });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        // general stuff
        state.ctx.camera.controller.handle_window_events(&event);
        if let WindowEvent::CursorMoved { position, .. } = &event {
            state.ctx.mouse.coords = *position;
        }

        self.graphics_flows.iter_mut().for_each(|f| {
            let out = f.on_window_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(&mut state.state, &mut state.ctx, out);
        });

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                match state.render(
                    &self.graphics_flows,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(_) => {
                        // Update the camera
                        state
                            .ctx
                            .camera
                            .controller
                            .update(&mut state.ctx.camera.camera);
                        state.ctx.update_camera_uniform();
                        // Update the flows
                        self.graphics_flows.iter_mut().for_each(|f| {
                            let out = f.on_update(&state.ctx, &mut state.state, dt);
                            handle_flow_output(&mut state.state, &mut state.ctx, out);
                        });
                    }
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory while acquiring the surface");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn handle_flow_output<State>(state: &mut State, ctx: &mut Context, out: Out<State>) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Mut(f) => f(state),
        Out::Empty => (),
    }
}

/// Installs the logger: `env_logger` natively, the browser console on the
/// web. Later calls are no-ops.
pub fn init_logger() {
    #[cfg(not(target_arch = "wasm32"))]
    let result = env_logger::try_init().map_err(anyhow::Error::from);
    #[cfg(target_arch = "wasm32")]
    let result = console_log::init_with_level(log::Level::Info)
        .map_err(|e| anyhow::anyhow!("{e}"));

    if let Err(e) = result {
        log::debug!("logger already installed: {e}");
    }
}

/// Opens the window and drives `constructors` until the window closes.
pub fn run<State: 'static + Default>(constructors: Vec<FlowConstructor<State>>) -> anyhow::Result<()> {
    init_logger();

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<State>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<State>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        EventLoop::with_user_event().with_any_thread(true).build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent<State>> = EventLoop::with_user_event().build()?;

    let mut app: App<State> = App::new(&event_loop, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_copy_aligned() {
        for width in [1, 63, 64, 65, 800, 1023] {
            let (padded, height) = padded_extent(width, 600);
            assert!(padded >= width);
            assert_eq!((padded * 4) % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
            assert!(padded - width < 64);
            assert_eq!(height, 600);
        }
    }

    #[test]
    fn outputs_are_applied_to_the_shared_state() {
        let mut counter = 0u32;
        let out: Out<u32> = Out::Mut(Box::new(|count| *count += 2));
        match out {
            Out::Mut(f) => f(&mut counter),
            _ => unreachable!(),
        }
        assert_eq!(counter, 2);
        assert!(matches!(Out::<u32>::default(), Out::Empty));
    }
}
