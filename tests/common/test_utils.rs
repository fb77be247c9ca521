use instant::Duration;
use point_globe::{
    DeviceEvent, WindowEvent,
    context::Context,
    flow::{GraphicsFlow, ImageTestResult, Out, TestImage},
    render::Render,
};

/// Shared test state: the number of frames that finished `on_update`.
#[derive(Debug, Default)]
pub struct FrameCounter(u32);

impl FrameCounter {
    pub fn frame(&self) -> u32 {
        self.0
    }

    pub fn progress(&mut self) {
        self.0 += 1;
    }
}

pub type Setup = Box<dyn FnOnce(&mut Context)>;
pub type Validate =
    Box<dyn Fn(&Context, &FrameCounter, &TestImage) -> anyhow::Result<ImageTestResult>>;

/// Wraps a flow, applies `setup` after the flow's own `on_init`, counts
/// frames and checks every read-back frame with `validate`.
pub struct Probe {
    inner: Box<dyn GraphicsFlow<FrameCounter>>,
    setup: Option<Setup>,
    validate: Validate,
}

impl Probe {
    pub fn new(inner: Box<dyn GraphicsFlow<FrameCounter>>, setup: Setup, validate: Validate) -> Self {
        Self {
            inner,
            setup: Some(setup),
            validate,
        }
    }
}

impl GraphicsFlow<FrameCounter> for Probe {
    fn on_init(&mut self, ctx: &mut Context, state: &mut FrameCounter) -> Out<FrameCounter> {
        let inner = self.inner.on_init(ctx, state);
        let setup = self.setup.take();
        match inner {
            Out::Configure(configure) => Out::Configure(Box::new(move |ctx: &mut Context| {
                configure(ctx);
                if let Some(setup) = setup {
                    setup(ctx);
                }
            })),
            Out::Mut(f) => {
                f(state);
                Out::Configure(Box::new(move |ctx: &mut Context| {
                    if let Some(setup) = setup {
                        setup(ctx);
                    }
                }))
            }
            Out::Empty => Out::Configure(Box::new(move |ctx: &mut Context| {
                if let Some(setup) = setup {
                    setup(ctx);
                }
            })),
        }
    }

    fn on_update(&mut self, ctx: &Context, state: &mut FrameCounter, dt: Duration) -> Out<FrameCounter> {
        state.progress();
        self.inner.on_update(ctx, state, dt)
    }

    fn on_device_events(
        &mut self,
        ctx: &Context,
        state: &mut FrameCounter,
        event: &DeviceEvent,
    ) -> Out<FrameCounter> {
        self.inner.on_device_events(ctx, state, event)
    }

    fn on_window_events(
        &mut self,
        ctx: &Context,
        state: &mut FrameCounter,
        event: &WindowEvent,
    ) -> Out<FrameCounter> {
        self.inner.on_window_events(ctx, state, event)
    }

    fn on_render(&self) -> Render<'_> {
        self.inner.on_render()
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &TestImage,
    ) -> anyhow::Result<ImageTestResult> {
        (self.validate)(ctx, state, texture)
    }
}

/// A flow that draws nothing.
pub struct Blank;

impl<S> GraphicsFlow<S> for Blank {
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
        Render::None
    }
}

/// Pixel at `(x, y)` in RGBA order, whatever the surface's channel order.
pub fn rgba_at(ctx: &Context, texture: &TestImage, x: u32, y: u32) -> [u8; 4] {
    let [a, b, c, d] = texture.get_pixel(x, y).0;
    match ctx.config.format {
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => [c, b, a, d],
        _ => [a, b, c, d],
    }
}

pub fn colour_to_rgba(colour: wgpu::Color) -> [u8; 4] {
    let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [
        f_to_u8(colour.r),
        f_to_u8(colour.g),
        f_to_u8(colour.b),
        f_to_u8(colour.a),
    ]
}

#[macro_export]
macro_rules! golden_image_test {
    ($($constructor:expr),+ $(,)?) => {{
        use point_globe::flow::FlowConstructor;
        use $crate::common::test_utils::FrameCounter;

        let constructors: Vec<FlowConstructor<FrameCounter>> = vec![$($constructor),+];
        point_globe::flow::run(constructors).expect("Failed to run flow for integration test.");
    }};
}
