#[cfg(feature = "integration-tests")]
mod common;

/// Renders the default scene without any image assets and checks that the
/// point cloud covers the middle of the frame.
#[test]
#[cfg(feature = "integration-tests")]
fn should_draw_points_over_the_background() {
    use common::test_utils::{FrameCounter, Probe, rgba_at};
    use point_globe::{
        Globe, GlobeConfig, Starfield,
        context::Context,
        flow::{FlowConstructor, GraphicsFlow, ImageTestResult, TestImage},
        resources::ASSETS_ENV,
    };

    // SAFETY: set before the event loop spawns any threads.
    unsafe { std::env::set_var(ASSETS_ENV, "tests/no-such-assets") };

    let config = GlobeConfig::default();
    let star_config = config.clone();
    let stars: FlowConstructor<FrameCounter> = Box::new(move |ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<FrameCounter>> =
                Box::new(Starfield::new(&ctx, &star_config).await);
            Ok(flow)
        })
    });
    let globe: FlowConstructor<FrameCounter> = Box::new(move |ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<FrameCounter>> = Box::new(Probe::new(
                Box::new(Globe::new(&ctx, config).await),
                Box::new(|_: &mut Context| ()),
                Box::new(|ctx: &Context, state: &FrameCounter, texture: &TestImage| {
                    if state.frame() < 2 {
                        return Ok(ImageTestResult::Waiting);
                    }
                    let (cx, cy) = (ctx.config.width / 2, ctx.config.height / 2);
                    let lit = (cx - 16..cx + 16)
                        .flat_map(|x| (cy - 16..cy + 16).map(move |y| (x, y)))
                        .filter(|&(x, y)| rgba_at(ctx, texture, x, y)[..3] != [0, 0, 0])
                        .count();
                    assert!(lit > 0, "no globe points near the centre of the frame");
                    Ok(ImageTestResult::Passed)
                }),
            ));
            Ok(flow)
        })
    });

    golden_image_test!(stars, globe);
}
