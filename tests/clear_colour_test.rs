#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use common::test_utils::{Blank, FrameCounter, Probe, colour_to_rgba, rgba_at};
    use point_globe::{
        context::Context,
        flow::{FlowConstructor, GraphicsFlow, ImageTestResult, TestImage},
    };
    use wgpu::Color;

    const CLEAR: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 1.0,
        a: 1.0,
    };

    let blank: FlowConstructor<FrameCounter> = Box::new(|_| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<FrameCounter>> = Box::new(Probe::new(
                Box::new(Blank),
                Box::new(|ctx: &mut Context| ctx.clear_colour = CLEAR),
                Box::new(|ctx: &Context, state: &FrameCounter, texture: &TestImage| {
                    if state.frame() == 0 {
                        return Ok(ImageTestResult::Waiting);
                    }
                    let expected = colour_to_rgba(CLEAR);
                    for y in 0..ctx.config.height {
                        for x in 0..ctx.config.width {
                            assert_eq!(rgba_at(ctx, texture, x, y), expected, "pixel ({x}, {y})");
                        }
                    }
                    Ok(ImageTestResult::Passed)
                }),
            ));
            Ok(flow)
        })
    });

    golden_image_test!(blank);
}
