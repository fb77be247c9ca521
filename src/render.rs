//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`] value. The frame loop
//! sorts every flow's renders into per-pipeline [`Batches`] and draws them in a
//! fixed order: stars, then the wireframe shell, then the transparent point
//! cloud.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum flows return from `on_render`
//! - [`Sprites<'a>`] is an instance buffer drawn as camera-facing quads
//! - [`Lines<'a>`] is an indexed line list

use wgpu::RenderPass;

use crate::context::Context;

/// Vertices emitted per sprite instance (two triangles).
pub const QUAD_VERTICES: u32 = 6;

/// Instanced quads: one instance per star or globe point.
#[derive(Clone, Copy, Debug)]
pub struct Sprites<'a> {
    pub instances: &'a wgpu::Buffer,
    pub amount: u32,
    pub group: &'a wgpu::BindGroup,
}

/// An indexed line list with its uniform bind group.
#[derive(Clone, Copy, Debug)]
pub struct Lines<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub amount: u32,
    pub group: &'a wgpu::BindGroup,
}

/// Specifies how a flow should be rendered.
///
/// - `None` renders nothing
/// - `Stars(Sprites)` renders starfield sprites, behind everything else
/// - `Wireframe(Lines)` renders the opaque wireframe shell
/// - `Points(Sprites)` renders the blended globe point cloud
/// - `Composed(Vec<Render>)` recursively renders several of the above
#[derive(Clone, Debug)]
pub enum Render<'a> {
    None,
    Stars(Sprites<'a>),
    Wireframe(Lines<'a>),
    Points(Sprites<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Sorts `self` into the per-pipeline batches.
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Stars(sprites) => batches.stars.push(sprites),
            Render::Wireframe(lines) => batches.wires.push(lines),
            Render::Points(sprites) => batches.points.push(sprites),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Batches<'a> {
    stars: Vec<Sprites<'a>>,
    wires: Vec<Lines<'a>>,
    points: Vec<Sprites<'a>>,
}

impl<'a> Batches<'a> {
    pub(crate) fn len(&self) -> usize {
        self.stars.len() + self.wires.len() + self.points.len()
    }

    /// Records every batch into `render_pass`, one pipeline switch per batch.
    pub(crate) fn draw(self, ctx: &Context, render_pass: &mut RenderPass<'_>) {
        render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);

        render_pass.set_pipeline(&ctx.pipelines.stars);
        for sprites in self.stars {
            draw_sprites(render_pass, sprites);
        }

        render_pass.set_pipeline(&ctx.pipelines.wire);
        for lines in self.wires {
            if lines.amount == 0 {
                log::warn!("you attempted to render a wireframe without indices");
                continue;
            }
            render_pass.set_bind_group(1, lines.group, &[]);
            render_pass.set_vertex_buffer(0, lines.vertex.slice(..));
            render_pass.set_index_buffer(lines.index.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..lines.amount, 0, 0..1);
        }

        render_pass.set_pipeline(&ctx.pipelines.points);
        for sprites in self.points {
            draw_sprites(render_pass, sprites);
        }
    }
}

fn draw_sprites(render_pass: &mut RenderPass<'_>, sprites: Sprites<'_>) {
    if sprites.amount == 0 || sprites.instances.size() == 0 {
        log::warn!("you attempted to render something with zero instances");
        return;
    }
    render_pass.set_bind_group(1, sprites.group, &[]);
    render_pass.set_vertex_buffer(0, sprites.instances.slice(..));
    render_pass.draw(0..QUAD_VERTICES, 0..sprites.amount);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_compositions_produce_no_batches() {
        let mut batches = Batches::default();
        Render::Composed(vec![Render::None, Render::Composed(vec![Render::None])])
            .set_pipelines(&mut batches);
        assert_eq!(batches.len(), 0);
    }
}
