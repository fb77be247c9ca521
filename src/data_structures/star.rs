//! Procedural starfield: random points in a spherical shell around the scene.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::StarfieldConfig;

/// A single star, uploaded as one sprite instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Star {
    pub position: [f32; 3],
    /// Linear RGB.
    pub colour: [f32; 3],
}

impl Star {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Star>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Scatters `config.count` stars uniformly over directions, with a radius
/// drawn from `[min_radius, max_radius)` and a random lightness.
///
/// The same seed always yields the same sky.
pub fn generate(config: &StarfieldConfig) -> Vec<Star> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (min, max) = (config.min_radius, config.max_radius.max(config.min_radius));
    (0..config.count)
        .map(|_| {
            let radius = if max > min {
                rng.gen_range(min..max)
            } else {
                min
            };
            let theta = TAU * rng.gen_range(0.0f32..1.0);
            let phi = (2.0 * rng.gen_range(0.0f32..1.0) - 1.0).clamp(-1.0, 1.0).acos();
            let position = [
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            ];
            let lightness = rng.gen_range(0.0f32..1.0);
            let colour = hsl_to_rgb(config.hue, config.saturation, lightness).map(srgb_to_linear);
            Star { position, colour }
        })
        .collect()
}

/// HSL (all components in `0..=1`, hue wrapping) to sRGB.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let h = hue.rem_euclid(1.0);
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);
    if s == 0.0 {
        return [l; 3];
    }
    let hi = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let lo = 2.0 * l - hi;
    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            lo + (hi - lo) * 6.0 * t
        } else if t < 0.5 {
            hi
        } else if t < 2.0 / 3.0 {
            lo + (hi - lo) * 6.0 * (2.0 / 3.0 - t)
        } else {
            lo
        }
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
