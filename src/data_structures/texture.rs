//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for depth buffers, decoded images, flat placeholders and the
//! procedural star sprite.

use anyhow::*;
use image::GenericImageView;

/// How texel values are interpreted when sampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColourSpace {
    /// Colour images; sampled values are converted to linear light.
    Srgb,
    /// Data images such as elevation or masks; sampled as stored.
    Linear,
}

impl ColourSpace {
    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            ColourSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColourSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A GPU texture with its default view.
///
/// Samplers are created separately with [`create_default_sampler`] and
/// shared between the textures of one bind group.
///
/// Typically created via [`from_bytes`](Self::from_bytes), or via
/// [`create_depth_texture`](Self::create_depth_texture) for the frame's depth
/// attachment.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// A 1x1 texture of a single RGBA colour.
    ///
    /// Stands in for an image that failed to load so the bind group layout
    /// and the shaders stay the same.
    pub fn placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        colour_space: ColourSpace,
        label: &str,
    ) -> Self {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba(rgba),
        ));
        Self::from_image(device, queue, &img, Some(label), colour_space)
    }

    /// A soft white disc on a transparent background, used for star sprites
    /// when no sprite image is available.
    pub fn circle_sprite(device: &wgpu::Device, queue: &wgpu::Queue, size: u32) -> Self {
        let img = image::DynamicImage::ImageRgba8(circle_image(size));
        Self::from_image(device, queue, &img, Some("circle sprite"), ColourSpace::Linear)
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `colour_space` selects sRGB decoding for colour images
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        colour_space: ColourSpace,
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .with_context(|| format!("could not decode image `{label}`"))?;
        Ok(Self::from_image(device, queue, &img, Some(label), colour_space))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        colour_space: ColourSpace,
    ) -> Self {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: colour_space.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }
}

/// Linear filtering; longitude repeats, latitude clamps at the poles.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// White disc with a smooth alpha falloff towards the rim.
pub fn circle_image(size: u32) -> image::RgbaImage {
    let size = size.max(2);
    let centre = (size as f32 - 1.0) / 2.0;
    image::RgbaImage::from_fn(size, size, |x, y| {
        let dx = (x as f32 - centre) / (centre + 0.5);
        let dy = (y as f32 - centre) / (centre + 0.5);
        let d = (dx * dx + dy * dy).sqrt();
        let alpha = (1.0 - d).clamp(0.0, 1.0).powf(0.5);
        image::Rgba([255, 255, 255, (alpha * 255.0).round() as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colour_spaces_pick_matching_formats() {
        assert_eq!(ColourSpace::Srgb.format(), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(ColourSpace::Linear.format(), wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn circle_is_opaque_in_the_middle_and_clear_in_the_corners() {
        let img = circle_image(32);
        assert_eq!(img.dimensions(), (32, 32));
        assert!(img.get_pixel(16, 16)[3] > 200);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
        assert_eq!(img.get_pixel(31, 31)[3], 0);
    }

    #[test]
    fn circle_is_symmetric() {
        let img = circle_image(17);
        for y in 0..17 {
            for x in 0..17 {
                assert_eq!(img.get_pixel(x, y), img.get_pixel(16 - x, 16 - y));
            }
        }
    }
}
