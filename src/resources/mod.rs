//! Asset loading.
//!
//! Native builds read files below [`asset_root`]; wasm builds fetch them
//! relative to the page origin. Image decoding is shared by both.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::data_structures::texture::{ColourSpace, Texture};

/// Environment variable overriding the native asset directory.
pub const ASSETS_ENV: &str = "POINT_GLOBE_ASSETS";

/// Directory the native loader reads from: [`ASSETS_ENV`] when set,
/// `./assets` otherwise.
pub fn asset_root() -> PathBuf {
    std::env::var_os(ASSETS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new("./").join("assets"))
}

pub fn asset_path(root: &Path, file_name: &str) -> PathBuf {
    root.join(file_name)
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(&asset_root(), file_name);
        std::fs::read(&path).with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    colour_space: ColourSpace,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name).await?;
    Texture::from_bytes(device, queue, &data, file_name, colour_space)
}

/// Like [`load_texture`], but a missing or broken image is logged and
/// replaced by a 1x1 texture of `fallback` so the scene still renders.
pub async fn load_texture_or_placeholder(
    file_name: &str,
    colour_space: ColourSpace,
    fallback: [u8; 4],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Texture {
    match load_texture(file_name, colour_space, device, queue).await {
        Ok(texture) => {
            log::info!("Loaded texture {file_name}");
            texture
        }
        Err(e) => {
            log::error!("Failed to load texture {file_name}: {e:#}");
            Texture::placeholder(device, queue, fallback, colour_space, file_name)
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn asset_paths_are_relative_to_the_root() {
        let root = Path::new("/srv/globe");
        assert_eq!(
            asset_path(root, "01_earthbump1k.jpg"),
            PathBuf::from("/srv/globe/01_earthbump1k.jpg")
        );
    }

    #[test]
    fn missing_asset_names_the_file() {
        let err = futures::executor::block_on(load_binary("does-not-exist.png")).unwrap_err();
        assert!(format!("{err:#}").contains("does-not-exist.png"));
    }
}
