//! Hand-tuned parameters for the globe composition.
//!
//! Every visual knob of the scene lives in [`GlobeConfig`]. The three shipped
//! looks are available through [`GlobeConfig::preset`]; they only differ in
//! displacement scale, light intensity, point density and whether the cursor
//! highlight is active.

use std::{fmt, str::FromStr};

use anyhow::anyhow;

/// Environment variable used by [`GlobeConfig::from_env`] to select a preset.
pub const VARIANT_ENV: &str = "POINT_GLOBE_VARIANT";

/// The shipped globe looks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Variant {
    /// Dense points, subtle relief and a cursor-driven rainbow highlight.
    #[default]
    Raycast,
    /// Exaggerated relief with a softer light and no highlight.
    Relief,
    /// Coarse point cloud, nearly flat, dimly lit.
    Sparse,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Raycast, Variant::Relief, Variant::Sparse];
}

impl FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raycast" => Ok(Variant::Raycast),
            "relief" => Ok(Variant::Relief),
            "sparse" => Ok(Variant::Sparse),
            other => Err(anyhow!(
                "unknown globe variant `{other}` (expected raycast, relief or sparse)"
            )),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Raycast => "raycast",
            Variant::Relief => "relief",
            Variant::Sparse => "sparse",
        };
        f.write_str(name)
    }
}

/// Cursor highlight: points within `radius` (in uv units) of the cursor are
/// lifted towards the camera and blended into the highlight map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Highlight {
    pub radius: f32,
    pub lift: f32,
    pub blend: f32,
}

impl Default for Highlight {
    fn default() -> Self {
        Self {
            radius: 0.04,
            lift: 4.0,
            blend: 40.0,
        }
    }
}

/// Image files (relative to the asset root) used by the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureSet {
    pub colour: String,
    pub elevation: String,
    pub ocean_mask: String,
    pub highlight: String,
    pub star_sprite: String,
}

impl Default for TextureSet {
    fn default() -> Self {
        Self {
            colour: "00_earthmap1k.jpg".into(),
            elevation: "01_earthbump1k.jpg".into(),
            ocean_mask: "02_earthspec1k.jpg".into(),
            highlight: "04_rainbow1k.jpg".into(),
            star_sprite: "circle.png".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarfieldConfig {
    pub count: usize,
    pub min_radius: f32,
    pub max_radius: f32,
    pub hue: f32,
    pub saturation: f32,
    /// Sprite size in world units at the reference field of view.
    pub size: f32,
    pub seed: u64,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            count: 5000,
            min_radius: 25.0,
            max_radius: 50.0,
            hue: 0.6,
            saturation: 0.2,
            size: 0.2,
            seed: 0x5eed_57a2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    pub fov_y: cgmath::Deg<f32>,
    pub near: f32,
    pub far: f32,
    pub position: cgmath::Point3<f32>,
    /// Fraction of the pending orbit motion applied per frame.
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: cgmath::Deg(75.0),
            near: 0.1,
            far: 1000.0,
            position: cgmath::Point3::new(0.0, 0.0, 3.5),
            damping: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 1.2,
            max_distance: 60.0,
        }
    }
}

/// Complete description of one globe scene.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobeConfig {
    pub variant: Variant,
    /// Subdivision level of the point cloud (frequency `detail + 1`).
    pub detail: u32,
    /// Subdivision level of the dark wireframe shell under the points.
    pub wire_detail: u32,
    pub radius: f32,
    /// View-space lift of a point per unit of elevation.
    pub displacement: f32,
    /// Point diameter in pixels.
    pub point_size: f32,
    pub light_intensity: f32,
    /// Linear RGB.
    pub sky_colour: [f32; 3],
    /// Linear RGB.
    pub ground_colour: [f32; 3],
    /// Linear RGB.
    pub wire_colour: [f32; 3],
    /// Globe spin about +Y in radians per second.
    pub spin_speed: f32,
    pub highlight: Option<Highlight>,
    /// Alpha of points where the ocean mask is fully set.
    pub ocean_opacity: f32,
    pub clear_colour: wgpu::Color,
    pub textures: TextureSet,
    pub starfield: StarfieldConfig,
    pub camera: CameraConfig,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self::preset(Variant::default())
    }
}

impl GlobeConfig {
    pub fn preset(variant: Variant) -> Self {
        let base = Self {
            variant,
            detail: 120,
            wire_detail: 10,
            radius: 1.0,
            displacement: 0.1,
            point_size: 4.0,
            light_intensity: 10.0,
            sky_colour: [1.0, 1.0, 1.0],
            ground_colour: [0.0024, 0.0024, 0.0144],
            wire_colour: [0.0144, 0.0144, 0.0144],
            // 0.002 rad per frame at 60 fps
            spin_speed: 0.12,
            highlight: Some(Highlight::default()),
            ocean_opacity: 0.2,
            clear_colour: wgpu::Color::BLACK,
            textures: TextureSet::default(),
            starfield: StarfieldConfig::default(),
            camera: CameraConfig::default(),
        };
        match variant {
            Variant::Raycast => base,
            Variant::Relief => Self {
                detail: 90,
                displacement: 0.25,
                light_intensity: 4.0,
                highlight: None,
                ..base
            },
            Variant::Sparse => Self {
                detail: 60,
                displacement: 0.05,
                light_intensity: 2.0,
                highlight: None,
                ..base
            },
        }
    }

    /// Reads [`VARIANT_ENV`]; an unset or unknown value falls back to the
    /// default preset.
    pub fn from_env() -> Self {
        let variant = match std::env::var(VARIANT_ENV) {
            Ok(name) => name.parse().unwrap_or_else(|e| {
                log::warn!("{e}; using {}", Variant::default());
                Variant::default()
            }),
            Err(_) => Variant::default(),
        };
        log::info!("Globe variant: {variant}");
        Self::preset(variant)
    }

    /// Geodesic frequency of the point cloud.
    pub fn point_frequency(&self) -> u32 {
        self.detail + 1
    }

    pub fn wire_frequency(&self) -> u32 {
        self.wire_detail + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variant_names_case_insensitively() {
        assert_eq!("Raycast".parse::<Variant>().unwrap(), Variant::Raycast);
        assert_eq!(" relief ".parse::<Variant>().unwrap(), Variant::Relief);
        assert_eq!("SPARSE".parse::<Variant>().unwrap(), Variant::Sparse);
        assert!("wireframe".parse::<Variant>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>().unwrap(), variant);
        }
    }

    #[test]
    fn only_the_raycast_preset_highlights() {
        assert!(GlobeConfig::preset(Variant::Raycast).highlight.is_some());
        assert!(GlobeConfig::preset(Variant::Relief).highlight.is_none());
        assert!(GlobeConfig::preset(Variant::Sparse).highlight.is_none());
    }

    #[test]
    fn presets_differ_only_in_tuned_parameters() {
        let raycast = GlobeConfig::preset(Variant::Raycast);
        for variant in [Variant::Relief, Variant::Sparse] {
            let other = GlobeConfig::preset(variant);
            assert_ne!(other.detail, raycast.detail);
            assert_ne!(other.displacement, raycast.displacement);
            assert_ne!(other.light_intensity, raycast.light_intensity);
            assert_eq!(other.point_size, raycast.point_size);
            assert_eq!(other.radius, raycast.radius);
            assert_eq!(other.spin_speed, raycast.spin_speed);
            assert_eq!(other.ocean_opacity, raycast.ocean_opacity);
            assert_eq!(other.wire_detail, raycast.wire_detail);
            assert_eq!(other.wire_colour, raycast.wire_colour);
            assert_eq!(other.textures, raycast.textures);
            assert_eq!(other.starfield, raycast.starfield);
            assert_eq!(other.camera, raycast.camera);
        }
    }

    #[test]
    fn raycast_preset_matches_the_reference_look() {
        let config = GlobeConfig::default();
        assert_eq!(config.variant, Variant::Raycast);
        assert_eq!(config.point_frequency(), 121);
        assert_eq!(config.wire_frequency(), 11);
        assert_eq!(config.point_size, 4.0);
        assert_eq!(config.starfield.count, 5000);
        assert!(config.starfield.min_radius <= config.starfield.max_radius);
        assert_eq!(config.camera.position, cgmath::Point3::new(0.0, 0.0, 3.5));
    }

    #[test]
    fn from_env_parses_names_and_falls_back_on_unknown_ones() {
        // The only test touching this variable, so the cases run in sequence.
        let with_env = |value: &str| {
            // SAFETY: no other test reads or writes this variable.
            unsafe { std::env::set_var(VARIANT_ENV, value) };
            GlobeConfig::from_env().variant
        };
        assert_eq!(with_env("Sparse"), Variant::Sparse);
        assert_eq!(with_env("RELIEF"), Variant::Relief);
        assert_eq!(with_env("bogus"), Variant::Raycast);
        unsafe { std::env::remove_var(VARIANT_ENV) };
        assert_eq!(GlobeConfig::from_env().variant, Variant::Raycast);
    }
}
