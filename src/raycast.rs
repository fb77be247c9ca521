//! Cursor picking on the globe.
//!
//! The wireframe shell is close enough to a sphere that an analytic
//! ray-sphere test replaces a triangle walk. The hit point is converted to
//! the same texture coordinate the point cloud uses, which is what the
//! highlight in the globe shader compares against.

use cgmath::{EuclideanSpace, InnerSpace, Matrix3, Point3, Rad, Vector2};
use winit::dpi::PhysicalPosition;

use crate::{
    camera::{Camera, Projection, Ray},
    data_structures::geometry::sphere_uv,
};

/// Window pixel position to normalised device coordinates (`y` up).
pub fn cursor_to_ndc(position: PhysicalPosition<f64>, width: u32, height: u32) -> Vector2<f32> {
    let width = f64::from(width.max(1));
    let height = f64::from(height.max(1));
    Vector2::new(
        (position.x / width * 2.0 - 1.0) as f32,
        (-(position.y / height) * 2.0 + 1.0) as f32,
    )
}

/// Distance along `ray` to the nearest sphere surface in front of its origin.
pub fn intersect_sphere(ray: &Ray, centre: Point3<f32>, radius: f32) -> Option<f32> {
    let direction = ray.direction.normalize();
    let oc = ray.origin - centre;
    let b = oc.dot(direction);
    let c = oc.magnitude2() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    [-b - root, -b + root].into_iter().find(|t| *t >= 0.0)
}

/// Texture coordinate under `ray` on a globe of `radius` centred at the
/// origin and spun by `rotation_y` about +Y.
pub fn globe_uv_under_cursor(ray: &Ray, rotation_y: f32, radius: f32) -> Option<[f32; 2]> {
    let to_local = Matrix3::from_angle_y(Rad(-rotation_y));
    let local = Ray {
        origin: Point3::from_vec(to_local * ray.origin.to_vec()),
        direction: (to_local * ray.direction).normalize(),
    };
    let t = intersect_sphere(&local, Point3::origin(), radius)?;
    Some(sphere_uv(local.at(t).to_vec()))
}

/// Highlight coordinate that sticks to the last point the cursor touched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorHighlight {
    uv: [f32; 2],
    hit: bool,
}

impl CursorHighlight {
    pub fn uv(&self) -> [f32; 2] {
        self.uv
    }

    /// Whether the last cast hit the globe.
    pub fn is_over_globe(&self) -> bool {
        self.hit
    }

    /// Casts from the camera through the cursor. A miss keeps the previous
    /// coordinate.
    pub fn track(
        &mut self,
        camera: &Camera,
        projection: &Projection,
        ndc: Vector2<f32>,
        rotation_y: f32,
        radius: f32,
    ) -> bool {
        let ray = camera.ray_from_ndc(ndc, projection);
        match globe_uv_under_cursor(&ray, rotation_y, radius) {
            Some(uv) => {
                self.uv = uv;
                self.hit = true;
            }
            None => self.hit = false,
        }
        self.hit
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;
    use cgmath::{Deg, Vector3};

    use super::*;

    fn toward_origin() -> Ray {
        Ray {
            origin: Point3::new(0.0, 0.0, 3.5),
            direction: -Vector3::unit_z(),
        }
    }

    #[test]
    fn cursor_corners_map_to_ndc_corners() {
        let ndc = cursor_to_ndc(PhysicalPosition::new(0.0, 0.0), 800, 600);
        assert_eq!(ndc, Vector2::new(-1.0, 1.0));
        let ndc = cursor_to_ndc(PhysicalPosition::new(800.0, 600.0), 800, 600);
        assert_eq!(ndc, Vector2::new(1.0, -1.0));
        let ndc = cursor_to_ndc(PhysicalPosition::new(400.0, 300.0), 800, 600);
        assert_eq!(ndc, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn ray_hits_the_near_side_first() {
        let t = intersect_sphere(&toward_origin(), Point3::origin(), 1.0).unwrap();
        assert_abs_diff_eq!(t, 2.5, epsilon = 1e-5);
    }

    #[test]
    fn ray_from_inside_hits_the_far_side() {
        let ray = Ray {
            origin: Point3::origin(),
            direction: Vector3::unit_x(),
        };
        let t = intersect_sphere(&ray, Point3::origin(), 1.0).unwrap();
        assert_abs_diff_eq!(t, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn sphere_behind_the_ray_is_missed() {
        let ray = Ray {
            origin: Point3::new(0.0, 0.0, 3.5),
            direction: Vector3::unit_z(),
        };
        assert_eq!(intersect_sphere(&ray, Point3::origin(), 1.0), None);
    }

    #[test]
    fn passing_ray_is_missed() {
        let ray = Ray {
            origin: Point3::new(0.0, 1.5, 3.5),
            direction: -Vector3::unit_z(),
        };
        assert_eq!(intersect_sphere(&ray, Point3::origin(), 1.0), None);
        assert_eq!(globe_uv_under_cursor(&ray, 0.0, 1.0), None);
    }

    #[test]
    fn unrotated_globe_faces_the_camera_with_u_three_quarters() {
        let [u, v] = globe_uv_under_cursor(&toward_origin(), 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(u, 0.75, epsilon = 1e-5);
        assert_abs_diff_eq!(v, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn spinning_the_globe_shifts_longitude() {
        let [u, v] = globe_uv_under_cursor(&toward_origin(), FRAC_PI_2, 1.0).unwrap();
        assert_abs_diff_eq!(u, 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(v, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn highlight_keeps_the_last_hit_on_a_miss() {
        let camera = Camera::new((0.0, 0.0, 3.5));
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        let mut highlight = CursorHighlight::default();

        assert!(highlight.track(&camera, &projection, Vector2::new(0.0, 0.0), 0.0, 1.0));
        let hit = highlight.uv();
        assert_abs_diff_eq!(hit[0], 0.75, epsilon = 1e-5);

        assert!(!highlight.track(&camera, &projection, Vector2::new(1.0, 1.0), 0.0, 1.0));
        assert!(!highlight.is_over_globe());
        assert_eq!(highlight.uv(), hit);
    }

    #[test]
    fn cursor_above_centre_picks_a_northern_point() {
        let camera = Camera::new((0.0, 0.0, 3.5));
        let projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
        let mut highlight = CursorHighlight::default();
        assert!(highlight.track(&camera, &projection, Vector2::new(0.0, 0.2), 0.0, 1.0));
        assert!(highlight.uv()[1] < 0.5);
    }
}
