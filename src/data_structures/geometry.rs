//! Geodesic sphere geometry for the point cloud and the wireframe shell.
//!
//! The sphere is the 20-face icosahedron with every face split into a
//! triangular lattice of `frequency` segments per edge and every lattice point
//! pushed onto the unit sphere. Lattice points on shared edges and corners are
//! deduplicated by their exact barycentric key, so no float comparison is
//! involved and neighbouring faces always agree.

use std::collections::HashMap;

use cgmath::{InnerSpace, Vector3};

/// Canonical icosahedron corners (golden ratio), normalised on use.
const PHI: f32 = 1.618_034;
const CORNERS: [[f32; 3]; 12] = [
    [-1.0, PHI, 0.0],
    [1.0, PHI, 0.0],
    [-1.0, -PHI, 0.0],
    [1.0, -PHI, 0.0],
    [0.0, -1.0, PHI],
    [0.0, 1.0, PHI],
    [0.0, -1.0, -PHI],
    [0.0, 1.0, -PHI],
    [PHI, 0.0, -1.0],
    [PHI, 0.0, 1.0],
    [-PHI, 0.0, -1.0],
    [-PHI, 0.0, 1.0],
];
const FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Up to three `(corner, weight)` pairs, sorted by corner; unused slots are
/// `(u32::MAX, 0)`.
type LatticeKey = [(u32, u32); 3];

fn lattice_key(face: [u32; 3], weights: [u32; 3]) -> LatticeKey {
    let mut key = [(u32::MAX, 0); 3];
    let mut len = 0;
    for (corner, weight) in face.into_iter().zip(weights) {
        if weight > 0 {
            key[len] = (corner, weight);
            len += 1;
        }
    }
    key[..len].sort_unstable();
    key
}

/// A unit geodesic sphere with shared vertices.
#[derive(Clone, Debug)]
pub struct Icosphere {
    frequency: u32,
    pub positions: Vec<Vector3<f32>>,
    pub triangles: Vec<[u32; 3]>,
}

impl Icosphere {
    /// Subdivides every icosahedron edge into `detail + 1` segments.
    pub fn new(detail: u32) -> Self {
        Self::with_frequency(detail + 1)
    }

    pub fn with_frequency(frequency: u32) -> Self {
        let f = frequency.max(1);
        let corners: Vec<Vector3<f32>> = CORNERS
            .iter()
            .map(|c| Vector3::from(*c).normalize())
            .collect();

        let expected = (10 * f * f + 2) as usize;
        let mut positions = Vec::with_capacity(expected);
        let mut ids: HashMap<LatticeKey, u32> = HashMap::with_capacity(expected);
        let mut triangles = Vec::with_capacity((20 * f * f) as usize);

        for face in FACES {
            let [a, b, c] = face.map(|i| corners[i as usize]);
            let mut vertex = |i: u32, j: u32| -> u32 {
                let weights = [f - i - j, i, j];
                *ids.entry(lattice_key(face, weights)).or_insert_with(|| {
                    let p = (a * weights[0] as f32 + b * weights[1] as f32 + c * weights[2] as f32)
                        / f as f32;
                    positions.push(p.normalize());
                    (positions.len() - 1) as u32
                })
            };
            for i in 0..f {
                for j in 0..(f - i) {
                    let p = vertex(i, j);
                    let q = vertex(i + 1, j);
                    let r = vertex(i, j + 1);
                    triangles.push([p, q, r]);
                    if i + j + 1 < f {
                        let s = vertex(i + 1, j + 1);
                        triangles.push([q, s, r]);
                    }
                }
            }
        }

        Self {
            frequency: f,
            positions,
            triangles,
        }
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Unique undirected edges, each as `[low, high]`, in ascending order.
    pub fn edges(&self) -> Vec<[u32; 2]> {
        let mut edges: Vec<[u32; 2]> = self
            .triangles
            .iter()
            .flat_map(|&[a, b, c]| [[a, b], [b, c], [c, a]])
            .map(|[u, v]| if u < v { [u, v] } else { [v, u] })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }
}

/// Equirectangular texture coordinate of a direction, wgpu convention
/// (`v = 0` is the top row, i.e. the north pole).
pub fn sphere_uv(p: Vector3<f32>) -> [f32; 2] {
    let p = p.normalize();
    let u = p.z.atan2(-p.x) / std::f32::consts::TAU + 0.5;
    let v = 0.5 - p.y.clamp(-1.0, 1.0).asin() / std::f32::consts::PI;
    [u, v]
}

/// One point of the globe's point cloud. Drawn as an instanced sprite.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobePoint {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl GlobePoint {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GlobePoint>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

pub fn globe_points(detail: u32) -> Vec<GlobePoint> {
    Icosphere::new(detail)
        .positions
        .into_iter()
        .map(|p| GlobePoint {
            position: p.into(),
            uv: sphere_uv(p),
        })
        .collect()
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireVertex {
    pub position: [f32; 3],
}

impl WireVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<WireVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Vertices and line-list indices of the wireframe shell.
pub fn wire_shell(detail: u32) -> (Vec<WireVertex>, Vec<u32>) {
    let sphere = Icosphere::new(detail);
    let indices = sphere.edges().into_iter().flatten().collect();
    let vertices = sphere
        .positions
        .into_iter()
        .map(|p| WireVertex { position: p.into() })
        .collect();
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn vertex_and_face_counts_follow_the_geodesic_formula() {
        for f in [1u32, 2, 3, 7] {
            let sphere = Icosphere::with_frequency(f);
            assert_eq!(sphere.positions.len() as u32, 10 * f * f + 2, "frequency {f}");
            assert_eq!(sphere.triangles.len() as u32, 20 * f * f, "frequency {f}");
            assert_eq!(sphere.edges().len() as u32, 30 * f * f, "frequency {f}");
        }
    }

    #[test]
    fn euler_characteristic_is_two() {
        let sphere = Icosphere::new(4);
        let v = sphere.positions.len() as i64;
        let e = sphere.edges().len() as i64;
        let f = sphere.triangles.len() as i64;
        assert_eq!(v - e + f, 2);
    }

    #[test]
    fn detail_zero_is_the_plain_icosahedron() {
        let sphere = Icosphere::new(0);
        assert_eq!(sphere.frequency(), 1);
        assert_eq!(sphere.positions.len(), 12);
        assert_eq!(sphere.triangles.len(), 20);
    }

    #[test]
    fn every_vertex_lies_on_the_unit_sphere() {
        for p in Icosphere::new(6).positions {
            assert_abs_diff_eq!(p.magnitude(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn triangles_are_not_degenerate() {
        let sphere = Icosphere::new(3);
        for [a, b, c] in sphere.triangles {
            assert!(a != b && b != c && c != a);
            let (a, b, c) = (
                sphere.positions[a as usize],
                sphere.positions[b as usize],
                sphere.positions[c as usize],
            );
            assert!((b - a).cross(c - a).magnitude() > 1e-6);
        }
    }

    #[test]
    fn edges_are_sorted_and_unique() {
        let edges = Icosphere::new(2).edges();
        assert!(edges.iter().all(|[u, v]| u < v));
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn uv_puts_the_north_pole_on_the_top_row() {
        let [_, v] = sphere_uv(Vector3::unit_y());
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
        let [_, v] = sphere_uv(-Vector3::unit_y());
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn uv_wraps_longitude_around_the_equator() {
        let [u, v] = sphere_uv(Vector3::new(-1.0, 0.0, 0.0));
        assert_abs_diff_eq!(u, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(v, 0.5, epsilon = 1e-6);
        let [u, _] = sphere_uv(Vector3::new(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(u, 0.75, epsilon = 1e-6);
        let [u, _] = sphere_uv(Vector3::new(0.0, 0.0, -1.0));
        assert_abs_diff_eq!(u, 0.25, epsilon = 1e-6);
    }

    #[test]
    fn uv_ignores_vector_length() {
        let p = Vector3::new(0.3, -0.4, 0.2);
        let [u0, v0] = sphere_uv(p);
        let [u1, v1] = sphere_uv(p * 7.5);
        assert_abs_diff_eq!(u0, u1, epsilon = 1e-6);
        assert_abs_diff_eq!(v0, v1, epsilon = 1e-6);
    }

    #[test]
    fn globe_points_carry_matching_uvs() {
        let points = globe_points(2);
        assert_eq!(points.len(), 10 * 9 + 2);
        for point in points {
            let uv = sphere_uv(point.position.into());
            assert_eq!(point.uv, uv);
            assert!((0.0..=1.0).contains(&point.uv[0]));
            assert!((0.0..=1.0).contains(&point.uv[1]));
        }
    }

    #[test]
    fn wire_shell_indices_form_a_line_list() {
        let (vertices, indices) = wire_shell(1);
        assert_eq!(vertices.len(), 42);
        assert_eq!(indices.len(), 2 * 120);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }
}
