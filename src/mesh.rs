// mesh.rs — 背景球与热点标记的几何体
//
// Background sphere UVs follow the equirectangular percentages of
// `orientation::sphere_to_2d`, so u = x% / 100 and v = y% / 100.

use crate::orientation::camera_direction_from;
use bytemuck::{Pod, Zeroable};
use std::f64::consts::{FRAC_PI_2, PI};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    pub fn vertices(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(&self.uvs)
            .map(|(position, uv)| MeshVertex {
                position: *position,
                uv: *uv,
            })
            .collect()
    }
}

/// Which side of the surface the triangles face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Front faces visible from the centre (panorama background).
    Inward,
    Outward,
}

pub fn build_sphere(radius: f32, lat: usize, lon: usize, facing: Facing) -> SphereMesh {
    let mut positions = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut uvs = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut indices = Vec::with_capacity(lat * lon * 6);

    for i in 0..=lat {
        let v = i as f64 / lat as f64;
        let theta = FRAC_PI_2 - v * PI;

        for j in 0..=lon {
            let u = j as f64 / lon as f64;
            let phi = u * 2.0 * PI - PI;
            let p = camera_direction_from(phi, theta) * radius as f64;

            positions.push([p.x as f32, p.y as f32, p.z as f32]);
            uvs.push([u as f32, v as f32]);
        }
    }

    // 从球心看 (a, b, a+1) 为逆时针
    for i in 0..lat {
        for j in 0..lon {
            let a = (i * (lon + 1) + j) as u32;
            let b = a + (lon + 1) as u32;

            match facing {
                Facing::Inward => indices.extend_from_slice(&[a, b, a + 1, b, b + 1, a + 1]),
                Facing::Outward => indices.extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]),
            }
        }
    }

    SphereMesh {
        positions,
        uvs,
        indices,
    }
}

/// Flat annulus in the XY plane, normal +Z. Drawn without culling.
pub fn build_ring(inner: f32, outer: f32, segments: usize) -> SphereMesh {
    let mut positions = Vec::with_capacity((segments + 1) * 2);
    let mut uvs = Vec::with_capacity((segments + 1) * 2);
    let mut indices = Vec::with_capacity(segments * 6);

    for s in 0..=segments {
        let t = s as f32 / segments as f32;
        let angle = t * std::f32::consts::TAU;
        let (sin, cos) = angle.sin_cos();
        positions.push([inner * cos, inner * sin, 0.0]);
        positions.push([outer * cos, outer * sin, 0.0]);
        uvs.push([t, 0.0]);
        uvs.push([t, 1.0]);
    }

    for s in 0..segments as u32 {
        let i0 = s * 2;
        let o0 = i0 + 1;
        let i1 = i0 + 2;
        let o1 = i0 + 3;
        indices.extend_from_slice(&[i0, o0, i1, i1, o0, o1]);
    }

    SphereMesh {
        positions,
        uvs,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn triangle_normal(mesh: &SphereMesh, tri: usize) -> (Vec3, Vec3) {
        let idx = &mesh.indices[tri * 3..tri * 3 + 3];
        let p: Vec<Vec3> = idx
            .iter()
            .map(|&i| Vec3::from_array(mesh.positions[i as usize]))
            .collect();
        let normal = (p[1] - p[0]).cross(p[2] - p[0]);
        let centroid = (p[0] + p[1] + p[2]) / 3.0;
        (normal, centroid)
    }

    #[test]
    fn test_sphere_counts() {
        let mesh = build_sphere(500.0, 40, 60, Facing::Inward);
        assert_eq!(mesh.positions.len(), 41 * 61);
        assert_eq!(mesh.uvs.len(), mesh.positions.len());
        assert_eq!(mesh.indices.len(), 40 * 60 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
    }

    #[test]
    fn test_vertices_lie_on_radius() {
        let mesh = build_sphere(500.0, 8, 16, Facing::Inward);
        for p in &mesh.positions {
            assert!((Vec3::from_array(*p).length() - 500.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_inward_winding_faces_centre() {
        // With counter-clockwise front faces, the geometric normal of an
        // inward face points back at the origin.
        let mesh = build_sphere(500.0, 8, 16, Facing::Inward);
        // Triangle in the middle band, away from the degenerate pole rows.
        let tri = (4 * 16 + 3) * 2;
        let (normal, centroid) = triangle_normal(&mesh, tri);
        assert!(normal.dot(centroid) < 0.0);

        let mesh = build_sphere(1.0, 8, 16, Facing::Outward);
        let (normal, centroid) = triangle_normal(&mesh, tri);
        assert!(normal.dot(centroid) > 0.0);
    }

    #[test]
    fn test_uv_matches_equirectangular_percent() {
        let mesh = build_sphere(1.0, 4, 8, Facing::Inward);
        // Middle row, middle column is straight ahead (+X), image centre.
        let idx = 2 * 9 + 4;
        let p = Vec3::from_array(mesh.positions[idx]);
        assert!((p - Vec3::X).length() < 1e-5);
        assert_eq!(mesh.uvs[idx], [0.5, 0.5]);
    }

    #[test]
    fn test_ring_radii() {
        let ring = build_ring(15.0, 20.0, 32);
        assert_eq!(ring.indices.len(), 32 * 6);
        for (k, p) in ring.positions.iter().enumerate() {
            let r = Vec3::from_array(*p).length();
            let expected = if k % 2 == 0 { 15.0 } else { 20.0 };
            assert!((r - expected).abs() < 1e-4);
        }
    }
}
