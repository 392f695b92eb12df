use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::config::Shape;
use crate::scene::{MeshData, Vertex};

/// Generate the mesh for a configured shape
pub fn build_shape(shape: &Shape) -> MeshData {
    match *shape {
        Shape::Box { width, height, depth } => box_mesh(width, height, depth),
        Shape::Sphere {
            radius,
            width_segments,
            height_segments,
        } => sphere_mesh(radius, width_segments, height_segments),
        Shape::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
        } => cylinder_mesh(radius_top, radius_bottom, height, radial_segments),
    }
}

fn vertex(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Vertex {
    Vertex {
        position: position.to_array(),
        normal: normal.to_array(),
        uv,
    }
}

/// Axis-aligned box centred on the origin; each face maps the full texture
pub fn box_mesh(width: f32, height: f32, depth: f32) -> MeshData {
    let size = Vec3::new(width, height, depth);
    // (normal, right, up) as seen from outside the face
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, right, up) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + right * su + up * sv) * 0.5 * size;
            // Texture rows run top to bottom
            let uv = [(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5];
            vertices.push(vertex(position, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new(vertices, indices)
}

/// UV sphere with poles on the Y axis
pub fn sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);
    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        let (sin_phi, cos_phi) = (v * PI).sin_cos();
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let (sin_theta, cos_theta) = (u * TAU).sin_cos();
            let normal = Vec3::new(-cos_theta * sin_phi, cos_phi, sin_theta * sin_phi);
            vertices.push(vertex(normal * radius, normal, [u, v]));
        }
    }

    let row = ws + 1;
    let mut indices = Vec::new();
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    MeshData::new(vertices, indices)
}

/// Capped cylinder (or cone) along Y, centred on the origin
pub fn cylinder_mesh(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> MeshData {
    let segments = radial_segments.max(3);
    let half = height * 0.5;
    let slope = if height > 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };

    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    // Side: top ring then bottom ring
    for (v, radius) in [(0.0, radius_top), (1.0, radius_bottom)] {
        let y = half - v * height;
        for x in 0..=segments {
            let u = x as f32 / segments as f32;
            let (sin, cos) = (u * TAU).sin_cos();
            let normal = Vec3::new(sin, slope, cos).normalize_or_zero();
            vertices.push(vertex(Vec3::new(radius * sin, y, radius * cos), normal, [u, v]));
        }
    }
    let row = segments + 1;
    for x in 0..segments {
        let a = x;
        let b = row + x;
        let c = row + x + 1;
        let d = x + 1;
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    for (top, radius) in [(true, radius_top), (false, radius_bottom)] {
        if radius <= 0.0 {
            continue;
        }
        let (y, normal) = if top { (half, Vec3::Y) } else { (-half, Vec3::NEG_Y) };
        let center = vertices.len() as u32;
        vertices.push(vertex(Vec3::new(0.0, y, 0.0), normal, [0.5, 0.5]));
        for x in 0..=segments {
            let (sin, cos) = (x as f32 / segments as f32 * TAU).sin_cos();
            let uv = [sin * 0.5 + 0.5, cos * 0.5 + 0.5];
            vertices.push(vertex(Vec3::new(radius * sin, y, radius * cos), normal, uv));
        }
        for x in 0..segments {
            let i = center + 1 + x;
            if top {
                indices.extend_from_slice(&[center, i, i + 1]);
            } else {
                indices.extend_from_slice(&[center, i + 1, i]);
            }
        }
    }

    MeshData::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every non-degenerate triangle winds counter-clockwise around its vertex normals
    fn assert_outward_winding(mesh: &MeshData) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| &mesh.vertices[i as usize]);
            let pa = Vec3::from_array(a.position);
            let face = (Vec3::from_array(b.position) - pa).cross(Vec3::from_array(c.position) - pa);
            if face.length() < 1e-6 {
                continue;
            }
            let normal = Vec3::from_array(a.normal) + Vec3::from_array(b.normal) + Vec3::from_array(c.normal);
            assert!(face.dot(normal) > 0.0, "triangle {:?} winds inward", tri);
        }
    }

    fn assert_indices_in_range(mesh: &MeshData) {
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn box_has_six_quads() {
        let mesh = box_mesh(3.0, 3.0, 3.0);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_indices_in_range(&mesh);
        assert_outward_winding(&mesh);

        for v in &mesh.vertices {
            for c in v.position {
                assert_eq!(c.abs(), 1.5);
            }
        }
    }

    #[test]
    fn box_respects_each_dimension() {
        let mesh = box_mesh(2.0, 4.0, 6.0);
        let max = mesh
            .vertices
            .iter()
            .fold(Vec3::ZERO, |m, v| m.max(Vec3::from_array(v.position)));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = sphere_mesh(2.0, 10, 10);
        assert_eq!(mesh.vertices.len(), 11 * 11);
        assert_eq!(mesh.triangle_count(), 10 * (2 * 10 - 2));
        assert_indices_in_range(&mesh);
        assert_outward_winding(&mesh);

        for v in &mesh.vertices {
            assert!((Vec3::from_array(v.position).length() - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_clamps_segment_counts() {
        let mesh = sphere_mesh(1.0, 0, 0);
        assert_eq!(mesh.vertices.len(), 4 * 3);
    }

    #[test]
    fn cylinder_has_side_and_caps() {
        let mesh = cylinder_mesh(2.0, 2.0, 3.0, 10);
        // Side quads plus two fans
        assert_eq!(mesh.triangle_count(), 10 * 2 + 10 * 2);
        assert_indices_in_range(&mesh);
        assert_outward_winding(&mesh);

        let ys: Vec<f32> = mesh.vertices.iter().map(|v| v.position[1]).collect();
        assert!(ys.iter().all(|y| y.abs() <= 1.5 + 1e-6));
    }

    #[test]
    fn cone_skips_the_point_cap() {
        let mesh = cylinder_mesh(0.0, 1.0, 2.0, 8);
        assert_eq!(mesh.triangle_count(), 8 * 2 + 8);
        assert_outward_winding(&mesh);
    }

    #[test]
    fn build_shape_dispatches() {
        let mesh = build_shape(&Shape::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        });
        assert_eq!(mesh.vertices.len(), 24);
    }
}
