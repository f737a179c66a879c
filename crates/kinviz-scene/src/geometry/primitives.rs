//! Tessellation of primitive shapes.
//!
//! Round shapes are aligned with +Z and centered on the origin.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec3;

use super::MeshVertex;

type Buffers = (Vec<MeshVertex>, Vec<u32>);

fn vertex(position: Vec3, normal: Vec3) -> MeshVertex {
    MeshVertex {
        position: position.to_array(),
        normal: normal.normalize_or_zero().to_array(),
    }
}

/// Box with flat-shaded faces
pub fn box_mesh(size: Vec3) -> Buffers {
    let h = size * 0.5;
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (normal + u * su + v * sv) * h;
            vertices.push(vertex(p, normal));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// UV sphere, optionally restricted to a polar band `[phi_start, phi_end]`
/// and shifted along Z
fn sphere_band(
    radius: f32,
    segments: u32,
    rings: u32,
    phi_start: f32,
    phi_end: f32,
    z_offset: f32,
    out: &mut Buffers,
) {
    let (vertices, indices) = out;
    let base = vertices.len() as u32;

    for ring in 0..=rings {
        let phi = phi_start + (phi_end - phi_start) * ring as f32 / rings as f32;
        let z = phi.cos();
        let ring_radius = phi.sin();

        for seg in 0..=segments {
            let theta = TAU * seg as f32 / segments as f32;
            let n = Vec3::new(ring_radius * theta.cos(), ring_radius * theta.sin(), z);
            vertices.push(vertex(n * radius + Vec3::Z * z_offset, n));
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = base + ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }
}

pub fn sphere(radius: f32, segments: u32, rings: u32) -> Buffers {
    let mut out = (Vec::new(), Vec::new());
    sphere_band(radius, segments, rings, 0.0, PI, 0.0, &mut out);
    out
}

/// Open tube between `z0` and `z1` whose radius goes from `r0` to `r1`
fn tube(r0: f32, r1: f32, z0: f32, z1: f32, segments: u32, out: &mut Buffers) {
    let (vertices, indices) = out;
    let base = vertices.len() as u32;
    // Slope of the side wall feeds into the normal
    let slope = (r0 - r1) / (z1 - z0);

    for seg in 0..=segments {
        let theta = TAU * seg as f32 / segments as f32;
        let (s, c) = theta.sin_cos();
        let normal = Vec3::new(c, s, slope);
        vertices.push(vertex(Vec3::new(r0 * c, r0 * s, z0), normal));
        vertices.push(vertex(Vec3::new(r1 * c, r1 * s, z1), normal));
    }

    for seg in 0..segments {
        let i = base + seg * 2;
        indices.extend_from_slice(&[i, i + 2, i + 1]);
        indices.extend_from_slice(&[i + 1, i + 2, i + 3]);
    }
}

/// Flat disk at height `z` facing `+Z` or `-Z`
fn disk(radius: f32, z: f32, up: bool, segments: u32, out: &mut Buffers) {
    let (vertices, indices) = out;
    let normal = if up { Vec3::Z } else { Vec3::NEG_Z };
    let center = vertices.len() as u32;
    vertices.push(vertex(Vec3::new(0.0, 0.0, z), normal));

    for seg in 0..=segments {
        let theta = TAU * seg as f32 / segments as f32;
        vertices.push(vertex(Vec3::new(radius * theta.cos(), radius * theta.sin(), z), normal));
    }

    for seg in 0..segments {
        let a = center + 1 + seg;
        if up {
            indices.extend_from_slice(&[center, a, a + 1]);
        } else {
            indices.extend_from_slice(&[center, a + 1, a]);
        }
    }
}

pub fn cylinder(radius: f32, length: f32, segments: u32) -> Buffers {
    let half = length * 0.5;
    let mut out = (Vec::new(), Vec::new());
    tube(radius, radius, -half, half, segments, &mut out);
    disk(radius, half, true, segments, &mut out);
    disk(radius, -half, false, segments, &mut out);
    out
}

/// Cone with its apex at `+length / 2`
pub fn cone(radius: f32, length: f32, segments: u32) -> Buffers {
    let half = length * 0.5;
    let mut out = (Vec::new(), Vec::new());
    tube(radius, 0.0, -half, half, segments, &mut out);
    disk(radius, -half, false, segments, &mut out);
    out
}

/// Cylinder body of `length` capped by two hemispheres
pub fn capsule(radius: f32, length: f32, segments: u32, rings: u32) -> Buffers {
    let half = length * 0.5;
    let hemisphere_rings = (rings / 2).max(1);
    let mut out = (Vec::new(), Vec::new());
    tube(radius, radius, -half, half, segments, &mut out);
    sphere_band(radius, segments, hemisphere_rings, 0.0, FRAC_PI_2, half, &mut out);
    sphere_band(radius, segments, hemisphere_rings, FRAC_PI_2, PI, -half, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn extent(vertices: &[MeshVertex]) -> (Vec3, Vec3) {
        vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), v| {
                let p = Vec3::from(v.position);
                (min.min(p), max.max(p))
            },
        )
    }

    fn indices_valid((vertices, indices): &Buffers) -> bool {
        indices.len() % 3 == 0 && indices.iter().all(|&i| (i as usize) < vertices.len())
    }

    #[test]
    fn test_box_extent() {
        let buffers = box_mesh(Vec3::new(1.0, 2.0, 4.0));
        assert_eq!(buffers.0.len(), 24);
        assert_eq!(buffers.1.len(), 36);
        let (min, max) = extent(&buffers.0);
        assert_eq!(max, Vec3::new(0.5, 1.0, 2.0));
        assert_eq!(min, -max);
    }

    #[test]
    fn test_round_shapes_extent() {
        let (min, max) = extent(&sphere(0.5, 16, 8).0);
        assert_abs_diff_eq!(max.z, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(min.z, -0.5, epsilon = 1e-6);

        let (min, max) = extent(&cylinder(0.1, 2.0, 16).0);
        assert_abs_diff_eq!(max.z, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(min.z, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(max.x, 0.1, epsilon = 1e-6);

        let (_, max) = extent(&capsule(0.1, 1.0, 16, 8).0);
        assert_abs_diff_eq!(max.z, 0.6, epsilon = 1e-6);

        let (min, max) = extent(&cone(0.2, 1.0, 16).0);
        assert_abs_diff_eq!(max.z, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(min.z, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_indices_in_range() {
        assert!(indices_valid(&box_mesh(Vec3::ONE)));
        assert!(indices_valid(&sphere(1.0, 12, 6)));
        assert!(indices_valid(&cylinder(1.0, 1.0, 12)));
        assert!(indices_valid(&cone(1.0, 1.0, 12)));
        assert!(indices_valid(&capsule(1.0, 1.0, 12, 6)));
    }
}
