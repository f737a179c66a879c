//! Geometry descriptors attached to link visuals

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Source of mesh data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeshSource {
    /// Vertex positions and triangle indices supplied directly
    Inline {
        vertices: Vec<[f32; 3]>,
        indices: Vec<u32>,
    },
    /// External file resolved through a resource locator
    Resource { uri: String },
}

/// Primitive geometry description.
///
/// Cylinders, cones and capsules are aligned with the local Z axis and
/// centered on the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Box { size: [f64; 3] },
    Sphere { radius: f64 },
    Cylinder { radius: f64, length: f64 },
    Capsule { radius: f64, length: f64 },
    Cone { radius: f64, length: f64 },
    Mesh { source: MeshSource, scale: [f64; 3] },
    /// Geometry kind the scene cannot draw (octree, heightfield, ...)
    Unsupported { kind: String },
}

impl Geometry {
    /// Short name of the geometry kind, for logs
    pub fn kind_name(&self) -> &str {
        match self {
            Geometry::Box { .. } => "box",
            Geometry::Sphere { .. } => "sphere",
            Geometry::Cylinder { .. } => "cylinder",
            Geometry::Capsule { .. } => "capsule",
            Geometry::Cone { .. } => "cone",
            Geometry::Mesh { .. } => "mesh",
            Geometry::Unsupported { kind } => kind,
        }
    }

    /// Create an inline mesh geometry with unit scale
    pub fn inline_mesh(vertices: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        Geometry::Mesh {
            source: MeshSource::Inline { vertices, indices },
            scale: [1.0; 3],
        }
    }

    /// Create a file-backed mesh geometry with unit scale
    pub fn mesh_resource(uri: impl Into<String>) -> Self {
        Geometry::Mesh {
            source: MeshSource::Resource { uri: uri.into() },
            scale: [1.0; 3],
        }
    }

    /// Local axis-aligned bounds `(min, max)` when known without decoding files
    pub fn local_bounds(&self) -> Option<(DVec3, DVec3)> {
        let half = match self {
            Geometry::Box { size } => DVec3::from(*size) * 0.5,
            Geometry::Sphere { radius } => DVec3::splat(*radius),
            Geometry::Cylinder { radius, length } | Geometry::Cone { radius, length } => {
                DVec3::new(*radius, *radius, length * 0.5)
            }
            Geometry::Capsule { radius, length } => {
                DVec3::new(*radius, *radius, length * 0.5 + radius)
            }
            Geometry::Mesh {
                source: MeshSource::Inline { vertices, .. },
                scale,
            } => {
                let scale = DVec3::from(*scale);
                let mut iter = vertices.iter().map(|v| {
                    DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64) * scale
                });
                let first = iter.next()?;
                let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
                return Some((min, max));
            }
            Geometry::Mesh { .. } | Geometry::Unsupported { .. } => return None,
        };
        if !half.is_finite() {
            return None;
        }
        let half = half.abs();
        Some((-half, half))
    }
}

impl From<&urdf_rs::Geometry> for Geometry {
    fn from(geometry: &urdf_rs::Geometry) -> Self {
        match geometry {
            urdf_rs::Geometry::Box { size } => Geometry::Box { size: size.0 },
            urdf_rs::Geometry::Cylinder { radius, length } => Geometry::Cylinder {
                radius: *radius,
                length: *length,
            },
            urdf_rs::Geometry::Capsule { radius, length } => Geometry::Capsule {
                radius: *radius,
                length: *length,
            },
            urdf_rs::Geometry::Sphere { radius } => Geometry::Sphere { radius: *radius },
            urdf_rs::Geometry::Mesh { filename, scale } => Geometry::Mesh {
                source: MeshSource::Resource {
                    uri: filename.clone(),
                },
                scale: scale.as_ref().map(|s| s.0).unwrap_or([1.0; 3]),
            },
        }
    }
}
