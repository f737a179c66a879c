//! Conversion of geometry descriptors into renderable surfaces

mod bounds;
pub mod primitives;

pub use bounds::*;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use kinviz_core::{
    Geometry, MeshError, MeshSource, RawMesh, ResourceError, ResourceLocator, decode_mesh,
};

/// Vertex of a built surface
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Triangle surface in the frame of its visual
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub bounds: BoundingBox,
    /// True for the unit marker substituted for unbuildable geometry
    pub fallback: bool,
}

impl Surface {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let bounds = BoundingBox::from_points(vertices.iter().map(|v| Vec3::from(v.position)));
        Self {
            vertices,
            indices,
            bounds,
            fallback: false,
        }
    }

    /// Build from positions, with area-weighted smooth normals
    pub fn from_positions(positions: &[[f32; 3]], indices: Vec<u32>, scale: Vec3) -> Self {
        let points: Vec<Vec3> = positions.iter().map(|p| Vec3::from(*p) * scale).collect();
        let mut normals = vec![Vec3::ZERO; points.len()];
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let face = (points[b] - points[a]).cross(points[c] - points[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        let vertices = points
            .iter()
            .zip(&normals)
            .map(|(p, n)| MeshVertex {
                position: p.to_array(),
                normal: n.normalize_or_zero().to_array(),
            })
            .collect();
        Self::new(vertices, indices)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Why a visual could not be built; never propagated past the builder
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Invalid {kind} parameters: {reason}")]
    InvalidParameters { kind: String, reason: String },

    #[error("Unsupported geometry kind: {0}")]
    Unsupported(String),

    #[error("Failed to resolve mesh: {0}")]
    Resource(#[from] ResourceError),

    #[error("Failed to decode mesh: {0}")]
    Mesh(#[from] MeshError),
}

/// Result of [`GeometryBuilder::build`]: always a surface, maybe with a warning
#[derive(Debug, Clone)]
pub struct BuiltSurface {
    pub surface: Surface,
    pub warning: Option<GeometryError>,
}

/// Converts geometry descriptors into triangle surfaces
pub struct GeometryBuilder<'a> {
    locator: &'a dyn ResourceLocator,
    resolution: u32,
    fallback_size: f32,
}

impl<'a> GeometryBuilder<'a> {
    pub fn new(locator: &'a dyn ResourceLocator) -> Self {
        Self {
            locator,
            resolution: 24,
            fallback_size: 0.05,
        }
    }

    /// Segments around round shapes (clamped to at least 3)
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution.max(3);
        self
    }

    /// Edge length of the fallback marker cube
    pub fn with_fallback_size(mut self, size: f32) -> Self {
        self.fallback_size = size;
        self
    }

    /// Build `geometry`, substituting the fallback marker on failure
    pub fn build(&self, geometry: &Geometry) -> BuiltSurface {
        match self.try_build(geometry) {
            Ok(surface) => BuiltSurface {
                surface,
                warning: None,
            },
            Err(e) => {
                tracing::warn!(kind = geometry.kind_name(), error = %e, "Using fallback marker");
                BuiltSurface {
                    surface: self.fallback(),
                    warning: Some(e),
                }
            }
        }
    }

    /// Unit marker standing in for unbuildable geometry
    pub fn fallback(&self) -> Surface {
        let (vertices, indices) = primitives::box_mesh(Vec3::splat(self.fallback_size));
        Surface {
            fallback: true,
            ..Surface::new(vertices, indices)
        }
    }

    pub fn try_build(&self, geometry: &Geometry) -> Result<Surface, GeometryError> {
        let segments = self.resolution;
        let rings = (segments / 2).max(2);

        let (vertices, indices) = match geometry {
            Geometry::Box { size } => {
                let size = positive(geometry, "size", size)?;
                primitives::box_mesh(Vec3::from_array(size))
            }
            Geometry::Sphere { radius } => {
                let [r] = positive(geometry, "radius", &[*radius])?;
                primitives::sphere(r, segments, rings)
            }
            Geometry::Cylinder { radius, length } => {
                let [r, l] = positive(geometry, "radius/length", &[*radius, *length])?;
                primitives::cylinder(r, l, segments)
            }
            Geometry::Cone { radius, length } => {
                let [r, l] = positive(geometry, "radius/length", &[*radius, *length])?;
                primitives::cone(r, l, segments)
            }
            Geometry::Capsule { radius, length } => {
                let [r] = positive(geometry, "radius", &[*radius])?;
                if !(length.is_finite() && *length >= 0.0) {
                    return Err(invalid(geometry, format!("length must be >= 0, got {length}")));
                }
                primitives::capsule(r, *length as f32, segments, rings)
            }
            Geometry::Mesh { source, scale } => {
                let scale = Vec3::from_array(finite(geometry, "scale", scale)?);
                if scale.cmpeq(Vec3::ZERO).any() {
                    return Err(invalid(geometry, "scale has a zero component".into()));
                }
                let mesh = self.mesh_buffers(source)?;
                return Ok(Surface::from_positions(&mesh.vertices, mesh.indices, scale));
            }
            Geometry::Unsupported { kind } => return Err(GeometryError::Unsupported(kind.clone())),
        };
        Ok(Surface::new(vertices, indices))
    }

    fn mesh_buffers(&self, source: &MeshSource) -> Result<RawMesh, GeometryError> {
        match source {
            MeshSource::Inline { vertices, indices } => {
                let mesh = RawMesh {
                    vertices: vertices.clone(),
                    indices: indices.clone(),
                };
                mesh.validate()?;
                if mesh.indices.len() % 3 != 0 {
                    return Err(GeometryError::InvalidParameters {
                        kind: "mesh".into(),
                        reason: format!("{} indices is not a triangle list", mesh.indices.len()),
                    });
                }
                Ok(mesh)
            }
            MeshSource::Resource { uri } => {
                let bytes = self.locator.locate(uri)?;
                let mesh = decode_mesh(uri, &bytes)?;
                tracing::debug!(uri = %uri, triangles = mesh.triangle_count(), "Decoded mesh");
                Ok(mesh)
            }
        }
    }
}

fn invalid(geometry: &Geometry, reason: String) -> GeometryError {
    GeometryError::InvalidParameters {
        kind: geometry.kind_name().to_string(),
        reason,
    }
}

fn finite<const N: usize>(
    geometry: &Geometry,
    what: &str,
    values: &[f64; N],
) -> Result<[f32; N], GeometryError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(values.map(|v| v as f32))
    } else {
        Err(invalid(geometry, format!("{what} must be finite, got {values:?}")))
    }
}

fn positive<const N: usize>(
    geometry: &Geometry,
    what: &str,
    values: &[f64; N],
) -> Result<[f32; N], GeometryError> {
    let values = finite(geometry, what, values)?;
    if values.iter().all(|&v| v > 0.0) {
        Ok(values)
    } else {
        Err(invalid(geometry, format!("{what} must be positive, got {values:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinviz_core::MemoryResourceLocator;

    const TRIANGLE_STL: &str = "solid t
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 1 0 0
vertex 0 1 0
endloop
endfacet
endsolid t
";

    fn locator() -> MemoryResourceLocator {
        MemoryResourceLocator::new().with_entry("meshes/tri.stl", TRIANGLE_STL)
    }

    #[test]
    fn test_primitives_build() {
        let locator = locator();
        let builder = GeometryBuilder::new(&locator).with_resolution(8);
        for geometry in [
            Geometry::Box { size: [1.0, 1.0, 1.0] },
            Geometry::Sphere { radius: 0.5 },
            Geometry::Cylinder { radius: 0.1, length: 1.0 },
            Geometry::Capsule { radius: 0.1, length: 0.0 },
            Geometry::Cone { radius: 0.1, length: 1.0 },
        ] {
            let built = builder.build(&geometry);
            assert!(built.warning.is_none(), "{geometry:?}");
            assert!(!built.surface.fallback);
            assert!(built.surface.triangle_count() > 0);
        }
    }

    #[test]
    fn test_mesh_file_with_scale() {
        let locator = locator();
        let builder = GeometryBuilder::new(&locator);
        let geometry = Geometry::Mesh {
            source: MeshSource::Resource {
                uri: "meshes/tri.stl".into(),
            },
            scale: [2.0, 2.0, 2.0],
        };
        let built = builder.build(&geometry);
        assert!(built.warning.is_none());
        assert_eq!(built.surface.triangle_count(), 1);
        assert_eq!(built.surface.bounds.max, Vec3::new(2.0, 2.0, 0.0));
        assert_eq!(built.surface.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_failures_fall_back() {
        let locator = locator();
        let builder = GeometryBuilder::new(&locator).with_fallback_size(0.1);
        let cases = [
            Geometry::Sphere { radius: -1.0 },
            Geometry::Box { size: [1.0, f64::NAN, 1.0] },
            Geometry::mesh_resource("meshes/missing.stl"),
            Geometry::mesh_resource("meshes/tri.dae"),
            Geometry::inline_mesh(vec![[0.0; 3]], vec![0, 1, 2]),
            Geometry::Unsupported { kind: "octree".into() },
        ];
        for geometry in &cases {
            let built = builder.build(geometry);
            assert!(built.warning.is_some(), "{geometry:?}");
            assert!(built.surface.fallback);
            assert_eq!(built.surface.bounds.size(), Vec3::splat(0.1));
        }
    }

    #[test]
    fn test_warning_kinds() {
        let locator = locator();
        let builder = GeometryBuilder::new(&locator);
        assert!(matches!(
            builder.try_build(&Geometry::mesh_resource("meshes/missing.stl")),
            Err(GeometryError::Resource(ResourceError::NotFound(_)))
        ));
        assert!(matches!(
            builder.try_build(&Geometry::inline_mesh(vec![[0.0; 3]; 3], vec![0, 1, 5])),
            Err(GeometryError::Mesh(MeshError::IndexOutOfRange { index: 5, .. }))
        ));
    }
}
