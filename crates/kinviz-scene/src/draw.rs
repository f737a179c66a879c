//! Flattened, GPU-ready view of the scene

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Mat4};
use uuid::Uuid;

use crate::geometry::Surface;

/// Mesh instance data - model matrix and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// Axis instance data - passed as vertex instance
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AxisInstance {
    pub transform: [[f32; 4]; 4],
    pub scale: f32,
    pub _padding: [f32; 3],
}

impl AxisInstance {
    pub fn new(transform: Mat4, scale: f32) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            scale,
            _padding: [0.0; 3],
        }
    }
}

impl Default for AxisInstance {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, 1.0)
    }
}

/// Marker instance data - passed as vertex instance
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    /// Marker center position in world space.
    pub position: [f32; 3],
    /// Marker sphere radius.
    pub radius: f32,
    /// Marker color (RGBA).
    pub color: [f32; 4],
}

impl MarkerInstance {
    pub fn new(position: DVec3, radius: f32, color: [f32; 4]) -> Self {
        Self {
            position: position.as_vec3().to_array(),
            radius,
            color,
        }
    }
}

/// Line-list vertex; consecutive pairs form one segment
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub width: f32,
    pub color: [f32; 4],
}

/// Workspace point
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 4],
}

/// Arrow instance data
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ArrowInstance {
    pub origin: [f32; 3],
    pub length: f32,
    pub direction: [f32; 3],
    pub _padding: f32,
    pub color: [f32; 4],
}

/// One visual of one node
#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    pub node: Uuid,
    pub surface: &'a Surface,
    pub instance: MeshInstance,
}

/// Everything a renderer needs for one frame.
///
/// Surfaces are borrowed from the registry; instance arrays are plain
/// `Pod` data ready for upload.
#[derive(Debug, Default)]
pub struct DrawList<'a> {
    pub meshes: Vec<MeshDraw<'a>>,
    pub axes: Vec<AxisInstance>,
    pub markers: Vec<MarkerInstance>,
    pub lines: Vec<LineVertex>,
    pub points: Vec<PointVertex>,
    pub arrows: Vec<ArrowInstance>,
}

impl DrawList<'_> {
    /// Append a polyline as line-list pairs; fewer than two points add nothing
    pub fn push_polyline(&mut self, points: &[DVec3], width: f32, color: [f32; 4]) {
        for pair in points.windows(2) {
            for p in pair {
                self.lines.push(LineVertex {
                    position: p.as_vec3().to_array(),
                    width,
                    color,
                });
            }
        }
    }

    pub fn push_arrow(&mut self, origin: DVec3, direction: DVec3, length: f32, color: [f32; 4]) {
        self.arrows.push(ArrowInstance {
            origin: origin.as_vec3().to_array(),
            length,
            direction: direction.as_vec3().normalize_or_zero().to_array(),
            _padding: 0.0,
            color,
        });
    }

    pub fn push_point(&mut self, position: DVec3, size: f32, color: [f32; 4]) {
        self.points.push(PointVertex {
            position: position.as_vec3().to_array(),
            size,
            color,
        });
    }

    /// Number of line segments
    pub fn segment_count(&self) -> usize {
        self.lines.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
            && self.axes.is_empty()
            && self.markers.is_empty()
            && self.lines.is_empty()
            && self.points.is_empty()
            && self.arrows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_instance_layouts() {
        assert_eq!(std::mem::size_of::<MeshInstance>(), 80);
        assert_eq!(std::mem::size_of::<AxisInstance>(), 80);
        assert_eq!(std::mem::size_of::<MarkerInstance>(), 32);
        assert_eq!(std::mem::size_of::<LineVertex>(), 32);
        assert_eq!(std::mem::size_of::<PointVertex>(), 32);
        assert_eq!(std::mem::size_of::<ArrowInstance>(), 48);
    }

    #[test]
    fn test_polyline_pairs() {
        let mut list = DrawList::default();
        list.push_polyline(&[DVec3::ZERO], 1.0, [1.0; 4]);
        assert!(list.is_empty());
        list.push_polyline(&[DVec3::ZERO, DVec3::X, DVec3::Y], 1.0, [1.0; 4]);
        assert_eq!(list.segment_count(), 2);
        assert_eq!(Vec3::from(list.lines[2].position), Vec3::X);
    }
}
