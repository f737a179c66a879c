//! Scene node: the render-side counterpart of a link

use glam::Mat4;
use kinviz_core::{Link, RigidTransform};
use uuid::Uuid;

use crate::geometry::{BoundingBox, GeometryBuilder, GeometryError, Surface};

/// One built visual of a link
#[derive(Debug, Clone)]
pub struct VisualSurface {
    pub surface: Surface,
    /// Visual offset in the link frame
    pub origin: Mat4,
    /// Material color, if the visual has one
    pub color: Option<[f32; 4]>,
}

/// Renderable node owned by exactly one link.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Unique identifier for this node.
    pub id: Uuid,

    /// Name of the link this node renders.
    pub link: String,

    /// Built visuals in model order.
    pub visuals: Vec<VisualSurface>,

    /// Link-to-world transform from the last applied batch.
    pub transform: RigidTransform,

    /// Whether this node is visible.
    pub visible: bool,

    /// Color used when neither highlight is active.
    pub base_color: [f32; 4],

    /// Explicit highlight color.
    pub highlight: Option<[f32; 4]>,

    /// Highlight set by contact visualization; wins over `highlight`.
    pub contact_highlight: Option<[f32; 4]>,

    /// Whether the link frame triad is shown.
    pub frame_visible: bool,

    /// Build failures replaced by fallback markers.
    pub warnings: Vec<GeometryError>,
}

impl SceneNode {
    /// Build all visuals of `link`; failures are isolated per visual
    pub fn build(link: &Link, builder: &GeometryBuilder<'_>, default_color: [f32; 4]) -> Self {
        let mut warnings = Vec::new();
        let visuals = link
            .visuals
            .iter()
            .map(|visual| {
                let built = builder.build(&visual.geometry);
                if let Some(warning) = built.warning {
                    tracing::warn!(link = %link.name, error = %warning, "Visual replaced by fallback marker");
                    warnings.push(warning);
                }
                VisualSurface {
                    surface: built.surface,
                    origin: visual.origin.to_mat4_f32(),
                    color: visual.color,
                }
            })
            .collect();

        let base_color = link
            .visuals
            .iter()
            .find_map(|v| v.color)
            .unwrap_or(default_color);

        Self {
            id: Uuid::new_v4(),
            link: link.name.clone(),
            visuals,
            transform: RigidTransform::IDENTITY,
            visible: true,
            base_color,
            highlight: None,
            contact_highlight: None,
            frame_visible: false,
            warnings,
        }
    }

    /// Override color if any highlight is active
    fn highlight_color(&self) -> Option<[f32; 4]> {
        self.contact_highlight.or(self.highlight)
    }

    /// Node color: contact highlight, then explicit highlight, then base
    pub fn effective_color(&self) -> [f32; 4] {
        self.highlight_color().unwrap_or(self.base_color)
    }

    /// Color of one visual, honoring its own material when not highlighted
    pub fn visual_color(&self, visual: &VisualSurface) -> [f32; 4] {
        self.highlight_color()
            .or(visual.color)
            .unwrap_or(self.base_color)
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlight_color().is_some()
    }

    /// World matrix of the link frame
    pub fn model_matrix(&self) -> Mat4 {
        self.transform.to_mat4_f32()
    }

    /// World bounds of all visuals
    pub fn world_bounds(&self) -> Option<BoundingBox> {
        let model = self.model_matrix();
        self.visuals
            .iter()
            .map(|v| v.surface.bounds.transformed(&(model * v.origin)))
            .filter(|b| !b.is_empty())
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DVec3, Vec3};
    use kinviz_core::{Geometry, MemoryResourceLocator, VisualGeometry};

    const GRAY: [f32; 4] = [0.7, 0.7, 0.7, 1.0];
    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    fn node(link: &Link) -> SceneNode {
        let locator = MemoryResourceLocator::new();
        SceneNode::build(link, &GeometryBuilder::new(&locator), GRAY)
    }

    #[test]
    fn test_color_precedence() {
        let link = Link::new("a").with_visual(
            VisualGeometry::new(Geometry::Sphere { radius: 0.1 }).with_color([0.0, 0.0, 1.0, 1.0]),
        );
        let mut node = node(&link);
        assert_eq!(node.effective_color(), [0.0, 0.0, 1.0, 1.0]);

        node.highlight = Some(RED);
        assert_eq!(node.effective_color(), RED);

        node.contact_highlight = Some([1.0, 0.3, 0.0, 1.0]);
        assert_eq!(node.effective_color(), [1.0, 0.3, 0.0, 1.0]);

        node.contact_highlight = None;
        node.highlight = None;
        assert_eq!(node.visual_color(&node.visuals[0]), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_failed_visual_is_isolated() {
        let link = Link::new("a")
            .with_visual(VisualGeometry::new(Geometry::mesh_resource("missing.stl")))
            .with_visual(VisualGeometry::new(Geometry::Box { size: [1.0; 3] }));
        let node = node(&link);
        assert_eq!(node.visuals.len(), 2);
        assert_eq!(node.warnings.len(), 1);
        assert!(node.visuals[0].surface.fallback);
        assert!(!node.visuals[1].surface.fallback);
        assert_eq!(node.base_color, GRAY);
    }

    #[test]
    fn test_world_bounds_follow_transform() {
        let link = Link::new("a").with_visual(VisualGeometry::new(Geometry::Box { size: [1.0; 3] }));
        let mut moved = node(&link);
        moved.transform = RigidTransform::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let bounds = moved.world_bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(0.5, -0.5, -0.5));
        assert_eq!(bounds.max, Vec3::new(1.5, 0.5, 0.5));
        assert!(node(&Link::new("empty")).world_bounds().is_none());
    }
}
