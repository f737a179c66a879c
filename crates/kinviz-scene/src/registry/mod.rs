//! Scene graph registry: link name -> scene node.
//!
//! The registry is the single source of truth for which nodes exist.
//! Nodes are addressed by link name only; names that outlive a model
//! swap are tolerated as warning no-ops.

mod node;

pub use node::*;

use std::collections::HashMap;

use kinviz_core::{Link, LinkTransforms};
use uuid::Uuid;

use crate::geometry::{BoundingBox, GeometryBuilder};

/// Owns one [`SceneNode`] per loaded link
#[derive(Debug)]
pub struct SceneRegistry {
    nodes: HashMap<String, SceneNode>,
    /// Link names in model order
    order: Vec<String>,
    /// Changes on every load
    generation: Uuid,
    dirty: bool,
}

impl Default for SceneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            generation: Uuid::nil(),
            dirty: false,
        }
    }

    /// Build nodes for `links` without touching any registry
    pub fn build_nodes(
        links: &[Link],
        builder: &GeometryBuilder<'_>,
        default_color: [f32; 4],
    ) -> Vec<SceneNode> {
        links
            .iter()
            .map(|link| SceneNode::build(link, builder, default_color))
            .collect()
    }

    /// Replace the whole node set with nodes built from `links`
    pub fn load(&mut self, links: &[Link], builder: &GeometryBuilder<'_>, default_color: [f32; 4]) {
        let nodes = Self::build_nodes(links, builder, default_color);
        self.replace(nodes);
    }

    /// Release all current nodes, then install `nodes`
    pub fn replace(&mut self, nodes: Vec<SceneNode>) {
        self.clear();
        for node in nodes {
            self.order.push(node.link.clone());
            self.nodes.insert(node.link.clone(), node);
        }
        self.generation = Uuid::new_v4();
        tracing::debug!(nodes = self.nodes.len(), generation = %self.generation, "Registry loaded");
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.dirty = true;
    }

    /// Identifier of the current load
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, link: &str) -> bool {
        self.nodes.contains_key(link)
    }

    pub fn get(&self, link: &str) -> Option<&SceneNode> {
        self.nodes.get(link)
    }

    /// Nodes in model order
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Lookup for a mutation; unknown names are logged and skipped
    fn node_mut(&mut self, link: &str, operation: &str) -> Option<&mut SceneNode> {
        let node = self.nodes.get_mut(link);
        if node.is_none() {
            tracing::warn!(link = %link, operation, "Unknown link, ignoring");
        } else {
            self.dirty = true;
        }
        node
    }

    /// Returns false if the link is unknown
    pub fn set_visibility(&mut self, link: &str, visible: bool) -> bool {
        self.node_mut(link, "set_visibility")
            .map(|node| node.visible = visible)
            .is_some()
    }

    pub fn set_highlight(&mut self, link: &str, on: bool, color: [f32; 4]) -> bool {
        self.node_mut(link, "set_highlight")
            .map(|node| node.highlight = on.then_some(color))
            .is_some()
    }

    pub fn set_contact_highlight(&mut self, link: &str, color: Option<[f32; 4]>) -> bool {
        self.node_mut(link, "set_contact_highlight")
            .map(|node| node.contact_highlight = color)
            .is_some()
    }

    /// Drop every contact highlight; returns the affected link names
    pub fn clear_contact_highlights(&mut self) -> Vec<String> {
        let mut cleared = Vec::new();
        for node in self.nodes.values_mut() {
            if node.contact_highlight.take().is_some() {
                cleared.push(node.link.clone());
            }
        }
        if !cleared.is_empty() {
            self.dirty = true;
        }
        cleared
    }

    pub fn show_frame(&mut self, link: &str, visible: bool) -> bool {
        self.node_mut(link, "show_frame")
            .map(|node| node.frame_visible = visible)
            .is_some()
    }

    /// Push a batch of world transforms into the nodes.
    ///
    /// Links missing from `transforms` keep their previous transform.
    /// Returns the number of nodes updated.
    pub fn apply_transforms(&mut self, transforms: &LinkTransforms) -> usize {
        let mut updated = 0;
        for (link, transform) in transforms {
            if let Some(node) = self.nodes.get_mut(link) {
                node.transform = *transform;
                updated += 1;
            }
        }
        if updated > 0 {
            self.dirty = true;
        }
        updated
    }

    /// Current world transform of every node
    pub fn transforms(&self) -> LinkTransforms {
        self.nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.transform))
            .collect()
    }

    /// World bounds of visible nodes
    pub fn robot_bounds(&self) -> Option<BoundingBox> {
        self.nodes
            .values()
            .filter(|n| n.visible)
            .filter_map(|n| n.world_bounds())
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use kinviz_core::{Geometry, MemoryResourceLocator, RigidTransform, VisualGeometry};

    const GRAY: [f32; 4] = [0.7, 0.7, 0.7, 1.0];
    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    fn boxed(name: &str) -> Link {
        Link::new(name).with_visual(VisualGeometry::new(Geometry::Box { size: [1.0; 3] }))
    }

    fn loaded(names: &[&str]) -> SceneRegistry {
        let locator = MemoryResourceLocator::new();
        let links: Vec<Link> = names.iter().map(|n| boxed(n)).collect();
        let mut registry = SceneRegistry::new();
        registry.load(&links, &GeometryBuilder::new(&locator), GRAY);
        registry
    }

    #[test]
    fn test_load_replaces_node_set() {
        let mut registry = loaded(&["a", "b"]);
        let first = registry.generation();
        let old_id = registry.get("a").unwrap().id;

        let locator = MemoryResourceLocator::new();
        registry.load(&[boxed("b"), boxed("c")], &GeometryBuilder::new(&locator), GRAY);
        assert_ne!(registry.generation(), first);
        assert!(!registry.contains("a"));
        assert_eq!(
            registry.nodes().map(|n| n.link.as_str()).collect::<Vec<_>>(),
            vec!["b", "c"]
        );
        assert_ne!(registry.get("b").unwrap().id, old_id);
    }

    #[test]
    fn test_unknown_links_are_noops() {
        let mut registry = loaded(&["a"]);
        registry.mark_clean();
        assert!(!registry.set_visibility("ghost", false));
        assert!(!registry.set_highlight("ghost", true, RED));
        assert!(!registry.show_frame("ghost", true));
        assert!(!registry.is_dirty());

        assert!(registry.set_visibility("a", false));
        assert!(!registry.get("a").unwrap().visible);
        assert!(registry.is_dirty());
    }

    #[test]
    fn test_highlight_toggle() {
        let mut registry = loaded(&["a"]);
        registry.set_highlight("a", true, RED);
        assert_eq!(registry.get("a").unwrap().effective_color(), RED);
        registry.set_highlight("a", false, RED);
        assert_eq!(registry.get("a").unwrap().effective_color(), GRAY);
    }

    #[test]
    fn test_apply_transforms_batch() {
        let mut registry = loaded(&["a", "b"]);
        let transforms: LinkTransforms = [
            ("a".to_string(), RigidTransform::from_translation(DVec3::X)),
            ("ghost".to_string(), RigidTransform::from_translation(DVec3::Y)),
        ]
        .into_iter()
        .collect();
        assert_eq!(registry.apply_transforms(&transforms), 1);
        assert_eq!(registry.get("a").unwrap().transform.translation, DVec3::X);
        assert_eq!(registry.get("b").unwrap().transform, RigidTransform::IDENTITY);
    }

    #[test]
    fn test_robot_bounds_skip_hidden() {
        let mut registry = loaded(&["a", "b"]);
        let transforms: LinkTransforms =
            [("b".to_string(), RigidTransform::from_translation(DVec3::X * 10.0))]
                .into_iter()
                .collect();
        registry.apply_transforms(&transforms);
        assert_eq!(registry.robot_bounds().unwrap().max.x, 10.5);
        registry.set_visibility("b", false);
        assert_eq!(registry.robot_bounds().unwrap().max.x, 0.5);
        assert!(SceneRegistry::new().robot_bounds().is_none());
    }
}
