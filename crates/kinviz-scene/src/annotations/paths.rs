//! Tool paths and their colored segments

use std::collections::BTreeMap;

use glam::DVec3;
use serde::Serialize;

/// Line color and width
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: [f32; 4],
    pub width: f32,
}

/// Named sub-path drawn without waypoint markers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSegment {
    pub points: Vec<DVec3>,
    pub style: LineStyle,
}

/// A polyline with optional waypoint markers and child segments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolPath {
    pub points: Vec<DVec3>,
    pub style: LineStyle,
    /// Waypoint marker radius; `None` hides the markers
    pub waypoint_radius: Option<f32>,
    pub segments: BTreeMap<String, PathSegment>,
}

impl ToolPath {
    /// Fewer than two points draw no line
    pub fn has_line(&self) -> bool {
        self.points.len() >= 2
    }

    /// Waypoint positions, empty when markers are hidden or there is no line
    pub fn waypoints(&self) -> &[DVec3] {
        if self.waypoint_radius.is_some() && self.has_line() {
            &self.points
        } else {
            &[]
        }
    }
}

/// Tool paths keyed by caller id
#[derive(Debug, Clone, Default)]
pub struct PathLayer {
    paths: BTreeMap<String, ToolPath>,
}

impl PathLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `id`; existing segments of `id` are dropped
    pub fn add_path(
        &mut self,
        id: impl Into<String>,
        points: Vec<DVec3>,
        style: LineStyle,
        waypoint_radius: Option<f32>,
    ) {
        let id = id.into();
        if points.len() < 2 {
            tracing::debug!(path = %id, points = points.len(), "Path has no visible line");
        }
        self.paths.insert(
            id,
            ToolPath {
                points,
                style,
                waypoint_radius,
                segments: BTreeMap::new(),
            },
        );
    }

    /// Insert or replace a segment; an unknown parent is created empty
    pub fn add_segment(
        &mut self,
        path_id: &str,
        segment_id: impl Into<String>,
        points: Vec<DVec3>,
        style: LineStyle,
    ) {
        let parent = self
            .paths
            .entry(path_id.to_string())
            .or_insert_with(|| ToolPath {
                points: Vec::new(),
                style,
                waypoint_radius: None,
                segments: BTreeMap::new(),
            });
        parent
            .segments
            .insert(segment_id.into(), PathSegment { points, style });
    }

    /// Remove a path and all its segments; false if it did not exist
    pub fn clear_path(&mut self, id: &str) -> bool {
        self.paths.remove(id).is_some()
    }

    pub fn clear_segment(&mut self, path_id: &str, segment_id: &str) -> bool {
        self.paths
            .get_mut(path_id)
            .is_some_and(|p| p.segments.remove(segment_id).is_some())
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn get(&self, id: &str) -> Option<&ToolPath> {
        self.paths.get(id)
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, &ToolPath)> {
        self.paths.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: LineStyle = LineStyle {
        color: [1.0, 0.0, 0.0, 1.0],
        width: 2.0,
    };

    fn line(n: usize) -> Vec<DVec3> {
        (0..n).map(|i| DVec3::X * i as f64).collect()
    }

    #[test]
    fn test_add_path_replaces() {
        let mut layer = PathLayer::new();
        layer.add_path("p", line(3), RED, Some(0.01));
        layer.add_segment("p", "s", line(2), RED);
        layer.add_path("p", line(5), RED, None);

        assert_eq!(layer.len(), 1);
        let path = layer.get("p").unwrap();
        assert_eq!(path.points, line(5));
        assert!(path.segments.is_empty());
        assert!(path.waypoints().is_empty());
    }

    #[test]
    fn test_degenerate_path() {
        let mut layer = PathLayer::new();
        layer.add_path("p", line(1), RED, Some(0.01));
        let path = layer.get("p").unwrap();
        assert!(!path.has_line());
        assert!(path.waypoints().is_empty());
    }

    #[test]
    fn test_segments_and_clear() {
        let mut layer = PathLayer::new();
        layer.add_segment("p", "a", line(2), RED);
        layer.add_segment("p", "b", line(2), RED);
        assert!(!layer.get("p").unwrap().has_line());
        assert_eq!(layer.get("p").unwrap().segments.len(), 2);

        assert!(layer.clear_segment("p", "a"));
        assert!(!layer.clear_segment("p", "a"));
        assert!(!layer.clear_segment("q", "a"));

        assert!(layer.clear_path("p"));
        assert!(!layer.clear_path("p"));
        assert!(layer.is_empty());
    }
}
