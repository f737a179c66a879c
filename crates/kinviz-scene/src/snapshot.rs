//! Serializable export of node state for the shell

use kinviz_core::JointValues;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exported state of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub link: String,
    /// Link-to-world transform, column major
    pub transform: [[f64; 4]; 4],
    pub visible: bool,
    pub highlighted: bool,
    pub color: [f32; 4],
    pub frame_visible: bool,
    /// Visuals replaced by the fallback marker
    pub fallback_visuals: usize,
}

/// Exported scene state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub model: Option<String>,
    pub generation: Uuid,
    pub joint_values: JointValues,
    pub nodes: Vec<NodeSnapshot>,
    pub paths: Vec<String>,
    pub contacts: usize,
    pub workspace_points: usize,
}

impl SceneSnapshot {
    pub fn node(&self, link: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.link == link)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
