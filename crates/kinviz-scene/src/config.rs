//! Scene configuration, persisted as RON

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Style and sampling parameters of the scene.
///
/// Colors are RGBA in `0..=1`. Fields missing from a config file take
/// their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Axis length of link frame triads
    pub frame_size: f32,
    pub tcp_marker_radius: f32,
    pub tcp_marker_color: [f32; 4],
    /// Axis length of the target frame triad
    pub target_frame_size: f32,

    pub contact_point_radius: f32,
    pub contact_point_color: [f32; 4],
    /// Length of a contact normal arrow
    pub contact_normal_scale: f32,
    pub contact_normal_color: [f32; 4],
    pub contact_highlight_color: [f32; 4],

    pub highlight_color: [f32; 4],
    /// Color of links whose visuals carry no material
    pub default_link_color: [f32; 4],

    pub path_color: [f32; 4],
    pub path_width: f32,
    pub waypoint_radius: f32,
    pub segment_color: [f32; 4],
    pub fk_chain_width: f32,
    pub fk_chain_color: [f32; 4],

    pub workspace_point_size: f32,
    pub workspace_opacity: f32,
    /// Sampling range used for joints without limits
    pub continuous_joint_range: (f64, f64),
    /// Fixed RNG seed for reproducible sampling
    pub sampling_seed: Option<u64>,

    /// Edge length of the marker cube shown for unbuildable geometry
    pub fallback_marker_size: f32,
    /// Segments around round primitives
    pub tessellation: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            frame_size: 0.1,
            tcp_marker_radius: 0.02,
            tcp_marker_color: [1.0, 0.0, 1.0, 1.0],
            target_frame_size: 0.15,
            contact_point_radius: 0.01,
            contact_point_color: [1.0, 0.2, 0.2, 1.0],
            contact_normal_scale: 0.1,
            contact_normal_color: [0.2, 1.0, 0.2, 1.0],
            contact_highlight_color: [1.0, 0.3, 0.0, 1.0],
            highlight_color: [1.0, 0.6, 0.0, 1.0],
            default_link_color: [0.7, 0.7, 0.7, 1.0],
            path_color: [1.0, 0.0, 0.0, 1.0],
            path_width: 2.0,
            waypoint_radius: 0.01,
            segment_color: [0.0, 1.0, 0.0, 1.0],
            fk_chain_width: 3.0,
            fk_chain_color: [0.0, 1.0, 1.0, 1.0],
            workspace_point_size: 3.0,
            workspace_opacity: 0.6,
            continuous_joint_range: (-3.14, 3.14),
            sampling_seed: None,
            fallback_marker_size: 0.05,
            tessellation: 24,
        }
    }
}

impl SceneConfig {
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = Self::from_ron_str(&content)?;
        tracing::info!("Loaded scene config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, self.to_ron_string()?).map_err(|e| ConfigError::Io(e.to_string()))?;
        tracing::info!("Saved scene config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = SceneConfig::from_ron_str("(frame_size: 0.25, sampling_seed: Some(7))").unwrap();
        assert_eq!(config.frame_size, 0.25);
        assert_eq!(config.sampling_seed, Some(7));
        assert_eq!(config.tessellation, SceneConfig::default().tessellation);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = SceneConfig {
            workspace_opacity: 0.3,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(SceneConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            SceneConfig::from_ron_str("(frame_size: \"big\")"),
            Err(ConfigError::Deserialize(_))
        ));
    }
}
