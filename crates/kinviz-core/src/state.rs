//! Named joint configurations

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::environment::JointValues;
use crate::error::PoseLibraryError;

/// Named joint configurations, persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseLibrary {
    poses: BTreeMap<String, JointValues>,
}

impl PoseLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `values` under `name`, replacing any previous entry
    pub fn save(&mut self, name: impl Into<String>, values: JointValues) {
        self.poses.insert(name.into(), values);
    }

    pub fn load(&self, name: &str) -> Option<&JointValues> {
        self.poses.get(name)
    }

    /// Remove a pose; returns false if it did not exist
    pub fn delete(&mut self, name: &str) -> bool {
        self.poses.remove(name).is_some()
    }

    /// Pose names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.poses.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn clear(&mut self) {
        self.poses.clear();
    }

    pub fn to_json(&self) -> Result<String, PoseLibraryError> {
        serde_json::to_string_pretty(self).map_err(|e| PoseLibraryError::Format(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, PoseLibraryError> {
        serde_json::from_str(json).map_err(|e| PoseLibraryError::Format(e.to_string()))
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), PoseLibraryError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|e| PoseLibraryError::Io(e.to_string()))?;
        tracing::info!("Saved {} poses to {:?}", self.len(), path);
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, PoseLibraryError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PoseLibraryError::Io(e.to_string()))?;
        let library = Self::from_json(&content)?;
        tracing::info!("Loaded {} poses from {:?}", library.len(), path);
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(value: f64) -> JointValues {
        JointValues::from([("shoulder".to_string(), value)])
    }

    #[test]
    fn test_save_load_delete() {
        let mut library = PoseLibrary::new();
        library.save("home", pose(0.0));
        library.save("ready", pose(1.0));
        library.save("home", pose(0.5));

        assert_eq!(library.len(), 2);
        assert_eq!(library.load("home"), Some(&pose(0.5)));
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["home", "ready"]);

        assert!(library.delete("ready"));
        assert!(!library.delete("ready"));
        assert!(library.load("ready").is_none());
    }

    #[test]
    fn test_json_layout() {
        let mut library = PoseLibrary::new();
        library.save("home", pose(0.25));
        let json = library.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["home"]["shoulder"], 0.25);
        assert_eq!(PoseLibrary::from_json(&json).unwrap(), library);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            PoseLibrary::from_json("[1, 2]"),
            Err(PoseLibraryError::Format(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("kinviz-poses-{}.json", std::process::id()));
        let mut library = PoseLibrary::new();
        library.save("home", pose(0.1));
        library.save_to_file(&path).unwrap();
        let loaded = PoseLibrary::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, library);
    }
}
