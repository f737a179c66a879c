//! Resolution of mesh references (`package://`, `file://`, plain paths) to bytes

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ResourceError;

/// Capability that turns a resource reference into its contents
pub trait ResourceLocator: Send + Sync {
    fn locate(&self, uri: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Filesystem locator with a base directory and named package roots
#[derive(Debug, Clone, Default)]
pub struct FileResourceLocator {
    base_dir: PathBuf,
    packages: HashMap<String, PathBuf>,
}

impl FileResourceLocator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            packages: HashMap::new(),
        }
    }

    /// Register the root directory for `package://<name>/...` references
    pub fn with_package(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.packages.insert(name.into(), root.into());
        self
    }

    /// Map a reference to a filesystem path without touching the disk
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, ResourceError> {
        if let Some(rest) = uri.strip_prefix("package://") {
            let (package, relative) = rest.split_once('/').unwrap_or((rest, ""));
            let root = self
                .packages
                .get(package)
                .ok_or_else(|| ResourceError::UnknownPackage(uri.to_string()))?;
            return Ok(root.join(relative));
        }

        let path_str = uri.strip_prefix("file://").unwrap_or(uri);
        if path_str.contains("://") {
            return Err(ResourceError::UnsupportedScheme(uri.to_string()));
        }

        // Resolve relative path
        let path = Path::new(path_str);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir.join(path))
        }
    }
}

impl ResourceLocator for FileResourceLocator {
    fn locate(&self, uri: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.resolve(uri)?;
        if !path.exists() {
            return Err(ResourceError::NotFound(path.to_string_lossy().to_string()));
        }
        std::fs::read(&path).map_err(|e| ResourceError::Io {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })
    }
}

/// In-memory locator keyed by the exact reference string
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceLocator {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryResourceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(uri.into(), bytes.into());
    }

    pub fn with_entry(mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

impl ResourceLocator for MemoryResourceLocator {
    fn locate(&self, uri: &str) -> Result<Vec<u8>, ResourceError> {
        self.entries
            .get(uri)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_package_uri() {
        let locator = FileResourceLocator::new("/models").with_package("arm", "/opt/arm");
        assert_eq!(
            locator.resolve("package://arm/meshes/base.stl").unwrap(),
            PathBuf::from("/opt/arm/meshes/base.stl")
        );
    }

    #[test]
    fn test_resolve_unknown_package() {
        let locator = FileResourceLocator::new("/models");
        assert!(matches!(
            locator.resolve("package://robot/meshes/link.stl"),
            Err(ResourceError::UnknownPackage(_))
        ));
    }

    #[test]
    fn test_resolve_relative_and_file_uri() {
        let locator = FileResourceLocator::new("/models");
        assert_eq!(
            locator.resolve("meshes/a.stl").unwrap(),
            PathBuf::from("/models/meshes/a.stl")
        );
        assert_eq!(
            locator.resolve("file:///tmp/b.obj").unwrap(),
            PathBuf::from("/tmp/b.obj")
        );
        assert!(matches!(
            locator.resolve("http://example.com/c.stl"),
            Err(ResourceError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_memory_locator() {
        let locator = MemoryResourceLocator::new().with_entry("mesh.stl", vec![1u8, 2, 3]);
        assert_eq!(locator.locate("mesh.stl").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            locator.locate("other.stl"),
            Err(ResourceError::NotFound(_))
        ));
    }
}
