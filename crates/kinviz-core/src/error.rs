//! Error types for the model and environment layer

/// Errors raised by an [`Environment`](crate::Environment) or while building one
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvironmentError {
    #[error("Failed to parse URDF: {0}")]
    UrdfParse(String),

    #[error("Empty model: no links defined")]
    EmptyModel,

    #[error("Link not found: {0}")]
    UnknownLink(String),

    #[error("Joint not found: {0}")]
    UnknownJoint(String),

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Link '{0}' has more than one parent joint")]
    MultipleParents(String),

    #[error("Joint '{0}' closes a kinematic loop")]
    Cycle(String),

    #[error("Kinematics unavailable for link '{link}': {reason}")]
    KinematicsUnavailable { link: String, reason: String },
}

/// Errors raised while resolving a resource reference to bytes
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unknown package in URI: {0}")]
    UnknownPackage(String),

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("IO error reading {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Mesh decoding errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty mesh: no geometry found")]
    EmptyMesh,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Errors raised while persisting a [`PoseLibrary`](crate::PoseLibrary)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoseLibraryError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid pose library: {0}")]
    Format(String),
}
