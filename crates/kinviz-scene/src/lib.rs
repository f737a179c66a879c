//! Kinviz scene: keeps a renderable scene in sync with a kinematic model.
//!
//! This crate provides:
//! - [`GeometryBuilder`] turning geometry descriptors into surfaces
//! - [`SceneRegistry`] mapping link names to scene nodes
//! - [`TransformSync`] pushing forward kinematics into the nodes
//! - Annotation layers for tool paths, contacts, frames and workspace clouds
//! - [`WorkspaceSampler`] for reachability and manipulability
//! - [`SceneContext`], the facade owned by the hosting shell

pub mod annotations;
pub mod config;
pub mod context;
pub mod draw;
pub mod error;
pub mod events;
pub mod geometry;
pub mod registry;
pub mod sampler;
pub mod snapshot;
pub mod sync;

pub use annotations::*;
pub use config::{ConfigError, SceneConfig};
pub use context::{PreparedScene, SceneContext, SharedScene};
pub use draw::*;
pub use error::SceneError;
pub use events::{AnnotationLayer, EventQueue, SceneEvent};
pub use geometry::{
    BoundingBox, BuiltSurface, GeometryBuilder, GeometryError, MeshVertex, Surface,
};
pub use registry::{SceneNode, SceneRegistry, VisualSurface};
pub use sampler::{
    CancelToken, Manipulability, SampleRequest, SamplingJob, WorkspaceResult, WorkspaceSampler,
    WorkspaceSamples, default_limits, manipulability_index,
};
pub use snapshot::{NodeSnapshot, SceneSnapshot};
pub use sync::TransformSync;
