//! Kinviz core: robot model, kinematics environment and resource loading
//!
//! This crate provides:
//! - Rigid transforms, joint and geometry types
//! - The link/joint catalogue and its kinematic tree
//! - The [`Environment`] trait with a URDF-backed implementation
//! - Resource locators and STL/OBJ mesh decoding
//! - A named pose library

pub mod environment;
pub mod error;
pub mod mesh;
pub mod model;
pub mod resource;
pub mod state;
pub mod types;

pub use environment::{
    AllowedCollisionMatrix, Contact, ContactManager, Environment, Jacobian, JointValues,
    LinkTransforms, SphereContactManager, UrdfEnvironment,
};
pub use error::{EnvironmentError, MeshError, PoseLibraryError, ResourceError};
pub use mesh::{MeshFormat, RawMesh, decode_mesh};
pub use model::{Joint, KinematicTree, Link, VisualGeometry};
pub use resource::{FileResourceLocator, MemoryResourceLocator, ResourceLocator};
pub use state::PoseLibrary;
pub use types::*;
