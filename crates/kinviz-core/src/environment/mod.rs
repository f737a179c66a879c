//! The environment collaborator: model catalogue, kinematics and contacts
//!
//! The scene layer never computes kinematics itself; it queries an
//! [`Environment`] and maps the results into render nodes.

mod contact;
mod urdf;

pub use contact::*;
pub use urdf::*;

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::EnvironmentError;
use crate::model::{Joint, Link};
use crate::resource::ResourceLocator;
use crate::types::RigidTransform;

/// Joint name -> position (rad or m)
pub type JointValues = BTreeMap<String, f64>;

/// Link name -> world transform
pub type LinkTransforms = BTreeMap<String, RigidTransform>;

/// Geometric Jacobian of a link origin, one 6-vector per independent joint.
///
/// Each column is `[vx, vy, vz, wx, wy, wz]` expressed in the world frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Jacobian {
    pub joint_names: Vec<String>,
    pub columns: Vec<[f64; 6]>,
}

impl Jacobian {
    pub fn rows(&self) -> usize {
        6
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Entry at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.columns[col][row]
    }
}

/// Result of a contact query between two links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub link_names: [String; 2],
    /// Nearest point on each link, in world coordinates
    pub nearest_points: [DVec3; 2],
    /// Unit normal pointing from the first link to the second
    pub normal: DVec3,
    /// Signed distance, negative when penetrating
    pub distance: f64,
}

/// Contact checking service, optional on an environment
pub trait ContactManager: Send + Sync {
    /// Contacts for links placed at `transforms`
    fn contact_test(&self, transforms: &LinkTransforms) -> Vec<Contact>;
}

/// External collaborator providing the model and its kinematics.
///
/// Implementations must be deterministic: the same joint values always
/// produce the same transforms.
pub trait Environment: Send + Sync {
    /// Model name
    fn name(&self) -> &str;

    /// Link catalogue in model order
    fn links(&self) -> &[Link];

    /// Joint catalogue in model order
    fn joints(&self) -> &[Joint];

    /// Forward kinematics for every link.
    ///
    /// Joints absent from `joint_values` are taken at zero.
    fn state(&self, joint_values: &JointValues) -> Result<LinkTransforms, EnvironmentError>;

    /// Geometric Jacobian of `link` at the given configuration
    fn jacobian(&self, link: &str, joint_values: &JointValues)
    -> Result<Jacobian, EnvironmentError>;

    /// Contact manager, absent when the model carries no collision setup
    fn contact_manager(&self) -> Option<&dyn ContactManager>;

    /// Locator used to resolve mesh references of this model
    fn resource_locator(&self) -> &dyn ResourceLocator;

    /// Look up a joint by name
    fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints().iter().find(|j| j.name == name)
    }

    /// Look up a link by name
    fn link(&self, name: &str) -> Option<&Link> {
        self.links().iter().find(|l| l.name == name)
    }
}
