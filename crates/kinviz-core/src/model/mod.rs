//! Loaded model catalogue: links, joints and their visual geometry

mod tree;

pub use tree::*;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::{Geometry, JointLimits, JointMimic, JointType, RigidTransform};

/// One visual element of a link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualGeometry {
    pub name: Option<String>,
    pub geometry: Geometry,
    /// Offset of the geometry relative to the link frame
    pub origin: RigidTransform,
    /// Material color (RGBA), if the model specifies one
    pub color: Option<[f32; 4]>,
}

impl VisualGeometry {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            name: None,
            geometry,
            origin: RigidTransform::IDENTITY,
            color: None,
        }
    }

    pub fn with_origin(mut self, origin: RigidTransform) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = Some(color);
        self
    }
}

/// A rigid body of the kinematic model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    /// Ordered visual geometry entries
    pub visuals: Vec<VisualGeometry>,
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visuals: Vec::new(),
        }
    }

    pub fn with_visual(mut self, visual: VisualGeometry) -> Self {
        self.visuals.push(visual);
        self
    }
}

/// A joint connecting two links, referenced by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    pub joint_type: JointType,
    pub parent_link: String,
    pub child_link: String,
    /// Transform from parent link frame to joint frame
    pub origin: RigidTransform,
    /// Joint axis in the joint frame
    pub axis: DVec3,
    pub limits: Option<JointLimits>,
    pub mimic: Option<JointMimic>,
}

impl Joint {
    /// Create a new fixed joint
    pub fn fixed(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
        origin: RigidTransform,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type: JointType::Fixed,
            parent_link: parent.into(),
            child_link: child.into(),
            origin,
            axis: DVec3::Z,
            limits: None,
            mimic: None,
        }
    }

    /// Create a new revolute joint
    pub fn revolute(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
        origin: RigidTransform,
        axis: DVec3,
        limits: JointLimits,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type: JointType::Revolute,
            parent_link: parent.into(),
            child_link: child.into(),
            origin,
            axis: axis.normalize_or_zero(),
            limits: Some(limits),
            mimic: None,
        }
    }

    /// Create a new prismatic joint
    pub fn prismatic(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
        origin: RigidTransform,
        axis: DVec3,
        limits: JointLimits,
    ) -> Self {
        Self {
            joint_type: JointType::Prismatic,
            ..Self::revolute(name, parent, child, origin, axis, limits)
        }
    }

    /// Create a new continuous joint
    pub fn continuous(
        name: impl Into<String>,
        parent: impl Into<String>,
        child: impl Into<String>,
        origin: RigidTransform,
        axis: DVec3,
    ) -> Self {
        Self {
            joint_type: JointType::Continuous,
            limits: None,
            ..Self::revolute(name, parent, child, origin, axis, JointLimits::default())
        }
    }

    /// Set mimic configuration to follow another joint
    pub fn with_mimic(mut self, mimic: JointMimic) -> Self {
        self.mimic = Some(mimic);
        self
    }

    /// Local motion produced by this joint at the given position
    pub fn motion(&self, position: f64) -> RigidTransform {
        match self.joint_type {
            JointType::Revolute | JointType::Continuous => {
                RigidTransform::from_axis_angle(self.axis, position)
            }
            JointType::Prismatic => RigidTransform::from_translation(self.axis * position),
            // Floating/planar would need more DOFs
            JointType::Fixed | JointType::Floating | JointType::Planar => {
                RigidTransform::IDENTITY
            }
        }
    }
}
