//! Joint-related type definitions

use serde::{Deserialize, Serialize};

/// Joint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JointType {
    #[default]
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
}

impl JointType {
    /// Check if this joint type is driven by a single scalar value
    pub fn is_movable(&self) -> bool {
        matches!(
            self,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic
        )
    }

    /// Check if this joint type has limits
    pub fn has_limits(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    /// Check if this joint rotates about its axis
    pub fn is_rotational(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Continuous)
    }
}

impl From<&urdf_rs::JointType> for JointType {
    fn from(urdf_type: &urdf_rs::JointType) -> Self {
        match urdf_type {
            urdf_rs::JointType::Fixed => JointType::Fixed,
            urdf_rs::JointType::Revolute => JointType::Revolute,
            urdf_rs::JointType::Continuous => JointType::Continuous,
            urdf_rs::JointType::Prismatic => JointType::Prismatic,
            urdf_rs::JointType::Floating => JointType::Floating,
            urdf_rs::JointType::Planar => JointType::Planar,
            urdf_rs::JointType::Spherical => JointType::Floating, // Approximate as floating
        }
    }
}

/// Joint limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    /// Lower position limit (rad or m)
    pub lower: f64,
    /// Upper position limit (rad or m)
    pub upper: f64,
    /// Maximum effort (N or Nm)
    pub effort: f64,
    /// Maximum velocity (rad/s or m/s)
    pub velocity: f64,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            lower: -std::f64::consts::PI,
            upper: std::f64::consts::PI,
            effort: 100.0,
            velocity: 1.0,
        }
    }
}

impl JointLimits {
    /// Create limits with specified range
    pub fn with_range(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            ..Self::default()
        }
    }

    /// Position range as `(lower, upper)`
    pub fn range(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// True when the range is usable for sampling
    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower < self.upper
            && (self.upper - self.lower).is_finite()
    }
}

/// Joint mimic configuration
/// Makes this joint follow another joint's position: value = multiplier * other_joint + offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMimic {
    /// Name of the joint to mimic
    pub joint: String,
    /// Multiplier applied to the mimicked joint's position (default: 1.0)
    pub multiplier: f64,
    /// Offset added after multiplication (default: 0.0)
    pub offset: f64,
}

impl JointMimic {
    pub fn with_params(joint: impl Into<String>, multiplier: f64, offset: f64) -> Self {
        Self {
            joint: joint.into(),
            multiplier,
            offset,
        }
    }

    /// Calculate the mimic value from the source joint's position
    pub fn calculate(&self, source_position: f64) -> f64 {
        self.multiplier * source_position + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movable_kinds() {
        assert!(JointType::Revolute.is_movable());
        assert!(JointType::Continuous.is_movable());
        assert!(JointType::Prismatic.is_movable());
        assert!(!JointType::Fixed.is_movable());
        assert!(!JointType::Floating.is_movable());
    }

    #[test]
    fn test_mimic_calculate() {
        let mimic = JointMimic::with_params("j1", -2.0, 0.5);
        assert_eq!(mimic.calculate(1.0), -1.5);
    }

    #[test]
    fn test_limits_bounded() {
        assert!(JointLimits::with_range(-1.0, 1.0).is_bounded());
        assert!(!JointLimits::with_range(0.0, 0.0).is_bounded());
        assert!(!JointLimits::with_range(f64::NEG_INFINITY, 0.0).is_bounded());
        assert!(!JointLimits::with_range(f64::NAN, 1.0).is_bounded());
        assert!(!JointLimits::with_range(-1e308, 1e308).is_bounded());
    }
}
