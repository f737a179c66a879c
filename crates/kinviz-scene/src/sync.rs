//! Joint values -> link transforms -> registry nodes

use kinviz_core::{Environment, EnvironmentError, JointValues, LinkTransforms, RigidTransform};

use crate::error::SceneError;
use crate::registry::SceneRegistry;

/// Keeps the last known joint values and pushes forward kinematics
/// results into the registry.
#[derive(Debug, Clone, Default)]
pub struct TransformSync {
    values: JointValues,
}

impl TransformSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from zero for every movable joint of `env`
    pub fn reset(&mut self, env: &dyn Environment) {
        self.values = env
            .joints()
            .iter()
            .filter(|j| j.joint_type.is_movable() && j.mimic.is_none())
            .map(|j| (j.name.clone(), 0.0))
            .collect();
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Last applied joint values
    pub fn joint_values(&self) -> &JointValues {
        &self.values
    }

    /// Current values overlaid with the known entries of `updates`.
    ///
    /// Names that are not joints of `env` are dropped with a warning.
    pub fn merge(&self, env: &dyn Environment, updates: &JointValues) -> JointValues {
        let mut merged = self.values.clone();
        for (name, value) in updates {
            if env.joint(name).is_none() {
                tracing::warn!(joint = %name, "Ignoring unknown joint");
                continue;
            }
            if !value.is_finite() {
                tracing::warn!(joint = %name, value, "Ignoring non-finite joint value");
                continue;
            }
            merged.insert(name.clone(), *value);
        }
        merged
    }

    /// Apply `updates` and push the new transforms to `registry`.
    ///
    /// Nothing changes if forward kinematics fails.
    pub fn apply(
        &mut self,
        env: &dyn Environment,
        registry: &mut SceneRegistry,
        updates: &JointValues,
    ) -> Result<LinkTransforms, SceneError> {
        let candidate = self.merge(env, updates);
        let transforms = env.state(&candidate)?;
        registry.apply_transforms(&transforms);
        self.values = candidate;
        Ok(transforms)
    }

    /// Pose of `link` for the current values overlaid with `updates`,
    /// leaving the displayed pose untouched
    pub fn tcp_pose(
        &self,
        env: &dyn Environment,
        updates: &JointValues,
        link: &str,
    ) -> Result<RigidTransform, SceneError> {
        let transforms = env.state(&self.merge(env, updates))?;
        transforms
            .get(link)
            .copied()
            .ok_or_else(|| EnvironmentError::UnknownLink(link.to_string()).into())
    }
}
