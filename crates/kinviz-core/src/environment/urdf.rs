//! URDF-backed reference environment
//!
//! Imports a URDF robot description and answers forward kinematics and
//! Jacobian queries directly from the joint tree.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::DVec3;

use crate::error::EnvironmentError;
use crate::model::{Joint, KinematicTree, Link, VisualGeometry};
use crate::resource::{FileResourceLocator, MemoryResourceLocator, ResourceLocator};
use crate::types::{Geometry, JointLimits, JointMimic, JointType, Pose};

use super::{
    AllowedCollisionMatrix, ContactManager, Environment, Jacobian, JointValues, LinkTransforms,
    SphereContactManager,
};

/// Mimic chains deeper than this are treated as broken
const MAX_MIMIC_DEPTH: usize = 8;

/// Environment built from a URDF robot description
pub struct UrdfEnvironment {
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
    joint_index: HashMap<String, usize>,
    tree: KinematicTree,
    locator: Arc<dyn ResourceLocator>,
    contacts: Option<SphereContactManager>,
}

impl std::fmt::Debug for UrdfEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrdfEnvironment")
            .field("name", &self.name)
            .field("links", &self.links.len())
            .field("joints", &self.joints.len())
            .field("contacts", &self.contacts.is_some())
            .finish()
    }
}

impl UrdfEnvironment {
    /// Build an environment from an already converted catalogue
    pub fn new(
        name: impl Into<String>,
        links: Vec<Link>,
        joints: Vec<Joint>,
    ) -> Result<Self, EnvironmentError> {
        let tree = KinematicTree::build(&links, &joints)?;
        let joint_index = joints
            .iter()
            .enumerate()
            .map(|(i, j)| (j.name.clone(), i))
            .collect();

        Ok(Self {
            name: name.into(),
            links,
            joints,
            joint_index,
            tree,
            locator: Arc::new(MemoryResourceLocator::new()),
            contacts: None,
        })
    }

    /// Parse a URDF document
    pub fn from_urdf_str(xml: &str) -> Result<Self, EnvironmentError> {
        let robot =
            urdf_rs::read_from_string(xml).map_err(|e| EnvironmentError::UrdfParse(e.to_string()))?;
        Self::from_robot(&robot)
    }

    /// Read a URDF file; relative mesh references resolve against its directory
    pub fn from_urdf_file(path: impl AsRef<Path>) -> Result<Self, EnvironmentError> {
        let path = path.as_ref();
        let robot =
            urdf_rs::read_file(path).map_err(|e| EnvironmentError::UrdfParse(e.to_string()))?;
        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| ".".into());
        Ok(Self::from_robot(&robot)?.with_resource_locator(Arc::new(FileResourceLocator::new(base_dir))))
    }

    /// Convert a parsed URDF robot
    pub fn from_robot(robot: &urdf_rs::Robot) -> Result<Self, EnvironmentError> {
        if robot.links.is_empty() {
            return Err(EnvironmentError::EmptyModel);
        }

        // Collect materials
        let material_colors: HashMap<&str, [f32; 4]> = robot
            .materials
            .iter()
            .filter_map(|m| m.color.as_ref().map(|c| (m.name.as_str(), convert_rgba(&c.rgba))))
            .collect();

        let links = robot
            .links
            .iter()
            .map(|urdf_link| Link {
                name: urdf_link.name.clone(),
                visuals: urdf_link
                    .visual
                    .iter()
                    .map(|visual| convert_visual(visual, &material_colors))
                    .collect(),
            })
            .collect();

        let joints = robot.joints.iter().map(convert_joint).collect();

        Self::new(robot.name.clone(), links, joints)
    }

    pub fn with_resource_locator(mut self, locator: Arc<dyn ResourceLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Enable contact checking with bounding spheres.
    ///
    /// Links connected by a joint are allowed to touch.
    pub fn with_contact_checking(mut self, margin: f64) -> Self {
        let mut acm = AllowedCollisionMatrix::new();
        for joint in &self.joints {
            acm.allow(&joint.parent_link, &joint.child_link);
        }
        self.contacts = Some(SphereContactManager::from_links(&self.links, acm, margin));
        self
    }

    /// Allowed collision pairs, when contact checking is enabled
    pub fn allowed_collisions_mut(&mut self) -> Option<&mut AllowedCollisionMatrix> {
        self.contacts.as_mut().map(|c| c.allowed_mut())
    }

    pub fn tree(&self) -> &KinematicTree {
        &self.tree
    }

    fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joint_index.get(name).map(|&i| &self.joints[i])
    }

    /// Position of `joint`, following mimic relations
    fn joint_position(&self, joint: &Joint, values: &JointValues, depth: usize) -> f64 {
        if let Some(mimic) = &joint.mimic
            && depth < MAX_MIMIC_DEPTH
            && let Some(source) = self.joint_by_name(&mimic.joint)
        {
            return mimic.calculate(self.joint_position(source, values, depth + 1));
        }
        values.get(&joint.name).copied().unwrap_or(0.0)
    }
}

impl Environment for UrdfEnvironment {
    fn name(&self) -> &str {
        &self.name
    }

    fn links(&self) -> &[Link] {
        &self.links
    }

    fn joints(&self) -> &[Joint] {
        &self.joints
    }

    fn state(&self, joint_values: &JointValues) -> Result<LinkTransforms, EnvironmentError> {
        let mut transforms = LinkTransforms::new();
        for link in self.tree.topological_order() {
            let transform = match self.tree.parent_of(link) {
                Some((joint_name, parent)) => {
                    let joint = self
                        .joint_by_name(joint_name)
                        .ok_or_else(|| EnvironmentError::UnknownJoint(joint_name.to_string()))?;
                    let parent_transform = transforms
                        .get(parent)
                        .copied()
                        .ok_or_else(|| EnvironmentError::UnknownLink(parent.to_string()))?;
                    let position = self.joint_position(joint, joint_values, 0);
                    parent_transform * joint.origin * joint.motion(position)
                }
                None => Default::default(),
            };
            transforms.insert(link.clone(), transform);
        }
        Ok(transforms)
    }

    fn jacobian(
        &self,
        link: &str,
        joint_values: &JointValues,
    ) -> Result<Jacobian, EnvironmentError> {
        if !self.tree.contains_link(link) {
            return Err(EnvironmentError::UnknownLink(link.to_string()));
        }
        let transforms = self.state(joint_values)?;
        let end = transforms[link].translation;

        let mut jacobian = Jacobian::default();
        for joint_name in self.tree.joint_chain(link) {
            let Some(joint) = self.joint_by_name(&joint_name) else {
                continue;
            };
            if !joint.joint_type.is_movable() {
                continue;
            }

            let position = self.joint_position(joint, joint_values, 0);
            let frame = transforms[&joint.parent_link] * joint.origin * joint.motion(position);
            let axis = frame.transform_vector(joint.axis);
            let column = if joint.joint_type.is_rotational() {
                let linear = axis.cross(end - frame.translation);
                [linear.x, linear.y, linear.z, axis.x, axis.y, axis.z]
            } else {
                [axis.x, axis.y, axis.z, 0.0, 0.0, 0.0]
            };

            // Mimic joints move with their source, so they add to its column
            let (owner, scale) = match &joint.mimic {
                Some(mimic) if self.joint_index.contains_key(&mimic.joint) => {
                    (mimic.joint.clone(), mimic.multiplier)
                }
                _ => (joint.name.clone(), 1.0),
            };
            match jacobian.joint_names.iter().position(|n| *n == owner) {
                Some(i) => {
                    for (entry, value) in jacobian.columns[i].iter_mut().zip(column) {
                        *entry += scale * value;
                    }
                }
                None => {
                    jacobian.joint_names.push(owner);
                    jacobian.columns.push(column.map(|v| scale * v));
                }
            }
        }

        if jacobian.is_empty() {
            return Err(EnvironmentError::KinematicsUnavailable {
                link: link.to_string(),
                reason: "no movable joint between root and link".into(),
            });
        }
        Ok(jacobian)
    }

    fn contact_manager(&self) -> Option<&dyn ContactManager> {
        self.contacts.as_ref().map(|c| c as &dyn ContactManager)
    }

    fn resource_locator(&self) -> &dyn ResourceLocator {
        self.locator.as_ref()
    }
}

fn convert_rgba(rgba: &urdf_rs::Vec4) -> [f32; 4] {
    rgba.0.map(|c| c as f32)
}

fn convert_visual(
    visual: &urdf_rs::Visual,
    material_colors: &HashMap<&str, [f32; 4]>,
) -> VisualGeometry {
    // Inline color wins over the robot-level material table
    let color = visual.material.as_ref().and_then(|mat| {
        mat.color
            .as_ref()
            .map(|c| convert_rgba(&c.rgba))
            .or_else(|| material_colors.get(mat.name.as_str()).copied())
    });

    VisualGeometry {
        name: visual.name.clone(),
        geometry: Geometry::from(&visual.geometry),
        origin: Pose::from(&visual.origin).to_transform(),
        color,
    }
}

fn convert_joint(urdf_joint: &urdf_rs::Joint) -> Joint {
    let joint_type = JointType::from(&urdf_joint.joint_type);
    let limits = joint_type.has_limits().then(|| JointLimits {
        lower: urdf_joint.limit.lower,
        upper: urdf_joint.limit.upper,
        effort: urdf_joint.limit.effort,
        velocity: urdf_joint.limit.velocity,
    });

    Joint {
        name: urdf_joint.name.clone(),
        joint_type,
        parent_link: urdf_joint.parent.link.clone(),
        child_link: urdf_joint.child.link.clone(),
        origin: Pose::from(&urdf_joint.origin).to_transform(),
        axis: DVec3::from(urdf_joint.axis.xyz.0).normalize_or_zero(),
        limits,
        mimic: urdf_joint.mimic.as_ref().map(|m| {
            JointMimic::with_params(
                m.joint.clone(),
                m.multiplier.unwrap_or(1.0),
                m.offset.unwrap_or(0.0),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const PLANAR_ARM: &str = r#"<?xml version="1.0"?>
<robot name="planar_arm">
  <material name="blue"><color rgba="0 0 1 1"/></material>
  <link name="base">
    <visual><geometry><box size="0.2 0.2 0.1"/></geometry><material name="blue"/></visual>
  </link>
  <link name="upper">
    <visual>
      <origin xyz="0.5 0 0" rpy="0 1.5708 0"/>
      <geometry><cylinder radius="0.05" length="1.0"/></geometry>
    </visual>
  </link>
  <link name="lower">
    <visual><geometry><sphere radius="0.05"/></geometry></visual>
  </link>
  <link name="tool"/>
  <joint name="shoulder" type="revolute">
    <parent link="base"/><child link="upper"/>
    <axis xyz="0 0 1"/>
    <limit lower="-3.0" upper="3.0" effort="10" velocity="1"/>
  </joint>
  <joint name="elbow" type="revolute">
    <parent link="upper"/><child link="lower"/>
    <origin xyz="1 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="10" velocity="1"/>
  </joint>
  <joint name="flange" type="fixed">
    <parent link="lower"/><child link="tool"/>
    <origin xyz="1 0 0"/>
  </joint>
</robot>
"#;

    fn arm() -> UrdfEnvironment {
        UrdfEnvironment::from_urdf_str(PLANAR_ARM).unwrap()
    }

    fn values(pairs: &[(&str, f64)]) -> JointValues {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn test_import_catalogue() {
        let env = arm();
        assert_eq!(env.name(), "planar_arm");
        assert_eq!(env.links().len(), 4);
        assert_eq!(env.joints().len(), 3);
        assert_eq!(env.link("base").unwrap().visuals[0].color, Some([0.0, 0.0, 1.0, 1.0]));
        assert!(env.link("tool").unwrap().visuals.is_empty());
        assert_eq!(env.joint("flange").unwrap().limits, None);
        assert_eq!(env.joint("shoulder").unwrap().limits.unwrap().range(), (-3.0, 3.0));
        assert!(env.contact_manager().is_none());
    }

    #[test]
    fn test_state_zero_configuration() {
        let transforms = arm().state(&JointValues::new()).unwrap();
        assert_abs_diff_eq!(transforms["tool"].translation.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(transforms["tool"].translation.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_state_folded_elbow() {
        let transforms = arm()
            .state(&values(&[("shoulder", std::f64::consts::FRAC_PI_2), ("elbow", -std::f64::consts::FRAC_PI_2)]))
            .unwrap();
        let tool = transforms["tool"].translation;
        assert_abs_diff_eq!(tool.x, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tool.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_jacobian_planar_arm() {
        let jacobian = arm().jacobian("tool", &JointValues::new()).unwrap();
        assert_eq!(jacobian.joint_names, vec!["shoulder", "elbow"]);
        // z x (2, 0, 0) and z x (1, 0, 0)
        assert_abs_diff_eq!(jacobian.get(1, 0), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(jacobian.get(1, 1), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(jacobian.get(5, 0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_unavailable_for_root() {
        let err = arm().jacobian("base", &JointValues::new()).unwrap_err();
        assert!(matches!(err, EnvironmentError::KinematicsUnavailable { .. }));
        assert!(matches!(
            arm().jacobian("ghost", &JointValues::new()),
            Err(EnvironmentError::UnknownLink(_))
        ));
    }

    #[test]
    fn test_mimic_joint_follows_source() {
        let links = ["base", "a", "b"].into_iter().map(Link::new).collect();
        let joints = vec![
            Joint::continuous("drive", "base", "a", Default::default(), DVec3::Z),
            Joint::continuous("follow", "a", "b", Default::default(), DVec3::Z)
                .with_mimic(JointMimic::with_params("drive", 2.0, 0.0)),
        ];
        let env = UrdfEnvironment::new("mimic", links, joints).unwrap();
        let transforms = env.state(&values(&[("drive", 0.25), ("follow", 9.0)])).unwrap();
        let (axis, angle) = transforms["b"].rotation.to_axis_angle();
        assert_abs_diff_eq!(axis.z, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(angle, 0.75, epsilon = 1e-9);

        let jacobian = env.jacobian("b", &JointValues::new()).unwrap();
        assert_eq!(jacobian.joint_names, vec!["drive"]);
        assert_abs_diff_eq!(jacobian.get(5, 0), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_urdf() {
        assert!(matches!(
            UrdfEnvironment::from_urdf_str("<robot"),
            Err(EnvironmentError::UrdfParse(_))
        ));
    }
}
