//! Identifier-based kinematic tree built once per model load

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::EnvironmentError;

use super::{Joint, Link};

/// Read-only adjacency over links and joints.
///
/// Edges are stored as names; the tree never owns links or joints.
#[derive(Debug, Clone, Default)]
pub struct KinematicTree {
    roots: Vec<String>,
    /// child link -> (joint name, parent link)
    parent: HashMap<String, (String, String)>,
    /// parent link -> [(joint name, child link)]
    children: HashMap<String, Vec<(String, String)>>,
    /// Links ordered so that every parent precedes its children
    order: Vec<String>,
}

impl KinematicTree {
    /// Build the adjacency for a link/joint catalogue
    pub fn build(links: &[Link], joints: &[Joint]) -> Result<Self, EnvironmentError> {
        if links.is_empty() {
            return Err(EnvironmentError::EmptyModel);
        }

        let mut known = HashSet::new();
        for link in links {
            if !known.insert(link.name.as_str()) {
                return Err(EnvironmentError::DuplicateName {
                    kind: "link",
                    name: link.name.clone(),
                });
            }
        }

        let mut tree = Self::default();
        let mut joint_names = HashSet::new();
        for joint in joints {
            if !joint_names.insert(joint.name.as_str()) {
                return Err(EnvironmentError::DuplicateName {
                    kind: "joint",
                    name: joint.name.clone(),
                });
            }
            for link in [&joint.parent_link, &joint.child_link] {
                if !known.contains(link.as_str()) {
                    return Err(EnvironmentError::UnknownLink(link.clone()));
                }
            }
            if tree.parent.contains_key(&joint.child_link) {
                return Err(EnvironmentError::MultipleParents(joint.child_link.clone()));
            }
            if tree.would_create_cycle(&joint.parent_link, &joint.child_link) {
                return Err(EnvironmentError::Cycle(joint.name.clone()));
            }

            tree.parent.insert(
                joint.child_link.clone(),
                (joint.name.clone(), joint.parent_link.clone()),
            );
            tree.children
                .entry(joint.parent_link.clone())
                .or_default()
                .push((joint.name.clone(), joint.child_link.clone()));
        }

        // Roots keep catalogue order so traversal is deterministic
        tree.roots = links
            .iter()
            .filter(|l| !tree.parent.contains_key(&l.name))
            .map(|l| l.name.clone())
            .collect();

        let mut queue: VecDeque<String> = tree.roots.iter().cloned().collect();
        while let Some(link) = queue.pop_front() {
            if let Some(children) = tree.children.get(&link) {
                queue.extend(children.iter().map(|(_, child)| child.clone()));
            }
            tree.order.push(link);
        }

        Ok(tree)
    }

    /// Check if connecting parent to child would create a cycle
    fn would_create_cycle(&self, parent: &str, child: &str) -> bool {
        // Check if child is an ancestor of parent
        let mut current = Some(parent);
        while let Some(link) = current {
            if link == child {
                return true;
            }
            current = self.parent.get(link).map(|(_, p)| p.as_str());
        }
        false
    }

    /// Links that are not the child of any joint
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// First root link, if any
    pub fn root(&self) -> Option<&str> {
        self.roots.first().map(String::as_str)
    }

    /// All links, parents before children
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Name of the joint whose child is `link`, with the parent link name
    pub fn parent_of(&self, link: &str) -> Option<(&str, &str)> {
        self.parent
            .get(link)
            .map(|(joint, parent)| (joint.as_str(), parent.as_str()))
    }

    /// `(joint, child)` pairs leaving `link`
    pub fn children_of(&self, link: &str) -> impl Iterator<Item = (&str, &str)> {
        self.children
            .get(link)
            .into_iter()
            .flatten()
            .map(|(joint, child)| (joint.as_str(), child.as_str()))
    }

    pub fn contains_link(&self, link: &str) -> bool {
        self.order.iter().any(|l| l == link)
    }

    /// Joint names from the tree root down to `link`
    pub fn joint_chain(&self, link: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = link;
        while let Some((joint, parent)) = self.parent_of(current) {
            chain.push(joint.to_string());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Ancestors of `link` starting with `link` itself
    fn ancestors(&self, link: &str) -> Vec<String> {
        let mut path = vec![link.to_string()];
        let mut current = link;
        while let Some((_, parent)) = self.parent_of(current) {
            path.push(parent.to_string());
            current = parent;
        }
        path
    }

    /// Link names along the tree path from `base` to `tip`, both inclusive.
    ///
    /// Returns `None` when either link is unknown or they share no root.
    pub fn path_between(&self, base: &str, tip: &str) -> Option<Vec<String>> {
        if !self.contains_link(base) || !self.contains_link(tip) {
            return None;
        }
        let up_from_base = self.ancestors(base);
        let up_from_tip = self.ancestors(tip);

        let (base_idx, tip_idx) = up_from_base
            .iter()
            .enumerate()
            .find_map(|(i, link)| up_from_tip.iter().position(|l| l == link).map(|j| (i, j)))?;

        let mut path: Vec<String> = up_from_base[..=base_idx].to_vec();
        path.extend(up_from_tip[..tip_idx].iter().rev().cloned());
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RigidTransform;

    fn chain_model() -> (Vec<Link>, Vec<Joint>) {
        let links = ["base", "upper", "lower", "tool", "side"]
            .into_iter()
            .map(Link::new)
            .collect();
        let joints = vec![
            Joint::fixed("j_upper", "base", "upper", RigidTransform::IDENTITY),
            Joint::fixed("j_lower", "upper", "lower", RigidTransform::IDENTITY),
            Joint::fixed("j_tool", "lower", "tool", RigidTransform::IDENTITY),
            Joint::fixed("j_side", "upper", "side", RigidTransform::IDENTITY),
        ];
        (links, joints)
    }

    #[test]
    fn test_order_parents_first() {
        let (links, joints) = chain_model();
        let tree = KinematicTree::build(&links, &joints).unwrap();
        let order = tree.topological_order();
        let pos = |name: &str| order.iter().position(|l| l == name).unwrap();
        assert_eq!(tree.root(), Some("base"));
        assert!(pos("base") < pos("upper"));
        assert!(pos("upper") < pos("lower"));
        assert!(pos("lower") < pos("tool"));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn test_joint_chain() {
        let (links, joints) = chain_model();
        let tree = KinematicTree::build(&links, &joints).unwrap();
        assert_eq!(tree.joint_chain("tool"), vec!["j_upper", "j_lower", "j_tool"]);
        assert!(tree.joint_chain("base").is_empty());
    }

    #[test]
    fn test_path_between_branches() {
        let (links, joints) = chain_model();
        let tree = KinematicTree::build(&links, &joints).unwrap();
        assert_eq!(
            tree.path_between("tool", "side").unwrap(),
            vec!["tool", "lower", "upper", "side"]
        );
        assert_eq!(
            tree.path_between("base", "tool").unwrap(),
            vec!["base", "upper", "lower", "tool"]
        );
        assert!(tree.path_between("base", "missing").is_none());
    }

    #[test]
    fn test_cycle_rejected() {
        let links: Vec<Link> = ["a", "b"].into_iter().map(Link::new).collect();
        let joints = vec![
            Joint::fixed("ab", "a", "b", RigidTransform::IDENTITY),
            Joint::fixed("ba", "b", "a", RigidTransform::IDENTITY),
        ];
        let err = KinematicTree::build(&links, &joints).unwrap_err();
        assert!(matches!(err, EnvironmentError::Cycle(_)));
    }

    #[test]
    fn test_unknown_link_rejected() {
        let links = vec![Link::new("a")];
        let joints = vec![Joint::fixed("ab", "a", "b", RigidTransform::IDENTITY)];
        assert_eq!(
            KinematicTree::build(&links, &joints).unwrap_err(),
            EnvironmentError::UnknownLink("b".into())
        );
    }
}
