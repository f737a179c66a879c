//! Bounding-sphere contact checking

use std::collections::BTreeSet;

use glam::DVec3;

use crate::model::Link;
use crate::types::Geometry;

use super::{Contact, ContactManager, LinkTransforms};

/// Unordered link pairs that are never reported as contacts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllowedCollisionMatrix {
    pairs: BTreeSet<(String, String)>,
}

impl AllowedCollisionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn allow(&mut self, a: &str, b: &str) {
        self.pairs.insert(Self::key(a, b));
    }

    pub fn disallow(&mut self, a: &str, b: &str) {
        self.pairs.remove(&Self::key(a, b));
    }

    pub fn is_allowed(&self, a: &str, b: &str) -> bool {
        a == b || self.pairs.contains(&Self::key(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Enclosing sphere of a link, in the link frame
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinkSphere {
    center: DVec3,
    radius: f64,
}

/// Contact manager approximating every link by one bounding sphere.
///
/// Links whose geometry has no known extent (unresolved mesh files,
/// unsupported kinds) take no part in contact checks.
#[derive(Debug, Clone)]
pub struct SphereContactManager {
    spheres: Vec<(String, LinkSphere)>,
    allowed: AllowedCollisionMatrix,
    margin: f64,
}

impl SphereContactManager {
    pub fn from_links(links: &[Link], allowed: AllowedCollisionMatrix, margin: f64) -> Self {
        let spheres = links
            .iter()
            .filter_map(|link| link_sphere(link).map(|s| (link.name.clone(), s)))
            .collect();
        Self {
            spheres,
            allowed,
            margin: margin.max(0.0),
        }
    }

    /// Pairs closer than this distance are reported
    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn allowed(&self) -> &AllowedCollisionMatrix {
        &self.allowed
    }

    pub fn allowed_mut(&mut self) -> &mut AllowedCollisionMatrix {
        &mut self.allowed
    }

    /// Links that have a bounding sphere
    pub fn checked_links(&self) -> impl Iterator<Item = &str> {
        self.spheres.iter().map(|(name, _)| name.as_str())
    }
}

impl ContactManager for SphereContactManager {
    fn contact_test(&self, transforms: &LinkTransforms) -> Vec<Contact> {
        let placed: Vec<(&str, DVec3, f64)> = self
            .spheres
            .iter()
            .filter_map(|(name, sphere)| {
                transforms
                    .get(name)
                    .map(|t| (name.as_str(), t.transform_point(sphere.center), sphere.radius))
            })
            .collect();

        let mut contacts = Vec::new();
        for (i, &(name_a, center_a, radius_a)) in placed.iter().enumerate() {
            for &(name_b, center_b, radius_b) in &placed[i + 1..] {
                if self.allowed.is_allowed(name_a, name_b) {
                    continue;
                }
                let offset = center_b - center_a;
                let separation = offset.length();
                let distance = separation - radius_a - radius_b;
                if distance >= self.margin {
                    continue;
                }
                let normal = if separation > f64::EPSILON {
                    offset / separation
                } else {
                    DVec3::Z
                };
                contacts.push(Contact {
                    link_names: [name_a.to_string(), name_b.to_string()],
                    nearest_points: [center_a + normal * radius_a, center_b - normal * radius_b],
                    normal,
                    distance,
                });
            }
        }
        contacts
    }
}

fn link_sphere(link: &Link) -> Option<LinkSphere> {
    let parts: Vec<LinkSphere> = link
        .visuals
        .iter()
        .filter_map(|visual| {
            let (min, max) = visual.geometry.local_bounds()?;
            let radius = match visual.geometry {
                Geometry::Sphere { radius } => radius,
                _ => (max - min).length() * 0.5,
            };
            Some(LinkSphere {
                center: visual.origin.transform_point((min + max) * 0.5),
                radius,
            })
        })
        .collect();

    let first = *parts.first()?;
    let (min, max) = parts.iter().fold(
        (first.center - first.radius, first.center + first.radius),
        |(min, max), s| (min.min(s.center - s.radius), max.max(s.center + s.radius)),
    );
    let center = (min + max) * 0.5;
    let radius = parts
        .iter()
        .map(|s| s.center.distance(center) + s.radius)
        .fold(0.0, f64::max);
    Some(LinkSphere { center, radius })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisualGeometry;
    use crate::types::RigidTransform;
    use approx::assert_abs_diff_eq;

    fn ball(name: &str) -> Link {
        Link::new(name).with_visual(VisualGeometry::new(Geometry::Sphere { radius: 0.5 }))
    }

    fn placed(pairs: &[(&str, DVec3)]) -> LinkTransforms {
        pairs
            .iter()
            .map(|(n, p)| (n.to_string(), RigidTransform::from_translation(*p)))
            .collect()
    }

    #[test]
    fn test_overlapping_spheres_report_contact() {
        let manager =
            SphereContactManager::from_links(&[ball("a"), ball("b")], Default::default(), 0.0);
        let contacts = manager.contact_test(&placed(&[("a", DVec3::ZERO), ("b", DVec3::X * 0.8)]));
        assert_eq!(contacts.len(), 1);
        let contact = &contacts[0];
        assert_eq!(contact.link_names, ["a".to_string(), "b".to_string()]);
        assert_abs_diff_eq!(contact.distance, -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(contact.normal.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(contact.nearest_points[0].x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(contact.nearest_points[1].x, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_margin_and_separation() {
        let far = placed(&[("a", DVec3::ZERO), ("b", DVec3::X * 1.05)]);
        let strict = SphereContactManager::from_links(&[ball("a"), ball("b")], Default::default(), 0.0);
        assert!(strict.contact_test(&far).is_empty());

        let loose = SphereContactManager::from_links(&[ball("a"), ball("b")], Default::default(), 0.1);
        assert_eq!(loose.contact_test(&far).len(), 1);
    }

    #[test]
    fn test_allowed_pairs_are_skipped() {
        let mut acm = AllowedCollisionMatrix::new();
        acm.allow("b", "a");
        assert!(acm.is_allowed("a", "b"));
        let manager = SphereContactManager::from_links(&[ball("a"), ball("b")], acm, 0.0);
        assert!(manager.contact_test(&placed(&[("a", DVec3::ZERO), ("b", DVec3::ZERO)])).is_empty());
    }

    #[test]
    fn test_links_without_extent_are_ignored() {
        let mesh = Link::new("m").with_visual(VisualGeometry::new(Geometry::mesh_resource("x.stl")));
        let manager =
            SphereContactManager::from_links(&[ball("a"), mesh, Link::new("empty")], Default::default(), 0.0);
        assert_eq!(manager.checked_links().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_link_sphere_encloses_offset_visuals() {
        let link = Link::new("pair")
            .with_visual(
                VisualGeometry::new(Geometry::Sphere { radius: 0.1 })
                    .with_origin(RigidTransform::from_translation(DVec3::X)),
            )
            .with_visual(
                VisualGeometry::new(Geometry::Sphere { radius: 0.1 })
                    .with_origin(RigidTransform::from_translation(-DVec3::X)),
            );
        let sphere = link_sphere(&link).unwrap();
        assert_abs_diff_eq!(sphere.center.length(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sphere.radius, 1.1, epsilon = 1e-12);
    }
}
