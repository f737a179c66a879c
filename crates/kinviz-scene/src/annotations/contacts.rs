//! Contact markers and normal arrows

use std::collections::BTreeSet;

use glam::DVec3;
use kinviz_core::Contact;
use serde::Serialize;

/// Sphere marker at a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointMarker {
    pub position: DVec3,
    pub radius: f32,
    pub color: [f32; 4],
}

/// Arrow from `origin` along `direction` (unit) with length `length`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Arrow {
    pub origin: DVec3,
    pub direction: DVec3,
    pub length: f32,
    pub color: [f32; 4],
}

impl Arrow {
    pub fn tip(&self) -> DVec3 {
        self.origin + self.direction * self.length as f64
    }
}

/// Styling of the contact overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactStyle {
    pub point_radius: f32,
    pub point_color: [f32; 4],
    pub normal_scale: f32,
    pub normal_color: [f32; 4],
}

/// Markers for the most recent contact set
#[derive(Debug, Clone, Default)]
pub struct ContactLayer {
    contacts: Vec<Contact>,
    markers: Vec<PointMarker>,
    arrows: Vec<Arrow>,
}

impl ContactLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole contact set; returns the links involved
    pub fn replace(&mut self, contacts: &[Contact], style: &ContactStyle) -> BTreeSet<String> {
        self.clear();

        let mut links = BTreeSet::new();
        for contact in contacts {
            for point in contact.nearest_points {
                self.markers.push(PointMarker {
                    position: point,
                    radius: style.point_radius,
                    color: style.point_color,
                });
            }
            let direction = contact.normal.normalize_or_zero();
            if direction != DVec3::ZERO {
                self.arrows.push(Arrow {
                    origin: contact.nearest_points[0],
                    direction,
                    length: style.normal_scale,
                    color: style.normal_color,
                });
            }
            links.extend(contact.link_names.iter().cloned());
        }
        self.contacts = contacts.to_vec();
        links
    }

    pub fn clear(&mut self) {
        self.contacts.clear();
        self.markers.clear();
        self.arrows.clear();
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn markers(&self) -> &[PointMarker] {
        &self.markers
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
