//! Workspace point cloud and its colormap

use glam::DVec3;
use serde::Serialize;

use crate::error::SceneError;

/// Hue of the lowest scalar (blue)
const HUE_LOW: f32 = 0.667;
/// Hue of the highest scalar (red)
const HUE_HIGH: f32 = 0.0;

/// Color-mapped point cloud, replaced as a whole
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceCloud {
    pub points: Vec<DVec3>,
    pub scalars: Vec<f64>,
    /// Per-point RGBA, alpha = opacity
    pub colors: Vec<[f32; 4]>,
    pub point_size: f32,
    pub opacity: f32,
    /// Scalar range mapped onto the hue ramp
    pub range: (f64, f64),
}

impl WorkspaceCloud {
    /// Requires one scalar per point
    pub fn new(
        points: Vec<DVec3>,
        scalars: Vec<f64>,
        point_size: f32,
        opacity: f32,
    ) -> Result<Self, SceneError> {
        if points.len() != scalars.len() {
            return Err(SceneError::LengthMismatch {
                points: points.len(),
                scalars: scalars.len(),
            });
        }

        let range = scalar_range(&scalars);
        let opacity = opacity.clamp(0.0, 1.0);
        let colors = scalars
            .iter()
            .map(|&s| {
                let [r, g, b] = scalar_color(normalize(s, range));
                [r, g, b, opacity]
            })
            .collect();

        Ok(Self {
            points,
            scalars,
            colors,
            point_size,
            opacity,
            range,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn scalar_range(scalars: &[f64]) -> (f64, f64) {
    let finite = scalars.iter().copied().filter(|s| s.is_finite());
    finite.fold(None, |range, s| match range {
        None => Some((s, s)),
        Some((lo, hi)) => Some((f64::min(lo, s), f64::max(hi, s))),
    })
    .unwrap_or((0.0, 0.0))
}

fn normalize(value: f64, (lo, hi): (f64, f64)) -> f32 {
    if hi > lo && value.is_finite() {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Blue-to-red hue ramp, `t` in `0..=1`
pub fn scalar_color(t: f32) -> [f32; 3] {
    let hue = HUE_LOW + (HUE_HIGH - HUE_LOW) * t.clamp(0.0, 1.0);
    hsv_to_rgb(hue, 1.0, 1.0)
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let h = (hue.rem_euclid(1.0)) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));
    match sector as u32 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}

/// Distance of each point from `reference` (default: centroid),
/// normalized by the largest distance
pub fn normalized_distance_scalars(points: &[DVec3], reference: Option<DVec3>) -> Vec<f64> {
    if points.is_empty() {
        return Vec::new();
    }
    let reference =
        reference.unwrap_or_else(|| points.iter().sum::<DVec3>() / points.len() as f64);
    let distances: Vec<f64> = points.iter().map(|p| p.distance(reference)).collect();
    let max = distances.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        distances.iter().map(|d| d / max).collect()
    } else {
        vec![0.0; points.len()]
    }
}

/// Holds at most one cloud
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLayer {
    cloud: Option<WorkspaceCloud>,
}

impl WorkspaceLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cloud; an empty cloud removes it
    pub fn show(&mut self, cloud: WorkspaceCloud) {
        self.cloud = (!cloud.is_empty()).then_some(cloud);
    }

    pub fn hide(&mut self) {
        self.cloud = None;
    }

    pub fn cloud(&self) -> Option<&WorkspaceCloud> {
        self.cloud.as_ref()
    }
}
