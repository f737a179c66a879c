//! Frame triads, TCP marker, IK target frame and FK chain overlay

use glam::DVec3;
use kinviz_core::RigidTransform;
use serde::Serialize;

use super::{LineStyle, PointMarker};
use crate::registry::SceneRegistry;

/// Triad at an explicit pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameMarker {
    pub pose: RigidTransform,
    pub size: f32,
}

/// Polyline through link origins along a tree path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FkChain {
    pub base: String,
    pub tip: String,
    /// Links from `base` to `tip`, both included
    pub links: Vec<String>,
    pub style: LineStyle,
}

impl FkChain {
    /// Origins of the chain links at their current node transforms
    pub fn points(&self, registry: &SceneRegistry) -> Vec<DVec3> {
        self.links
            .iter()
            .filter_map(|link| registry.get(link))
            .map(|node| node.transform.translation)
            .collect()
    }
}

/// Frame-related overlays.
///
/// Link triads are flagged on the scene nodes themselves; this layer
/// keeps their size and the overlays that are not tied to a node.
#[derive(Debug, Clone)]
pub struct FrameLayer {
    frame_size: f32,
    tcp_link: Option<String>,
    tcp_marker: Option<PointMarker>,
    target_frame: Option<FrameMarker>,
    fk_chain: Option<FkChain>,
}

impl FrameLayer {
    pub fn new(frame_size: f32) -> Self {
        Self {
            frame_size,
            tcp_link: None,
            tcp_marker: None,
            target_frame: None,
            fk_chain: None,
        }
    }

    pub fn frame_size(&self) -> f32 {
        self.frame_size
    }

    pub fn set_frame_size(&mut self, size: f32) {
        self.frame_size = size;
    }

    pub fn tcp_link(&self) -> Option<&str> {
        self.tcp_link.as_deref()
    }

    pub fn set_tcp_link(&mut self, link: Option<String>) {
        self.tcp_link = link;
    }

    pub fn tcp_marker(&self) -> Option<&PointMarker> {
        self.tcp_marker.as_ref()
    }

    pub fn set_tcp_marker(&mut self, marker: Option<PointMarker>) {
        self.tcp_marker = marker;
    }

    pub fn target_frame(&self) -> Option<&FrameMarker> {
        self.target_frame.as_ref()
    }

    pub fn set_target_frame(&mut self, frame: Option<FrameMarker>) {
        self.target_frame = frame;
    }

    pub fn fk_chain(&self) -> Option<&FkChain> {
        self.fk_chain.as_ref()
    }

    pub fn set_fk_chain(&mut self, chain: Option<FkChain>) {
        self.fk_chain = chain;
    }

    /// Drop every overlay; the configured size is kept
    pub fn clear(&mut self) {
        self.tcp_link = None;
        self.tcp_marker = None;
        self.target_frame = None;
        self.fk_chain = None;
    }
}
