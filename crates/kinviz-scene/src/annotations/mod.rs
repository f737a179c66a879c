//! Annotation layers: overlays keyed by caller ids, independent of links

mod contacts;
mod frames;
mod paths;
mod workspace;

pub use contacts::*;
pub use frames::*;
pub use paths::*;
pub use workspace::*;

/// All annotation layers of a scene
#[derive(Debug, Clone)]
pub struct Annotations {
    pub paths: PathLayer,
    pub contacts: ContactLayer,
    pub frames: FrameLayer,
    pub workspace: WorkspaceLayer,
}

impl Annotations {
    pub fn new(frame_size: f32) -> Self {
        Self {
            paths: PathLayer::new(),
            contacts: ContactLayer::new(),
            frames: FrameLayer::new(frame_size),
            workspace: WorkspaceLayer::new(),
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.contacts.clear();
        self.frames.clear();
        self.workspace.hide();
    }
}
