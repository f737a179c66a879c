//! Typed notifications for the hosting shell

use serde::Serialize;

/// Annotation layers reported through `AnnotationChanged`.
///
/// Contacts and the workspace cloud have their own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnnotationLayer {
    Path,
    Frame,
    TcpMarker,
    TargetFrame,
    FkChain,
}

/// A change the shell may want to react to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SceneEvent {
    /// A model replaced the previous node set
    ModelLoaded { name: String, links: usize },
    /// Everything was removed
    Cleared,
    /// A transform batch was applied
    TransformsChanged,
    /// Visibility or color of a node changed
    NodeStyleChanged { link: String },
    AnnotationChanged { layer: AnnotationLayer, id: String },
    WorkspaceChanged { points: usize },
    ContactsChanged { count: usize },
}

/// Pending notifications, drained by the shell
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<SceneEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SceneEvent) {
        tracing::trace!(?event, "Scene event");
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
