//! Scene context: the single value the hosting shell owns.
//!
//! Every core operation goes through [`SceneContext`]. It holds the
//! environment, the registry, the transform state and the annotation
//! layers, and records a [`SceneEvent`] for each change. All mutation
//! happens on the owning thread; expensive work (model preparation,
//! workspace sampling) produces plain values that are applied here in a
//! single call.

use std::sync::Arc;

use glam::DVec3;
use kinviz_core::{Contact, Environment, JointValues, KinematicTree, LinkTransforms, RigidTransform};
use parking_lot::Mutex;

use crate::annotations::{
    Annotations, ContactStyle, FkChain, FrameMarker, LineStyle, PointMarker, WorkspaceCloud,
};
use crate::config::SceneConfig;
use crate::draw::{AxisInstance, DrawList, MarkerInstance, MeshDraw, MeshInstance};
use crate::error::SceneError;
use crate::events::{AnnotationLayer, EventQueue, SceneEvent};
use crate::geometry::{BoundingBox, GeometryBuilder};
use crate::registry::{SceneNode, SceneRegistry};
use crate::sampler::{
    Manipulability, SampleRequest, SamplingJob, WorkspaceResult, WorkspaceSampler,
    WorkspaceSamples,
};
use crate::snapshot::{NodeSnapshot, SceneSnapshot};
use crate::sync::TransformSync;

/// Shared scene context type
pub type SharedScene = Arc<Mutex<SceneContext>>;

/// A fully built model, ready to be swapped into a context.
///
/// Building is independent of any context, so it can run on a worker
/// thread while the current scene stays on screen.
pub struct PreparedScene {
    env: Arc<dyn Environment>,
    tree: KinematicTree,
    nodes: Vec<SceneNode>,
    sync: TransformSync,
}

impl PreparedScene {
    pub fn build(env: Arc<dyn Environment>, config: &SceneConfig) -> Result<Self, SceneError> {
        let tree = KinematicTree::build(env.links(), env.joints())?;

        let builder = GeometryBuilder::new(env.resource_locator())
            .with_resolution(config.tessellation)
            .with_fallback_size(config.fallback_marker_size);
        let mut nodes = SceneRegistry::build_nodes(env.links(), &builder, config.default_link_color);

        let mut sync = TransformSync::new();
        sync.reset(env.as_ref());
        let transforms = env.state(sync.joint_values())?;
        for node in &mut nodes {
            if let Some(transform) = transforms.get(&node.link) {
                node.transform = *transform;
            }
        }

        Ok(Self {
            env,
            tree,
            nodes,
            sync,
        })
    }

    pub fn model_name(&self) -> &str {
        self.env.name()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Visuals that fell back to the marker
    pub fn warning_count(&self) -> usize {
        self.nodes.iter().map(|n| n.warnings.len()).sum()
    }
}

struct LoadedModel {
    env: Arc<dyn Environment>,
    tree: KinematicTree,
}

/// The scene owned by the hosting shell
pub struct SceneContext {
    config: SceneConfig,
    model: Option<LoadedModel>,
    registry: SceneRegistry,
    sync: TransformSync,
    annotations: Annotations,
    events: EventQueue,
    dirty: bool,
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl SceneContext {
    pub fn new(config: SceneConfig) -> Self {
        let annotations = Annotations::new(config.frame_size);
        Self {
            config,
            model: None,
            registry: SceneRegistry::new(),
            sync: TransformSync::new(),
            annotations,
            events: EventQueue::new(),
            dirty: false,
        }
    }

    /// Wrap into the shared handle used across threads
    pub fn into_shared(self) -> SharedScene {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn environment(&self) -> Option<&Arc<dyn Environment>> {
        self.model.as_ref().map(|m| &m.env)
    }

    fn env(&self) -> Result<Arc<dyn Environment>, SceneError> {
        self.model
            .as_ref()
            .map(|m| m.env.clone())
            .ok_or(SceneError::NotLoaded)
    }

    fn ensure_loaded(&self) -> Result<(), SceneError> {
        if self.model.is_some() {
            Ok(())
        } else {
            Err(SceneError::NotLoaded)
        }
    }

    fn notify(&mut self, event: SceneEvent) {
        self.events.push(event);
        self.dirty = true;
    }

    fn annotation_changed(&mut self, layer: AnnotationLayer, id: impl Into<String>) {
        self.notify(SceneEvent::AnnotationChanged {
            layer,
            id: id.into(),
        });
    }

    // ========== Notifications ==========

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain()
    }

    /// True if anything changed since the last `mark_clean`
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.registry.is_dirty()
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
        self.registry.mark_clean();
    }

    // ========== Loading ==========

    /// Build `env` into a [`PreparedScene`] with this context's config
    pub fn prepare_load(&self, env: Arc<dyn Environment>) -> Result<PreparedScene, SceneError> {
        PreparedScene::build(env, &self.config)
    }

    /// Swap in a prepared model. Everything from the previous model,
    /// annotations included, is released first.
    pub fn commit_load(&mut self, prepared: PreparedScene) {
        let PreparedScene {
            env,
            tree,
            nodes,
            sync,
        } = prepared;

        self.annotations.clear();
        self.registry.replace(nodes);
        self.sync = sync;

        let name = env.name().to_string();
        let links = self.registry.len();
        self.model = Some(LoadedModel { env, tree });

        tracing::info!(model = %name, links, "Model loaded");
        self.notify(SceneEvent::ModelLoaded { name, links });
    }

    /// Prepare and commit on the calling thread
    pub fn load(&mut self, env: Arc<dyn Environment>) -> Result<(), SceneError> {
        let prepared = self.prepare_load(env)?;
        self.commit_load(prepared);
        Ok(())
    }

    /// Remove the model and every annotation
    pub fn unload(&mut self) {
        self.model = None;
        self.registry.clear();
        self.sync.clear();
        self.annotations.clear();
        self.notify(SceneEvent::Cleared);
    }

    // ========== Joint state ==========

    /// Apply joint values and update every node in one batch.
    ///
    /// Unknown joint names are ignored; joints not mentioned keep their
    /// last value.
    pub fn apply(&mut self, joint_values: &JointValues) -> Result<(), SceneError> {
        let env = self.env()?;
        self.sync
            .apply(env.as_ref(), &mut self.registry, joint_values)?;
        self.notify(SceneEvent::TransformsChanged);
        Ok(())
    }

    /// Last applied joint values, in the flat mapping used for persistence
    pub fn joint_values(&self) -> &JointValues {
        self.sync.joint_values()
    }

    /// Current node transforms
    pub fn link_transforms(&self) -> LinkTransforms {
        self.registry.transforms()
    }

    /// Pose of `link` for the current values overlaid with `joint_values`;
    /// the displayed pose does not change
    pub fn tcp_pose(
        &self,
        joint_values: &JointValues,
        link: &str,
    ) -> Result<RigidTransform, SceneError> {
        let env = self.env()?;
        self.sync.tcp_pose(env.as_ref(), joint_values, link)
    }

    // ========== Node style ==========

    pub fn set_visibility(&mut self, link: &str, visible: bool) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        if self.registry.set_visibility(link, visible) {
            self.notify(SceneEvent::NodeStyleChanged { link: link.into() });
        }
        Ok(())
    }

    pub fn set_highlight(&mut self, link: &str, on: bool, color: [f32; 4]) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        if self.registry.set_highlight(link, on, color) {
            self.notify(SceneEvent::NodeStyleChanged { link: link.into() });
        }
        Ok(())
    }

    /// Highlight with the configured highlight color
    pub fn highlight_link(&mut self, link: &str, on: bool) -> Result<(), SceneError> {
        self.set_highlight(link, on, self.config.highlight_color)
    }

    // ========== Frames ==========

    /// Toggle the triad at a link's current transform
    pub fn show_frame(&mut self, link: &str, visible: bool) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        if self.registry.show_frame(link, visible) {
            self.annotation_changed(AnnotationLayer::Frame, link);
        }
        Ok(())
    }

    /// Axis length of every link triad
    pub fn set_frame_size(&mut self, size: f32) {
        self.annotations.frames.set_frame_size(size);
        self.annotation_changed(AnnotationLayer::Frame, "*");
    }

    /// Select the TCP link; `None` clears it
    pub fn set_tcp_link(&mut self, link: Option<&str>) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        if let Some(name) = link
            && !self.registry.contains(name)
        {
            tracing::warn!(link = %name, "Unknown TCP link, ignoring");
            return Ok(());
        }
        self.annotations.frames.set_tcp_link(link.map(str::to_string));
        Ok(())
    }

    pub fn tcp_link(&self) -> Option<&str> {
        self.annotations.frames.tcp_link()
    }

    /// Toggle the frame of the TCP link, if one is set
    pub fn show_tcp_frame(&mut self, visible: bool) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        match self.annotations.frames.tcp_link().map(str::to_string) {
            Some(link) => self.show_frame(&link, visible),
            None => {
                tracing::warn!("No TCP link set");
                Ok(())
            }
        }
    }

    /// Place the single TCP marker at `pose`, replacing the previous one
    pub fn show_tcp_marker(
        &mut self,
        pose: &RigidTransform,
        radius: f32,
        color: [f32; 4],
    ) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.frames.set_tcp_marker(Some(PointMarker {
            position: pose.translation,
            radius,
            color,
        }));
        self.annotation_changed(AnnotationLayer::TcpMarker, "tcp_marker");
        Ok(())
    }

    /// [`show_tcp_marker`](Self::show_tcp_marker) with the configured radius and color
    pub fn place_tcp_marker(&mut self, pose: &RigidTransform) -> Result<(), SceneError> {
        self.show_tcp_marker(pose, self.config.tcp_marker_radius, self.config.tcp_marker_color)
    }

    pub fn clear_tcp_marker(&mut self) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.frames.set_tcp_marker(None);
        self.annotation_changed(AnnotationLayer::TcpMarker, "tcp_marker");
        Ok(())
    }

    /// Show the IK target triad at `pose`, replacing the previous one
    pub fn show_target_frame(&mut self, pose: &RigidTransform) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.frames.set_target_frame(Some(FrameMarker {
            pose: *pose,
            size: self.config.target_frame_size,
        }));
        self.annotation_changed(AnnotationLayer::TargetFrame, "ik_target");
        Ok(())
    }

    pub fn clear_target_frame(&mut self) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.frames.set_target_frame(None);
        self.annotation_changed(AnnotationLayer::TargetFrame, "ik_target");
        Ok(())
    }

    /// Draw a polyline through the link origins from `base` to `tip`.
    ///
    /// The line follows later transform batches.
    pub fn show_fk_chain(
        &mut self,
        base: &str,
        tip: &str,
        width: f32,
        color: [f32; 4],
    ) -> Result<(), SceneError> {
        let model = self.model.as_ref().ok_or(SceneError::NotLoaded)?;
        let Some(links) = model.tree.path_between(base, tip) else {
            tracing::warn!(base = %base, tip = %tip, "No tree path between links, ignoring");
            return Ok(());
        };
        self.annotations.frames.set_fk_chain(Some(FkChain {
            base: base.to_string(),
            tip: tip.to_string(),
            links,
            style: LineStyle { color, width },
        }));
        self.annotation_changed(AnnotationLayer::FkChain, "fk_chain");
        Ok(())
    }

    /// FK chain in the configured width and color
    pub fn trace_fk_chain(&mut self, base: &str, tip: &str) -> Result<(), SceneError> {
        self.show_fk_chain(base, tip, self.config.fk_chain_width, self.config.fk_chain_color)
    }

    pub fn clear_fk_chain(&mut self) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.frames.set_fk_chain(None);
        self.annotation_changed(AnnotationLayer::FkChain, "fk_chain");
        Ok(())
    }

    // ========== Tool paths ==========

    /// Add or replace the path `id`, dropping its previous segments
    pub fn add_path(
        &mut self,
        id: &str,
        points: Vec<DVec3>,
        color: [f32; 4],
        width: f32,
        show_waypoints: bool,
    ) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        let waypoint_radius = show_waypoints.then_some(self.config.waypoint_radius);
        self.annotations
            .paths
            .add_path(id, points, LineStyle { color, width }, waypoint_radius);
        self.annotation_changed(AnnotationLayer::Path, id);
        Ok(())
    }

    /// Add or replace a segment under `path_id`, creating the parent if needed
    pub fn add_segment(
        &mut self,
        path_id: &str,
        segment_id: &str,
        points: Vec<DVec3>,
        color: [f32; 4],
        width: f32,
    ) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations
            .paths
            .add_segment(path_id, segment_id, points, LineStyle { color, width });
        self.annotation_changed(AnnotationLayer::Path, format!("{path_id}/{segment_id}"));
        Ok(())
    }

    /// Path in the configured color and width
    pub fn add_tool_path(
        &mut self,
        id: &str,
        points: Vec<DVec3>,
        show_waypoints: bool,
    ) -> Result<(), SceneError> {
        let (color, width) = (self.config.path_color, self.config.path_width);
        self.add_path(id, points, color, width, show_waypoints)
    }

    /// Segment in the configured segment color and path width
    pub fn add_tool_segment(
        &mut self,
        path_id: &str,
        segment_id: &str,
        points: Vec<DVec3>,
    ) -> Result<(), SceneError> {
        let (color, width) = (self.config.segment_color, self.config.path_width);
        self.add_segment(path_id, segment_id, points, color, width)
    }

    /// Remove a path and all of its segments
    pub fn clear_path(&mut self, id: &str) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        if self.annotations.paths.clear_path(id) {
            self.annotation_changed(AnnotationLayer::Path, id);
        } else {
            tracing::warn!(path = %id, "Unknown path, ignoring");
        }
        Ok(())
    }

    pub fn clear_segment(&mut self, path_id: &str, segment_id: &str) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        if self.annotations.paths.clear_segment(path_id, segment_id) {
            self.annotation_changed(AnnotationLayer::Path, format!("{path_id}/{segment_id}"));
        } else {
            tracing::warn!(path = %path_id, segment = %segment_id, "Unknown segment, ignoring");
        }
        Ok(())
    }

    pub fn clear_paths(&mut self) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.paths.clear();
        self.annotation_changed(AnnotationLayer::Path, "*");
        Ok(())
    }

    // ========== Contacts ==========

    /// Replace all contact markers and contact highlights with `contacts`
    pub fn visualize_contacts(&mut self, contacts: &[Contact]) -> Result<(), SceneError> {
        self.ensure_loaded()?;

        for link in self.registry.clear_contact_highlights() {
            self.events.push(SceneEvent::NodeStyleChanged { link });
        }

        let style = ContactStyle {
            point_radius: self.config.contact_point_radius,
            point_color: self.config.contact_point_color,
            normal_scale: self.config.contact_normal_scale,
            normal_color: self.config.contact_normal_color,
        };
        let links = self.annotations.contacts.replace(contacts, &style);

        let color = self.config.contact_highlight_color;
        for link in links {
            if self.registry.set_contact_highlight(&link, Some(color)) {
                self.events.push(SceneEvent::NodeStyleChanged { link });
            }
        }

        self.notify(SceneEvent::ContactsChanged {
            count: contacts.len(),
        });
        Ok(())
    }

    /// Remove contact markers and restore link colors
    pub fn clear_contacts(&mut self) -> Result<(), SceneError> {
        self.visualize_contacts(&[])
    }

    /// Run the environment's contact test at the displayed pose and
    /// visualize the result
    pub fn check_contacts(&mut self) -> Result<Vec<Contact>, SceneError> {
        let env = self.env()?;
        let manager = env
            .contact_manager()
            .ok_or(SceneError::ContactManagerAbsent)?;
        let contacts = manager.contact_test(&self.registry.transforms());
        self.visualize_contacts(&contacts)?;
        Ok(contacts)
    }

    // ========== Workspace ==========

    /// Request sampling every independent joint, starting from the
    /// current values, with the configured surrogate range and seed
    pub fn workspace_request(
        &self,
        tcp_link: &str,
        n_samples: usize,
    ) -> Result<SampleRequest, SceneError> {
        let env = self.env()?;
        Ok(
            SampleRequest::for_environment(
                env.as_ref(),
                tcp_link,
                n_samples,
                self.config.continuous_joint_range,
            )
            .with_base_values(self.sync.joint_values().clone())
            .with_seed(self.config.sampling_seed),
        )
    }

    pub fn sample_workspace(&self, request: &SampleRequest) -> Result<WorkspaceSamples, SceneError> {
        let env = self.env()?;
        WorkspaceSampler::new(env.as_ref()).sample(request)
    }

    pub fn compute_manipulability(
        &self,
        samples: &WorkspaceSamples,
        tcp_link: &str,
    ) -> Result<Manipulability, SceneError> {
        let env = self.env()?;
        WorkspaceSampler::new(env.as_ref()).compute_manipulability(samples, tcp_link)
    }

    /// Sample on a worker thread; apply the result with
    /// [`show_workspace_result`](Self::show_workspace_result)
    pub fn spawn_workspace_sampling(&self, request: SampleRequest) -> Result<SamplingJob, SceneError> {
        let env = self.env()?;
        Ok(WorkspaceSampler::spawn(env, request))
    }

    /// Replace the workspace cloud. `points` and `scalars` must have the
    /// same length.
    pub fn show_workspace(
        &mut self,
        points: Vec<DVec3>,
        scalars: Vec<f64>,
        point_size: f32,
    ) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        let cloud = WorkspaceCloud::new(points, scalars, point_size, self.config.workspace_opacity)?;
        let count = cloud.len();
        self.annotations.workspace.show(cloud);
        self.notify(SceneEvent::WorkspaceChanged { points: count });
        Ok(())
    }

    pub fn show_workspace_result(&mut self, result: WorkspaceResult) -> Result<(), SceneError> {
        let WorkspaceResult {
            samples,
            manipulability,
        } = result;
        self.show_workspace(
            samples.points,
            manipulability.scalars,
            self.config.workspace_point_size,
        )
    }

    pub fn hide_workspace(&mut self) -> Result<(), SceneError> {
        self.ensure_loaded()?;
        self.annotations.workspace.hide();
        self.notify(SceneEvent::WorkspaceChanged { points: 0 });
        Ok(())
    }

    // ========== Export ==========

    /// World bounds of visible link geometry, annotations excluded
    pub fn robot_bounds(&self) -> Option<BoundingBox> {
        self.registry.robot_bounds()
    }

    /// Flatten the scene for a renderer
    pub fn draw_list(&self) -> DrawList<'_> {
        let mut list = DrawList::default();
        let frames = &self.annotations.frames;

        for node in self.registry.nodes() {
            let model = node.model_matrix();
            if node.visible {
                for visual in &node.visuals {
                    list.meshes.push(MeshDraw {
                        node: node.id,
                        surface: &visual.surface,
                        instance: MeshInstance {
                            model: (model * visual.origin).to_cols_array_2d(),
                            color: node.visual_color(visual),
                        },
                    });
                }
            }
            if node.frame_visible {
                list.axes.push(AxisInstance::new(model, frames.frame_size()));
            }
        }

        if let Some(target) = frames.target_frame() {
            list.axes
                .push(AxisInstance::new(target.pose.to_mat4_f32(), target.size));
        }

        for (_, path) in self.annotations.paths.paths() {
            list.push_polyline(&path.points, path.style.width, path.style.color);
            if let Some(radius) = path.waypoint_radius {
                for point in path.waypoints() {
                    list.markers
                        .push(MarkerInstance::new(*point, radius, path.style.color));
                }
            }
            for segment in path.segments.values() {
                list.push_polyline(&segment.points, segment.style.width, segment.style.color);
            }
        }

        if let Some(chain) = frames.fk_chain() {
            list.push_polyline(&chain.points(&self.registry), chain.style.width, chain.style.color);
        }

        if let Some(marker) = frames.tcp_marker() {
            list.markers
                .push(MarkerInstance::new(marker.position, marker.radius, marker.color));
        }

        for marker in self.annotations.contacts.markers() {
            list.markers
                .push(MarkerInstance::new(marker.position, marker.radius, marker.color));
        }
        for arrow in self.annotations.contacts.arrows() {
            list.push_arrow(arrow.origin, arrow.direction, arrow.length, arrow.color);
        }

        if let Some(cloud) = self.annotations.workspace.cloud() {
            for (point, color) in cloud.points.iter().zip(&cloud.colors) {
                list.push_point(*point, cloud.point_size, *color);
            }
        }

        list
    }

    /// Node transforms, visibility and joint values for export
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            model: self.model.as_ref().map(|m| m.env.name().to_string()),
            generation: self.registry.generation(),
            joint_values: self.sync.joint_values().clone(),
            nodes: self
                .registry
                .nodes()
                .map(|node| NodeSnapshot {
                    link: node.link.clone(),
                    transform: node.transform.to_cols_array_2d(),
                    visible: node.visible,
                    highlighted: node.is_highlighted(),
                    color: node.effective_color(),
                    frame_visible: node.frame_visible,
                    fallback_visuals: node.visuals.iter().filter(|v| v.surface.fallback).count(),
                })
                .collect(),
            paths: self
                .annotations
                .paths
                .paths()
                .map(|(id, _)| id.to_string())
                .collect(),
            contacts: self.annotations.contacts.contacts().len(),
            workspace_points: self
                .annotations
                .workspace
                .cloud()
                .map_or(0, |c| c.len()),
        }
    }
}
