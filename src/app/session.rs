use eframe::egui::{Pos2, Rect, Vec2};

use super::MapNode;
use super::camera::{Camera, CameraSnapshot};
use super::exploration::{Exploration, ProximityChange};
use super::history::Breadcrumb;
use super::interaction::{
    PinchEvent, PointerTracker, TouchPhase, TouchTracker, first_label_match, hit_test,
};
use super::lod::{LodView, Marker};
use super::physics::LayoutEngine;
use super::placement::{radial_positions, seed_nodes};
use super::style::StyleTable;
use crate::atlas::{DocumentNode, KnowledgeGraph, NodeContent};
use crate::config::{AtlasConfig, LayoutConfig, LayoutMode, LodConfig};

/// What the detail panel is asked to show for a selected node.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct DetailRequest {
    pub node_id: String,
    pub title: String,
    pub content: NodeContent,
}

impl From<&DocumentNode> for DetailRequest {
    fn from(document: &DocumentNode) -> Self {
        Self {
            node_id: document.id.clone(),
            title: document.label.clone(),
            content: document.content.clone(),
        }
    }
}

/// Receiver for selection side effects. The panel owns its own chrome.
pub(in crate::app) trait DetailPanel {
    fn open(&mut self, request: DetailRequest);
    fn close(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SessionStats {
    pub nodes: usize,
    pub edges: usize,
    pub markers: usize,
    pub energy: f32,
    pub resting: bool,
}

/// Everything one map instance needs: graph, positions, camera, input state
/// and history. Owned by the app and driven once per frame.
pub(in crate::app) struct AtlasSession {
    graph: KnowledgeGraph,
    nodes: Vec<MapNode>,
    mode: LayoutMode,
    engine: LayoutEngine,
    camera: Camera,
    lod_config: LodConfig,
    lod: LodView,
    styles: StyleTable,
    exploration: Exploration,
    pointer: PointerTracker,
    touches: TouchTracker,
    hover_point: Option<Pos2>,
    hovered: Option<usize>,
    selected: Option<usize>,
    selected_by_proximity: bool,
    breadcrumb: Breadcrumb,
}

impl AtlasSession {
    pub(in crate::app) fn new(graph: KnowledgeGraph, config: &AtlasConfig) -> Self {
        let nodes = seed_nodes(&graph);
        let styles = StyleTable::for_graph(&graph);
        let mut session = Self {
            lod: LodView::identity(nodes.len()),
            graph,
            nodes,
            mode: config.mode,
            engine: LayoutEngine::new(config.layout.clone()),
            camera: Camera::new(&config.camera),
            lod_config: config.lod.clone(),
            styles,
            exploration: Exploration::new(&config.exploration),
            pointer: PointerTracker::default(),
            touches: TouchTracker::default(),
            hover_point: None,
            hovered: None,
            selected: None,
            selected_by_proximity: false,
            breadcrumb: Breadcrumb::default(),
        };
        session.apply_mode_layout();
        session.refresh_lod();
        session
    }

    /// Swaps in a freshly ingested graph in one step. Selection, hover and
    /// breadcrumb reset; the camera stays where it is.
    pub(in crate::app) fn replace_graph(&mut self, graph: KnowledgeGraph) {
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edges.len(),
            "swapping in new graph"
        );
        self.nodes = seed_nodes(&graph);
        self.styles = StyleTable::for_graph(&graph);
        self.graph = graph;
        self.hovered = None;
        self.selected = None;
        self.selected_by_proximity = false;
        self.breadcrumb.clear();
        self.pointer.cancel();
        self.exploration.reset(self.camera_center());
        self.engine.wake();
        self.apply_mode_layout();
        self.refresh_lod();
    }

    pub(in crate::app) fn set_mode(&mut self, mode: LayoutMode) {
        if self.mode == mode {
            return;
        }
        tracing::info!(mode = mode.label(), "switching layout mode");
        self.mode = mode;
        self.apply_mode_layout();
        self.refresh_lod();
    }

    fn apply_mode_layout(&mut self) {
        match self.mode {
            LayoutMode::ForceLayout => self.engine.wake(),
            LayoutMode::RadialCluster => {
                let positions = radial_positions(&self.graph);
                for (node, position) in self.nodes.iter_mut().zip(positions) {
                    node.world_pos = position;
                    node.velocity = Vec2::ZERO;
                }
            }
            LayoutMode::ProximityExploration => {
                self.engine.wake();
                self.exploration.reset(self.camera_center());
            }
        }
    }

    fn camera_center(&self) -> Vec2 {
        -self.camera.target().pan
    }

    pub(in crate::app) fn apply_layout_config(&mut self, params: LayoutConfig) {
        self.engine.set_params(params);
    }

    pub(in crate::app) fn apply_lod_config(&mut self, config: LodConfig) {
        self.lod_config = config;
        self.refresh_lod();
    }

    /// One frame: simulate, advance the camera, then rebuild the marker view
    /// and hover. Returns whether anything is still animating.
    pub(in crate::app) fn tick(&mut self, viewport: Rect, panel: &mut dyn DetailPanel) -> bool {
        let simulating = match self.mode {
            LayoutMode::RadialCluster => false,
            LayoutMode::ForceLayout | LayoutMode::ProximityExploration => {
                self.engine.step(&mut self.nodes, &self.graph.edges)
            }
        };

        if self.mode == LayoutMode::ProximityExploration {
            if self.exploration.is_following() {
                self.camera.center_on(self.exploration.avatar());
            }
            self.update_proximity(panel);
        }

        let camera_moving = self.camera.advance();
        self.refresh_lod();
        self.refresh_hover(viewport);
        simulating || camera_moving
    }

    fn refresh_lod(&mut self) {
        self.lod = LodView::build(&self.nodes, self.camera.zoom(), &self.lod_config);
        if self.hovered.is_some_and(|marker| marker >= self.lod.markers().len()) {
            self.hovered = None;
        }
    }

    fn refresh_hover(&mut self, viewport: Rect) {
        self.hovered = self.hover_point.and_then(|point| {
            let world = self.camera.screen_to_world(viewport, point);
            hit_test(&self.lod, &self.nodes, world, self.camera.zoom())
        });
    }

    fn update_proximity(&mut self, panel: &mut dyn DetailPanel) {
        match self.exploration.update_proximity(&self.nodes) {
            ProximityChange::Unchanged => {}
            ProximityChange::Entered(index) => {
                self.select(index, panel);
                self.selected_by_proximity = true;
            }
            // A node picked by click or search stays open.
            ProximityChange::Left if self.selected_by_proximity => {
                self.selected = None;
                self.selected_by_proximity = false;
                panel.close();
            }
            ProximityChange::Left => {}
        }
    }

    pub(in crate::app) fn pointer_pressed(&mut self, position: Pos2) {
        if self.touches.is_pinching() {
            return;
        }
        self.pointer.press(position);
    }

    pub(in crate::app) fn pointer_moved(&mut self, viewport: Rect, position: Pos2) {
        if self.touches.is_pinching() {
            self.pointer.cancel();
        } else if let Some(delta) = self.pointer.move_to(position) {
            self.camera.pan_by_screen_delta(delta);
            self.exploration.stop_following();
        }
        self.hover_point = Some(position);
        self.refresh_hover(viewport);
    }

    pub(in crate::app) fn pointer_left(&mut self) {
        self.hover_point = None;
        self.hovered = None;
    }

    /// Ends a press. Only a press that never became a drag selects.
    pub(in crate::app) fn pointer_released(
        &mut self,
        viewport: Rect,
        position: Pos2,
        panel: &mut dyn DetailPanel,
    ) -> bool {
        match self.pointer.release(position) {
            Some(click) => self.click_at(viewport, click, panel),
            None => false,
        }
    }

    pub(in crate::app) fn is_dragging(&self) -> bool {
        self.pointer.is_dragging()
    }

    /// Selects the node under `screen`, or zooms into an aggregate. Empty
    /// space is a no-op.
    pub(in crate::app) fn click_at(
        &mut self,
        viewport: Rect,
        screen: Pos2,
        panel: &mut dyn DetailPanel,
    ) -> bool {
        let world = self.camera.screen_to_world(viewport, screen);
        let Some(marker) = hit_test(&self.lod, &self.nodes, world, self.camera.zoom()) else {
            return false;
        };

        match self.lod.marker(marker) {
            Some(Marker::Node(index)) => {
                let index = *index;
                self.select(index, panel);
                true
            }
            Some(Marker::Aggregate(aggregate)) => {
                let centroid = aggregate.centroid;
                tracing::debug!(members = aggregate.members.len(), "zooming into aggregate");
                self.camera.focus_on(centroid);
                self.exploration.stop_following();
                true
            }
            None => false,
        }
    }

    pub(in crate::app) fn select(&mut self, index: usize, panel: &mut dyn DetailPanel) {
        let Some(document) = self.graph.nodes.get(index) else {
            return;
        };
        self.selected = Some(index);
        self.selected_by_proximity = false;
        self.breadcrumb.push(&document.id, &document.label);
        panel.open(DetailRequest::from(document));
    }

    /// Selects and flies the camera to a node, as list clicks do.
    pub(in crate::app) fn focus_node(&mut self, index: usize, panel: &mut dyn DetailPanel) {
        let Some(position) = self.nodes.get(index).map(|node| node.world_pos) else {
            return;
        };
        self.select(index, panel);
        self.camera.focus_on(position);
        self.exploration.stop_following();
    }

    /// Centers the first node whose label contains `query`. No match, or a
    /// blank query, leaves the camera alone.
    pub(in crate::app) fn search_focus(&mut self, query: &str) -> Option<usize> {
        let index = first_label_match(&self.graph, query)?;
        let position = self.nodes.get(index)?.world_pos;
        self.camera.focus_on(position);
        self.exploration.stop_following();
        Some(index)
    }

    pub(in crate::app) fn scroll(&mut self, viewport: Rect, cursor: Option<Pos2>, delta: f32) {
        self.camera
            .zoom_by_wheel(delta, cursor.map(|cursor| (viewport, cursor)));
    }

    pub(in crate::app) fn touch(&mut self, id: u64, phase: TouchPhase, position: Pos2) {
        match self.touches.update(id, phase, position) {
            Some(PinchEvent::Begin(distance)) => {
                self.pointer.cancel();
                self.camera.begin_pinch(distance);
            }
            Some(PinchEvent::Update(distance)) => self.camera.update_pinch(distance),
            Some(PinchEvent::End) => self.camera.end_pinch(),
            None => {}
        }
    }

    /// Arrow-key movement in exploration mode.
    pub(in crate::app) fn move_avatar(&mut self, direction: Vec2, panel: &mut dyn DetailPanel) {
        if self.mode != LayoutMode::ProximityExploration {
            return;
        }
        self.exploration.step(direction);
        self.update_proximity(panel);
    }

    pub(in crate::app) fn restore_camera(&mut self, snapshot: CameraSnapshot) -> bool {
        let restored = self.camera.restore(snapshot);
        if restored {
            self.exploration.reset(self.camera_center());
            self.refresh_lod();
        }
        restored
    }

    pub(in crate::app) fn camera_snapshot(&self) -> CameraSnapshot {
        self.camera.snapshot()
    }

    pub(in crate::app) fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub(in crate::app) fn nodes(&self) -> &[MapNode] {
        &self.nodes
    }

    pub(in crate::app) fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub(in crate::app) fn camera(&self) -> &Camera {
        &self.camera
    }

    pub(in crate::app) fn lod(&self) -> &LodView {
        &self.lod
    }

    pub(in crate::app) fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub(in crate::app) fn exploration(&self) -> &Exploration {
        &self.exploration
    }

    pub(in crate::app) fn hovered_marker(&self) -> Option<usize> {
        self.hovered
    }

    pub(in crate::app) fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub(in crate::app) fn breadcrumb(&self) -> &Breadcrumb {
        &self.breadcrumb
    }

    pub(in crate::app) fn stats(&self) -> SessionStats {
        SessionStats {
            nodes: self.graph.node_count(),
            edges: self.graph.edges.len(),
            markers: self.lod.markers().len(),
            energy: self.engine.energy(),
            resting: self.engine.is_resting(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use eframe::egui::{pos2, vec2};
    use tempfile::tempdir;

    use super::*;
    use crate::atlas::{SourceSet, ingest};

    #[derive(Default)]
    struct RecordingPanel {
        opened: Vec<DetailRequest>,
        closed: usize,
    }

    impl DetailPanel for RecordingPanel {
        fn open(&mut self, request: DetailRequest) {
            self.opened.push(request);
        }

        fn close(&mut self) {
            self.closed += 1;
        }
    }

    fn viewport() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    fn graph() -> KnowledgeGraph {
        KnowledgeGraph::build(
            vec![
                DocumentNode::new("1", "Hub", Some("core".to_owned())),
                DocumentNode::new("2", "Research", Some("knowledge".to_owned())),
                DocumentNode::new("3", "Courses", Some("learning".to_owned())),
            ],
            Some(vec![("2".to_owned(), "1".to_owned())]),
        )
    }

    fn session() -> AtlasSession {
        AtlasSession::new(graph(), &AtlasConfig::default())
    }

    fn screen_of(session: &AtlasSession, index: usize) -> Pos2 {
        session
            .camera()
            .world_to_screen(viewport(), session.nodes()[index].world_pos)
    }

    #[test]
    fn search_focus_targets_the_single_match() {
        let mut session = session();
        let index = session.search_focus("resea").expect("match");
        assert_eq!(index, 1);

        let target = session.camera().target();
        assert_eq!(target.pan, -session.nodes()[1].world_pos);
        assert_eq!(target.zoom, AtlasConfig::default().camera.focus_zoom);
    }

    #[test]
    fn unmatched_or_blank_search_leaves_camera_alone() {
        let mut session = session();
        let before = session.camera().target();
        assert_eq!(session.search_focus("oficina"), None);
        assert_eq!(session.search_focus(""), None);
        assert_eq!(session.camera().target(), before);
    }

    #[test]
    fn click_on_empty_space_is_inert() {
        let mut session = session();
        let mut panel = RecordingPanel::default();
        let far = session
            .camera()
            .world_to_screen(viewport(), vec2(5000.0, 5000.0));

        session.pointer_pressed(far);
        assert!(!session.pointer_released(viewport(), far, &mut panel));
        assert!(session.breadcrumb().is_empty());
        assert!(panel.opened.is_empty());
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn click_on_node_selects_and_opens_panel() {
        let mut session = session();
        let mut panel = RecordingPanel::default();
        let target = screen_of(&session, 2);

        session.pointer_pressed(target);
        session.pointer_moved(viewport(), target + vec2(1.0, 1.0));
        assert_eq!(session.hovered_marker(), Some(2));
        assert!(session.pointer_released(viewport(), target + vec2(1.0, 1.0), &mut panel));

        assert_eq!(session.selected(), Some(2));
        assert_eq!(session.breadcrumb().trail(5), "Courses");
        assert_eq!(panel.opened.len(), 1);
        assert_eq!(panel.opened[0].title, "Courses");
        assert_eq!(panel.opened[0].node_id, "3");
    }

    #[test]
    fn drag_pans_without_selecting() {
        let mut session = session();
        let mut panel = RecordingPanel::default();
        let start = screen_of(&session, 0);
        let pan_before = session.camera().target().pan;

        session.pointer_pressed(start);
        session.pointer_moved(viewport(), start + vec2(30.0, 0.0));
        session.pointer_moved(viewport(), start + vec2(60.0, 0.0));
        assert!(session.is_dragging());
        assert!(!session.pointer_released(viewport(), start + vec2(60.0, 0.0), &mut panel));

        assert!(panel.opened.is_empty());
        assert!(session.breadcrumb().is_empty());
        let moved = session.camera().target().pan - pan_before;
        assert!((moved - vec2(60.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn drag_follows_pointer_from_press_point() {
        let mut session = session();
        let press = pos2(700.0, 500.0);
        let pan_before = session.camera().target().pan;

        session.pointer_pressed(press);
        session.pointer_moved(viewport(), press + vec2(3.0, 0.0));
        assert!(!session.is_dragging());
        session.pointer_moved(viewport(), press + vec2(10.0, 0.0));
        assert!(session.is_dragging());

        let moved = session.camera().target().pan - pan_before;
        assert!((moved - vec2(10.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn replacing_graph_resets_selection_and_trail() {
        let mut session = session();
        let mut panel = RecordingPanel::default();
        session.select(0, &mut panel);
        assert_eq!(session.breadcrumb().len(), 1);

        let replacement = KnowledgeGraph::build(
            vec![DocumentNode::new("solo", "Solo", None)],
            None,
        );
        session.replace_graph(replacement);
        assert_eq!(session.nodes().len(), 1);
        assert_eq!(session.graph().node_count(), 1);
        assert_eq!(session.selected(), None);
        assert!(session.breadcrumb().is_empty());
        assert_eq!(session.lod().markers().len(), 1);
    }

    #[test]
    fn radial_mode_is_static() {
        let mut config = AtlasConfig::default();
        config.mode = LayoutMode::RadialCluster;
        let mut session = AtlasSession::new(graph(), &config);
        let mut panel = RecordingPanel::default();
        let before = session.nodes().iter().map(|node| node.world_pos).collect::<Vec<_>>();
        for _ in 0..10 {
            session.tick(viewport(), &mut panel);
        }
        let after = session.nodes().iter().map(|node| node.world_pos).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn exploration_opens_and_closes_panel_by_proximity() {
        let mut config = AtlasConfig::default();
        config.mode = LayoutMode::RadialCluster;
        let mut session = AtlasSession::new(graph(), &config);
        let mut panel = RecordingPanel::default();
        let hub = session.nodes()[0].world_pos;

        session.set_mode(LayoutMode::ProximityExploration);
        session.restore_camera(CameraSnapshot {
            x: -hub.x,
            y: -hub.y,
            zoom: 1.0,
        });
        session.move_avatar(vec2(1.0, 0.0), &mut panel);
        assert_eq!(panel.opened.len(), 1);
        assert_eq!(panel.opened[0].title, "Hub");

        session.move_avatar(vec2(1.0, 0.0), &mut panel);
        assert_eq!(panel.opened.len(), 1);

        for _ in 0..30 {
            session.move_avatar(vec2(0.0, -1.0), &mut panel);
        }
        assert_eq!(panel.closed, 1);
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn leaving_proximity_keeps_a_clicked_selection() {
        let mut config = AtlasConfig::default();
        config.mode = LayoutMode::RadialCluster;
        let mut session = AtlasSession::new(graph(), &config);
        let mut panel = RecordingPanel::default();
        let hub = session.nodes()[0].world_pos;

        session.set_mode(LayoutMode::ProximityExploration);
        session.restore_camera(CameraSnapshot {
            x: -hub.x,
            y: -hub.y,
            zoom: 1.0,
        });
        session.move_avatar(vec2(1.0, 0.0), &mut panel);
        assert_eq!(session.selected(), Some(0));

        let courses = screen_of(&session, 2);
        assert!(session.click_at(viewport(), courses, &mut panel));
        assert_eq!(session.selected(), Some(2));

        for _ in 0..30 {
            session.move_avatar(vec2(0.0, -1.0), &mut panel);
        }
        assert_eq!(panel.closed, 0);
        assert_eq!(session.selected(), Some(2));
        assert_eq!(panel.opened.last().map(|request| request.title.as_str()), Some("Courses"));
    }

    #[test]
    fn aggregate_click_zooms_past_lod_threshold() {
        let single_cluster = KnowledgeGraph::build(
            vec![
                DocumentNode::new("a", "Alpha", None),
                DocumentNode::new("b", "Beta", None),
                DocumentNode::new("c", "Gamma", None),
            ],
            None,
        );
        let mut session = AtlasSession::new(single_cluster, &AtlasConfig::default());
        let mut panel = RecordingPanel::default();
        session.restore_camera(CameraSnapshot {
            x: 0.0,
            y: 0.0,
            zoom: 0.3,
        });
        assert!(session.lod().is_aggregated());

        let Some(Marker::Aggregate(aggregate)) = session.lod().marker(0).cloned() else {
            panic!("expected one aggregate marker");
        };
        assert_eq!(aggregate.members.len(), 3);

        let screen = session.camera().world_to_screen(viewport(), aggregate.centroid);
        assert!(session.click_at(viewport(), screen, &mut panel));
        assert!(panel.opened.is_empty());
        assert!(session.breadcrumb().is_empty());
        assert!(session.camera().target().zoom > AtlasConfig::default().lod.zoom_threshold);
    }

    #[test]
    fn zooming_back_in_restores_individual_nodes() {
        let single_cluster = KnowledgeGraph::build(
            vec![
                DocumentNode::new("a", "Alpha", None),
                DocumentNode::new("b", "Beta", None),
                DocumentNode::new("c", "Gamma", None),
            ],
            None,
        );
        let mut session = AtlasSession::new(single_cluster, &AtlasConfig::default());
        let mut panel = RecordingPanel::default();
        let positions = session.nodes().iter().map(|node| node.world_pos).collect::<Vec<_>>();

        session.restore_camera(CameraSnapshot {
            x: 0.0,
            y: 0.0,
            zoom: 0.3,
        });
        assert!(session.lod().is_aggregated());
        assert!(session.lod().markers().len() < session.nodes().len());

        session.restore_camera(CameraSnapshot {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        });
        assert!(!session.lod().is_aggregated());
        assert_eq!(
            session.lod().markers(),
            &[Marker::Node(0), Marker::Node(1), Marker::Node(2)]
        );
        let after = session.nodes().iter().map(|node| node.world_pos).collect::<Vec<_>>();
        assert_eq!(positions, after);

        let beta = screen_of(&session, 1);
        assert!(session.click_at(viewport(), beta, &mut panel));
        assert_eq!(session.selected(), Some(1));
        assert_eq!(panel.opened.len(), 1);
        assert_eq!(panel.opened[0].title, "Beta");
    }

    #[test]
    fn two_document_manifest_settles_apart() {
        let dir = tempdir().expect("tempdir");
        let manifest = dir.path().join("manifest.json");
        fs::write(
            &manifest,
            r#"{"documents":[{"id":"1","title":"Hub","cluster":"core"},{"id":"2","title":"Research","cluster":"knowledge","connections":["1"]}]}"#,
        )
        .expect("write manifest");

        let ingestion = ingest(&SourceSet {
            manifest: Some(manifest),
            table: None,
        });
        assert!(ingestion.warning.is_none());
        let graph = &ingestion.graph;
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges, vec![(0, 1)]);
        assert!(graph.are_connected(0, 1) && graph.are_connected(1, 0));

        let mut session = AtlasSession::new(ingestion.graph, &AtlasConfig::default());
        let mut panel = RecordingPanel::default();
        for _ in 0..6000 {
            session.tick(viewport(), &mut panel);
            if session.stats().resting {
                break;
            }
        }
        assert!(session.stats().resting);
        let distance = (session.nodes()[0].world_pos - session.nodes()[1].world_pos).length();
        assert!(distance > 0.0);
    }
}
