use std::path::PathBuf;

use eframe::egui::{self, RichText, Ui};

use crate::atlas::{FRAGMENT_NOT_FOUND, FragmentLoader, FragmentState, NodeContent};

use super::super::ViewModel;
use super::super::session::{DetailPanel, DetailRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
enum DetailBody {
    Empty,
    Text(String),
    Loading(PathBuf),
}

/// Right-hand detail panel. Fragment bodies load in the background; only
/// the latest request is ever shown.
pub(in crate::app) struct DetailsPane {
    request: Option<DetailRequest>,
    body: DetailBody,
    loader: FragmentLoader,
}

impl Default for DetailsPane {
    fn default() -> Self {
        Self {
            request: None,
            body: DetailBody::Empty,
            loader: FragmentLoader::default(),
        }
    }
}

impl DetailsPane {
    /// Picks up a finished fragment load. Returns `true` when the body changed.
    pub(in crate::app) fn poll(&mut self) -> bool {
        let Some((path, text)) = self.loader.poll() else {
            return false;
        };
        if !matches!(&self.body, DetailBody::Loading(waiting) if *waiting == path) {
            return false;
        }
        self.body = DetailBody::Text(text);
        true
    }

    pub(in crate::app) fn is_loading(&self) -> bool {
        matches!(self.body, DetailBody::Loading(_))
    }

    pub(in crate::app) fn fragments(&self) -> &FragmentLoader {
        &self.loader
    }

    pub(in crate::app) fn current(&self) -> Option<&DetailRequest> {
        self.request.as_ref()
    }

    fn body_text(&self) -> Option<&str> {
        match &self.body {
            DetailBody::Text(text) => Some(text),
            DetailBody::Empty | DetailBody::Loading(_) => None,
        }
    }
}

impl DetailPanel for DetailsPane {
    fn open(&mut self, request: DetailRequest) {
        self.body = match &request.content {
            NodeContent::Inline(text) => DetailBody::Text(text.clone()),
            NodeContent::Fragment(path) => match self.loader.request(path) {
                FragmentState::Ready(text) => DetailBody::Text(text),
                FragmentState::Loading => DetailBody::Loading(path.clone()),
            },
        };
        self.request = Some(request);
    }

    fn close(&mut self) {
        self.request = None;
        self.body = DetailBody::Empty;
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Details");
        ui.add_space(6.0);

        let Some(request) = self.details.current().cloned() else {
            ui.label("Select a node on the map or from the search results.");
            return;
        };

        ui.horizontal(|ui| {
            ui.label(RichText::new(request.title.as_str()).strong().size(16.0));
            if ui.small_button("Close").clicked() {
                self.details.close();
            }
        });

        let index = self.session.graph().index_of(&request.node_id);
        if let Some(document) = index.and_then(|index| self.session.graph().nodes.get(index)) {
            ui.small(format!("id: {}", document.id));
            ui.label(format!("Cluster: {}", document.cluster));
            if !document.tags.is_empty() {
                ui.label(format!("Tags: {}", document.tags.join(", ")));
            }
            if let Some(layer) = document.layer {
                ui.label(format!("Layer: {layer}"));
            }
        }

        ui.separator();
        egui::ScrollArea::vertical()
            .id_salt("detail_body_scroll")
            .max_height(320.0)
            .auto_shrink([false, true])
            .show(ui, |ui| match self.details.body_text() {
                Some(text) if text == FRAGMENT_NOT_FOUND => {
                    ui.weak(text);
                }
                Some(text) => {
                    ui.label(text);
                }
                None => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading fragment...");
                    });
                }
            });

        let Some(index) = index else {
            return;
        };

        ui.separator();
        ui.label(RichText::new("Connections").strong());
        let neighbors = self.session.graph().neighbors(index).to_vec();
        if neighbors.is_empty() {
            ui.label("No connections.");
            return;
        }

        let mut clicked = None;
        for neighbor in neighbors {
            let Some(document) = self.session.graph().nodes.get(neighbor) else {
                continue;
            };
            if ui
                .link(document.label.as_str())
                .on_hover_text(document.cluster.as_str())
                .clicked()
            {
                clicked = Some(neighbor);
            }
        }
        if let Some(neighbor) = clicked {
            self.focus_node(neighbor);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use tempfile::tempdir;

    use super::*;

    fn request(content: NodeContent) -> DetailRequest {
        DetailRequest {
            node_id: "1".to_owned(),
            title: "Hub".to_owned(),
            content,
        }
    }

    fn wait_for_body(pane: &mut DetailsPane) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while pane.is_loading() && Instant::now() < deadline {
            pane.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn inline_content_shows_immediately() {
        let mut pane = DetailsPane::default();
        pane.open(request(NodeContent::Inline("Central hub".to_owned())));
        assert_eq!(pane.body_text(), Some("Central hub"));
        pane.close();
        assert!(pane.current().is_none());
        assert_eq!(pane.body_text(), None);
    }

    #[test]
    fn fragment_content_loads_in_background() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("frag-1.html");
        fs::write(&path, "<h2>Hub</h2><p>Central &amp; shared</p>").expect("write fragment");

        let mut pane = DetailsPane::default();
        pane.open(request(NodeContent::Fragment(path)));
        wait_for_body(&mut pane);
        let text = pane.body_text().expect("fragment loaded");
        assert!(text.contains("Central & shared"));
    }

    #[test]
    fn missing_fragment_shows_placeholder() {
        let dir = tempdir().expect("tempdir");
        let mut pane = DetailsPane::default();
        pane.open(request(NodeContent::Fragment(dir.path().join("absent.html"))));
        wait_for_body(&mut pane);
        assert_eq!(pane.body_text(), Some(FRAGMENT_NOT_FOUND));
    }

    #[test]
    fn newer_request_supersedes_pending_fragment() {
        let dir = tempdir().expect("tempdir");
        let first = dir.path().join("first.html");
        let second = dir.path().join("second.html");
        fs::write(&first, "<p>first</p>").expect("write first");
        fs::write(&second, "<p>second</p>").expect("write second");

        let mut pane = DetailsPane::default();
        pane.open(request(NodeContent::Fragment(first)));
        pane.open(request(NodeContent::Fragment(second)));
        wait_for_body(&mut pane);
        assert_eq!(pane.body_text(), Some("second"));
    }
}
