use std::collections::{BTreeMap, HashSet};

use eframe::egui::{Pos2, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use super::MapNode;
use super::lod::LodView;
use crate::atlas::{DocumentNode, FragmentLoader, KnowledgeGraph, NodeContent};
use crate::util::contains_ignore_case;

/// Screen pixels a press may travel before it counts as a drag.
pub(in crate::app) const DRAG_THRESHOLD: f32 = 4.0;
const HIT_TOLERANCE_PX: f32 = 4.0;
const MIN_DOCUMENT_QUERY_CHARS: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum PointerPhase {
    #[default]
    Idle,
    Pressed {
        origin: Pos2,
    },
    Dragging {
        last: Pos2,
    },
}

/// Separates drag-pans from clicks. A press that travels past
/// [`DRAG_THRESHOLD`] pans and never produces a click.
#[derive(Default)]
pub(in crate::app) struct PointerTracker {
    phase: PointerPhase,
}

impl PointerTracker {
    pub(in crate::app) fn press(&mut self, position: Pos2) {
        self.phase = PointerPhase::Pressed { origin: position };
    }

    /// Returns the screen delta to pan by, if the pointer is dragging. The
    /// first drag delta is measured from the press point so the map stays
    /// under the pointer.
    pub(in crate::app) fn move_to(&mut self, position: Pos2) -> Option<Vec2> {
        match self.phase {
            PointerPhase::Idle => None,
            PointerPhase::Pressed { origin } => {
                if origin.distance(position) <= DRAG_THRESHOLD {
                    return None;
                }
                self.phase = PointerPhase::Dragging { last: position };
                Some(position - origin)
            }
            PointerPhase::Dragging { last } => {
                self.phase = PointerPhase::Dragging { last: position };
                Some(position - last)
            }
        }
    }

    /// Ends the gesture. Returns the click position when the press never
    /// turned into a drag.
    pub(in crate::app) fn release(&mut self, position: Pos2) -> Option<Pos2> {
        let phase = std::mem::take(&mut self.phase);
        match phase {
            PointerPhase::Pressed { origin, .. } if origin.distance(position) <= DRAG_THRESHOLD => {
                Some(position)
            }
            _ => None,
        }
    }

    pub(in crate::app) fn cancel(&mut self) {
        self.phase = PointerPhase::Idle;
    }

    pub(in crate::app) fn is_dragging(&self) -> bool {
        matches!(self.phase, PointerPhase::Dragging { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum TouchPhase {
    Start,
    Move,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum PinchEvent {
    Begin(f32),
    Update(f32),
    End,
}

/// Active touch points keyed by id. Two simultaneous touches form a pinch.
#[derive(Default)]
pub(in crate::app) struct TouchTracker {
    touches: BTreeMap<u64, Pos2>,
    pinching: bool,
}

impl TouchTracker {
    pub(in crate::app) fn update(&mut self, id: u64, phase: TouchPhase, position: Pos2) -> Option<PinchEvent> {
        match phase {
            TouchPhase::Start | TouchPhase::Move => {
                self.touches.insert(id, position);
            }
            TouchPhase::End => {
                self.touches.remove(&id);
            }
        }

        let distance = self.pair_distance();
        match (self.pinching, distance) {
            (false, Some(distance)) => {
                self.pinching = true;
                Some(PinchEvent::Begin(distance))
            }
            (true, Some(distance)) => Some(PinchEvent::Update(distance)),
            (true, None) => {
                self.pinching = false;
                Some(PinchEvent::End)
            }
            (false, None) => None,
        }
    }

    fn pair_distance(&self) -> Option<f32> {
        if self.touches.len() != 2 {
            return None;
        }
        let mut points = self.touches.values();
        let first = points.next()?;
        let second = points.next()?;
        Some(first.distance(*second))
    }

    pub(in crate::app) fn is_pinching(&self) -> bool {
        self.pinching
    }
}

/// Nearest marker whose radius, plus a few pixels of slack, covers `world`.
pub(in crate::app) fn hit_test(view: &LodView, nodes: &[MapNode], world: Vec2, zoom: f32) -> Option<usize> {
    let tolerance = HIT_TOLERANCE_PX / zoom.max(f32::EPSILON);
    view.markers()
        .iter()
        .enumerate()
        .filter_map(|(index, marker)| {
            let distance = (view.position(marker, nodes) - world).length();
            (distance <= view.radius(marker, nodes) + tolerance).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

/// First node whose label contains `query`, ignoring case. Blank queries
/// match nothing.
pub(in crate::app) fn first_label_match(graph: &KnowledgeGraph, query: &str) -> Option<usize> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    graph
        .nodes
        .iter()
        .position(|node| contains_ignore_case(&node.label, query))
}

fn content_matches(node: &DocumentNode, query: &str, fragments: &FragmentLoader) -> bool {
    let text = match &node.content {
        NodeContent::Inline(text) => Some(text.as_str()),
        NodeContent::Fragment(path) => fragments.cached(path),
    };
    text.is_some_and(|text| contains_ignore_case(text, query))
}

/// Document list search over titles, tags and body text. Fragment bodies only
/// count once they have been loaded. `None` means the query is too short to
/// search at all.
pub(in crate::app) fn search_documents(
    graph: &KnowledgeGraph,
    query: &str,
    fragments: &FragmentLoader,
) -> Option<Vec<usize>> {
    let query = query.trim();
    if query.chars().count() < MIN_DOCUMENT_QUERY_CHARS {
        return None;
    }
    let matches = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| {
            contains_ignore_case(&node.label, query)
                || node.tags.iter().any(|tag| contains_ignore_case(tag, query))
                || content_matches(node, query, fragments)
        })
        .map(|(index, _)| index)
        .collect();
    Some(matches)
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

/// Labels loosely matching `query`, used for map highlighting.
pub(in crate::app) fn fuzzy_label_matches(graph: &KnowledgeGraph, query: &str) -> HashSet<usize> {
    let query = query.trim();
    if query.is_empty() {
        return HashSet::new();
    }
    let matcher = SkimMatcherV2::default();
    graph
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(index, node)| fuzzy_match_score(&matcher, &node.label, query).map(|_| index))
        .collect()
}
