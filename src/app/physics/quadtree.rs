//! Barnes-Hut cell tree over node positions. Each cell summarises the nodes
//! below it as a population and a centroid, so a far-away group of documents
//! can repel as a single body.

use eframe::egui::{Pos2, Rect, Vec2};

const MAX_NODES_PER_CELL: usize = 12;
const MAX_CELL_DEPTH: usize = 10;
/// Padding around the enclosing square so border nodes fall strictly inside.
const CELL_PADDING: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quadrant {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl Quadrant {
    const ALL: [Self; 4] = [
        Self::UpperLeft,
        Self::UpperRight,
        Self::LowerLeft,
        Self::LowerRight,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Square region of world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Cell {
    rect: Rect,
}

impl Cell {
    fn square(center: Pos2, side: f32) -> Self {
        Self {
            rect: Rect::from_center_size(center, Vec2::splat(side)),
        }
    }

    /// Smallest padded square around `points`. `None` when there are no
    /// points or any of them is not finite.
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let first = points.first()?;
        let mut rect = Rect::from_min_max(first.to_pos2(), first.to_pos2());
        for point in points {
            if !point.x.is_finite() || !point.y.is_finite() {
                return None;
            }
            rect.extend_with(point.to_pos2());
        }
        let side = rect.width().max(rect.height()).max(1.0) + CELL_PADDING * 2.0;
        Some(Self::square(rect.center(), side))
    }

    pub(super) fn side(self) -> f32 {
        self.rect.width()
    }

    pub(super) fn holds(self, point: Vec2) -> bool {
        self.rect.contains(point.to_pos2())
    }

    /// Squared gap between `point` and the cell; zero when inside.
    pub(super) fn gap_sq(self, point: Vec2) -> f32 {
        self.rect.distance_sq_to_pos(point.to_pos2())
    }

    fn quadrant_of(self, point: Vec2) -> Quadrant {
        let center = self.rect.center();
        match (point.x >= center.x, point.y >= center.y) {
            (false, false) => Quadrant::UpperLeft,
            (true, false) => Quadrant::UpperRight,
            (false, true) => Quadrant::LowerLeft,
            (true, true) => Quadrant::LowerRight,
        }
    }

    fn sub_cell(self, quadrant: Quadrant) -> Self {
        let corner = match quadrant {
            Quadrant::UpperLeft => self.rect.left_top(),
            Quadrant::UpperRight => self.rect.right_top(),
            Quadrant::LowerLeft => self.rect.left_bottom(),
            Quadrant::LowerRight => self.rect.right_bottom(),
        };
        let center = self.rect.center();
        Self::square(center + (corner - center) * 0.5, self.side() * 0.5)
    }
}

pub(super) struct CellNode {
    pub(super) cell: Cell,
    pub(super) centroid: Vec2,
    pub(super) population: usize,
    /// Node indices, only filled on leaves.
    pub(super) members: Vec<usize>,
    pub(super) quadrants: [Option<Box<CellNode>>; 4],
}

impl CellNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let cell = Cell::enclosing(positions)?;
        Some(Self::grow(cell, (0..positions.len()).collect(), positions, 0))
    }

    fn grow(cell: Cell, members: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let population = members.len();
        let centroid = if population == 0 {
            cell.rect.center().to_vec2()
        } else {
            let total = members
                .iter()
                .fold(Vec2::ZERO, |total, &index| total + positions[index]);
            total / population as f32
        };

        let mut node = Self {
            cell,
            centroid,
            population,
            members,
            quadrants: [None, None, None, None],
        };
        if depth >= MAX_CELL_DEPTH || population <= MAX_NODES_PER_CELL {
            return node;
        }

        let mut split: [Vec<usize>; 4] = Default::default();
        for &index in &node.members {
            split[cell.quadrant_of(positions[index]).slot()].push(index);
        }
        // Stacked nodes that all land in one quadrant stay a leaf.
        if split.iter().filter(|members| !members.is_empty()).count() <= 1 {
            return node;
        }

        for quadrant in Quadrant::ALL {
            let members = std::mem::take(&mut split[quadrant.slot()]);
            if !members.is_empty() {
                let child = Self::grow(cell.sub_cell(quadrant), members, positions, depth + 1);
                node.quadrants[quadrant.slot()] = Some(Box::new(child));
            }
        }
        node.members.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.quadrants.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &CellNode> {
        self.quadrants.iter().flatten().map(Box::as_ref)
    }

    /// Whether the whole cell may stand in for its members as seen from
    /// `point`: the point lies outside and the cell looks small from there.
    pub(super) fn summarizes_for(&self, point: Vec2, distance: f32, theta: f32) -> bool {
        self.population > 1 && !self.cell.holds(point) && self.cell.side() / distance < theta
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    fn gather(node: &CellNode, out: &mut Vec<usize>) {
        out.extend(&node.members);
        for child in node.children() {
            gather(child, out);
        }
    }

    #[test]
    fn every_node_lands_in_exactly_one_leaf() {
        let positions = (0..100)
            .map(|index| vec2((index % 10) as f32 * 30.0, (index / 10) as f32 * 30.0))
            .collect::<Vec<_>>();
        let tree = CellNode::build(&positions).expect("tree builds");

        let mut seen = Vec::new();
        gather(&tree, &mut seen);
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
        assert!(!tree.is_leaf());
        assert_eq!(tree.population, 100);
        assert!((tree.centroid - vec2(135.0, 135.0)).length() < 1e-3);
    }

    #[test]
    fn stacked_nodes_stay_in_one_leaf() {
        let positions = vec![vec2(4.0, 4.0); 40];
        let tree = CellNode::build(&positions).expect("tree builds");
        assert!(tree.is_leaf());
        assert_eq!(tree.members.len(), 40);
    }

    #[test]
    fn gap_is_zero_inside_the_cell() {
        let cell = Cell::square(pos2(0.0, 0.0), 20.0);
        assert_eq!(cell.gap_sq(vec2(5.0, -5.0)), 0.0);
        assert!((cell.gap_sq(vec2(13.0, 14.0)) - (9.0 + 16.0)).abs() < 1e-4);
        assert_eq!(cell.sub_cell(Quadrant::LowerRight), Cell::square(pos2(5.0, 5.0), 10.0));
    }

    #[test]
    fn non_finite_or_empty_positions_yield_no_tree() {
        assert!(CellNode::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(CellNode::build(&[]).is_none());
    }
}
