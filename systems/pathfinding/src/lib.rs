#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic A* planner over the Pursuit cell grid.
//!
//! The planner never mutates the grid. Callers describe how each cell may be
//! entered through an [`Access`] classifier, which lets the turn coordinator
//! layer in-flight reservations and agent bodies on top of the world's
//! availability table.

mod scratch;

use std::{cmp::Ordering, collections::BinaryHeap};

use pursuit_core::{CellCoord, GridView};
use thiserror::Error;
use tracing::{debug, error};

use crate::scratch::SearchScratch;

/// How the planner may treat a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    /// Cell can be entered at its base cost.
    Open,
    /// Cell is reserved by another agent and costs an extra penalty.
    Claimed,
    /// Cell can never be entered.
    Blocked,
}

/// Tunables shared by every search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Penalty added when stepping into a claimed cell.
    pub claimed_cost: f32,
    /// Maximum number of steps a reconstructed path may contain.
    pub reconstruction_cap: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            claimed_cost: 3.0,
            reconstruction_cap: 100,
        }
    }
}

/// Endpoints of a single search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathRequest {
    /// Cell the agent stands on.
    pub start: CellCoord,
    /// Cell the agent wants to reach.
    pub target: CellCoord,
    /// Cell that is always traversable and never penalized, usually the
    /// tracked entity's current cell.
    pub exempt: Option<CellCoord>,
}

/// Sequence of cells leading from the start (exclusive) to the target.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    cells: Vec<CellCoord>,
    cost: f32,
}

impl Path {
    /// Creates a path from cells in travel order and their accumulated cost.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>, cost: f32) -> Self {
        Self { cells, cost }
    }

    /// Path of an agent that already stands on its target.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cells in travel order, excluding the start.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Accumulated cost including claimed-cell penalties.
    #[must_use]
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// Number of steps along the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First cell the agent steps into.
    #[must_use]
    pub fn first(&self) -> Option<CellCoord> {
        self.cells.first().copied()
    }

    /// Consumes the path, yielding its cells.
    #[must_use]
    pub fn into_cells(self) -> Vec<CellCoord> {
        self.cells
    }
}

/// Faults raised while planning. A missing route is not a fault.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Walking the predecessor links took more steps than allowed.
    #[error("path reconstruction exceeded {cap} steps")]
    ReconstructionCapExceeded {
        /// Configured step limit.
        cap: usize,
    },
    /// A predecessor link was missing or pointed outside the grid.
    #[error("predecessor chain broken at node {index}")]
    BrokenChain {
        /// Node whose link could not be followed.
        index: usize,
    },
}

/// Reusable A* planner.
#[derive(Debug, Default)]
pub struct Planner {
    config: PlannerConfig,
    scratch: SearchScratch,
    open: BinaryHeap<OpenNode>,
}

impl Planner {
    /// Creates a planner with the provided configuration.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            scratch: SearchScratch::default(),
            open: BinaryHeap::new(),
        }
    }

    /// Searches for the cheapest route from `request.start` to `request.target`.
    ///
    /// Returns `Ok(None)` when the target lies outside the grid, cannot be
    /// entered, or is unreachable. Open-set ties resolve by lower `f`, then
    /// lower heuristic, then lower row, then lower column, so repeated calls
    /// over the same state return identical paths.
    pub fn find_path<F>(
        &mut self,
        grid: GridView<'_>,
        request: PathRequest,
        access: F,
    ) -> Result<Option<Path>, PlanError>
    where
        F: Fn(CellCoord) -> Access,
    {
        let layout = grid.layout();
        let PathRequest {
            start,
            target,
            exempt,
        } = request;

        let (Some(start_index), Some(target_index)) = (layout.index(start), layout.index(target))
        else {
            debug!(?start, ?target, "endpoint outside grid");
            return Ok(None);
        };

        let classify = |cell: CellCoord| {
            if exempt == Some(cell) {
                Access::Open
            } else {
                access(cell)
            }
        };

        if start == target {
            return Ok(Some(Path::empty()));
        }
        if classify(target) == Access::Blocked {
            debug!(?target, "target cannot be entered");
            return Ok(None);
        }

        self.scratch.begin(layout.cell_count());
        self.open.clear();

        self.scratch.relax(start_index, 0.0, None);
        let start_h = start.euclidean_distance(target);
        self.open.push(OpenNode {
            f: start_h,
            h: start_h,
            cell: start,
            index: start_index,
        });

        while let Some(current) = self.open.pop() {
            if self.scratch.is_closed(current.index) {
                continue;
            }
            self.scratch.close(current.index);

            if current.index == target_index {
                return self.reconstruct(grid, start_index, target_index).map(Some);
            }

            let current_g = self.scratch.cost(current.index);
            for &neighbor in grid.neighbors(current.cell) {
                let Some(neighbor_index) = layout.index(neighbor) else {
                    continue;
                };
                if self.scratch.is_closed(neighbor_index) {
                    continue;
                }

                let penalty = match classify(neighbor) {
                    Access::Blocked => continue,
                    Access::Claimed => self.config.claimed_cost,
                    Access::Open => 0.0,
                };
                let tentative = current_g + current.cell.euclidean_distance(neighbor) + penalty;
                if tentative >= self.scratch.cost(neighbor_index) {
                    continue;
                }

                self.scratch
                    .relax(neighbor_index, tentative, Some(current.index));
                let h = neighbor.euclidean_distance(target);
                self.open.push(OpenNode {
                    f: tentative + h,
                    h,
                    cell: neighbor,
                    index: neighbor_index,
                });
            }
        }

        debug!(?start, ?target, "open set exhausted");
        Ok(None)
    }

    fn reconstruct(
        &self,
        grid: GridView<'_>,
        start_index: usize,
        target_index: usize,
    ) -> Result<Path, PlanError> {
        let layout = grid.layout();
        let cap = self.config.reconstruction_cap;
        let mut cells = Vec::new();
        let mut cursor = target_index;

        while cursor != start_index {
            if cells.len() >= cap {
                error!(cap, "path reconstruction exceeded step cap");
                return Err(PlanError::ReconstructionCapExceeded { cap });
            }
            let (Some(cell), Some(parent)) =
                (layout.coord_of(cursor), self.scratch.came_from(cursor))
            else {
                error!(index = cursor, "path reconstruction hit a broken predecessor link");
                return Err(PlanError::BrokenChain { index: cursor });
            };
            cells.push(cell);
            cursor = parent;
        }

        cells.reverse();
        Ok(Path {
            cells,
            cost: self.scratch.cost(target_index),
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f32,
    h: f32,
    cell: CellCoord,
    index: usize,
}

impl OpenNode {
    fn rank(&self, other: &Self) -> Ordering {
        self.f
            .total_cmp(&other.f)
            .then_with(|| self.h.total_cmp(&other.h))
            .then_with(|| self.cell.row().cmp(&other.cell.row()))
            .then_with(|| self.cell.column().cmp(&other.cell.column()))
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest element.
        other.rank(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use pursuit_core::{CellState, GridLayout, Neighbors};

    fn node(f: f32, h: f32, column: u32, row: u32) -> OpenNode {
        OpenNode {
            f,
            h,
            cell: CellCoord::new(column, row),
            index: 0,
        }
    }

    #[test]
    fn heap_pops_lowest_f_then_h_then_row_then_column() {
        let mut heap = BinaryHeap::new();
        heap.push(node(4.0, 1.0, 0, 0));
        heap.push(node(3.0, 2.0, 1, 1));
        heap.push(node(3.0, 1.0, 2, 1));
        heap.push(node(3.0, 1.0, 0, 1));
        heap.push(node(3.0, 1.0, 5, 0));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|node| (node.cell.column(), node.cell.row()))
            .collect();
        assert_eq!(order, vec![(5, 0), (0, 1), (2, 1), (1, 1), (0, 0)]);
    }

    fn line_grid(columns: u32) -> (GridLayout, Vec<CellState>, Vec<Neighbors>) {
        let layout = GridLayout::new(columns, 1, 1.0, Vec2::ZERO);
        let count = layout.cell_count();
        (
            layout,
            vec![CellState::default(); count],
            vec![Neighbors::default(); count],
        )
    }

    #[test]
    fn missing_predecessor_is_reported() {
        let (layout, cells, neighbors) = line_grid(4);
        let grid = GridView::new(layout, &cells, &neighbors);
        let mut planner = Planner::default();
        planner.scratch.begin(layout.cell_count());
        planner.scratch.relax(0, 0.0, None);
        planner.scratch.relax(3, 3.0, None);

        assert_eq!(
            planner.reconstruct(grid, 0, 3),
            Err(PlanError::BrokenChain { index: 3 })
        );
    }

    #[test]
    fn predecessor_outside_grid_is_reported() {
        let (layout, cells, neighbors) = line_grid(4);
        let grid = GridView::new(layout, &cells, &neighbors);
        let mut planner = Planner::default();
        planner.scratch.begin(layout.cell_count());
        planner.scratch.relax(0, 0.0, None);
        planner.scratch.relax(3, 3.0, Some(2));
        planner.scratch.relax(2, 2.0, Some(40));

        assert_eq!(
            planner.reconstruct(grid, 0, 3),
            Err(PlanError::BrokenChain { index: 40 })
        );
    }

    #[test]
    fn intact_chain_reconstructs_in_travel_order() {
        let (layout, cells, neighbors) = line_grid(4);
        let grid = GridView::new(layout, &cells, &neighbors);
        let mut planner = Planner::default();
        planner.scratch.begin(layout.cell_count());
        planner.scratch.relax(0, 0.0, None);
        planner.scratch.relax(1, 1.0, Some(0));
        planner.scratch.relax(2, 2.0, Some(1));

        let path = planner.reconstruct(grid, 0, 2).expect("intact chain");
        assert_eq!(path.cells(), &[CellCoord::new(1, 0), CellCoord::new(2, 0)]);
        assert_eq!(path.cost(), 2.0);
    }

    #[test]
    fn empty_path_reports_zero_length() {
        let path = Path::empty();
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
        assert_eq!(path.first(), None);
        assert_eq!(path.cost(), 0.0);
    }
}
