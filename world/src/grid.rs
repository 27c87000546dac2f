//! Cell storage, precomputed adjacency and body occupancy used by the world.

use pursuit_core::{
    AgentId, Availability, CellCoord, CellState, Direction, GridLayout, GridView, Neighbors,
};

/// Dense cell grid with adjacency computed once at build time.
///
/// Cells are stored in row-major order. The neighbor table mirrors the cell
/// table and is never rebuilt for the lifetime of the grid, so planners never
/// perform adjacency discovery. Barriers are a per-cell flag rather than holes
/// in the table, which keeps doors cheap to toggle.
#[derive(Clone, Debug, Default)]
pub(crate) struct GridMap {
    layout: GridLayout,
    cells: Vec<CellState>,
    neighbors: Vec<Neighbors>,
}

impl GridMap {
    /// Builds a grid of empty, passable cells.
    pub(crate) fn new(layout: GridLayout) -> Self {
        let cell_count = layout.cell_count();
        let mut neighbors = Vec::with_capacity(cell_count);
        for index in 0..cell_count {
            let mut entry = Neighbors::default();
            if let Some(cell) = layout.coord_of(index) {
                for neighbor in cardinal_neighbors(cell, &layout) {
                    entry.push(neighbor);
                }
            }
            neighbors.push(entry);
        }

        Self {
            layout,
            cells: vec![CellState::default(); cell_count],
            neighbors,
        }
    }

    /// Layout of the grid.
    pub(crate) fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Read-only view consumed by systems.
    pub(crate) fn view(&self) -> GridView<'_> {
        GridView::new(self.layout, &self.cells, &self.neighbors)
    }

    /// State of a single cell.
    pub(crate) fn state(&self, cell: CellCoord) -> Option<CellState> {
        self.layout
            .index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Raises or lowers a barrier, returning whether the flag changed.
    pub(crate) fn set_blocked(&mut self, cell: CellCoord, blocked: bool) -> bool {
        let Some(state) = self.state_mut(cell) else {
            return false;
        };
        let changed = state.blocked != blocked;
        state.blocked = blocked;
        changed
    }

    /// Returns every cell owned by the agent to `Empty`.
    pub(crate) fn release(&mut self, agent: AgentId) {
        for state in &mut self.cells {
            if state.owner == Some(agent) {
                state.availability = Availability::Empty;
                state.owner = None;
            }
        }
    }

    /// Marks a cell `Empty` regardless of its owner.
    pub(crate) fn vacate(&mut self, cell: CellCoord) {
        if let Some(state) = self.state_mut(cell) {
            state.availability = Availability::Empty;
            state.owner = None;
        }
    }

    /// Claims a cell for the agent unless another reservation already touches it.
    pub(crate) fn claim(&mut self, cell: CellCoord, agent: AgentId) {
        if let Some(state) = self.state_mut(cell) {
            if state.availability == Availability::Empty || state.owner == Some(agent) {
                state.availability = Availability::Claimed;
                state.owner = Some(agent);
            }
        }
    }

    /// Marks a cell `Occupied` by the agent, superseding any claim.
    pub(crate) fn occupy(&mut self, cell: CellCoord, agent: AgentId) {
        if let Some(state) = self.state_mut(cell) {
            state.availability = Availability::Occupied;
            state.owner = Some(agent);
        }
    }

    fn state_mut(&mut self, cell: CellCoord) -> Option<&mut CellState> {
        let index = self.layout.index(cell)?;
        self.cells.get_mut(index)
    }
}

/// Tracks which agent physically stands on each cell.
#[derive(Clone, Debug, Default)]
pub(crate) struct OccupancyGrid {
    layout: GridLayout,
    cells: Vec<Option<AgentId>>,
}

impl OccupancyGrid {
    pub(crate) fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            cells: vec![None; layout.cell_count()],
        }
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<AgentId> {
        self.layout
            .index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    pub(crate) fn occupy(&mut self, agent: AgentId, cell: CellCoord) {
        if let Some(index) = self.layout.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(agent);
            }
        }
    }

    pub(crate) fn vacate(&mut self, cell: CellCoord) {
        if let Some(index) = self.layout.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = None;
            }
        }
    }
}

fn cardinal_neighbors<'a>(
    cell: CellCoord,
    layout: &'a GridLayout,
) -> impl Iterator<Item = CellCoord> + 'a {
    Direction::ALL
        .into_iter()
        .filter_map(move |direction| cell.step(direction))
        .filter(move |neighbor| layout.contains(*neighbor))
}
