//! Turn-local copy of the reservation table.

use pursuit_core::{AgentId, AgentView, Availability, CellCoord, GridLayout, GridView};
use pursuit_system_pathfinding::Access;

#[derive(Clone, Copy, Debug, Default)]
struct LedgerCell {
    availability: Availability,
    owner: Option<AgentId>,
    blocked: bool,
    body: Option<AgentId>,
}

/// Mirrors the world's availability and agent bodies for the current turn.
///
/// Reservations decided earlier in the turn are written here before the
/// world applies them, so agents later in the order plan against them.
#[derive(Debug, Default)]
pub(crate) struct WorkingLedger {
    layout: GridLayout,
    cells: Vec<LedgerCell>,
}

impl WorkingLedger {
    /// Refreshes the ledger from the world's views.
    pub(crate) fn reset(&mut self, grid: GridView<'_>, agents: &AgentView) {
        self.layout = grid.layout();
        self.cells.clear();
        self.cells.extend(grid.iter().map(|(_, state)| LedgerCell {
            availability: state.availability,
            owner: state.owner,
            blocked: state.blocked,
            body: None,
        }));

        for agent in agents.iter() {
            if let Some(cell) = self.cell_mut(agent.cell) {
                cell.body = Some(agent.id);
            }
        }
    }

    /// Classifies a cell from the perspective of the planning agent.
    pub(crate) fn access(&self, cell: CellCoord, agent: AgentId) -> Access {
        let Some(entry) = self.cell(cell) else {
            return Access::Blocked;
        };
        if entry.blocked || entry.body.is_some_and(|body| body != agent) {
            return Access::Blocked;
        }
        if entry.owner == Some(agent) {
            return Access::Open;
        }
        match entry.availability {
            Availability::Empty => Access::Open,
            Availability::Claimed => Access::Claimed,
            Availability::Occupied => Access::Blocked,
        }
    }

    /// Reports whether another agent's body stands on the cell.
    pub(crate) fn foreign_body(&self, cell: CellCoord, agent: AgentId) -> bool {
        self.cell(cell)
            .is_some_and(|entry| entry.body.is_some_and(|body| body != agent))
    }

    /// Applies the reservation rules the world will apply for `ReservePath`.
    pub(crate) fn reserve(&mut self, agent: AgentId, origin: CellCoord, path: &[CellCoord]) {
        for entry in &mut self.cells {
            if entry.owner == Some(agent) {
                entry.availability = Availability::Empty;
                entry.owner = None;
            }
        }
        if let Some(entry) = self.cell_mut(origin) {
            entry.availability = Availability::Empty;
            entry.owner = None;
        }

        let Some((destination, intermediate)) = path.split_last() else {
            self.write(origin, agent, Availability::Occupied);
            return;
        };
        for cell in intermediate {
            let claimable = self.cell(*cell).is_some_and(|entry| {
                entry.availability == Availability::Empty || entry.owner == Some(agent)
            });
            if claimable {
                self.write(*cell, agent, Availability::Claimed);
            }
        }
        self.write(*destination, agent, Availability::Occupied);
    }

    /// Moves the agent's body between two cells.
    pub(crate) fn move_body(&mut self, agent: AgentId, from: CellCoord, to: CellCoord) {
        if let Some(entry) = self.cell_mut(from) {
            if entry.body == Some(agent) {
                entry.body = None;
            }
        }
        if let Some(entry) = self.cell_mut(to) {
            entry.body = Some(agent);
        }
    }

    fn write(&mut self, cell: CellCoord, agent: AgentId, availability: Availability) {
        if let Some(entry) = self.cell_mut(cell) {
            entry.availability = availability;
            entry.owner = Some(agent);
        }
    }

    fn cell(&self, cell: CellCoord) -> Option<&LedgerCell> {
        self.layout
            .index(cell)
            .and_then(|index| self.cells.get(index))
    }

    fn cell_mut(&mut self, cell: CellCoord) -> Option<&mut LedgerCell> {
        let index = self.layout.index(cell)?;
        self.cells.get_mut(index)
    }
}
