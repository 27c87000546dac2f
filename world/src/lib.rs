#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Pursuit.
//!
//! The world owns the cell grid, every cell's availability, agent bodies and
//! the tracked entity's position history. It is mutated exclusively through
//! [`apply`], which validates each [`Command`] and reports the outcome as
//! [`Event`] values. Availability changes are visible to the next query
//! immediately; there is no transactional layer.

mod grid;

use std::collections::VecDeque;

use pursuit_core::{
    AgentCondition, AgentId, Availability, BlockError, CellCoord, Command, Direction, Event,
    GridLayout, ReservationError, SpawnError, StepError, TrackedSnapshot,
};
use tracing::{debug, warn};

use crate::grid::{GridMap, OccupancyGrid};

/// Represents the authoritative Pursuit world state.
#[derive(Debug)]
pub struct World {
    grid: GridMap,
    occupancy: OccupancyGrid,
    agents: Vec<Agent>,
    next_agent_id: u32,
    tracked: Option<TrackedSnapshot>,
    turn: u64,
}

impl World {
    /// Creates an empty world without any cells.
    #[must_use]
    pub fn new() -> Self {
        Self::with_layout(GridLayout::default())
    }

    fn with_layout(layout: GridLayout) -> Self {
        Self {
            grid: GridMap::new(layout),
            occupancy: OccupancyGrid::new(layout),
            agents: Vec::new(),
            next_agent_id: 0,
            tracked: None,
            turn: 0,
        }
    }

    fn agent(&self, agent: AgentId) -> Option<&Agent> {
        self.agents
            .binary_search_by_key(&agent, |candidate| candidate.id)
            .ok()
            .and_then(|index| self.agents.get(index))
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        let index = self
            .agents
            .binary_search_by_key(&agent, |candidate| candidate.id)
            .ok()?;
        self.agents.get_mut(index)
    }

    fn tracked_cell(&self) -> Option<CellCoord> {
        self.tracked
            .and_then(|tracked| self.grid.layout().cell_at(tracked.current))
    }

    fn set_blocked(&mut self, cell: CellCoord, blocked: bool, out_events: &mut Vec<Event>) {
        let Some(state) = self.grid.state(cell) else {
            out_events.push(Event::CellBlockRejected {
                cell,
                reason: BlockError::OutOfBounds,
            });
            return;
        };

        if blocked {
            let stood_on =
                self.occupancy.occupant(cell).is_some() || self.tracked_cell() == Some(cell);
            if stood_on || state.availability != Availability::Empty {
                debug!(?cell, availability = ?state.availability, "barrier cannot close");
                out_events.push(Event::CellBlockRejected {
                    cell,
                    reason: BlockError::NotFree,
                });
                return;
            }
        }

        if self.grid.set_blocked(cell, blocked) {
            out_events.push(Event::CellBlockChanged { cell, blocked });
        }
    }

    fn spawn_agent(&mut self, cell: CellCoord, facing: Direction, out_events: &mut Vec<Event>) {
        let reason = match self.grid.state(cell) {
            None => Some(SpawnError::OutOfBounds),
            Some(state) if state.blocked => Some(SpawnError::Blocked),
            Some(state)
                if state.availability == Availability::Occupied
                    || self.occupancy.occupant(cell).is_some() =>
            {
                Some(SpawnError::Occupied)
            }
            Some(_) => None,
        };
        if let Some(reason) = reason {
            out_events.push(Event::AgentSpawnRejected { cell, reason });
            return;
        }

        let id = AgentId::new(self.next_agent_id);
        self.next_agent_id = self.next_agent_id.saturating_add(1);
        self.grid.occupy(cell, id);
        self.occupancy.occupy(id, cell);
        self.agents.push(Agent::new(id, cell, facing));
        out_events.push(Event::AgentSpawned {
            agent: id,
            cell,
            facing,
        });
    }

    fn set_harmonized(&mut self, agent: AgentId, harmonized: bool, out_events: &mut Vec<Event>) {
        let turn = self.turn;
        let Some(entry) = self.agent_mut(agent) else {
            warn!(agent = agent.get(), "harmonize request for unknown agent");
            return;
        };
        entry.harmonized = harmonized;
        out_events.push(Event::AgentConditionChanged {
            agent,
            condition: entry.condition(turn),
        });
    }

    fn stun_agent(&mut self, agent: AgentId, turns: u32, out_events: &mut Vec<Event>) {
        let turn = self.turn;
        let Some(entry) = self.agent_mut(agent) else {
            warn!(agent = agent.get(), "stun request for unknown agent");
            return;
        };
        let until = turn.saturating_add(1).saturating_add(u64::from(turns));
        entry.stunned_until = Some(entry.stunned_until.map_or(until, |current| current.max(until)));
        out_events.push(Event::AgentConditionChanged {
            agent,
            condition: entry.condition(turn),
        });
    }

    fn move_tracked(&mut self, position: glam::Vec2, out_events: &mut Vec<Event>) {
        let previous = self.tracked.map_or(position, |tracked| tracked.current);
        self.tracked = Some(TrackedSnapshot {
            current: position,
            previous,
        });
        out_events.push(Event::TrackedEntityMoved {
            current: position,
            previous,
        });
    }

    fn begin_turn(&mut self, out_events: &mut Vec<Event>) {
        self.turn = self.turn.saturating_add(1);
        let turn = self.turn;
        out_events.push(Event::TurnStarted { turn });

        for agent in &mut self.agents {
            if agent.stunned_until.is_some_and(|until| until <= turn) {
                agent.stunned_until = None;
                out_events.push(Event::AgentConditionChanged {
                    agent: agent.id,
                    condition: agent.condition(turn),
                });
            }
        }
    }

    fn reserve_path(&mut self, agent: AgentId, path: Vec<CellCoord>, out_events: &mut Vec<Event>) {
        let Some(origin) = self.agent(agent).map(|entry| entry.cell) else {
            out_events.push(Event::ReservationRejected {
                agent,
                reason: ReservationError::MissingAgent,
            });
            return;
        };

        if let Err(reason) = self.validate_path(origin, &path) {
            warn!(agent = agent.get(), ?reason, "reservation rejected");
            out_events.push(Event::ReservationRejected { agent, reason });
            return;
        }

        self.grid.release(agent);
        self.grid.vacate(origin);
        match path.split_last() {
            None => self.grid.occupy(origin, agent),
            Some((destination, intermediate)) => {
                for cell in intermediate {
                    self.grid.claim(*cell, agent);
                }
                self.grid.occupy(*destination, agent);
            }
        }

        if let Some(entry) = self.agent_mut(agent) {
            entry.path = path.iter().copied().collect();
        }
        out_events.push(Event::PathReserved { agent, path });
    }

    fn validate_path(&self, origin: CellCoord, path: &[CellCoord]) -> Result<(), ReservationError> {
        let mut previous = origin;
        for cell in path {
            if Direction::between(previous, *cell).is_none() {
                return Err(ReservationError::Discontinuous);
            }
            match self.grid.state(*cell) {
                Some(state) if !state.blocked => {}
                _ => return Err(ReservationError::Impassable),
            }
            previous = *cell;
        }
        Ok(())
    }

    fn step_agent(&mut self, agent: AgentId, direction: Direction, out_events: &mut Vec<Event>) {
        match self.resolve_step(agent, direction) {
            Ok((from, to)) => {
                self.occupancy.vacate(from);
                self.occupancy.occupy(agent, to);
                if let Some(entry) = self.agent_mut(agent) {
                    let _ = entry.path.pop_front();
                    entry.cell = to;
                    entry.facing = direction;
                }
                out_events.push(Event::AgentStepped {
                    agent,
                    from,
                    to,
                    direction,
                });
            }
            Err(reason) => {
                warn!(agent = agent.get(), ?direction, ?reason, "step rejected");
                out_events.push(Event::StepRejected {
                    agent,
                    direction,
                    reason,
                });
            }
        }
    }

    fn resolve_step(
        &self,
        agent: AgentId,
        direction: Direction,
    ) -> Result<(CellCoord, CellCoord), StepError> {
        let entry = self.agent(agent).ok_or(StepError::MissingAgent)?;
        if !entry.condition(self.turn).can_act() {
            return Err(StepError::Suspended);
        }

        let from = entry.cell;
        let to = entry.path.front().copied().ok_or(StepError::OffPath)?;
        if Direction::between(from, to) != Some(direction) {
            return Err(StepError::OffPath);
        }

        let blocked = self.grid.state(to).map_or(true, |state| state.blocked);
        let foreign_body = self
            .occupancy
            .occupant(to)
            .is_some_and(|occupant| occupant != agent);
        if blocked || foreign_body {
            return Err(StepError::Obstructed);
        }

        Ok((from, to))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { layout } => {
            *world = World::with_layout(layout);
            out_events.push(Event::GridConfigured {
                columns: layout.columns(),
                rows: layout.rows(),
            });
        }
        Command::SetCellBlocked { cell, blocked } => world.set_blocked(cell, blocked, out_events),
        Command::SpawnAgent { cell, facing } => world.spawn_agent(cell, facing, out_events),
        Command::SetHarmonized { agent, harmonized } => {
            world.set_harmonized(agent, harmonized, out_events);
        }
        Command::StunAgent { agent, turns } => world.stun_agent(agent, turns, out_events),
        Command::MoveTrackedEntity { position } => world.move_tracked(position, out_events),
        Command::BeginTurn => world.begin_turn(out_events),
        Command::ReservePath { agent, path } => world.reserve_path(agent, path, out_events),
        Command::StepAgent { agent, direction } => world.step_agent(agent, direction, out_events),
        Command::Tick { dt } => out_events.push(Event::TimeAdvanced { dt }),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use pursuit_core::{
        AgentId, AgentSnapshot, AgentView, CellCoord, GridEntry, GridLayout, GridView,
        TrackedSnapshot,
    };

    use super::World;

    /// Layout of the configured grid.
    #[must_use]
    pub fn layout(world: &World) -> GridLayout {
        world.grid.layout()
    }

    /// Exposes a read-only view of the cell grid and its availability.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Captures a read-only view of the agents on the grid.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        let snapshots = world
            .agents
            .iter()
            .map(|agent| AgentSnapshot {
                id: agent.id,
                cell: agent.cell,
                facing: agent.facing,
                condition: agent.condition(world.turn),
                planned_path: agent.path.iter().copied().collect(),
            })
            .collect();
        AgentView::from_snapshots(snapshots)
    }

    /// Position history of the tracked entity, once it has been reported.
    #[must_use]
    pub fn tracked_entity(world: &World) -> Option<TrackedSnapshot> {
        world.tracked
    }

    /// Agent standing on the provided cell.
    #[must_use]
    pub fn occupant(world: &World, cell: CellCoord) -> Option<AgentId> {
        world.occupancy.occupant(cell)
    }

    /// Classifies what stands on a cell, agents taking precedence.
    #[must_use]
    pub fn entry_at(world: &World, cell: CellCoord) -> Option<GridEntry> {
        if let Some(agent) = world.occupancy.occupant(cell) {
            return Some(GridEntry::Agent(agent));
        }
        if world.tracked_cell() == Some(cell) {
            return Some(GridEntry::TrackedEntity);
        }
        world
            .grid
            .state(cell)
            .filter(|state| state.blocked)
            .map(|_| GridEntry::Barrier)
    }

    /// Index of the most recently started turn; zero before the first turn.
    #[must_use]
    pub fn turn(world: &World) -> u64 {
        world.turn
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    cell: CellCoord,
    facing: Direction,
    harmonized: bool,
    stunned_until: Option<u64>,
    path: VecDeque<CellCoord>,
}

impl Agent {
    fn new(id: AgentId, cell: CellCoord, facing: Direction) -> Self {
        Self {
            id,
            cell,
            facing,
            harmonized: false,
            stunned_until: None,
            path: VecDeque::new(),
        }
    }

    fn condition(&self, turn: u64) -> AgentCondition {
        if self.harmonized {
            return AgentCondition::Harmonized;
        }
        match self.stunned_until {
            Some(until_turn) if turn < until_turn => AgentCondition::Stunned { until_turn },
            _ => AgentCondition::Ready,
        }
    }
}
