#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Composition root that wires the world and the pure systems into a
//! playable session.

mod level;

use std::time::Duration;

use pursuit_core::{AgentId, CellCoord, Command, Event};
use pursuit_system_motion::Motion;
use pursuit_system_movement::Movement;
use pursuit_world::{self as world, query, World};
use tracing::{debug, info};

pub use level::{AgentPlacement, Level, LevelError};

/// Owns the world together with the systems reacting to it.
#[derive(Debug)]
pub struct Session {
    world: World,
    movement: Movement,
    motion: Motion,
    script: Vec<CellCoord>,
    script_cursor: usize,
}

impl Session {
    /// Builds the world described by the level.
    pub fn new(level: &Level) -> Result<Self, LevelError> {
        let mut session = Self {
            world: World::new(),
            movement: Movement::new(level.movement),
            motion: Motion::new(level.motion),
            script: level.script.clone(),
            script_cursor: 0,
        };

        let _ = session.dispatch(Command::ConfigureGrid {
            layout: level.layout,
        });
        for wall in &level.walls {
            let events = session.dispatch(Command::SetCellBlocked {
                cell: *wall,
                blocked: true,
            });
            if let Some(Event::CellBlockRejected { cell, reason }) = events.first() {
                return Err(LevelError::WallRejected {
                    cell: *cell,
                    reason: *reason,
                });
            }
        }
        for agent in &level.agents {
            let events = session.dispatch(Command::SpawnAgent {
                cell: agent.cell,
                facing: agent.facing,
            });
            if let Some(Event::AgentSpawnRejected { cell, reason }) = events.first() {
                return Err(LevelError::SpawnRejected {
                    cell: *cell,
                    reason: *reason,
                });
            }
        }
        if let Some(start) = level.player_start {
            session.move_player(start);
        }

        info!(
            columns = level.layout.columns(),
            rows = level.layout.rows(),
            agents = level.agents.len(),
            "session ready"
        );
        Ok(session)
    }

    /// Moves the player along its script, then resolves one turn.
    ///
    /// Once the script is exhausted the player holds its position, which is
    /// reported again so predictions see a stationary target.
    pub fn advance_turn(&mut self) -> TurnReport {
        match self.script.get(self.script_cursor).copied() {
            Some(cell) => {
                self.script_cursor += 1;
                self.move_player(cell);
            }
            None => {
                if let Some(tracked) = query::tracked_entity(&self.world) {
                    let _ = self.dispatch(Command::MoveTrackedEntity {
                        position: tracked.current,
                    });
                }
            }
        }

        let events = self.dispatch(Command::BeginTurn);
        let report = TurnReport {
            turn: query::turn(&self.world),
            events,
            captured_by: self.captor(),
        };
        info!(
            turn = report.turn,
            steps = report.steps().count(),
            caught = report.caught(),
            "turn resolved"
        );
        report
    }

    /// Agent sharing a cell with the player, if any.
    #[must_use]
    pub fn captor(&self) -> Option<AgentId> {
        let tracked = query::tracked_entity(&self.world)?;
        let cell = query::layout(&self.world).cell_at(tracked.current)?;
        query::occupant(&self.world, cell)
    }

    /// Reports the player's position to the world.
    pub fn move_player(&mut self, cell: CellCoord) {
        let position = query::layout(&self.world).center_of(cell);
        let _ = self.dispatch(Command::MoveTrackedEntity { position });
    }

    /// Advances animations by the provided delta.
    pub fn tick(&mut self, dt: Duration) {
        let _ = self.dispatch(Command::Tick { dt });
    }

    /// Applies a command and routes the resulting events through every
    /// system until no further commands are produced.
    pub fn dispatch(&mut self, command: Command) -> Vec<Event> {
        let mut log = Vec::new();
        let mut pending = vec![command];

        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }

            self.motion.handle(&events, &query::layout(&self.world));
            self.movement.handle(
                &events,
                &query::agent_view(&self.world),
                query::grid_view(&self.world),
                query::tracked_entity(&self.world),
                &mut pending,
            );
            if !pending.is_empty() {
                debug!(commands = pending.len(), "systems issued commands");
            }
            log.extend(events);
        }

        log
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Turn coordinator.
    #[must_use]
    pub fn movement(&self) -> &Movement {
        &self.movement
    }

    /// Animation state.
    #[must_use]
    pub fn motion(&self) -> &Motion {
        &self.motion
    }
}

/// Events produced while resolving a single turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReport {
    /// Index of the resolved turn.
    pub turn: u64,
    /// Every event emitted during the turn, in order.
    pub events: Vec<Event>,
    /// Agent standing on the player's cell once the turn resolved.
    pub captured_by: Option<AgentId>,
}

impl TurnReport {
    /// Agents that advanced, with the cells they left and entered.
    pub fn steps(&self) -> impl Iterator<Item = (AgentId, CellCoord, CellCoord)> + '_ {
        self.events.iter().filter_map(|event| match event {
            Event::AgentStepped {
                agent, from, to, ..
            } => Some((*agent, *from, *to)),
            _ => None,
        })
    }

    /// Reports whether an agent shares the player's cell, whether it stepped
    /// in or the player walked onto it.
    #[must_use]
    pub fn caught(&self) -> bool {
        self.captured_by.is_some()
    }
}
