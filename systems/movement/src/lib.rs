#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic turn coordinator that plans paths, reserves cells and
//! proposes agent steps.

mod ledger;

use pursuit_core::{
    AgentId, AgentSnapshot, AgentView, Command, Direction, Event, GridView, TrackedSnapshot,
};
use pursuit_system_pathfinding::{Path, PathRequest, Planner, PlannerConfig};
use pursuit_system_targeting::{candidate_targets, tracked_cell, TargetKind};
use tracing::{debug, warn};

use crate::ledger::WorkingLedger;

/// Tunables for the turn coordinator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementConfig {
    /// Settings forwarded to the path planner.
    pub planner: PlannerConfig,
    /// Steps a later candidate must save over the current choice to replace it.
    pub prioritized_bonus: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            prioritized_bonus: 1,
        }
    }
}

/// Pure system that reacts to turn starts and emits reservation and step
/// commands.
#[derive(Debug)]
pub struct Movement {
    config: MovementConfig,
    planner: Planner,
    ledger: WorkingLedger,
    stalls: StallTracker,
}

impl Movement {
    /// Creates a coordinator with the provided configuration.
    #[must_use]
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            planner: Planner::new(config.planner),
            ledger: WorkingLedger::default(),
            stalls: StallTracker::default(),
        }
    }

    /// Consumes world events and immutable views to emit movement commands.
    ///
    /// Agents are processed in ascending identifier order. Each moving agent
    /// receives a `ReservePath` command followed by at most one `StepAgent`.
    pub fn handle(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        grid: GridView<'_>,
        tracked: Option<TrackedSnapshot>,
        out: &mut Vec<Command>,
    ) {
        let mut turn_started = false;
        for event in events {
            match event {
                Event::GridConfigured { .. } => self.stalls.clear(),
                Event::TurnStarted { .. } => turn_started = true,
                _ => {}
            }
        }
        if !turn_started {
            return;
        }

        self.ledger.reset(grid, agents);
        for agent in agents.iter() {
            if !agent.condition.can_act() {
                debug!(agent = agent.id.get(), condition = ?agent.condition, "agent skips turn");
                continue;
            }

            let Some(path) = self.plan_for(agent, grid, tracked) else {
                let stalled_for = self.stalls.mark_stall(agent.id);
                warn!(agent = agent.id.get(), stalled_for, "no path to any target");
                continue;
            };

            self.ledger.reserve(agent.id, agent.cell, path.cells());
            let next = path.first();
            out.push(Command::ReservePath {
                agent: agent.id,
                path: path.into_cells(),
            });

            let Some(next) = next else {
                self.stalls.record_progress(agent.id);
                continue;
            };
            if let Some(direction) = Direction::between(agent.cell, next) {
                self.ledger.move_body(agent.id, agent.cell, next);
                self.stalls.record_progress(agent.id);
                out.push(Command::StepAgent {
                    agent: agent.id,
                    direction,
                });
            }
        }
    }

    /// Consecutive turns the agent ended without a viable path.
    #[must_use]
    pub fn stalled_for(&self, agent: AgentId) -> u32 {
        self.stalls.stalled_for(agent)
    }

    fn plan_for(
        &mut self,
        agent: &AgentSnapshot,
        grid: GridView<'_>,
        tracked: Option<TrackedSnapshot>,
    ) -> Option<Path> {
        let tracked = tracked?;
        let layout = grid.layout();
        // Reservations never close the tracked cell; another agent's body does.
        let exempt = tracked_cell(&layout, &tracked).filter(|cell| {
            !grid.is_blocked(*cell) && !self.ledger.foreign_body(*cell, agent.id)
        });
        let targets = candidate_targets(&layout, &tracked);

        let mut candidates: [Option<Path>; 3] = Default::default();
        for (slot, target) in candidates.iter_mut().zip(targets) {
            let Some(target) = target else {
                continue;
            };
            let request = PathRequest {
                start: agent.cell,
                target,
                exempt,
            };
            let ledger = &self.ledger;
            *slot = match self
                .planner
                .find_path(grid, request, |cell| ledger.access(cell, agent.id))
            {
                Ok(path) => path,
                Err(error) => {
                    warn!(agent = agent.id.get(), %error, "candidate discarded");
                    None
                }
            };
        }

        let (index, path) = select_plan(candidates, self.config.prioritized_bonus)?;
        debug!(
            agent = agent.id.get(),
            target = ?TargetKind::PRIORITY[index],
            steps = path.len(),
            cost = path.cost(),
            "path selected"
        );
        Some(path)
    }
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}

/// Picks the winning path among candidates evaluated in priority order.
///
/// The first available candidate becomes the champion. A later candidate
/// replaces it only when it is shorter by more than `prioritized_bonus`
/// steps. Returns the winning candidate's index alongside its path.
#[must_use]
pub fn select_plan<I>(candidates: I, prioritized_bonus: usize) -> Option<(usize, Path)>
where
    I: IntoIterator<Item = Option<Path>>,
{
    let mut champion: Option<(usize, Path)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let Some(candidate) = candidate else {
            continue;
        };
        let replace = match &champion {
            None => true,
            Some((_, current)) => {
                current.len().saturating_sub(candidate.len()) > prioritized_bonus
            }
        };
        if replace {
            champion = Some((index, candidate));
        }
    }
    champion
}

#[derive(Debug, Default)]
struct StallTracker {
    agents: Vec<AgentId>,
    stalled_for: Vec<u32>,
}

impl StallTracker {
    fn clear(&mut self) {
        self.agents.clear();
        self.stalled_for.clear();
    }

    fn slot(&mut self, agent: AgentId) -> &mut u32 {
        let index = match self.agents.binary_search(&agent) {
            Ok(index) => index,
            Err(index) => {
                self.agents.insert(index, agent);
                self.stalled_for.insert(index, 0);
                index
            }
        };
        &mut self.stalled_for[index]
    }

    fn record_progress(&mut self, agent: AgentId) {
        *self.slot(agent) = 0;
    }

    fn mark_stall(&mut self, agent: AgentId) -> u32 {
        let counter = self.slot(agent);
        *counter = counter.saturating_add(1);
        *counter
    }

    fn stalled_for(&self, agent: AgentId) -> u32 {
        self.agents
            .binary_search(&agent)
            .ok()
            .and_then(|index| self.stalled_for.get(index).copied())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pursuit_core::CellCoord;

    fn path_of(len: u32) -> Option<Path> {
        let cells = (1..=len).map(|column| CellCoord::new(column, 0)).collect();
        Some(Path::new(cells, len as f32))
    }

    fn winner_len(candidates: [Option<Path>; 3], bonus: usize) -> Option<usize> {
        select_plan(candidates, bonus).map(|(_, path)| path.len())
    }

    #[test]
    fn shorter_candidate_wins_beyond_the_bonus() {
        assert_eq!(winner_len([path_of(5), path_of(5), path_of(3)], 1), Some(3));
    }

    #[test]
    fn saving_exactly_the_bonus_keeps_the_champion() {
        assert_eq!(winner_len([path_of(5), path_of(5), path_of(4)], 1), Some(5));
        assert_eq!(
            select_plan([path_of(5), path_of(5), path_of(4)], 1).map(|(index, _)| index),
            Some(0)
        );
    }

    #[test]
    fn missing_candidates_are_skipped() {
        assert_eq!(
            select_plan([None, path_of(6), path_of(2)], 1).map(|(index, _)| index),
            Some(2)
        );
        assert_eq!(winner_len([None, None, path_of(4)], 1), Some(4));
        assert!(select_plan([None, None, None], 1).is_none());
    }

    #[test]
    fn longer_candidates_never_replace_the_champion() {
        assert_eq!(winner_len([path_of(2), path_of(9), path_of(7)], 0), Some(2));
    }

    #[test]
    fn stall_counters_reset_on_progress() {
        let mut stalls = StallTracker::default();
        let agent = AgentId::new(4);
        assert_eq!(stalls.stalled_for(agent), 0);
        assert_eq!(stalls.mark_stall(agent), 1);
        assert_eq!(stalls.mark_stall(agent), 2);
        assert_eq!(stalls.stalled_for(AgentId::new(1)), 0);

        stalls.record_progress(agent);
        assert_eq!(stalls.stalled_for(agent), 0);

        let _ = stalls.mark_stall(agent);
        stalls.clear();
        assert_eq!(stalls.stalled_for(agent), 0);
    }
}
