use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use glam::Vec2;
use pursuit_core::{AgentId, CellCoord, Command, Direction, Event, GridLayout};
use pursuit_system_movement::Movement;
use pursuit_world::{self as world, query, World};

#[test]
fn deterministic_replay_produces_identical_outcomes() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(
        first
            .events
            .iter()
            .any(|record| matches!(record, EventRecord::AgentStepped { .. })),
        "expected the replay to move agents"
    );
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut world = World::new();
    let mut movement = Movement::default();
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        world::apply(&mut world, command, &mut events);
        record_events(&events, &mut log);
        process_movement(&mut world, &mut movement, events, &mut log);
    }

    let agents = query::agent_view(&world)
        .into_vec()
        .into_iter()
        .map(|snapshot| AgentState {
            id: snapshot.id,
            cell: snapshot.cell,
            facing: snapshot.facing,
            planned_path: snapshot.planned_path,
        })
        .collect();

    ReplayOutcome { agents, events: log }
}

fn process_movement(
    world: &mut World,
    movement: &mut Movement,
    events: Vec<Event>,
    log: &mut Vec<EventRecord>,
) {
    let mut commands = Vec::new();
    movement.handle(
        &events,
        &query::agent_view(world),
        query::grid_view(world),
        query::tracked_entity(world),
        &mut commands,
    );

    for command in commands {
        let mut generated_events = Vec::new();
        world::apply(world, command, &mut generated_events);
        record_events(&generated_events, log);
    }
}

fn record_events(events: &[Event], log: &mut Vec<EventRecord>) {
    log.extend(events.iter().filter_map(EventRecord::from_event));
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![Command::ConfigureGrid {
        layout: GridLayout::new(8, 6, 1.0, Vec2::ZERO),
    }];
    for row in 0..4 {
        commands.push(Command::SetCellBlocked {
            cell: CellCoord::new(4, row),
            blocked: true,
        });
    }
    for cell in [
        CellCoord::new(0, 0),
        CellCoord::new(1, 5),
        CellCoord::new(7, 0),
    ] {
        commands.push(Command::SpawnAgent {
            cell,
            facing: Direction::East,
        });
    }

    let player_path = [
        Vec2::new(6.5, 1.5),
        Vec2::new(6.5, 2.5),
        Vec2::new(5.5, 2.5),
        Vec2::new(5.5, 3.5),
        Vec2::new(5.5, 4.5),
        Vec2::new(4.5, 4.5),
        Vec2::new(3.5, 4.5),
    ];
    for position in player_path {
        commands.push(Command::MoveTrackedEntity { position });
        commands.push(Command::BeginTurn);
    }
    commands
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    agents: Vec<AgentState>,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AgentState {
    id: AgentId,
    cell: CellCoord,
    facing: Direction,
    planned_path: Vec<CellCoord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    TurnStarted {
        turn: u64,
    },
    PathReserved {
        agent: AgentId,
        path: Vec<CellCoord>,
    },
    AgentStepped {
        agent: AgentId,
        from: CellCoord,
        to: CellCoord,
    },
    Rejected,
}

impl EventRecord {
    fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::TurnStarted { turn } => Some(Self::TurnStarted { turn: *turn }),
            Event::PathReserved { agent, path } => Some(Self::PathReserved {
                agent: *agent,
                path: path.clone(),
            }),
            Event::AgentStepped {
                agent, from, to, ..
            } => Some(Self::AgentStepped {
                agent: *agent,
                from: *from,
                to: *to,
            }),
            Event::StepRejected { .. } | Event::ReservationRejected { .. } => Some(Self::Rejected),
            _ => None,
        }
    }
}
