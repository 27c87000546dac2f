use std::collections::HashSet;

use glam::Vec2;
use pursuit_core::{
    AgentId, Availability, CellCoord, Command, Direction, Event, GridLayout,
};
use pursuit_system_movement::Movement;
use pursuit_world::{self as world, query, World};

#[test]
fn fresh_agent_reserves_its_whole_path() {
    let mut world = grid_world(5, 5);
    let agent = spawn_agent(&mut world, CellCoord::new(0, 0));
    move_player(&mut world, Vec2::new(4.5, 4.5));

    let mut movement = Movement::default();
    let (commands, events) = run_turn(&mut world, &mut movement);

    let reserved = commands
        .iter()
        .find_map(|command| match command {
            Command::ReservePath { agent: id, path } if *id == agent => Some(path.clone()),
            _ => None,
        })
        .expect("reservation for the agent");
    assert_eq!(reserved.len(), 8);
    assert_eq!(reserved.last(), Some(&CellCoord::new(4, 4)));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::AgentStepped { .. })));

    let grid = query::grid_view(&world);
    let (intermediate, destination) = reserved.split_at(reserved.len() - 1);
    for cell in intermediate {
        assert_eq!(grid.availability(*cell), Some(Availability::Claimed));
        assert_eq!(grid.owner(*cell), Some(agent));
    }
    assert_eq!(
        grid.availability(destination[0]),
        Some(Availability::Occupied)
    );
    assert_eq!(
        grid.availability(CellCoord::new(0, 0)),
        Some(Availability::Empty)
    );

    let snapshot = query::agent_view(&world)
        .get(agent)
        .cloned()
        .expect("agent snapshot");
    assert_eq!(snapshot.cell, reserved[0]);
    assert_eq!(snapshot.planned_path, reserved[1..].to_vec());
}

#[test]
fn predicted_position_is_preferred() {
    let mut world = grid_world(7, 7);
    let agent = spawn_agent(&mut world, CellCoord::new(5, 3));
    move_player(&mut world, Vec2::new(1.5, 3.5));
    move_player(&mut world, Vec2::new(2.5, 3.5));

    let mut movement = Movement::default();
    let (commands, _) = run_turn(&mut world, &mut movement);

    assert_eq!(
        commands,
        vec![
            Command::ReservePath {
                agent,
                path: vec![CellCoord::new(4, 3), CellCoord::new(3, 3)],
            },
            Command::StepAgent {
                agent,
                direction: Direction::West,
            },
        ]
    );
}

#[test]
fn later_agents_respect_earlier_decisions() {
    let mut world = grid_world(3, 3);
    let first = spawn_agent(&mut world, CellCoord::new(0, 1));
    let second = spawn_agent(&mut world, CellCoord::new(2, 1));
    move_player(&mut world, Vec2::new(1.5, 1.5));

    let mut movement = Movement::default();
    let (commands, events) = run_turn(&mut world, &mut movement);

    assert_eq!(
        commands,
        vec![
            Command::ReservePath {
                agent: first,
                path: vec![CellCoord::new(1, 1)],
            },
            Command::StepAgent {
                agent: first,
                direction: Direction::East,
            },
        ]
    );
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::StepRejected { .. })));
    assert_eq!(movement.stalled_for(second), 1);
    assert_eq!(movement.stalled_for(first), 0);
}

#[test]
fn crowded_turns_never_collide() {
    let mut world = grid_world(7, 7);
    for cell in [
        CellCoord::new(0, 0),
        CellCoord::new(6, 0),
        CellCoord::new(0, 6),
        CellCoord::new(6, 6),
        CellCoord::new(3, 0),
    ] {
        let _ = spawn_agent(&mut world, cell);
    }

    let script = [
        Vec2::new(3.5, 3.5),
        Vec2::new(3.5, 4.5),
        Vec2::new(2.5, 4.5),
        Vec2::new(2.5, 3.5),
        Vec2::new(3.5, 3.5),
        Vec2::new(4.5, 3.5),
    ];

    let mut movement = Movement::default();
    let mut steps = 0;
    for position in script {
        move_player(&mut world, position);
        let (_, events) = run_turn(&mut world, &mut movement);

        let entered: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::AgentStepped { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        let unique: HashSet<_> = entered.iter().collect();
        assert_eq!(unique.len(), entered.len(), "shared step destination");

        for event in &events {
            assert!(
                !matches!(
                    event,
                    Event::StepRejected { .. } | Event::ReservationRejected { .. }
                ),
                "unexpected rejection: {event:?}"
            );
        }
        steps += events
            .iter()
            .filter(|event| matches!(event, Event::AgentStepped { .. }))
            .count();

        let cells: Vec<_> = query::agent_view(&world)
            .iter()
            .map(|snapshot| snapshot.cell)
            .collect();
        let distinct: HashSet<_> = cells.iter().collect();
        assert_eq!(distinct.len(), cells.len(), "agents share a cell");
    }

    assert!(steps > 0, "expected agents to advance");
}

#[test]
fn stunned_agents_wait_out_their_turns() {
    let mut world = grid_world(5, 1);
    let agent = spawn_agent(&mut world, CellCoord::new(0, 0));
    move_player(&mut world, Vec2::new(4.5, 0.5));
    apply(&mut world, Command::StunAgent { agent, turns: 1 });

    let mut movement = Movement::default();
    let (stunned, _) = run_turn(&mut world, &mut movement);
    assert!(stunned.is_empty());
    assert_eq!(movement.stalled_for(agent), 0);

    let (recovered, _) = run_turn(&mut world, &mut movement);
    assert!(recovered.contains(&Command::StepAgent {
        agent,
        direction: Direction::East,
    }));
}

#[test]
fn idle_reservation_does_not_close_the_tracked_cell() {
    let mut world = grid_world(5, 3);
    let first = spawn_agent(&mut world, CellCoord::new(0, 1));
    let second = spawn_agent(&mut world, CellCoord::new(4, 1));
    move_player(&mut world, Vec2::new(2.5, 1.5));

    let mut movement = Movement::default();
    let (opening, _) = run_turn(&mut world, &mut movement);
    assert!(opening.contains(&Command::ReservePath {
        agent: first,
        path: vec![CellCoord::new(1, 1), CellCoord::new(2, 1)],
    }));
    apply(
        &mut world,
        Command::StunAgent {
            agent: first,
            turns: 5,
        },
    );

    for _ in 0..2 {
        let _ = run_turn(&mut world, &mut movement);
    }

    let agents = query::agent_view(&world);
    assert_eq!(
        agents.get(first).map(|snapshot| snapshot.cell),
        Some(CellCoord::new(1, 1))
    );
    assert_eq!(
        agents.get(second).map(|snapshot| snapshot.cell),
        Some(CellCoord::new(2, 1))
    );
    assert_eq!(movement.stalled_for(second), 0);
}

#[test]
fn foreign_body_on_the_tracked_cell_keeps_it_closed() {
    let mut world = grid_world(3, 1);
    let first = spawn_agent(&mut world, CellCoord::new(1, 0));
    let second = spawn_agent(&mut world, CellCoord::new(2, 0));
    move_player(&mut world, Vec2::new(1.5, 0.5));

    let mut movement = Movement::default();
    let (commands, _) = run_turn(&mut world, &mut movement);

    assert_eq!(
        commands,
        vec![Command::ReservePath {
            agent: first,
            path: Vec::new(),
        }]
    );
    assert_eq!(movement.stalled_for(second), 1);
}

#[test]
fn harmonized_agents_hold_still() {
    let mut world = grid_world(5, 1);
    let agent = spawn_agent(&mut world, CellCoord::new(0, 0));
    move_player(&mut world, Vec2::new(4.5, 0.5));
    apply(
        &mut world,
        Command::SetHarmonized {
            agent,
            harmonized: true,
        },
    );

    let mut movement = Movement::default();
    let (commands, _) = run_turn(&mut world, &mut movement);
    assert!(commands.is_empty());

    apply(
        &mut world,
        Command::SetHarmonized {
            agent,
            harmonized: false,
        },
    );
    let (commands, _) = run_turn(&mut world, &mut movement);
    assert_eq!(commands.len(), 2);
}

#[test]
fn agents_stall_without_a_tracked_entity() {
    let mut world = grid_world(4, 4);
    let agent = spawn_agent(&mut world, CellCoord::new(1, 1));

    let mut movement = Movement::default();
    for expected in 1..=2 {
        let (commands, _) = run_turn(&mut world, &mut movement);
        assert!(commands.is_empty());
        assert_eq!(movement.stalled_for(agent), expected);
    }

    move_player(&mut world, Vec2::new(3.5, 1.5));
    let _ = run_turn(&mut world, &mut movement);
    assert_eq!(movement.stalled_for(agent), 0);
}

#[test]
fn agent_on_target_keeps_its_cell() {
    let mut world = grid_world(4, 4);
    let agent = spawn_agent(&mut world, CellCoord::new(2, 2));
    move_player(&mut world, Vec2::new(2.5, 2.5));

    let mut movement = Movement::default();
    let (commands, _) = run_turn(&mut world, &mut movement);

    assert_eq!(
        commands,
        vec![Command::ReservePath {
            agent,
            path: Vec::new(),
        }]
    );
    assert_eq!(
        query::grid_view(&world).availability(CellCoord::new(2, 2)),
        Some(Availability::Occupied)
    );
}

#[test]
fn walled_off_agent_does_not_move() {
    let mut world = grid_world(3, 3);
    for row in 0..3 {
        apply(
            &mut world,
            Command::SetCellBlocked {
                cell: CellCoord::new(1, row),
                blocked: true,
            },
        );
    }
    let agent = spawn_agent(&mut world, CellCoord::new(0, 0));
    move_player(&mut world, Vec2::new(2.5, 2.5));

    let mut movement = Movement::default();
    let (commands, _) = run_turn(&mut world, &mut movement);

    assert!(commands.is_empty());
    assert_eq!(movement.stalled_for(agent), 1);
    assert_eq!(
        query::grid_view(&world).availability(CellCoord::new(0, 0)),
        Some(Availability::Occupied)
    );
}

fn grid_world(columns: u32, rows: u32) -> World {
    let mut world = World::new();
    apply(
        &mut world,
        Command::ConfigureGrid {
            layout: GridLayout::new(columns, rows, 1.0, Vec2::ZERO),
        },
    );
    world
}

fn spawn_agent(world: &mut World, cell: CellCoord) -> AgentId {
    let events = apply(
        world,
        Command::SpawnAgent {
            cell,
            facing: Direction::North,
        },
    );
    match events.as_slice() {
        [Event::AgentSpawned { agent, .. }] => *agent,
        other => panic!("expected spawn event at {cell:?}, got {other:?}"),
    }
}

fn move_player(world: &mut World, position: Vec2) {
    let _ = apply(world, Command::MoveTrackedEntity { position });
}

fn apply(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn run_turn(world: &mut World, movement: &mut Movement) -> (Vec<Command>, Vec<Event>) {
    let events = apply(world, Command::BeginTurn);

    let mut commands = Vec::new();
    movement.handle(
        &events,
        &query::agent_view(world),
        query::grid_view(world),
        query::tracked_entity(world),
        &mut commands,
    );

    let mut produced = Vec::new();
    for command in commands.iter().cloned() {
        world::apply(world, command, &mut produced);
    }
    (commands, produced)
}
