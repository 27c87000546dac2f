//! ASCII rendering of the world grid.

use pursuit_core::{Availability, CellCoord, GridEntry};
use pursuit_world::{query, World};

/// Draws one character per cell, row zero first.
pub(crate) fn frame(world: &World) -> String {
    let layout = query::layout(world);
    let grid = query::grid_view(world);
    let mut out = String::with_capacity(((layout.columns() + 1) * layout.rows()) as usize);

    for row in 0..layout.rows() {
        for column in 0..layout.columns() {
            let cell = CellCoord::new(column, row);
            let glyph = match query::entry_at(world, cell) {
                Some(GridEntry::Agent(_)) => 'E',
                Some(GridEntry::TrackedEntity) => 'P',
                Some(GridEntry::Barrier) => '#',
                None => match grid.availability(cell) {
                    Some(Availability::Claimed) => '+',
                    Some(Availability::Occupied) => '*',
                    Some(Availability::Empty) | None => '.',
                },
            };
            out.push(glyph);
        }
        if row + 1 < layout.rows() {
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use pursuit_core::{Command, Direction, Event, GridLayout};
    use pursuit_world::{self as world, World};

    use super::*;

    #[test]
    fn frame_marks_entities_and_reservations() {
        let mut world = World::new();
        let layout = GridLayout::new(4, 2, 1.0, Vec2::ZERO);
        let mut events = Vec::new();
        world::apply(&mut world, Command::ConfigureGrid { layout }, &mut events);
        world::apply(
            &mut world,
            Command::SetCellBlocked {
                cell: CellCoord::new(0, 1),
                blocked: true,
            },
            &mut events,
        );
        world::apply(
            &mut world,
            Command::SpawnAgent {
                cell: CellCoord::new(0, 0),
                facing: Direction::East,
            },
            &mut events,
        );
        let agent = events
            .iter()
            .find_map(|event| match event {
                Event::AgentSpawned { agent, .. } => Some(*agent),
                _ => None,
            })
            .expect("agent spawned");
        world::apply(
            &mut world,
            Command::MoveTrackedEntity {
                position: layout.center_of(CellCoord::new(3, 1)),
            },
            &mut events,
        );
        world::apply(
            &mut world,
            Command::ReservePath {
                agent,
                path: vec![CellCoord::new(1, 0), CellCoord::new(2, 0)],
            },
            &mut events,
        );

        assert_eq!(frame(&world), "E+*.\n#..P");
    }
}
