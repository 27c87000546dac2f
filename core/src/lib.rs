#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Pursuit engine.
//!
//! This crate defines the message surface that connects the hosting engine,
//! the authoritative world, and pure systems. The engine submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views such as [`GridView`] and [`AgentView`], and respond exclusively with
//! new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::Deserialize;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Rebuilds the cell grid, discarding every agent and reservation.
    ConfigureGrid {
        /// Dimensions and world placement of the new grid.
        layout: GridLayout,
    },
    /// Raises or lowers a barrier (wall or door) on a single cell.
    SetCellBlocked {
        /// Cell receiving the barrier.
        cell: CellCoord,
        /// Whether the cell becomes impassable.
        blocked: bool,
    },
    /// Places a new agent on the grid.
    SpawnAgent {
        /// Cell the agent starts on.
        cell: CellCoord,
        /// Initial facing of the agent.
        facing: Direction,
    },
    /// Toggles the harmonized condition, which suspends turn-taking.
    SetHarmonized {
        /// Agent whose condition changes.
        agent: AgentId,
        /// Whether the agent is harmonized.
        harmonized: bool,
    },
    /// Stuns an agent for the provided number of upcoming turns.
    StunAgent {
        /// Agent that becomes stunned.
        agent: AgentId,
        /// Number of turns the agent skips.
        turns: u32,
    },
    /// Records a new world position for the tracked entity.
    MoveTrackedEntity {
        /// Position the tracked entity moved to.
        position: Vec2,
    },
    /// Starts a new turn for every agent.
    BeginTurn,
    /// Replaces an agent's reservation with the provided path.
    ReservePath {
        /// Agent that owns the reservation.
        agent: AgentId,
        /// Cells to reserve in travel order, excluding the agent's current cell.
        path: Vec<CellCoord>,
    },
    /// Requests that an agent advance a single step in the specified direction.
    StepAgent {
        /// Agent attempting to move.
        agent: AgentId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Advances the animation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the grid was rebuilt.
    GridConfigured {
        /// Number of columns in the new grid.
        columns: u32,
        /// Number of rows in the new grid.
        rows: u32,
    },
    /// Confirms that a barrier was raised or lowered.
    CellBlockChanged {
        /// Cell whose barrier changed.
        cell: CellCoord,
        /// Whether the cell is now impassable.
        blocked: bool,
    },
    /// Reports that a barrier request was rejected.
    CellBlockRejected {
        /// Cell targeted by the request.
        cell: CellCoord,
        /// Specific reason the request failed.
        reason: BlockError,
    },
    /// Confirms that an agent joined the grid.
    AgentSpawned {
        /// Identifier assigned to the agent.
        agent: AgentId,
        /// Cell the agent occupies.
        cell: CellCoord,
        /// Initial facing of the agent.
        facing: Direction,
    },
    /// Reports that a spawn request was rejected.
    AgentSpawnRejected {
        /// Cell provided in the spawn request.
        cell: CellCoord,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Announces that an agent's condition changed.
    AgentConditionChanged {
        /// Agent whose condition changed.
        agent: AgentId,
        /// Condition that became active.
        condition: AgentCondition,
    },
    /// Confirms that the tracked entity moved.
    TrackedEntityMoved {
        /// Position after the move.
        current: Vec2,
        /// Position before the move.
        previous: Vec2,
    },
    /// Announces that a new turn started.
    TurnStarted {
        /// One-based index of the turn.
        turn: u64,
    },
    /// Confirms that an agent's reservation was replaced.
    PathReserved {
        /// Agent owning the reservation.
        agent: AgentId,
        /// Reserved cells in travel order.
        path: Vec<CellCoord>,
    },
    /// Reports that a reservation request was rejected.
    ReservationRejected {
        /// Agent that requested the reservation.
        agent: AgentId,
        /// Specific reason the reservation failed.
        reason: ReservationError,
    },
    /// Confirms that an agent moved between two cells.
    AgentStepped {
        /// Agent that advanced.
        agent: AgentId,
        /// Cell the agent occupied before moving.
        from: CellCoord,
        /// Cell the agent occupies after moving.
        to: CellCoord,
        /// Direction of travel.
        direction: Direction,
    },
    /// Reports that a step request was rejected.
    StepRejected {
        /// Agent that attempted to move.
        agent: AgentId,
        /// Direction requested by the step.
        direction: Direction,
        /// Specific reason the step failed.
        reason: StepError,
    },
    /// Indicates that the animation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
}

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in neighbor enumeration order.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Direction of travel between two orthogonally adjacent cells.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Self::East)
            } else {
                Some(Self::West)
            }
        } else if to.row() > from.row() {
            Some(Self::South)
        } else {
            Some(Self::North)
        }
    }

    /// Clockwise heading in degrees with north at zero.
    #[must_use]
    pub const fn heading_degrees(self) -> f32 {
        match self {
            Self::North => 0.0,
            Self::East => 90.0,
            Self::South => 180.0,
            Self::West => 270.0,
        }
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Straight-line distance between two cell centers, measured in cells.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let dx = self.column().abs_diff(other.column()) as f32;
        let dy = self.row().abs_diff(other.row()) as f32;
        dx.hypot(dy)
    }

    /// Neighboring coordinate in the given direction, if it is non-negative.
    ///
    /// Upper bounds are not checked; callers consult the [`GridLayout`].
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => Some(Self::new(self.column, self.row.checked_sub(1)?)),
            Direction::East => Some(Self::new(self.column.checked_add(1)?, self.row)),
            Direction::South => Some(Self::new(self.column, self.row.checked_add(1)?)),
            Direction::West => Some(Self::new(self.column.checked_sub(1)?, self.row)),
        }
    }
}

/// Reservation state of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Availability {
    /// Unreserved and unoccupied.
    #[default]
    Empty,
    /// Reserved as part of an agent's planned path but not yet occupied.
    Claimed,
    /// Destination or current cell of an agent.
    Occupied,
}

/// Dimensions and world placement of the cell grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    columns: u32,
    rows: u32,
    cell_length: f32,
    origin: Vec2,
}

impl GridLayout {
    /// Creates a new layout. `origin` is the world position of the corner of
    /// cell `(0, 0)`.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, cell_length: f32, origin: Vec2) -> Self {
        Self {
            columns,
            rows,
            cell_length,
            origin,
        }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells described by the layout.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(0)
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Row-major offset of the cell, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Inverse of [`GridLayout::index`].
    #[must_use]
    pub fn coord_of(&self, index: usize) -> Option<CellCoord> {
        if index >= self.cell_count() {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(CellCoord::new(column, row))
    }

    /// Quantizes a world position into the cell that contains it.
    ///
    /// Positions outside the grid, and every position when the cell length is
    /// not a positive finite number, resolve to `None`.
    #[must_use]
    pub fn cell_at(&self, position: Vec2) -> Option<CellCoord> {
        if !(self.cell_length.is_finite() && self.cell_length > 0.0) {
            return None;
        }

        let local = (position - self.origin) / self.cell_length;
        if !(local.x >= 0.0 && local.y >= 0.0) {
            return None;
        }
        if local.x >= self.columns as f32 || local.y >= self.rows as f32 {
            return None;
        }

        let cell = CellCoord::new(local.x.floor() as u32, local.y.floor() as u32);
        self.contains(cell).then_some(cell)
    }

    /// World position of the center of the provided cell.
    #[must_use]
    pub fn center_of(&self, cell: CellCoord) -> Vec2 {
        self.origin
            + Vec2::new(cell.column() as f32 + 0.5, cell.row() as f32 + 0.5) * self.cell_length
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(0, 0, 1.0, Vec2::ZERO)
    }
}

/// Mutable per-cell state captured by the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellState {
    /// Reservation state of the cell.
    pub availability: Availability,
    /// Whether a barrier makes the cell impassable.
    pub blocked: bool,
    /// Agent whose reservation last wrote the availability.
    pub owner: Option<AgentId>,
}

/// Precomputed cardinal adjacency of a single cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighbors {
    buffer: [CellCoord; 4],
    len: usize,
}

impl Neighbors {
    /// Appends a neighbor; pushes beyond four entries are ignored.
    pub fn push(&mut self, cell: CellCoord) {
        if self.len < self.buffer.len() {
            self.buffer[self.len] = cell;
            self.len += 1;
        }
    }

    /// Neighbors in North, East, South, West order.
    #[must_use]
    pub fn as_slice(&self) -> &[CellCoord] {
        &self.buffer[..self.len]
    }
}

/// Read-only view into the cell grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    layout: GridLayout,
    cells: &'a [CellState],
    neighbors: &'a [Neighbors],
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided cell slices.
    #[must_use]
    pub fn new(layout: GridLayout, cells: &'a [CellState], neighbors: &'a [Neighbors]) -> Self {
        Self {
            layout,
            cells,
            neighbors,
        }
    }

    /// Layout of the underlying grid.
    #[must_use]
    pub const fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Full state of a cell, if it lies inside the grid.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<CellState> {
        self.layout
            .index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Availability of a cell, if it lies inside the grid.
    #[must_use]
    pub fn availability(&self, cell: CellCoord) -> Option<Availability> {
        self.cell(cell).map(|state| state.availability)
    }

    /// Agent whose reservation touches the cell.
    #[must_use]
    pub fn owner(&self, cell: CellCoord) -> Option<AgentId> {
        self.cell(cell).and_then(|state| state.owner)
    }

    /// Reports whether the cell is impassable. Cells outside the grid are.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        self.cell(cell).map_or(true, |state| state.blocked)
    }

    /// Reports whether the cell is unreserved and passable.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.cell(cell)
            .map_or(false, |state| !state.blocked && state.availability == Availability::Empty)
    }

    /// Precomputed neighbors of the cell.
    #[must_use]
    pub fn neighbors(&self, cell: CellCoord) -> &'a [CellCoord] {
        let neighbors = self.neighbors;
        self.layout
            .index(cell)
            .and_then(|index| neighbors.get(index))
            .map(Neighbors::as_slice)
            .unwrap_or(&[])
    }

    /// Iterator over every cell in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, CellState)> + 'a {
        let layout = self.layout;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, state)| layout.coord_of(index).map(|cell| (cell, *state)))
    }
}

/// Turn-taking condition of an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentCondition {
    /// The agent takes its turns normally.
    Ready,
    /// The agent is harmonized and suspends turn-taking until released.
    Harmonized,
    /// The agent is stunned and skips turns until the given turn starts.
    Stunned {
        /// First turn on which the agent acts again.
        until_turn: u64,
    },
}

impl AgentCondition {
    /// Reports whether the agent may take a turn.
    #[must_use]
    pub const fn can_act(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Grid cell the agent currently stands on.
    pub cell: CellCoord,
    /// Direction the agent faces.
    pub facing: Direction,
    /// Turn-taking condition of the agent.
    pub condition: AgentCondition,
    /// Remaining reserved path, retained for trajectory rendering.
    pub planned_path: Vec<CellCoord>,
}

/// Read-only snapshot describing all agents on the grid.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of a single agent.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view contains no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Position history of the tracked entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedSnapshot {
    /// Latest reported position.
    pub current: Vec2,
    /// Position reported before the latest one.
    pub previous: Vec2,
}

impl TrackedSnapshot {
    /// Linear extrapolation of the next position: `2 × current − previous`.
    #[must_use]
    pub fn predicted(&self) -> Vec2 {
        self.current * 2.0 - self.previous
    }
}

/// Kind of entity found on a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridEntry {
    /// An agent stands on the cell.
    Agent(AgentId),
    /// The tracked entity stands on the cell.
    TrackedEntity,
    /// A wall or closed door blocks the cell.
    Barrier,
}

/// Reasons a barrier request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockError {
    /// The cell lies outside the grid.
    OutOfBounds,
    /// The cell is reserved or stood on, so the barrier cannot close.
    NotFree,
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnError {
    /// The cell lies outside the grid.
    OutOfBounds,
    /// The cell is blocked by a barrier.
    Blocked,
    /// The cell is occupied or another agent stands on it.
    Occupied,
}

/// Reasons a reservation request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservationError {
    /// No agent with the provided identifier exists.
    MissingAgent,
    /// Consecutive path cells are not orthogonally adjacent.
    Discontinuous,
    /// A path cell lies outside the grid or is blocked.
    Impassable,
}

/// Reasons a step request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepError {
    /// No agent with the provided identifier exists.
    MissingAgent,
    /// The agent cannot act this turn.
    Suspended,
    /// The direction does not lead to the head of the reserved path.
    OffPath,
    /// Another agent stands on the destination or it is blocked.
    Obstructed,
}
