//! Level files: TOML configuration parsed into a validated [`Level`].

use std::{fs, path::Path, time::Duration};

use glam::Vec2;
use pursuit_core::{BlockError, CellCoord, Direction, GridLayout, SpawnError};
use pursuit_system_motion::MotionConfig;
use pursuit_system_movement::MovementConfig;
use pursuit_system_pathfinding::PlannerConfig;
use serde::Deserialize;
use thiserror::Error;

const WALL: char = '#';
const FLOOR: char = '.';
const ENEMY: char = 'E';
const PLAYER: char = 'P';

/// Errors raised while loading or instantiating a level.
#[derive(Debug, Error)]
pub enum LevelError {
    /// The level file could not be read.
    #[error("failed to read level file {path}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The level file is not valid TOML or does not match the schema.
    #[error("failed to parse level toml contents")]
    Parse(#[from] toml::de::Error),
    /// Neither explicit dimensions nor an ASCII layout were provided.
    #[error("grid dimensions missing; provide columns and rows or a layout")]
    MissingDimensions,
    /// The grid contains no cells.
    #[error("grid must contain at least one cell")]
    EmptyGrid,
    /// The cell length is not a positive finite number.
    #[error("cell length {0} must be positive and finite")]
    InvalidCellLength(f32),
    /// A layout row differs in width from the first row.
    #[error("layout row {row} has {found} cells; expected {expected}")]
    RaggedLayout {
        /// Zero-based layout row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// The layout contains an unsupported character.
    #[error("unknown layout glyph {glyph:?} at column {column}, row {row}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based column.
        column: u32,
        /// Zero-based row.
        row: u32,
    },
    /// Explicit dimensions disagree with the layout.
    #[error("grid declared as {declared:?} but layout is {layout:?}")]
    DimensionMismatch {
        /// Columns and rows declared in `[grid]`.
        declared: (u32, u32),
        /// Columns and rows found in the layout.
        layout: (u32, u32),
    },
    /// More than one player start was provided.
    #[error("level declares more than one player start")]
    MultiplePlayers,
    /// A configured cell lies outside the grid.
    #[error("cell ({column}, {row}) lies outside the grid")]
    CellOutOfBounds {
        /// Zero-based column.
        column: u32,
        /// Zero-based row.
        row: u32,
    },
    /// The world refused to place an agent.
    #[error("agent at {cell:?} rejected: {reason:?}")]
    SpawnRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason reported by the world.
        reason: SpawnError,
    },
    /// The world refused to raise a wall.
    #[error("wall at {cell:?} rejected: {reason:?}")]
    WallRejected {
        /// Requested cell.
        cell: CellCoord,
        /// Reason reported by the world.
        reason: BlockError,
    },
}

/// Agent placement in a validated level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentPlacement {
    /// Cell the agent spawns on.
    pub cell: CellCoord,
    /// Initial facing.
    pub facing: Direction,
}

/// Validated level ready to seed a session.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// Grid dimensions and placement.
    pub layout: GridLayout,
    /// Cells blocked by walls.
    pub walls: Vec<CellCoord>,
    /// Agents in spawn order.
    pub agents: Vec<AgentPlacement>,
    /// Cell the player starts on.
    pub player_start: Option<CellCoord>,
    /// Player cell for each turn after the start.
    pub script: Vec<CellCoord>,
    /// Coordinator tunables.
    pub movement: MovementConfig,
    /// Animation tunables.
    pub motion: MotionConfig,
}

impl Level {
    /// Reads and validates a level file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates level contents.
    pub fn from_toml_str(contents: &str) -> Result<Self, LevelError> {
        let config: LevelConfig = toml::from_str(contents)?;
        config.validate()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelConfig {
    grid: GridSection,
    #[serde(default)]
    agents: Vec<AgentSection>,
    #[serde(default)]
    tracking: TrackingSection,
    #[serde(default)]
    planner: PlannerSection,
    #[serde(default)]
    motion: MotionSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GridSection {
    columns: Option<u32>,
    rows: Option<u32>,
    #[serde(default = "default_cell_length")]
    cell_length: f32,
    #[serde(default)]
    origin: [f32; 2],
    layout: Option<String>,
    #[serde(default)]
    walls: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentSection {
    cell: [u32; 2],
    #[serde(default = "default_facing")]
    facing: Direction,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrackingSection {
    start: Option<[u32; 2]>,
    #[serde(default)]
    script: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PlannerSection {
    claimed_cost: f32,
    reconstruction_cap: usize,
    prioritized_bonus: usize,
}

impl Default for PlannerSection {
    fn default() -> Self {
        let movement = MovementConfig::default();
        Self {
            claimed_cost: movement.planner.claimed_cost,
            reconstruction_cap: movement.planner.reconstruction_cap,
            prioritized_bonus: movement.prioritized_bonus,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MotionSection {
    rotation_ms: u64,
    translation_ms: u64,
}

impl Default for MotionSection {
    fn default() -> Self {
        let motion = MotionConfig::default();
        Self {
            rotation_ms: u64::try_from(motion.rotation_duration.as_millis()).unwrap_or(u64::MAX),
            translation_ms: u64::try_from(motion.translation_duration.as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

fn default_cell_length() -> f32 {
    1.0
}

fn default_facing() -> Direction {
    Direction::North
}

#[derive(Debug, Default)]
struct ParsedLayout {
    columns: u32,
    rows: u32,
    walls: Vec<CellCoord>,
    agents: Vec<CellCoord>,
    player: Option<CellCoord>,
}

fn parse_layout(text: &str) -> Result<ParsedLayout, LevelError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut parsed = ParsedLayout::default();
    for (row, line) in (0u32..).zip(&lines) {
        let mut width = 0u32;
        for (column, glyph) in (0u32..).zip(line.chars()) {
            width = column + 1;
            let cell = CellCoord::new(column, row);
            match glyph {
                WALL => parsed.walls.push(cell),
                FLOOR => {}
                ENEMY => parsed.agents.push(cell),
                PLAYER => {
                    if parsed.player.replace(cell).is_some() {
                        return Err(LevelError::MultiplePlayers);
                    }
                }
                other => {
                    return Err(LevelError::UnknownGlyph {
                        glyph: other,
                        column,
                        row,
                    })
                }
            }
        }

        if row == 0 {
            parsed.columns = width;
        } else if width != parsed.columns {
            return Err(LevelError::RaggedLayout {
                row,
                expected: parsed.columns,
                found: width,
            });
        }
        parsed.rows = row + 1;
    }
    Ok(parsed)
}

impl LevelConfig {
    fn validate(self) -> Result<Level, LevelError> {
        let grid = self.grid;
        if !(grid.cell_length.is_finite() && grid.cell_length > 0.0) {
            return Err(LevelError::InvalidCellLength(grid.cell_length));
        }

        let parsed = grid.layout.as_deref().map(parse_layout).transpose()?;
        let (columns, rows) = match (&parsed, grid.columns, grid.rows) {
            (Some(parsed), None, None) => (parsed.columns, parsed.rows),
            (Some(parsed), columns, rows) => {
                let declared = (
                    columns.unwrap_or(parsed.columns),
                    rows.unwrap_or(parsed.rows),
                );
                if declared != (parsed.columns, parsed.rows) {
                    return Err(LevelError::DimensionMismatch {
                        declared,
                        layout: (parsed.columns, parsed.rows),
                    });
                }
                declared
            }
            (None, Some(columns), Some(rows)) => (columns, rows),
            (None, _, _) => return Err(LevelError::MissingDimensions),
        };
        if columns == 0 || rows == 0 {
            return Err(LevelError::EmptyGrid);
        }

        let layout = GridLayout::new(
            columns,
            rows,
            grid.cell_length,
            Vec2::from_array(grid.origin),
        );
        let ParsedLayout {
            mut walls,
            agents: layout_agents,
            player: layout_player,
            ..
        } = parsed.unwrap_or_default();

        for wall in grid.walls {
            walls.push(inside(&layout, wall)?);
        }

        let mut agents: Vec<AgentPlacement> = layout_agents
            .into_iter()
            .map(|cell| AgentPlacement {
                cell,
                facing: default_facing(),
            })
            .collect();
        for agent in self.agents {
            agents.push(AgentPlacement {
                cell: inside(&layout, agent.cell)?,
                facing: agent.facing,
            });
        }

        let configured_start = self
            .tracking
            .start
            .map(|cell| inside(&layout, cell))
            .transpose()?;
        let player_start = match (layout_player, configured_start) {
            (Some(_), Some(_)) => return Err(LevelError::MultiplePlayers),
            (from_layout, from_config) => from_layout.or(from_config),
        };

        let script = self
            .tracking
            .script
            .into_iter()
            .map(|cell| inside(&layout, cell))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Level {
            layout,
            walls,
            agents,
            player_start,
            script,
            movement: MovementConfig {
                planner: PlannerConfig {
                    claimed_cost: self.planner.claimed_cost,
                    reconstruction_cap: self.planner.reconstruction_cap,
                },
                prioritized_bonus: self.planner.prioritized_bonus,
            },
            motion: MotionConfig {
                rotation_duration: Duration::from_millis(self.motion.rotation_ms),
                translation_duration: Duration::from_millis(self.motion.translation_ms),
            },
        })
    }
}

fn inside(layout: &GridLayout, [column, row]: [u32; 2]) -> Result<CellCoord, LevelError> {
    let cell = CellCoord::new(column, row);
    if layout.contains(cell) {
        Ok(cell)
    } else {
        Err(LevelError::CellOutOfBounds { column, row })
    }
}
