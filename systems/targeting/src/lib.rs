#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Derives the cells an agent may chase from the tracked entity's motion.

use pursuit_core::{CellCoord, GridLayout, TrackedSnapshot};

/// Origin of a candidate target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Linear extrapolation one move ahead.
    Predicted,
    /// Where the tracked entity stands now.
    Current,
    /// Where the tracked entity stood before its latest move.
    Previous,
}

impl TargetKind {
    /// Candidate kinds in evaluation order.
    pub const PRIORITY: [TargetKind; 3] = [Self::Predicted, Self::Current, Self::Previous];
}

/// Candidate cells in [`TargetKind::PRIORITY`] order.
///
/// Positions that fall outside the grid leave their slot empty.
#[must_use]
pub fn candidate_targets(layout: &GridLayout, tracked: &TrackedSnapshot) -> [Option<CellCoord>; 3] {
    TargetKind::PRIORITY.map(|kind| {
        let position = match kind {
            TargetKind::Predicted => tracked.predicted(),
            TargetKind::Current => tracked.current,
            TargetKind::Previous => tracked.previous,
        };
        layout.cell_at(position)
    })
}

/// Cell the tracked entity currently stands on.
#[must_use]
pub fn tracked_cell(layout: &GridLayout, tracked: &TrackedSnapshot) -> Option<CellCoord> {
    layout.cell_at(tracked.current)
}
