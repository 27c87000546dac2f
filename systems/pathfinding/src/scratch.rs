//! Per-search bookkeeping reused across planner invocations.

/// Generation-stamped node table.
///
/// Entries whose stamp differs from the current generation read as
/// unvisited, so starting a search never walks the whole table.
#[derive(Debug, Default)]
pub(crate) struct SearchScratch {
    generation: u32,
    stamps: Vec<u32>,
    cost_so_far: Vec<f32>,
    came_from: Vec<Option<usize>>,
    closed: Vec<bool>,
}

impl SearchScratch {
    /// Starts a new search over `node_count` nodes.
    pub(crate) fn begin(&mut self, node_count: usize) {
        if self.stamps.len() < node_count {
            self.stamps.resize(node_count, 0);
            self.cost_so_far.resize(node_count, f32::INFINITY);
            self.came_from.resize(node_count, None);
            self.closed.resize(node_count, false);
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        }
    }

    fn touch(&mut self, index: usize) -> bool {
        let Some(stamp) = self.stamps.get_mut(index) else {
            return false;
        };
        if *stamp != self.generation {
            *stamp = self.generation;
            self.cost_so_far[index] = f32::INFINITY;
            self.came_from[index] = None;
            self.closed[index] = false;
        }
        true
    }

    fn is_fresh(&self, index: usize) -> bool {
        self.stamps.get(index) == Some(&self.generation)
    }

    /// Best known cost from the start, infinite when unvisited.
    pub(crate) fn cost(&self, index: usize) -> f32 {
        if self.is_fresh(index) {
            self.cost_so_far[index]
        } else {
            f32::INFINITY
        }
    }

    /// Predecessor recorded for the node.
    pub(crate) fn came_from(&self, index: usize) -> Option<usize> {
        if self.is_fresh(index) {
            self.came_from[index]
        } else {
            None
        }
    }

    pub(crate) fn is_closed(&self, index: usize) -> bool {
        self.is_fresh(index) && self.closed[index]
    }

    pub(crate) fn close(&mut self, index: usize) {
        if self.touch(index) {
            self.closed[index] = true;
        }
    }

    /// Records a cheaper route into `index`.
    pub(crate) fn relax(&mut self, index: usize, cost: f32, parent: Option<usize>) {
        if self.touch(index) {
            self.cost_so_far[index] = cost;
            self.came_from[index] = parent;
        }
    }
}
