use crate::{start, success, working};
use log::{debug, info, trace};
use std::time::Instant;
use thiserror::Error;

/// Stored for coordinates the generator never reached.
pub const UNREACHED: u8 = 0xF;

/// Distances beyond this are stored as this. Still a lower bound.
const MAX_STORED_DEPTH: u8 = UNREACHED - 1;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("The {table} table reached {reached} coordinates but {expected} were expected")]
    UnexpectedSize {
        table: &'static str,
        reached: usize,
        expected: usize,
    },
    #[error("The wing orbits of the edge subgroups do not have the expected shape")]
    WingOrbits,
}

/// Lower bounds on the distance to a goal set, packed two per byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PruningTable {
    name: &'static str,
    data: Vec<u8>,
    len: usize,
}

impl PruningTable {
    /// Breadth-first search from `goals`. `index` maps a search state to its
    /// coordinate in `0..len` and `step(state, i)` applies the `i`th of
    /// `num_moves` moves. The move set must be closed under inverses for the
    /// forward search to give distances to the goal.
    ///
    /// # Errors
    ///
    /// Fails when the number of coordinates reached is not `expected`. That
    /// means a coordinate or move table is wrong, and searching with the
    /// table would give wrong answers.
    pub fn generate<T: Copy>(
        name: &'static str,
        len: usize,
        goals: impl IntoIterator<Item = T>,
        num_moves: usize,
        index: impl Fn(T) -> u32,
        step: impl Fn(T, usize) -> T,
        expected: usize,
    ) -> Result<Self, TableError> {
        info!(start!("Generating the {} pruning table"), name);
        let start = Instant::now();

        let mut table = PruningTable {
            name,
            data: vec![0xFF; len.div_ceil(2)],
            len,
        };
        let mut frontier = vec![];
        for goal in goals {
            let coord = index(goal);
            if table.get(coord) == UNREACHED {
                table.set(coord, 0);
                frontier.push(goal);
            }
        }

        let mut reached = frontier.len();
        let mut depth: u8 = 0;
        while !frontier.is_empty() {
            trace!(working!("Depth {} has {} coordinates"), depth, frontier.len());
            let stored = depth.saturating_add(1).min(MAX_STORED_DEPTH);
            let mut next_frontier = vec![];
            for &state in &frontier {
                for move_index in 0..num_moves {
                    let next = step(state, move_index);
                    let coord = index(next);
                    if table.get(coord) == UNREACHED {
                        table.set(coord, stored);
                        next_frontier.push(next);
                    }
                }
            }
            reached += next_frontier.len();
            frontier = next_frontier;
            depth = depth.saturating_add(1);
        }

        debug!(
            working!("Reached {} of {} coordinates, deepest at {}"),
            reached,
            len,
            depth.saturating_sub(1)
        );
        if reached != expected {
            return Err(TableError::UnexpectedSize {
                table: name,
                reached,
                expected,
            });
        }
        info!(
            success!("Generated the {} pruning table in {:.3}s"),
            name,
            start.elapsed().as_secs_f64()
        );
        Ok(table)
    }

    pub(crate) fn from_bytes(name: &'static str, len: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == len.div_ceil(2)).then_some(PruningTable { name, data, len })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The stored lower bound, or `UNREACHED`.
    #[must_use]
    pub fn get(&self, coord: u32) -> u8 {
        let coord = coord as usize;
        (self.data[coord / 2] >> (4 * (coord % 2))) & 0xF
    }

    fn set(&mut self, coord: u32, value: u8) {
        let coord = coord as usize;
        let shift = 4 * (coord % 2);
        let byte = &mut self.data[coord / 2];
        *byte = (*byte & !(0xF << shift)) | (value << shift);
    }

    /// Number of coordinates at each distance, unreached ones excluded.
    #[must_use]
    pub fn histogram(&self) -> Vec<usize> {
        let mut histogram = vec![];
        for coord in 0..self.len as u32 {
            let value = self.get(coord);
            if value == UNREACHED {
                continue;
            }
            if histogram.len() <= value as usize {
                histogram.resize(value as usize + 1, 0);
            }
            histogram[value as usize] += 1;
        }
        histogram
    }

    #[must_use]
    pub fn reached(&self) -> usize {
        self.histogram().iter().sum()
    }
}
