use crate::{
    cube4::{Cube4, InvalidState},
    facelets::FaceletError,
    moves::{Algorithm, Move, MoveParseError},
    pruning::{TableError, UNREACHED},
    search::{SearchError, StageSearch},
    stages::{PHASES, StageKind, Stages},
    start, success,
    tables::Tables,
    working,
};
use log::{debug, info, warn};
use std::{
    fmt,
    time::{Duration, Instant},
};
use thiserror::Error;

pub const DEFAULT_MAX_LENGTH: usize = 80;

/// Extra depth a stage may use on its one retry.
const RELAXED_DEPTH: u8 = 2;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Invalid cube state: {0}")]
    InvalidState(#[from] InvalidState),
    #[error("Invalid facelets: {0}")]
    Facelets(#[from] FaceletError),
    #[error("Invalid move sequence: {0}")]
    Moves(#[from] MoveParseError),
    #[error("The {stage} stage failed: {source}")]
    PhaseSearchExhausted {
        stage: &'static str,
        source: SearchError,
    },
    #[error("The {stage} stage cannot finish within the {max_length} move limit")]
    GlobalBudgetExceeded {
        stage: &'static str,
        max_length: usize,
    },
    #[error("Failed to build the pruning tables: {0}")]
    TableBuildFailure(#[from] TableError),
}

/// A solving sequence, with how many moves each phase contributed before
/// the sequence was simplified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    moves: Algorithm,
    phase_lengths: [usize; 3],
}

impl Solution {
    #[must_use]
    pub fn moves(&self) -> &Algorithm {
        &self.moves
    }

    #[must_use]
    pub fn into_moves(self) -> Algorithm {
        self.moves
    }

    #[must_use]
    pub fn phase_lengths(&self) -> [usize; 3] {
        self.phase_lengths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.moves, f)
    }
}

/// Chains the stages of the three phases into a full solve.
#[derive(Clone, Copy, Debug)]
pub struct Solver {
    stages: &'static Stages,
    max_length: usize,
    time_limit: Option<Duration>,
}

impl Solver {
    /// A solver over the process-wide tables, building them in memory if
    /// they do not exist yet.
    ///
    /// # Errors
    ///
    /// Fails if the tables cannot be built.
    pub fn new() -> Result<Self, SolveError> {
        Ok(Solver::with_tables(Tables::get()?))
    }

    #[must_use]
    pub fn with_tables(stages: &'static Stages) -> Self {
        Solver {
            stages,
            max_length: DEFAULT_MAX_LENGTH,
            time_limit: None,
        }
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    #[must_use]
    pub fn with_time_limit(mut self, time_limit: Option<Duration>) -> Self {
        self.time_limit = time_limit;
        self
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Solve a cube, never returning more than the maximum length.
    ///
    /// # Errors
    ///
    /// `InvalidState` for a state that breaks a cube invariant,
    /// `GlobalBudgetExceeded` when the remaining budget is too small for a
    /// stage, and `PhaseSearchExhausted` when a stage fails even with its
    /// relaxed bound or runs out of time.
    pub fn solve(&self, cube: &Cube4) -> Result<Solution, SolveError> {
        cube.validate()?;
        info!(start!("Solving a 4x4x4 within {} moves"), self.max_length);
        let start = Instant::now();
        let deadline = self.time_limit.map(|limit| start + limit);

        let mut current = *cube;
        let mut path = Vec::new();
        let mut phase_lengths = [0; 3];
        for (phase_index, phase) in PHASES.iter().enumerate() {
            for &kind in phase.stages {
                let remaining = self.max_length.saturating_sub(path.len());
                let moves = self.run_stage(kind, &current, remaining, deadline)?;
                debug!(working!("The {} stage took {} moves"), kind.name(), moves.len());
                current = current.apply_all(moves.iter().copied());
                phase_lengths[phase_index] += moves.len();
                path.extend(moves);
            }
            debug!(
                working!("Finished the {} phase with {} moves"),
                phase.name, phase_lengths[phase_index]
            );
        }
        debug_assert!(current.is_solved());

        let moves = Algorithm::from(path).simplified();
        info!(
            success!("Solved in {} moves in {:.3}s"),
            moves.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(Solution {
            moves,
            phase_lengths,
        })
    }

    /// Solve the state a move sequence leaves a solved cube in.
    ///
    /// # Errors
    ///
    /// Fails on a bad move sequence or as `Solver::solve` does.
    pub fn solve_scramble(&self, scramble: &str) -> Result<Solution, SolveError> {
        let scramble = scramble.parse::<Algorithm>()?;
        self.solve(&Cube4::SOLVED.apply_all(scramble))
    }

    /// Solve the state described by a 96-letter facelet string.
    ///
    /// # Errors
    ///
    /// Fails on bad facelets or as `Solver::solve` does.
    pub fn solve_facelets(&self, facelets: &str) -> Result<Solution, SolveError> {
        self.solve(&Cube4::from_facelets(facelets)?)
    }

    /// Run one stage at its usual bound, then once more at a relaxed bound,
    /// never past the remaining budget.
    fn run_stage(
        &self,
        kind: StageKind,
        cube: &Cube4,
        remaining: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<Move>, SolveError> {
        let remaining = u8::try_from(remaining).unwrap_or(u8::MAX);
        let bounds = [kind.max_depth(), kind.max_depth() + RELAXED_DEPTH];
        for (attempt, bound) in bounds.into_iter().enumerate() {
            let limit = bound.min(remaining);
            match self.search_stage(kind, cube, limit, deadline) {
                Ok(moves) => return Ok(moves),
                Err(SearchError::MaxDepthExceeded { .. }) if limit < bound => {
                    return Err(SolveError::GlobalBudgetExceeded {
                        stage: kind.name(),
                        max_length: self.max_length,
                    });
                }
                Err(SearchError::MaxDepthExceeded { .. }) if attempt == 0 => {
                    warn!(
                        "The {} stage found nothing within {} moves; retrying with {}",
                        kind.name(),
                        bound,
                        bounds[1]
                    );
                }
                Err(source) => {
                    return Err(SolveError::PhaseSearchExhausted {
                        stage: kind.name(),
                        source,
                    });
                }
            }
        }
        Err(SolveError::PhaseSearchExhausted {
            stage: kind.name(),
            source: SearchError::MaxDepthExceeded {
                stage: kind.name(),
                max_depth: bounds[1],
            },
        })
    }

    fn search_stage(
        &self,
        kind: StageKind,
        cube: &Cube4,
        max_depth: u8,
        deadline: Option<Instant>,
    ) -> Result<Vec<Move>, SearchError> {
        let stages = self.stages;
        // A stage may only stop where the next stage can carry on
        let accept = |path: &[Move]| match kind.next() {
            Some(next) => stages.heuristic(next, &cube.apply_all(path.iter().copied())) != UNREACHED,
            None => true,
        };
        macro_rules! search {
            ($stage:expr, $node:expr) => {
                StageSearch::new(&$stage)
                    .with_max_depth(max_depth)
                    .with_deadline(deadline)
                    .solve($node, accept)
            };
        }
        match kind {
            StageKind::RlCenters => search!(stages.rl_centers, stages.rl_centers.node(cube)),
            StageKind::FbCenters => search!(stages.fb_centers, stages.fb_centers.node(cube)),
            StageKind::WingOrientation => {
                search!(stages.wing_orientation, stages.wing_orientation.node(cube))
            }
            StageKind::WingSlice => {
                let node = stages
                    .wing_slice
                    .node(cube)
                    .ok_or(SearchError::SolutionDoesNotExist(kind.name()))?;
                search!(stages.wing_slice, node)
            }
            StageKind::Pairing => {
                let node = stages
                    .pairing
                    .node(cube)
                    .ok_or(SearchError::SolutionDoesNotExist(kind.name()))?;
                search!(stages.pairing, node)
            }
            StageKind::Orient | StageKind::Permute => {
                let reduced = cube
                    .reduced()
                    .map_err(|_| SearchError::SolutionDoesNotExist(kind.name()))?;
                if kind == StageKind::Orient {
                    search!(stages.orient, stages.orient.node(&reduced))
                } else {
                    search!(stages.permute, stages.permute.node(&reduced))
                }
            }
        }
    }
}
