use crate::{
    canonical_fsm::{CanonicalFSM, CanonicalFSMState},
    moves::Move,
    pruning::UNREACHED,
    stages::StageKind,
    start, success, working,
};
use log::{Level, debug, info, log_enabled};
use std::time::Instant;
use thiserror::Error;

/// How often, in nodes, the search looks at the clock.
const DEADLINE_CHECK_INTERVAL: u64 = 1 << 16;

/// A search space: a coordinate node, its transitions under the stage's
/// moves, and an admissible lower bound on the distance to the goal.
pub trait Stage {
    type Node: Copy;

    fn kind(&self) -> StageKind;

    fn fsm(&self) -> &CanonicalFSM;

    fn next(&self, node: Self::Node, move_index: usize) -> Self::Node;

    /// Zero exactly at the goal, `UNREACHED` where the goal cannot be
    /// reached with the stage's moves.
    fn heuristic(&self, node: Self::Node) -> u8;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SearchError {
    #[error("The {0} stage cannot reach its goal from this state")]
    SolutionDoesNotExist(&'static str),
    #[error("The {stage} stage found no solution within {max_depth} moves")]
    MaxDepthExceeded { stage: &'static str, max_depth: u8 },
    #[error("Time limit exceeded")]
    TimeLimitExceeded,
}

/// Iterative deepening A* over one stage.
pub struct StageSearch<'a, S: Stage> {
    stage: &'a S,
    max_depth: u8,
    deadline: Option<Instant>,
}

/// One level of the move history: the node reached, its automaton state,
/// and the next move to try from it.
#[derive(Clone, Copy)]
struct Frame<N> {
    node: N,
    fsm_state: CanonicalFSMState,
    next_move: usize,
}

struct StageSearchMutable<N> {
    stack: Vec<Frame<N>>,
    path: Vec<usize>,
    nodes_visited: u64,
}

struct TimedOut;

impl<'a, S: Stage> StageSearch<'a, S> {
    pub fn new(stage: &'a S) -> Self {
        StageSearch {
            stage,
            max_depth: stage.kind().max_depth(),
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn past_deadline(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Find the shortest path to the goal accepted by `accept`. Paths are
    /// tried in order of length and, within a length, in move order, so the
    /// result is deterministic.
    ///
    /// # Errors
    ///
    /// `SolutionDoesNotExist` if the start is unreachable, `MaxDepthExceeded`
    /// if no accepted path is at most `max_depth` long, and
    /// `TimeLimitExceeded` once the deadline passes.
    pub fn solve(
        &self,
        start: S::Node,
        mut accept: impl FnMut(&[Move]) -> bool,
    ) -> Result<Vec<Move>, SearchError> {
        let name = self.stage.kind().name();
        info!(start!("Searching for {} solutions"), name);
        let start_time = Instant::now();

        let heuristic = self.stage.heuristic(start);
        if heuristic == UNREACHED {
            return Err(SearchError::SolutionDoesNotExist(name));
        }

        let mut mutable = StageSearchMutable {
            stack: Vec::with_capacity(self.max_depth as usize + 1),
            path: Vec::with_capacity(self.max_depth as usize),
            nodes_visited: 0,
        };

        for bound in heuristic..=self.max_depth {
            if self.past_deadline() {
                return Err(SearchError::TimeLimitExceeded);
            }
            debug!(working!("Searching depth {}..."), bound);
            let depth_start = Instant::now();
            let found = self
                .search_bound(&mut mutable, start, bound, &mut accept)
                .map_err(|TimedOut| SearchError::TimeLimitExceeded)?;
            if log_enabled!(Level::Debug) {
                debug!(
                    working!("Traversed {} nodes in {:.3}s"),
                    mutable.nodes_visited,
                    depth_start.elapsed().as_secs_f64()
                );
            }
            if let Some(moves) = found {
                info!(
                    success!("The {} stage was solved in {:.3}s at depth {}"),
                    name,
                    start_time.elapsed().as_secs_f64(),
                    moves.len()
                );
                return Ok(moves);
            }
        }

        Err(SearchError::MaxDepthExceeded {
            stage: name,
            max_depth: self.max_depth,
        })
    }

    /// Depth-first search of every canonical path of exactly `bound` moves
    /// from `start`, pruned by the heuristic, over an explicit move history.
    fn search_bound(
        &self,
        mutable: &mut StageSearchMutable<S::Node>,
        start: S::Node,
        bound: u8,
        accept: &mut impl FnMut(&[Move]) -> bool,
    ) -> Result<Option<Vec<Move>>, TimedOut> {
        let moves = self.stage.kind().moves();
        let to_moves = |path: &[usize]| path.iter().map(|&i| moves[i]).collect::<Vec<_>>();

        if bound == 0 {
            return Ok(accept(&[]).then(Vec::new));
        }

        mutable.path.clear();
        mutable.stack.clear();
        mutable.stack.push(Frame {
            node: start,
            fsm_state: CanonicalFSMState::default(),
            next_move: 0,
        });

        while let Some(frame) = mutable.stack.last_mut() {
            if frame.next_move == moves.len() {
                mutable.stack.pop();
                mutable.path.pop();
                continue;
            }
            let move_index = frame.next_move;
            frame.next_move += 1;
            let Some(fsm_state) = self.stage.fsm().next_state(frame.fsm_state, move_index)
            else {
                continue;
            };
            let node = self.stage.next(frame.node, move_index);
            // The stack holds the root too, so its length is the child's depth
            let depth = mutable.stack.len() as u8;

            mutable.nodes_visited += 1;
            if mutable.nodes_visited % DEADLINE_CHECK_INTERVAL == 0 && self.past_deadline() {
                return Err(TimedOut);
            }

            let heuristic = self.stage.heuristic(node);
            if heuristic == UNREACHED || depth + heuristic > bound {
                continue;
            }
            mutable.path.push(move_index);
            if depth == bound {
                let candidate = to_moves(&mutable.path);
                if accept(&candidate) {
                    return Ok(Some(candidate));
                }
                mutable.path.pop();
                continue;
            }
            mutable.stack.push(Frame {
                node,
                fsm_state,
                next_move: 0,
            });
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coord::{Coordinate, MoveTable},
        cube3::{Cube3, SlicePermCoord},
        moves::Algorithm,
        pruning::PruningTable,
        stages::PERMUTE_MOVES,
    };

    /// The permutation of the E-slice edges alone, searched with the
    /// permute stage's moves.
    struct SliceStage {
        fsm: CanonicalFSM,
        moves: MoveTable,
        table: PruningTable,
    }

    impl SliceStage {
        fn new() -> Self {
            let moves =
                MoveTable::generate::<_, SlicePermCoord>(Cube3::SOLVED, &PERMUTE_MOVES, Cube3::apply);
            let table = PruningTable::generate(
                "slice permutation",
                24,
                [0u16],
                moves.num_moves(),
                u32::from,
                |coord, i| moves.apply(coord, i),
                24,
            )
            .unwrap();
            SliceStage {
                fsm: CanonicalFSM::new(&PERMUTE_MOVES),
                moves,
                table,
            }
        }
    }

    impl Stage for SliceStage {
        type Node = u16;

        fn kind(&self) -> StageKind {
            StageKind::Permute
        }

        fn fsm(&self) -> &CanonicalFSM {
            &self.fsm
        }

        fn next(&self, node: u16, move_index: usize) -> u16 {
            self.moves.apply(node, move_index)
        }

        fn heuristic(&self, node: u16) -> u8 {
            self.table.get(u32::from(node))
        }
    }

    fn slice_coord(alg: &str) -> u16 {
        let alg = alg.parse::<Algorithm>().unwrap();
        SlicePermCoord::from_puzzle(&Cube3::SOLVED.apply_all(alg.iter())).0
    }

    #[test_log::test]
    fn test_solved_start_needs_no_moves() {
        let stage = SliceStage::new();
        let moves = StageSearch::new(&stage).solve(0, |_| true).unwrap();
        assert!(moves.is_empty());
    }

    #[test_log::test]
    fn test_finds_optimal_solutions() {
        let stage = SliceStage::new();
        let start = slice_coord("R2 F2");
        let moves = StageSearch::new(&stage).solve(start, |_| true).unwrap();
        assert_eq!(moves.len(), stage.heuristic(start) as usize);
        let end = moves
            .iter()
            .fold(start, |coord, mv| {
                let i = PERMUTE_MOVES.iter().position(|m| m == mv).unwrap();
                stage.next(coord, i)
            });
        assert_eq!(end, 0);
    }

    #[test_log::test]
    fn test_rejected_solutions_search_deeper() {
        let stage = SliceStage::new();
        let start = slice_coord("R2 F2");
        let shortest = StageSearch::new(&stage).solve(start, |_| true).unwrap();
        let longer = StageSearch::new(&stage)
            .solve(start, |moves| moves.len() > shortest.len())
            .unwrap();
        assert!(longer.len() > shortest.len());
    }

    #[test_log::test]
    fn test_max_depth() {
        let stage = SliceStage::new();
        let start = slice_coord("R2 F2");
        let result = StageSearch::new(&stage)
            .with_max_depth(1)
            .solve(start, |_| true);
        assert_eq!(
            result,
            Err(SearchError::MaxDepthExceeded {
                stage: "permute",
                max_depth: 1
            })
        );
    }

    #[test_log::test]
    fn test_deadline_in_the_past() {
        let stage = SliceStage::new();
        let result = StageSearch::new(&stage)
            .with_deadline(Some(Instant::now()))
            .solve(slice_coord("R2 F2"), |_| true);
        assert_eq!(result, Err(SearchError::TimeLimitExceeded));
    }
}
