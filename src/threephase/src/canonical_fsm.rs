//! Canonical sequence automaton, derived primarily from Lucas Garron's
//! implementation in twsearch with permission:
//! https://github.com/cubing/twsearch/blob/main/src/rs/_internal/canonical_fsm/canonical_fsm.rs
//!
//! A move class is a (face, layer) pair. The automaton rejects a class right
//! after itself and orders classes that commute, so `U D` is searched but
//! `D U` is not.

use crate::moves::Move;
use std::collections::HashMap;

const MAX_NUM_MOVE_CLASSES: usize = u64::BITS as usize;

// Bit N is indexed by a move class index of N.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
struct MoveClassMask(u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanonicalFSMState(usize);

struct MaskToState(HashMap<MoveClassMask, CanonicalFSMState>);

struct StateToMask(Vec<MoveClassMask>);

#[derive(Debug)]
pub struct CanonicalFSM {
    next_state_lookup: Vec<Vec<CanonicalFSMState>>,
    move_class_indices: Vec<usize>,
}

impl CanonicalFSM {
    /// Build the automaton over the classes of `moves`. Classes are numbered
    /// in order of first appearance, which fixes the order commuting moves
    /// are searched in.
    ///
    /// # Panics
    ///
    /// Panics if `moves` spans more than 64 move classes. There are only 18.
    #[must_use]
    pub fn new(moves: &[Move]) -> Self {
        let mut classes: Vec<Move> = vec![];
        let mut move_class_indices = Vec::with_capacity(moves.len());
        for &mv in moves {
            let found = classes.iter().position(|class| class.class() == mv.class());
            let index = if let Some(index) = found {
                index
            } else {
                classes.push(mv);
                classes.len() - 1
            };
            move_class_indices.push(index);
        }
        let num_move_classes = classes.len();
        assert!(num_move_classes <= MAX_NUM_MOVE_CLASSES);

        let all = if num_move_classes == MAX_NUM_MOVE_CLASSES {
            u64::MAX
        } else {
            (1 << num_move_classes) - 1
        };
        let mut commutes = vec![MoveClassMask(all); num_move_classes];
        for (i, class_1) in classes.iter().enumerate() {
            for (j, class_2) in classes.iter().enumerate() {
                if !class_1.commutes_with(*class_2) {
                    commutes[i].0 &= !(1 << j);
                    commutes[j].0 &= !(1 << i);
                }
            }
        }

        let mut next_state_lookup = vec![];

        let mut mask_to_state = MaskToState(HashMap::new());
        mask_to_state
            .0
            .insert(MoveClassMask(0), CanonicalFSMState(0));
        // Indexed by state ordinal, holds the set of move classes in the
        // sequence so far not followed by a move that fails to commute with
        // them
        let mut state_to_mask = StateToMask(vec![MoveClassMask(0)]);

        let mut queue_index = 0;
        while queue_index < state_to_mask.0.len() {
            // illegal state
            let mut next_state = vec![CanonicalFSMState(!0); num_move_classes];

            let dequeue_move_class_mask = state_to_mask.0[queue_index];
            queue_index += 1;

            for move_class_index in 0..num_move_classes {
                // If a greater class in the state commutes with this one, or
                // this class itself is in the state, it cannot be played
                let skip = (dequeue_move_class_mask.0 & commutes[move_class_index].0)
                    >> (move_class_index + 1)
                    != 0
                    || (dequeue_move_class_mask.0 >> move_class_index) & 1 != 0;
                if skip {
                    continue;
                }

                let mut next_state_bits = (dequeue_move_class_mask.0
                    & commutes[move_class_index].0)
                    | (1 << move_class_index);

                // If a pair of bits are set with the same commuting moves, we
                // can clear out the lower ones
                for i in 0..num_move_classes {
                    if (next_state_bits >> i) & 1 != 0 {
                        for j in (i + 1)..num_move_classes {
                            if ((next_state_bits >> j) & 1) != 0 && commutes[i] == commutes[j] {
                                next_state_bits &= !(1 << i);
                            }
                        }
                    }
                }

                let next_move_mask_class = MoveClassMask(next_state_bits);
                next_state[move_class_index] = match mask_to_state.0.get(&next_move_mask_class) {
                    Some(&state) => state,
                    None => {
                        let next_state = CanonicalFSMState(state_to_mask.0.len());
                        mask_to_state.0.insert(next_move_mask_class, next_state);
                        state_to_mask.0.push(next_move_mask_class);
                        next_state
                    }
                };
            }
            next_state_lookup.push(next_state);
        }

        Self {
            next_state_lookup,
            move_class_indices,
        }
    }

    /// The state reached by playing the move at `move_index` of the move list
    /// this automaton was built from, or `None` if that move would make the
    /// sequence non-canonical.
    #[must_use]
    pub fn next_state(
        &self,
        current_fsm_state: CanonicalFSMState,
        move_index: usize,
    ) -> Option<CanonicalFSMState> {
        let move_class_index = self.move_class_indices[move_index];
        match self.next_state_lookup[current_fsm_state.0][move_class_index] {
            CanonicalFSMState(illegal_state) if illegal_state == !0 => None,
            state => Some(state),
        }
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.next_state_lookup.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::{OUTER_MOVES, SEARCH_MOVES};

    #[test]
    fn test_canonical_fsm_initially_all_legal() {
        let canonical_fsm = CanonicalFSM::new(&SEARCH_MOVES);
        for move_index in 0..SEARCH_MOVES.len() {
            assert!(
                canonical_fsm
                    .next_state(CanonicalFSMState::default(), move_index)
                    .is_some()
            );
        }
    }

    #[test]
    fn test_canonical_fsm_prevents_self() {
        let canonical_fsm = CanonicalFSM::new(&SEARCH_MOVES);
        for move_index in 0..SEARCH_MOVES.len() {
            let state = canonical_fsm
                .next_state(CanonicalFSMState::default(), move_index)
                .unwrap();
            // Every power of the same class is rejected
            let class = SEARCH_MOVES[move_index].class();
            for (other_index, other) in SEARCH_MOVES.iter().enumerate() {
                if other.class() == class {
                    assert!(canonical_fsm.next_state(state, other_index).is_none());
                }
            }
        }
    }

    #[test]
    fn test_canonical_fsm_orders_commuting_classes() {
        let canonical_fsm = CanonicalFSM::new(&SEARCH_MOVES);
        for (index_1, move_1) in SEARCH_MOVES.iter().enumerate() {
            for (index_2, move_2) in SEARCH_MOVES.iter().enumerate() {
                let after = |first: usize, second: usize| {
                    canonical_fsm
                        .next_state(
                            canonical_fsm
                                .next_state(CanonicalFSMState::default(), first)
                                .unwrap(),
                            second,
                        )
                        .is_some()
                };
                let allows_1_after_2 = after(index_2, index_1);
                let allows_2_after_1 = after(index_1, index_2);

                if move_1.class() == move_2.class() {
                    assert!(!allows_2_after_1 && !allows_1_after_2);
                } else if move_1.commutes_with(*move_2) {
                    // Exactly one order of a commuting pair is searched
                    assert!(allows_1_after_2 ^ allows_2_after_1);
                } else {
                    assert!(allows_1_after_2 && allows_2_after_1);
                }
            }
        }
    }

    #[test]
    fn test_canonical_fsm_counts_outer_sequences() {
        // The number of canonical outer-turn sequences of length two on the
        // 3x3x3 is 18 * 15 - 27 = 243
        let canonical_fsm = CanonicalFSM::new(&OUTER_MOVES);
        let mut count = 0;
        for first in 0..OUTER_MOVES.len() {
            let state = canonical_fsm
                .next_state(CanonicalFSMState::default(), first)
                .unwrap();
            count += (0..OUTER_MOVES.len())
                .filter(|&second| canonical_fsm.next_state(state, second).is_some())
                .count();
        }
        assert_eq!(count, 243);
    }
}
