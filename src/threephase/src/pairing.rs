//! Wing pairing on the 4x4x4.
//!
//! Under the pairing stage's moves the 24 wing positions split into four
//! orbits: two of eight in the U and D layers and two of four in the E slice.
//! Each edge slot has one position from each orbit of its layer, so a
//! pairing is a bijection between the slots of the two orbits: which slot
//! holds the partner of the wing in each slot. A move acts on that bijection
//! by permuting the slots of both orbits, which makes it a small coordinate.
//!
//! The E-slice pairing can only be finished if the two E-slice orbits agree
//! on where their wings are up to swapping the labels in pairs. The wing
//! slice stage tracks each orbit's E-slice wings modulo those relabelings so
//! that it only stops where the pairing stage can go on.

use crate::{
    coord::{MoveTable, mask_rank, perm_rank, perm_unrank},
    cube4::{Cube4, is_permutation, parity},
    geometry::{Orbit, TurnMap},
    moves::Move,
    pruning::{PruningTable, TableError},
    stages::{PAIRING_MOVES, WING_SLICE_MOVES},
};
use itertools::Itertools;

const UD_PAIRINGS: usize = 40320;
const E_PAIRINGS: usize = 24;
pub const PAIRING_COUNT: usize = UD_PAIRINGS * E_PAIRINGS * 2;

/// Placements of one orbit's four E-slice wings among its twelve positions,
/// as a position set and one of six relabeling classes.
pub const SLICE_CONFIGS: usize = 495 * 6;

const ALL_WINGS: u32 = 0x00FF_FFFF;

/// How the wing positions split under the edge subgroups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WingOrbits {
    high: u32,
    ud_high: [u8; 8],
    ud_low: [u8; 8],
    e_high: [u8; 4],
    e_low: [u8; 4],
}

fn orbit_labels(turns: &[TurnMap]) -> Vec<usize> {
    let mut labels = vec![usize::MAX; 24];
    let mut next_label = 0;
    for seed in 0..24 {
        if labels[seed] != usize::MAX {
            continue;
        }
        labels[seed] = next_label;
        let mut stack = vec![seed];
        while let Some(position) = stack.pop() {
            for turn in turns {
                let next = turn.dest[position] as usize;
                if labels[next] == usize::MAX {
                    labels[next] = next_label;
                    stack.push(next);
                }
            }
        }
        next_label += 1;
    }
    labels
}

/// The position of each slot's member of `orbit`, slots numbered from
/// `first_slot`.
fn by_slot<const N: usize>(orbit: &[usize], first_slot: usize) -> Option<[u8; N]> {
    let mut out = [u8::MAX; N];
    for &position in orbit {
        let slot = (position / 2).checked_sub(first_slot)?;
        if slot >= N || out[slot] != u8::MAX {
            return None;
        }
        out[slot] = position as u8;
    }
    out.iter().all(|&p| p != u8::MAX).then_some(out)
}

/// The configuration of four labelled wings at `placement`, all inside
/// `orbit`. Relabeling by `label ^ x` leaves it unchanged.
fn slice_config(placement: &[u8; 4], orbit: u32) -> u16 {
    let within = placement
        .iter()
        .fold(0, |set: u32, &p| set | 1 << (orbit & ((1 << p) - 1)).count_ones());
    let order = placement.map(|p| placement.iter().filter(|&&q| q < p).count());
    let first = order.iter().position(|&o| o == 0).unwrap_or_default();
    let class = [1, 2, 3].map(|label: usize| (order[label ^ first] - 1) as u8);
    (mask_rank(within) * 6 + perm_rank(&class)) as u16
}

impl WingOrbits {
    /// Find the orbits from the stage move sets.
    ///
    /// # Errors
    ///
    /// `TableError::WingOrbits` if the orbits do not have the shape the edge
    /// stages rely on.
    pub fn compute() -> Result<Self, TableError> {
        let wings = Orbit::wings();
        let slice_turns = WING_SLICE_MOVES
            .iter()
            .map(|&mv| wings.turn(mv))
            .collect::<Vec<_>>();
        let pairing_turns = PAIRING_MOVES
            .iter()
            .map(|&mv| wings.turn(mv))
            .collect::<Vec<_>>();

        let slice_labels = orbit_labels(&slice_turns);
        let high = (0..24)
            .filter(|&p| slice_labels[p] == slice_labels[0])
            .fold(0, |mask, p| mask | 1 << p);
        if u32::count_ones(high) != 12 {
            return Err(TableError::WingOrbits);
        }

        let pairing_labels = orbit_labels(&pairing_turns);
        let (mut ud_high, mut ud_low, mut e_high, mut e_low) = (None, None, None, None);
        for label in 0..=pairing_labels.iter().copied().max().unwrap_or_default() {
            let orbit = (0..24)
                .filter(|&p| pairing_labels[p] == label)
                .collect::<Vec<_>>();
            let in_high = orbit.iter().filter(|&&p| high >> p & 1 == 1).count();
            let is_high = match in_high {
                0 => false,
                n if n == orbit.len() => true,
                _ => return Err(TableError::WingOrbits),
            };
            let found = match (orbit.len(), is_high) {
                (8, true) => ud_high.replace(by_slot::<8>(&orbit, 0)).is_some(),
                (8, false) => ud_low.replace(by_slot::<8>(&orbit, 0)).is_some(),
                (4, true) => e_high.replace(by_slot::<4>(&orbit, 8)).is_some(),
                (4, false) => e_low.replace(by_slot::<4>(&orbit, 8)).is_some(),
                _ => return Err(TableError::WingOrbits),
            };
            if found {
                return Err(TableError::WingOrbits);
            }
        }

        match (ud_high, ud_low, e_high, e_low) {
            (Some(Some(ud_high)), Some(Some(ud_low)), Some(Some(e_high)), Some(Some(e_low))) => {
                Ok(WingOrbits {
                    high,
                    ud_high,
                    ud_low,
                    e_high,
                    e_low,
                })
            }
            _ => Err(TableError::WingOrbits),
        }
    }

    /// The twelve positions of the wing-slice subgroup orbit containing the
    /// first wing, as a mask.
    #[must_use]
    pub fn high(&self) -> u32 {
        self.high
    }

    #[must_use]
    pub fn low(&self) -> u32 {
        !self.high & ALL_WINGS
    }

    /// Where the wings `homes` are, if they are all inside `orbit`.
    fn placement(cube: &Cube4, homes: &[u8; 4], orbit: u32) -> Option<[u8; 4]> {
        let mut placement = [0; 4];
        for (position, wing) in cube.wing_permutation().iter().enumerate() {
            if let Some(label) = homes.iter().position(|home| home == wing) {
                if orbit >> position & 1 == 0 {
                    return None;
                }
                placement[label] = position as u8;
            }
        }
        Some(placement)
    }

    /// The E-slice configurations of the high and low orbits, or `None` if
    /// an E-slice wing has left its orbit.
    #[must_use]
    pub fn slice_configs(&self, cube: &Cube4) -> Option<(u16, u16)> {
        let high = WingOrbits::placement(cube, &self.e_high, self.high)?;
        let low = WingOrbits::placement(cube, &self.e_low, self.low())?;
        Some((
            slice_config(&high, self.high),
            slice_config(&low, self.low()),
        ))
    }

    /// Transitions of the high and low E-slice configurations under the wing
    /// slice stage's moves.
    #[must_use]
    pub fn slice_move_tables(&self) -> [MoveTable; 2] {
        let wings = Orbit::wings();
        let turns = WING_SLICE_MOVES
            .iter()
            .map(|&mv| wings.turn(mv))
            .collect::<Vec<_>>();
        [(self.e_high, self.high), (self.e_low, self.low())].map(|(homes, orbit)| {
            MoveTable::explore(
                homes,
                SLICE_CONFIGS,
                turns.len(),
                |placement| slice_config(placement, orbit) as usize,
                |placement, move_index| placement.map(|p| turns[move_index].dest[p as usize]),
            )
        })
    }

    /// Every pair of configurations with both orbits' wings in the E slice,
    /// placed so the pairing stage can pair them.
    pub fn slice_goals(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (0..E_PAIRINGS as u32)
            .map(move |rank| {
                let mut slots = [0; 4];
                perm_unrank(rank, &mut slots);
                let high = slots.map(|slot| self.e_high[slot as usize]);
                let low = slots.map(|slot| self.e_low[slot as usize]);
                (slice_config(&high, self.high), slice_config(&low, self.low()))
            })
            .unique()
    }

    /// Slot (relative to `first_slot`) of the wing at each position of
    /// `positions`, if the wings there all belong to that range of slots.
    fn home_slots<const N: usize>(
        cube: &Cube4,
        positions: &[u8; N],
        first_slot: usize,
    ) -> Option<[u8; N]> {
        let wp = cube.wing_permutation();
        let mut slots = [0; N];
        for (slot, &position) in slots.iter_mut().zip(positions) {
            let home = (wp[position as usize] / 2) as usize;
            *slot = home.checked_sub(first_slot).filter(|&s| s < N)? as u8;
        }
        is_permutation(&slots).then_some(slots)
    }
}

/// For each slot of `from`, the slot of `to` holding the wing with the same
/// home slot.
fn partners<const N: usize>(from: &[u8; N], to: &[u8; N]) -> [u8; N] {
    let mut slot_of_home = [0; N];
    for (slot, &home) in to.iter().enumerate() {
        slot_of_home[home as usize] = slot as u8;
    }
    from.map(|home| slot_of_home[home as usize])
}

/// The slot each slot of an orbit is sent to by a move.
fn slot_permutation<const N: usize>(turn: &TurnMap, positions: &[u8; N], first_slot: usize) -> [u8; N] {
    positions.map(|p| (turn.dest[p as usize] as usize / 2 - first_slot) as u8)
}

/// Move a pairing by permuting the slots on both sides:
/// `next[first[s]] = second[pairing[s]]`.
fn conjugate<const N: usize>(pairing: &[u8; N], first: &[u8; N], second: &[u8; N]) -> [u8; N] {
    let mut next = [0; N];
    for (slot, &partner) in pairing.iter().enumerate() {
        next[first[slot] as usize] = second[partner as usize];
    }
    next
}

struct PairingMove {
    ud_high: [u8; 8],
    ud_low: [u8; 8],
    e_low: [u8; 4],
    e_high: [u8; 4],
    flips_parity: bool,
}

/// Transitions of the pairing coordinate under the pairing stage's moves.
#[derive(Clone, Debug)]
struct PairingMoves {
    ud: Vec<u16>,
    e: Vec<u8>,
    parity: Vec<bool>,
}

impl PairingMoves {
    fn generate(orbits: &WingOrbits) -> Self {
        let corners = Orbit::corners(4);
        let wings = Orbit::wings();
        let moves = PAIRING_MOVES
            .iter()
            .map(|&mv: &Move| {
                let turn = wings.turn(mv);
                let ud_high = slot_permutation(&turn, &orbits.ud_high, 0);
                let e_high = slot_permutation(&turn, &orbits.e_high, 8);
                PairingMove {
                    ud_high,
                    ud_low: slot_permutation(&turn, &orbits.ud_low, 0),
                    e_low: slot_permutation(&turn, &orbits.e_low, 8),
                    e_high,
                    flips_parity: parity(&corners.turn(mv).dest)
                        ^ parity(&ud_high)
                        ^ parity(&e_high),
                }
            })
            .collect::<Vec<_>>();

        let mut ud = Vec::with_capacity(UD_PAIRINGS * moves.len());
        let mut pairing = [0; 8];
        for rank in 0..UD_PAIRINGS as u32 {
            perm_unrank(rank, &mut pairing);
            for mv in &moves {
                ud.push(perm_rank(&conjugate(&pairing, &mv.ud_high, &mv.ud_low)) as u16);
            }
        }
        let mut e = Vec::with_capacity(E_PAIRINGS * moves.len());
        let mut pairing = [0; 4];
        for rank in 0..E_PAIRINGS as u32 {
            perm_unrank(rank, &mut pairing);
            for mv in &moves {
                e.push(perm_rank(&conjugate(&pairing, &mv.e_low, &mv.e_high)) as u8);
            }
        }
        let parity = moves.iter().map(|mv| mv.flips_parity).collect();
        PairingMoves { ud, e, parity }
    }

    fn step(&self, index: u32, move_index: usize) -> u32 {
        let num_moves = self.parity.len();
        let e = (index >> 1) as usize % E_PAIRINGS;
        let ud = (index >> 1) as usize / E_PAIRINGS;
        let ud = u32::from(self.ud[ud * num_moves + move_index]);
        let e = u32::from(self.e[e * num_moves + move_index]);
        let odd = (index & 1) ^ u32::from(self.parity[move_index]);
        (ud * E_PAIRINGS as u32 + e) * 2 + odd
    }
}

/// The pairing coordinate, its move tables and its pruning table.
#[derive(Clone, Debug)]
pub struct PairingTables {
    orbits: WingOrbits,
    moves: PairingMoves,
    table: PruningTable,
}

impl PairingTables {
    /// # Errors
    ///
    /// Fails if the pruning table does not reach every pairing the stage's
    /// moves can reach.
    pub fn generate(orbits: WingOrbits) -> Result<Self, TableError> {
        let moves = PairingMoves::generate(&orbits);
        let table = PruningTable::generate(
            "pairing",
            PAIRING_COUNT,
            [0],
            PAIRING_MOVES.len(),
            |index| index,
            |index, move_index| moves.step(index, move_index),
            161_280,
        )?;
        Ok(PairingTables {
            orbits,
            moves,
            table,
        })
    }

    pub(crate) fn with_table(orbits: WingOrbits, table: PruningTable) -> Self {
        let moves = PairingMoves::generate(&orbits);
        PairingTables {
            orbits,
            moves,
            table,
        }
    }

    #[must_use]
    pub fn orbits(&self) -> &WingOrbits {
        &self.orbits
    }

    #[must_use]
    pub fn table(&self) -> &PruningTable {
        &self.table
    }

    /// The pairing coordinate of a cube, or `None` if some wing is outside
    /// the orbit pair the coordinate describes. Zero is paired.
    #[must_use]
    pub fn coordinate(&self, cube: &Cube4) -> Option<u32> {
        let orbits = &self.orbits;
        let ud_high = WingOrbits::home_slots(cube, &orbits.ud_high, 0)?;
        let ud_low = WingOrbits::home_slots(cube, &orbits.ud_low, 0)?;
        let e_low = WingOrbits::home_slots(cube, &orbits.e_low, 8)?;
        let e_high = WingOrbits::home_slots(cube, &orbits.e_high, 8)?;
        let ud = perm_rank(&partners(&ud_high, &ud_low));
        let e = perm_rank(&partners(&e_low, &e_high));
        let odd = parity(cube.corner_permutation()) ^ parity(&ud_high) ^ parity(&e_high);
        Some((ud * E_PAIRINGS as u32 + e) * 2 + u32::from(odd))
    }

    #[must_use]
    pub fn step(&self, index: u32, move_index: usize) -> u32 {
        self.moves.step(index, move_index)
    }

    #[must_use]
    pub fn heuristic(&self, index: u32) -> u8 {
        self.table.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pruning::UNREACHED;

    #[test_log::test]
    fn test_steps_follow_the_cube() {
        let pairing = PairingTables::generate(WingOrbits::compute().unwrap()).unwrap();
        assert_eq!(pairing.coordinate(&Cube4::SOLVED), Some(0));
        assert_eq!(pairing.heuristic(0), 0);

        let mut rng = fastrand::Rng::with_seed(5);
        let mut cube = Cube4::SOLVED;
        let mut index = 0;
        for _ in 0..200 {
            let move_index = rng.usize(..PAIRING_MOVES.len());
            cube = cube.apply(PAIRING_MOVES[move_index]);
            index = pairing.step(index, move_index);
            assert_eq!(pairing.coordinate(&cube), Some(index));
            assert_ne!(pairing.heuristic(index), UNREACHED);
        }
    }

    #[test_log::test]
    fn test_wing_orbits_have_the_edge_shape() {
        let orbits = WingOrbits::compute().unwrap();
        assert_eq!(orbits.high().count_ones(), 12);
        assert_eq!(orbits.high() | orbits.low(), ALL_WINGS);
        for (positions, orbit) in [(orbits.e_high, orbits.high()), (orbits.e_low, orbits.low())] {
            assert!(positions.iter().all(|&p| orbit >> p & 1 == 1));
        }
    }

    #[test_log::test]
    fn test_slice_configs_follow_the_cube() {
        let orbits = WingOrbits::compute().unwrap();
        let [high, low] = orbits.slice_move_tables();
        let solved = orbits.slice_configs(&Cube4::SOLVED).unwrap();
        assert!(orbits.slice_goals().contains(&solved));

        let mut rng = fastrand::Rng::with_seed(21);
        let mut cube = Cube4::SOLVED;
        let mut configs = solved;
        for _ in 0..300 {
            let move_index = rng.usize(..WING_SLICE_MOVES.len());
            cube = cube.apply(WING_SLICE_MOVES[move_index]);
            configs = (
                high.apply(configs.0, move_index),
                low.apply(configs.1, move_index),
            );
            assert_eq!(orbits.slice_configs(&cube), Some(configs));
            assert!(usize::from(configs.0) < SLICE_CONFIGS);
        }
    }

    #[test_log::test]
    fn test_slice_goals_are_the_pairable_placements() {
        let orbits = WingOrbits::compute().unwrap();
        assert_eq!(orbits.slice_goals().count(), 6);
        let pairing = PairingTables::generate(orbits.clone()).unwrap();

        // Every way of shuffling each orbit's E-slice wings within the slice
        let solved = Cube4::SOLVED;
        let (mut high, mut low) = ([0; 4], [0; 4]);
        for high_rank in 0..E_PAIRINGS as u32 {
            perm_unrank(high_rank, &mut high);
            for low_rank in 0..E_PAIRINGS as u32 {
                perm_unrank(low_rank, &mut low);
                let mut wp = *solved.wing_permutation();
                for slot in 0..4 {
                    wp[orbits.e_high[slot] as usize] = orbits.e_high[high[slot] as usize];
                    wp[orbits.e_low[slot] as usize] = orbits.e_low[low[slot] as usize];
                }
                let cube = Cube4::from_parts(
                    *solved.corner_permutation(),
                    *solved.corner_twist(),
                    wp,
                    *solved.centers(),
                )
                .unwrap();
                let configs = orbits.slice_configs(&cube).unwrap();
                let pairable = pairing
                    .coordinate(&cube)
                    .is_some_and(|index| pairing.heuristic(index) != UNREACHED);
                assert_eq!(
                    orbits.slice_goals().contains(&configs),
                    pairable,
                    "{high:?} {low:?}"
                );
            }
        }
    }
}
