//! Coordinates: small integer projections of a state used to index move and
//! pruning tables.

use crate::{geometry::TurnMap, moves::Move};

/// `BINOMIAL[n][k]` is n choose k for `n, k <= 24`.
pub const BINOMIAL: [[u32; 25]; 25] = {
    let mut table = [[0; 25]; 25];
    let mut n = 0;
    while n < 25 {
        table[n][0] = 1;
        let mut k = 1;
        while k <= n {
            table[n][k] = table[n - 1][k - 1] + if k < n { table[n - 1][k] } else { 0 };
            k += 1;
        }
        n += 1;
    }
    table
};

/// Colex rank of a set of positions among all sets of the same size.
#[must_use]
pub fn mask_rank(mut mask: u32) -> u32 {
    let mut rank = 0;
    let mut k = 1;
    while mask != 0 {
        let position = mask.trailing_zeros() as usize;
        rank += BINOMIAL[position][k];
        k += 1;
        mask &= mask - 1;
    }
    rank
}

/// Inverse of `mask_rank` for sets of `k` positions below 24.
#[must_use]
pub fn mask_unrank(mut rank: u32, k: usize) -> u32 {
    let mut mask = 0;
    let mut position = 24;
    for t in (1..=k).rev() {
        position -= 1;
        while BINOMIAL[position][t] > rank {
            position -= 1;
        }
        rank -= BINOMIAL[position][t];
        mask |= 1 << position;
    }
    mask
}

/// Lehmer rank of a permutation of `0..perm.len()`.
#[must_use]
pub fn perm_rank(perm: &[u8]) -> u32 {
    let mut rank = 0;
    for (i, &p) in perm.iter().enumerate() {
        let smaller_after = perm[i + 1..].iter().filter(|&&q| q < p).count();
        rank = rank * (perm.len() - i) as u32 + smaller_after as u32;
    }
    rank
}

/// Inverse of `perm_rank`, writing the permutation into `perm`.
pub fn perm_unrank(mut rank: u32, perm: &mut [u8]) {
    let n = perm.len();
    let mut digits = vec![0; n];
    for (i, digit) in digits.iter_mut().enumerate().rev() {
        let base = (n - i) as u32;
        *digit = (rank % base) as usize;
        rank /= base;
    }
    let mut remaining = (0..n as u8).collect::<Vec<_>>();
    for (slot, digit) in perm.iter_mut().zip(digits) {
        *slot = remaining.remove(digit);
    }
}

/// Moves a 24-bit set of positions with three byte lookups.
#[derive(Clone, Debug)]
pub struct MaskMover {
    tables: [[u32; 256]; 3],
}

impl MaskMover {
    #[must_use]
    pub fn new(turn: &TurnMap) -> Self {
        let mut tables = [[0; 256]; 3];
        for (chunk, table) in tables.iter_mut().enumerate() {
            for (byte, entry) in table.iter_mut().enumerate() {
                *entry = (0..8)
                    .filter(|bit| byte >> bit & 1 == 1)
                    .fold(0, |mask, bit| mask | 1 << turn.dest[chunk * 8 + bit]);
            }
        }
        MaskMover { tables }
    }

    #[must_use]
    pub fn apply(&self, mask: u32) -> u32 {
        self.tables[0][(mask & 0xFF) as usize]
            | self.tables[1][(mask >> 8 & 0xFF) as usize]
            | self.tables[2][(mask >> 16 & 0xFF) as usize]
    }
}

/// A coordinate over some puzzle `P`, dense in `0..COUNT`.
pub trait Coordinate<P>: Copy + Eq {
    const COUNT: usize;

    fn from_puzzle(puzzle: &P) -> Self;

    fn repr(self) -> usize;
}

/// `coordinate x move -> coordinate` transitions, stored row-major.
#[derive(Clone, Debug)]
pub struct MoveTable {
    table: Vec<u16>,
    num_moves: usize,
}

impl MoveTable {
    /// Explore the puzzle from `start` with `moves`, recording the
    /// transition of every coordinate value reached. A coordinate is only
    /// well defined under moves that act on it consistently, so `moves`
    /// must be the moves the coordinate is used with.
    pub fn generate<P: Copy, C: Coordinate<P>>(
        start: P,
        moves: &[Move],
        apply: impl Fn(P, Move) -> P,
    ) -> Self {
        MoveTable::explore(
            start,
            C::COUNT,
            moves.len(),
            |puzzle| C::from_puzzle(puzzle).repr(),
            |puzzle, move_index| apply(puzzle, moves[move_index]),
        )
    }

    /// `generate` for a coordinate that needs more than the puzzle to
    /// compute: `coord` maps a puzzle into `0..count` and `step` applies the
    /// `i`th of `num_moves` moves.
    pub fn explore<P: Copy>(
        start: P,
        count: usize,
        num_moves: usize,
        coord: impl Fn(&P) -> usize,
        step: impl Fn(P, usize) -> P,
    ) -> Self {
        let mut table = vec![u16::MAX; count * num_moves];
        let mut visited = vec![false; count];
        visited[coord(&start)] = true;
        let mut stack = vec![start];

        while let Some(puzzle) = stack.pop() {
            let from = coord(&puzzle);
            for move_index in 0..num_moves {
                let next = step(puzzle, move_index);
                let to = coord(&next);
                table[from * num_moves + move_index] = to as u16;
                if !visited[to] {
                    visited[to] = true;
                    stack.push(next);
                }
            }
        }

        MoveTable { table, num_moves }
    }

    #[must_use]
    pub fn apply(&self, coord: u16, move_index: usize) -> u16 {
        self.table[coord as usize * self.num_moves + move_index]
    }

    #[must_use]
    pub fn num_moves(&self) -> usize {
        self.num_moves
    }
}
