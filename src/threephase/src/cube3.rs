use crate::{
    coord::{Coordinate, mask_rank, perm_rank},
    cube4::{is_permutation, parity},
    geometry::{Orbit, TurnMap},
    moves::{Layer, Move, OUTER_MOVES},
};
use std::sync::LazyLock;

/// The reduced 3x3x3: corners and the twelve middle edges. Only outer face
/// turns apply to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cube3 {
    cp: [u8; 8],
    co: [u8; 8],
    ep: [u8; 12],
    eo: [u8; 12],
}

struct Cube3Turn {
    corners: TurnMap,
    edges: TurnMap,
}

static TURNS: LazyLock<Vec<Cube3Turn>> = LazyLock::new(|| {
    let corners = Orbit::corners(3);
    let edges = Orbit::edges();
    OUTER_MOVES
        .iter()
        .map(|&mv| Cube3Turn {
            corners: corners.turn(mv),
            edges: edges.turn(mv),
        })
        .collect()
});

impl Cube3 {
    pub const SOLVED: Cube3 = Cube3 {
        cp: [0, 1, 2, 3, 4, 5, 6, 7],
        co: [0; 8],
        ep: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        eo: [0; 12],
    };

    #[must_use]
    pub(crate) fn from_parts(cp: [u8; 8], co: [u8; 8], ep: [u8; 12], eo: [u8; 12]) -> Self {
        Cube3 { cp, co, ep, eo }
    }

    /// Whether the state can be reached with face turns: both piece types
    /// permuted, twists and flips summing to zero, and equal permutation
    /// parities.
    #[must_use]
    pub fn is_solvable(&self) -> bool {
        is_permutation(&self.cp)
            && is_permutation(&self.ep)
            && self.co.iter().map(|&t| u32::from(t)).sum::<u32>() % 3 == 0
            && self.eo.iter().map(|&f| u32::from(f)).sum::<u32>() % 2 == 0
            && parity(&self.cp) == parity(&self.ep)
    }

    /// # Panics
    ///
    /// Debug builds panic on a move that is not an outer face turn.
    #[must_use]
    pub fn apply(self, mv: Move) -> Self {
        debug_assert_eq!(mv.layer(), Layer::Outer);
        let turn = &TURNS[mv.face().index() * 3 + mv.power() as usize - 1];
        let mut next = self;
        for i in 0..8 {
            let j = turn.corners.dest[i] as usize;
            next.cp[j] = self.cp[i];
            next.co[j] = (self.co[i] + turn.corners.twist[i]) % 3;
        }
        for i in 0..12 {
            let j = turn.edges.dest[i] as usize;
            next.ep[j] = self.ep[i];
            next.eo[j] = (self.eo[i] + turn.edges.twist[i]) % 2;
        }
        next
    }

    #[must_use]
    pub fn apply_all(self, moves: impl IntoIterator<Item = Move>) -> Self {
        moves.into_iter().fold(self, Cube3::apply)
    }

    #[must_use]
    pub fn is_solved(&self) -> bool {
        *self == Cube3::SOLVED
    }

    #[must_use]
    pub fn corner_permutation(&self) -> &[u8; 8] {
        &self.cp
    }

    #[must_use]
    pub fn corner_twist(&self) -> &[u8; 8] {
        &self.co
    }

    #[must_use]
    pub fn edge_permutation(&self) -> &[u8; 12] {
        &self.ep
    }

    #[must_use]
    pub fn edge_flip(&self) -> &[u8; 12] {
        &self.eo
    }
}

/// Corner twist, base 3 over the first seven corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwistCoord(pub u16);

/// Edge flip, base 2 over the first eleven edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlipCoord(pub u16);

/// Positions of the four E-slice edges. Solved is 494.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceCoord(pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CornerPermCoord(pub u16);

/// Permutation of the eight U and D edges, defined once the E-slice edges
/// are in the E slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UdEdgePermCoord(pub u16);

/// Permutation of the E-slice edges within the E slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlicePermCoord(pub u16);

impl SliceCoord {
    pub const SOLVED: SliceCoord = SliceCoord(494);
}

impl Coordinate<Cube3> for TwistCoord {
    const COUNT: usize = 2187;

    fn from_puzzle(cube: &Cube3) -> Self {
        TwistCoord(cube.co[..7].iter().fold(0, |acc, &t| acc * 3 + u16::from(t)))
    }

    fn repr(self) -> usize {
        self.0 as usize
    }
}

impl Coordinate<Cube3> for FlipCoord {
    const COUNT: usize = 2048;

    fn from_puzzle(cube: &Cube3) -> Self {
        FlipCoord(cube.eo[..11].iter().fold(0, |acc, &f| acc * 2 + u16::from(f)))
    }

    fn repr(self) -> usize {
        self.0 as usize
    }
}

impl Coordinate<Cube3> for SliceCoord {
    const COUNT: usize = 495;

    fn from_puzzle(cube: &Cube3) -> Self {
        let mask = cube
            .ep
            .iter()
            .enumerate()
            .filter(|&(_, &edge)| edge >= 8)
            .fold(0, |mask, (i, _)| mask | 1 << i);
        SliceCoord(mask_rank(mask) as u16)
    }

    fn repr(self) -> usize {
        self.0 as usize
    }
}

impl Coordinate<Cube3> for CornerPermCoord {
    const COUNT: usize = 40320;

    fn from_puzzle(cube: &Cube3) -> Self {
        CornerPermCoord(perm_rank(&cube.cp) as u16)
    }

    fn repr(self) -> usize {
        self.0 as usize
    }
}

impl Coordinate<Cube3> for UdEdgePermCoord {
    const COUNT: usize = 40320;

    fn from_puzzle(cube: &Cube3) -> Self {
        UdEdgePermCoord(perm_rank(&cube.ep[..8]) as u16)
    }

    fn repr(self) -> usize {
        self.0 as usize
    }
}

impl Coordinate<Cube3> for SlicePermCoord {
    const COUNT: usize = 24;

    fn from_puzzle(cube: &Cube3) -> Self {
        let slice = [8, 9, 10, 11].map(|i| cube.ep[i].saturating_sub(8));
        SlicePermCoord(perm_rank(&slice) as u16)
    }

    fn repr(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Algorithm;

    fn alg(s: &str) -> Algorithm {
        s.parse().unwrap()
    }

    #[test]
    fn test_solved_coordinates() {
        let solved = Cube3::SOLVED;
        assert_eq!(TwistCoord::from_puzzle(&solved), TwistCoord(0));
        assert_eq!(FlipCoord::from_puzzle(&solved), FlipCoord(0));
        assert_eq!(SliceCoord::from_puzzle(&solved), SliceCoord::SOLVED);
        assert_eq!(CornerPermCoord::from_puzzle(&solved), CornerPermCoord(0));
        assert_eq!(UdEdgePermCoord::from_puzzle(&solved), UdEdgePermCoord(0));
        assert_eq!(SlicePermCoord::from_puzzle(&solved), SlicePermCoord(0));
    }

    #[test]
    fn test_superflip_has_order_two() {
        let superflip = alg("U R2 F B R B2 R U2 L B2 R U' D' R2 F R' L B2 U2 F2");
        let cube = Cube3::SOLVED.apply_all(superflip.iter());
        assert_eq!(cube.edge_flip(), &[1; 12]);
        assert_eq!(cube.corner_permutation(), Cube3::SOLVED.corner_permutation());
        assert_eq!(cube.edge_permutation(), Cube3::SOLVED.edge_permutation());
        assert!(cube.apply_all(superflip.iter()).is_solved());
    }

    #[test]
    fn test_phase_two_moves_keep_orientation() {
        let cube = Cube3::SOLVED.apply_all(alg("U R2 D' F2 L2 U2 B2 D").iter());
        assert_eq!(TwistCoord::from_puzzle(&cube), TwistCoord(0));
        assert_eq!(FlipCoord::from_puzzle(&cube), FlipCoord(0));
        assert_eq!(SliceCoord::from_puzzle(&cube), SliceCoord::SOLVED);
        assert!(cube.is_solvable());
        assert!(!cube.is_solved());
    }

    #[test]
    fn test_solvable() {
        assert!(Cube3::SOLVED.is_solvable());
        let mut eo = [0; 12];
        eo[0] = 1;
        let flipped = Cube3::from_parts(
            Cube3::SOLVED.cp,
            Cube3::SOLVED.co,
            Cube3::SOLVED.ep,
            eo,
        );
        assert!(!flipped.is_solvable());
        let swapped = Cube3::from_parts(
            [1, 0, 2, 3, 4, 5, 6, 7],
            Cube3::SOLVED.co,
            Cube3::SOLVED.ep,
            Cube3::SOLVED.eo,
        );
        assert!(!swapped.is_solvable());
    }
}
