use crate::{
    geometry::{Orbit, TurnMap},
    moves::{Face, Move},
};
use std::sync::LazyLock;
use thiserror::Error;

/// The state of a 4x4x4 in the fixed core frame.
///
/// `cp[i]`/`co[i]` are the corner at position `i` and its clockwise twist,
/// `wp[i]` is the wing at position `i`, and `ct[i]` is the color of centre
/// sticker `i`. Positions follow `geometry::Orbit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cube4 {
    cp: [u8; 8],
    co: [u8; 8],
    wp: [u8; 24],
    ct: [Face; 24],
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidState {
    #[error("The corners are not a permutation of the eight corner pieces")]
    CornerPermutation,
    #[error("The corner twists do not sum to a multiple of three")]
    CornerTwist,
    #[error("The wings are not a permutation of the 24 wing pieces")]
    WingPermutation,
    #[error("Face {face} has {count} centre stickers instead of four")]
    CenterCount { face: Face, count: usize },
}

struct Cube4Turn {
    corners: TurnMap,
    wings: TurnMap,
    centers: TurnMap,
}

static TURNS: LazyLock<Vec<Cube4Turn>> = LazyLock::new(|| {
    let corners = Orbit::corners(4);
    let wings = Orbit::wings();
    let centers = Orbit::centers();
    Move::all()
        .map(|mv| Cube4Turn {
            corners: corners.turn(mv),
            wings: wings.turn(mv),
            centers: centers.turn(mv),
        })
        .collect()
});

const fn solved_centers() -> [Face; 24] {
    let mut ct = [Face::U; 24];
    let mut i = 0;
    while i < 24 {
        ct[i] = Face::ALL[i / 4];
        i += 1;
    }
    ct
}

const fn identity<const N: usize>() -> [u8; N] {
    let mut out = [0; N];
    let mut i = 0;
    while i < N {
        out[i] = i as u8;
        i += 1;
    }
    out
}

pub(crate) fn is_permutation(perm: &[u8]) -> bool {
    let mut seen = vec![false; perm.len()];
    perm.iter().all(|&p| {
        let p = p as usize;
        p < seen.len() && !std::mem::replace(&mut seen[p], true)
    })
}

/// Parity of a permutation, `true` when odd.
pub(crate) fn parity(perm: &[u8]) -> bool {
    let mut odd = false;
    for i in 0..perm.len() {
        for j in i + 1..perm.len() {
            odd ^= perm[i] > perm[j];
        }
    }
    odd
}

impl Default for Cube4 {
    fn default() -> Self {
        Cube4::SOLVED
    }
}

impl Cube4 {
    pub const SOLVED: Cube4 = Cube4 {
        cp: identity(),
        co: [0; 8],
        wp: identity(),
        ct: solved_centers(),
    };

    /// Build a state from its parts, rejecting anything that is not a
    /// reachable configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` naming the first violated invariant.
    pub fn from_parts(
        cp: [u8; 8],
        co: [u8; 8],
        wp: [u8; 24],
        ct: [Face; 24],
    ) -> Result<Self, InvalidState> {
        let cube = Cube4 { cp, co, wp, ct };
        cube.validate()?;
        Ok(cube)
    }

    /// Check the permutation, twist and centre count invariants.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` naming the first violated invariant.
    pub fn validate(&self) -> Result<(), InvalidState> {
        if !is_permutation(&self.cp) {
            return Err(InvalidState::CornerPermutation);
        }
        let twist: u32 = self.co.iter().map(|&t| u32::from(t)).sum();
        if self.co.iter().any(|&t| t >= 3) || twist % 3 != 0 {
            return Err(InvalidState::CornerTwist);
        }
        if !is_permutation(&self.wp) {
            return Err(InvalidState::WingPermutation);
        }
        for face in Face::ALL {
            let count = self.ct.iter().filter(|&&c| c == face).count();
            if count != 4 {
                return Err(InvalidState::CenterCount { face, count });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn apply(self, mv: Move) -> Self {
        let turn = &TURNS[mv.index()];
        let mut next = self;
        for i in 0..8 {
            let j = turn.corners.dest[i] as usize;
            next.cp[j] = self.cp[i];
            next.co[j] = (self.co[i] + turn.corners.twist[i]) % 3;
        }
        for i in 0..24 {
            next.wp[turn.wings.dest[i] as usize] = self.wp[i];
            next.ct[turn.centers.dest[i] as usize] = self.ct[i];
        }
        next
    }

    #[must_use]
    pub fn apply_all(self, moves: impl IntoIterator<Item = Move>) -> Self {
        moves.into_iter().fold(self, Cube4::apply)
    }

    #[must_use]
    pub fn is_solved(&self) -> bool {
        *self == Cube4::SOLVED
    }

    /// A uniformly random state: any corner permutation with a valid twist,
    /// any wing permutation and any arrangement of the centre colors.
    pub fn random(rng: &mut fastrand::Rng) -> Self {
        let mut cube = Cube4::SOLVED;
        rng.shuffle(&mut cube.cp);
        let mut sum = 0;
        for twist in &mut cube.co[..7] {
            *twist = rng.u8(0..3);
            sum += *twist;
        }
        cube.co[7] = (3 - sum % 3) % 3;
        rng.shuffle(&mut cube.wp);
        rng.shuffle(&mut cube.ct);
        cube
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
    pub fn wing_permutation(&self) -> &[u8; 24] {
        &self.wp
    }

    #[must_use]
    pub fn centers(&self) -> &[Face; 24] {
        &self.ct
    }

    /// Bitmask of the centre positions whose color is one of `colors`.
    #[must_use]
    pub fn center_mask(&self, colors: &[Face]) -> u32 {
        self.ct
            .iter()
            .enumerate()
            .filter(|(_, color)| colors.contains(color))
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    /// Bitmask of the wing positions holding a wing whose home position is
    /// in `homes`.
    #[must_use]
    pub fn wing_mask(&self, homes: u32) -> u32 {
        self.wp
            .iter()
            .enumerate()
            .filter(|&(_, &wing)| (homes >> wing) & 1 == 1)
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::{Algorithm, Layer};

    fn alg(s: &str) -> Algorithm {
        s.parse().unwrap()
    }

    #[test]
    fn test_every_move_has_order_four() {
        for mv in Move::all().filter(|mv| mv.power() == 1) {
            let cube = Cube4::SOLVED.apply_all([mv; 4]);
            assert!(cube.is_solved(), "{mv}");
            assert!(!Cube4::SOLVED.apply(mv).is_solved(), "{mv}");
        }
    }

    #[test]
    fn test_move_then_inverse() {
        let mut rng = fastrand::Rng::with_seed(3);
        let cube = Cube4::random(&mut rng);
        for mv in Move::all() {
            assert_eq!(cube.apply(mv).apply(mv.inverse()), cube, "{mv}");
        }
    }

    #[test]
    fn test_sexy_move_order() {
        let sexy = alg("R U R' U'");
        let mut cube = Cube4::SOLVED;
        for i in 1..=6 {
            cube = cube.apply_all(sexy.iter());
            assert_eq!(cube.is_solved(), i == 6);
        }
    }

    #[test]
    fn test_wide_is_outer_and_inner() {
        let mut rng = fastrand::Rng::with_seed(9);
        let cube = Cube4::random(&mut rng);
        for face in Face::ALL {
            for power in 1..=3 {
                let wide = cube.apply(Move::new(face, Layer::Wide, power));
                let split = cube
                    .apply(Move::new(face, Layer::Outer, power))
                    .apply(Move::new(face, Layer::Inner, power));
                assert_eq!(wide, split);
            }
        }
    }

    #[test]
    fn test_opposite_wide_turns_rotate_the_same_way() {
        // Rw Lw' turns the whole cube
        let rotation = alg("Rw Lw'");
        let cube = Cube4::SOLVED.apply_all(rotation.iter());
        assert!(!cube.is_solved());
        assert!(
            cube.apply_all(rotation.moves().iter().copied().cycle().take(6))
                .is_solved()
        );
    }

    #[test]
    fn test_random_states_are_valid() {
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..100 {
            assert_eq!(Cube4::random(&mut rng).validate(), Ok(()));
        }
    }

    #[test]
    fn test_rejects_invalid_states() {
        let solved = Cube4::SOLVED;
        let mut co = [0; 8];
        co[0] = 1;
        assert_eq!(
            Cube4::from_parts(solved.cp, co, solved.wp, solved.ct),
            Err(InvalidState::CornerTwist)
        );
        let mut cp = solved.cp;
        cp[1] = 0;
        assert_eq!(
            Cube4::from_parts(cp, solved.co, solved.wp, solved.ct),
            Err(InvalidState::CornerPermutation)
        );
        let mut wp = solved.wp;
        wp[3] = 24;
        assert_eq!(
            Cube4::from_parts(solved.cp, solved.co, wp, solved.ct),
            Err(InvalidState::WingPermutation)
        );
        let mut ct = solved.ct;
        ct[0] = Face::R;
        assert_eq!(
            Cube4::from_parts(solved.cp, solved.co, solved.wp, ct),
            Err(InvalidState::CenterCount {
                face: Face::U,
                count: 3
            })
        );
    }

    #[test]
    fn test_masks() {
        let solved = Cube4::SOLVED;
        assert_eq!(solved.center_mask(&[Face::U]), 0xF);
        assert_eq!(solved.center_mask(&[Face::R, Face::L]), 0xF0 | 0xF0000);
        assert_eq!(solved.wing_mask(0b1010), 0b1010);
        let cube = solved.apply("Rw".parse().unwrap());
        assert_eq!(cube.center_mask(&[Face::R]), 0xF0);
        assert_ne!(cube.center_mask(&[Face::U]), 0xF);
    }

    #[test]
    fn test_parity() {
        assert!(!parity(&[0, 1, 2, 3]));
        assert!(parity(&[1, 0, 2, 3]));
        assert!(!parity(&[1, 2, 0, 3]));
    }
}
