use itertools::Itertools;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A face of the cube, in the conventional `U R F D L B` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Face {
    U,
    R,
    F,
    D,
    L,
    B,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::U, Face::R, Face::F, Face::D, Face::L, Face::B];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The axis this face turns around: 0 for x (R/L), 1 for y (U/D) and 2
    /// for z (F/B).
    #[must_use]
    pub const fn axis(self) -> usize {
        match self {
            Face::R | Face::L => 0,
            Face::U | Face::D => 1,
            Face::F | Face::B => 2,
        }
    }

    /// The outward unit normal of the face.
    #[must_use]
    pub const fn normal(self) -> [i8; 3] {
        match self {
            Face::U => [0, 1, 0],
            Face::R => [1, 0, 0],
            Face::F => [0, 0, 1],
            Face::D => [0, -1, 0],
            Face::L => [-1, 0, 0],
            Face::B => [0, 0, -1],
        }
    }

    #[must_use]
    pub fn from_normal(normal: [i8; 3]) -> Option<Face> {
        Face::ALL.into_iter().find(|face| face.normal() == normal)
    }

    #[must_use]
    pub const fn opposite(self) -> Face {
        match self {
            Face::U => Face::D,
            Face::R => Face::L,
            Face::F => Face::B,
            Face::D => Face::U,
            Face::L => Face::R,
            Face::B => Face::F,
        }
    }

    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Face::U => 'U',
            Face::R => 'R',
            Face::F => 'F',
            Face::D => 'D',
            Face::L => 'L',
            Face::B => 'B',
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Face> {
        match c {
            'U' => Some(Face::U),
            'R' => Some(Face::R),
            'F' => Some(Face::F),
            'D' => Some(Face::D),
            'L' => Some(Face::L),
            'B' => Some(Face::B),
            _ => None,
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Which layers of a face a move turns. On the 4x4x4 the outer layer is the
/// face itself, the inner layer is the slice directly behind it, and a wide
/// turn moves both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Layer {
    Outer,
    Wide,
    Inner,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Outer, Layer::Wide, Layer::Inner];

    /// Whether the layer at the given depth from the face (zero being the
    /// face itself) is turned.
    #[must_use]
    pub const fn turns_depth(self, depth: usize) -> bool {
        match self {
            Layer::Outer => depth == 0,
            Layer::Wide => depth <= 1,
            Layer::Inner => depth == 1,
        }
    }
}

/// A single turn: a face, the layers turned, and a clockwise quarter turn
/// count in `1..=3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    face: Face,
    layer: Layer,
    power: u8,
}

/// Every (face, layer) pair the search may turn, in canonical order.
const SEARCH_CLASSES: [(Face, Layer); 9] = [
    (Face::U, Layer::Outer),
    (Face::R, Layer::Outer),
    (Face::F, Layer::Outer),
    (Face::D, Layer::Outer),
    (Face::L, Layer::Outer),
    (Face::B, Layer::Outer),
    (Face::U, Layer::Wide),
    (Face::R, Layer::Wide),
    (Face::F, Layer::Wide),
];

/// The search alphabet: `U R F D L B Uw Rw Fw` in every power. No move in it
/// turns the innermost `D`, `L` or `B` slices, so the cube never rotates as a
/// whole and the solved state is unique.
pub const SEARCH_MOVES: [Move; 27] = {
    let mut moves = [Move::new(Face::U, Layer::Outer, 1); 27];
    let mut i = 0;
    while i < 27 {
        let (face, layer) = SEARCH_CLASSES[i / 3];
        moves[i] = Move::new(face, layer, (i % 3) as u8 + 1);
        i += 1;
    }
    moves
};

/// The 18 outer face turns, used by the reduced 3x3x3 phase.
pub const OUTER_MOVES: [Move; 18] = {
    let mut moves = [Move::new(Face::U, Layer::Outer, 1); 18];
    let mut i = 0;
    while i < 18 {
        moves[i] = Move::new(Face::ALL[i / 3], Layer::Outer, (i % 3) as u8 + 1);
        i += 1;
    }
    moves
};

impl Move {
    /// Number of distinct moves: six faces, three layer kinds, three powers.
    pub const COUNT: usize = 54;

    /// Every move, ordered by `Move::index`.
    pub fn all() -> impl Iterator<Item = Move> {
        Face::ALL.into_iter().flat_map(|face| {
            Layer::ALL
                .into_iter()
                .flat_map(move |layer| (1..=3).map(move |power| Move::new(face, layer, power)))
        })
    }

    /// # Panics
    ///
    /// Panics if `power` is not in `1..=3`.
    #[must_use]
    pub const fn new(face: Face, layer: Layer, power: u8) -> Self {
        assert!(power >= 1 && power <= 3);
        Move { face, layer, power }
    }

    #[must_use]
    pub const fn face(self) -> Face {
        self.face
    }

    #[must_use]
    pub const fn layer(self) -> Layer {
        self.layer
    }

    #[must_use]
    pub const fn power(self) -> u8 {
        self.power
    }

    #[must_use]
    pub const fn axis(self) -> usize {
        self.face.axis()
    }

    #[must_use]
    pub const fn inverse(self) -> Self {
        Move {
            power: 4 - self.power,
            ..self
        }
    }

    /// Dense index in `0..Move::COUNT`, used to look up move permutations.
    #[must_use]
    pub const fn index(self) -> usize {
        ((self.face as usize) * 3 + self.layer as usize) * 3 + self.power as usize - 1
    }

    /// The (face, layer) pair this move belongs to. Moves of one class
    /// merge into a single move.
    #[must_use]
    pub const fn class(self) -> (Face, Layer) {
        (self.face, self.layer)
    }

    /// Moves on one axis always commute.
    #[must_use]
    pub const fn commutes_with(self, other: Move) -> bool {
        self.face.axis() == other.face.axis()
    }

    /// Position in `SEARCH_MOVES`, if the move belongs to the search
    /// alphabet.
    #[must_use]
    pub fn search_index(self) -> Option<usize> {
        SEARCH_MOVES.iter().position(|&mv| mv == self)
    }

    /// Combine two moves of the same class. Returns `None` when they cancel.
    #[must_use]
    pub fn merge(self, other: Move) -> Option<Move> {
        debug_assert_eq!(self.class(), other.class());
        let power = (self.power + other.power) % 4;
        (power != 0).then_some(Move { power, ..self })
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.power {
            1 => "",
            2 => "2",
            _ => "'",
        };
        match self.layer {
            Layer::Outer => write!(f, "{}{suffix}", self.face),
            Layer::Wide => write!(f, "{}w{suffix}", self.face),
            Layer::Inner => write!(f, "2{}{suffix}", self.face),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("Unknown move `{0}`")]
    UnknownMove(String),
    #[error("Move `{0}` has an invalid turn amount")]
    InvalidPower(String),
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || MoveParseError::UnknownMove(s.to_owned());

        let (inner, rest) = match s.strip_prefix('2') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut chars = rest.chars();
        let face = chars.next().and_then(Face::from_char).ok_or_else(unknown)?;
        let rest = chars.as_str();
        let (wide, rest) = match rest.strip_prefix('w') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let layer = match (inner, wide) {
            (false, false) => Layer::Outer,
            (false, true) => Layer::Wide,
            (true, false) => Layer::Inner,
            // `2Rw` would turn the same layers as `Rw`
            (true, true) => return Err(unknown()),
        };
        let power = match rest {
            "" => 1,
            "2" | "2'" => 2,
            "'" | "3" => 3,
            _ => return Err(MoveParseError::InvalidPower(s.to_owned())),
        };
        Ok(Move::new(face, layer, power))
    }
}

/// A sequence of moves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Algorithm(Vec<Move>);

impl Algorithm {
    #[must_use]
    pub fn new(moves: Vec<Move>) -> Self {
        Algorithm(moves)
    }

    #[must_use]
    pub fn moves(&self) -> &[Move] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, mv: Move) {
        self.0.push(mv);
    }

    pub fn extend(&mut self, moves: impl IntoIterator<Item = Move>) {
        self.0.extend(moves);
    }

    /// The sequence that undoes this one: reversed, with every move
    /// inverted.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Algorithm(self.0.iter().rev().map(|mv| mv.inverse()).collect())
    }

    /// Merge moves of the same class that are separated only by moves on the
    /// same axis, dropping the ones that cancel out. The result is never
    /// longer and has the same effect on every state.
    #[must_use]
    pub fn simplified(&self) -> Self {
        let mut out: Vec<Move> = Vec::with_capacity(self.0.len());
        for &mv in &self.0 {
            let same_axis = out
                .iter()
                .rev()
                .take_while(|prev| prev.commutes_with(mv))
                .count();
            let start = out.len() - same_axis;
            match out[start..].iter().position(|prev| prev.class() == mv.class()) {
                Some(offset) => match out[start + offset].merge(mv) {
                    Some(merged) => out[start + offset] = merged,
                    None => {
                        out.remove(start + offset);
                    }
                },
                None => out.push(mv),
            }
        }
        Algorithm(out)
    }
}

impl From<Vec<Move>> for Algorithm {
    fn from(moves: Vec<Move>) -> Self {
        Algorithm(moves)
    }
}

impl FromIterator<Move> for Algorithm {
    fn from_iter<T: IntoIterator<Item = Move>>(iter: T) -> Self {
        Algorithm(iter.into_iter().collect())
    }
}

impl IntoIterator for Algorithm {
    type Item = Move;
    type IntoIter = std::vec::IntoIter<Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}

impl FromStr for Algorithm {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace().map(str::parse).collect()
    }
}
