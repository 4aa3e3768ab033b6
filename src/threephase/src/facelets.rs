//! Sticker strings for both cube models.
//!
//! A facelet string lists the faces in `URFDLB` order, each face row-major as
//! seen from outside with `U` on top (`B` on top for `D`), one color letter
//! per sticker. The 4x4x4 string has 96 letters and the 3x3x3 string 54.

use crate::{
    cube3::Cube3,
    cube4::{Cube4, InvalidState},
    geometry::{CORNER_FACES, EDGE_FACES, Orbit, Point, sticker_point},
    moves::Face,
};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FaceletError {
    #[error("Expected {expected} facelets but found {found}")]
    Length { expected: usize, found: usize },
    #[error("'{0}' is not a face color; use U, R, F, D, L or B")]
    UnknownColor(char),
    #[error("No corner has the colors {0}")]
    UnknownCorner(String),
    #[error("No edge has the colors {0}")]
    UnknownEdge(String),
    #[error("The centre of the {0} face has the wrong color")]
    CenterColor(Face),
    #[error("The cube is not reduced to a 3x3x3")]
    NotReduced,
    #[error("The 3x3x3 cannot be solved")]
    Unsolvable,
    #[error(transparent)]
    InvalidState(#[from] InvalidState),
}

/// The kind of cubie a sticker belongs to, by how many of its coordinates
/// lie on the surface.
fn surface_axes(n: i8, point: Point) -> usize {
    point.iter().filter(|c| c.abs() == n - 1).count()
}

/// Every sticker of an `n`-cube in string order.
fn stickers(n: i8) -> impl Iterator<Item = (Face, Point)> {
    Face::ALL.into_iter().flat_map(move |face| {
        (0..n).flat_map(move |row| (0..n).map(move |col| (face, sticker_point(n, face, row, col))))
    })
}

/// The piece facelet under one sticker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sticker {
    Corner { position: usize, facelet: usize },
    /// A wing on the 4x4x4, a middle edge on the 3x3x3.
    Edge { position: usize, facelet: usize },
    Center(usize),
    /// The fixed centre of the 3x3x3.
    Fixed(Face),
}

/// Where every sticker of an `n`-cube sits, both ways round.
struct Layout {
    edges: Orbit,
    stickers: Vec<Sticker>,
    corner_stickers: Vec<[usize; 3]>,
    edge_stickers: Vec<[usize; 2]>,
    center_stickers: Vec<usize>,
}

static LAYOUT3: LazyLock<Layout> = LazyLock::new(|| Layout::new(3));
static LAYOUT4: LazyLock<Layout> = LazyLock::new(|| Layout::new(4));

impl Layout {
    fn new(n: i8) -> Self {
        let corners = Orbit::corners(n);
        let (edges, centers) = if n == 4 {
            (Orbit::wings(), Some(Orbit::centers()))
        } else {
            (Orbit::edges(), None)
        };
        let mut corner_stickers = vec![[0; 3]; corners.len()];
        let mut edge_stickers = vec![[0; 2]; edges.len()];
        let mut center_stickers = vec![0; centers.as_ref().map_or(0, Orbit::len)];
        let mut layout = Vec::with_capacity(6 * (n * n) as usize);

        for (index, (face, point)) in stickers(n).enumerate() {
            let facelet = |orbit: &Orbit, position: usize| {
                orbit
                    .facelets(position)
                    .iter()
                    .position(|&f| f == face)
                    .unwrap_or_default()
            };
            let sticker = match surface_axes(n, point) {
                3 => corners.position_of(point).map(|position| Sticker::Corner {
                    position,
                    facelet: facelet(&corners, position),
                }),
                2 => edges.position_of(point).map(|position| Sticker::Edge {
                    position,
                    facelet: facelet(&edges, position),
                }),
                _ => centers
                    .as_ref()
                    .and_then(|centers| centers.position_of(point))
                    .map(Sticker::Center),
            }
            .unwrap_or(Sticker::Fixed(face));
            match sticker {
                Sticker::Corner { position, facelet } => corner_stickers[position][facelet] = index,
                Sticker::Edge { position, facelet } => edge_stickers[position][facelet] = index,
                Sticker::Center(position) => center_stickers[position] = index,
                Sticker::Fixed(_) => {}
            }
            layout.push(sticker);
        }

        Layout {
            edges,
            stickers: layout,
            corner_stickers,
            edge_stickers,
            center_stickers,
        }
    }
}

fn parse_colors(s: &str, expected: usize) -> Result<Vec<Face>, FaceletError> {
    let colors = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| Face::from_char(c).ok_or(FaceletError::UnknownColor(c)))
        .collect::<Result<Vec<_>, _>>()?;
    if colors.len() != expected {
        return Err(FaceletError::Length {
            expected,
            found: colors.len(),
        });
    }
    Ok(colors)
}

/// Sticker colors in string order, read through a layout.
struct Stickers<'a> {
    layout: &'a Layout,
    colors: Vec<Face>,
}

impl Stickers<'_> {
    fn corner(&self, position: usize) -> [Face; 3] {
        self.layout.corner_stickers[position].map(|index| self.colors[index])
    }

    fn edge(&self, position: usize) -> [Face; 2] {
        self.layout.edge_stickers[position].map(|index| self.colors[index])
    }

    fn center(&self, position: usize) -> Face {
        self.colors[self.layout.center_stickers[position]]
    }
}

fn color_string(colors: &[Face]) -> String {
    colors.iter().map(|face| face.as_char()).collect()
}

/// The corner with these facelet colors, read clockwise from the position's
/// first facelet, and its twist.
fn identify_corner(colors: &[Face; 3]) -> Result<(u8, u8), FaceletError> {
    for (cubie, faces) in CORNER_FACES.iter().enumerate() {
        for twist in 0..3 {
            if (0..3).all(|j| colors[j] == faces[(j + 3 - twist) % 3]) {
                return Ok((cubie as u8, twist as u8));
            }
        }
    }
    Err(FaceletError::UnknownCorner(color_string(colors)))
}

fn corners(stickers: &Stickers) -> Result<([u8; 8], [u8; 8]), FaceletError> {
    let mut cp = [0; 8];
    let mut co = [0; 8];
    for position in 0..8 {
        (cp[position], co[position]) = identify_corner(&stickers.corner(position))?;
    }
    Ok((cp, co))
}

fn corner_facelet(cp: &[u8; 8], co: &[u8; 8], position: usize, j: usize) -> Face {
    CORNER_FACES[cp[position] as usize][(j + 3 - co[position] as usize) % 3]
}

fn facelet_string(colors: impl IntoIterator<Item = Face>) -> String {
    colors.into_iter().map(Face::as_char).collect()
}

impl Cube4 {
    /// Parse a 96-letter facelet string. Whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Fails on a wrong length, an unknown letter, a sticker combination
    /// that is not a piece, or a state that breaks a cube invariant.
    pub fn from_facelets(s: &str) -> Result<Self, FaceletError> {
        let layout = &*LAYOUT4;
        let stickers = Stickers {
            layout,
            colors: parse_colors(s, 96)?,
        };
        let (cp, co) = corners(&stickers)?;

        let mut wp = [0; 24];
        for (position, wing) in wp.iter_mut().enumerate() {
            let colors = stickers.edge(position);
            let home = (0..24)
                .find(|&home| layout.edges.facelets(home) == colors)
                .ok_or_else(|| FaceletError::UnknownEdge(color_string(&colors)))?;
            *wing = home as u8;
        }

        let mut ct = [Face::U; 24];
        for (position, color) in ct.iter_mut().enumerate() {
            *color = stickers.center(position);
        }

        Ok(Cube4::from_parts(cp, co, wp, ct)?)
    }

    /// The sticker colors in facelet string order.
    fn colors(&self) -> impl Iterator<Item = Face> + '_ {
        let layout = &*LAYOUT4;
        let (cp, co) = (self.corner_permutation(), self.corner_twist());
        layout.stickers.iter().map(move |&sticker| match sticker {
            Sticker::Corner { position, facelet } => corner_facelet(cp, co, position, facelet),
            Sticker::Edge { position, facelet } => {
                let home = self.wing_permutation()[position] as usize;
                layout.edges.facelets(home)[facelet]
            }
            Sticker::Center(position) => self.centers()[position],
            Sticker::Fixed(face) => face,
        })
    }

    #[must_use]
    pub fn to_facelets(&self) -> String {
        facelet_string(self.colors())
    }

    /// The 3x3x3 this cube reduces to: the outer stickers of each face plus
    /// one centre sticker.
    ///
    /// # Errors
    ///
    /// `NotReduced` unless every face's centers match and every edge's wings
    /// are paired, and `Unsolvable` if the reduced cube has a parity error.
    pub fn reduced(&self) -> Result<Cube3, FaceletError> {
        const SHRINK: [usize; 4] = [0, 1, 1, 2];
        let mut reduced = [Face::U; 54];
        let mut filled = [false; 54];
        for (index, color) in self.colors().enumerate() {
            let (face, row, col) = (index / 16, index / 4 % 4, index % 4);
            let target = face * 9 + SHRINK[row] * 3 + SHRINK[col];
            if std::mem::replace(&mut filled[target], true) && reduced[target] != color {
                return Err(FaceletError::NotReduced);
            }
            reduced[target] = color;
        }
        Cube3::from_colors(reduced.to_vec())
    }
}

impl Cube3 {
    /// Parse a 54-letter facelet string. Whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Fails on a wrong length, an unknown letter, a centre that is not its
    /// face's color, a sticker combination that is not a piece, or a state
    /// that face turns cannot solve.
    pub fn from_facelets(s: &str) -> Result<Self, FaceletError> {
        Cube3::from_colors(parse_colors(s, 54)?)
    }

    fn from_colors(colors: Vec<Face>) -> Result<Self, FaceletError> {
        let stickers = Stickers {
            layout: &LAYOUT3,
            colors,
        };
        for (i, face) in Face::ALL.into_iter().enumerate() {
            if stickers.colors[i * 9 + 4] != face {
                return Err(FaceletError::CenterColor(face));
            }
        }
        let (cp, co) = corners(&stickers)?;

        let mut ep = [0; 12];
        let mut eo = [0; 12];
        for position in 0..12 {
            let [a, b] = stickers.edge(position);
            let (edge, flip) = EDGE_FACES
                .iter()
                .enumerate()
                .find_map(|(edge, &faces)| {
                    if faces == [a, b] {
                        Some((edge, 0))
                    } else if faces == [b, a] {
                        Some((edge, 1))
                    } else {
                        None
                    }
                })
                .ok_or_else(|| FaceletError::UnknownEdge(color_string(&[a, b])))?;
            ep[position] = edge as u8;
            eo[position] = flip;
        }

        let cube = Cube3::from_parts(cp, co, ep, eo);
        if cube.is_solvable() {
            Ok(cube)
        } else {
            Err(FaceletError::Unsolvable)
        }
    }

    #[must_use]
    pub fn to_facelets(&self) -> String {
        let (cp, co) = (self.corner_permutation(), self.corner_twist());
        let (ep, eo) = (self.edge_permutation(), self.edge_flip());
        facelet_string(LAYOUT3.stickers.iter().map(|&sticker| match sticker {
            Sticker::Corner { position, facelet } => corner_facelet(cp, co, position, facelet),
            Sticker::Edge { position, facelet } => {
                EDGE_FACES[ep[position] as usize][(facelet + eo[position] as usize) % 2]
            }
            Sticker::Center(position) => Face::ALL[position / 4],
            Sticker::Fixed(face) => face,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::{Algorithm, OUTER_MOVES};

    fn alg(s: &str) -> Algorithm {
        s.parse().unwrap()
    }

    const SOLVED4: &str = "UUUUUUUUUUUUUUUURRRRRRRRRRRRRRRRFFFFFFFFFFFFFFFFDDDDDDDDDDDDDDDDLLLLLLLLLLLLLLLLBBBBBBBBBBBBBBBB";

    #[test]
    fn test_solved_facelets() {
        assert_eq!(Cube4::SOLVED.to_facelets(), SOLVED4);
        assert_eq!(Cube4::from_facelets(SOLVED4), Ok(Cube4::SOLVED));
        let solved3 = Cube3::SOLVED.to_facelets();
        assert_eq!(solved3.len(), 54);
        assert_eq!(Cube3::from_facelets(&solved3), Ok(Cube3::SOLVED));
    }

    #[test]
    fn test_layout_covers_every_sticker_once() {
        for (layout, len, fixed) in [(&*LAYOUT4, 96, 0), (&*LAYOUT3, 54, 6)] {
            let mut indices = layout
                .corner_stickers
                .iter()
                .flatten()
                .chain(layout.edge_stickers.iter().flatten())
                .chain(&layout.center_stickers)
                .copied()
                .collect::<Vec<_>>();
            indices.sort_unstable();
            indices.dedup();
            assert_eq!(indices.len(), len - fixed);
            let fixed_stickers = layout
                .stickers
                .iter()
                .filter(|sticker| matches!(sticker, Sticker::Fixed(_)))
                .count();
            assert_eq!(fixed_stickers, fixed);
        }
    }

    #[test]
    fn test_u_turn_moves_the_top_rows() {
        let facelets = Cube4::SOLVED.apply("U".parse().unwrap()).to_facelets();
        // The top row of F comes from R
        assert_eq!(&facelets[32..36], "RRRR");
        assert_eq!(&facelets[36..48], "FFFFFFFFFFFF");
        assert_eq!(&facelets[0..16], "UUUUUUUUUUUUUUUU");
    }

    #[test]
    fn test_round_trip_random_states() {
        let mut rng = fastrand::Rng::with_seed(5);
        for _ in 0..50 {
            let cube = Cube4::random(&mut rng);
            assert_eq!(Cube4::from_facelets(&cube.to_facelets()), Ok(cube));
        }
    }

    #[test]
    fn test_reduced_cube_matches_outer_turns() {
        let scramble = alg("R U F2 D L' B R2 U' F D2");
        let cube = Cube4::SOLVED.apply_all(scramble.iter());
        let expected = Cube3::SOLVED.apply_all(scramble.iter());
        assert_eq!(cube.reduced(), Ok(expected));
        assert_eq!(Cube3::from_facelets(&expected.to_facelets()), Ok(expected));
        for mv in OUTER_MOVES {
            assert_eq!(cube.apply(mv).reduced(), Ok(expected.apply(mv)));
        }
    }

    #[test]
    fn test_unreduced_cube() {
        let cube = Cube4::SOLVED.apply("Rw".parse().unwrap());
        assert_eq!(cube.reduced(), Err(FaceletError::NotReduced));
    }

    #[test]
    fn test_bad_input() {
        assert_eq!(
            Cube4::from_facelets("UUU"),
            Err(FaceletError::Length {
                expected: 96,
                found: 3
            })
        );
        let mut bad = SOLVED4.to_owned();
        bad.replace_range(0..1, "X");
        assert_eq!(Cube4::from_facelets(&bad), Err(FaceletError::UnknownColor('X')));
        // Two U stickers swapped with R stickers on a corner
        let mut twisted = SOLVED4.to_owned();
        twisted.replace_range(15..16, "R");
        assert!(Cube4::from_facelets(&twisted).is_err());
    }
}
