//! Cubie geometry shared by the 4x4x4 and the reduced 3x3x3.
//!
//! Every cubie is identified by its centre in doubled coordinates: on an
//! `n`-cube the layers sit at `-(n-1), -(n-3), ..., n-1`, so all values are
//! integers. `x` points right, `y` up and `z` to the front. Move permutations
//! are derived from these points by rotating them, which keeps both cube
//! models consistent with each other and with the facelet layout.

use crate::moves::{Face, Move};

pub type Point = [i8; 3];

/// Corners in the conventional `URF UFL ULB UBR DFR DLF DBL DRB` order, each
/// with its facelets listed clockwise starting from the U or D facelet.
pub const CORNER_FACES: [[Face; 3]; 8] = {
    use Face::{B, D, F, L, R, U};
    [
        [U, R, F],
        [U, F, L],
        [U, L, B],
        [U, B, R],
        [D, F, R],
        [D, L, F],
        [D, B, L],
        [D, R, B],
    ]
};

/// Edge slots in the conventional `UR UF UL UB DR DF DL DB FR FL BL BR`
/// order. On the 4x4x4 each slot holds two wings.
pub const EDGE_FACES: [[Face; 2]; 12] = {
    use Face::{B, D, F, L, R, U};
    [
        [U, R],
        [U, F],
        [U, L],
        [U, B],
        [D, R],
        [D, F],
        [D, L],
        [D, B],
        [F, R],
        [F, L],
        [B, L],
        [B, R],
    ]
};

/// Rotate a point (or a normal) by one clockwise quarter turn of `face`, as
/// seen looking at that face.
#[must_use]
pub const fn rotate(face: Face, [x, y, z]: Point) -> Point {
    match face {
        Face::R => [x, z, -y],
        Face::L => [x, -z, y],
        Face::U => [-z, y, x],
        Face::D => [z, y, -x],
        Face::F => [y, -x, z],
        Face::B => [-y, x, z],
    }
}

fn scale([x, y, z]: [i8; 3], k: i8) -> Point {
    [x * k, y * k, z * k]
}

fn add(a: Point, b: Point) -> Point {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn det(a: Point, b: Point, c: Point) -> i32 {
    let [a0, a1, a2] = a.map(i32::from);
    let [b0, b1, b2] = b.map(i32::from);
    let [c0, c1, c2] = c.map(i32::from);
    a0 * (b1 * c2 - b2 * c1) - a1 * (b0 * c2 - b2 * c0) + a2 * (b0 * c1 - b1 * c0)
}

/// Where one move sends each cubie of an orbit, and how far it twists it.
///
/// The convention is the one used by every state update in this crate: the
/// cubie at position `i` moves to position `dest[i]`, and its facelet that
/// was at index `0` of position `i` lands on facelet index `twist[i]` of its
/// new position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnMap {
    pub dest: Vec<u8>,
    pub twist: Vec<u8>,
}

/// One kind of cubie on an `n`-cube: its positions and, for each position,
/// the faces its facelets point at.
#[derive(Clone, Debug)]
pub struct Orbit {
    n: i8,
    points: Vec<Point>,
    facelets: Vec<Vec<Face>>,
}

impl Orbit {
    #[must_use]
    pub fn corners(n: i8) -> Self {
        let points = CORNER_FACES
            .iter()
            .map(|faces| faces_point(n, faces))
            .collect();
        Orbit {
            n,
            points,
            facelets: CORNER_FACES.iter().map(|f| f.to_vec()).collect(),
        }
    }

    /// The twelve middle edges of the 3x3x3.
    #[must_use]
    pub fn edges() -> Self {
        let points = EDGE_FACES
            .iter()
            .map(|faces| faces_point(3, faces))
            .collect();
        Orbit {
            n: 3,
            points,
            facelets: EDGE_FACES.iter().map(|f| f.to_vec()).collect(),
        }
    }

    /// The 24 wings of the 4x4x4. Wing `2e + k` sits in edge slot `e`, on the
    /// negative side of the slot's free axis when `k == 0`.
    ///
    /// A wing's facelets are ordered so that they form a right-handed frame
    /// with the direction from the slot's middle towards the wing. Turns
    /// preserve that frame, so wings have no orientation of their own.
    #[must_use]
    pub fn wings() -> Self {
        let mut points = Vec::with_capacity(24);
        let mut facelets = Vec::with_capacity(24);
        for faces in EDGE_FACES {
            let middle = faces_point(4, &faces);
            let free = (0..3).find(|&axis| middle[axis] == 0).unwrap_or_default();
            for side in [-1, 1] {
                let mut point = middle;
                point[free] = side;
                let mut towards = [0; 3];
                towards[free] = side;
                let [a, b] = faces;
                let order = if det(a.normal(), b.normal(), towards) == 1 {
                    vec![a, b]
                } else {
                    vec![b, a]
                };
                points.push(point);
                facelets.push(order);
            }
        }
        Orbit {
            n: 4,
            points,
            facelets,
        }
    }

    /// The 24 centre pieces of the 4x4x4, four per face in `URFDLB` order and
    /// row-major sticker order within a face.
    #[must_use]
    pub fn centers() -> Self {
        let mut points = Vec::with_capacity(24);
        let mut facelets = Vec::with_capacity(24);
        for face in Face::ALL {
            for row in 1..3 {
                for col in 1..3 {
                    points.push(sticker_point(4, face, row, col));
                    facelets.push(vec![face]);
                }
            }
        }
        Orbit {
            n: 4,
            points,
            facelets,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }

    #[must_use]
    pub fn facelets(&self, index: usize) -> &[Face] {
        &self.facelets[index]
    }

    #[must_use]
    pub fn position_of(&self, point: Point) -> Option<usize> {
        self.points.iter().position(|&p| p == point)
    }

    /// Whether `mv` turns the layer containing `point`.
    #[must_use]
    pub fn is_turned(&self, mv: Move, point: Point) -> bool {
        let face = mv.face();
        let axis = face.axis();
        let coord = point[axis] * face.normal()[axis];
        let depth = ((self.n - 1 - coord) / 2) as usize;
        mv.layer().turns_depth(depth)
    }

    /// Compute the effect of `mv` on this orbit.
    #[must_use]
    pub fn turn(&self, mv: Move) -> TurnMap {
        let mut dest = Vec::with_capacity(self.len());
        let mut twist = Vec::with_capacity(self.len());
        for (i, &point) in self.points.iter().enumerate() {
            if !self.is_turned(mv, point) {
                dest.push(i as u8);
                twist.push(0);
                continue;
            }
            let mut moved = point;
            let mut facelet = self.facelets[i][0].normal();
            for _ in 0..mv.power() {
                moved = rotate(mv.face(), moved);
                facelet = rotate(mv.face(), facelet);
            }
            // Rotations permute the cubie positions of a layer among
            // themselves
            let j = self.position_of(moved).unwrap_or(i);
            let k = self.facelets[j]
                .iter()
                .position(|face| face.normal() == facelet)
                .unwrap_or_default();
            dest.push(j as u8);
            twist.push(k as u8);
        }
        TurnMap { dest, twist }
    }
}

fn faces_point(n: i8, faces: &[Face]) -> Point {
    faces
        .iter()
        .fold([0; 3], |acc, face| add(acc, scale(face.normal(), n - 1)))
}

/// The cubie a sticker belongs to, with stickers laid out row-major on each
/// face as seen from the outside with `U` on top (and `B` on top for `D`).
#[must_use]
pub fn sticker_point(n: i8, face: Face, row: i8, col: i8) -> Point {
    let m = n - 1;
    match face {
        Face::U => [-m + 2 * col, m, -m + 2 * row],
        Face::R => [m, m - 2 * row, m - 2 * col],
        Face::F => [-m + 2 * col, m - 2 * row, m],
        Face::D => [-m + 2 * col, -m, m - 2 * row],
        Face::L => [-m, m - 2 * row, -m + 2 * col],
        Face::B => [m - 2 * col, m - 2 * row, -m],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Layer;

    #[test]
    fn test_corner_facelets_are_clockwise() {
        let corners = Orbit::corners(4);
        for i in 0..8 {
            let [a, b, c] = [0, 1, 2].map(|j| corners.facelets(i)[j].normal());
            assert_eq!(det(a, b, c), -1, "corner {i}");
        }
    }

    #[test]
    fn test_r_cycles_corners_like_kociemba() {
        let r = Orbit::corners(3).turn(Move::new(Face::R, Layer::Outer, 1));
        // URF -> UBR -> DRB -> DFR -> URF
        assert_eq!(r.dest, vec![3, 1, 2, 7, 0, 5, 6, 4]);
        assert_eq!(r.twist, vec![1, 0, 0, 2, 2, 0, 0, 1]);
    }

    #[test]
    fn test_only_quarter_f_and_b_flip_edges() {
        let edges = Orbit::edges();
        for face in Face::ALL {
            for power in 1..=3 {
                let map = edges.turn(Move::new(face, Layer::Outer, power));
                let flips = map.twist.iter().filter(|&&t| t == 1).count();
                let expected = matches!(face, Face::F | Face::B) && power != 2;
                assert_eq!(flips, if expected { 4 } else { 0 }, "{face}{power}");
            }
        }
    }

    #[test]
    fn test_wings_never_flip() {
        let wings = Orbit::wings();
        for face in Face::ALL {
            for layer in Layer::ALL {
                for power in 1..=3 {
                    let map = wings.turn(Move::new(face, layer, power));
                    assert!(map.twist.iter().all(|&t| t == 0));
                }
            }
        }
    }

    #[test]
    fn test_turns_are_permutations() {
        for orbit in [
            Orbit::corners(4),
            Orbit::wings(),
            Orbit::centers(),
            Orbit::edges(),
        ] {
            for face in Face::ALL {
                for layer in Layer::ALL {
                    let map = orbit.turn(Move::new(face, layer, 1));
                    let mut seen = vec![false; orbit.len()];
                    for &j in &map.dest {
                        assert!(!seen[j as usize]);
                        seen[j as usize] = true;
                    }
                }
            }
        }
    }

    #[test]
    fn test_layers() {
        let centers = Orbit::centers();
        let count = |mv: Move| {
            (0..24)
                .filter(|&i| centers.is_turned(mv, centers.point(i)))
                .count()
        };
        assert_eq!(count(Move::new(Face::R, Layer::Outer, 1)), 4);
        assert_eq!(count(Move::new(Face::R, Layer::Inner, 1)), 8);
        assert_eq!(count(Move::new(Face::R, Layer::Wide, 1)), 12);
    }
}
