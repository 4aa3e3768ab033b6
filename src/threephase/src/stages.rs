//! The stage descriptors of the three phases.
//!
//! Every stage searches one subgroup of the moves of the stage before it, so
//! a goal reached by one stage stays reached for the rest of the solve.

use crate::{
    cache::TableCache,
    canonical_fsm::CanonicalFSM,
    coord::{BINOMIAL, Coordinate, MaskMover, MoveTable, mask_rank, mask_unrank},
    cube3::{
        CornerPermCoord, Cube3, FlipCoord, SliceCoord, SlicePermCoord, TwistCoord,
        UdEdgePermCoord,
    },
    cube4::{Cube4, parity},
    geometry::Orbit,
    moves::{Face, Layer, Move, OUTER_MOVES, SEARCH_MOVES},
    pairing::{PAIRING_COUNT, PairingTables, SLICE_CONFIGS, WingOrbits},
    pruning::{PruningTable, TableError, UNREACHED},
    search::Stage,
};

const fn mv(face: Face, layer: Layer, power: u8) -> Move {
    Move::new(face, layer, power)
}

/// The outer face turns followed by `extra`.
const fn outer_and<const N: usize>(extra: &[Move]) -> [Move; N] {
    let mut moves = [OUTER_MOVES[0]; N];
    let mut i = 0;
    while i < N {
        moves[i] = if i < 18 { OUTER_MOVES[i] } else { extra[i - 18] };
        i += 1;
    }
    moves
}

/// Every turn that keeps the R and L centers on the R and L faces.
pub const FB_CENTER_MOVES: [Move; 23] = outer_and(&[
    mv(Face::U, Layer::Wide, 2),
    mv(Face::R, Layer::Wide, 1),
    mv(Face::R, Layer::Wide, 2),
    mv(Face::R, Layer::Wide, 3),
    mv(Face::F, Layer::Wide, 2),
]);

/// Every turn that keeps each centre color on its own axis.
pub const WING_ORIENTATION_MOVES: [Move; 21] = outer_and(&[
    mv(Face::U, Layer::Wide, 2),
    mv(Face::R, Layer::Wide, 2),
    mv(Face::F, Layer::Wide, 2),
]);

pub const WING_SLICE_MOVES: [Move; 17] = [
    mv(Face::U, Layer::Outer, 1),
    mv(Face::U, Layer::Outer, 2),
    mv(Face::U, Layer::Outer, 3),
    mv(Face::D, Layer::Outer, 1),
    mv(Face::D, Layer::Outer, 2),
    mv(Face::D, Layer::Outer, 3),
    mv(Face::R, Layer::Outer, 1),
    mv(Face::R, Layer::Outer, 2),
    mv(Face::R, Layer::Outer, 3),
    mv(Face::L, Layer::Outer, 1),
    mv(Face::L, Layer::Outer, 2),
    mv(Face::L, Layer::Outer, 3),
    mv(Face::F, Layer::Outer, 2),
    mv(Face::B, Layer::Outer, 2),
    mv(Face::U, Layer::Wide, 2),
    mv(Face::R, Layer::Wide, 2),
    mv(Face::F, Layer::Wide, 2),
];

pub const PAIRING_MOVES: [Move; 13] = [
    mv(Face::U, Layer::Outer, 1),
    mv(Face::U, Layer::Outer, 2),
    mv(Face::U, Layer::Outer, 3),
    mv(Face::D, Layer::Outer, 1),
    mv(Face::D, Layer::Outer, 2),
    mv(Face::D, Layer::Outer, 3),
    mv(Face::R, Layer::Outer, 2),
    mv(Face::L, Layer::Outer, 2),
    mv(Face::F, Layer::Outer, 2),
    mv(Face::B, Layer::Outer, 2),
    mv(Face::U, Layer::Wide, 2),
    mv(Face::R, Layer::Wide, 2),
    mv(Face::F, Layer::Wide, 2),
];

pub const PERMUTE_MOVES: [Move; 10] = [
    mv(Face::U, Layer::Outer, 1),
    mv(Face::U, Layer::Outer, 2),
    mv(Face::U, Layer::Outer, 3),
    mv(Face::D, Layer::Outer, 1),
    mv(Face::D, Layer::Outer, 2),
    mv(Face::D, Layer::Outer, 3),
    mv(Face::R, Layer::Outer, 2),
    mv(Face::L, Layer::Outer, 2),
    mv(Face::F, Layer::Outer, 2),
    mv(Face::B, Layer::Outer, 2),
];

const URF: [Face; 3] = [Face::U, Face::R, Face::F];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    RlCenters,
    FbCenters,
    WingOrientation,
    WingSlice,
    Pairing,
    Orient,
    Permute,
}

impl StageKind {
    pub const ALL: [StageKind; 7] = [
        StageKind::RlCenters,
        StageKind::FbCenters,
        StageKind::WingOrientation,
        StageKind::WingSlice,
        StageKind::Pairing,
        StageKind::Orient,
        StageKind::Permute,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            StageKind::RlCenters => "R/L centers",
            StageKind::FbCenters => "F/B centers",
            StageKind::WingOrientation => "wing orientation",
            StageKind::WingSlice => "wing slice",
            StageKind::Pairing => "pairing",
            StageKind::Orient => "orient",
            StageKind::Permute => "permute",
        }
    }

    #[must_use]
    pub fn moves(self) -> &'static [Move] {
        match self {
            StageKind::RlCenters => &SEARCH_MOVES,
            StageKind::FbCenters => &FB_CENTER_MOVES,
            StageKind::WingOrientation => &WING_ORIENTATION_MOVES,
            StageKind::WingSlice => &WING_SLICE_MOVES,
            StageKind::Pairing => &PAIRING_MOVES,
            StageKind::Orient => &OUTER_MOVES,
            StageKind::Permute => &PERMUTE_MOVES,
        }
    }

    /// The deepest bound a stage searches before reporting failure.
    #[must_use]
    pub fn max_depth(self) -> u8 {
        match self {
            StageKind::RlCenters => 12,
            StageKind::FbCenters => 11,
            StageKind::WingOrientation => 13,
            StageKind::WingSlice => 14,
            StageKind::Pairing | StageKind::Permute => 18,
            StageKind::Orient => 12,
        }
    }

    /// The stage after this one, whose tables must see a finite distance
    /// wherever this stage stops.
    #[must_use]
    pub fn next(self) -> Option<StageKind> {
        StageKind::ALL.get(self as usize + 1).copied()
    }

    /// Whether the stage works on the reduced 3x3x3.
    #[must_use]
    pub fn is_reduced(self) -> bool {
        matches!(self, StageKind::Orient | StageKind::Permute)
    }
}

/// One of the three phases: a fixed, ordered list of stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseDescriptor {
    pub name: &'static str,
    pub stages: &'static [StageKind],
}

pub const PHASES: [PhaseDescriptor; 3] = [
    PhaseDescriptor {
        name: "centers",
        stages: &[StageKind::RlCenters, StageKind::FbCenters],
    },
    PhaseDescriptor {
        name: "edges",
        stages: &[
            StageKind::WingOrientation,
            StageKind::WingSlice,
            StageKind::Pairing,
        ],
    },
    PhaseDescriptor {
        name: "3x3x3",
        stages: &[StageKind::Orient, StageKind::Permute],
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskPieces {
    /// Centre positions holding one of these colors.
    Centers(&'static [Face]),
    /// Centre positions holding one of these colors, and whether the wing
    /// permutation is odd.
    CentersAndWingParity(&'static [Face]),
    /// Wing positions holding a wing whose home is in this set.
    Wings(u32),
}

impl MaskPieces {
    fn tracks_parity(self) -> bool {
        matches!(self, MaskPieces::CentersAndWingParity(_))
    }
}

/// The bit above the 24 positions that holds the wing parity.
const WING_PARITY: u32 = 1 << 24;
const POSITIONS: u32 = WING_PARITY - 1;

/// A set of positions as a coordinate, with its pruning table.
#[derive(Clone, Debug)]
pub struct MaskCoordinate {
    pieces: MaskPieces,
    size: usize,
    movers: Vec<MaskMover>,
    /// `WING_PARITY` for the moves that flip it when it is tracked.
    flips: Vec<u32>,
    table: PruningTable,
}

impl MaskCoordinate {
    fn movers(pieces: MaskPieces, moves: &[Move]) -> (Vec<MaskMover>, Vec<u32>) {
        let orbit = match pieces {
            MaskPieces::Centers(_) | MaskPieces::CentersAndWingParity(_) => Orbit::centers(),
            MaskPieces::Wings(_) => Orbit::wings(),
        };
        let wings = Orbit::wings();
        moves
            .iter()
            .map(|&mv| {
                let flips = pieces.tracks_parity() && parity(&wings.turn(mv).dest);
                (
                    MaskMover::new(&orbit.turn(mv)),
                    if flips { WING_PARITY } else { 0 },
                )
            })
            .unzip()
    }

    fn rank(tracks_parity: bool, mask: u32) -> u32 {
        if tracks_parity {
            mask_rank(mask & POSITIONS) * 2 + (mask >> 24)
        } else {
            mask_rank(mask)
        }
    }

    /// Build the table of distances from `goals`, every goal having `size`
    /// positions set.
    fn generate(
        cache: &TableCache,
        name: &'static str,
        pieces: MaskPieces,
        moves: &[Move],
        size: usize,
        goals: impl IntoIterator<Item = u32>,
        expected: usize,
    ) -> Result<Self, TableError> {
        let (movers, flips) = MaskCoordinate::movers(pieces, moves);
        let tracks_parity = pieces.tracks_parity();
        let len = BINOMIAL[24][size] as usize * if tracks_parity { 2 } else { 1 };
        let table = cache.load_or_generate(name, len, expected, || {
            PruningTable::generate(
                name,
                len,
                goals,
                movers.len(),
                |mask| MaskCoordinate::rank(tracks_parity, mask),
                |mask, move_index| {
                    movers[move_index].apply(mask) | ((mask & WING_PARITY) ^ flips[move_index])
                },
                expected,
            )
        })?;
        Ok(MaskCoordinate {
            pieces,
            size,
            movers,
            flips,
            table,
        })
    }

    #[must_use]
    pub fn mask(&self, cube: &Cube4) -> u32 {
        match self.pieces {
            MaskPieces::Centers(colors) => cube.center_mask(colors),
            MaskPieces::CentersAndWingParity(colors) => {
                cube.center_mask(colors) | u32::from(parity(cube.wing_permutation())) << 24
            }
            MaskPieces::Wings(homes) => cube.wing_mask(homes),
        }
    }

    #[must_use]
    pub fn apply(&self, mask: u32, move_index: usize) -> u32 {
        self.movers[move_index].apply(mask) | ((mask & WING_PARITY) ^ self.flips[move_index])
    }

    #[must_use]
    pub fn heuristic(&self, mask: u32) -> u8 {
        self.table
            .get(MaskCoordinate::rank(self.pieces.tracks_parity(), mask))
    }

    /// The mask with table index `rank`.
    #[must_use]
    pub fn unrank(&self, rank: u32) -> u32 {
        if self.pieces.tracks_parity() {
            mask_unrank(rank / 2, self.size) | (rank % 2) << 24
        } else {
            mask_unrank(rank, self.size)
        }
    }

    #[must_use]
    pub fn table(&self) -> &PruningTable {
        &self.table
    }

    /// Every mask the table has a finite distance for.
    fn reached(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.table.len() as u32)
            .filter(|&rank| self.table.get(rank) != UNREACHED)
            .map(|rank| self.unrank(rank))
    }
}

/// A stage whose coordinates are one or two position sets.
#[derive(Debug)]
pub struct MaskStage {
    kind: StageKind,
    fsm: CanonicalFSM,
    coords: Vec<MaskCoordinate>,
}

impl MaskStage {
    fn new(kind: StageKind, coords: Vec<MaskCoordinate>) -> Self {
        MaskStage {
            kind,
            fsm: CanonicalFSM::new(kind.moves()),
            coords,
        }
    }

    #[must_use]
    pub fn node(&self, cube: &Cube4) -> [u32; 2] {
        let mut node = [0; 2];
        for (mask, coord) in node.iter_mut().zip(&self.coords) {
            *mask = coord.mask(cube);
        }
        node
    }

    #[must_use]
    pub fn coords(&self) -> &[MaskCoordinate] {
        &self.coords
    }
}

impl Stage for MaskStage {
    type Node = [u32; 2];

    fn kind(&self) -> StageKind {
        self.kind
    }

    fn fsm(&self) -> &CanonicalFSM {
        &self.fsm
    }

    fn next(&self, node: [u32; 2], move_index: usize) -> [u32; 2] {
        let mut next = node;
        for (mask, coord) in next.iter_mut().zip(&self.coords) {
            *mask = coord.apply(*mask, move_index);
        }
        next
    }

    fn heuristic(&self, node: [u32; 2]) -> u8 {
        node.iter()
            .zip(&self.coords)
            .map(|(&mask, coord)| coord.heuristic(mask))
            .max()
            .unwrap_or_default()
    }
}

/// Pairs every wing and finishes the centers.
#[derive(Debug)]
pub struct PairingStage {
    fsm: CanonicalFSM,
    centers: MaskCoordinate,
    pairing: PairingTables,
}

impl PairingStage {
    /// The centre mask and pairing coordinate, or `None` if the wings are
    /// not in the orbits the pairing coordinate describes.
    #[must_use]
    pub fn node(&self, cube: &Cube4) -> Option<(u32, u32)> {
        Some((self.centers.mask(cube), self.pairing.coordinate(cube)?))
    }

    #[must_use]
    pub fn pairing(&self) -> &PairingTables {
        &self.pairing
    }

    #[must_use]
    pub fn centers(&self) -> &MaskCoordinate {
        &self.centers
    }
}

impl Stage for PairingStage {
    type Node = (u32, u32);

    fn kind(&self) -> StageKind {
        StageKind::Pairing
    }

    fn fsm(&self) -> &CanonicalFSM {
        &self.fsm
    }

    fn next(&self, (centers, pairing): (u32, u32), move_index: usize) -> (u32, u32) {
        (
            self.centers.apply(centers, move_index),
            self.pairing.step(pairing, move_index),
        )
    }

    fn heuristic(&self, (centers, pairing): (u32, u32)) -> u8 {
        self.centers
            .heuristic(centers)
            .max(self.pairing.heuristic(pairing))
    }
}

/// Brings each orbit's E-slice wings into the E slice, placed so that the
/// pairing stage can pair them, and the centres to where it can solve them.
#[derive(Debug)]
pub struct WingSliceStage {
    fsm: CanonicalFSM,
    orbits: WingOrbits,
    high: MoveTable,
    low: MoveTable,
    configs: ProductTable,
    centers: MaskCoordinate,
}

impl WingSliceStage {
    fn generate(
        cache: &TableCache,
        orbits: WingOrbits,
        centers: MaskCoordinate,
    ) -> Result<Self, TableError> {
        let [high, low] = orbits.slice_move_tables();
        let configs = ProductTable::generate(
            cache,
            "wing slice",
            &high,
            &low,
            SLICE_CONFIGS,
            SLICE_CONFIGS,
            orbits.slice_goals(),
        )?;
        Ok(WingSliceStage {
            fsm: CanonicalFSM::new(&WING_SLICE_MOVES),
            orbits,
            high,
            low,
            configs,
            centers,
        })
    }

    /// The E-slice configurations and centre mask, or `None` if an E-slice
    /// wing is outside the orbit the wing orientation stage leaves it in.
    #[must_use]
    pub fn node(&self, cube: &Cube4) -> Option<(u16, u16, u32)> {
        let (high, low) = self.orbits.slice_configs(cube)?;
        Some((high, low, self.centers.mask(cube)))
    }

    #[must_use]
    pub fn configs_table(&self) -> &PruningTable {
        &self.configs.table
    }

    #[must_use]
    pub fn centers(&self) -> &MaskCoordinate {
        &self.centers
    }
}

impl Stage for WingSliceStage {
    type Node = (u16, u16, u32);

    fn kind(&self) -> StageKind {
        StageKind::WingSlice
    }

    fn fsm(&self) -> &CanonicalFSM {
        &self.fsm
    }

    fn next(&self, (high, low, centers): (u16, u16, u32), move_index: usize) -> (u16, u16, u32) {
        (
            self.high.apply(high, move_index),
            self.low.apply(low, move_index),
            self.centers.apply(centers, move_index),
        )
    }

    fn heuristic(&self, (high, low, centers): (u16, u16, u32)) -> u8 {
        self.configs
            .get(high, low)
            .max(self.centers.heuristic(centers))
    }
}

/// Two coordinate move tables and the pruning table over their product.
#[derive(Debug)]
struct ProductTable {
    second_count: usize,
    table: PruningTable,
}

impl ProductTable {
    #[allow(clippy::too_many_arguments)]
    fn generate(
        cache: &TableCache,
        name: &'static str,
        first: &MoveTable,
        second: &MoveTable,
        first_count: usize,
        second_count: usize,
        goals: impl IntoIterator<Item = (u16, u16)>,
    ) -> Result<Self, TableError> {
        let len = first_count * second_count;
        let table = cache.load_or_generate(name, len, len, || {
            PruningTable::generate(
                name,
                len,
                goals,
                first.num_moves(),
                |(a, b)| (a as usize * second_count + b as usize) as u32,
                |(a, b), move_index| (first.apply(a, move_index), second.apply(b, move_index)),
                len,
            )
        })?;
        Ok(ProductTable {
            second_count,
            table,
        })
    }

    fn get(&self, first: u16, second: u16) -> u8 {
        self.table
            .get((first as usize * self.second_count + second as usize) as u32)
    }
}

/// Orients corners and edges of the reduced cube and brings the E-slice
/// edges into the E slice.
#[derive(Debug)]
pub struct OrientStage {
    fsm: CanonicalFSM,
    twist: MoveTable,
    flip: MoveTable,
    slice: MoveTable,
    twist_slice: ProductTable,
    flip_slice: ProductTable,
}

impl OrientStage {
    fn generate(cache: &TableCache) -> Result<Self, TableError> {
        let moves = StageKind::Orient.moves();
        let twist = MoveTable::generate::<_, TwistCoord>(Cube3::SOLVED, moves, Cube3::apply);
        let flip = MoveTable::generate::<_, FlipCoord>(Cube3::SOLVED, moves, Cube3::apply);
        let slice = MoveTable::generate::<_, SliceCoord>(Cube3::SOLVED, moves, Cube3::apply);
        let twist_slice = ProductTable::generate(
            cache,
            "twist x slice",
            &twist,
            &slice,
            TwistCoord::COUNT,
            SliceCoord::COUNT,
            [(0, SliceCoord::SOLVED.0)],
        )?;
        let flip_slice = ProductTable::generate(
            cache,
            "flip x slice",
            &flip,
            &slice,
            FlipCoord::COUNT,
            SliceCoord::COUNT,
            [(0, SliceCoord::SOLVED.0)],
        )?;
        Ok(OrientStage {
            fsm: CanonicalFSM::new(moves),
            twist,
            flip,
            slice,
            twist_slice,
            flip_slice,
        })
    }

    #[must_use]
    pub fn node(&self, cube: &Cube3) -> [u16; 3] {
        [
            TwistCoord::from_puzzle(cube).0,
            FlipCoord::from_puzzle(cube).0,
            SliceCoord::from_puzzle(cube).0,
        ]
    }
}

impl Stage for OrientStage {
    type Node = [u16; 3];

    fn kind(&self) -> StageKind {
        StageKind::Orient
    }

    fn fsm(&self) -> &CanonicalFSM {
        &self.fsm
    }

    fn next(&self, [twist, flip, slice]: [u16; 3], move_index: usize) -> [u16; 3] {
        [
            self.twist.apply(twist, move_index),
            self.flip.apply(flip, move_index),
            self.slice.apply(slice, move_index),
        ]
    }

    fn heuristic(&self, [twist, flip, slice]: [u16; 3]) -> u8 {
        self.twist_slice
            .get(twist, slice)
            .max(self.flip_slice.get(flip, slice))
    }
}

/// Solves the reduced cube once it is oriented.
#[derive(Debug)]
pub struct PermuteStage {
    fsm: CanonicalFSM,
    corners: MoveTable,
    ud_edges: MoveTable,
    slice: MoveTable,
    corners_slice: ProductTable,
    edges_slice: ProductTable,
}

impl PermuteStage {
    fn generate(cache: &TableCache) -> Result<Self, TableError> {
        let moves = StageKind::Permute.moves();
        let corners =
            MoveTable::generate::<_, CornerPermCoord>(Cube3::SOLVED, moves, Cube3::apply);
        let ud_edges =
            MoveTable::generate::<_, UdEdgePermCoord>(Cube3::SOLVED, moves, Cube3::apply);
        let slice = MoveTable::generate::<_, SlicePermCoord>(Cube3::SOLVED, moves, Cube3::apply);
        let corners_slice = ProductTable::generate(
            cache,
            "corners x slice",
            &corners,
            &slice,
            CornerPermCoord::COUNT,
            SlicePermCoord::COUNT,
            [(0, 0)],
        )?;
        let edges_slice = ProductTable::generate(
            cache,
            "edges x slice",
            &ud_edges,
            &slice,
            UdEdgePermCoord::COUNT,
            SlicePermCoord::COUNT,
            [(0, 0)],
        )?;
        Ok(PermuteStage {
            fsm: CanonicalFSM::new(moves),
            corners,
            ud_edges,
            slice,
            corners_slice,
            edges_slice,
        })
    }

    #[must_use]
    pub fn node(&self, cube: &Cube3) -> [u16; 3] {
        [
            CornerPermCoord::from_puzzle(cube).0,
            UdEdgePermCoord::from_puzzle(cube).0,
            SlicePermCoord::from_puzzle(cube).0,
        ]
    }
}

impl Stage for PermuteStage {
    type Node = [u16; 3];

    fn kind(&self) -> StageKind {
        StageKind::Permute
    }

    fn fsm(&self) -> &CanonicalFSM {
        &self.fsm
    }

    fn next(&self, [corners, edges, slice]: [u16; 3], move_index: usize) -> [u16; 3] {
        [
            self.corners.apply(corners, move_index),
            self.ud_edges.apply(edges, move_index),
            self.slice.apply(slice, move_index),
        ]
    }

    fn heuristic(&self, [corners, edges, slice]: [u16; 3]) -> u8 {
        self.corners_slice
            .get(corners, slice)
            .max(self.edges_slice.get(edges, slice))
    }
}

/// Every stage with its tables, in solving order.
#[derive(Debug)]
pub struct Stages {
    pub rl_centers: MaskStage,
    pub fb_centers: MaskStage,
    pub wing_orientation: MaskStage,
    pub wing_slice: WingSliceStage,
    pub pairing: PairingStage,
    pub orient: OrientStage,
    pub permute: PermuteStage,
}

impl Stages {
    /// Build every table, loading from and saving to `cache` where it is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Fails if a table does not come out the expected size.
    pub fn generate(cache: &TableCache) -> Result<Self, TableError> {
        let orbits = WingOrbits::compute()?;
        let solved = Cube4::SOLVED;

        let rl = MaskPieces::Centers(&[Face::R, Face::L]);
        let rl_centers = MaskCoordinate::generate(
            cache,
            "R/L centers",
            rl,
            &SEARCH_MOVES,
            8,
            [solved.center_mask(&[Face::R, Face::L])],
            735_471,
        )?;

        // Nothing after this stage changes the wing parity, and the pairing
        // stage can only finish an even wing permutation
        let fb = MaskPieces::CentersAndWingParity(&[Face::F, Face::B]);
        let fb_centers = MaskCoordinate::generate(
            cache,
            "F/B centers",
            fb,
            &FB_CENTER_MOVES,
            8,
            [solved.center_mask(&[Face::F, Face::B])],
            25_740,
        )?;

        // The centre tables of the edge phase chain backwards: each one's
        // goal is everything the next stage can finish
        let urf = MaskPieces::Centers(&URF);
        let pairing_centers = MaskCoordinate::generate(
            cache,
            "pairing centers",
            urf,
            &PAIRING_MOVES,
            12,
            [solved.center_mask(&URF)],
            10_080,
        )?;
        let wing_slice_centers = MaskCoordinate::generate(
            cache,
            "wing slice centers",
            urf,
            &WING_SLICE_MOVES,
            12,
            pairing_centers.reached(),
            58_800,
        )?;
        let wing_orientation_centers = MaskCoordinate::generate(
            cache,
            "wing orientation centers",
            urf,
            &WING_ORIENTATION_MOVES,
            12,
            wing_slice_centers.reached(),
            343_000,
        )?;

        let high = orbits.high();
        let wing_orientation_wings = MaskCoordinate::generate(
            cache,
            "wing orientation",
            MaskPieces::Wings(high),
            &WING_ORIENTATION_MOVES,
            12,
            [high],
            2_704_156,
        )?;
        let wing_slice = WingSliceStage::generate(cache, orbits.clone(), wing_slice_centers)?;

        let pairing = match cache.load("pairing", PAIRING_COUNT, 161_280) {
            Some(table) => PairingTables::with_table(orbits, table),
            None => {
                let pairing = PairingTables::generate(orbits)?;
                cache.store(pairing.table());
                pairing
            }
        };

        Ok(Stages {
            rl_centers: MaskStage::new(StageKind::RlCenters, vec![rl_centers]),
            fb_centers: MaskStage::new(StageKind::FbCenters, vec![fb_centers]),
            wing_orientation: MaskStage::new(
                StageKind::WingOrientation,
                vec![wing_orientation_wings, wing_orientation_centers],
            ),
            wing_slice,
            pairing: PairingStage {
                fsm: CanonicalFSM::new(&PAIRING_MOVES),
                centers: pairing_centers,
                pairing,
            },
            orient: OrientStage::generate(cache)?,
            permute: PermuteStage::generate(cache)?,
        })
    }

    /// The heuristic of a 4x4x4 stage for a cube, `UNREACHED` if the stage
    /// cannot solve it.
    #[must_use]
    pub fn heuristic(&self, kind: StageKind, cube: &Cube4) -> u8 {
        match kind {
            StageKind::RlCenters => self.rl_centers.heuristic(self.rl_centers.node(cube)),
            StageKind::FbCenters => self.fb_centers.heuristic(self.fb_centers.node(cube)),
            StageKind::WingOrientation => self
                .wing_orientation
                .heuristic(self.wing_orientation.node(cube)),
            StageKind::WingSlice => self
                .wing_slice
                .node(cube)
                .map_or(UNREACHED, |node| self.wing_slice.heuristic(node)),
            StageKind::Pairing => self
                .pairing
                .node(cube)
                .map_or(UNREACHED, |node| self.pairing.heuristic(node)),
            StageKind::Orient | StageKind::Permute => match cube.reduced() {
                Ok(reduced) => self.reduced_heuristic(kind, &reduced),
                Err(_) => UNREACHED,
            },
        }
    }

    /// The heuristic of a reduced stage for a 3x3x3.
    #[must_use]
    pub fn reduced_heuristic(&self, kind: StageKind, cube: &Cube3) -> u8 {
        match kind {
            StageKind::Orient => self.orient.heuristic(self.orient.node(cube)),
            StageKind::Permute => {
                let oriented = self.orient.heuristic(self.orient.node(cube)) == 0;
                if oriented {
                    self.permute.heuristic(self.permute.node(cube))
                } else {
                    UNREACHED
                }
            }
            _ => UNREACHED,
        }
    }
}
