use threephase::{
    Algorithm, Cube4, Tables,
    pruning::UNREACHED,
    scramble::random_walk,
    search::StageSearch,
    stages::{MaskCoordinate, PHASES, StageKind, Stages},
};

fn stages() -> &'static Stages {
    Tables::get().unwrap()
}

fn mask_coordinates(stages: &Stages) -> Vec<(StageKind, &MaskCoordinate)> {
    let mut coords = vec![];
    for (kind, stage) in [
        (StageKind::RlCenters, &stages.rl_centers),
        (StageKind::FbCenters, &stages.fb_centers),
        (StageKind::WingOrientation, &stages.wing_orientation),
    ] {
        coords.extend(stage.coords().iter().map(|coord| (kind, coord)));
    }
    coords.push((StageKind::WingSlice, stages.wing_slice.centers()));
    coords.push((StageKind::Pairing, stages.pairing.centers()));
    coords
}

#[test_log::test]
fn test_table_sizes() {
    let stages = stages();
    let reached = mask_coordinates(stages)
        .into_iter()
        .map(|(_, coord)| coord.table().reached())
        .collect::<Vec<_>>();
    assert_eq!(
        reached,
        vec![735_471, 25_740, 2_704_156, 343_000, 58_800, 10_080]
    );
    assert_eq!(stages.wing_slice.configs_table().reached(), 8_820_900);
    assert_eq!(stages.pairing.pairing().table().reached(), 161_280);
}

#[test_log::test]
fn test_tables_are_consistent() {
    // A BFS distance changes by at most one per move, so every stored value
    // is a lower bound that never drops by more than one along a path
    let mut rng = fastrand::Rng::with_seed(11);
    for (kind, coord) in mask_coordinates(stages()) {
        let table = coord.table();
        for _ in 0..2000 {
            let rank = rng.u32(..table.len() as u32);
            let value = table.get(rank);
            if value == UNREACHED || value >= 13 {
                continue;
            }
            let mask = coord.unrank(rank);
            for move_index in 0..kind.moves().len() {
                let next = coord.heuristic(coord.apply(mask, move_index));
                assert_ne!(next, UNREACHED, "{} {mask:#x}", table.name());
                assert!(next.abs_diff(value) <= 1, "{} {mask:#x}", table.name());
            }
        }
    }
}

fn phase_of(kind: StageKind) -> usize {
    PHASES
        .iter()
        .position(|phase| phase.stages.contains(&kind))
        .unwrap()
}

fn random_moves(rng: &mut fastrand::Rng, kind: StageKind, length: usize) -> Cube4 {
    let moves = kind.moves();
    (0..length).fold(Cube4::SOLVED, |cube, _| {
        cube.apply(moves[rng.usize(..moves.len())])
    })
}

#[test_log::test]
fn test_later_moves_keep_earlier_goals() {
    let stages = stages();
    let mut rng = fastrand::Rng::with_seed(3);
    for (later, kind) in StageKind::ALL.into_iter().enumerate().skip(1) {
        for _ in 0..20 {
            let cube = random_moves(&mut rng, kind, 30);
            for &earlier in &StageKind::ALL[..later] {
                // Within a phase every stage goal holds; across phases only
                // the phase goal does
                let kept = if phase_of(earlier) == phase_of(kind) || phase_of(earlier) == 0 {
                    stages.heuristic(earlier, &cube) == 0
                } else {
                    cube.reduced().is_ok()
                };
                assert!(
                    kept,
                    "{} moves broke the {} goal",
                    kind.name(),
                    earlier.name()
                );
            }
        }
    }
}

#[test_log::test]
fn test_solved_is_every_goal() {
    let stages = stages();
    for kind in StageKind::ALL {
        assert_eq!(stages.heuristic(kind, &Cube4::SOLVED), 0, "{}", kind.name());
    }
    let mut rng = fastrand::Rng::with_seed(8);
    let cube = Cube4::SOLVED.apply_all(random_walk(&mut rng, 40));
    assert_ne!(stages.heuristic(StageKind::RlCenters, &cube), 0);
    assert_ne!(stages.heuristic(StageKind::RlCenters, &cube), UNREACHED);
}

#[test_log::test]
fn test_wing_slice_stops_where_pairing_can_go_on() {
    let stages = stages();
    let mut rng = fastrand::Rng::with_seed(17);
    for _ in 0..10 {
        let cube = random_moves(&mut rng, StageKind::WingOrientation, 30);
        let node = stages.wing_slice.node(&cube).unwrap();
        let moves = StageSearch::new(&stages.wing_slice)
            .solve(node, |_| true)
            .unwrap();
        let cube = cube.apply_all(moves);
        assert_eq!(stages.heuristic(StageKind::WingSlice, &cube), 0);
        assert_ne!(stages.heuristic(StageKind::Pairing, &cube), UNREACHED);
    }
}

#[test_log::test]
fn test_fb_centers_track_the_wing_parity() {
    let stages = stages();
    // Rw alone is an odd permutation of the wings, Rw2 an even one
    for (moves, odd) in [("Rw", true), ("Rw2", false), ("Rw U Rw'", false)] {
        let cube = Cube4::SOLVED.apply_all(moves.parse::<Algorithm>().unwrap());
        let mask = stages.fb_centers.node(&cube)[0];
        assert_eq!(mask >> 24 == 1, odd, "{moves}");
    }

    // Solved centres with two wings swapped still need the stage
    let solved = Cube4::SOLVED;
    let mut wp = *solved.wing_permutation();
    wp.swap(0, 1);
    let cube = Cube4::from_parts(
        *solved.corner_permutation(),
        *solved.corner_twist(),
        wp,
        *solved.centers(),
    )
    .unwrap();
    let node = stages.fb_centers.node(&cube);
    assert_ne!(stages.heuristic(StageKind::FbCenters, &cube), 0);
    let moves = StageSearch::new(&stages.fb_centers)
        .solve(node, |_| true)
        .unwrap();
    let cube = cube.apply_all(moves);
    assert_eq!(stages.heuristic(StageKind::FbCenters, &cube), 0);
    assert_eq!(stages.fb_centers.node(&cube)[0] >> 24, 0);
}
