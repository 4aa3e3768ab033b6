use std::time::Duration;
use threephase::{
    Algorithm, Config, Cube4, FaceletError, Scrambler, SolveError, Solver, StateMode, Tables,
    scramble::{Rejection, ScrambleError},
    search::SearchError,
};

/// Long enough for any solve on a slow machine, short enough to fail a stalled one.
const SOLVE_TIME_LIMIT: Duration = Duration::from_secs(60);

fn solver() -> Solver {
    Solver::with_tables(Tables::get().unwrap()).with_time_limit(Some(SOLVE_TIME_LIMIT))
}

/// Scramblers take their time limit from the config, which has one by
/// default.
fn scrambler(config: Config) -> Scrambler {
    assert!(config.time_limit().is_some());
    Scrambler::with_solver(config, solver()).unwrap()
}

fn assert_solves(cube: &Cube4, solution: &Algorithm) {
    assert!(cube.apply_all(solution.iter()).is_solved(), "{solution}");
}

#[test_log::test]
fn test_solved_cube() {
    let solution = solver().solve(&Cube4::SOLVED).unwrap();
    assert!(solution.is_empty());
    assert_eq!(solution.phase_lengths(), [0, 0, 0]);
}

#[test_log::test]
fn test_known_scrambles() {
    let solver = solver();
    for scramble in [
        "R U R' U'",
        "Rw U Rw'",
        "R U F2 D L' B",
        "Rw U2 Rw U2 Rw U Rw U2 Rw' U Rw U2 Rw' U Rw U",
        "2R U2 2L' F2 Uw' 2B Fw2 D' 2U Lw",
    ] {
        let cube = Cube4::SOLVED.apply_all(scramble.parse::<Algorithm>().unwrap());
        let solution = solver.solve_scramble(scramble).unwrap();
        assert_solves(&cube, solution.moves());
        assert!(solution.len() <= solver.max_length());
        assert!(solution.len() <= solution.phase_lengths().iter().sum());
    }
}

#[test_log::test]
fn test_random_states() {
    let solver = solver();
    let mut rng = fastrand::Rng::with_seed(1);
    for _ in 0..5 {
        let cube = Cube4::random(&mut rng);
        let solution = solver.solve(&cube).unwrap();
        assert_solves(&cube, solution.moves());
        assert!(solution.len() <= solver.max_length());
    }
}

#[test_log::test]
fn test_facelet_input() {
    let cube = Cube4::SOLVED.apply_all("Rw U2 Fw' 2L D B2".parse::<Algorithm>().unwrap());
    let solution = solver().solve_facelets(&cube.to_facelets()).unwrap();
    assert_solves(&cube, solution.moves());

    assert!(matches!(
        solver().solve_facelets("UUUU"),
        Err(SolveError::Facelets(FaceletError::Length { .. }))
    ));
    assert!(matches!(
        solver().solve_scramble("R U X"),
        Err(SolveError::Moves(_))
    ));
}

#[test_log::test]
fn test_never_longer_than_the_limit() {
    let mut rng = fastrand::Rng::with_seed(2);
    let cube = Cube4::random(&mut rng);
    let result = solver().with_max_length(20).solve(&cube);
    assert!(
        matches!(result, Err(SolveError::GlobalBudgetExceeded { .. })),
        "{result:?}"
    );

    // The same search fits exactly in the moves it used before simplifying
    let solution = solver().solve(&cube).unwrap();
    let used = solution.phase_lengths().iter().sum();
    let tight = solver().with_max_length(used).solve(&cube).unwrap();
    assert_eq!(tight, solution);
}

#[test_log::test]
fn test_time_limit() {
    let mut rng = fastrand::Rng::with_seed(4);
    let result = solver()
        .with_time_limit(Some(Duration::ZERO))
        .solve(&Cube4::random(&mut rng));
    assert!(matches!(
        result,
        Err(SolveError::PhaseSearchExhausted {
            source: SearchError::TimeLimitExceeded,
            ..
        })
    ));
}

#[test_log::test]
fn test_seed_42() {
    let config = Config::default();
    let scramble = scrambler(config.clone()).generate(42).unwrap();
    assert!(scramble.attempts() <= config.attempts);

    let state = Cube4::SOLVED.apply_all(scramble.moves().iter());
    assert_eq!(&state, scramble.state());
    assert!(scramble.solution().len() <= config.max_length);
    assert!(scramble.len() <= config.max_length);
    assert_solves(&state, scramble.solution().moves());

    // Solving the replayed scramble again reaches solved within the limit
    let solution = solver().solve(&state).unwrap();
    assert!(solution.len() <= config.max_length);
    assert_solves(&state, solution.moves());

    // The inverse law
    assert!(state.apply_all(scramble.moves().inverse()).is_solved());
}

#[test_log::test]
fn test_scrambles_are_deterministic() {
    let default = scrambler(Config::default());
    let first = default.generate(7).unwrap();
    let second = default.generate(7).unwrap();
    assert_eq!(first.to_string(), second.to_string());

    let one_thread = scrambler(Config {
        threads: Some(1),
        ..Config::default()
    });
    let three_threads = scrambler(Config {
        threads: Some(3),
        ..Config::default()
    });
    let sequential = one_thread.generate_many(9, 4).unwrap();
    let parallel = three_threads.generate_many(9, 4).unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!(sequential.len(), 4);
}

#[test_log::test]
fn test_random_walk_scrambles() {
    let scrambler = scrambler(Config {
        state_mode: StateMode::RandomWalk,
        walk_length: 60,
        ..Config::default()
    });
    let scramble = scrambler.generate(5).unwrap();
    assert_solves(scramble.state(), scramble.solution().moves());
    assert!(!scramble.is_empty());
}

#[test_log::test]
fn test_short_scrambles_are_rejected() {
    let scrambler = scrambler(Config {
        min_length: 80,
        attempts: 2,
        ..Config::default()
    });
    let result = scrambler.generate(3);
    assert!(matches!(
        result,
        Err(ScrambleError::AttemptsExhausted {
            attempts: 2,
            last: Rejection::TooShort { min_length: 80, .. },
        })
    ));
}

#[test_log::test]
fn test_timed_out_solves_use_up_attempts() {
    let scrambler = scrambler(Config {
        time_limit_ms: Some(1),
        attempts: 2,
        ..Config::default()
    });
    let result = scrambler.generate(6);
    assert!(
        matches!(
            result,
            Err(ScrambleError::AttemptsExhausted {
                attempts: 2,
                last: Rejection::Solve(SolveError::PhaseSearchExhausted {
                    source: SearchError::TimeLimitExceeded,
                    ..
                }),
            })
        ),
        "{result:?}"
    );
}

