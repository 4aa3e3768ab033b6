use crate::{
    cache::TableCache,
    canonical_fsm::{CanonicalFSM, CanonicalFSMState},
    config::{Config, ConfigError, StateMode},
    cube4::Cube4,
    moves::{Algorithm, SEARCH_MOVES},
    pruning::TableError,
    solver::{SolveError, Solution, Solver},
    start, success,
    tables::Tables,
};
use log::{debug, info, warn};
use std::{
    fmt,
    sync::LazyLock,
    thread::{self, available_parallelism},
    time::Instant,
};
use thiserror::Error;

static WALK_FSM: LazyLock<CanonicalFSM> = LazyLock::new(|| CanonicalFSM::new(&SEARCH_MOVES));

#[derive(Error, Debug)]
pub enum ScrambleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build the pruning tables: {0}")]
    Tables(#[from] TableError),
    #[error("No scramble was found in {attempts} attempts; the last one {last}")]
    AttemptsExhausted { attempts: usize, last: Rejection },
}

/// Why a candidate scramble was thrown away.
#[derive(Error, Debug)]
pub enum Rejection {
    #[error("could not be solved: {0}")]
    Solve(#[from] SolveError),
    #[error("was {length} moves, below the minimum of {min_length}")]
    TooShort { length: usize, min_length: usize },
}

/// A verified scramble: the inverse of a solution of `state`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scramble {
    moves: Algorithm,
    state: Cube4,
    solution: Solution,
    attempts: usize,
}

impl Scramble {
    #[must_use]
    pub fn moves(&self) -> &Algorithm {
        &self.moves
    }

    /// The state the scramble leaves a solved cube in.
    #[must_use]
    pub fn state(&self) -> &Cube4 {
        &self.state
    }

    #[must_use]
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// How many random states were drawn, this one included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl fmt::Display for Scramble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.moves, f)
    }
}

/// A walk of `length` random moves in which no move cancels or commutes
/// back over the one before it.
#[must_use]
pub fn random_walk(rng: &mut fastrand::Rng, length: usize) -> Algorithm {
    let mut fsm_state = CanonicalFSMState::default();
    let mut walk = Algorithm::default();
    for _ in 0..length {
        let legal = (0..SEARCH_MOVES.len())
            .filter_map(|i| Some((i, WALK_FSM.next_state(fsm_state, i)?)))
            .collect::<Vec<_>>();
        let (move_index, next_state) = legal[rng.usize(..legal.len())];
        fsm_state = next_state;
        walk.push(SEARCH_MOVES[move_index]);
    }
    walk
}

pub struct Scrambler {
    config: Config,
    solver: Solver,
}

impl Scrambler {
    /// A scrambler over the process-wide tables, building them first if
    /// needed, through the user cache directory when the configuration
    /// allows it.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or if the tables cannot be built.
    pub fn new(config: Config) -> Result<Self, ScrambleError> {
        config.validate()?;
        let cache = match TableCache::default_dir() {
            Some(dir) if config.cache_tables => TableCache::at(dir),
            _ => TableCache::disabled(),
        };
        let solver = Solver::with_tables(Tables::init(&cache)?);
        Scrambler::with_solver(config, solver)
    }

    /// # Errors
    ///
    /// Fails on an invalid configuration.
    pub fn with_solver(config: Config, solver: Solver) -> Result<Self, ScrambleError> {
        config.validate()?;
        let solver = solver
            .with_max_length(config.max_length)
            .with_time_limit(config.time_limit());
        Ok(Scrambler { config, solver })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn random_state(&self, rng: &mut fastrand::Rng) -> Cube4 {
        match self.config.state_mode {
            StateMode::Uniform => Cube4::random(rng),
            StateMode::RandomWalk => {
                Cube4::SOLVED.apply_all(random_walk(rng, self.config.walk_length))
            }
        }
    }

    /// Draw random states from `seed` until one has a solution of
    /// acceptable length, and return its inverse.
    ///
    /// # Errors
    ///
    /// `AttemptsExhausted` if every attempt was rejected.
    pub fn generate(&self, seed: u64) -> Result<Scramble, ScrambleError> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let state = self.random_state(&mut rng);
            let rejection = match self.solver.solve(&state) {
                Ok(solution) if solution.len() >= self.config.min_length => {
                    return Ok(Scramble {
                        moves: solution.moves().inverse(),
                        state,
                        solution,
                        attempts: attempt,
                    });
                }
                Ok(solution) => Rejection::TooShort {
                    length: solution.len(),
                    min_length: self.config.min_length,
                },
                Err(e) => Rejection::Solve(e),
            };
            if attempt >= self.config.attempts {
                return Err(ScrambleError::AttemptsExhausted {
                    attempts: attempt,
                    last: rejection,
                });
            }
            warn!("Rejected scramble attempt {attempt} for seed {seed}: it {rejection}");
        }
    }

    fn threads(&self) -> usize {
        self.config.threads.unwrap_or_else(|| match available_parallelism() {
            Ok(threads) => threads.get(),
            Err(e) => {
                warn!("{} {e}", "Failed to get available parallelism; defaulting to 1:");
                1
            }
        })
    }

    /// Generate `count` scrambles. Each gets its own seed drawn from `seed`,
    /// so the output does not depend on how many threads share the work.
    ///
    /// # Errors
    ///
    /// Returns the first failure in scramble order.
    pub fn generate_many(&self, seed: u64, count: usize) -> Result<Vec<Scramble>, ScrambleError> {
        let mut master = fastrand::Rng::with_seed(seed);
        let seeds = (0..count).map(|_| master.u64(..)).collect::<Vec<_>>();
        let threads = self.threads().clamp(1, count.max(1));
        info!(
            start!("Generating {} scrambles on {} threads"),
            count, threads
        );
        let start = Instant::now();

        let chunk = count.div_ceil(threads).max(1);
        let mut results: Vec<Option<Result<Scramble, ScrambleError>>> =
            (0..count).map(|_| None).collect();
        thread::scope(|scope| {
            for (seeds, results) in seeds.chunks(chunk).zip(results.chunks_mut(chunk)) {
                scope.spawn(move || {
                    for (&seed, result) in seeds.iter().zip(results) {
                        *result = Some(self.generate(seed));
                    }
                });
            }
        });

        let scrambles = results
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Scramble lengths: {:?}",
            scrambles.iter().map(Scramble::len).collect::<Vec<_>>()
        );
        info!(
            success!("Generated {} scrambles in {:.3}s"),
            scrambles.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(scrambles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_walk_is_canonical() {
        let mut rng = fastrand::Rng::with_seed(7);
        let walk = random_walk(&mut rng, 200);
        assert_eq!(walk.len(), 200);
        for (a, b) in walk.iter().zip(walk.iter().skip(1)) {
            assert_ne!(a.class(), b.class(), "{a} {b}");
        }
        assert_eq!(walk.simplified().len(), 200);
    }

    #[test]
    fn test_random_walk_is_deterministic() {
        let walk = |seed| random_walk(&mut fastrand::Rng::with_seed(seed), 40);
        assert_eq!(walk(42), walk(42));
        assert_ne!(walk(42), walk(43));
    }
}
