#![warn(clippy::pedantic)]

use std::{path::PathBuf, time::Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use env_logger::TimestampPrecision;
use itertools::Itertools;
use log::{LevelFilter, info};
use threephase::{Config, Cube4, Scrambler, Solver, TableCache, Tables};

/// Random state scrambles for the 4x4x4, found with a three phase reduction
/// solver
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The scrambler configuration file, in TOML format. Defaults to
    /// threephase/config.toml in the user configuration directory.
    #[arg(long, short = 'c', global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Build the pruning tables in memory instead of using the cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Increase logging verbosity (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print random state scrambles.
    Scramble {
        /// How many scrambles to print.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Seed for reproducible scrambles. Random if not given.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Solve a cube given as 96 facelets or as a scramble sequence.
    Solve {
        /// A 96-letter facelet string in URFDLB face order, or a move
        /// sequence such as "Rw U2 Rw' U2".
        input: String,
    },
    /// Solve random states and report how long each solve took.
    Random {
        /// How many states to solve.
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        /// Seed for the random states. Random if not given.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Delete the cached pruning tables.
    ClearCache,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let mut config = Config::load(cli.config.as_deref()).wrap_err("Failed to load configuration")?;
    if cli.no_cache {
        config.cache_tables = false;
    }

    match cli.command {
        Commands::Scramble { count, seed } => scramble(config, count, seed),
        Commands::Solve { input } => solve(&config, &input),
        Commands::Random { count, seed } => random(&config, count, seed),
        Commands::ClearCache => {
            let Some(dir) = TableCache::default_dir() else {
                return Err(eyre!("This platform has no cache directory"));
            };
            let removed = TableCache::at(&dir).clear()?;
            println!("Removed {removed} cached tables from {}", dir.display());
            Ok(())
        }
    }
}

fn solver(config: &Config) -> color_eyre::Result<Solver> {
    let cache = match TableCache::default_dir() {
        Some(dir) if config.cache_tables => TableCache::at(dir),
        _ => TableCache::disabled(),
    };
    let tables = Tables::init(&cache).wrap_err("Failed to build the pruning tables")?;
    Ok(Solver::with_tables(tables)
        .with_max_length(config.max_length)
        .with_time_limit(config.time_limit()))
}

fn scramble(config: Config, count: usize, seed: Option<u64>) -> color_eyre::Result<()> {
    let seed = seed.unwrap_or_else(|| fastrand::u64(..));
    info!("Scrambling with seed {seed}");
    let scrambler = Scrambler::new(config)?;

    let start = Instant::now();
    let scrambles = scrambler.generate_many(seed, count)?;
    let elapsed = start.elapsed().as_secs_f64();
    for scramble in &scrambles {
        println!("{scramble}");
    }
    info!(
        "Generated {} scrambles in {:.3}s, {:.3}s on average",
        scrambles.len(),
        elapsed,
        elapsed / count.max(1) as f64
    );
    Ok(())
}

fn solve(config: &Config, input: &str) -> color_eyre::Result<()> {
    let solver = solver(config)?;
    let input = input.trim();
    let start = Instant::now();
    // A facelet string is one 96-letter word; moves are separated by spaces
    let solution = if input.len() == 96 && !input.contains(char::is_whitespace) {
        solver.solve_facelets(input)?
    } else {
        solver.solve_scramble(input)?
    };
    println!("{solution}");
    info!(
        "Solved in {:.3}s with {} moves ({} per phase)",
        start.elapsed().as_secs_f64(),
        solution.len(),
        solution.phase_lengths().iter().join(" + ")
    );
    Ok(())
}

fn random(config: &Config, count: usize, seed: Option<u64>) -> color_eyre::Result<()> {
    let solver = solver(config)?;
    let mut rng = fastrand::Rng::with_seed(seed.unwrap_or_else(|| fastrand::u64(..)));

    let mut total = 0.0;
    for _ in 0..count {
        let cube = Cube4::random(&mut rng);
        let start = Instant::now();
        let solution = solver.solve(&cube)?;
        let elapsed = start.elapsed().as_secs_f64();
        total += elapsed;
        println!("{solution}");
        println!("Solved in {elapsed:.3}s with {} moves", solution.len());
    }
    println!("Average time: {:.3}s", total / count.max(1) as f64);
    Ok(())
}
