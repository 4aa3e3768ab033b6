#![warn(clippy::pedantic)]
#![allow(
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::module_name_repetitions
)]

pub mod cache;
pub mod canonical_fsm;
pub mod config;
pub mod coord;
pub mod cube3;
pub mod cube4;
pub mod facelets;
pub mod geometry;
pub mod moves;
pub mod pairing;
pub mod pruning;
pub mod scramble;
pub mod search;
pub mod solver;
pub mod stages;
pub mod tables;

pub use cache::TableCache;
pub use config::{Config, ConfigError, StateMode};
pub use cube3::Cube3;
pub use cube4::{Cube4, InvalidState};
pub use facelets::FaceletError;
pub use moves::{Algorithm, Face, Layer, Move, MoveParseError};
pub use pruning::TableError;
pub use scramble::{Scramble, ScrambleError, Scrambler};
pub use solver::{Solution, SolveError, Solver};
pub use tables::Tables;

#[macro_export]
macro_rules! start {
    ($msg:expr) => {
        concat!("⏳ ", $msg)
    };
}

#[macro_export]
macro_rules! working {
    ($msg:expr) => {
        concat!("🛠  ", $msg)
    };
}

#[macro_export]
macro_rules! success {
    ($msg:expr) => {
        concat!("✅ ", $msg)
    };
}
