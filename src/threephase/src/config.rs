use crate::solver::DEFAULT_MAX_LENGTH;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// The minimum random walk length, in canonical moves.
pub const MIN_WALK_LENGTH: usize = 40;

/// Wall clock limit of one solve unless configured otherwise.
pub const DEFAULT_TIME_LIMIT_MS: u64 = 30_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read the configuration file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse the configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How the scrambler draws the state it solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateMode {
    /// Every piece placed uniformly at random, subject to the cube
    /// invariants.
    #[default]
    Uniform,
    /// A random canonical walk from solved.
    RandomWalk,
}

/// Scrambler configuration, in TOML format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The longest solution, and so scramble, that is accepted.
    pub max_length: usize,
    /// Scrambles shorter than this are discarded and drawn again.
    pub min_length: usize,
    /// How many random states one scramble may try before failing.
    pub attempts: usize,
    /// Wall clock limit of one solve, in milliseconds. A solve that runs
    /// out of time counts as a failed attempt.
    pub time_limit_ms: Option<u64>,
    pub state_mode: StateMode,
    /// Length of the walk in random walk mode.
    pub walk_length: usize,
    /// Threads used to generate many scrambles. Defaults to the available
    /// parallelism.
    pub threads: Option<usize>,
    /// Whether pruning tables are kept in the user cache directory.
    pub cache_tables: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_length: DEFAULT_MAX_LENGTH,
            min_length: 0,
            attempts: 8,
            time_limit_ms: Some(DEFAULT_TIME_LIMIT_MS),
            state_mode: StateMode::Uniform,
            walk_length: MIN_WALK_LENGTH,
            threads: None,
            cache_tables: true,
        }
    }
}

impl Config {
    /// The config file under the user configuration directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("threephase");
        path.push("config.toml");
        Some(path)
    }

    /// Parse and validate a configuration.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown keys or inconsistent values.
    pub fn from_toml(path: &Path, toml: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str::<Config>(toml).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or the default config file if there is one, or the
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails if an explicitly given file cannot be read, or if any file read
    /// is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_owned(), true),
            None => match Config::default_path() {
                Some(path) => (path, false),
                None => return Ok(Config::default()),
            },
        };
        match fs::read_to_string(&path) {
            Ok(toml) => {
                debug!("Loading configuration from {}", path.display());
                Config::from_toml(&path, &toml)
            }
            Err(e) if !required && e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// # Errors
    ///
    /// Fails if the values cannot produce any scramble.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length > self.max_length {
            return Err(ConfigError::Invalid(format!(
                "min_length {} is greater than max_length {}",
                self.min_length, self.max_length
            )));
        }
        if self.attempts == 0 {
            return Err(ConfigError::Invalid("attempts must be at least 1".to_owned()));
        }
        if self.walk_length < MIN_WALK_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "walk_length must be at least {MIN_WALK_LENGTH}"
            )));
        }
        if self.time_limit_ms == Some(0) {
            return Err(ConfigError::Invalid("time_limit_ms must be at least 1".to_owned()));
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid("threads must be at least 1".to_owned()));
        }
        Ok(())
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config, ConfigError> {
        Config::from_toml(Path::new("test.toml"), toml)
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_solves_are_bounded_by_default() {
        let limit = Config::default().time_limit().unwrap();
        assert_eq!(limit, Duration::from_millis(DEFAULT_TIME_LIMIT_MS));
        assert!(limit > Duration::ZERO);
    }

    #[test]
    fn test_parse_fields() {
        let config = parse(
            r#"
            max_length = 60
            min_length = 30
            time_limit_ms = 2500
            state_mode = "random-walk"
            walk_length = 100
            threads = 2
            cache_tables = false
            "#,
        )
        .unwrap();
        assert_eq!(config.max_length, 60);
        assert_eq!(config.min_length, 30);
        assert_eq!(config.attempts, 8);
        assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
        assert_eq!(config.state_mode, StateMode::RandomWalk);
        assert_eq!(config.walk_length, 100);
        assert_eq!(config.threads, Some(2));
        assert!(!config.cache_tables);
    }

    #[test]
    fn test_rejects_bad_configs() {
        assert!(matches!(parse("max_moves = 3"), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            parse("min_length = 90"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(parse("walk_length = 10"), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse("attempts = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(
            parse("time_limit_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let missing = Path::new("/nonexistent/threephase.toml");
        assert!(matches!(
            Config::load(Some(missing)),
            Err(ConfigError::Read { .. })
        ));
    }
}
