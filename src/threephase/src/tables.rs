use crate::{
    cache::TableCache,
    pruning::TableError,
    stages::Stages,
    start, success,
};
use log::info;
use std::{
    sync::{Mutex, OnceLock, PoisonError},
    time::Instant,
};

static TABLES: OnceLock<Stages> = OnceLock::new();
static BUILD_LOCK: Mutex<()> = Mutex::new(());

/// The process-wide stage tables. They are built once, by whichever thread
/// asks first, and shared read-only afterwards.
pub struct Tables;

impl Tables {
    /// The tables, building them in memory on first use.
    ///
    /// # Errors
    ///
    /// Fails if a table does not come out the expected size.
    pub fn get() -> Result<&'static Stages, TableError> {
        Tables::init(&TableCache::disabled())
    }

    /// The tables, building them on first use with `cache` for the on-disk
    /// copies. Later calls return the same tables whatever cache they pass.
    ///
    /// # Errors
    ///
    /// Fails if a table does not come out the expected size. A failed build
    /// is retried by the next call.
    pub fn init(cache: &TableCache) -> Result<&'static Stages, TableError> {
        if let Some(stages) = TABLES.get() {
            return Ok(stages);
        }
        // Poisoning only means another builder panicked; nothing was stored
        let _guard = BUILD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stages) = TABLES.get() {
            return Ok(stages);
        }
        info!(start!("Building the stage tables"));
        let start = Instant::now();
        let stages = Stages::generate(cache)?;
        info!(
            success!("Built the stage tables in {:.3}s"),
            start.elapsed().as_secs_f64()
        );
        Ok(TABLES.get_or_init(|| stages))
    }

    /// Whether the tables have been built.
    #[must_use]
    pub fn is_ready() -> bool {
        TABLES.get().is_some()
    }
}
