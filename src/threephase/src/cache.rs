//! On-disk cache of generated pruning tables.
//!
//! A cache file is a small header (magic, format version, coordinate count)
//! followed by the packed table. Any file that fails to load, or whose table
//! does not reach the expected number of coordinates, is regenerated. Cache
//! I/O never fails a solve; problems are logged and the table is rebuilt in
//! memory.

use crate::{
    pruning::{PruningTable, TableError},
    start, success,
};
use log::{debug, info, warn};
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

const MAGIC: &[u8; 4] = b"TPPT";
const VERSION: u32 = 2;
const HEADER_LEN: usize = 16;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCache {
    dir: Option<PathBuf>,
}

impl TableCache {
    /// Keep every table in memory only.
    #[must_use]
    pub fn disabled() -> Self {
        TableCache { dir: None }
    }

    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        TableCache {
            dir: Some(dir.into()),
        }
    }

    /// The per-user cache directory, if the platform has one.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        let mut cache = dirs::cache_dir()?;
        cache.push("threephase");
        Some(cache)
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        let file_name = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect::<String>();
        Some(self.dir.as_ref()?.join(format!("{file_name}.table")))
    }

    /// Load a table with `len` coordinates of which `expected` are reached.
    #[must_use]
    pub fn load(&self, name: &'static str, len: usize, expected: usize) -> Option<PruningTable> {
        let path = self.path(name)?;
        let table = match read_table(&path, name, len) {
            Ok(table) => table,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Ignoring the cached {name} table at {}: {e}", path.display());
                return None;
            }
        };
        if table.reached() != expected {
            warn!(
                "Ignoring the cached {name} table at {}: it reaches {} coordinates instead of {expected}",
                path.display(),
                table.reached(),
            );
            return None;
        }
        debug!("Loaded the {name} table from {}", path.display());
        Some(table)
    }

    /// Save a table, logging rather than failing when it cannot be written.
    pub fn store(&self, table: &PruningTable) {
        let Some(path) = self.path(table.name()) else {
            return;
        };
        match write_table(&path, table) {
            Ok(()) => debug!("Saved the {} table to {}", table.name(), path.display()),
            Err(e) => warn!(
                "Failed to cache the {} table at {}: {e}",
                table.name(),
                path.display()
            ),
        }
    }

    /// Load a table from the cache, or generate and cache it.
    ///
    /// # Errors
    ///
    /// Only generation errors are returned.
    pub fn load_or_generate(
        &self,
        name: &'static str,
        len: usize,
        expected: usize,
        generate: impl FnOnce() -> Result<PruningTable, TableError>,
    ) -> Result<PruningTable, TableError> {
        if let Some(table) = self.load(name, len, expected) {
            return Ok(table);
        }
        let table = generate()?;
        self.store(&table);
        Ok(table)
    }

    /// Delete every cached table.
    ///
    /// # Errors
    ///
    /// Fails if a cache file exists but cannot be removed.
    pub fn clear(&self) -> io::Result<usize> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        info!(start!("Clearing the table cache at {}"), dir.display());
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "table") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(success!("Removed {} cached tables"), removed);
        Ok(removed)
    }
}

fn read_table(path: &Path, name: &'static str, len: usize) -> io::Result<PruningTable> {
    let mut file = fs::File::open(path)?;
    let mut header = [0; HEADER_LEN];
    file.read_exact(&mut header)?;
    let invalid = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_owned());
    if &header[..4] != MAGIC {
        return Err(invalid("not a table file"));
    }
    let mut word = [0; 4];
    word.copy_from_slice(&header[4..8]);
    if u32::from_le_bytes(word) != VERSION {
        return Err(invalid("unsupported format version"));
    }
    let mut count = [0; 8];
    count.copy_from_slice(&header[8..16]);
    if u64::from_le_bytes(count) != len as u64 {
        return Err(invalid("wrong coordinate count"));
    }
    let mut data = Vec::with_capacity(len.div_ceil(2));
    file.read_to_end(&mut data)?;
    PruningTable::from_bytes(name, len, data).ok_or_else(|| invalid("truncated table"))
}

fn write_table(path: &Path, table: &PruningTable) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    // Write then rename so a concurrent reader never sees half a file
    let partial = path.with_extension("partial");
    {
        let mut file = fs::File::create(&partial)?;
        file.write_all(MAGIC)?;
        file.write_all(&VERSION.to_le_bytes())?;
        file.write_all(&(table.len() as u64).to_le_bytes())?;
        file.write_all(table.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&partial, path)
}
