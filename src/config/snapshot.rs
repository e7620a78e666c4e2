//! Parser snapshot cache
//!
//! A fully resolved parse result is written to the OS temp directory, keyed
//! by project identity. Loading it skips parsing, substitution commands and
//! globbing. The snapshot carries a schema version; a version mismatch or an
//! undecodable file is a cache miss.

use crate::config::{Global, TaskTable};
use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Bump when the snapshot layout changes
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized parser state
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snapshot {
    pub version: u32,
    pub tasks: TaskTable,
    pub global: Global,
    pub file_paths: Vec<String>,
}

impl Snapshot {
    pub fn new(tasks: TaskTable, global: Global, file_paths: Vec<String>) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            tasks,
            global,
            file_paths,
        }
    }
}

/// Location of one project's snapshot
#[derive(Debug, Clone)]
pub struct ParserCache {
    path: PathBuf,
}

impl ParserCache {
    /// Snapshot for `project_key` inside `dir`
    pub fn new(dir: &Path, project_key: &str) -> Self {
        ParserCache {
            path: dir.join(format!("kick-{}.yml", project_key)),
        }
    }

    /// Snapshot for `project_key` inside the OS temp directory
    pub fn in_temp_dir(project_key: &str) -> Self {
        Self::new(&env::temp_dir(), project_key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the snapshot when a clear is requested or it predates the config
    pub fn prepare(&self, config_path: &Path, clear: bool) -> CacheResult<()> {
        if !self.path.exists() {
            return Ok(());
        }

        if clear || self.is_stale(config_path) {
            debug!(cache = %self.path.display(), clear, "invalidating parser cache");
            self.invalidate()?;
        }

        Ok(())
    }

    /// Whether the snapshot was written before the config was last modified
    pub fn is_stale(&self, config_path: &Path) -> bool {
        match (modified(&self.path), modified(config_path)) {
            (Some(cache), Some(config)) => cache < config,
            _ => true,
        }
    }

    /// Delete the snapshot if present
    pub fn invalidate(&self) -> CacheResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(CacheError::Write {
                path: self.path.clone(),
                error,
            }),
        }
    }

    /// Load the snapshot; any unreadable or outdated file is a miss
    pub fn load(&self) -> Option<Snapshot> {
        let contents = fs::read_to_string(&self.path).ok()?;

        match serde_yaml::from_str::<Snapshot>(&contents) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Some(snapshot),
            Ok(snapshot) => {
                debug!(found = snapshot.version, expected = SNAPSHOT_VERSION, "snapshot version mismatch");
                let _ = self.invalidate();
                None
            }
            Err(e) => {
                warn!(cache = %self.path.display(), error = %e, "discarding undecodable parser cache");
                let _ = self.invalidate();
                None
            }
        }
    }

    /// Persist the snapshot
    pub fn store(&self, snapshot: &Snapshot) -> CacheResult<()> {
        let encoded = serde_yaml::to_string(snapshot)?;
        fs::write(&self.path, encoded).map_err(|error| CacheError::Write {
            path: self.path.clone(),
            error,
        })
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
