//! Change cache
//!
//! Persists, per project, the modification time each task file had when the
//! task last completed successfully. A stored timestamp older than the file's
//! current one means the file changed since then.
//!
//! The store is a single YAML file shared by every project; each operation
//! re-reads it so that only the active project's entry is ever rewritten.
//! A store that exists but cannot be read or decoded is an error and is
//! never overwritten, since that would drop every other project's entries.

use crate::error::{CacheError, CacheResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;

const LOCKFILE_NAME: &str = "lockfile.yml";
const LOCKFILE_VERSION: u32 = 1;

/// File path to Unix modification time in seconds
pub type Timestamps = HashMap<String, i64>;

#[derive(Debug, Default, Deserialize, Serialize)]
struct Store {
    #[serde(default)]
    version: u32,

    #[serde(default)]
    projects: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Handle on the persisted change cache for one project
#[derive(Debug, Clone)]
pub struct Lockfile {
    path: PathBuf,
    project: String,
    root: PathBuf,
}

impl Lockfile {
    /// Open the store at `path` for `project`, resolving files against `root`
    pub fn new(path: PathBuf, project: impl Into<String>, root: PathBuf) -> Self {
        Lockfile {
            path,
            project: project.into(),
            root,
        }
    }

    /// Per-user cache location, falling back to the OS temp directory
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "kick")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| env::temp_dir().join("kick"))
            .join(LOCKFILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stored timestamps for the active project; empty when none recorded
    pub fn current_project(&self) -> CacheResult<Timestamps> {
        Ok(self
            .read_store()?
            .projects
            .remove(&self.project)
            .map(|entries| entries.into_iter().collect())
            .unwrap_or_default())
    }

    /// Record the current modification time of every file and persist
    pub fn update_timestamps(&self, files: &[String]) -> CacheResult<()> {
        let mut store = self.read_store()?;
        let entries = store.projects.entry(self.project.clone()).or_default();

        for file in files {
            let stamp = mod_time(&self.root.join(file))?;
            entries.insert(file.clone(), stamp);
        }

        debug!(project = %self.project, files = files.len(), "updating lockfile");
        store.version = LOCKFILE_VERSION;
        self.write_store(&store)
    }

    fn read_store(&self) -> CacheResult<Store> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Store::default()),
            Err(error) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    error,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Store::default());
        }

        let store: Store = serde_yaml::from_str(&contents).map_err(|error| CacheError::Decode {
            path: self.path.clone(),
            error,
        })?;

        if store.version != LOCKFILE_VERSION {
            debug!(found = store.version, "ignoring lockfile with another version");
            return Ok(Store::default());
        }

        Ok(store)
    }

    fn write_store(&self, store: &Store) -> CacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| CacheError::Write {
                path: parent.to_path_buf(),
                error,
            })?;
        }

        let encoded = serde_yaml::to_string(store)?;
        fs::write(&self.path, encoded).map_err(|error| CacheError::Write {
            path: self.path.clone(),
            error,
        })
    }
}

/// Modification time of `path` in whole Unix seconds
pub fn mod_time(path: &Path) -> CacheResult<i64> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|error| CacheError::Stat {
            path: path.to_path_buf(),
            error,
        })?;

    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0))
}
