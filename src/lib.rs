//! Kick - a declarative YAML task runner
//!
//! Tasks are declared in a `kick.yml` file together with the files they
//! depend on. A task only runs when one of its files changed since its last
//! successful run, or when it has no files at all.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod lockfile;
pub mod logging;
pub mod runner;

// Re-export commonly used types
pub use error::{KickError, Result};

/// Current version of Kick
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
