//! Error types for Kick

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Kick operations
pub type Result<T> = std::result::Result<T, KickError>;

/// Main error type for Kick
#[derive(Error, Debug)]
pub enum KickError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Lockfile and parser cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Failed to read config file '{path}': {error}")]
    Unreadable { path: PathBuf, error: io::Error },

    #[error("Malformed config document: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("Malformed task '{task}': {error}")]
    TaskSyntax {
        task: String,
        error: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Circular task reference detected: {0}")]
    CircularReference(String),

    #[error("Failed to expand file pattern '{pattern}': {error}")]
    Pattern { pattern: String, error: String },

    #[error("Substitution '$({command})' failed: {source}")]
    Substitution {
        command: String,
        #[source]
        source: Box<KickError>,
    },

    #[error("{0} already present in this directory")]
    AlreadyInitialized(String),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Malformed command, unclosed quote in: {0}")]
    MalformedCommand(String),

    #[error("Empty command")]
    EmptyCommand,

    #[error("Failed to spawn '{program}': {error}")]
    Spawn { program: String, error: io::Error },

    #[error("Command '{command}' failed {}{}", format_code(.code), format_stderr(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Worker for '{0}' exited without reporting a result")]
    WorkerLost(String),
}

/// Lockfile and parser cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to stat '{path}': {error}")]
    Stat { path: PathBuf, error: io::Error },

    #[error("Failed to read cache '{path}': {error}")]
    Read { path: PathBuf, error: io::Error },

    #[error("Cache '{path}' is corrupt, refusing to overwrite it: {error}")]
    Decode {
        path: PathBuf,
        error: serde_yaml::Error,
    },

    #[error("Failed to write cache '{path}': {error}")]
    Write { path: PathBuf, error: io::Error },

    #[error("Failed to encode cache: {0}")]
    Encode(#[from] serde_yaml::Error),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("with exit code {}", code),
        None => "after being terminated by a signal".to_string(),
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl KickError {
    /// Whether this error means the requested task does not exist
    pub fn is_task_not_found(&self) -> bool {
        matches!(self, KickError::Config(ConfigError::TaskNotFound(_)))
    }
}
