//! Execution context for task running
//!
//! The context is the explicit environment of a run: the project root, the
//! variables exported by `global.environment` and task `env` blocks, and the
//! verbosity used for console output. The parser owns it mutably while
//! resolving placeholders; the executor only reads it. Exported variables
//! reach child processes at spawn time, the real process environment is left
//! untouched.

use colored::Colorize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Execution context that tracks state during parsing and task execution
#[derive(Debug, Clone)]
pub struct Context {
    /// Project root; relative file patterns and child processes use it
    pub working_dir: PathBuf,

    /// Exported variables, layered over the process environment
    pub vars: BTreeMap<String, String>,

    /// Verbosity level
    pub verbosity: Verbosity,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet = 0,
    Normal = 1,
    Verbose = 2,
}

impl Context {
    /// Create a new context rooted at the current directory
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            vars: BTreeMap::new(),
            verbosity: Verbosity::Normal,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Export a variable for later substitutions and child processes
    pub fn set_var(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Look a variable up, exported values first, then the process environment
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
    }

    /// Variables to hand to a spawned child process
    pub fn exports(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    /// Resolve a project-relative path
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.working_dir.join(candidate)
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[INFO]".cyan(), message);
        }
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "✓".green(), message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "✗".red(), message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "[DEBUG]".dimmed(), message);
        }
    }

    /// Print the command about to run
    pub fn print_command(&self, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "Running:".yellow(), command);
        }
    }

    /// Print captured command output
    pub fn print_output(&self, output: &str) {
        if self.verbosity >= Verbosity::Normal && !output.is_empty() {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
