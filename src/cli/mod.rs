//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, shell completion and wiring the
//! parser, lockfile and executor together for a single invocation.

pub mod app;

pub use app::*;
