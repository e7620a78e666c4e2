//! Configuration parsing and validation
//!
//! This module handles discovery and parsing of kick.yml files, file pattern
//! expansion, validation and the parser snapshot cache.

pub mod files;
pub mod parse;
pub mod parser;
pub mod schema;
pub mod snapshot;
pub mod types;

// Re-export main types
pub use files::*;
pub use parse::*;
pub use parser::*;
pub use schema::*;
pub use snapshot::*;
pub use types::*;
