//! Task execution engine
//!
//! Tokenizing and running commands, the explicit execution context,
//! placeholder substitution and the dispatch engine that ties them together.

pub mod channel;
pub mod command;
pub mod context;
pub mod executor;
pub mod interpolate;
pub mod tokenize;

pub use channel::*;
pub use command::*;
pub use context::*;
pub use executor::*;
pub use interpolate::*;
pub use tokenize::*;
