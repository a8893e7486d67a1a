//! CLI module
//!
//! Command-line interface for the tap.
//!
//! # Commands
//!
//! - `check` - Validate the token (`GET /me`)
//! - `discover` - Print the catalog
//! - `read` - Sync streams
//! - `streams` - List stream names

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
