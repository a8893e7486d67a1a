//! # frontapp-tap
//!
//! Incremental analytics connector for the Front helpdesk API.
//!
//! ## Features
//!
//! - **Rate-limit aware transport**: server budget headers, client-side pacing,
//!   rule-based retries
//! - **Report polling**: positional analytics tables and per-entity reports
//! - **Incremental sync**: daily or hourly windows with a resumable bookmark
//! - **Stable records**: every record of a stream has the same field set
//! - **Output**: Singer-style JSON lines or Parquet
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use frontapp_tap::{
//!     context::TapContext, engine::SyncEngine, output::JsonLinesSink, state::StateManager,
//!     TapConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> frontapp_tap::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let ctx = TapContext::new(config, StateManager::from_file("state.json")?)?;
//!
//!     let mut engine = SyncEngine::from_context(&ctx, Arc::new(ctx.client()?))?;
//!     let mut sink = JsonLinesSink::new(std::io::stdout());
//!     engine.run(&["team_table"], &mut sink).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         SyncEngine                           │
//! │  for stream: for window: fetch → normalize → emit → checkpoint│
//! └──────────────────────────────────────────────────────────────┘
//!          │                 │                 │             │
//! ┌────────┴──────┬──────────┴─────┬───────────┴───┬─────────┴───┐
//! │ cursor        │ report         │ normalize     │ output      │
//! ├───────────────┼────────────────┼───────────────┼─────────────┤
//! │ SyncWindow    │ ReportPoller   │ Positional    │ JSON lines  │
//! │ Bookmarks     │ submit/await   │ Reports       │ Parquet     │
//! └───────────────┴────────────────┴───────────────┴─────────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               │ http (FrontClient)  │
//!               │ budget, pacer, retry│
//!               └─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Tap configuration
pub mod config;

/// Per-run context
pub mod context;

/// HTTP transport with rate limiting and retries
pub mod http;

/// Analytics report polling
pub mod report;

/// Record normalization
pub mod normalize;

/// Sync windows and bookmarks
pub mod cursor;

/// State management and checkpointing
pub mod state;

/// Stream definitions and catalog
pub mod schema;

/// Message sinks (JSON lines, Parquet)
pub mod output;

/// Sync orchestration
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
