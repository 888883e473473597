//! Batch cross-sectional order-book factor engine for Level-10 snapshot
//! CSV archives.
//!
//! Given a tree of `<root>/<MMDD>/<stock>/snapshot.csv` files, computes
//! twenty cross-sectional factors per `(day, time)` pair within the
//! trading-hours emit window and writes one `<MMDD>.csv` per discovered
//! day.
//!
//! ## Pipeline
//!
//! Discovery and chunk planning (`planner`) feed a pool of worker threads
//! (`worker`), one per chunk, each parsing (`parser`) and computing
//! (`factors`) into a map-side accumulator (`accumulator`). Every worker
//! forwards its drained partials to a per-day merger thread (`merger`),
//! which re-aggregates, finalizes to `f32` means, sorts by time of day,
//! and hands the result to the writer (`csv_writer`, backed by
//! `format_f32`). `pipeline` is the driver that wires these together;
//! `config` resolves the layered settings it runs with.
//!
//! `src/config_defaults/default.toml` is a plain resource file pulled in
//! by `config` via `include_str!`, not a module of its own.

pub mod accumulator;
pub mod config;
pub mod csv_writer;
pub mod error;
pub mod factors;
pub mod format_f32;
pub mod merger;
pub mod packed_key;
pub mod parser;
pub mod pipeline;
pub mod planner;
pub mod worker;

pub use config::{Overrides, Settings};
pub use error::EngineError;
pub use pipeline::{RunSummary, run};

/// Crate version, re-exported for CLI `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
