//! Error taxonomy for the factor engine.
//!
//! Mirrors the two-tier shape used elsewhere in this lineage: one
//! top-level error that a driver can match on, built from `#[from]`
//! conversions of narrower component errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering and partitioning the input tree (C4).
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("input root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("input root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("no trading-day subdirectories found under {0}")]
    NoTradingDays(PathBuf),

    #[error("trading day {day} has no instrument files")]
    EmptyDay { day: String },

    #[error("failed to walk directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A probe path longer than the table mask: a hard internal error, not a
/// runtime condition. The accumulator contract (SPEC_FULL.md §4.3) treats
/// this as a programmer error.
#[derive(Error, Debug)]
pub enum AccumulatorError {
    #[error(
        "accumulator probe overflow: key={key} exceeded mask={mask} probes without finding a slot"
    )]
    ProbeOverflow { key: i32, mask: i32 },
}

/// Errors surfaced while writing a day's output file (C8 / the committer).
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to create temp output file {path}: {source}")]
    CreateTemp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write row to {path}: {source}")]
    WriteRow {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to commit {from} to {to}: {source}")]
    Commit {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level engine error, aggregating every component error via `#[from]`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a thread for day {day} panicked: {message}")]
    ThreadPanic { day: String, message: String },

    #[error("{count} of {total} trading day(s) failed to commit")]
    PartialFailure { count: usize, total: usize },
}
