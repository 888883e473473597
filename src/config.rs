//! Layered configuration: built-in defaults, optional TOML file,
//! environment variables, then CLI flags — each overriding the last.
//!
//! The embedded-default pattern (`include_str!` + `once_cell::sync::Lazy`)
//! mirrors `dukascopy/config.rs` in the crate this engine is adapted from.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::Deserialize;

const DEFAULT_TOML: &str = include_str!("config_defaults/default.toml");

/// Parsed built-in defaults, loaded once.
static DEFAULTS: Lazy<RawConfig> = Lazy::new(|| {
    toml::from_str(DEFAULT_TOML).expect("embedded default.toml must parse")
});

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    engine: EngineSection,
    logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
struct EngineSection {
    channel_capacity: usize,
    accumulator_initial_capacity: usize,
    accumulator_load_factor: f64,
    max_parallelism: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    filter: String,
}

/// Fully resolved settings the driver runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// User-supplied parallelism hint; still clamped to `max_parallelism`
    /// and to hardware parallelism by the split planner.
    pub parallelism_hint: Option<usize>,
    pub channel_capacity: usize,
    pub accumulator_initial_capacity: usize,
    pub accumulator_load_factor: f64,
    pub max_parallelism: usize,
    pub log_filter: String,
}

/// CLI-level overrides, applied last. `None` means "not supplied, fall
/// through to the file/env/default layers".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub parallelism: Option<usize>,
    pub log_filter: Option<String>,
}

impl Settings {
    /// Resolve settings for one run: input/output roots are always
    /// required (there is no sensible default for them), everything else
    /// falls back through file → env → built-in default.
    pub fn resolve(
        input_root: PathBuf,
        output_root: PathBuf,
        overrides: Overrides,
    ) -> Result<Settings, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_TOML, config::FileFormat::Toml));

        if let Some(path) = &overrides.config_file {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        } else {
            builder = builder.add_source(
                config::File::with_name("snapfactors").required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SNAPFACTORS")
                .separator("__")
                .try_parsing(true),
        );

        let raw: RawConfig = builder.build()?.try_deserialize()?;

        Ok(Settings {
            input_root,
            output_root,
            parallelism_hint: overrides.parallelism,
            channel_capacity: raw.engine.channel_capacity,
            accumulator_initial_capacity: raw.engine.accumulator_initial_capacity,
            accumulator_load_factor: raw.engine.accumulator_load_factor,
            max_parallelism: raw.engine.max_parallelism,
            log_filter: overrides.log_filter.unwrap_or(raw.logging.filter),
        })
    }

    /// Effective worker parallelism: `min(parallelism_hint or hw count,
    /// max_parallelism)`, never zero.
    pub fn effective_parallelism(&self) -> usize {
        let hw = self.parallelism_hint.unwrap_or_else(num_cpus::get);
        hw.clamp(1, self.max_parallelism)
    }
}

/// Built-in defaults as a `Settings`, useful for tests that don't need a
/// real input/output tree.
pub fn defaults_for_paths(input_root: impl AsRef<Path>, output_root: impl AsRef<Path>) -> Settings {
    let raw = &*DEFAULTS;
    Settings {
        input_root: input_root.as_ref().to_path_buf(),
        output_root: output_root.as_ref().to_path_buf(),
        parallelism_hint: None,
        channel_capacity: raw.engine.channel_capacity,
        accumulator_initial_capacity: raw.engine.accumulator_initial_capacity,
        accumulator_load_factor: raw.engine.accumulator_load_factor,
        max_parallelism: raw.engine.max_parallelism,
        log_filter: raw.logging.filter.clone(),
    }
}
