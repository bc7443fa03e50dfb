//! Sensor source configuration.
//!
//! The default configuration is a TOML file embedded at compile time. A
//! user file with the same schema replaces it wholesale.

use std::path::Path;

use sensor_map_sensor_models::SensorConfig;

use crate::IngestError;

/// Embedded default: IMD on `Lat1`/`Long1`, Rahat on `Lat2`/`Long2`.
const DEFAULT_CONFIG_TOML: &str = include_str!("../sources/default.toml");

/// Environment variable holding a comma-separated source id filter.
pub const SOURCES_ENV_VAR: &str = "SENSOR_MAP_SOURCES";

/// Returns the embedded default configuration.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse or validate.
#[must_use]
pub fn default_config() -> SensorConfig {
    parse_config(DEFAULT_CONFIG_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded sensor config: {e}"))
}

/// Parses and validates a TOML configuration.
///
/// # Errors
///
/// Returns [`IngestError`] if the TOML is malformed or fails validation.
pub fn parse_config(toml_str: &str) -> Result<SensorConfig, IngestError> {
    let config: SensorConfig = toml::de::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Reads a configuration file, or the embedded default when `path` is
/// `None`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<SensorConfig, IngestError> {
    let Some(path) = path else {
        return Ok(default_config());
    };

    let contents = std::fs::read_to_string(path).map_err(|source| IngestError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents)?;
    log::info!(
        "Loaded {} sensor sources from {}",
        config.sources.len(),
        path.display()
    );
    Ok(config)
}

/// Narrows the configured sources by the `--sources` CLI flag or the
/// `SENSOR_MAP_SOURCES` environment variable. If neither is set, the
/// configuration is returned unchanged.
#[must_use]
pub fn enabled_sources(mut config: SensorConfig, cli_filter: Option<String>) -> SensorConfig {
    let filter = cli_filter.or_else(|| std::env::var(SOURCES_ENV_VAR).ok());

    let Some(filter_str) = filter else {
        return config;
    };

    let ids: Vec<&str> = filter_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let available = config.source_ids().join(", ");

    config.sources.retain(|s| ids.contains(&s.id.as_str()));

    if config.sources.is_empty() {
        log::warn!("No matching sources found for filter {ids:?}. Available: {available}");
    }

    config
}
