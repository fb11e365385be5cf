//! Declarative catalog configuration
//!
//! A configuration file names the region dataset, the data providers and the metric definitions.
//! It can be written as TOML, YAML or JSON, the format being chosen by the file extension. Paths
//! inside it are relative to the file itself.

mod catalog_config;
mod provider_config;

pub use catalog_config::{CONFIG_FILE_NAMES, Config, DEFAULT_CONFIG_TOML, DEFAULT_REGIONS_CSV};
pub use provider_config::ProviderConfig;
