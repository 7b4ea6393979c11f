/// Service configuration.
///
/// Static configuration (source URL, dataset metadata, phase parameters)
/// lives in a TOML file, `enso.toml` by default. Credentials come from the
/// environment (`HDX_API_KEY`, `HDX_SITE`), loaded via dotenv in main so a
/// local `.env` file works during development.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::analysis::phases::PhaseConfig;
use crate::model::EnsoError;

/// Default HDX site used when `HDX_SITE` is not set.
pub const DEFAULT_HDX_SITE: &str = "https://data.humdata.org";

// ---------------------------------------------------------------------------
// File-backed configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub phases: PhaseConfig,
}

/// Where the raw anomaly table comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// URL of the whitespace-delimited NOAA CPC table
    /// (YR MON TOTAL ClimAdjust ANOM).
    pub base_url: String,
}

/// Static metadata for the published HDX dataset and its CSV resource.
///
/// Field names follow the HDX/CKAN package schema where one exists
/// (`license_id`, `data_update_frequency`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub title: String,
    /// Description attached to the CSV resource.
    pub resource_description: String,
    /// Long-form dataset description (CKAN `notes`).
    pub notes: String,
    pub methodology: String,
    pub caveats: String,
    pub dataset_source: String,
    pub license_id: String,
    pub maintainer: String,
    pub owner_org: String,
    /// Expected days between updates.
    pub data_update_frequency: u32,
    pub tags: Vec<String>,
    /// HXL hashtag per output column, written as the second row of the
    /// resource CSV. Columns without an entry get an empty cell.
    #[serde(default)]
    pub hxl_tags: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Config, EnsoError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EnsoError::ConfigError(format!("cannot read {}: {}", path, e)))?;
        toml::from_str(&raw)
            .map_err(|e| EnsoError::ConfigError(format!("cannot parse {}: {}", path, e)))
    }
}

// ---------------------------------------------------------------------------
// Environment-backed credentials
// ---------------------------------------------------------------------------

/// HDX site and API key, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub site: String,
    pub api_key: Option<String>,
}

impl Credentials {
    /// Read `HDX_SITE` (falling back to the production site) and
    /// `HDX_API_KEY` (absent means read-only: fetch and label but refuse
    /// to publish).
    pub fn from_env() -> Credentials {
        Credentials {
            site: std::env::var("HDX_SITE").unwrap_or_else(|_| DEFAULT_HDX_SITE.to_string()),
            api_key: std::env::var("HDX_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}
