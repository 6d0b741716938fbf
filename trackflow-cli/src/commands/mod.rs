//! CLI subcommands

pub mod attribute;
pub mod config;
pub mod import;
pub mod models;
pub mod report;

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use trackflow_attribution::JsonFileStore;

use crate::config::{ConfigLoader, TrackflowConfig};

/// Loaded configuration plus command-line overrides
pub struct Context {
    pub config: TrackflowConfig,
    pub data_dir: PathBuf,
}

impl Context {
    pub fn load(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let config = ConfigLoader::load()?;
        Ok(Self::new(config, data_dir_override))
    }

    pub fn new(config: TrackflowConfig, data_dir_override: Option<PathBuf>) -> Self {
        let data_dir = data_dir_override.unwrap_or_else(|| config.storage.data_dir.clone());
        Self { config, data_dir }
    }

    pub async fn open_store(&self) -> Result<JsonFileStore> {
        Ok(JsonFileStore::open(&self.data_dir).await?)
    }
}

/// Table with the house style used by every listing command
pub(crate) fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render a credit fraction as a percentage
pub(crate) fn percent(credit: f64) -> String {
    format!("{:.1}%", credit * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_override_wins() {
        let ctx = Context::new(TrackflowConfig::default(), Some(PathBuf::from("/tmp/tf")));
        assert_eq!(ctx.data_dir, PathBuf::from("/tmp/tf"));
    }

    #[test]
    fn test_data_dir_defaults_to_config() {
        let config = TrackflowConfig::default();
        let expected = config.storage.data_dir.clone();
        assert_eq!(Context::new(config, None).data_dir, expected);
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(0.4), "40.0%");
        assert_eq!(percent(1.0 / 3.0), "33.3%");
    }
}
