use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trackflow_attribution::AttributionSettings;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTrackflowConfig {
    #[serde(default)]
    pub attribution: RawAttributionConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,
}

/// Attribution settings as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAttributionConfig {
    pub enabled: Option<bool>,
    pub default_model: Option<String>,
    pub attribution_window_days: Option<u32>,
    pub time_decay_half_life_days: Option<f64>,
    pub position_first_share: Option<f64>,
    pub position_last_share: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    /// Directory holding the touchpoint store
    pub data_dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackflowConfig {
    #[serde(default)]
    pub attribution: AttributionSettings,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the touchpoint store
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: trackflow_paths::data_dir(),
        }
    }
}
