use super::types::{
    RawAttributionConfig, RawStorageConfig, RawTrackflowConfig, StorageConfig, TrackflowConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use trackflow_attribution::AttributionSettings;

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "TRACKFLOW_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<TrackflowConfig> {
        let user_path = Self::user_config_path();
        Self::load_from(Some(user_path.as_path()), &Self::project_config_path())
    }

    /// Load and merge the given config files; missing files are skipped
    pub fn load_from(user_path: Option<&Path>, project_path: &Path) -> Result<TrackflowConfig> {
        let mut raw = RawTrackflowConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/trackflow/config.toml`)
    pub fn user_config_path() -> PathBuf {
        trackflow_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with TRACKFLOW_PROJECT_CONFIG_DIR (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".trackflow/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawTrackflowConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawTrackflowConfig, overlay: RawTrackflowConfig) -> RawTrackflowConfig {
        RawTrackflowConfig {
            attribution: RawAttributionConfig {
                enabled: overlay.attribution.enabled.or(base.attribution.enabled),
                default_model: overlay
                    .attribution
                    .default_model
                    .or(base.attribution.default_model),
                attribution_window_days: overlay
                    .attribution
                    .attribution_window_days
                    .or(base.attribution.attribution_window_days),
                time_decay_half_life_days: overlay
                    .attribution
                    .time_decay_half_life_days
                    .or(base.attribution.time_decay_half_life_days),
                position_first_share: overlay
                    .attribution
                    .position_first_share
                    .or(base.attribution.position_first_share),
                position_last_share: overlay
                    .attribution
                    .position_last_share
                    .or(base.attribution.position_last_share),
            },
            storage: RawStorageConfig {
                data_dir: overlay.storage.data_dir.or(base.storage.data_dir),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawTrackflowConfig) -> TrackflowConfig {
        let defaults = AttributionSettings::default();
        let attribution = raw.attribution;

        TrackflowConfig {
            attribution: AttributionSettings {
                enabled: attribution.enabled.unwrap_or(defaults.enabled),
                default_model: attribution.default_model.unwrap_or(defaults.default_model),
                attribution_window_days: attribution
                    .attribution_window_days
                    .unwrap_or(defaults.attribution_window_days),
                time_decay_half_life_days: attribution
                    .time_decay_half_life_days
                    .unwrap_or(defaults.time_decay_half_life_days),
                position_first_share: attribution
                    .position_first_share
                    .unwrap_or(defaults.position_first_share),
                position_last_share: attribution
                    .position_last_share
                    .unwrap_or(defaults.position_last_share),
            },
            storage: raw
                .storage
                .data_dir
                .map(|data_dir| StorageConfig { data_dir })
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::load_from(
            Some(dir.path().join("user.toml").as_path()),
            &dir.path().join("project.toml"),
        )
        .unwrap();

        assert_eq!(config.attribution, AttributionSettings::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = tempdir().unwrap();
        let user = dir.path().join("user/config.toml");
        let project = dir.path().join("project/config.toml");

        write(
            &user,
            r#"
[attribution]
default_model = "Linear"
attribution_window_days = 60

[storage]
data_dir = "/srv/trackflow"
"#,
        );
        write(
            &project,
            r#"
[attribution]
default_model = "Position Based"
"#,
        );

        let config = ConfigLoader::load_from(Some(user.as_path()), &project).unwrap();
        assert_eq!(config.attribution.default_model, "Position Based");
        assert_eq!(config.attribution.attribution_window_days, 60);
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/trackflow"));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("config.toml");
        write(&project, "[attribution\n");

        let err = ConfigLoader::load_from(None, &project).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }

    #[test]
    #[serial]
    fn test_project_path_env_override() {
        unsafe {
            std::env::set_var(PROJECT_CONFIG_DIR_ENV, "/tmp/trackflow-project");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from("/tmp/trackflow-project/config.toml")
        );
        unsafe {
            std::env::remove_var(PROJECT_CONFIG_DIR_ENV);
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".trackflow/config.toml")
        );
    }
}
