use crate::config::schema::AppConfig;
use crate::error::{BridgeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "webplayer-bridge";

/// Get the configuration file path based on platform
pub fn get_config_path() -> PathBuf {
    let config_dir = if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|p| p.join("com.webplayer-bridge.app"))
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
    };

    config_dir.join("config.toml")
}

/// Default location of the persisted playback state
pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("player_state.json")
}

/// Load configuration from the platform path, creating a default file if missing
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&get_config_path())
}

/// Load configuration from `config_path`, creating a default file if missing
pub fn load_config_from(config_path: &Path) -> Result<AppConfig> {
    if !config_path.exists() {
        tracing::info!(
            "Config file not found at {:?}, creating default",
            config_path
        );
        let config = AppConfig::default();
        save_config_to(config_path, &config)?;
        return Ok(config);
    }

    let content = fs::read_to_string(config_path).map_err(|e| {
        BridgeError::Config(format!(
            "Failed to read config from {:?}: {}",
            config_path, e
        ))
    })?;

    let config: AppConfig = toml::from_str(&content)?;

    tracing::info!("Loaded config from {:?}", config_path);
    Ok(config)
}

/// Save configuration to the platform path
pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&get_config_path(), config)
}

pub fn save_config_to(config_path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            BridgeError::Config(format!(
                "Failed to create config directory {:?}: {}",
                parent, e
            ))
        })?;
    }

    let content = toml::to_string_pretty(config)?;

    fs::write(config_path, content).map_err(|e| {
        BridgeError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::info!("Saved config to {:?}", config_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let path = get_config_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_default_state_path() {
        assert!(default_state_path().ends_with("player_state.json"));
    }

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load_keeps_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.page.devtools_port = 9333;
        config.sync.poll_interval_ms = 2000;
        config.commands.next = vec!["button.next-track".to_string()];
        config.page.user_agent = String::new();
        save_config_to(&path, &config).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync]\nrestore_attempts = 5\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.sync.restore_attempts, 5);
        assert_eq!(config.sync.poll_interval_ms, 4000);
        assert_eq!(config.commands.timeout_ms, 1200);
        assert_eq!(config.page.devtools_port, 9222);
        assert!(config.page.user_agent.contains("Chrome/120"));
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync\npoll_interval_ms = ").unwrap();

        assert!(matches!(
            load_config_from(&path),
            Err(BridgeError::TomlDeserialize(_))
        ));
    }
}
