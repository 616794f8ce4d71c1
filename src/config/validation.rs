use crate::config::schema::AppConfig;
use crate::error::{BridgeError, Result};

/// Validate the whole configuration before the engine starts
pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_page_url(&config.page.url)?;

    if config.page.devtools_port == 0 {
        return Err(BridgeError::Validation(
            "DevTools port cannot be 0".to_string(),
        ));
    }

    if let Some(path) = &config.page.chrome_path {
        if !path.is_file() {
            return Err(BridgeError::Validation(format!(
                "Browser executable not found at {:?}",
                path
            )));
        }
    }

    let sync = &config.sync;
    if sync.poll_interval_ms == 0 {
        return Err(BridgeError::Validation(
            "Poll interval must be greater than 0".to_string(),
        ));
    }
    if sync.restore_attempts == 0 {
        return Err(BridgeError::Validation(
            "Restore attempts must be greater than 0".to_string(),
        ));
    }
    if sync.restore_interval_ms == 0 {
        return Err(BridgeError::Validation(
            "Restore interval must be greater than 0".to_string(),
        ));
    }

    if config.commands.timeout_ms == 0 {
        return Err(BridgeError::Validation(
            "Command timeout must be greater than 0".to_string(),
        ));
    }

    let overrides = [
        &config.commands.play_pause,
        &config.commands.previous,
        &config.commands.next,
    ];
    if overrides
        .iter()
        .any(|list| list.iter().any(|s| s.trim().is_empty()))
    {
        return Err(BridgeError::Validation(
            "Command selectors cannot be empty strings".to_string(),
        ));
    }

    Ok(())
}

/// Validate the player page URL
pub fn validate_page_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(BridgeError::Validation(
            "Player URL cannot be empty".to_string(),
        ));
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|e| BridgeError::Validation(format!("Invalid player URL {}: {}", url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(BridgeError::Validation(format!(
            "Invalid player URL: {}. Must start with http:// or https://",
            url
        )));
    }

    if parsed.host_str().is_none() {
        return Err(BridgeError::Validation(format!(
            "Player URL has no host: {}",
            url
        )));
    }

    Ok(())
}
