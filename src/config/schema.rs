use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Player page and browser settings
    #[serde(default)]
    pub page: PageSettings,

    /// Capture/restore settings
    #[serde(default)]
    pub sync: SyncSettings,

    /// Player command settings
    #[serde(default)]
    pub commands: CommandSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page: PageSettings::default(),
            sync: SyncSettings::default(),
            commands: CommandSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    /// Player page URL
    #[serde(default = "default_page_url")]
    pub url: String,

    /// Remote debugging port of the browser hosting the page
    #[serde(default = "default_devtools_port")]
    pub devtools_port: u16,

    /// Browser executable. When set, the browser is launched instead of attached to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Browser user data directory (cookies, local storage, cache)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<PathBuf>,

    /// User agent the player page sees. Defaults to a desktop Chrome UA so the
    /// site serves its desktop player; empty keeps the browser's own.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra browser launch arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            url: default_page_url(),
            devtools_port: default_devtools_port(),
            chrome_path: None,
            user_data_dir: None,
            user_agent: default_user_agent(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Persisted playback state file; defaults to the platform data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Total in-page attempts to apply a restored position, including the first
    #[serde(default = "default_restore_attempts")]
    pub restore_attempts: u32,

    #[serde(default = "default_restore_interval_ms")]
    pub restore_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            state_file: None,
            poll_interval_ms: default_poll_interval_ms(),
            restore_attempts: default_restore_attempts(),
            restore_interval_ms: default_restore_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSettings {
    /// Per-command wait bound
    #[serde(default = "default_command_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra slack on top of `timeout_ms` before the caller stops waiting
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Selector overrides; an empty list means the built-in candidates
    #[serde(default)]
    pub play_pause: Vec<String>,

    #[serde(default)]
    pub previous: Vec<String>,

    #[serde(default)]
    pub next: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_command_timeout_ms(),
            grace_ms: default_grace_ms(),
            play_pause: Vec::new(),
            previous: Vec::new(),
            next: Vec::new(),
        }
    }
}

fn default_page_url() -> String {
    "https://music.163.com/st/webplayer".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36"
        .to_string()
}

fn default_devtools_port() -> u16 {
    9222
}

fn default_poll_interval_ms() -> u64 {
    4000
}

fn default_restore_attempts() -> u32 {
    20
}

fn default_restore_interval_ms() -> u64 {
    500
}

fn default_command_timeout_ms() -> u64 {
    1200
}

fn default_grace_ms() -> u64 {
    250
}
