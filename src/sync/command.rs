use crate::config::schema::CommandSettings;
use crate::error::{BridgeError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Generic minibar controls, tried after every command's own candidates.
pub const FALLBACK_SELECTORS: &[&str] = &[
    "#btn_pc_minibar_play",
    "button.play-btn",
    "button.playorPauseIconStyle_p5dzjle",
    r#"button[title="播放"]"#,
    r#"button[title="暂停"]"#,
    r#"button[title="上一首"]"#,
    r#"button[title="下一首"]"#,
    "button .cmd-icon.cmd-icon-pre",
    "button .cmd-icon.cmd-icon-next",
];

const PLAY_PAUSE_SELECTORS: &[&str] = &[
    "#btn_pc_minibar_play",
    "button.play-btn",
    "button.playorPauseIconStyle_p5dzjle",
    "button.play-pause-btn",
    r#"button[title="播放"]"#,
    r#"button[title="暂停"]"#,
    "span.cmd-icon.cmd-icon-play",
];

const PREVIOUS_SELECTORS: &[&str] = &[
    r#"button[title="上一首"]"#,
    "span.cmd-icon.cmd-icon-pre",
    r#"button[aria-label="pre"]"#,
    "button.cmd-icon-pre",
    "button .cmd-icon.cmd-icon-pre",
];

const NEXT_SELECTORS: &[&str] = &[
    r#"button[title="下一首"]"#,
    "span.cmd-icon.cmd-icon-next",
    r#"button[aria-label="next"]"#,
    "button.cmd-icon-next",
    "button .cmd-icon.cmd-icon-next",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerCommand {
    PlayPause,
    Previous,
    Next,
}

impl PlayerCommand {
    pub const ALL: [PlayerCommand; 3] = [Self::PlayPause, Self::Previous, Self::Next];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayPause => "play/pause",
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }

    /// Built-in candidates for this command
    pub fn default_selectors(&self) -> &'static [&'static str] {
        match self {
            Self::PlayPause => PLAY_PAUSE_SELECTORS,
            Self::Previous => PREVIOUS_SELECTORS,
            Self::Next => NEXT_SELECTORS,
        }
    }
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerCommand {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" | "pause" | "toggle" | "playpause" | "play/pause" => Ok(Self::PlayPause),
            "prev" | "previous" => Ok(Self::Previous),
            "next" => Ok(Self::Next),
            other => Err(BridgeError::Validation(format!(
                "Unknown player command: {}",
                other
            ))),
        }
    }
}

/// What to click and how long to wait for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    primary: Vec<String>,
    fallback: Vec<String>,
    timeout: Duration,
}

impl CommandSpec {
    /// Spec with the built-in fallback list. `timeout_ms` must be positive.
    pub fn new(primary: Vec<String>, timeout_ms: u64) -> Result<Self> {
        if timeout_ms == 0 {
            return Err(BridgeError::Validation(
                "Command timeout must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            primary,
            fallback: FALLBACK_SELECTORS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn primary(&self) -> &[String] {
        &self.primary
    }

    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Every candidate in the order the page tries them
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(self.fallback.iter())
            .map(String::as_str)
    }
}

/// The fixed per-command specs, built once at startup.
#[derive(Debug, Clone)]
pub struct CommandSet {
    play_pause: CommandSpec,
    previous: CommandSpec,
    next: CommandSpec,
}

impl CommandSet {
    pub fn from_settings(settings: &CommandSettings) -> Result<Self> {
        let build = |command: PlayerCommand, overrides: &[String]| {
            let primary = if overrides.is_empty() {
                command
                    .default_selectors()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            } else {
                overrides.to_vec()
            };
            CommandSpec::new(primary, settings.timeout_ms)
        };

        Ok(Self {
            play_pause: build(PlayerCommand::PlayPause, &settings.play_pause)?,
            previous: build(PlayerCommand::Previous, &settings.previous)?,
            next: build(PlayerCommand::Next, &settings.next)?,
        })
    }

    pub fn get(&self, command: PlayerCommand) -> &CommandSpec {
        match command {
            PlayerCommand::PlayPause => &self.play_pause,
            PlayerCommand::Previous => &self.previous,
            PlayerCommand::Next => &self.next,
        }
    }
}
