use crate::config::schema::PageSettings;
use crate::error::{BridgeError, Result};
use std::path::Path;
use std::process::Command;

/// Build the browser launch command for the player page
pub fn build_command(chrome_path: &Path, settings: &PageSettings) -> Command {
    let mut cmd = Command::new(chrome_path);

    cmd.arg(format!("--remote-debugging-port={}", settings.devtools_port));

    // Keeps login cookies and local storage across restarts
    if let Some(dir) = &settings.user_data_dir {
        cmd.arg(format!("--user-data-dir={}", dir.display()));
    }

    if !settings.user_agent.trim().is_empty() {
        cmd.arg(format!("--user-agent={}", settings.user_agent));
    }

    cmd.arg("--no-first-run");
    cmd.arg("--no-default-browser-check");
    // Lets restored playback start without a user gesture
    cmd.arg("--autoplay-policy=no-user-gesture-required");

    for arg in &settings.extra_args {
        cmd.arg(arg);
    }

    // The session navigates to the player once it has attached
    cmd.arg("about:blank");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Detach from parent process
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }
    }

    cmd
}

/// Launch the browser and return its pid
pub fn launch(chrome_path: &Path, settings: &PageSettings) -> Result<u32> {
    let mut cmd = build_command(chrome_path, settings);
    tracing::info!("Launching browser with command: {:?}", cmd);

    let child = cmd
        .spawn()
        .map_err(|e| BridgeError::Channel(format!("Failed to launch browser: {}", e)))?;
    Ok(child.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|s| s.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_build_command_basic() {
        let settings = PageSettings::default();
        let cmd = build_command(Path::new("/usr/bin/google-chrome"), &settings);
        let args = args_of(&cmd);

        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--user-data-dir")));
        assert!(args
            .iter()
            .any(|a| a.starts_with("--user-agent=Mozilla/5.0 (X11; Linux x86_64)")));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_build_command_with_profile_and_extras() {
        let settings = PageSettings {
            devtools_port: 9333,
            user_data_dir: Some(PathBuf::from("/tmp/player-profile")),
            extra_args: vec!["--disable-gpu".to_string()],
            ..PageSettings::default()
        };

        let cmd = build_command(Path::new("/usr/bin/google-chrome"), &settings);
        let args = args_of(&cmd);

        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/player-profile".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
    }

    #[test]
    fn test_build_command_keeps_browser_user_agent() {
        let settings = PageSettings {
            user_agent: String::new(),
            ..PageSettings::default()
        };

        let cmd = build_command(Path::new("/usr/bin/google-chrome"), &settings);
        assert!(!args_of(&cmd).iter().any(|a| a.starts_with("--user-agent")));
    }
}
