pub mod config;
pub mod engine;
pub mod error;
pub mod page;
pub mod sync;

use anyhow::Context;
use engine::SyncEngine;
use page::{keep_on_player, CdpSession, ExecutionChannel, NavigationGuard};
use std::io::BufRead;
use std::sync::Arc;
use sync::PlayerCommand;
use tracing_subscriber::EnvFilter;

/// Attach to (or launch) the browser, run the sync engine, and take player
/// commands from stdin until it closes or `quit` is entered.
pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // A broken config file is reported, never overwritten
    let config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}. Using in-memory defaults.", e);
            config::AppConfig::default()
        }
    };
    config::validate_config(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    if let Some(chrome_path) = &config.page.chrome_path {
        let pid = page::launcher::launch(chrome_path, &config.page)?;
        tracing::info!("Browser started with pid {}", pid);
    }

    let session = runtime.block_on(CdpSession::attach(config.page.devtools_port))?;
    let channel: Arc<dyn ExecutionChannel> = Arc::new(session.clone());
    let engine = runtime.block_on(SyncEngine::new(
        &config,
        channel,
        runtime.handle().clone(),
    ))?;

    // Subscribe before navigating so the first load is seen
    let engine_handle = engine.start(session.subscribe());
    if let Some(guard) = NavigationGuard::new(&config.page.url) {
        runtime.spawn(keep_on_player(session.clone(), guard, session.subscribe()));
    }
    runtime.block_on(session.navigate(&config.page.url))?;

    read_commands(&engine);

    runtime.block_on(async {
        engine_handle.stop().await;
        session.close().await;
    });
    Ok(())
}

/// Stand-in for the tray menu: one command word per line.
fn read_commands(engine: &SyncEngine) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let word = line.trim();
        if word.is_empty() {
            continue;
        }
        if word.eq_ignore_ascii_case("quit") || word.eq_ignore_ascii_case("exit") {
            break;
        }

        match word.parse::<PlayerCommand>() {
            Ok(command) => {
                let clicked = engine.command(command);
                println!(
                    "{}: {}",
                    command,
                    if clicked { "ok" } else { "no control activated" }
                );
            }
            Err(e) => println!("{} (try: play, prev, next, quit)", e),
        }
    }
}
