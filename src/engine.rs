use crate::config::schema::AppConfig;
use crate::config::storage::default_state_path;
use crate::error::Result;
use crate::page::channel::{ExecutionChannel, PageEvent};
use crate::sync::{
    CapturePoller, CommandSet, Dispatcher, PlayerCommand, RetryPolicy, StateRestorer, StateStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Command and state-sync engine for one player page.
pub struct SyncEngine {
    channel: Arc<dyn ExecutionChannel>,
    store: Arc<StateStore>,
    commands: CommandSet,
    dispatcher: Dispatcher,
    poll_interval: Duration,
    retry: RetryPolicy,
    runtime: Handle,
}

impl SyncEngine {
    pub async fn new(
        config: &AppConfig,
        channel: Arc<dyn ExecutionChannel>,
        runtime: Handle,
    ) -> Result<Self> {
        let commands = CommandSet::from_settings(&config.commands)?;
        let state_path = config
            .sync
            .state_file
            .clone()
            .unwrap_or_else(default_state_path);
        let store = Arc::new(StateStore::open(state_path).await);
        tracing::info!("Playback state file: {:?}", store.path());

        let dispatcher = Dispatcher::new(
            Arc::clone(&channel),
            runtime.clone(),
            Duration::from_millis(config.commands.grace_ms),
        );

        Ok(Self {
            channel,
            store,
            commands,
            dispatcher,
            poll_interval: Duration::from_millis(config.sync.poll_interval_ms),
            retry: RetryPolicy {
                attempts: config.sync.restore_attempts,
                interval: Duration::from_millis(config.sync.restore_interval_ms),
            },
            runtime,
        })
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Issue `command` and block until it was activated or timed out.
    /// Call from a non-runtime thread (the UI thread).
    pub fn command(&self, command: PlayerCommand) -> bool {
        let clicked = self.dispatcher.dispatch(self.commands.get(command));
        if !clicked {
            tracing::warn!("{} click failed", command);
        }
        clicked
    }

    pub async fn command_async(&self, command: PlayerCommand) -> bool {
        let clicked = self.dispatcher.dispatch_async(self.commands.get(command)).await;
        if !clicked {
            tracing::warn!("{} click failed", command);
        }
        clicked
    }

    pub fn poller(&self) -> CapturePoller {
        CapturePoller::new(
            Arc::clone(&self.channel),
            Arc::clone(&self.store),
            self.poll_interval,
        )
    }

    pub fn restorer(&self) -> StateRestorer {
        StateRestorer::new(Arc::clone(&self.channel), Arc::clone(&self.store), self.retry)
    }

    /// Spawn the capture poller and the page-load watcher.
    pub fn start(&self, events: broadcast::Receiver<PageEvent>) -> EngineHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);

        let poller = self.poller();
        let poll_task = self.runtime.spawn(poller.run(shutdown_rx.clone()));
        let watch_task = self
            .runtime
            .spawn(watch_page(self.restorer(), events, shutdown_rx));

        EngineHandle {
            shutdown,
            tasks: vec![poll_task, watch_task],
        }
    }
}

/// Running engine tasks.
pub struct EngineHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Signal shutdown and wait for the tasks to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Restore saved state after every page load until shutdown.
async fn watch_page(
    restorer: StateRestorer,
    mut events: broadcast::Receiver<PageEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PageEvent::Loaded { ok }) => {
                    restorer.on_page_load(ok).await;
                }
                Ok(PageEvent::Detached) => {
                    tracing::warn!("Page detached; state restore stopped");
                    break;
                }
                Ok(PageEvent::Navigated { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Page watcher skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
