use crate::page::channel::ExecutionChannel;
use crate::page::scripts;
use crate::sync::store::StateStore;
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for the restore script's immediate status.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// In-page retry schedule for a media element that is not ready yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// The load failed; nothing was attempted.
    Skipped,
    /// No usable saved state.
    NothingSaved,
    /// The restore script was submitted; carries its status if one came back.
    Submitted(Option<String>),
}

/// Re-applies the saved position after every successful page load.
pub struct StateRestorer {
    channel: Arc<dyn ExecutionChannel>,
    store: Arc<StateStore>,
    retry: RetryPolicy,
}

impl StateRestorer {
    pub fn new(
        channel: Arc<dyn ExecutionChannel>,
        store: Arc<StateStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            channel,
            store,
            retry,
        }
    }

    pub async fn on_page_load(&self, ok: bool) -> RestoreOutcome {
        if !ok {
            tracing::debug!("Page load failed; not restoring");
            return RestoreOutcome::Skipped;
        }

        let Some(sample) = self.store.load().await else {
            return RestoreOutcome::NothingSaved;
        };

        let script = scripts::restore(
            &sample,
            self.retry.attempts,
            self.retry.interval.as_millis() as u64,
        );
        let completion = self.channel.submit(script);
        let status = tokio::time::timeout(STATUS_TIMEOUT, completion)
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string));

        tracing::info!(
            "Restoring id={} time={:.1} paused={} ({})",
            sample.id,
            sample.time,
            sample.paused,
            status.as_deref().unwrap_or("no status")
        );
        RestoreOutcome::Submitted(status)
    }
}
