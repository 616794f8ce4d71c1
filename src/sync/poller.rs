use crate::page::channel::ExecutionChannel;
use crate::page::scripts;
use crate::sync::state::{PlaybackSample, PlaybackState};
use crate::sync::store::StateStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// What one capture tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The page gave nothing back (navigating, gone, or too slow).
    NoValue,
    /// The payload was not a record and was stored verbatim.
    Raw(String),
    Saved(PlaybackState),
    /// Capture worked but the file could not be written.
    WriteFailed,
}

/// Periodically samples the page and persists what it finds.
pub struct CapturePoller {
    channel: Arc<dyn ExecutionChannel>,
    store: Arc<StateStore>,
    interval: Duration,
}

impl CapturePoller {
    pub fn new(
        channel: Arc<dyn ExecutionChannel>,
        store: Arc<StateStore>,
        interval: Duration,
    ) -> Self {
        Self {
            channel,
            store,
            interval,
        }
    }

    /// Run one capture. A submission that does not complete within one
    /// interval is abandoned.
    pub async fn tick(&self) -> TickOutcome {
        let completion = self.channel.submit(scripts::capture());
        let value = match tokio::time::timeout(self.interval, completion).await {
            Ok(Some(value)) => value,
            Ok(None) | Err(_) => return TickOutcome::NoValue,
        };

        let payload = match value {
            Value::Null => return TickOutcome::NoValue,
            Value::String(s) => s,
            other => other.to_string(),
        };
        if payload.is_empty() {
            return TickOutcome::NoValue;
        }

        let Some(sample) = PlaybackSample::parse(&payload) else {
            tracing::warn!("Capture returned a malformed payload; storing it verbatim");
            if let Err(e) = self.store.save_raw(&payload).await {
                tracing::warn!("Failed to write playback state: {}", e);
                return TickOutcome::WriteFailed;
            }
            return TickOutcome::Raw(payload);
        };

        let state = self.store.stamp(sample, Utc::now());
        match self.store.save(&state).await {
            Ok(()) => {
                tracing::debug!(
                    "Saved playback state: id={} time={:.1} paused={}",
                    state.id,
                    state.time,
                    state.paused
                );
                TickOutcome::Saved(state)
            }
            Err(e) => {
                tracing::warn!("Failed to write playback state: {}", e);
                TickOutcome::WriteFailed
            }
        }
    }

    /// Tick on the configured interval until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; skip it so the
        // page gets one full interval to come up.
        interval.tick().await;

        tracing::info!("Capture poller started, every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Capture poller stopped");
    }
}
