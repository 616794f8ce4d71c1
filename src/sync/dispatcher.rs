//! Bounded, synchronous command dispatch over the asynchronous page channel.

use crate::page::channel::ExecutionChannel;
use crate::page::scripts;
use crate::sync::command::CommandSpec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// One-shot completion flag: the first of "result arrived" and "deadline
/// passed" to settle wins, the other is discarded.
#[derive(Clone, Default)]
struct Settle(Arc<AtomicBool>);

impl Settle {
    fn claim(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

pub struct Dispatcher {
    channel: Arc<dyn ExecutionChannel>,
    runtime: Handle,
    grace: Duration,
}

impl Dispatcher {
    /// Completions are serviced on `runtime`; `grace` is how much longer than
    /// a command's timeout a blocking caller may wait.
    pub fn new(channel: Arc<dyn ExecutionChannel>, runtime: Handle, grace: Duration) -> Self {
        Self {
            channel,
            runtime,
            grace,
        }
    }

    /// Activate the control described by `spec`, blocking the calling thread
    /// for at most `spec.timeout()` plus the grace period.
    ///
    /// Meant for threads that are not runtime workers (a UI thread, or one
    /// from `spawn_blocking`). On a worker the wait occupies that worker and,
    /// on a current-thread runtime, ends in `false` once the bound passes;
    /// use [`Dispatcher::dispatch_async`] there.
    pub fn dispatch(&self, spec: &CommandSpec) -> bool {
        let started = Instant::now();
        let settle = Settle::default();
        let (tx, rx) = mpsc::sync_channel::<bool>(1);

        let completion = self.channel.submit(activation_script(spec));
        let timeout = spec.timeout();
        let task_settle = settle.clone();
        self.runtime.spawn(async move {
            let outcome = match tokio::time::timeout(timeout, completion).await {
                Ok(value) => Some(is_true(value)),
                Err(_) => None,
            };
            if !task_settle.claim() {
                tracing::debug!("Discarding late activation result");
                return;
            }
            let _ = tx.send(outcome.unwrap_or(false));
        });

        let clicked = match rx.recv_timeout(timeout + self.grace) {
            Ok(clicked) => clicked,
            Err(_) => {
                // The runtime never got to it; make sure a late result is dropped
                settle.claim();
                false
            }
        };

        log_outcome(spec, clicked, started.elapsed());
        clicked
    }

    /// Same as [`Dispatcher::dispatch`] for callers already on the runtime.
    pub async fn dispatch_async(&self, spec: &CommandSpec) -> bool {
        let started = Instant::now();
        let completion = self.channel.submit(activation_script(spec));

        let clicked = match tokio::time::timeout(spec.timeout(), completion).await {
            Ok(value) => is_true(value),
            Err(_) => false,
        };

        log_outcome(spec, clicked, started.elapsed());
        clicked
    }
}

fn activation_script(spec: &CommandSpec) -> String {
    scripts::activation(spec.primary(), spec.fallback())
}

fn is_true(value: Option<serde_json::Value>) -> bool {
    matches!(value, Some(serde_json::Value::Bool(true)))
}

fn log_outcome(spec: &CommandSpec, clicked: bool, elapsed: Duration) {
    if clicked {
        tracing::debug!("Activated control in {:?}", elapsed);
    } else {
        tracing::warn!(
            "No control activated within {:?} ({} candidates)",
            elapsed,
            spec.candidates().count()
        );
    }
}
