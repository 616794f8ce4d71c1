//! The only primitive the engine has into the player page: submit a script,
//! eventually get one value back (or nothing, if the page went away first).

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

/// Eventual result of one script submission.
pub type Completion = BoxFuture<'static, Option<Value>>;

/// Script-execution surface of the page.
///
/// The page evaluates submissions one at a time on its own thread. Completions
/// are delivered from the host runtime, never from the thread that submitted,
/// so a caller may block on one without starving delivery.
pub trait ExecutionChannel: Send + Sync {
    /// Queue `script` for evaluation. The completion resolves to the script's
    /// value, or `None` when the page was destroyed or navigated away before
    /// the script finished.
    fn submit(&self, script: String) -> Completion;
}

impl<T: ExecutionChannel + ?Sized> ExecutionChannel for Arc<T> {
    fn submit(&self, script: String) -> Completion {
        (**self).submit(script)
    }
}

/// Page lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// A navigation finished; `ok` is false when the load failed.
    Loaded { ok: bool },
    /// The main frame committed a navigation to `url`.
    Navigated { url: String },
    /// The connection to the page is gone.
    Detached,
}
