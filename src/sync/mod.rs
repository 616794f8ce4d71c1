pub mod command;
pub mod dispatcher;
pub mod poller;
pub mod restorer;
pub mod state;
pub mod store;

pub use command::{CommandSet, CommandSpec, PlayerCommand, FALLBACK_SELECTORS};
pub use dispatcher::Dispatcher;
pub use poller::{CapturePoller, TickOutcome};
pub use restorer::{RestoreOutcome, RetryPolicy, StateRestorer};
pub use state::{PlaybackSample, PlaybackState};
pub use store::StateStore;
