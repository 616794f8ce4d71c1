pub mod cdp;
pub mod channel;
#[cfg(test)]
pub(crate) mod devtools_mock;
pub mod guard;
pub mod launcher;
pub mod scripts;

pub use cdp::CdpSession;
pub use channel::{Completion, ExecutionChannel, PageEvent};
pub use guard::{keep_on_player, NavigationGuard};
