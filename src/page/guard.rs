//! Keeps the session on the player's host: any main-frame navigation that
//! leaves it is sent back to the player URL.

use crate::page::cdp::CdpSession;
use crate::page::channel::PageEvent;
use reqwest::Url;
use tokio::sync::broadcast::{self, error::RecvError};

pub struct NavigationGuard {
    home: String,
    host: String,
}

impl NavigationGuard {
    /// `None` when `home` has no host to guard.
    pub fn new(home: &str) -> Option<Self> {
        let host = Url::parse(home).ok()?.host_str()?.to_string();
        Some(Self {
            home: home.to_string(),
            host,
        })
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    /// Whether a navigation to `url` must be redirected home. Chrome's own
    /// error page never is: a redirect from it fails the same way.
    pub fn should_redirect(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "chrome-error" => false,
            Ok(parsed) => parsed.host_str() != Some(self.host.as_str()),
            Err(_) => true,
        }
    }
}

/// Send the page back to the player whenever the main frame leaves its host.
/// Runs until the page detaches.
pub async fn keep_on_player(
    session: CdpSession,
    guard: NavigationGuard,
    mut events: broadcast::Receiver<PageEvent>,
) {
    loop {
        match events.recv().await {
            Ok(PageEvent::Navigated { url }) if guard.should_redirect(&url) => {
                tracing::info!("Left the player ({}); redirecting to player page", url);
                if let Err(e) = session.navigate(guard.home()).await {
                    tracing::warn!("Redirect to player failed: {}", e);
                }
            }
            Ok(PageEvent::Detached) | Err(RecvError::Closed) => break,
            Ok(_) | Err(RecvError::Lagged(_)) => {}
        }
    }
}
