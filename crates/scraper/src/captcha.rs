//! CAPTCHA stall/resume handshake
//!
//! When the search engine serves a challenge page, the scraper marks the gate
//! blocked and waits. A human solves the challenge out of band and calls
//! [`CaptchaGate::resume`] (the gateway exposes this over HTTP). The wait is
//! bounded; on timeout the scraper gives up with whatever it has.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateStatus {
    Open,
    Blocked { url: String, since: DateTime<Utc> },
}

/// Shared, cloneable handle to the gate state
#[derive(Debug, Clone)]
pub struct CaptchaGate {
    state: Arc<watch::Sender<GateStatus>>,
}

impl Default for CaptchaGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptchaGate {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(GateStatus::Open);
        Self {
            state: Arc::new(sender),
        }
    }

    pub fn status(&self) -> GateStatus {
        self.state.borrow().clone()
    }

    pub fn is_blocked(&self) -> bool {
        matches!(*self.state.borrow(), GateStatus::Blocked { .. })
    }

    /// Record that `url` served a challenge
    pub fn mark_blocked(&self, url: &str) {
        tracing::warn!(url = %url, "Search engine challenge, waiting for manual resume");
        self.state.send_replace(GateStatus::Blocked {
            url: url.to_string(),
            since: Utc::now(),
        });
    }

    /// Reopen the gate. Returns whether it was blocked.
    pub fn resume(&self) -> bool {
        let previous = self.state.send_replace(GateStatus::Open);
        let was_blocked = matches!(previous, GateStatus::Blocked { .. });
        if was_blocked {
            tracing::info!("Challenge resolved, resuming scrape");
        }
        was_blocked
    }

    /// Wait until the gate is open, at most `timeout`. Returns `true` when
    /// open, `false` on timeout.
    pub async fn wait_until_open(&self, timeout: Duration) -> bool {
        let mut receiver = self.state.subscribe();
        let wait = async { receiver.wait_for(|status| *status == GateStatus::Open).await.is_ok() };

        match tokio::time::timeout(timeout, wait).await {
            Ok(opened) => opened,
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Timed out waiting for challenge resume");
                false
            }
        }
    }
}
