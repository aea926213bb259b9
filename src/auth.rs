//! Picks up the user id the frontend exposes after login.
//!
//! The frontend's profile page renders an `<input easy-apply-id="...">`;
//! authentication polls the page until that attribute shows up.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::errors::EasyfillError;
use crate::messages::ExtensionMessage;
use crate::store::Store;
use crate::surface::{EASY_APPLY_ID_ATTR, FormSurface};

/// Timing of the user id poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait before the first probe, letting the page load
    pub initial_delay: Duration,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Probe until a non-empty id is found or the timeout elapses.
///
/// Probe failures are logged and retried on the next tick.
pub async fn poll_for_user_id<F, Fut>(policy: &PollPolicy, mut probe: F) -> Result<String, EasyfillError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<String>>>,
{
    let start = Instant::now();
    sleep(policy.initial_delay).await;

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match probe().await {
            Ok(Some(id)) if !id.is_empty() => {
                info!("Found user id after {} attempt(s)", attempts);
                return Ok(id);
            }
            Ok(_) => debug!("User id not present yet (attempt {})", attempts),
            Err(e) => warn!("User id probe failed: {:#}", e),
        }

        if start.elapsed() >= policy.timeout {
            return Err(EasyfillError::AuthenticationTimeout(format!(
                "Easy Apply ID not found within {}s",
                policy.timeout.as_secs_f64()
            )));
        }
        sleep(policy.interval).await;
    }
}

/// Poll `surface` for the user id and store it.
///
/// A timeout becomes an `authenticationFailed` message; other errors are
/// returned as is.
pub async fn authenticate<S: FormSurface + ?Sized>(
    surface: &S,
    store: &mut Store,
    policy: &PollPolicy,
) -> Result<ExtensionMessage, EasyfillError> {
    info!("Waiting for the frontend to expose the user id");
    let found = poll_for_user_id(policy, move || surface.input_attribute(EASY_APPLY_ID_ATTR)).await;

    match found {
        Ok(easy_apply_id) => {
            store.set_user_id(&easy_apply_id)?;
            Ok(ExtensionMessage::AuthenticationComplete { easy_apply_id })
        }
        Err(EasyfillError::AuthenticationTimeout(error)) => {
            warn!("Authentication failed: {}", error);
            Ok(ExtensionMessage::AuthenticationFailed { error })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;
