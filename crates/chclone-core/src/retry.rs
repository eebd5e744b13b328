//! Bounded retry and rate-limit backoff for network-sensitive operations.

use std::{future::Future, time::Duration};

use tracing::{error, warn};

use crate::{pacing::Sleeper, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Fixed wait after a transient protocol error.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Abandoned,
}

/// Wait out a platform rate-limit signal.
pub async fn wait_out(sleeper: &dyn Sleeper, wait: Duration, context: &str) {
    warn!(
        "Too many requests {context}. Waiting {} seconds...",
        wait.as_secs()
    );
    sleeper.sleep(wait).await;
}

/// Run `op` under `policy`.
///
/// - `Transient`: back off for `policy.backoff` and retry.
/// - `RateLimited`: wait the signaled duration and retry. The attempt counts
///   against the budget; the wait is honored even after the last attempt.
/// - anything else: give up immediately.
///
/// Never returns an error: a failed operation is reported as `Abandoned` and
/// logged under `what`.
pub async fn retry_transient<T, F, Fut>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    what: &str,
    mut op: F,
) -> Outcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => return Outcome::Done(v),
            Err(Error::Transient(e)) => {
                if attempt < attempts {
                    warn!(
                        "msg_seqno error for {what}: {e}. Retrying in {} seconds...",
                        policy.backoff.as_secs()
                    );
                    sleeper.sleep(policy.backoff).await;
                } else {
                    warn!("msg_seqno error for {what}: {e}");
                }
            }
            Err(Error::RateLimited { wait }) => {
                wait_out(sleeper, wait, &format!("while sending {what}")).await;
            }
            Err(e) => {
                error!("Error uploading {what}: {e}");
                return Outcome::Abandoned;
            }
        }
    }

    warn!("Giving up on {what} after {attempts} attempts");
    Outcome::Abandoned
}
