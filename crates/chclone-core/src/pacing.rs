use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Suspension point for every intentional wait (pacing, backoff, rate limits).
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Randomized delay between outgoing messages, in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(6),
            max: Duration::from_secs(20),
        }
    }
}

impl Pacing {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let (lo, hi) = if min_secs <= max_secs {
            (min_secs, max_secs)
        } else {
            (max_secs, min_secs)
        };
        Self {
            min: Duration::from_secs(lo),
            max: Duration::from_secs(hi),
        }
    }

    pub fn next_delay(&self) -> Duration {
        let lo = self.min.as_secs();
        let hi = self.max.as_secs().max(lo);
        Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
    }

    pub async fn pause(&self, sleeper: &dyn Sleeper) {
        sleeper.sleep(self.next_delay()).await;
    }
}

#[cfg(test)]
impl Pacing {
    pub fn contains(&self, d: Duration) -> bool {
        d >= self.min && d <= self.max
    }
}
