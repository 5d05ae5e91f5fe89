use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

/// Token bucket pacing outbound dictionary requests.
///
/// Unlike an inbound limiter this never rejects: callers wait until a token
/// is available.
#[derive(Debug)]
pub struct LookupThrottle {
    bucket: Mutex<Bucket>,
    rate_per_sec: f64,
    burst: f64,
    delayed: AtomicU64,
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl LookupThrottle {
    /// Zero values are raised to one.
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
            rate_per_sec: f64::from(rate_per_sec.max(1)),
            burst,
            delayed: AtomicU64::new(0),
        }
    }

    /// Wait for and consume one token.
    pub async fn acquire(&self) {
        let mut waited = false;
        loop {
            let wait = match self.try_consume() {
                Ok(()) => return,
                Err(wait) => wait,
            };
            if !waited {
                waited = true;
                let total = self.delayed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(
                    wait_ms = wait.as_millis() as u64,
                    total_delayed = total,
                    "dictionary lookup throttled"
                );
            }
            sleep(wait).await;
        }
    }

    /// Lookups that had to wait for a token so far.
    pub fn delayed_count(&self) -> u64 {
        self.delayed.load(Ordering::Relaxed)
    }

    fn try_consume(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now
            .saturating_duration_since(bucket.last_refill)
            .as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst);
            bucket.last_refill = now;
        }
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(missing / self.rate_per_sec))
        }
    }
}
