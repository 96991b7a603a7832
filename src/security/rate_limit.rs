use crate::config::SecurityConfig;
use metrics::increment_counter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter keyed by client identifier (IP or subject).
///
/// Buckets refill continuously at the configured rate up to the burst
/// capacity. Stale buckets are garbage-collected by the task from
/// [`RateLimiter::spawn_gc`].
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rate,
            burst: burst as f64,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.rate_limit_rps, config.rate_limit_burst)
    }

    /// Take one token for the key. Returns false when the bucket is empty.
    pub fn try_acquire(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            increment_counter!("rate_limit_rejections_total");
            false
        }
    }

    /// Drop buckets that have been idle long enough to be full again.
    pub fn gc(&self, max_idle: Duration) {
        let now = Instant::now();
        self.buckets
            .lock()
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < max_idle);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Periodically garbage-collect stale buckets until shutdown.
    pub fn spawn_gc(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => limiter.gc(interval),
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}
