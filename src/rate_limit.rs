//! Token bucket rate limiter for outbound provider calls
//!
//! One bucket is shared by every request a transport makes. Callers that find
//! the bucket empty sleep until the next token is due instead of failing

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

/// Alpha Vantage's free tier allows 5 calls per minute
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;

/// Default bucket capacity (allows a short burst)
const DEFAULT_BUCKET_CAPACITY: f64 = 1.0;

/// Rate limiter configuration
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum requests per minute
    pub requests_per_minute: u32,
    /// Maximum burst capacity
    pub burst_capacity: f64,
}

impl RateLimitConfig {
    /// Configuration for a given per-minute budget with the default burst
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            ..Self::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens
    tokens: f64,
    /// Last time the bucket was updated
    last_update: Instant,
    /// Token refill rate (tokens per second)
    rate: f64,
    /// Maximum bucket capacity
    capacity: f64,
}

impl TokenBucket {
    fn with_config(config: &RateLimitConfig) -> Self {
        let capacity = config.burst_capacity.max(1.0);
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: config.requests_per_minute.max(1) as f64 / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Token bucket shared across all outbound calls of a transport
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::with_config(&config)),
        }
    }

    fn bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a token without waiting; false if the bucket is empty
    pub fn try_acquire(&self) -> bool {
        self.bucket().try_acquire()
    }

    /// Wait until a token is available and take it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket();
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_available()
            };
            debug!("Rate limit reached, waiting {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
