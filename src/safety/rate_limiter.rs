//! Rate Limiter
//!
//! Token buckets keyed by operation name.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Operation name for model calls made on behalf of chat users
pub const LLM_CALL: &str = "llm_call";

/// Simple rate limiter using token bucket algorithm
pub struct RateLimiter {
    buckets: HashMap<String, TokenBucket>,
}

struct TokenBucket {
    tokens: u32,
    max_tokens: u32,
    last_refill: Instant,
    /// Time to earn back one token
    refill_every: Duration,
}

impl TokenBucket {
    /// `max_tokens` per `window`, refilled one token at a time.
    fn new(max_tokens: u32, window: Duration) -> Self {
        let max_tokens = max_tokens.max(1);
        Self {
            tokens: max_tokens,
            max_tokens,
            last_refill: Instant::now(),
            refill_every: window / max_tokens,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let elapsed = self.last_refill.elapsed();
        let refills = (elapsed.as_secs_f64() / self.refill_every.as_secs_f64()) as u32;

        if refills > 0 {
            self.tokens = self.tokens.saturating_add(refills).min(self.max_tokens);
            self.last_refill = Instant::now();
        }
    }

    fn reset(&mut self) {
        self.tokens = self.max_tokens;
        self.last_refill = Instant::now();
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    /// Limit `operation` to `per_minute` calls per minute.
    pub fn with_limit(mut self, operation: &str, per_minute: u32) -> Self {
        self.buckets.insert(
            operation.to_string(),
            TokenBucket::new(per_minute, Duration::from_secs(60)),
        );
        self
    }

    /// Check if an operation is allowed; unconfigured operations always are.
    pub fn check(&mut self, operation: &str) -> bool {
        match self.buckets.get_mut(operation) {
            Some(bucket) => bucket.try_consume(),
            None => true,
        }
    }

    pub fn check_llm_call(&mut self) -> bool {
        self.check(LLM_CALL)
    }

    /// Reset all rate limiters
    pub fn reset(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.reset();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new().with_limit(LLM_CALL, 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_bucket() {
        let mut bucket = TokenBucket::new(3, Duration::from_secs(60));

        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume()); // Exhausted
    }

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new().with_limit(LLM_CALL, 5);

        for _ in 0..5 {
            assert!(limiter.check_llm_call());
        }
        assert!(!limiter.check_llm_call());
        assert!(limiter.check("unlimited"));

        limiter.reset();
        assert!(limiter.check_llm_call());
    }
}
