//! Safety Module
//!
//! Input validation and rate limiting for the chat surface.

mod rate_limiter;

pub use rate_limiter::{RateLimiter, LLM_CALL};

use thiserror::Error;
use tracing::warn;

/// Longest chat message accepted, in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("rate limit exceeded for {operation}")]
    RateLimited { operation: String },
}

/// Safety guard combining input checks and rate limiting
pub struct SafetyGuard {
    rate_limiter: RateLimiter,
    max_chars: usize,
}

impl SafetyGuard {
    pub fn new(llm_calls_per_minute: u32) -> Self {
        Self {
            rate_limiter: RateLimiter::new().with_limit(LLM_CALL, llm_calls_per_minute),
            max_chars: MAX_MESSAGE_CHARS,
        }
    }

    /// Validate user input before processing
    pub fn validate_input(&self, input: &str) -> Result<(), GuardError> {
        if input.trim().is_empty() {
            return Err(GuardError::EmptyMessage);
        }
        if input.chars().count() > self.max_chars {
            return Err(GuardError::TooLong { max: self.max_chars });
        }
        Ok(())
    }

    /// Consume one model call from the budget.
    pub fn check_llm_call(&mut self) -> Result<(), GuardError> {
        if self.rate_limiter.check_llm_call() {
            Ok(())
        } else {
            warn!("LLM call rate limit exceeded");
            Err(GuardError::RateLimited {
                operation: LLM_CALL.to_string(),
            })
        }
    }

    /// Reset rate limiters (e.g., at start of new session)
    pub fn reset(&mut self) {
        self.rate_limiter.reset();
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new(30)
    }
}
