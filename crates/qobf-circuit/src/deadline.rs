//! Cooperative run deadline.
//!
//! The pipeline cannot be interrupted from outside; instead it calls
//! [`Deadline::check`] at fixed checkpoints (before each technique and
//! between noise insertions). An expired deadline is therefore noticed at
//! the next checkpoint, not at the exact instant it passes.

use std::time::{Duration, Instant};

use crate::error::{ObfuscationError, ObfuscationResult};

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Expires `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit: Some(limit),
        }
    }

    /// Never expires.
    pub fn unbounded() -> Self {
        Self {
            start: Instant::now(),
            limit: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.elapsed() >= limit)
    }

    /// `Err(Timeout)` once the deadline has passed.
    pub fn check(&self) -> ObfuscationResult<()> {
        match self.limit {
            Some(limit) if self.elapsed() >= limit => Err(ObfuscationError::Timeout { limit }),
            _ => Ok(()),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}
