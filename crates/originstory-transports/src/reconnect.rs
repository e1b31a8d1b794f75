// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reconnection logic with exponential backoff

use std::time::Duration;

/// Reconnection strategy with exponential backoff
#[derive(Debug, Clone)]
pub struct ReconnectionStrategy {
    /// Base backoff in milliseconds
    base_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    max_backoff_ms: u64,

    /// Current attempt number
    current_attempt: u32,

    /// Maximum retry attempts (0 = infinite)
    max_attempts: u32,
}

impl ReconnectionStrategy {
    /// Create a new reconnection strategy
    ///
    /// # Arguments
    /// * `base_backoff` - Initial backoff duration
    /// * `max_attempts` - Maximum retry attempts (0 = infinite)
    pub fn new(base_backoff: Duration, max_attempts: u32) -> Self {
        Self {
            base_backoff_ms: base_backoff.as_millis() as u64,
            max_backoff_ms: 30_000, // Cap at 30 seconds
            current_attempt: 0,
            max_attempts,
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff_ms = max_backoff.as_millis() as u64;
        self
    }

    /// Get next backoff duration with exponential increase
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.current_attempt += 1;

        // base * 2^(attempt - 1)
        let exp = 2u64.saturating_pow(self.current_attempt - 1);
        let backoff_ms = self
            .base_backoff_ms
            .saturating_mul(exp)
            .min(self.max_backoff_ms);

        Some(Duration::from_millis(backoff_ms))
    }

    /// Reset the strategy (after successful connection)
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    /// Get current attempt number
    pub fn attempt_number(&self) -> u32 {
        self.current_attempt
    }

    /// Check if attempts exhausted
    pub fn is_exhausted(&self) -> bool {
        self.max_attempts > 0 && self.current_attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let mut strategy = ReconnectionStrategy::new(Duration::from_millis(100), 5);

        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(800)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(1600)));
        assert_eq!(strategy.next_backoff(), None);
        assert!(strategy.is_exhausted());
    }

    #[test]
    fn test_backoff_cap() {
        let mut strategy = ReconnectionStrategy::new(Duration::from_millis(10_000), 0)
            .with_max_backoff(Duration::from_millis(25_000));

        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(10_000)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(20_000)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(25_000)));
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(25_000)));
    }

    #[test]
    fn test_reset() {
        let mut strategy = ReconnectionStrategy::new(Duration::from_millis(100), 3);

        strategy.next_backoff();
        strategy.next_backoff();
        assert_eq!(strategy.attempt_number(), 2);

        strategy.reset();
        assert_eq!(strategy.attempt_number(), 0);
        assert_eq!(strategy.next_backoff(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_infinite_retries() {
        let mut strategy = ReconnectionStrategy::new(Duration::from_millis(100), 0);

        for _ in 0..100 {
            assert!(strategy.next_backoff().is_some());
        }
        assert!(!strategy.is_exhausted());
    }
}
