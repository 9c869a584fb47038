//! Retry strategies shared by chunk writes and queued fan-out jobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long to wait before the next attempt
///
/// # Examples
///
/// ```
/// use newsfeed_core::RetryStrategy;
/// use std::time::Duration;
///
/// let backoff = RetryStrategy::ExponentialBackoff {
///     initial_delay_ms: 100,
///     max_delay_ms: 1_000,
/// };
/// assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
/// assert_eq!(backoff.delay_for(2), Duration::from_millis(400));
/// assert_eq!(backoff.delay_for(10), Duration::from_millis(1_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RetryStrategy {
	/// Retry immediately without delay
	Immediate,

	/// Retry with a fixed delay between attempts
	FixedDelay { delay_ms: u64 },

	/// Double the delay on every attempt, capped at `max_delay_ms`
	ExponentialBackoff {
		initial_delay_ms: u64,
		max_delay_ms: u64,
	},

	/// Grow the delay by `base_delay_ms` on every attempt
	LinearBackoff { base_delay_ms: u64 },
}

impl RetryStrategy {
	/// Delay before retry number `attempt` (0-based)
	pub fn delay_for(&self, attempt: u32) -> Duration {
		match *self {
			RetryStrategy::Immediate => Duration::ZERO,
			RetryStrategy::FixedDelay { delay_ms } => Duration::from_millis(delay_ms),
			RetryStrategy::ExponentialBackoff {
				initial_delay_ms,
				max_delay_ms,
			} => {
				let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
				Duration::from_millis(initial_delay_ms.saturating_mul(factor).min(max_delay_ms))
			}
			RetryStrategy::LinearBackoff { base_delay_ms } => {
				Duration::from_millis(base_delay_ms.saturating_mul(u64::from(attempt) + 1))
			}
		}
	}
}

impl Default for RetryStrategy {
	fn default() -> Self {
		RetryStrategy::ExponentialBackoff {
			initial_delay_ms: 50,
			max_delay_ms: 5_000,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(RetryStrategy::Immediate, 3, 0)]
	#[case(RetryStrategy::FixedDelay { delay_ms: 25 }, 0, 25)]
	#[case(RetryStrategy::FixedDelay { delay_ms: 25 }, 7, 25)]
	#[case(RetryStrategy::LinearBackoff { base_delay_ms: 10 }, 0, 10)]
	#[case(RetryStrategy::LinearBackoff { base_delay_ms: 10 }, 4, 50)]
	#[case(RetryStrategy::ExponentialBackoff { initial_delay_ms: 10, max_delay_ms: 60 }, 1, 20)]
	#[case(RetryStrategy::ExponentialBackoff { initial_delay_ms: 10, max_delay_ms: 60 }, 3, 60)]
	#[case(RetryStrategy::ExponentialBackoff { initial_delay_ms: 10, max_delay_ms: 60 }, 200, 60)]
	fn test_delay_for(#[case] strategy: RetryStrategy, #[case] attempt: u32, #[case] millis: u64) {
		// Act & Assert
		assert_eq!(strategy.delay_for(attempt), Duration::from_millis(millis));
	}
}
