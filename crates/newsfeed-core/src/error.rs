//! Error types for the newsfeed pipeline
//!
//! Two layers: [`StoreError`] is what a persistence collaborator reports,
//! [`FeedError`] is what fan-out and feed reads report to their callers.

use crate::ids::TweetId;
use crate::settings::SettingsError;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a store collaborator
#[derive(Debug, Error)]
pub enum StoreError {
	/// Transport-level failure (connection refused, pool exhausted, ...)
	#[error("store unavailable: {0}")]
	Unavailable(String),

	/// The store rejected or aborted a write
	#[error("store write failed: {0}")]
	Write(String),

	/// The operation did not finish within the store-level timeout
	#[error("store operation timed out after {0:?}")]
	Timeout(Duration),

	/// A persisted row could not be turned back into a record
	#[error("invalid stored row: {0}")]
	Decode(String),
}

impl StoreError {
	/// Whether repeating the same operation may succeed
	pub fn is_transient(&self) -> bool {
		!matches!(self, StoreError::Decode(_))
	}
}

/// Error returned by fan-out and feed read operations
#[derive(Debug, Error)]
pub enum FeedError {
	/// The tweet to distribute does not exist; a caller bug
	#[error("tweet {0} not found")]
	TweetNotFound(TweetId),

	/// A chunk of the fan-out could not be written; retry the whole call
	#[error("fan-out of tweet {tweet_id} failed at chunk {chunk}: {source}")]
	FanoutFailed {
		tweet_id: TweetId,
		chunk: usize,
		#[source]
		source: StoreError,
	},

	/// Talking to persistence failed; retry with backoff
	#[error("store unavailable: {0}")]
	StoreUnavailable(#[source] StoreError),

	#[error("invalid cursor: {0}")]
	InvalidCursor(String),

	/// The background fan-out queue no longer accepts jobs
	#[error("fan-out queue is closed")]
	QueueClosed,

	#[error(transparent)]
	Settings(#[from] SettingsError),
}

impl FeedError {
	/// Whether the caller may retry the failed operation
	///
	/// # Example
	///
	/// ```rust
	/// use newsfeed_core::{FeedError, TweetId};
	///
	/// assert!(!FeedError::TweetNotFound(TweetId::new(1)).is_retryable());
	/// ```
	pub fn is_retryable(&self) -> bool {
		match self {
			FeedError::FanoutFailed { .. } | FeedError::StoreUnavailable(_) => true,
			FeedError::TweetNotFound(_)
			| FeedError::InvalidCursor(_)
			| FeedError::QueueClosed
			| FeedError::Settings(_) => false,
		}
	}
}

impl From<StoreError> for FeedError {
	fn from(err: StoreError) -> Self {
		FeedError::StoreUnavailable(err)
	}
}

pub type Result<T> = std::result::Result<T, FeedError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(FeedError::FanoutFailed { tweet_id: TweetId::new(1), chunk: 0, source: StoreError::Write("boom".into()) }, true)]
	#[case(FeedError::StoreUnavailable(StoreError::Unavailable("down".into())), true)]
	#[case(FeedError::TweetNotFound(TweetId::new(1)), false)]
	#[case(FeedError::InvalidCursor("x".into()), false)]
	#[case(FeedError::QueueClosed, false)]
	fn test_retryable_classification(#[case] error: FeedError, #[case] expected: bool) {
		// Act & Assert
		assert_eq!(error.is_retryable(), expected);
	}

	#[rstest]
	fn test_fanout_failed_message_carries_tweet_and_chunk() {
		// Arrange
		let error = FeedError::FanoutFailed {
			tweet_id: TweetId::new(42),
			chunk: 3,
			source: StoreError::Timeout(Duration::from_secs(5)),
		};

		// Act
		let message = error.to_string();

		// Assert
		assert!(message.contains("tweet 42"));
		assert!(message.contains("chunk 3"));
	}

	#[rstest]
	fn test_decode_errors_are_not_transient() {
		assert!(!StoreError::Decode("bad".into()).is_transient());
		assert!(StoreError::Unavailable("down".into()).is_transient());
	}
}
