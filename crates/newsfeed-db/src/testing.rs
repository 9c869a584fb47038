//! Fault-injecting store wrappers for exercising retry paths
//!
//! # Examples
//!
//! ```rust
//! use newsfeed_core::{FeedEntry, FeedStore, TweetId, UserId};
//! use newsfeed_db::InMemoryFeedStore;
//! use newsfeed_db::testing::FlakyFeedStore;
//! use chrono::Utc;
//!
//! # async fn example() {
//! let store = FlakyFeedStore::new(InMemoryFeedStore::new()).fail_calls([1]);
//! let entry = FeedEntry {
//!     recipient_id: UserId::new(1),
//!     tweet_id: TweetId::new(1),
//!     tweet_created_at: Utc::now(),
//! };
//!
//! assert!(store.bulk_insert(&[entry]).await.is_err());
//! assert_eq!(store.bulk_insert(&[entry]).await.unwrap(), 1);
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example());
//! ```

use async_trait::async_trait;
use newsfeed_core::{FeedCursor, FeedEntry, FeedStore, StoreError, StoreResult, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// How an injected failure manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
	/// Reject the batch with [`StoreError::Write`]
	WriteError,
	/// Report [`StoreError::Unavailable`]
	Unavailable,
	/// Sleep for the given duration before writing
	Stall(Duration),
}

/// Feed store wrapper that fails selected `bulk_insert` calls once each
///
/// Calls are numbered from 1 in arrival order. A failed call writes nothing,
/// which matches an aborted transaction in a real store.
#[derive(Clone)]
pub struct FlakyFeedStore<S> {
	inner: S,
	fault: Fault,
	pending: Arc<Mutex<HashSet<u64>>>,
	calls: Arc<AtomicU64>,
	failures: Arc<AtomicU64>,
}

impl<S: FeedStore> FlakyFeedStore<S> {
	pub fn new(inner: S) -> Self {
		Self {
			inner,
			fault: Fault::WriteError,
			pending: Arc::new(Mutex::new(HashSet::new())),
			calls: Arc::new(AtomicU64::new(0)),
			failures: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Fail the given 1-based call numbers, each exactly once
	pub fn fail_calls(self, calls: impl IntoIterator<Item = u64>) -> Self {
		let pending = calls.into_iter().collect();
		Self {
			pending: Arc::new(Mutex::new(pending)),
			..self
		}
	}

	pub fn with_fault(mut self, fault: Fault) -> Self {
		self.fault = fault;
		self
	}

	pub fn inner(&self) -> &S {
		&self.inner
	}

	/// Number of `bulk_insert` calls seen, failed ones included
	pub fn calls(&self) -> u64 {
		self.calls.load(Ordering::SeqCst)
	}

	/// Number of injected failures so far
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl<S: FeedStore> FeedStore for FlakyFeedStore<S> {
	async fn bulk_insert(&self, entries: &[FeedEntry]) -> StoreResult<u64> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		let inject = self.pending.lock().await.remove(&call);

		if inject {
			self.failures.fetch_add(1, Ordering::SeqCst);
			match self.fault {
				Fault::WriteError => {
					return Err(StoreError::Write(format!("injected failure on call {}", call)));
				}
				Fault::Unavailable => {
					return Err(StoreError::Unavailable(format!(
						"injected outage on call {}",
						call
					)));
				}
				Fault::Stall(delay) => tokio::time::sleep(delay).await,
			}
		}

		self.inner.bulk_insert(entries).await
	}

	async fn query(
		&self,
		recipient_id: UserId,
		cursor: FeedCursor,
		limit: usize,
	) -> StoreResult<Vec<FeedEntry>> {
		self.inner.query(recipient_id, cursor, limit).await
	}
}
