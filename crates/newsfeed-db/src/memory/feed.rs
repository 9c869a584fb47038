//! In-memory feed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsfeed_core::{FeedCursor, FeedEntry, FeedStore, StoreResult, TweetId, UserId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Feed rows of a single recipient
#[derive(Debug, Default)]
struct RecipientFeed {
	/// Ordered access path: ascending `(created_at, tweet_id)`, read in reverse
	by_time: BTreeSet<(DateTime<Utc>, TweetId)>,
	/// Uniqueness index over `tweet_id`
	tweets: HashSet<TweetId>,
}

/// In-memory materialized feed view
///
/// Each recipient's rows are kept in a `BTreeSet` keyed by
/// `(tweet_created_at, tweet_id)`, so a page is a reverse range scan with no
/// sort step. A batch is applied under one write lock and is therefore
/// visible to readers all at once.
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{FeedCursor, FeedEntry, FeedStore, TweetId, UserId};
/// use newsfeed_db::InMemoryFeedStore;
/// use chrono::Utc;
///
/// # async fn example() {
/// let store = InMemoryFeedStore::new();
/// let entry = FeedEntry {
///     recipient_id: UserId::new(1),
///     tweet_id: TweetId::new(10),
///     tweet_created_at: Utc::now(),
/// };
///
/// assert_eq!(store.bulk_insert(&[entry]).await.unwrap(), 1);
/// // Replaying the same batch is a no-op
/// assert_eq!(store.bulk_insert(&[entry]).await.unwrap(), 0);
///
/// let page = store.query(UserId::new(1), FeedCursor::Head, 10).await.unwrap();
/// assert_eq!(page, vec![entry]);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryFeedStore {
	feeds: Arc<RwLock<HashMap<UserId, RecipientFeed>>>,
	write_calls: Arc<AtomicU64>,
}

impl InMemoryFeedStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of `bulk_insert` calls served so far
	pub fn write_calls(&self) -> u64 {
		self.write_calls.load(Ordering::Relaxed)
	}

	/// Total number of feed rows across all recipients
	pub async fn len(&self) -> usize {
		let feeds = self.feeds.read().await;
		feeds.values().map(|feed| feed.tweets.len()).sum()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}

	/// Whether `recipient_id` has `tweet_id` in their feed
	pub async fn contains(&self, recipient_id: UserId, tweet_id: TweetId) -> bool {
		let feeds = self.feeds.read().await;
		feeds
			.get(&recipient_id)
			.is_some_and(|feed| feed.tweets.contains(&tweet_id))
	}

	/// Every row of the store, sorted by `(recipient_id, tweet_id)`
	///
	/// Used to compare whole feed states.
	pub async fn snapshot(&self) -> Vec<FeedEntry> {
		let feeds = self.feeds.read().await;
		let mut entries: Vec<FeedEntry> = feeds
			.iter()
			.flat_map(|(recipient_id, feed)| {
				feed.by_time
					.iter()
					.map(move |(created_at, tweet_id)| FeedEntry {
						recipient_id: *recipient_id,
						tweet_id: *tweet_id,
						tweet_created_at: *created_at,
					})
			})
			.collect();
		entries.sort_by_key(|entry| entry.key());
		entries
	}
}

#[async_trait]
impl FeedStore for InMemoryFeedStore {
	async fn bulk_insert(&self, entries: &[FeedEntry]) -> StoreResult<u64> {
		self.write_calls.fetch_add(1, Ordering::Relaxed);

		let mut feeds = self.feeds.write().await;
		let mut inserted = 0;
		for entry in entries {
			let feed = feeds.entry(entry.recipient_id).or_default();
			if feed.tweets.insert(entry.tweet_id) {
				feed.by_time.insert((entry.tweet_created_at, entry.tweet_id));
				inserted += 1;
			}
		}
		Ok(inserted)
	}

	async fn query(
		&self,
		recipient_id: UserId,
		cursor: FeedCursor,
		limit: usize,
	) -> StoreResult<Vec<FeedEntry>> {
		let feeds = self.feeds.read().await;
		let Some(feed) = feeds.get(&recipient_id) else {
			return Ok(Vec::new());
		};

		let to_entry = |&(tweet_created_at, tweet_id): &(DateTime<Utc>, TweetId)| FeedEntry {
			recipient_id,
			tweet_id,
			tweet_created_at,
		};

		let entries: Vec<FeedEntry> = match cursor {
			FeedCursor::Head => feed.by_time.iter().rev().take(limit).map(to_entry).collect(),
			FeedCursor::Before {
				created_at,
				tweet_id,
			} => feed
				.by_time
				.range(..(created_at, tweet_id))
				.rev()
				.take(limit)
				.map(to_entry)
				.collect(),
		};
		Ok(entries)
	}
}
