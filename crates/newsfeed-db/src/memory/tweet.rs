//! In-memory tweet store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsfeed_core::time::utc_now;
use newsfeed_core::{StoreResult, Tweet, TweetId, TweetStore, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// In-memory tweet storage with sequential ids
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{TweetStore, UserId};
/// use newsfeed_db::InMemoryTweetStore;
///
/// # async fn example() {
/// let tweets = InMemoryTweetStore::new();
/// let tweet = tweets.create(UserId::new(1), "first!").await;
///
/// let loaded = tweets.get(tweet.id).await.unwrap();
/// assert_eq!(loaded, Some(tweet));
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct InMemoryTweetStore {
	tweets: Arc<RwLock<HashMap<TweetId, Tweet>>>,
	next_id: Arc<AtomicI64>,
}

impl InMemoryTweetStore {
	pub fn new() -> Self {
		Self {
			tweets: Arc::new(RwLock::new(HashMap::new())),
			next_id: Arc::new(AtomicI64::new(1)),
		}
	}

	/// Persist a new tweet authored by `author_id`, created now
	pub async fn create(&self, author_id: UserId, content: impl Into<String>) -> Tweet {
		self.create_at(author_id, content, utc_now()).await
	}

	/// Persist a new tweet with an explicit creation time
	pub async fn create_at(
		&self,
		author_id: UserId,
		content: impl Into<String>,
		created_at: DateTime<Utc>,
	) -> Tweet {
		let id = TweetId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
		let tweet = Tweet::new(id, author_id, content, created_at);
		self.tweets.write().await.insert(id, tweet.clone());
		tweet
	}

	/// Tweets of `author_id`, newest first
	pub async fn list_by_author(&self, author_id: UserId) -> Vec<Tweet> {
		let tweets = self.tweets.read().await;
		let mut authored: Vec<Tweet> = tweets
			.values()
			.filter(|tweet| tweet.author_id == author_id)
			.cloned()
			.collect();
		authored.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
		authored
	}
}

impl Default for InMemoryTweetStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl TweetStore for InMemoryTweetStore {
	async fn get(&self, tweet_id: TweetId) -> StoreResult<Option<Tweet>> {
		Ok(self.tweets.read().await.get(&tweet_id).cloned())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use rstest::rstest;

	#[rstest]
	#[tokio::test]
	async fn test_ids_are_sequential() {
		// Arrange
		let tweets = InMemoryTweetStore::new();

		// Act
		let first = tweets.create(UserId::new(1), "a").await;
		let second = tweets.create(UserId::new(1), "b").await;

		// Assert
		assert_eq!(first.id, TweetId::new(1));
		assert_eq!(second.id, TweetId::new(2));
	}

	#[rstest]
	#[tokio::test]
	async fn test_list_by_author_is_newest_first() {
		// Arrange
		let tweets = InMemoryTweetStore::new();
		let now = utc_now();
		let old = tweets.create_at(UserId::new(1), "old", now - Duration::hours(2)).await;
		let new = tweets.create_at(UserId::new(1), "new", now).await;
		tweets.create_at(UserId::new(2), "other", now).await;

		// Act
		let listed = tweets.list_by_author(UserId::new(1)).await;

		// Assert
		assert_eq!(listed, vec![new, old]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_get_missing_tweet() {
		// Arrange
		let tweets = InMemoryTweetStore::new();

		// Act & Assert
		assert_eq!(tweets.get(TweetId::new(404)).await.unwrap(), None);
	}
}
