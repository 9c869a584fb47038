//! Fan-out-on-write
//!
//! [`FanoutEngine::distribute`] materializes a tweet into the feed of its
//! author and of every follower. The recipient set is snapshotted once,
//! sorted, and written in chunks of `chunk_size` rows, one store call per
//! chunk. A failing chunk is retried on its own; chunks already written are
//! never rewritten within the same call, and a repeated call only replays
//! rows the store already holds, which it skips.

use newsfeed_core::{
	FeedEntry, FeedError, FeedSettings, FeedStore, FollowGraph, Result, RetryStrategy, StoreError,
	Tweet, TweetId, TweetStore, UserId,
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a successful fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutResult {
	pub tweet_id: TweetId,
	/// Feed entries the tweet now has: followers plus the author
	pub recipients: usize,
	/// Rows newly written by this call; 0 when replaying a completed fan-out
	pub inserted: u64,
	/// Batch writes issued
	pub chunks: usize,
	/// Chunk attempts that failed and were retried
	pub retries: u32,
}

/// Fan-out engine
///
/// Holds no mutable state; clones share the same collaborators and can run
/// concurrently.
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{FeedSettings, UserId};
/// use newsfeed_db::{InMemoryFeedStore, InMemoryFollowGraph, InMemoryTweetStore};
/// use newsfeed_fanout::FanoutEngine;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let graph = InMemoryFollowGraph::new();
/// let tweets = InMemoryTweetStore::new();
/// let feeds = InMemoryFeedStore::new();
/// graph.follow(UserId::new(2), UserId::new(1)).await;
///
/// let engine = FanoutEngine::new(
///     Arc::new(graph),
///     Arc::new(tweets.clone()),
///     Arc::new(feeds.clone()),
///     &FeedSettings::default(),
/// )
/// .unwrap();
///
/// let tweet = tweets.create(UserId::new(1), "hello followers").await;
/// let result = engine.distribute(&tweet).await.unwrap();
/// assert_eq!(result.recipients, 2);
/// assert!(feeds.contains(UserId::new(2), tweet.id).await);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct FanoutEngine {
	graph: Arc<dyn FollowGraph>,
	tweets: Arc<dyn TweetStore>,
	feeds: Arc<dyn FeedStore>,
	chunk_size: usize,
	max_chunk_retries: u32,
	retry: RetryStrategy,
	write_timeout: Duration,
}

impl FanoutEngine {
	/// Create an engine; fails if `settings` do not validate
	pub fn new(
		graph: Arc<dyn FollowGraph>,
		tweets: Arc<dyn TweetStore>,
		feeds: Arc<dyn FeedStore>,
		settings: &FeedSettings,
	) -> Result<Self> {
		settings.validate()?;
		Ok(Self {
			graph,
			tweets,
			feeds,
			chunk_size: settings.chunk_size,
			max_chunk_retries: settings.max_chunk_retries,
			retry: settings.retry,
			write_timeout: settings.write_timeout(),
		})
	}

	pub fn chunk_size(&self) -> usize {
		self.chunk_size
	}

	/// Load the tweet by id and distribute it
	pub async fn distribute_by_id(&self, tweet_id: TweetId) -> Result<FanoutResult> {
		let tweet = self
			.tweets
			.get(tweet_id)
			.await
			.map_err(FeedError::StoreUnavailable)?
			.ok_or(FeedError::TweetNotFound(tweet_id))?;
		self.distribute(&tweet).await
	}

	/// Write `tweet` into the feed of its author and of every follower
	///
	/// Safe to call again for the same tweet, after a failure or not.
	pub async fn distribute(&self, tweet: &Tweet) -> Result<FanoutResult> {
		let followers = self
			.graph
			.followers_of(tweet.author_id)
			.await
			.map_err(FeedError::StoreUnavailable)?;
		let recipients = recipient_set(tweet.author_id, followers);

		tracing::debug!(
			tweet_id = %tweet.id,
			author_id = %tweet.author_id,
			recipients = recipients.len(),
			chunk_size = self.chunk_size,
			"Starting fan-out"
		);

		let mut result = FanoutResult {
			tweet_id: tweet.id,
			recipients: recipients.len(),
			inserted: 0,
			chunks: 0,
			retries: 0,
		};

		// Entries are built per chunk so a hot user's fan-out never holds
		// more than one chunk of rows at a time.
		for (index, chunk) in recipients.chunks(self.chunk_size).enumerate() {
			let entries: Vec<FeedEntry> = chunk
				.iter()
				.map(|recipient| FeedEntry::for_tweet(*recipient, tweet))
				.collect();
			let (inserted, retries) = self.write_chunk(tweet.id, index, &entries).await?;
			result.inserted += inserted;
			result.retries += retries;
			result.chunks += 1;
		}

		tracing::info!(
			tweet_id = %tweet.id,
			recipients = result.recipients,
			inserted = result.inserted,
			chunks = result.chunks,
			retries = result.retries,
			"Fan-out complete"
		);
		Ok(result)
	}

	/// Write one chunk, retrying transient failures
	///
	/// Returns the inserted row count and the number of retries spent.
	async fn write_chunk(
		&self,
		tweet_id: TweetId,
		index: usize,
		entries: &[FeedEntry],
	) -> Result<(u64, u32)> {
		let mut attempt: u32 = 0;
		loop {
			let outcome =
				match tokio::time::timeout(self.write_timeout, self.feeds.bulk_insert(entries)).await {
					Ok(outcome) => outcome,
					Err(_) => Err(StoreError::Timeout(self.write_timeout)),
				};

			match outcome {
				Ok(inserted) => {
					tracing::debug!(
						tweet_id = %tweet_id,
						chunk = index,
						rows = entries.len(),
						inserted,
						"Wrote fan-out chunk"
					);
					return Ok((inserted, attempt));
				}
				Err(err) if err.is_transient() && attempt < self.max_chunk_retries => {
					let delay = self.retry.delay_for(attempt);
					tracing::warn!(
						tweet_id = %tweet_id,
						chunk = index,
						attempt = attempt + 1,
						?delay,
						error = %err,
						"Fan-out chunk failed, retrying"
					);
					attempt += 1;
					tokio::time::sleep(delay).await;
				}
				Err(err) => {
					tracing::error!(
						tweet_id = %tweet_id,
						chunk = index,
						attempts = attempt + 1,
						error = %err,
						"Fan-out chunk failed"
					);
					return Err(FeedError::FanoutFailed {
						tweet_id,
						chunk: index,
						source: err,
					});
				}
			}
		}
	}
}

/// Followers plus the author, sorted so chunk boundaries are stable
fn recipient_set(author_id: UserId, followers: HashSet<UserId>) -> Vec<UserId> {
	let mut recipients: BTreeSet<UserId> = followers.into_iter().collect();
	recipients.insert(author_id);
	recipients.into_iter().collect()
}
