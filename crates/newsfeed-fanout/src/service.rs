//! News feed service
//!
//! Entry point used by the write and read paths: a newly persisted tweet is
//! handed to [`NewsFeedService::on_tweet_created`], and feeds are read with
//! [`NewsFeedService::feed`].

use crate::engine::{FanoutEngine, FanoutResult};
use crate::queue::{DeadLetter, FanoutQueue, QueueStats};
use crate::reader::{FeedPage, FeedReader};
use newsfeed_core::{
	FanoutMode, FeedCursor, FeedSettings, FeedStore, FollowGraph, Result, Tweet, TweetStore,
	UserId,
};
use std::sync::Arc;

/// What [`NewsFeedService::on_tweet_created`] did with the tweet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutOutcome {
	/// Distributed before returning
	Completed(FanoutResult),
	/// Handed to the background queue
	Queued,
}

pub struct NewsFeedService {
	engine: FanoutEngine,
	reader: FeedReader,
	queue: Option<FanoutQueue>,
}

impl NewsFeedService {
	/// Wire the engine and reader over the given stores
	///
	/// In [`FanoutMode::Background`] this spawns the queue workers, so it must
	/// be called from within a tokio runtime.
	pub fn new(
		graph: Arc<dyn FollowGraph>,
		tweets: Arc<dyn TweetStore>,
		feeds: Arc<dyn FeedStore>,
		settings: &FeedSettings,
	) -> Result<Self> {
		let engine = FanoutEngine::new(graph, tweets, Arc::clone(&feeds), settings)?;
		let reader = FeedReader::new(feeds, settings);
		let queue = match settings.fanout_mode {
			FanoutMode::Inline => None,
			FanoutMode::Background => Some(FanoutQueue::start(engine.clone(), settings)),
		};

		Ok(Self {
			engine,
			reader,
			queue,
		})
	}

	pub fn engine(&self) -> &FanoutEngine {
		&self.engine
	}

	pub fn reader(&self) -> &FeedReader {
		&self.reader
	}

	/// Fan out a tweet that has just been persisted
	///
	/// Inline mode returns the fan-out error to the caller; the tweet itself
	/// stays persisted and the call can be repeated.
	pub async fn on_tweet_created(&self, tweet: Tweet) -> Result<FanoutOutcome> {
		match &self.queue {
			Some(queue) => {
				queue.enqueue(tweet).await?;
				Ok(FanoutOutcome::Queued)
			}
			None => self
				.engine
				.distribute(&tweet)
				.await
				.map(FanoutOutcome::Completed),
		}
	}

	/// A page of `user_id`'s feed
	pub async fn feed(&self, user_id: UserId, cursor: FeedCursor, limit: usize) -> Result<FeedPage> {
		self.reader.page(user_id, cursor, limit).await
	}

	/// A page of `user_id`'s feed, starting at an opaque token
	pub async fn feed_by_token(&self, user_id: UserId, token: &str, limit: usize) -> Result<FeedPage> {
		self.reader.page_from_token(user_id, token, limit).await
	}

	/// Queue counters; `None` in inline mode
	pub fn queue_stats(&self) -> Option<QueueStats> {
		self.queue.as_ref().map(FanoutQueue::stats)
	}

	/// Drain pending background jobs; returns the dead letters
	pub async fn shutdown(&self) -> Vec<DeadLetter> {
		match &self.queue {
			Some(queue) => queue.shutdown().await,
			None => Vec::new(),
		}
	}
}
