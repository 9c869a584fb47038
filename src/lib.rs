//! # Newsfeed
//!
//! Fan-out-on-write news feed pipeline.
//!
//! When a user posts a tweet, a reference to it is written into a
//! materialized feed for the author and for every follower. Feed reads then
//! come straight from that view, newest first, without touching the follow
//! graph.
//!
//! ## Crates
//!
//! - [`core`] (`newsfeed-core`): ids, records, cursors, errors, settings and
//!   the `FollowGraph` / `TweetStore` / `FeedStore` traits
//! - [`db`] (`newsfeed-db`): in-memory stores, and SQL stores over sqlx +
//!   sea-query behind the `database` feature
//! - [`fanout`] (`newsfeed-fanout`): the fan-out engine, feed reader,
//!   background queue and the service wiring them together
//!
//! ## Feature Flags
//!
//! - `database` (default) - SQL-backed stores for PostgreSQL and SQLite
//!
//! ## Quick Example
//!
//! ```rust
//! use newsfeed::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> newsfeed::Result<()> {
//! let graph = InMemoryFollowGraph::new();
//! let tweets = InMemoryTweetStore::new();
//! let feeds = InMemoryFeedStore::new();
//!
//! let (alice, bob) = (UserId::new(1), UserId::new(2));
//! graph.follow(bob, alice).await;
//!
//! let service = NewsFeedService::new(
//!     Arc::new(graph),
//!     Arc::new(tweets.clone()),
//!     Arc::new(feeds),
//!     &FeedSettings::default(),
//! )?;
//!
//! let tweet = tweets.create(alice, "hello").await;
//! service.on_tweet_created(tweet.clone()).await?;
//!
//! let page = service.feed(bob, FeedCursor::Head, 20).await?;
//! assert_eq!(page.entries[0].tweet_id, tweet.id);
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
//! ```

pub use newsfeed_core as core;
pub use newsfeed_db as db;
pub use newsfeed_fanout as fanout;

pub use newsfeed_core::{
	FanoutMode, FeedCursor, FeedEntry, FeedError, FeedSettings, FeedStore, FollowEdge, FollowGraph,
	Result, RetryStrategy, SettingsError, StoreError, StoreResult, Tweet, TweetId, TweetStore, UserId,
};
pub use newsfeed_db::{InMemoryFeedStore, InMemoryFollowGraph, InMemoryTweetStore};
#[cfg(feature = "database")]
pub use newsfeed_db::{Database, DatabaseBackend, SqlFeedStore, SqlFollowGraph, SqlTweetStore};
pub use newsfeed_fanout::{
	DeadLetter, FanoutEngine, FanoutOutcome, FanoutQueue, FanoutResult, FeedPage, FeedReader,
	NewsFeedService, QueueStats,
};

/// Commonly used types
pub mod prelude {
	pub use crate::{
		FanoutEngine, FanoutMode, FanoutOutcome, FeedCursor, FeedEntry, FeedError, FeedPage,
		FeedReader, FeedSettings, FeedStore, FollowGraph, InMemoryFeedStore, InMemoryFollowGraph,
		InMemoryTweetStore, NewsFeedService, Tweet, TweetId, TweetStore, UserId,
	};
}
