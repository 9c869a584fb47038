//! # newsfeed-db
//!
//! Store implementations for the newsfeed pipeline:
//!
//! - [`memory`]: process-local stores (`InMemoryFeedStore`,
//!   `InMemoryFollowGraph`, `InMemoryTweetStore`)
//! - [`sql`]: sea-query + sqlx stores over the `tweets`, `friendships` and
//!   `newsfeeds` tables (feature `database`, on by default)
//! - [`testing`]: fault-injecting wrappers for retry tests
//!
//! Every feed store honours the same contract: a batch is atomic, duplicate
//! `(recipient, tweet)` rows are skipped, and pages come back newest first
//! straight from an ordered access path.

pub mod memory;
#[cfg(feature = "database")]
pub mod sql;
pub mod testing;

pub use memory::{InMemoryFeedStore, InMemoryFollowGraph, InMemoryTweetStore};

#[cfg(feature = "database")]
pub use sql::{Database, DatabaseBackend, SqlFeedStore, SqlFollowGraph, SqlTweetStore};
