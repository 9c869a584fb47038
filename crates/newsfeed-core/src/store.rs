//! Collaborator interfaces consumed by the fan-out pipeline
//!
//! The engine and the reader depend only on these narrow capabilities, never
//! on a concrete persistence layer. Implementations live in `newsfeed-db`.

use crate::cursor::FeedCursor;
use crate::error::StoreResult;
use crate::ids::{TweetId, UserId};
use crate::models::{FeedEntry, Tweet};
use async_trait::async_trait;
use std::collections::HashSet;

/// Read-only view over the social graph
///
/// May be eventually consistent with follow/unfollow writes.
#[async_trait]
pub trait FollowGraph: Send + Sync {
	/// Users following `user_id`
	async fn followers_of(&self, user_id: UserId) -> StoreResult<HashSet<UserId>>;

	/// Users that `user_id` follows
	async fn following_of(&self, user_id: UserId) -> StoreResult<HashSet<UserId>>;
}

/// Read access to persisted tweets
#[async_trait]
pub trait TweetStore: Send + Sync {
	async fn get(&self, tweet_id: TweetId) -> StoreResult<Option<Tweet>>;
}

/// The materialized feed view
#[async_trait]
pub trait FeedStore: Send + Sync {
	/// Persist `entries` as one atomic batch
	///
	/// Entries whose `(recipient_id, tweet_id)` already exists are skipped
	/// without error. Returns the number of rows newly inserted.
	async fn bulk_insert(&self, entries: &[FeedEntry]) -> StoreResult<u64>;

	/// Up to `limit` entries of `recipient_id` strictly after `cursor`,
	/// newest first
	async fn query(
		&self,
		recipient_id: UserId,
		cursor: FeedCursor,
		limit: usize,
	) -> StoreResult<Vec<FeedEntry>>;
}
