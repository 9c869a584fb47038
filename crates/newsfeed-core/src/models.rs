//! Plain data records of the newsfeed domain
//!
//! These are owned by the store traits in [`crate::store`]; nothing here
//! talks to persistence.

use crate::ids::{TweetId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A posted tweet
///
/// Immutable once created. The fan-out pipeline only ever reads tweets.
///
/// # Example
///
/// ```rust
/// use newsfeed_core::{Tweet, TweetId, UserId};
/// use chrono::Utc;
///
/// let tweet = Tweet::new(TweetId::new(1), UserId::new(7), "hello", Utc::now());
/// assert_eq!(tweet.author_id, UserId::new(7));
/// assert_eq!(tweet.hours_to_now(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
	pub id: TweetId,
	pub author_id: UserId,
	pub content: String,
	pub created_at: DateTime<Utc>,
}

impl Tweet {
	pub fn new(
		id: TweetId,
		author_id: UserId,
		content: impl Into<String>,
		created_at: DateTime<Utc>,
	) -> Self {
		Self {
			id,
			author_id,
			content: content.into(),
			created_at,
		}
	}

	/// Whole hours elapsed since the tweet was created
	pub fn hours_to_now(&self) -> i64 {
		(crate::time::utc_now() - self.created_at).num_hours()
	}
}

/// Directed follow relation: `follower_id` follows `followee_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowEdge {
	pub follower_id: UserId,
	pub followee_id: UserId,
	pub created_at: DateTime<Utc>,
}

/// One row of the materialized feed view
///
/// At most one entry exists per `(recipient_id, tweet_id)`. Entries are
/// ordered newest first by `(tweet_created_at, tweet_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedEntry {
	pub recipient_id: UserId,
	pub tweet_id: TweetId,
	pub tweet_created_at: DateTime<Utc>,
}

impl FeedEntry {
	/// Build the entry that delivers `tweet` to `recipient_id`
	pub fn for_tweet(recipient_id: UserId, tweet: &Tweet) -> Self {
		Self {
			recipient_id,
			tweet_id: tweet.id,
			tweet_created_at: tweet.created_at,
		}
	}

	/// The uniqueness key of the entry
	pub fn key(&self) -> (UserId, TweetId) {
		(self.recipient_id, self.tweet_id)
	}
}
