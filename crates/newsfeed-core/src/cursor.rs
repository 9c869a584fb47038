//! Keyset cursors over a recipient's feed
//!
//! A feed is ordered newest first by `(tweet_created_at, tweet_id)`. A
//! cursor names a position in that order; a page holds the entries strictly
//! after it, i.e. strictly older.

use crate::error::{FeedError, Result};
use crate::ids::TweetId;
use crate::models::FeedEntry;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Position in a feed
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{FeedCursor, TweetId};
/// use chrono::Utc;
///
/// let cursor = FeedCursor::before(Utc::now(), TweetId::new(10));
/// let token = cursor.encode();
/// assert_eq!(FeedCursor::decode(&token).unwrap(), cursor);
///
/// assert_eq!(FeedCursor::decode("").unwrap(), FeedCursor::Head);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedCursor {
	/// Before the newest entry; pages start at the top of the feed
	Head,
	/// Entries strictly older than this position
	Before {
		created_at: DateTime<Utc>,
		tweet_id: TweetId,
	},
}

impl FeedCursor {
	pub fn before(created_at: DateTime<Utc>, tweet_id: TweetId) -> Self {
		FeedCursor::Before {
			created_at,
			tweet_id,
		}
	}

	/// Cursor admitting every entry created at or before `time`
	pub fn at(time: DateTime<Utc>) -> Self {
		Self::before(time, TweetId::MAX)
	}

	/// Cursor positioned on `entry`; the next page starts right after it
	pub fn after_entry(entry: &FeedEntry) -> Self {
		Self::before(entry.tweet_created_at, entry.tweet_id)
	}

	/// Whether `entry` lies strictly after the cursor in feed order
	pub fn admits(&self, entry: &FeedEntry) -> bool {
		match self {
			FeedCursor::Head => true,
			FeedCursor::Before {
				created_at,
				tweet_id,
			} => (entry.tweet_created_at, entry.tweet_id).cmp(&(*created_at, *tweet_id))
				== Ordering::Less,
		}
	}

	/// Opaque URL-safe token for this cursor; `Head` encodes to ""
	///
	/// The position keeps full nanosecond precision, so a decoded token
	/// admits exactly the entries the cursor it came from admits.
	pub fn encode(&self) -> String {
		match self {
			FeedCursor::Head => String::new(),
			FeedCursor::Before {
				created_at,
				tweet_id,
			} => {
				let payload = format!(
					"{}:{}:{}",
					created_at.timestamp(),
					created_at.timestamp_subsec_nanos(),
					tweet_id
				);
				general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes())
			}
		}
	}

	/// Parse a token produced by [`FeedCursor::encode`]
	pub fn decode(token: &str) -> Result<Self> {
		if token.is_empty() {
			return Ok(FeedCursor::Head);
		}

		let decoded = general_purpose::URL_SAFE_NO_PAD
			.decode(token)
			.map_err(|_| FeedError::InvalidCursor("not base64".to_string()))?;
		let payload = String::from_utf8(decoded)
			.map_err(|_| FeedError::InvalidCursor("invalid encoding".to_string()))?;

		let mut parts = payload.splitn(3, ':');
		let (Some(secs), Some(nanos), Some(tweet_id)) = (parts.next(), parts.next(), parts.next())
		else {
			return Err(FeedError::InvalidCursor("malformed cursor".to_string()));
		};
		let secs: i64 = secs
			.parse()
			.map_err(|_| FeedError::InvalidCursor("invalid timestamp".to_string()))?;
		let nanos = nanos
			.parse::<u32>()
			.ok()
			.filter(|nanos| *nanos < 1_000_000_000)
			.ok_or_else(|| FeedError::InvalidCursor("invalid timestamp".to_string()))?;
		let tweet_id: TweetId = tweet_id
			.parse()
			.map_err(|_| FeedError::InvalidCursor("invalid tweet id".to_string()))?;
		let created_at = DateTime::from_timestamp(secs, nanos)
			.ok_or_else(|| FeedError::InvalidCursor("timestamp out of range".to_string()))?;

		Ok(Self::before(created_at, tweet_id))
	}
}

impl Default for FeedCursor {
	fn default() -> Self {
		FeedCursor::Head
	}
}

/// Newest-first comparison of two entries, as feeds are ordered
pub fn newest_first(a: &FeedEntry, b: &FeedEntry) -> Ordering {
	(b.tweet_created_at, b.tweet_id).cmp(&(a.tweet_created_at, a.tweet_id))
}
