//! Feed reads
//!
//! Pages come straight from the materialized view; the follow graph is
//! never consulted on the read path.

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use newsfeed_core::{FeedCursor, FeedEntry, FeedError, FeedSettings, FeedStore, Result, UserId};
use std::sync::Arc;

/// One page of a recipient's feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
	/// Newest first
	pub entries: Vec<FeedEntry>,
	/// Where the following page starts; `None` once the feed is exhausted
	pub next_cursor: Option<FeedCursor>,
}

impl FeedPage {
	/// Opaque token of [`FeedPage::next_cursor`]
	pub fn next_token(&self) -> Option<String> {
		self.next_cursor.map(|cursor| cursor.encode())
	}
}

/// Reverse-chronological feed reader
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{FeedCursor, FeedEntry, FeedSettings, FeedStore, TweetId, UserId};
/// use newsfeed_db::InMemoryFeedStore;
/// use newsfeed_fanout::FeedReader;
/// use chrono::Utc;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let feeds = InMemoryFeedStore::new();
/// feeds
///     .bulk_insert(&[FeedEntry {
///         recipient_id: UserId::new(1),
///         tweet_id: TweetId::new(1),
///         tweet_created_at: Utc::now(),
///     }])
///     .await
///     .unwrap();
///
/// let reader = FeedReader::new(Arc::new(feeds), &FeedSettings::default());
/// let page = reader.page(UserId::new(1), FeedCursor::Head, 10).await.unwrap();
/// assert_eq!(page.entries.len(), 1);
/// assert!(page.next_cursor.is_none());
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct FeedReader {
	feeds: Arc<dyn FeedStore>,
	default_page_size: usize,
	max_page_size: usize,
}

impl FeedReader {
	pub fn new(feeds: Arc<dyn FeedStore>, settings: &FeedSettings) -> Self {
		Self {
			feeds,
			default_page_size: settings.default_page_size.max(1),
			max_page_size: settings.max_page_size.max(1),
		}
	}

	/// 0 means "default"; anything above the maximum is clamped
	fn effective_limit(&self, limit: usize) -> usize {
		if limit == 0 {
			self.default_page_size.min(self.max_page_size)
		} else {
			limit.min(self.max_page_size)
		}
	}

	/// At most `limit` entries strictly older than `cursor`, newest first
	pub async fn page(
		&self,
		recipient_id: UserId,
		cursor: FeedCursor,
		limit: usize,
	) -> Result<FeedPage> {
		let limit = self.effective_limit(limit);
		let entries = self.feeds.query(recipient_id, cursor, limit).await?;

		let next_cursor = if entries.len() == limit {
			entries.last().map(FeedCursor::after_entry)
		} else {
			None
		};

		tracing::debug!(
			recipient_id = %recipient_id,
			returned = entries.len(),
			limit,
			"Served feed page"
		);
		Ok(FeedPage {
			entries,
			next_cursor,
		})
	}

	/// Like [`FeedReader::page`], with the cursor given as a token
	pub async fn page_from_token(
		&self,
		recipient_id: UserId,
		token: &str,
		limit: usize,
	) -> Result<FeedPage> {
		let cursor = FeedCursor::decode(token)?;
		self.page(recipient_id, cursor, limit).await
	}

	/// The whole feed as a lazy stream, fetched `page_size` entries at a time
	pub fn stream(
		&self,
		recipient_id: UserId,
		page_size: usize,
	) -> impl Stream<Item = Result<FeedEntry>> + Send + 'static {
		let reader = self.clone();
		stream::try_unfold(Some(FeedCursor::Head), move |state| {
			let reader = reader.clone();
			async move {
				let Some(cursor) = state else {
					return Ok::<_, FeedError>(None);
				};
				let page = reader.page(recipient_id, cursor, page_size).await?;
				if page.entries.is_empty() {
					return Ok(None);
				}
				Ok(Some((page.entries, page.next_cursor)))
			}
		})
		.map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, FeedError>)))
		.try_flatten()
		.boxed()
	}
}
