//! SQL store integration tests against in-memory SQLite
//!
//! **Test Coverage:**
//! - Normal: batch insert, keyset paging, follow graph queries, tweet lookup
//! - Boundary: empty batches, duplicate rows inside and across batches
//! - UseCase: replaying a batch after a simulated retry, store calls from
//!   spawned tasks

#![cfg(feature = "database")]

use chrono::{DateTime, Duration, TimeZone, Utc};
use newsfeed_core::{FeedCursor, FeedEntry, FeedStore, FollowGraph, Tweet, TweetId, TweetStore, UserId};
use newsfeed_db::sql::{Database, DatabaseBackend, SqlFeedStore, SqlFollowGraph, SqlTweetStore};
use rstest::*;
use sqlx::any::AnyPoolOptions;
use std::collections::HashSet;

// ============================================================================
// Fixtures
// ============================================================================

#[fixture]
async fn database() -> Database {
	let options = AnyPoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None);
	let database = Database::connect_with("sqlite::memory:", options)
		.await
		.expect("Failed to open in-memory SQLite");
	database
		.create_tables()
		.await
		.expect("Failed to create newsfeed tables");
	database
}

#[fixture]
fn base_time() -> DateTime<Utc> {
	Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn entry(recipient: i64, tweet: i64, at: DateTime<Utc>) -> FeedEntry {
	FeedEntry {
		recipient_id: UserId::new(recipient),
		tweet_id: TweetId::new(tweet),
		tweet_created_at: at,
	}
}

// ============================================================================
// Feed store
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_backend_detected_from_url(#[future] database: Database) {
	let database = database.await;
	assert_eq!(database.backend(), DatabaseBackend::Sqlite);
}

#[rstest]
#[tokio::test]
async fn test_bulk_insert_counts_new_rows_only(
	#[future] database: Database,
	base_time: DateTime<Utc>,
) {
	// Arrange
	let store = SqlFeedStore::new(database.await);
	let batch: Vec<FeedEntry> = (1..=5).map(|r| entry(r, 100, base_time)).collect();

	// Act
	let first = store.bulk_insert(&batch).await.unwrap();
	let replay = store.bulk_insert(&batch).await.unwrap();
	let mixed = store
		.bulk_insert(&[entry(5, 100, base_time), entry(6, 100, base_time)])
		.await
		.unwrap();

	// Assert
	assert_eq!(first, 5);
	assert_eq!(replay, 0);
	assert_eq!(mixed, 1);
}

#[rstest]
#[tokio::test]
async fn test_empty_batch_is_a_no_op(#[future] database: Database) {
	// Arrange
	let store = SqlFeedStore::new(database.await);

	// Act
	let inserted = store.bulk_insert(&[]).await.unwrap();

	// Assert
	assert_eq!(inserted, 0);
}

#[rstest]
#[tokio::test]
async fn test_query_orders_newest_first(#[future] database: Database, base_time: DateTime<Utc>) {
	// Arrange
	let store = SqlFeedStore::new(database.await);
	let t1 = entry(1, 1, base_time);
	let t2 = entry(1, 2, base_time + Duration::minutes(1));
	let t3 = entry(1, 3, base_time + Duration::minutes(2));
	store.bulk_insert(&[t2, t1, t3]).await.unwrap();

	// Act
	let page = store.query(UserId::new(1), FeedCursor::Head, 3).await.unwrap();

	// Assert
	assert_eq!(page, vec![t3, t2, t1]);
}

#[rstest]
#[tokio::test]
async fn test_query_pages_with_cursor_and_tiebreak(
	#[future] database: Database,
	base_time: DateTime<Utc>,
) {
	// Arrange
	let store = SqlFeedStore::new(database.await);
	let same_instant: Vec<FeedEntry> = (1..=4).map(|t| entry(7, t, base_time)).collect();
	store.bulk_insert(&same_instant).await.unwrap();
	store.bulk_insert(&[entry(8, 9, base_time)]).await.unwrap();

	// Act
	let first = store.query(UserId::new(7), FeedCursor::Head, 2).await.unwrap();
	let cursor = FeedCursor::after_entry(first.last().unwrap());
	let second = store.query(UserId::new(7), cursor, 2).await.unwrap();
	let third = store
		.query(UserId::new(7), FeedCursor::after_entry(second.last().unwrap()), 2)
		.await
		.unwrap();

	// Assert
	let ids = |page: &[FeedEntry]| page.iter().map(|e| e.tweet_id.value()).collect::<Vec<_>>();
	assert_eq!(ids(&first), vec![4, 3]);
	assert_eq!(ids(&second), vec![2, 1]);
	assert!(third.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_timestamps_round_trip_with_microseconds(
	#[future] database: Database,
	base_time: DateTime<Utc>,
) {
	// Arrange
	let store = SqlFeedStore::new(database.await);
	let precise = entry(1, 1, base_time + Duration::microseconds(123_456));
	store.bulk_insert(&[precise]).await.unwrap();

	// Act
	let page = store
		.query(UserId::new(1), FeedCursor::at(base_time + Duration::seconds(1)), 10)
		.await
		.unwrap();

	// Assert
	assert_eq!(page, vec![precise]);
}

// ============================================================================
// Follow graph and tweets
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_follow_graph_round_trip(#[future] database: Database) {
	// Arrange
	let graph = SqlFollowGraph::new(database.await);
	let (alice, bob, carol) = (UserId::new(1), UserId::new(2), UserId::new(3));

	// Act
	assert!(graph.follow(bob, alice).await.unwrap());
	assert!(graph.follow(carol, alice).await.unwrap());
	assert!(!graph.follow(bob, alice).await.unwrap());
	assert!(graph.follow(alice, carol).await.unwrap());
	assert!(graph.unfollow(carol, alice).await.unwrap());
	assert!(!graph.unfollow(carol, alice).await.unwrap());

	// Assert
	assert_eq!(graph.followers_of(alice).await.unwrap(), HashSet::from([bob]));
	assert_eq!(graph.following_of(alice).await.unwrap(), HashSet::from([carol]));
	assert!(graph.followers_of(bob).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_self_follow_is_ignored(#[future] database: Database) {
	// Arrange
	let graph = SqlFollowGraph::new(database.await);
	let alice = UserId::new(1);

	// Act
	let added = graph.follow(alice, alice).await.unwrap();

	// Assert
	assert!(!added);
	assert!(graph.followers_of(alice).await.unwrap().is_empty());
	assert!(graph.following_of(alice).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_tweet_store_get(#[future] database: Database, base_time: DateTime<Utc>) {
	// Arrange
	let tweets = SqlTweetStore::new(database.await);
	let tweet = Tweet::new(TweetId::new(11), UserId::new(1), "hello", base_time);
	tweets.insert(&tweet).await.unwrap();

	// Act
	let found = tweets.get(TweetId::new(11)).await.unwrap();
	let missing = tweets.get(TweetId::new(12)).await.unwrap();

	// Assert
	assert_eq!(found, Some(tweet));
	assert_eq!(missing, None);
}

#[rstest]
#[tokio::test]
async fn test_list_by_author_newest_first(#[future] database: Database, base_time: DateTime<Utc>) {
	// Arrange
	let tweets = SqlTweetStore::new(database.await);
	let author = UserId::new(1);
	let oldest = Tweet::new(TweetId::new(1), author, "first", base_time);
	let tied_low = Tweet::new(TweetId::new(2), author, "second", base_time + Duration::minutes(5));
	let tied_high = Tweet::new(TweetId::new(3), author, "third", base_time + Duration::minutes(5));
	let other = Tweet::new(TweetId::new(4), UserId::new(2), "elsewhere", base_time);
	for tweet in [&tied_low, &other, &oldest, &tied_high] {
		tweets.insert(tweet).await.unwrap();
	}

	// Act
	let listed = tweets.list_by_author(author).await.unwrap();
	let nobody = tweets.list_by_author(UserId::new(99)).await.unwrap();

	// Assert
	assert_eq!(listed, vec![tied_high, tied_low, oldest]);
	assert!(nobody.is_empty());
}

// ============================================================================
// Task spawning
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_store_calls_run_on_spawned_tasks(
	#[future] database: Database,
	base_time: DateTime<Utc>,
) {
	// Arrange
	let database = database.await;
	let feeds = SqlFeedStore::new(database.clone());
	let graph = SqlFollowGraph::new(database.clone());
	let tweets = SqlTweetStore::new(database);

	// Act
	let written = tokio::spawn({
		let feeds = feeds.clone();
		async move { feeds.bulk_insert(&[entry(1, 1, base_time)]).await }
	})
	.await
	.unwrap()
	.unwrap();
	let followed = tokio::spawn({
		let graph = graph.clone();
		async move { graph.follow(UserId::new(2), UserId::new(1)).await }
	})
	.await
	.unwrap()
	.unwrap();
	let listed = tokio::spawn({
		let tweets = tweets.clone();
		async move { tweets.list_by_author(UserId::new(1)).await }
	})
	.await
	.unwrap()
	.unwrap();
	let page = tokio::spawn(async move { feeds.query(UserId::new(1), FeedCursor::Head, 5).await })
		.await
		.unwrap()
		.unwrap();

	// Assert
	assert_eq!(written, 1);
	assert!(followed);
	assert!(listed.is_empty());
	assert_eq!(page.len(), 1);
}
