//! Table definitions
//!
//! ```sql
//! CREATE TABLE tweets (
//!     id BIGINT PRIMARY KEY,
//!     user_id BIGINT NOT NULL,
//!     content TEXT NOT NULL,
//!     created_at BIGINT NOT NULL
//! );
//! CREATE INDEX idx_tweets_user_created ON tweets(user_id, created_at);
//!
//! CREATE TABLE friendships (
//!     from_user_id BIGINT NOT NULL,
//!     to_user_id BIGINT NOT NULL,
//!     created_at BIGINT NOT NULL,
//!     PRIMARY KEY (from_user_id, to_user_id)
//! );
//! CREATE INDEX idx_friendships_to_created ON friendships(to_user_id, created_at);
//!
//! CREATE TABLE newsfeeds (
//!     user_id BIGINT NOT NULL,
//!     tweet_id BIGINT NOT NULL,
//!     created_at BIGINT NOT NULL,
//!     PRIMARY KEY (user_id, tweet_id)
//! );
//! CREATE INDEX idx_newsfeeds_user_created ON newsfeeds(user_id, created_at, tweet_id);
//! ```
//!
//! Timestamps are microseconds since the Unix epoch.

use super::{Database, store_error};
use newsfeed_core::StoreError;
use sea_query::{Alias, ColumnDef, Index, Table};

pub const TWEETS: &str = "tweets";
pub const FRIENDSHIPS: &str = "friendships";
pub const NEWSFEEDS: &str = "newsfeeds";

pub const ID: &str = "id";
pub const USER_ID: &str = "user_id";
pub const CONTENT: &str = "content";
pub const CREATED_AT: &str = "created_at";
pub const TWEET_ID: &str = "tweet_id";
pub const FROM_USER_ID: &str = "from_user_id";
pub const TO_USER_ID: &str = "to_user_id";

pub(crate) fn name(identifier: &str) -> Alias {
	Alias::new(identifier)
}

pub(crate) async fn create_tables(database: &Database) -> Result<(), StoreError> {
	for sql in schema_statements(database) {
		sqlx::query(&sql)
			.execute(database.pool())
			.await
			.map_err(store_error)?;
	}

	tracing::debug!("Created newsfeed tables");
	Ok(())
}

/// Rendered DDL, tables before their indexes
fn schema_statements(database: &Database) -> [String; 6] {
	let tweets = Table::create()
		.table(name(TWEETS))
		.if_not_exists()
		.col(ColumnDef::new(name(ID)).big_integer().not_null().primary_key())
		.col(ColumnDef::new(name(USER_ID)).big_integer().not_null())
		.col(ColumnDef::new(name(CONTENT)).text().not_null())
		.col(ColumnDef::new(name(CREATED_AT)).big_integer().not_null())
		.to_owned();

	// The (user_id, created_at) index serves "tweets of U, newest first"
	let tweets_index = Index::create()
		.if_not_exists()
		.name("idx_tweets_user_created")
		.table(name(TWEETS))
		.col(name(USER_ID))
		.col(name(CREATED_AT))
		.to_owned();

	let friendships = Table::create()
		.table(name(FRIENDSHIPS))
		.if_not_exists()
		.col(ColumnDef::new(name(FROM_USER_ID)).big_integer().not_null())
		.col(ColumnDef::new(name(TO_USER_ID)).big_integer().not_null())
		.col(ColumnDef::new(name(CREATED_AT)).big_integer().not_null())
		.primary_key(Index::create().col(name(FROM_USER_ID)).col(name(TO_USER_ID)))
		.to_owned();

	let friendships_index = Index::create()
		.if_not_exists()
		.name("idx_friendships_to_created")
		.table(name(FRIENDSHIPS))
		.col(name(TO_USER_ID))
		.col(name(CREATED_AT))
		.to_owned();

	// The primary key enforces one row per (recipient, tweet)
	let newsfeeds = Table::create()
		.table(name(NEWSFEEDS))
		.if_not_exists()
		.col(ColumnDef::new(name(USER_ID)).big_integer().not_null())
		.col(ColumnDef::new(name(TWEET_ID)).big_integer().not_null())
		.col(ColumnDef::new(name(CREATED_AT)).big_integer().not_null())
		.primary_key(Index::create().col(name(USER_ID)).col(name(TWEET_ID)))
		.to_owned();

	let newsfeeds_index = Index::create()
		.if_not_exists()
		.name("idx_newsfeeds_user_created")
		.table(name(NEWSFEEDS))
		.col(name(USER_ID))
		.col(name(CREATED_AT))
		.col(name(TWEET_ID))
		.to_owned();

	[
		database.build_schema_sql(tweets),
		database.build_schema_sql(tweets_index),
		database.build_schema_sql(friendships),
		database.build_schema_sql(friendships_index),
		database.build_schema_sql(newsfeeds),
		database.build_schema_sql(newsfeeds_index),
	]
}
