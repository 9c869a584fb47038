//! SQL tweet store over the `tweets` table

use super::schema::{CONTENT, CREATED_AT, ID, TWEETS, USER_ID, name};
use super::{Database, store_error};
use async_trait::async_trait;
use newsfeed_core::time::{from_micros, to_micros};
use newsfeed_core::{StoreError, StoreResult, Tweet, TweetId, TweetStore, UserId};
use sea_query::{Expr, ExprTrait, Order, Query};
use sqlx::Row;
use sqlx::any::AnyRow;

#[derive(Clone)]
pub struct SqlTweetStore {
	database: Database,
}

impl SqlTweetStore {
	pub fn new(database: Database) -> Self {
		Self { database }
	}

	fn decode(row: &AnyRow) -> StoreResult<Tweet> {
		let id: i64 = row.try_get(ID).map_err(store_error)?;
		let author_id: i64 = row.try_get(USER_ID).map_err(store_error)?;
		let content: String = row.try_get(CONTENT).map_err(store_error)?;
		let created_at: i64 = row.try_get(CREATED_AT).map_err(store_error)?;
		let created_at = from_micros(created_at)
			.ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {}", created_at)))?;

		Ok(Tweet::new(
			TweetId::new(id),
			UserId::new(author_id),
			content,
			created_at,
		))
	}

	/// Persist a tweet whose id was assigned by the caller
	pub async fn insert(&self, tweet: &Tweet) -> StoreResult<()> {
		let sql = self.database.build_sql(
			Query::insert()
				.into_table(name(TWEETS))
				.columns([name(ID), name(USER_ID), name(CONTENT), name(CREATED_AT)])
				.values_panic([
					tweet.id.value().into(),
					tweet.author_id.value().into(),
					tweet.content.clone().into(),
					to_micros(tweet.created_at).into(),
				])
				.to_owned(),
		);

		sqlx::query(&sql)
			.execute(self.database.pool())
			.await
			.map_err(store_error)?;
		Ok(())
	}

	/// Tweets of `author_id`, newest first
	///
	/// Served by the `(user_id, created_at)` index.
	pub async fn list_by_author(&self, author_id: UserId) -> StoreResult<Vec<Tweet>> {
		let sql = self.database.build_sql(
			Query::select()
				.columns([name(ID), name(USER_ID), name(CONTENT), name(CREATED_AT)])
				.from(name(TWEETS))
				.and_where(Expr::col(name(USER_ID)).eq(author_id.value()))
				.order_by(name(CREATED_AT), Order::Desc)
				.order_by(name(ID), Order::Desc)
				.to_owned(),
		);

		let rows = sqlx::query(&sql)
			.fetch_all(self.database.pool())
			.await
			.map_err(store_error)?;

		rows.iter().map(Self::decode).collect()
	}
}

#[async_trait]
impl TweetStore for SqlTweetStore {
	async fn get(&self, tweet_id: TweetId) -> StoreResult<Option<Tweet>> {
		let sql = self.database.build_sql(
			Query::select()
				.columns([name(ID), name(USER_ID), name(CONTENT), name(CREATED_AT)])
				.from(name(TWEETS))
				.and_where(Expr::col(name(ID)).eq(tweet_id.value()))
				.to_owned(),
		);

		let row = sqlx::query(&sql)
			.fetch_optional(self.database.pool())
			.await
			.map_err(store_error)?;

		row.as_ref().map(Self::decode).transpose()
	}
}
