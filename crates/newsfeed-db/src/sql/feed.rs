//! SQL feed store

use super::schema::{CREATED_AT, NEWSFEEDS, TWEET_ID, USER_ID, name};
use super::{Database, store_error};
use async_trait::async_trait;
use newsfeed_core::time::{from_micros, to_micros};
use newsfeed_core::{FeedCursor, FeedEntry, FeedStore, StoreError, StoreResult, TweetId, UserId};
use sea_query::{Cond, Expr, ExprTrait, OnConflict, Order, Query};
use sqlx::Row;
use sqlx::any::AnyRow;

/// Feed view persisted in the `newsfeeds` table
///
/// A batch is written as one multi-row `INSERT ... ON CONFLICT DO NOTHING`
/// inside a transaction: either every row of the batch becomes visible or
/// none does, and rows that already exist are skipped. Pages are served by
/// the `(user_id, created_at, tweet_id)` index in index order.
#[derive(Clone)]
pub struct SqlFeedStore {
	database: Database,
}

impl SqlFeedStore {
	pub fn new(database: Database) -> Self {
		Self { database }
	}

	fn decode(row: &AnyRow) -> StoreResult<FeedEntry> {
		let recipient_id: i64 = row.try_get(USER_ID).map_err(store_error)?;
		let tweet_id: i64 = row.try_get(TWEET_ID).map_err(store_error)?;
		let created_at: i64 = row.try_get(CREATED_AT).map_err(store_error)?;
		let tweet_created_at = from_micros(created_at)
			.ok_or_else(|| StoreError::Decode(format!("timestamp out of range: {}", created_at)))?;

		Ok(FeedEntry {
			recipient_id: UserId::new(recipient_id),
			tweet_id: TweetId::new(tweet_id),
			tweet_created_at,
		})
	}
}

#[async_trait]
impl FeedStore for SqlFeedStore {
	async fn bulk_insert(&self, entries: &[FeedEntry]) -> StoreResult<u64> {
		if entries.is_empty() {
			return Ok(0);
		}

		let sql = {
			let mut stmt = Query::insert();
			stmt.into_table(name(NEWSFEEDS))
				.columns([name(USER_ID), name(TWEET_ID), name(CREATED_AT)])
				.on_conflict(
					OnConflict::columns([name(USER_ID), name(TWEET_ID)])
						.do_nothing()
						.to_owned(),
				);
			for entry in entries {
				stmt.values_panic([
					entry.recipient_id.value().into(),
					entry.tweet_id.value().into(),
					to_micros(entry.tweet_created_at).into(),
				]);
			}
			self.database.build_sql(stmt)
		};

		let mut tx = self.database.pool().begin().await.map_err(store_error)?;
		let result = sqlx::query(&sql)
			.execute(&mut *tx)
			.await
			.map_err(store_error)?;
		tx.commit().await.map_err(store_error)?;

		Ok(result.rows_affected())
	}

	async fn query(
		&self,
		recipient_id: UserId,
		cursor: FeedCursor,
		limit: usize,
	) -> StoreResult<Vec<FeedEntry>> {
		let sql = {
			let mut condition = Cond::all().add(Expr::col(name(USER_ID)).eq(recipient_id.value()));
			if let FeedCursor::Before {
				created_at,
				tweet_id,
			} = cursor
			{
				let micros = to_micros(created_at);
				condition = condition.add(
					Cond::any()
						.add(Expr::col(name(CREATED_AT)).lt(micros))
						.add(
							Cond::all()
								.add(Expr::col(name(CREATED_AT)).eq(micros))
								.add(Expr::col(name(TWEET_ID)).lt(tweet_id.value())),
						),
				);
			}

			self.database.build_sql(
				Query::select()
					.columns([name(USER_ID), name(TWEET_ID), name(CREATED_AT)])
					.from(name(NEWSFEEDS))
					.cond_where(condition)
					.order_by(name(CREATED_AT), Order::Desc)
					.order_by(name(TWEET_ID), Order::Desc)
					.limit(limit as u64)
					.to_owned(),
			)
		};

		let rows = sqlx::query(&sql)
			.fetch_all(self.database.pool())
			.await
			.map_err(store_error)?;

		rows.iter().map(Self::decode).collect()
	}
}
