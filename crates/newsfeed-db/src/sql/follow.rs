//! SQL follow graph over the `friendships` table

use super::schema::{CREATED_AT, FRIENDSHIPS, FROM_USER_ID, TO_USER_ID, name};
use super::{Database, store_error};
use async_trait::async_trait;
use newsfeed_core::time::{to_micros, utc_now};
use newsfeed_core::{FollowGraph, StoreResult, UserId};
use sea_query::{Expr, ExprTrait, OnConflict, Query};
use sqlx::Row;
use std::collections::HashSet;

/// Follow graph stored as `friendships(from_user_id, to_user_id)` rows,
/// where `from_user_id` follows `to_user_id`
#[derive(Clone)]
pub struct SqlFollowGraph {
	database: Database,
}

impl SqlFollowGraph {
	pub fn new(database: Database) -> Self {
		Self { database }
	}

	/// Record a follow; returns `false` if the edge already existed
	///
	/// Self-follows are ignored and return `false`.
	pub async fn follow(&self, follower_id: UserId, followee_id: UserId) -> StoreResult<bool> {
		if follower_id == followee_id {
			return Ok(false);
		}

		let sql = self.database.build_sql(
			Query::insert()
				.into_table(name(FRIENDSHIPS))
				.columns([name(FROM_USER_ID), name(TO_USER_ID), name(CREATED_AT)])
				.values_panic([
					follower_id.value().into(),
					followee_id.value().into(),
					to_micros(utc_now()).into(),
				])
				.on_conflict(
					OnConflict::columns([name(FROM_USER_ID), name(TO_USER_ID)])
						.do_nothing()
						.to_owned(),
				)
				.to_owned(),
		);

		let result = sqlx::query(&sql)
			.execute(self.database.pool())
			.await
			.map_err(store_error)?;
		Ok(result.rows_affected() > 0)
	}

	/// Remove a follow; returns `false` if it did not exist
	pub async fn unfollow(&self, follower_id: UserId, followee_id: UserId) -> StoreResult<bool> {
		let sql = self.database.build_sql(
			Query::delete()
				.from_table(name(FRIENDSHIPS))
				.and_where(Expr::col(name(FROM_USER_ID)).eq(follower_id.value()))
				.and_where(Expr::col(name(TO_USER_ID)).eq(followee_id.value()))
				.to_owned(),
		);

		let result = sqlx::query(&sql)
			.execute(self.database.pool())
			.await
			.map_err(store_error)?;
		Ok(result.rows_affected() > 0)
	}

	async fn select_column(
		&self,
		selected: &str,
		filter: &str,
		user_id: UserId,
	) -> StoreResult<HashSet<UserId>> {
		let sql = self.database.build_sql(
			Query::select()
				.column(name(selected))
				.from(name(FRIENDSHIPS))
				.and_where(Expr::col(name(filter)).eq(user_id.value()))
				.to_owned(),
		);

		let rows = sqlx::query(&sql)
			.fetch_all(self.database.pool())
			.await
			.map_err(store_error)?;

		rows.iter()
			.map(|row| {
				row.try_get::<i64, _>(selected)
					.map(UserId::new)
					.map_err(store_error)
			})
			.collect()
	}
}

#[async_trait]
impl FollowGraph for SqlFollowGraph {
	async fn followers_of(&self, user_id: UserId) -> StoreResult<HashSet<UserId>> {
		self.select_column(FROM_USER_ID, TO_USER_ID, user_id).await
	}

	async fn following_of(&self, user_id: UserId) -> StoreResult<HashSet<UserId>> {
		self.select_column(TO_USER_ID, FROM_USER_ID, user_id).await
	}
}
