//! SQL-backed stores
//!
//! Statements are built with sea-query and executed through sqlx's `Any`
//! driver, so the same stores run on SQLite and PostgreSQL.
//!
//! ## Example
//!
//! ```rust,no_run
//! use newsfeed_db::sql::{Database, SqlFeedStore};
//!
//! # async fn example() {
//! let database = Database::connect("postgres://localhost/newsfeed").await.unwrap();
//! database.create_tables().await.unwrap();
//!
//! let feeds = SqlFeedStore::new(database.clone());
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example());
//! ```

pub mod feed;
pub mod follow;
pub mod schema;
pub mod tweet;

pub use feed::SqlFeedStore;
pub use follow::SqlFollowGraph;
pub use tweet::SqlTweetStore;

use newsfeed_core::StoreError;
use sea_query::{PostgresQueryBuilder, QueryStatementWriter, SchemaStatementBuilder, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::sync::Arc;

/// SQL dialect of the connected database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
	Postgres,
	Sqlite,
}

impl DatabaseBackend {
	/// Detect the dialect from a connection URL
	///
	/// # Examples
	///
	/// ```
	/// use newsfeed_db::sql::DatabaseBackend;
	///
	/// assert_eq!(DatabaseBackend::from_url("sqlite::memory:"), Some(DatabaseBackend::Sqlite));
	/// assert_eq!(DatabaseBackend::from_url("postgresql://db/feed"), Some(DatabaseBackend::Postgres));
	/// assert_eq!(DatabaseBackend::from_url("mysql://db/feed"), None);
	/// ```
	pub fn from_url(url: &str) -> Option<Self> {
		if url.starts_with("postgres://") || url.starts_with("postgresql://") {
			Some(DatabaseBackend::Postgres)
		} else if url.starts_with("sqlite:") {
			Some(DatabaseBackend::Sqlite)
		} else {
			None
		}
	}
}

/// Shared connection pool plus the dialect used to render statements
#[derive(Clone)]
pub struct Database {
	pool: Arc<AnyPool>,
	backend: DatabaseBackend,
}

impl Database {
	/// Connect with default pool options
	pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
		Self::connect_with(database_url, AnyPoolOptions::new()).await
	}

	/// Connect with explicit pool options
	///
	/// In-memory SQLite databases live as long as their connection, so they
	/// need a single connection that is never recycled:
	///
	/// ```rust,no_run
	/// use newsfeed_db::sql::Database;
	/// use sqlx::any::AnyPoolOptions;
	///
	/// # async fn example() {
	/// let options = AnyPoolOptions::new()
	///     .max_connections(1)
	///     .idle_timeout(None)
	///     .max_lifetime(None);
	/// let database = Database::connect_with("sqlite::memory:", options).await.unwrap();
	/// # }
	/// ```
	pub async fn connect_with(
		database_url: &str,
		options: AnyPoolOptions,
	) -> Result<Self, StoreError> {
		let backend = DatabaseBackend::from_url(database_url).ok_or_else(|| {
			StoreError::Unavailable(format!("unsupported database url: {}", database_url))
		})?;

		sqlx::any::install_default_drivers();
		let pool = options
			.connect(database_url)
			.await
			.map_err(|e| StoreError::Unavailable(format!("Database connection error: {}", e)))?;

		tracing::debug!(?backend, "Connected newsfeed database");
		Ok(Self {
			pool: Arc::new(pool),
			backend,
		})
	}

	/// Wrap an existing pool
	pub fn from_pool(pool: Arc<AnyPool>, backend: DatabaseBackend) -> Self {
		Self { pool, backend }
	}

	pub fn pool(&self) -> &AnyPool {
		&self.pool
	}

	pub fn backend(&self) -> DatabaseBackend {
		self.backend
	}

	/// Render a DML statement for the connected backend
	///
	/// Takes the statement by value so it is dropped before the query is
	/// awaited; sea-query statements are not `Send`.
	pub(crate) fn build_sql<T>(&self, statement: T) -> String
	where
		T: QueryStatementWriter,
	{
		match self.backend {
			DatabaseBackend::Postgres => statement.to_string(PostgresQueryBuilder),
			DatabaseBackend::Sqlite => statement.to_string(SqliteQueryBuilder),
		}
	}

	/// Render a DDL statement for the connected backend
	pub(crate) fn build_schema_sql<T>(&self, statement: T) -> String
	where
		T: SchemaStatementBuilder,
	{
		match self.backend {
			DatabaseBackend::Postgres => statement.to_string(PostgresQueryBuilder),
			DatabaseBackend::Sqlite => statement.to_string(SqliteQueryBuilder),
		}
	}

	/// Create the `tweets`, `friendships` and `newsfeeds` tables and their indexes
	pub async fn create_tables(&self) -> Result<(), StoreError> {
		schema::create_tables(self).await
	}
}

/// Classify a sqlx failure into the store error kinds
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
	match &err {
		sqlx::Error::Io(_)
		| sqlx::Error::Tls(_)
		| sqlx::Error::Protocol(_)
		| sqlx::Error::PoolTimedOut
		| sqlx::Error::PoolClosed
		| sqlx::Error::WorkerCrashed
		| sqlx::Error::Configuration(_) => StoreError::Unavailable(err.to_string()),
		sqlx::Error::ColumnDecode { .. }
		| sqlx::Error::ColumnNotFound(_)
		| sqlx::Error::Decode(_)
		| sqlx::Error::TypeNotFound { .. } => StoreError::Decode(err.to_string()),
		_ => StoreError::Write(err.to_string()),
	}
}
