//! # newsfeed-core
//!
//! Shared vocabulary of the newsfeed fan-out pipeline: identifiers, the
//! [`Tweet`] and [`FeedEntry`] records, feed cursors, error types, the
//! collaborator traits the pipeline consumes and the pipeline settings.
//!
//! ## Example
//!
//! ```rust
//! use newsfeed_core::{FeedCursor, FeedEntry, Tweet, TweetId, UserId};
//! use chrono::Utc;
//!
//! let tweet = Tweet::new(TweetId::new(1), UserId::new(10), "hello", Utc::now());
//! let entry = FeedEntry::for_tweet(UserId::new(11), &tweet);
//!
//! assert!(FeedCursor::Head.admits(&entry));
//! assert!(!FeedCursor::after_entry(&entry).admits(&entry));
//! ```

pub mod cursor;
pub mod error;
pub mod ids;
pub mod models;
pub mod retry;
pub mod settings;
pub mod store;
pub mod time;

pub use cursor::{FeedCursor, newest_first};
pub use error::{FeedError, Result, StoreError, StoreResult};
pub use ids::{TweetId, UserId};
pub use models::{FeedEntry, FollowEdge, Tweet};
pub use retry::RetryStrategy;
pub use settings::{FanoutMode, FeedSettings, SettingsError};
pub use store::{FeedStore, FollowGraph, TweetStore};
