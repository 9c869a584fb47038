//! # newsfeed-fanout
//!
//! Fan-out-on-write for a follower-based news feed.
//!
//! - [`FanoutEngine`]: writes a tweet into the feed of its author and every
//!   follower, in bounded chunks with per-chunk retry
//! - [`FeedReader`]: cursor-paged, newest-first reads of one feed
//! - [`FanoutQueue`]: worker pool running fan-outs off the request path,
//!   with whole-call retry and a dead-letter list
//! - [`NewsFeedService`]: wires the three together according to
//!   [`FeedSettings::fanout_mode`](newsfeed_core::FeedSettings)
//!
//! The engine and reader only talk to the store traits of `newsfeed-core`,
//! so any `FollowGraph`/`TweetStore`/`FeedStore` implementation plugs in.

pub mod engine;
pub mod queue;
pub mod reader;
pub mod service;

pub use engine::{FanoutEngine, FanoutResult};
pub use queue::{DeadLetter, FanoutQueue, QueueStats};
pub use reader::{FeedPage, FeedReader};
pub use service::{FanoutOutcome, NewsFeedService};
