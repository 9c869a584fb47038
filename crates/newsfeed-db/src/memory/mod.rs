//! In-memory store implementations
//!
//! Process-local stores with the same semantics as the SQL stores. Used by
//! tests and by embedders that keep the feed in memory.

pub mod feed;
pub mod follow;
pub mod tweet;

pub use feed::InMemoryFeedStore;
pub use follow::InMemoryFollowGraph;
pub use tweet::InMemoryTweetStore;
