//! In-memory follow graph

use async_trait::async_trait;
use newsfeed_core::{FollowEdge, FollowGraph, StoreResult, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Edges {
	/// followee -> followers
	followers: HashMap<UserId, HashSet<UserId>>,
	/// follower -> followees
	following: HashMap<UserId, HashSet<UserId>>,
}

/// In-memory social graph
///
/// Both directions are updated under one lock, so `followers_of` and
/// `following_of` always agree.
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{FollowGraph, UserId};
/// use newsfeed_db::InMemoryFollowGraph;
///
/// # async fn example() {
/// let graph = InMemoryFollowGraph::new();
/// graph.follow(UserId::new(2), UserId::new(1)).await;
///
/// let followers = graph.followers_of(UserId::new(1)).await.unwrap();
/// assert!(followers.contains(&UserId::new(2)));
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryFollowGraph {
	edges: Arc<RwLock<Edges>>,
}

impl InMemoryFollowGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record that `follower_id` follows `followee_id`
	///
	/// Returns `false` if the edge already existed. Self-follows are ignored.
	pub async fn follow(&self, follower_id: UserId, followee_id: UserId) -> bool {
		if follower_id == followee_id {
			return false;
		}
		let mut edges = self.edges.write().await;
		let added = edges
			.followers
			.entry(followee_id)
			.or_default()
			.insert(follower_id);
		edges
			.following
			.entry(follower_id)
			.or_default()
			.insert(followee_id);
		added
	}

	/// Remove the edge; returns `false` if it did not exist
	pub async fn unfollow(&self, follower_id: UserId, followee_id: UserId) -> bool {
		let mut edges = self.edges.write().await;
		let removed = edges
			.followers
			.get_mut(&followee_id)
			.is_some_and(|set| set.remove(&follower_id));
		if let Some(set) = edges.following.get_mut(&follower_id) {
			set.remove(&followee_id);
		}
		removed
	}

	/// Bulk-load edges, e.g. from a fixture
	pub async fn extend(&self, edges: impl IntoIterator<Item = FollowEdge>) {
		for edge in edges {
			self.follow(edge.follower_id, edge.followee_id).await;
		}
	}
}

#[async_trait]
impl FollowGraph for InMemoryFollowGraph {
	async fn followers_of(&self, user_id: UserId) -> StoreResult<HashSet<UserId>> {
		let edges = self.edges.read().await;
		Ok(edges.followers.get(&user_id).cloned().unwrap_or_default())
	}

	async fn following_of(&self, user_id: UserId) -> StoreResult<HashSet<UserId>> {
		let edges = self.edges.read().await;
		Ok(edges.following.get(&user_id).cloned().unwrap_or_default())
	}
}
