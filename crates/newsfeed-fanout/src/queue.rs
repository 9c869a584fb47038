//! Background fan-out
//!
//! Jobs go through a bounded channel drained by a fixed pool of workers.
//! A job whose fan-out keeps failing is retried as a whole, up to
//! `max_job_attempts`, and then parked on the dead-letter list.

use crate::engine::FanoutEngine;
use newsfeed_core::{FeedError, FeedSettings, Result, RetryStrategy, Tweet, TweetId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// A fan-out job given up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
	pub tweet_id: TweetId,
	pub attempts: u32,
	/// Display form of the last error
	pub error: String,
}

/// Counters of a [`FanoutQueue`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
	pub enqueued: u64,
	pub completed: u64,
	pub dead_lettered: u64,
}

#[derive(Default)]
struct Counters {
	enqueued: AtomicU64,
	completed: AtomicU64,
	dead_lettered: AtomicU64,
}

/// Worker pool running [`FanoutEngine::distribute`] off the request path
///
/// # Examples
///
/// ```rust
/// use newsfeed_core::{FeedSettings, UserId};
/// use newsfeed_db::{InMemoryFeedStore, InMemoryFollowGraph, InMemoryTweetStore};
/// use newsfeed_fanout::{FanoutEngine, FanoutQueue};
/// use std::sync::Arc;
///
/// # async fn example() {
/// let tweets = InMemoryTweetStore::new();
/// let feeds = InMemoryFeedStore::new();
/// let settings = FeedSettings::default();
/// let engine = FanoutEngine::new(
///     Arc::new(InMemoryFollowGraph::new()),
///     Arc::new(tweets.clone()),
///     Arc::new(feeds.clone()),
///     &settings,
/// )
/// .unwrap();
///
/// let queue = FanoutQueue::start(engine, &settings);
/// let tweet = tweets.create(UserId::new(1), "later").await;
/// queue.enqueue(tweet.clone()).await.unwrap();
///
/// let dead = queue.shutdown().await;
/// assert!(dead.is_empty());
/// assert!(feeds.contains(UserId::new(1), tweet.id).await);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
pub struct FanoutQueue {
	sender: Mutex<Option<mpsc::Sender<Tweet>>>,
	workers: Mutex<Vec<JoinHandle<()>>>,
	dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
	counters: Arc<Counters>,
}

impl FanoutQueue {
	/// Spawn `settings.workers` workers on the current runtime
	pub fn start(engine: FanoutEngine, settings: &FeedSettings) -> Self {
		let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
		let receiver = Arc::new(Mutex::new(receiver));
		let dead_letters = Arc::new(Mutex::new(Vec::new()));
		let counters = Arc::new(Counters::default());

		let policy = JobPolicy {
			max_attempts: settings.max_job_attempts.max(1),
			retry: settings.retry,
		};

		let workers = (0..settings.workers.max(1))
			.map(|worker| {
				let worker_loop = Worker {
					id: worker,
					engine: engine.clone(),
					receiver: Arc::clone(&receiver),
					dead_letters: Arc::clone(&dead_letters),
					counters: Arc::clone(&counters),
					policy,
				};
				tokio::spawn(worker_loop.run())
			})
			.collect();

		tracing::info!(
			workers = settings.workers,
			capacity = settings.queue_capacity,
			"Started fan-out queue"
		);

		Self {
			sender: Mutex::new(Some(sender)),
			workers: Mutex::new(workers),
			dead_letters,
			counters,
		}
	}

	/// Hand a tweet to the workers
	///
	/// Waits for room when the channel is full. Fails with
	/// [`FeedError::QueueClosed`] once [`FanoutQueue::shutdown`] has begun.
	pub async fn enqueue(&self, tweet: Tweet) -> Result<()> {
		let sender = self
			.sender
			.lock()
			.await
			.clone()
			.ok_or(FeedError::QueueClosed)?;

		// Counted before the send; a worker may finish the job before
		// `send` returns.
		let tweet_id = tweet.id;
		self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
		if sender.send(tweet).await.is_err() {
			self.counters.enqueued.fetch_sub(1, Ordering::SeqCst);
			return Err(FeedError::QueueClosed);
		}
		tracing::debug!(tweet_id = %tweet_id, "Enqueued fan-out job");
		Ok(())
	}

	pub fn stats(&self) -> QueueStats {
		// Finished counts are read before `enqueued` so a snapshot never
		// shows more finished jobs than enqueued ones.
		let completed = self.counters.completed.load(Ordering::SeqCst);
		let dead_lettered = self.counters.dead_lettered.load(Ordering::SeqCst);
		QueueStats {
			enqueued: self.counters.enqueued.load(Ordering::SeqCst),
			completed,
			dead_lettered,
		}
	}

	/// Dead letters recorded and not yet taken
	pub async fn dead_letters(&self) -> Vec<DeadLetter> {
		self.dead_letters.lock().await.clone()
	}

	/// Remove and return the recorded dead letters
	///
	/// The `dead_lettered` counter keeps its lifetime total.
	pub async fn take_dead_letters(&self) -> Vec<DeadLetter> {
		std::mem::take(&mut *self.dead_letters.lock().await)
	}

	/// Stop accepting jobs, drain the channel and wait for the workers
	///
	/// Returns the dead letters not already removed with
	/// [`FanoutQueue::take_dead_letters`].
	pub async fn shutdown(&self) -> Vec<DeadLetter> {
		drop(self.sender.lock().await.take());

		let workers = std::mem::take(&mut *self.workers.lock().await);
		for handle in workers {
			if let Err(err) = handle.await {
				tracing::error!(error = %err, "Fan-out worker panicked");
			}
		}

		let stats = self.stats();
		tracing::info!(
			enqueued = stats.enqueued,
			completed = stats.completed,
			dead_lettered = stats.dead_lettered,
			"Fan-out queue stopped"
		);
		self.take_dead_letters().await
	}
}

#[derive(Clone, Copy)]
struct JobPolicy {
	max_attempts: u32,
	retry: RetryStrategy,
}

struct Worker {
	id: usize,
	engine: FanoutEngine,
	receiver: Arc<Mutex<mpsc::Receiver<Tweet>>>,
	dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
	counters: Arc<Counters>,
	policy: JobPolicy,
}

impl Worker {
	async fn run(self) {
		loop {
			// The lock is released before the job runs.
			let job = self.receiver.lock().await.recv().await;
			let Some(tweet) = job else {
				break;
			};
			self.process(tweet).await;
		}
		tracing::debug!(worker = self.id, "Fan-out worker exiting");
	}

	async fn process(&self, tweet: Tweet) {
		let mut attempt: u32 = 1;
		loop {
			match self.engine.distribute(&tweet).await {
				Ok(_) => {
					self.counters.completed.fetch_add(1, Ordering::SeqCst);
					return;
				}
				Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
					let delay = self.policy.retry.delay_for(attempt - 1);
					tracing::warn!(
						worker = self.id,
						tweet_id = %tweet.id,
						attempt,
						?delay,
						error = %err,
						"Fan-out job failed, retrying"
					);
					attempt += 1;
					tokio::time::sleep(delay).await;
				}
				Err(err) => {
					tracing::error!(
						worker = self.id,
						tweet_id = %tweet.id,
						attempts = attempt,
						error = %err,
						"Fan-out job dead-lettered"
					);
					self.dead_letters.lock().await.push(DeadLetter {
						tweet_id: tweet.id,
						attempts: attempt,
						error: err.to_string(),
					});
					self.counters.dead_lettered.fetch_add(1, Ordering::SeqCst);
					return;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use newsfeed_core::{FeedStore, UserId};
	use newsfeed_db::testing::FlakyFeedStore;
	use newsfeed_db::{InMemoryFeedStore, InMemoryFollowGraph, InMemoryTweetStore};
	use rstest::rstest;

	fn settings(max_job_attempts: u32) -> FeedSettings {
		FeedSettings {
			max_chunk_retries: 0,
			max_job_attempts,
			workers: 2,
			queue_capacity: 8,
			retry: RetryStrategy::Immediate,
			..FeedSettings::default()
		}
	}

	fn engine(
		graph: &InMemoryFollowGraph,
		tweets: &InMemoryTweetStore,
		feeds: Arc<dyn FeedStore>,
		settings: &FeedSettings,
	) -> FanoutEngine {
		FanoutEngine::new(
			Arc::new(graph.clone()),
			Arc::new(tweets.clone()),
			feeds,
			settings,
		)
		.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_jobs_are_drained_on_shutdown() {
		// Arrange
		let (graph, tweets, feeds) = (
			InMemoryFollowGraph::new(),
			InMemoryTweetStore::new(),
			InMemoryFeedStore::new(),
		);
		graph.follow(UserId::new(2), UserId::new(1)).await;
		let settings = settings(3);
		let queue = FanoutQueue::start(
			engine(&graph, &tweets, Arc::new(feeds.clone()), &settings),
			&settings,
		);
		let mut created = Vec::new();
		for n in 0..5 {
			created.push(tweets.create(UserId::new(1), format!("tweet {}", n)).await);
		}

		// Act
		for tweet in &created {
			queue.enqueue(tweet.clone()).await.unwrap();
		}
		let dead = queue.shutdown().await;

		// Assert
		assert!(dead.is_empty());
		assert_eq!(
			queue.stats(),
			QueueStats {
				enqueued: 5,
				completed: 5,
				dead_lettered: 0
			}
		);
		for tweet in &created {
			assert!(feeds.contains(UserId::new(2), tweet.id).await);
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_failed_attempt_is_retried_as_whole_call() {
		// Arrange
		let (graph, tweets, feeds) = (
			InMemoryFollowGraph::new(),
			InMemoryTweetStore::new(),
			InMemoryFeedStore::new(),
		);
		let flaky = FlakyFeedStore::new(feeds.clone()).fail_calls([1]);
		let settings = settings(3);
		let queue = FanoutQueue::start(
			engine(&graph, &tweets, Arc::new(flaky.clone()), &settings),
			&settings,
		);
		let tweet = tweets.create(UserId::new(1), "second time lucky").await;

		// Act
		queue.enqueue(tweet.clone()).await.unwrap();
		let dead = queue.shutdown().await;

		// Assert
		assert!(dead.is_empty());
		assert_eq!(flaky.calls(), 2);
		assert!(feeds.contains(UserId::new(1), tweet.id).await);
	}

	#[rstest]
	#[tokio::test]
	async fn test_exhausted_job_is_dead_lettered() {
		// Arrange
		let (graph, tweets, feeds) = (
			InMemoryFollowGraph::new(),
			InMemoryTweetStore::new(),
			InMemoryFeedStore::new(),
		);
		let flaky = FlakyFeedStore::new(feeds.clone()).fail_calls(1..=2);
		let settings = settings(2);
		let queue = FanoutQueue::start(
			engine(&graph, &tweets, Arc::new(flaky), &settings),
			&settings,
		);
		let tweet = tweets.create(UserId::new(1), "never lands").await;

		// Act
		queue.enqueue(tweet.clone()).await.unwrap();
		let dead = queue.shutdown().await;

		// Assert
		assert_eq!(dead.len(), 1);
		assert_eq!(dead[0].tweet_id, tweet.id);
		assert_eq!(dead[0].attempts, 2);
		assert!(dead[0].error.contains("chunk 0"));
		assert_eq!(queue.stats().dead_lettered, 1);
		assert!(feeds.is_empty().await);
	}

	#[rstest]
	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_stats_never_report_more_finished_than_enqueued() {
		// Arrange
		let tweets = InMemoryTweetStore::new();
		let settings = FeedSettings {
			workers: 4,
			..settings(1)
		};
		let queue = Arc::new(FanoutQueue::start(
			engine(
				&InMemoryFollowGraph::new(),
				&tweets,
				Arc::new(InMemoryFeedStore::new()),
				&settings,
			),
			&settings,
		));
		let watcher = {
			let queue = Arc::clone(&queue);
			tokio::spawn(async move {
				loop {
					let stats = queue.stats();
					assert!(stats.completed + stats.dead_lettered <= stats.enqueued);
					if stats.completed == 200 {
						break;
					}
					tokio::task::yield_now().await;
				}
			})
		};

		// Act
		for n in 0..200 {
			let tweet = tweets.create(UserId::new(n % 7 + 1), "counted").await;
			queue.enqueue(tweet).await.unwrap();
		}
		queue.shutdown().await;
		watcher.await.unwrap();

		// Assert
		assert_eq!(queue.stats().enqueued, 200);
		assert_eq!(queue.stats().completed, 200);
	}

	#[rstest]
	#[tokio::test]
	async fn test_take_dead_letters_empties_the_list() {
		// Arrange
		let (tweets, feeds) = (InMemoryTweetStore::new(), InMemoryFeedStore::new());
		let flaky = FlakyFeedStore::new(feeds).fail_calls([1]);
		let settings = settings(1);
		let queue = FanoutQueue::start(
			engine(&InMemoryFollowGraph::new(), &tweets, Arc::new(flaky), &settings),
			&settings,
		);
		let tweet = tweets.create(UserId::new(1), "dropped").await;
		queue.enqueue(tweet.clone()).await.unwrap();
		while queue.stats().dead_lettered == 0 {
			tokio::task::yield_now().await;
		}

		// Act
		let taken = queue.take_dead_letters().await;
		let remaining = queue.dead_letters().await;
		let at_shutdown = queue.shutdown().await;

		// Assert
		assert_eq!(taken.len(), 1);
		assert_eq!(taken[0].tweet_id, tweet.id);
		assert!(remaining.is_empty());
		assert!(at_shutdown.is_empty());
		assert_eq!(queue.stats().dead_lettered, 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_enqueue_after_shutdown_is_rejected() {
		// Arrange
		let tweets = InMemoryTweetStore::new();
		let settings = settings(1);
		let queue = FanoutQueue::start(
			engine(
				&InMemoryFollowGraph::new(),
				&tweets,
				Arc::new(InMemoryFeedStore::new()),
				&settings,
			),
			&settings,
		);
		queue.shutdown().await;
		let tweet = tweets.create(UserId::new(1), "too late").await;

		// Act
		let result = queue.enqueue(tweet).await;

		// Assert
		assert!(matches!(result, Err(FeedError::QueueClosed)));
	}
}
