//! Strongly typed identifiers for users and tweets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier of a user account
///
/// # Example
///
/// ```rust
/// use newsfeed_core::UserId;
///
/// let alice = UserId::new(1);
/// assert_eq!(alice.value(), 1);
/// assert_eq!(alice.to_string(), "1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
	pub const fn new(id: i64) -> Self {
		Self(id)
	}

	pub const fn value(&self) -> i64 {
		self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for UserId {
	type Err = ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(s.parse()?))
	}
}

impl From<i64> for UserId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// Identifier of a tweet
///
/// Tweet ids are also the tie-breaker when two feed entries share a
/// creation timestamp, so they must be totally ordered.
///
/// # Example
///
/// ```rust
/// use newsfeed_core::TweetId;
///
/// let id: TweetId = "42".parse().unwrap();
/// assert_eq!(id, TweetId::new(42));
/// assert!(TweetId::new(41) < id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweetId(pub i64);

impl TweetId {
	/// Largest representable id; used to build inclusive time cursors
	pub const MAX: TweetId = TweetId(i64::MAX);

	pub const fn new(id: i64) -> Self {
		Self(id)
	}

	pub const fn value(&self) -> i64 {
		self.0
	}
}

impl fmt::Display for TweetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TweetId {
	type Err = ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(s.parse()?))
	}
}

impl From<i64> for TweetId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("0", 0)]
	#[case("17", 17)]
	#[case("-3", -3)]
	fn test_parse_user_id(#[case] input: &str, #[case] expected: i64) {
		// Act
		let id: UserId = input.parse().unwrap();

		// Assert
		assert_eq!(id.value(), expected);
	}

	#[rstest]
	fn test_parse_tweet_id_rejects_garbage() {
		// Act
		let result = "abc".parse::<TweetId>();

		// Assert
		assert!(result.is_err());
	}

	#[rstest]
	fn test_ids_serialize_transparently() {
		// Act
		let json = serde_json::to_string(&TweetId::new(9)).unwrap();

		// Assert
		assert_eq!(json, "9");
	}
}
