//! Timestamp helpers shared by the stores

use chrono::{DateTime, Utc};

/// Current UTC time
pub fn utc_now() -> DateTime<Utc> {
	Utc::now()
}

/// Convert a timestamp to microseconds since the Unix epoch
///
/// Feed rows persist timestamps as integers so that ordering in every
/// backend is plain integer ordering.
pub fn to_micros(at: DateTime<Utc>) -> i64 {
	at.timestamp_micros()
}

/// Inverse of [`to_micros`]; `None` if the value is out of chrono's range
pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
	DateTime::from_timestamp_micros(micros)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use rstest::rstest;

	#[rstest]
	fn test_micros_preserve_sub_second_precision() {
		// Arrange
		let at = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();

		// Act
		let micros = to_micros(at);

		// Assert
		assert_eq!(micros, 1_700_000_000_123_456);
		assert_eq!(from_micros(micros), Some(at));
	}
}
