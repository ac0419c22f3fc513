use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timestamp overflow")]
pub struct TimestampOverflow;

/// A presentation time in microseconds, relative to the start of the stream.
///
/// Unlike [Duration], this is a plain integer so it can be compared and subtracted cheaply on
/// the presentation path.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
	/// The zero timestamp.
	pub const ZERO: Self = Self(0);

	pub const fn from_micros(micros: u64) -> Self {
		Self(micros)
	}

	/// The difference between two timestamps, clamped to zero.
	pub fn saturating_sub(self, rhs: Self) -> Self {
		Self(self.0.saturating_sub(rhs.0))
	}
}

impl From<Timestamp> for Duration {
	fn from(timestamp: Timestamp) -> Self {
		Duration::from_micros(timestamp.0)
	}
}

impl std::fmt::Debug for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}µs", self.0)
	}
}

impl std::fmt::Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}µs", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_timestamp_duration() {
		let ts = Timestamp::from_micros(1_500_000);
		assert_eq!(Duration::from(ts), Duration::from_millis(1500));
		assert_eq!(format!("{ts}"), "1500000µs");
	}

	#[test]
	fn test_timestamp_saturating_sub() {
		let a = Timestamp::from_micros(33_000);
		let b = Timestamp::from_micros(10_000);
		assert_eq!(a.saturating_sub(b), Timestamp::from_micros(23_000));
		assert_eq!(b.saturating_sub(a), Timestamp::ZERO);
	}
}
