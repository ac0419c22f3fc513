use super::{Timestamp, TimestampOverflow};

/// The rational unit of a stream's pts, in seconds per tick.
///
/// ex. `TimeBase::new(1, 90_000)` is the usual MPEG-TS clock, `TimeBase::new(1001, 30_000)` is
/// one frame of 29.97 fps video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase {
	num: u32,
	den: u32,
}

impl TimeBase {
	/// Microseconds, so pts values are already timestamps.
	pub const MICROS: Self = Self { num: 1, den: 1_000_000 };

	/// Returns `None` if either side is zero.
	pub const fn new(num: u32, den: u32) -> Option<Self> {
		if num == 0 || den == 0 {
			return None;
		}
		Some(Self { num, den })
	}

	/// Convert a signed rational (as reported by container libraries) into a time base.
	pub fn from_ratio(num: i32, den: i32) -> Option<Self> {
		Self::new(num.try_into().ok()?, den.try_into().ok()?)
	}

	pub const fn numerator(self) -> u32 {
		self.num
	}

	pub const fn denominator(self) -> u32 {
		self.den
	}

	/// Convert a pts in ticks to microseconds: `pts * num * 1_000_000 / den`.
	///
	/// Negative pts can't be presented relative to the stream start and are reported as overflow.
	pub fn to_timestamp(self, pts: i64) -> Result<Timestamp, TimestampOverflow> {
		let pts = u128::try_from(pts).map_err(|_| TimestampOverflow)?;
		let micros = pts * self.num as u128 * 1_000_000 / self.den as u128;
		let micros = u64::try_from(micros).map_err(|_| TimestampOverflow)?;
		Ok(Timestamp::from_micros(micros))
	}
}

impl std::fmt::Display for TimeBase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.num, self.den)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_time_base_rejects_zero() {
		assert!(TimeBase::new(0, 1).is_none());
		assert!(TimeBase::new(1, 0).is_none());
		assert!(TimeBase::from_ratio(-1, 25).is_none());
		assert_eq!(TimeBase::from_ratio(1, 25), TimeBase::new(1, 25));
	}

	#[test]
	fn test_time_base_conversion() {
		let mpeg = TimeBase::new(1, 90_000).unwrap();
		assert_eq!(mpeg.to_timestamp(90_000).unwrap(), Timestamp::from_micros(1_000_000));
		assert_eq!(mpeg.to_timestamp(2970).unwrap(), Timestamp::from_micros(33_000));

		let ntsc = TimeBase::new(1001, 30_000).unwrap();
		assert_eq!(ntsc.to_timestamp(30).unwrap(), Timestamp::from_micros(1_001_000));

		assert_eq!(TimeBase::MICROS.to_timestamp(66_000).unwrap(), Timestamp::from_micros(66_000));
	}

	#[test]
	fn test_time_base_out_of_range() {
		let tb = TimeBase::new(u32::MAX, 1).unwrap();
		assert_eq!(tb.to_timestamp(i64::MAX), Err(TimestampOverflow));
		assert_eq!(TimeBase::MICROS.to_timestamp(-1), Err(TimestampOverflow));
	}
}
