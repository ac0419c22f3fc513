use std::time::Duration;

use crate::{DiscontinuityPolicy, Error, PacerConfig, Result};

/// Playback tuning, from the command line, the environment or a config file.
#[derive(Clone, Debug, PartialEq, Eq, clap::Args, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct PlaybackConfig {
	/// The number of frame buffers shared by the decoder and the renderer.
	///
	/// More buffers absorb burstier decoders at the cost of memory and latency.
	#[arg(
		id = "ring-capacity",
		long = "ring-capacity",
		env = "FRAMEPIPE_RING_CAPACITY",
		default_value_t = 3
	)]
	pub ring_capacity: usize,

	/// Never wait longer than this before presenting a frame.
	///
	/// Longer waits are treated as a timestamp discontinuity.
	#[arg(
		id = "max-delay",
		long = "max-delay",
		env = "FRAMEPIPE_MAX_DELAY",
		default_value = "1s",
		value_parser = humantime::parse_duration,
	)]
	#[serde(with = "humantime_serde")]
	pub max_delay: Duration,

	/// How to recover when timestamps rewind or jump.
	#[arg(
		id = "discontinuity",
		long = "discontinuity",
		env = "FRAMEPIPE_DISCONTINUITY",
		value_enum,
		default_value_t = DiscontinuityPolicy::Rebase
	)]
	pub discontinuity: DiscontinuityPolicy,
}

impl Default for PlaybackConfig {
	fn default() -> Self {
		let pacer = PacerConfig::default();

		Self {
			ring_capacity: 3,
			max_delay: pacer.max_delay,
			discontinuity: pacer.discontinuity,
		}
	}
}

impl PlaybackConfig {
	pub fn validate(&self) -> Result<()> {
		if self.ring_capacity == 0 {
			return Err(Error::InvalidConfig("ring capacity must be at least 1"));
		}

		if self.max_delay.is_zero() {
			return Err(Error::InvalidConfig("max delay must be positive"));
		}

		Ok(())
	}

	pub fn pacer_config(&self) -> PacerConfig {
		PacerConfig {
			max_delay: self.max_delay,
			discontinuity: self.discontinuity,
		}
	}
}
