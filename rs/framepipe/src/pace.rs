use std::{
	sync::OnceLock,
	time::{Duration, Instant},
};

use crate::{Shutdown, TimeBase, Timestamp, TimestampOverflow};

/// What the pacer does when a frame's timestamp doesn't fit the schedule.
///
/// A discontinuity is a rewind (the target is earlier than the previous frame's) or a pts that
/// can't be converted at all. Frames due further ahead than `max_delay` aren't discontinuities;
/// they wait `max_delay` under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscontinuityPolicy {
	/// Present the frame now and pace everything after it relative to this moment.
	///
	/// A clamped wait also moves the schedule, so later frames keep their spacing.
	#[default]
	Rebase,

	/// Present the frame now but keep the original schedule for the frames after it.
	Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerConfig {
	/// Upper bound for any single wait.
	pub max_delay: Duration,

	pub discontinuity: DiscontinuityPolicy,
}

impl Default for PacerConfig {
	fn default() -> Self {
		Self {
			max_delay: Duration::from_secs(1),
			discontinuity: DiscontinuityPolicy::default(),
		}
	}
}

/// A timestamp that couldn't be paced normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
	/// The target went backwards.
	Rewind { previous: Timestamp, target: Timestamp },

	/// The pts couldn't be converted to a timestamp at all.
	Invalid { pts: i64 },
}

/// When to present one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
	/// How long to wait before presenting.
	pub delay: Duration,

	/// How far behind schedule the frame already is; zero unless `delay` is zero.
	pub lateness: Duration,

	pub anomaly: Option<Anomaly>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacerStats {
	/// Frames scheduled.
	pub frames: u64,

	/// Frames that were already overdue when scheduled.
	pub late: u64,

	/// Discontinuities recovered from.
	pub anomalies: u64,

	/// Waits cut short to `max_delay`.
	pub clamped: u64,
}

/// Converts presentation timestamps into wall-clock waits for one stream.
///
/// The anchor is captured the first time a frame is ready to present, not when playback starts,
/// so decoder warm-up isn't charged against the first frames. It is written exactly once.
pub struct Pacer {
	time_base: TimeBase,
	config: PacerConfig,

	anchor: OnceLock<Instant>,

	// The wall-clock instant a given stream timestamp is due; (anchor, 0) until rebased.
	origin: Option<(Instant, Timestamp)>,

	previous: Option<Timestamp>,
	stats: PacerStats,
}

impl Pacer {
	pub fn new(time_base: TimeBase, config: PacerConfig) -> Self {
		Self {
			time_base,
			config,
			anchor: OnceLock::new(),
			origin: None,
			previous: None,
			stats: PacerStats::default(),
		}
	}

	pub fn time_base(&self) -> TimeBase {
		self.time_base
	}

	/// Capture the anchor if it isn't set yet, returning it either way.
	pub fn on_first_frame_ready(&self) -> Instant {
		self.on_first_frame_ready_at(Instant::now())
	}

	pub fn on_first_frame_ready_at(&self, now: Instant) -> Instant {
		*self.anchor.get_or_init(|| {
			tracing::debug!(time_base = %self.time_base, "first frame ready, anchoring presentation clock");
			now
		})
	}

	pub fn anchor(&self) -> Option<Instant> {
		self.anchor.get().copied()
	}

	/// Convert a pts in the stream's time base to a target time since the anchor.
	pub fn target_time_for(&self, pts: i64) -> Result<Timestamp, TimestampOverflow> {
		self.time_base.to_timestamp(pts)
	}

	/// `max(0, target - (now - anchor))`, with the discontinuity guard and upper clamp applied.
	pub fn delay_before_present(&mut self, target: Timestamp) -> Duration {
		self.schedule(target).delay
	}

	pub fn schedule(&mut self, target: Timestamp) -> Schedule {
		self.schedule_at(target, Instant::now())
	}

	/// Schedule a frame by pts, treating unconvertible timestamps as an anomaly.
	pub fn schedule_pts(&mut self, pts: i64) -> Schedule {
		self.schedule_pts_at(pts, Instant::now())
	}

	pub fn schedule_pts_at(&mut self, pts: i64, now: Instant) -> Schedule {
		match self.target_time_for(pts) {
			Ok(target) => self.schedule_at(target, now),
			Err(_) => {
				self.on_first_frame_ready_at(now);
				self.stats.frames += 1;
				self.anomaly(Anomaly::Invalid { pts }, None, now)
			}
		}
	}

	pub fn schedule_at(&mut self, target: Timestamp, now: Instant) -> Schedule {
		let anchor = self.on_first_frame_ready_at(now);
		let (origin, origin_target) = *self.origin.get_or_insert((anchor, Timestamp::ZERO));

		self.stats.frames += 1;

		if let Some(previous) = self.previous.replace(target) {
			if target < previous {
				return self.anomaly(Anomaly::Rewind { previous, target }, Some(target), now);
			}
		}

		let offset = Duration::from(target.saturating_sub(origin_target));
		let Some(due) = origin.checked_add(offset) else {
			return self.clamp(target, now);
		};

		if let Some(delay) = due.checked_duration_since(now) {
			if delay > self.config.max_delay {
				return self.clamp(target, now);
			}

			return Schedule {
				delay,
				..Default::default()
			};
		}

		let lateness = now.duration_since(due);
		self.stats.late += 1;
		tracing::trace!(%target, ?lateness, "frame is late");

		Schedule {
			delay: Duration::ZERO,
			lateness,
			anomaly: None,
		}
	}

	/// Sleep until the frame is due, or until shutdown.
	///
	/// Returns `None` if shutdown was requested.
	pub fn wait(&mut self, target: Timestamp, shutdown: &Shutdown) -> Option<Schedule> {
		let schedule = self.schedule(target);
		if schedule.delay.is_zero() {
			return (!shutdown.is_requested()).then_some(schedule);
		}

		shutdown.sleep(schedule.delay).then_some(schedule)
	}

	pub fn stats(&self) -> PacerStats {
		self.stats
	}

	fn anomaly(&mut self, anomaly: Anomaly, target: Option<Timestamp>, now: Instant) -> Schedule {
		self.stats.anomalies += 1;

		let policy = self.config.discontinuity;
		tracing::warn!(?anomaly, ?policy, "pacing discontinuity");

		if policy == DiscontinuityPolicy::Rebase {
			if let Some(target) = target {
				self.origin = Some((now, target));
			}
		}

		Schedule {
			delay: Duration::ZERO,
			lateness: Duration::ZERO,
			anomaly: Some(anomaly),
		}
	}

	// The frame is due further ahead than max_delay; wait that long instead.
	fn clamp(&mut self, target: Timestamp, now: Instant) -> Schedule {
		let delay = self.config.max_delay;
		self.stats.clamped += 1;
		tracing::debug!(%target, ?delay, "clamping long wait");

		if self.config.discontinuity == DiscontinuityPolicy::Rebase {
			if let Some(due) = now.checked_add(delay) {
				self.origin = Some((due, target));
			}
		}

		Schedule {
			delay,
			..Default::default()
		}
	}
}

impl std::fmt::Debug for Pacer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pacer")
			.field("time_base", &self.time_base)
			.field("config", &self.config)
			.field("anchored", &self.anchor.get().is_some())
			.field("stats", &self.stats)
			.finish()
	}
}
