use std::thread;

use crate::{
	Decoded, Decoder, Error, Pacer, PacerStats, PlaybackConfig, Renderer, Result, Ring, RingConsumer, RingProducer,
	Shutdown, SlotArena, StreamInfo, VideoFrame,
};

/// Counters collected over one playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStats {
	/// Frames written by the decoder.
	pub decoded: u64,

	/// [crate::DecodeError::Again] results that were retried.
	pub transient_errors: u64,

	/// Frames handed to the renderer.
	pub presented: u64,

	/// Late frames the renderer declined.
	pub dropped: u64,

	/// Shutdown was requested before the end of the stream.
	pub cancelled: bool,

	pub pacer: PacerStats,
}

/// Plays one stream: decodes on a dedicated thread, presents on the calling thread.
///
/// Every frame buffer is allocated by [Player::new], so an unaffordable geometry fails before
/// any thread starts.
pub struct Player<D, R> {
	decoder: D,
	renderer: R,
	info: StreamInfo,
	ring: Ring<VideoFrame>,
	pacer: Pacer,
	shutdown: Shutdown,
}

impl<D: Decoder + Send + 'static, R: Renderer> Player<D, R> {
	pub fn new(decoder: D, renderer: R, config: &PlaybackConfig, shutdown: Shutdown) -> Result<Self> {
		config.validate()?;

		let info = decoder.info();
		let arena = SlotArena::frames(config.ring_capacity, info.geometry)?;
		let ring = Ring::new(arena, &shutdown);
		let pacer = Pacer::new(info.time_base, config.pacer_config());

		Ok(Self {
			decoder,
			renderer,
			info,
			ring,
			pacer,
			shutdown,
		})
	}

	pub fn info(&self) -> StreamInfo {
		self.info
	}

	/// The signal that stops this player; request it from any thread.
	pub fn shutdown(&self) -> &Shutdown {
		&self.shutdown
	}

	/// Play until the end of the stream, a fatal error, or shutdown.
	///
	/// Shutdown is a normal stop: the stats are returned with `cancelled` set. A fatal decode or
	/// render error stops both sides and is returned instead.
	pub fn run(self) -> Result<PlaybackStats> {
		let Self {
			mut decoder,
			mut renderer,
			info,
			ring,
			mut pacer,
			shutdown,
		} = self;

		let Ring {
			mut producer,
			mut consumer,
		} = ring;

		tracing::info!(geometry = %info.geometry, time_base = %info.time_base, capacity = consumer.capacity(), "starting playback");

		let decode_shutdown = shutdown.clone();
		let handle = thread::Builder::new()
			.name("framepipe-decode".to_string())
			.spawn(move || {
				let mut stats = PlaybackStats::default();
				let res = produce(&mut decoder, &mut producer, &decode_shutdown, &mut stats);

				match &res {
					Err(err) if !err.is_cancel() => {
						tracing::error!(%err, "decode failed");
						producer.abort(err.clone());
						decode_shutdown.request();
					}
					_ => producer.finish(),
				}

				(stats, res)
			})
			.map_err(|e| Error::Spawn(e.to_string()))?;

		let mut stats = PlaybackStats::default();
		let presented = present(&mut consumer, &mut renderer, &mut pacer, &shutdown, &mut stats);
		if let Err(err) = &presented {
			if !err.is_cancel() {
				tracing::error!(%err, "render failed");
				shutdown.request();
			}
		}

		// Unblocks the producer if it's still waiting for a slot.
		drop(consumer);

		let (decode_stats, decoded) = handle.join().map_err(|_| Error::Panicked("decode"))?;
		stats.decoded = decode_stats.decoded;
		stats.transient_errors = decode_stats.transient_errors;
		stats.pacer = pacer.stats();

		// A decode failure explains why the consumer was cancelled, so it wins.
		match (decoded, presented) {
			(Err(err), _) if !err.is_cancel() => return Err(err),
			(_, Err(err)) if !err.is_cancel() => return Err(err),
			(Ok(()), Ok(())) => {}
			_ => stats.cancelled = true,
		}

		tracing::info!(?stats, "playback finished");

		Ok(stats)
	}
}

/// Fill slots from the decoder until the end of the stream.
///
/// Transient errors are retried with the same slot. Returns [Error::Cancelled] or
/// [Error::Closed] if the consumer stopped first. The caller finishes or aborts the ring.
pub fn produce<D: Decoder + ?Sized>(
	decoder: &mut D,
	producer: &mut RingProducer<VideoFrame>,
	shutdown: &Shutdown,
	stats: &mut PlaybackStats,
) -> Result<()> {
	loop {
		let mut slot = producer.acquire_write_slot()?;

		let decoded = loop {
			match decoder.decode_next_frame(&mut slot.pixels) {
				Ok(decoded) => break decoded,
				Err(err) if err.is_transient() => {
					stats.transient_errors += 1;
					tracing::trace!(%err, slot = slot.index(), "retrying decode");

					if shutdown.is_requested() {
						return Err(Error::Cancelled);
					}
				}
				Err(err) => return Err(err.into()),
			}
		};

		match decoded {
			Decoded::Frame { pts } => {
				slot.pts = pts;
				slot.commit();
				stats.decoded += 1;
			}
			Decoded::EndOfStream => {
				tracing::debug!(frames = stats.decoded, "end of stream");
				return Ok(());
			}
		}
	}
}

/// Present frames at their scheduled time until the producer finishes.
///
/// Each slot goes back to the producer right after the renderer returns.
pub fn present<R: Renderer + ?Sized>(
	consumer: &mut RingConsumer<VideoFrame>,
	renderer: &mut R,
	pacer: &mut Pacer,
	shutdown: &Shutdown,
	stats: &mut PlaybackStats,
) -> Result<()> {
	while let Some(slot) = consumer.acquire_read_slot()? {
		let schedule = pacer.schedule_pts(slot.pts);

		if !schedule.delay.is_zero() && !shutdown.sleep(schedule.delay) {
			return Err(Error::Cancelled);
		}

		if !schedule.lateness.is_zero() && !renderer.accept_late(schedule.lateness) {
			tracing::trace!(pts = slot.pts, lateness = ?schedule.lateness, "dropping late frame");
			stats.dropped += 1;
			slot.release();
			continue;
		}

		renderer.present(&slot.pixels, slot.geometry)?;
		stats.presented += 1;

		slot.release();
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, Instant};

	use super::*;
	use crate::{
		DecodeError, Geometry,
		decode::PatternDecoder,
		render::{NullRenderer, RenderError},
	};

	#[derive(Default)]
	struct Recorder {
		frames: Vec<u32>,
		fail_after: Option<usize>,
	}

	impl Renderer for Recorder {
		fn present(&mut self, pixels: &[u8], _geometry: Geometry) -> std::result::Result<(), RenderError> {
			if self.fail_after == Some(self.frames.len()) {
				return Err(RenderError::Present("display lost".to_string()));
			}

			self.frames.push(PatternDecoder::frame_number(pixels).unwrap());
			Ok(())
		}
	}

	// Fails for good after `ok` frames.
	struct Broken {
		inner: PatternDecoder,
		ok: u64,
	}

	impl Decoder for Broken {
		fn info(&self) -> StreamInfo {
			self.inner.info()
		}

		fn decode_next_frame(&mut self, pixels: &mut [u8]) -> crate::decode::Result<Decoded> {
			if self.ok == 0 {
				return Err(DecodeError::Malformed("corrupt packet".to_string()));
			}

			self.ok -= 1;
			self.inner.decode_next_frame(pixels)
		}
	}

	fn pattern(fps: u32, frames: u64) -> PatternDecoder {
		PatternDecoder::new(Geometry::new(16, 4), fps, frames).unwrap()
	}

	#[test]
	fn test_play_in_order() {
		let decoder = pattern(1000, 60).with_glitches(7);
		let mut renderer = Recorder::default();

		let player = Player::new(decoder, &mut renderer, &PlaybackConfig::default(), Shutdown::new()).unwrap();
		let stats = player.run().unwrap();

		assert_eq!(renderer.frames, (0..60).collect::<Vec<_>>());
		assert_eq!(stats.decoded, 60);
		assert_eq!(stats.presented, 60);
		assert_eq!(stats.dropped, 0);
		assert_eq!(stats.transient_errors, 8);
		assert_eq!(stats.pacer.frames, 60);
		assert!(!stats.cancelled);
	}

	#[test]
	fn test_play_paced() {
		let mut renderer = NullRenderer::new();
		let player = Player::new(pattern(100, 10), &mut renderer, &PlaybackConfig::default(), Shutdown::new()).unwrap();

		let start = Instant::now();
		player.run().unwrap();
		let elapsed = start.elapsed();

		// Ten frames at 10ms, the first presented immediately.
		assert!(elapsed >= Duration::from_millis(90), "{elapsed:?}");
		assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
		assert_eq!(renderer.presented(), 10);
	}

	#[test]
	fn test_single_slot() {
		let mut config = PlaybackConfig::default();
		config.ring_capacity = 1;

		let mut renderer = Recorder::default();
		let player = Player::new(pattern(1000, 20), &mut renderer, &config, Shutdown::new()).unwrap();
		player.run().unwrap();

		assert_eq!(renderer.frames, (0..20).collect::<Vec<_>>());
	}

	#[test]
	fn test_decode_error() {
		let decoder = Broken {
			inner: pattern(1000, 100),
			ok: 5,
		};
		let mut renderer = Recorder::default();

		let shutdown = Shutdown::new();
		let player = Player::new(decoder, &mut renderer, &PlaybackConfig::default(), shutdown.clone()).unwrap();
		let err = player.run().unwrap_err();

		assert!(matches!(err, Error::Decode(DecodeError::Malformed(_))), "{err}");
		assert!(shutdown.is_requested());
		assert!(renderer.frames.len() <= 5);
		assert!(renderer.frames.iter().copied().eq(0..renderer.frames.len() as u32));
	}

	#[test]
	fn test_render_error() {
		let mut renderer = Recorder {
			fail_after: Some(3),
			..Default::default()
		};

		let shutdown = Shutdown::new();
		let player = Player::new(pattern(1000, 1000), &mut renderer, &PlaybackConfig::default(), shutdown.clone()).unwrap();

		let start = Instant::now();
		let err = player.run().unwrap_err();

		assert!(matches!(err, Error::Render(RenderError::Present(_))), "{err}");
		assert!(shutdown.is_requested());
		assert_eq!(renderer.frames, vec![0, 1, 2]);
		assert!(start.elapsed() < Duration::from_millis(500));
	}

	#[test]
	fn test_shutdown() {
		// Ten seconds of video.
		let mut renderer = NullRenderer::new();
		let player = Player::new(pattern(10, 100), &mut renderer, &PlaybackConfig::default(), Shutdown::new()).unwrap();

		let stopper = thread::spawn({
			let shutdown = player.shutdown().clone();
			move || {
				thread::sleep(Duration::from_millis(150));
				shutdown.request();
			}
		});

		let start = Instant::now();
		let stats = player.run().unwrap();
		stopper.join().unwrap();

		assert!(stats.cancelled);
		assert!(stats.presented >= 1 && stats.presented < 100);
		assert!(stats.decoded >= stats.presented);
		assert!(start.elapsed() < Duration::from_secs(1));
	}

	#[test]
	fn test_drop_late() {
		// The renderer takes 5ms per frame against a 1ms cadence, so frames fall behind.
		struct Slow(NullRenderer);

		impl Renderer for Slow {
			fn present(&mut self, pixels: &[u8], geometry: Geometry) -> std::result::Result<(), RenderError> {
				thread::sleep(Duration::from_millis(5));
				self.0.present(pixels, geometry)
			}

			fn accept_late(&mut self, lateness: Duration) -> bool {
				self.0.accept_late(lateness)
			}
		}

		let mut renderer = Slow(NullRenderer::new().with_drop_late(Duration::from_millis(2)));
		let player = Player::new(pattern(1000, 50), &mut renderer, &PlaybackConfig::default(), Shutdown::new()).unwrap();
		let stats = player.run().unwrap();

		assert_eq!(stats.decoded, 50);
		assert_eq!(stats.presented + stats.dropped, 50);
		assert!(stats.dropped > 0);
		assert_eq!(stats.dropped, renderer.0.dropped());
	}

	#[test]
	fn test_invalid_config() {
		let mut config = PlaybackConfig::default();
		config.ring_capacity = 0;

		let res = Player::new(pattern(30, 1), NullRenderer::new(), &config, Shutdown::new());
		assert!(matches!(res, Err(Error::InvalidConfig(_))));
	}

	#[test]
	fn test_out_of_memory() {
		let decoder = PatternDecoder::new(Geometry::new(u32::MAX, u32::MAX), 30, 1).unwrap();
		let res = Player::new(decoder, NullRenderer::new(), &PlaybackConfig::default(), Shutdown::new());
		assert!(matches!(res, Err(Error::OutOfMemory { .. })));
	}
}
