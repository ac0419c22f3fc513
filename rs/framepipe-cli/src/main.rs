use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use framepipe::{
	Decoder, Geometry, Player, PlaybackConfig, Renderer, Shutdown,
	decode::PatternDecoder,
	render::{self, NullRenderer},
};

#[derive(Parser, Clone, Debug)]
#[command(name = "framepipe", version)]
pub struct Config {
	/// The playback configuration.
	#[command(flatten)]
	pub playback: PlaybackConfig,

	/// Where decoded frames go.
	#[command(flatten)]
	pub output: Output,

	/// The log configuration.
	#[command(flatten)]
	pub log: framepipe::Log,

	/// What to play.
	#[command(subcommand)]
	pub source: Source,
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum Source {
	/// Play a synthetic test pattern.
	Pattern {
		#[arg(long, default_value_t = 640)]
		width: u32,

		#[arg(long, default_value_t = 360)]
		height: u32,

		/// The number of frames before the end of the stream.
		#[arg(long, default_value_t = 300)]
		frames: u64,

		#[arg(long, default_value_t = 30)]
		fps: u32,

		/// Make the decoder ask to be retried before every n-th frame.
		#[arg(long)]
		glitch_every: Option<u64>,
	},

	/// Play the video stream of a media file.
	#[cfg(feature = "ffmpeg")]
	File { path: std::path::PathBuf },
}

impl Source {
	fn open(&self) -> anyhow::Result<Box<dyn Decoder + Send>> {
		match self {
			Self::Pattern {
				width,
				height,
				frames,
				fps,
				glitch_every,
			} => {
				let mut decoder = PatternDecoder::new(Geometry::new(*width, *height), *fps, *frames)
					.context("invalid test pattern")?;
				if let Some(n) = glitch_every {
					decoder = decoder.with_glitches(*n);
				}

				Ok(Box::new(decoder))
			}
			#[cfg(feature = "ffmpeg")]
			Self::File { path } => {
				let decoder = framepipe::decode::FfmpegDecoder::open(path)
					.with_context(|| format!("failed to open {}", path.display()))?;
				Ok(Box::new(decoder))
			}
		}
	}
}

#[derive(clap::Args, Clone, Debug)]
pub struct Output {
	/// Drop frames that are later than this instead of presenting them.
	///
	/// By default every frame is presented, however late.
	#[arg(long, env = "FRAMEPIPE_DROP_LATE", value_parser = humantime::parse_duration)]
	pub drop_late: Option<Duration>,

	/// Write frames to this directory as PNG.
	#[cfg(feature = "png")]
	#[arg(long)]
	pub png_dir: Option<std::path::PathBuf>,

	/// Only write every n-th frame.
	#[cfg(feature = "png")]
	#[arg(long, default_value_t = 1)]
	pub png_every: u64,
}

impl Output {
	fn open(&self) -> anyhow::Result<Sink> {
		#[cfg(feature = "png")]
		if let Some(dir) = &self.png_dir {
			let png = render::PngRenderer::new(dir, self.png_every).context("failed to create png renderer")?;
			return Ok(Sink {
				inner: Box::new(png),
				drop_late: self.drop_late,
			});
		}

		Ok(Sink {
			inner: Box::new(NullRenderer::new()),
			drop_late: self.drop_late,
		})
	}
}

// Applies --drop-late in front of any renderer.
struct Sink {
	inner: Box<dyn Renderer + Send>,
	drop_late: Option<Duration>,
}

impl Renderer for Sink {
	fn present(&mut self, pixels: &[u8], geometry: Geometry) -> render::Result<()> {
		self.inner.present(pixels, geometry)
	}

	fn accept_late(&mut self, lateness: Duration) -> bool {
		match self.drop_late {
			Some(threshold) => lateness <= threshold,
			None => self.inner.accept_late(lateness),
		}
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config = Config::parse();
	config.log.init();

	let decoder = config.source.open()?;
	let renderer = config.output.open()?;

	let shutdown = Shutdown::new();
	let player = Player::new(decoder, renderer, &config.playback, shutdown.clone()).context("failed to start playback")?;

	let mut playback = tokio::task::spawn_blocking(move || player.run());

	let stats = tokio::select! {
		res = &mut playback => res,
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("interrupted, stopping playback");
			shutdown.request();
			playback.await
		}
	};

	let stats = stats.context("playback task failed")?.context("playback failed")?;

	tracing::info!(
		decoded = stats.decoded,
		presented = stats.presented,
		dropped = stats.dropped,
		late = stats.pacer.late,
		anomalies = stats.pacer.anomalies,
		clamped = stats.pacer.clamped,
		retries = stats.transient_errors,
		cancelled = stats.cancelled,
		"done"
	);

	Ok(())
}
