//! Video decoding using FFmpeg.

use std::path::Path;

use ffmpeg_next as ffmpeg;

use super::{DecodeError, Decoded, Decoder, Result, StreamInfo};
use crate::{Geometry, TimeBase};

// SAFETY: the scaling context is owned by a single decoder and never shared; FFmpeg doesn't tie
// it to the thread that created it.
struct Scaler(ffmpeg::software::scaling::Context);
unsafe impl Send for Scaler {}

/// Decodes the best video stream of a media file and converts it to RGBA.
///
/// Packets from other streams (audio, subtitles) are skipped.
pub struct FfmpegDecoder {
	input: ffmpeg::format::context::Input,
	stream: usize,
	decoder: ffmpeg::decoder::Video,

	// Created on the first decoded frame, once the real pixel format is known.
	scaler: Option<Scaler>,

	decoded: ffmpeg::frame::Video,
	converted: ffmpeg::frame::Video,

	info: StreamInfo,
	input_done: bool,
	last_pts: i64,
}

impl FfmpegDecoder {
	/// Open a file and parse its header.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();

		// Initialize FFmpeg (idempotent)
		ffmpeg::init().map_err(|e| DecodeError::Init(e.to_string()))?;

		let input = ffmpeg::format::input(path)
			.map_err(|e| DecodeError::Init(format!("failed to open {}: {e}", path.display())))?;

		let (stream, time_base, parameters) = {
			let stream = input
				.streams()
				.best(ffmpeg::media::Type::Video)
				.ok_or_else(|| DecodeError::Unsupported("no video stream".to_string()))?;

			let rational = stream.time_base();
			let time_base = TimeBase::from_ratio(rational.numerator(), rational.denominator())
				.ok_or_else(|| DecodeError::Malformed(format!("invalid time base {rational}")))?;

			(stream.index(), time_base, stream.parameters())
		};

		let context = ffmpeg::codec::context::Context::from_parameters(parameters)
			.map_err(|e| DecodeError::Unsupported(format!("unsupported codec: {e}")))?;
		let decoder = context
			.decoder()
			.video()
			.map_err(|e| DecodeError::Unsupported(format!("not a video codec: {e}")))?;

		let geometry = Geometry::new(decoder.width(), decoder.height());
		if geometry.frame_size() == 0 {
			return Err(DecodeError::Malformed(format!("invalid dimensions {geometry}")));
		}

		tracing::info!(path = %path.display(), %geometry, %time_base, codec = ?decoder.id(), "opened video stream");

		Ok(Self {
			input,
			stream,
			decoder,
			scaler: None,
			decoded: ffmpeg::frame::Video::empty(),
			converted: ffmpeg::frame::Video::empty(),
			info: StreamInfo { geometry, time_base },
			input_done: false,
			last_pts: 0,
		})
	}

	// Send the next packet of our stream to the decoder, or EOF once the input is exhausted.
	fn feed(&mut self) -> Result<()> {
		let mut packet = ffmpeg::Packet::empty();

		loop {
			match packet.read(&mut self.input) {
				Ok(()) if packet.stream() == self.stream => {
					return self
						.decoder
						.send_packet(&packet)
						.map_err(|e| DecodeError::Malformed(format!("send_packet failed: {e}")));
				}
				Ok(()) => continue,
				Err(ffmpeg::Error::Eof) => {
					self.input_done = true;
					return self
						.decoder
						.send_eof()
						.map_err(|e| DecodeError::Malformed(format!("flush failed: {e}")));
				}
				Err(e) => return Err(DecodeError::Malformed(format!("read failed: {e}"))),
			}
		}
	}

	fn convert(&mut self, pixels: &mut [u8]) -> Result<Decoded> {
		let geometry = self.info.geometry;
		let actual = Geometry::new(self.decoded.width(), self.decoded.height());
		if actual != geometry {
			return Err(DecodeError::GeometryChanged {
				expected: geometry,
				actual,
			});
		}

		let scaler = match self.scaler.take() {
			Some(scaler) => scaler,
			None => {
				let format = self.decoded.format();
				tracing::debug!(?format, "creating scaler");

				let context = ffmpeg::software::scaling::Context::get(
					format,
					geometry.width,
					geometry.height,
					ffmpeg::format::Pixel::RGBA,
					geometry.width,
					geometry.height,
					ffmpeg::software::scaling::Flags::BILINEAR,
				)
				.map_err(|e| DecodeError::Init(format!("failed to create scaler: {e}")))?;

				Scaler(context)
			}
		};
		let scaler = self.scaler.insert(scaler);

		scaler
			.0
			.run(&self.decoded, &mut self.converted)
			.map_err(|e| DecodeError::Malformed(format!("scale failed: {e}")))?;

		// The scaler may pad rows; copy them one at a time.
		let row = geometry.stride();
		let stride = self.converted.stride(0);
		let data = self.converted.data(0);
		for (y, dst) in pixels.chunks_exact_mut(row).enumerate() {
			let start = y * stride;
			let src = data
				.get(start..start + row)
				.ok_or_else(|| DecodeError::Malformed("short scaler output".to_string()))?;
			dst.copy_from_slice(src);
		}

		// Frames without a timestamp are shown right after the previous one.
		let pts = self.decoded.timestamp().or(self.decoded.pts()).unwrap_or(self.last_pts);
		self.last_pts = pts;

		Ok(Decoded::Frame { pts })
	}
}

impl Decoder for FfmpegDecoder {
	fn info(&self) -> StreamInfo {
		self.info
	}

	fn decode_next_frame(&mut self, pixels: &mut [u8]) -> Result<Decoded> {
		let expected = self.info.geometry.frame_size();
		if pixels.len() != expected {
			return Err(DecodeError::BufferSize {
				expected,
				actual: pixels.len(),
			});
		}

		match self.decoder.receive_frame(&mut self.decoded) {
			Ok(()) => self.convert(pixels),
			Err(ffmpeg::Error::Eof) => Ok(Decoded::EndOfStream),
			Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => {
				if self.input_done {
					return Ok(Decoded::EndOfStream);
				}

				// Needs more input: feed one packet and let the caller come back.
				self.feed()?;
				Err(DecodeError::Again)
			}
			Err(e) => Err(DecodeError::Malformed(format!("receive_frame failed: {e}"))),
		}
	}
}
