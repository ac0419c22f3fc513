//! The decoding side of the pipeline.
//!
//! A [Decoder] turns a compressed stream into packed 4-byte-per-pixel frames, writing each one
//! straight into the arena slot the producer is holding. The core never manages codec state; it
//! only pulls frames through this trait.
//!
//! # Implementations
//!
//! - [PatternDecoder]: a synthetic stream, handy for testing the pipeline without media files.
//! - `FfmpegDecoder` (feature `ffmpeg`): decodes the best video stream of a file with FFmpeg.

use crate::{Geometry, TimeBase};

mod pattern;
pub use pattern::*;

#[cfg(feature = "ffmpeg")]
mod ffmpeg;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::*;

/// Errors that can occur during decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
	/// The decoder needs more input before it can output a frame; try again.
	#[error("decoder needs more input")]
	Again,

	#[error("failed to initialize decoder: {0}")]
	Init(String),

	#[error("unsupported: {0}")]
	Unsupported(String),

	#[error("malformed stream: {0}")]
	Malformed(String),

	/// The stream changed dimensions after the frame arena was allocated.
	#[error("geometry changed from {expected} to {actual}")]
	GeometryChanged { expected: Geometry, actual: Geometry },

	#[error("wrong buffer size: expected {expected} bytes, got {actual}")]
	BufferSize { expected: usize, actual: usize },
}

impl DecodeError {
	/// Transient errors are retried by the producer and never reach the caller.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Again)
	}
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Stream properties known once the header is parsed, before any frame is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
	pub geometry: Geometry,
	pub time_base: TimeBase,
}

/// The outcome of one successful pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
	/// A frame was written to the buffer.
	Frame {
		/// Presentation timestamp in [StreamInfo::time_base] units.
		pts: i64,
	},

	EndOfStream,
}

/// A source of decoded, converted video frames.
pub trait Decoder {
	/// The stream geometry and time base; constant for the decoder's lifetime.
	fn info(&self) -> StreamInfo;

	/// Decode the next frame into `pixels`, which is exactly `info().geometry.frame_size()` bytes.
	///
	/// On [DecodeError::Again] the caller retries with the same buffer.
	fn decode_next_frame(&mut self, pixels: &mut [u8]) -> Result<Decoded>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
	fn info(&self) -> StreamInfo {
		(**self).info()
	}

	fn decode_next_frame(&mut self, pixels: &mut [u8]) -> Result<Decoded> {
		(**self).decode_next_frame(pixels)
	}
}
