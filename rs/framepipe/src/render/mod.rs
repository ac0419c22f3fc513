//! The presentation side of the pipeline.
//!
//! A [Renderer] receives each frame once its presentation time arrives, as a borrowed view into
//! the arena slot. The slot goes back to the decoder as soon as [Renderer::present] returns, so a
//! renderer that wants to keep pixels around must copy them.
//!
//! # Implementations
//!
//! - [NullRenderer]: discards frames, keeping counts. Useful for benchmarks and tests.
//! - `PngRenderer` (feature `png`): writes every n-th frame to a directory as PNG.

use std::time::Duration;

use crate::Geometry;

mod null;
pub use null::*;

#[cfg(feature = "png")]
mod png;
#[cfg(feature = "png")]
pub use png::*;

/// Errors that can occur during rendering.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
	#[error("failed to initialize renderer: {0}")]
	Init(String),

	#[error("failed to present frame: {0}")]
	Present(String),

	#[error("wrong frame size: expected {expected} bytes, got {actual}")]
	BufferSize { expected: usize, actual: usize },
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Trait for renderers that display video frames.
pub trait Renderer {
	/// Display a frame of packed 4-byte pixels.
	fn present(&mut self, pixels: &[u8], geometry: Geometry) -> Result<()>;

	/// Decide whether a frame that is already `lateness` past its presentation time is shown.
	///
	/// Returning false drops the frame; it is released without calling [Renderer::present].
	/// The default shows every frame, however late.
	fn accept_late(&mut self, lateness: Duration) -> bool {
		let _ = lateness;
		true
	}
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
	fn present(&mut self, pixels: &[u8], geometry: Geometry) -> Result<()> {
		(**self).present(pixels, geometry)
	}

	fn accept_late(&mut self, lateness: Duration) -> bool {
		(**self).accept_late(lateness)
	}
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
	fn present(&mut self, pixels: &[u8], geometry: Geometry) -> Result<()> {
		(**self).present(pixels, geometry)
	}

	fn accept_late(&mut self, lateness: Duration) -> bool {
		(**self).accept_late(lateness)
	}
}

fn check_size(pixels: &[u8], geometry: Geometry) -> Result<()> {
	let expected = geometry.frame_size();
	if pixels.len() != expected {
		return Err(RenderError::BufferSize {
			expected,
			actual: pixels.len(),
		});
	}

	Ok(())
}
