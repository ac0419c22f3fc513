use std::path::PathBuf;

use super::{RenderError, Renderer, Result, check_size};
use crate::Geometry;

/// Writes every n-th presented frame to `<dir>/frame-<seq>.png`.
#[derive(Debug)]
pub struct PngRenderer {
	dir: PathBuf,
	every: u64,
	seq: u64,
	written: u64,
}

impl PngRenderer {
	/// Create the output directory if needed. An `every` of 0 is treated as 1.
	pub fn new(dir: impl Into<PathBuf>, every: u64) -> Result<Self> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir)
			.map_err(|e| RenderError::Init(format!("failed to create {}: {e}", dir.display())))?;

		Ok(Self {
			dir,
			every: every.max(1),
			seq: 0,
			written: 0,
		})
	}

	pub fn written(&self) -> u64 {
		self.written
	}
}

impl Renderer for PngRenderer {
	fn present(&mut self, pixels: &[u8], geometry: Geometry) -> Result<()> {
		check_size(pixels, geometry)?;

		let seq = self.seq;
		self.seq += 1;
		if seq % self.every != 0 {
			return Ok(());
		}

		let image = image::RgbaImage::from_raw(geometry.width, geometry.height, pixels.to_vec())
			.ok_or_else(|| RenderError::Present(format!("invalid image {geometry}")))?;

		let path = self.dir.join(format!("frame-{seq:06}.png"));
		image
			.save_with_format(&path, image::ImageFormat::Png)
			.map_err(|e| RenderError::Present(format!("failed to write {}: {e}", path.display())))?;

		tracing::debug!(path = %path.display(), "wrote frame");
		self.written += 1;

		Ok(())
	}
}
