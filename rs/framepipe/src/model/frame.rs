use crate::{Error, Result};

/// Bytes per pixel of every buffer handed to a renderer (8-bit RGBA / RGB0).
pub const BYTES_PER_PIXEL: usize = 4;

/// The dimensions of a video stream, fixed once the stream header is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
	pub width: u32,
	pub height: u32,
}

impl Geometry {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}

	/// Number of bytes between rows.
	pub const fn stride(&self) -> usize {
		(self.width as usize).saturating_mul(BYTES_PER_PIXEL)
	}

	/// Number of bytes in one frame, saturating so oversized streams fail allocation instead.
	pub const fn frame_size(&self) -> usize {
		self.stride().saturating_mul(self.height as usize)
	}
}

impl std::fmt::Display for Geometry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

/// One decoded frame living in an arena slot.
///
/// The pixel buffer is allocated once and rewritten in place by the decoder every time the slot
/// comes around again.
pub struct VideoFrame {
	/// Packed pixels, `geometry.frame_size()` bytes.
	pub pixels: Box<[u8]>,

	/// Presentation timestamp in the stream's time base.
	pub pts: i64,

	pub geometry: Geometry,
}

impl VideoFrame {
	/// Allocate a zeroed frame, reporting allocation failure instead of aborting.
	pub fn new(geometry: Geometry) -> Result<Self> {
		let bytes = geometry.frame_size();
		if bytes == 0 {
			return Err(Error::InvalidConfig("frame geometry is empty"));
		}

		let mut pixels = Vec::new();
		pixels
			.try_reserve_exact(bytes)
			.map_err(|_| Error::OutOfMemory { bytes })?;
		pixels.resize(bytes, 0);

		Ok(Self {
			pixels: pixels.into_boxed_slice(),
			pts: 0,
			geometry,
		})
	}
}

impl std::fmt::Debug for VideoFrame {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VideoFrame")
			.field("pts", &self.pts)
			.field("geometry", &self.geometry)
			.field("size", &self.pixels.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_geometry_size() {
		let geometry = Geometry::new(960, 540);
		assert_eq!(geometry.stride(), 3840);
		assert_eq!(geometry.frame_size(), 960 * 540 * 4);
		assert_eq!(geometry.to_string(), "960x540");
	}

	#[test]
	fn test_frame_allocation() {
		let frame = VideoFrame::new(Geometry::new(4, 2)).unwrap();
		assert_eq!(frame.pixels.len(), 32);
		assert!(frame.pixels.iter().all(|&b| b == 0));

		let err = VideoFrame::new(Geometry::new(0, 2)).unwrap_err();
		assert!(matches!(err, Error::InvalidConfig(_)));
	}

	#[test]
	fn test_frame_allocation_failure() {
		// Larger than any allocator will hand out.
		let err = VideoFrame::new(Geometry::new(u32::MAX, u32::MAX)).unwrap_err();
		assert!(matches!(err, Error::OutOfMemory { .. }));
	}
}
