use std::time::Duration;

use super::{Renderer, Result, check_size};
use crate::Geometry;

/// Discards frames, counting what it was given.
#[derive(Debug, Default, Clone)]
pub struct NullRenderer {
	/// Drop frames that are later than this instead of presenting them.
	pub drop_late: Option<Duration>,

	presented: u64,
	dropped: u64,
	last: Option<Vec<u8>>,
	keep_last: bool,
}

impl NullRenderer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_drop_late(mut self, threshold: Duration) -> Self {
		self.drop_late = Some(threshold);
		self
	}

	/// Keep a copy of the most recently presented frame.
	pub fn keep_last(mut self) -> Self {
		self.keep_last = true;
		self
	}

	pub fn presented(&self) -> u64 {
		self.presented
	}

	pub fn dropped(&self) -> u64 {
		self.dropped
	}

	pub fn last(&self) -> Option<&[u8]> {
		self.last.as_deref()
	}
}

impl Renderer for NullRenderer {
	fn present(&mut self, pixels: &[u8], geometry: Geometry) -> Result<()> {
		check_size(pixels, geometry)?;

		if self.keep_last {
			let last = self.last.get_or_insert_with(Vec::new);
			last.clear();
			last.extend_from_slice(pixels);
		}

		self.presented += 1;
		Ok(())
	}

	fn accept_late(&mut self, lateness: Duration) -> bool {
		match self.drop_late {
			Some(threshold) if lateness > threshold => {
				self.dropped += 1;
				false
			}
			_ => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::render::RenderError;

	#[test]
	fn test_null_counts() {
		let geometry = Geometry::new(2, 2);
		let mut renderer = NullRenderer::new().keep_last();

		renderer.present(&[1u8; 16], geometry).unwrap();
		renderer.present(&[2u8; 16], geometry).unwrap();

		assert_eq!(renderer.presented(), 2);
		assert_eq!(renderer.last(), Some(&[2u8; 16][..]));
	}

	#[test]
	fn test_null_wrong_size() {
		let mut renderer = NullRenderer::new();
		let err = renderer.present(&[0u8; 15], Geometry::new(2, 2)).unwrap_err();
		assert!(matches!(err, RenderError::BufferSize { expected: 16, actual: 15 }));
		assert_eq!(renderer.presented(), 0);
	}

	#[test]
	fn test_null_drop_late() {
		let mut renderer = NullRenderer::new();
		assert!(renderer.accept_late(Duration::from_secs(10)));

		let mut renderer = renderer.with_drop_late(Duration::from_millis(50));
		assert!(renderer.accept_late(Duration::from_millis(50)));
		assert!(!renderer.accept_late(Duration::from_millis(51)));
		assert_eq!(renderer.dropped(), 1);
	}
}
