use super::{DecodeError, Decoded, Decoder, Result, StreamInfo};
use crate::{BYTES_PER_PIXEL, Geometry, TimeBase};

/// A synthetic video stream of scrolling colour bars.
///
/// Frame `n` has pts `n` in a `1/fps` time base and its first pixel encodes `n`, so consumers
/// can check ordering from the pixels alone.
#[derive(Debug, Clone)]
pub struct PatternDecoder {
	info: StreamInfo,
	frames: u64,
	next: u64,

	// Return DecodeError::Again before every n-th frame.
	glitch_every: Option<u64>,
	glitched: bool,
}

impl PatternDecoder {
	pub fn new(geometry: Geometry, fps: u32, frames: u64) -> Result<Self> {
		let time_base = TimeBase::new(1, fps).ok_or_else(|| DecodeError::Init("fps must be positive".to_string()))?;
		if geometry.frame_size() == 0 {
			return Err(DecodeError::Init(format!("empty geometry {geometry}")));
		}

		Ok(Self {
			info: StreamInfo { geometry, time_base },
			frames,
			next: 0,
			glitch_every: None,
			glitched: false,
		})
	}

	/// Report a transient error before every `n`-th frame.
	pub fn with_glitches(mut self, n: u64) -> Self {
		self.glitch_every = (n > 0).then_some(n);
		self
	}

	/// Recover the frame number written by this decoder from a frame's pixels.
	pub fn frame_number(pixels: &[u8]) -> Option<u32> {
		let bytes: [u8; 4] = pixels.get(..4)?.try_into().ok()?;
		Some(u32::from_le_bytes(bytes))
	}

	fn paint(&self, pixels: &mut [u8], n: u64) {
		let width = self.info.geometry.width as u64;

		for (i, pixel) in pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
			let x = (i as u64 % width + n) % width;
			let bar = (x * 8 / width.max(1)) as u8;
			pixel.copy_from_slice(&[
				if bar & 1 != 0 { 0xff } else { 0 },
				if bar & 2 != 0 { 0xff } else { 0 },
				if bar & 4 != 0 { 0xff } else { 0 },
				0xff,
			]);
		}

		// Stamp the frame number over the first pixel.
		pixels[..4].copy_from_slice(&(n as u32).to_le_bytes());
	}
}

impl Decoder for PatternDecoder {
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

		if self.next >= self.frames {
			return Ok(Decoded::EndOfStream);
		}

		if let Some(every) = self.glitch_every {
			if self.next % every == every - 1 && !self.glitched {
				self.glitched = true;
				return Err(DecodeError::Again);
			}
		}
		self.glitched = false;

		let n = self.next;
		self.paint(pixels, n);
		self.next += 1;

		Ok(Decoded::Frame { pts: n as i64 })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pattern_frames() {
		let geometry = Geometry::new(16, 2);
		let mut decoder = PatternDecoder::new(geometry, 30, 3).unwrap();
		assert_eq!(decoder.info().time_base, TimeBase::new(1, 30).unwrap());

		let mut pixels = vec![0u8; geometry.frame_size()];
		for n in 0..3 {
			assert_eq!(decoder.decode_next_frame(&mut pixels).unwrap(), Decoded::Frame { pts: n });
			assert_eq!(PatternDecoder::frame_number(&pixels), Some(n as u32));
		}

		assert_eq!(decoder.decode_next_frame(&mut pixels).unwrap(), Decoded::EndOfStream);
	}

	#[test]
	fn test_pattern_glitches() {
		let geometry = Geometry::new(4, 4);
		let mut decoder = PatternDecoder::new(geometry, 25, 4).unwrap().with_glitches(2);
		let mut pixels = vec![0u8; geometry.frame_size()];

		assert!(matches!(decoder.decode_next_frame(&mut pixels), Ok(Decoded::Frame { pts: 0 })));
		let err = decoder.decode_next_frame(&mut pixels).unwrap_err();
		assert!(err.is_transient());
		assert!(matches!(decoder.decode_next_frame(&mut pixels), Ok(Decoded::Frame { pts: 1 })));
		assert!(matches!(decoder.decode_next_frame(&mut pixels), Ok(Decoded::Frame { pts: 2 })));
		assert!(decoder.decode_next_frame(&mut pixels).is_err());
	}

	#[test]
	fn test_pattern_wrong_buffer() {
		let mut decoder = PatternDecoder::new(Geometry::new(4, 4), 25, 1).unwrap();
		let err = decoder.decode_next_frame(&mut [0u8; 3]).unwrap_err();
		assert!(matches!(err, DecodeError::BufferSize { expected: 64, actual: 3 }));
		assert!(!err.is_transient());
	}

	#[test]
	fn test_pattern_invalid() {
		assert!(PatternDecoder::new(Geometry::new(4, 4), 0, 1).is_err());
		assert!(PatternDecoder::new(Geometry::new(0, 4), 30, 1).is_err());
	}
}
