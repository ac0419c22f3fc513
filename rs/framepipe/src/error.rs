use crate::{decode::DecodeError, render::RenderError};

/// A list of possible errors that can occur while moving frames through the pipeline.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
	/// Shutdown was requested while waiting.
	#[error("cancelled")]
	Cancelled,

	/// The other side of the ring was dropped.
	#[error("closed")]
	Closed,

	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	#[error("render error: {0}")]
	Render(#[from] RenderError),

	/// The frame arena could not be allocated.
	#[error("out of memory allocating {bytes} bytes")]
	OutOfMemory { bytes: usize },

	#[error("invalid config: {0}")]
	InvalidConfig(&'static str),

	#[error("failed to spawn thread: {0}")]
	Spawn(String),

	/// A pipeline thread panicked instead of returning.
	#[error("{0} thread panicked")]
	Panicked(&'static str),
}

impl Error {
	/// Returns true if this error only reports that the pipeline was stopped.
	pub fn is_cancel(&self) -> bool {
		matches!(self, Self::Cancelled | Self::Closed)
	}
}

pub type Result<T> = std::result::Result<T, Error>;
