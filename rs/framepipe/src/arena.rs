use crate::{Error, Geometry, Result, VideoFrame};

/// Who may claim a slot next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
	/// Empty or already presented; the producer may fill it.
	Writable,
	/// Holds a committed frame; the consumer may read it.
	Readable,
}

struct Slot<T> {
	state: SlotState,
	// None while the value is lent out to a slot guard.
	value: Option<T>,
}

/// A fixed pool of reusable values addressed by index.
///
/// The arena owns every value for its whole lifetime. A value is lent out by moving it into a
/// slot guard and moved back when the guard commits or releases, so exactly one party can touch
/// it at a time.
pub struct SlotArena<T> {
	slots: Box<[Slot<T>]>,
}

impl<T> SlotArena<T> {
	/// Create an arena with `capacity` slots, each initialized by `init(index)`.
	///
	/// All slots start [SlotState::Writable].
	pub fn new<F>(capacity: usize, mut init: F) -> Result<Self>
	where
		F: FnMut(usize) -> Result<T>,
	{
		if capacity == 0 {
			return Err(Error::InvalidConfig("ring capacity must be at least 1"));
		}

		let slots = (0..capacity)
			.map(|index| {
				Ok(Slot {
					state: SlotState::Writable,
					value: Some(init(index)?),
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(Self {
			slots: slots.into_boxed_slice(),
		})
	}

	pub fn capacity(&self) -> usize {
		self.slots.len()
	}

	pub fn state(&self, index: usize) -> SlotState {
		self.slots[index].state
	}

	/// Returns true while the slot's value is held by a guard.
	pub fn is_lent(&self, index: usize) -> bool {
		self.slots[index].value.is_none()
	}

	/// Number of [SlotState::Readable] slots that aren't lent out.
	pub fn readable(&self) -> usize {
		self.slots
			.iter()
			.filter(|slot| slot.state == SlotState::Readable && slot.value.is_some())
			.count()
	}

	pub(crate) fn lend(&mut self, index: usize) -> T {
		self.slots[index].value.take().expect("slot already lent")
	}

	pub(crate) fn restore(&mut self, index: usize, value: T, state: SlotState) {
		let slot = &mut self.slots[index];
		debug_assert!(slot.value.is_none(), "restoring a slot that was never lent");
		slot.value = Some(value);
		slot.state = state;
	}
}

impl SlotArena<VideoFrame> {
	/// Allocate `capacity` frame buffers for the given stream geometry.
	///
	/// Allocation failure is reported as [Error::OutOfMemory] rather than aborting, so it can be
	/// surfaced before any playback thread starts.
	pub fn frames(capacity: usize, geometry: Geometry) -> Result<Self> {
		tracing::debug!(
			capacity,
			%geometry,
			total_bytes = capacity.saturating_mul(geometry.frame_size()),
			"allocating frame arena"
		);

		Self::new(capacity, |_| VideoFrame::new(geometry))
	}
}

impl<T> std::fmt::Debug for SlotArena<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list()
			.entries(self.slots.iter().map(|slot| (slot.state, slot.value.is_none())))
			.finish()
	}
}
