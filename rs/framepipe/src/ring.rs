use std::{
	ops::{Deref, DerefMut},
	sync::{Arc, Weak},
};

use parking_lot::{Condvar, Mutex};

use crate::{
	Error, Result, Shutdown, SlotArena, SlotState,
	shutdown::Interrupt,
};

struct RingState<T> {
	arena: SlotArena<T>,

	// The next slot the producer may claim.
	write_cursor: usize,

	// The next slot the consumer may claim.
	read_cursor: usize,

	// The producer is done; the consumer drains what's left.
	finished: bool,

	// The producer failed; the consumer stops immediately.
	aborted: Option<Error>,

	// Shutdown was requested; both sides stop immediately.
	cancelled: bool,

	// The consumer is gone; the producer stops.
	closed: bool,
}

impl<T> RingState<T> {
	fn advance(&self, cursor: usize) -> usize {
		(cursor + 1) % self.arena.capacity()
	}
}

struct Shared<T> {
	state: Mutex<RingState<T>>,

	// A slot became readable, or the ring was finished/aborted/cancelled.
	readable: Condvar,

	// A slot became writable, or the ring was closed/cancelled.
	writable: Condvar,
}

impl<T> Shared<T> {
	fn cancel(&self) {
		self.state.lock().cancelled = true;
		self.readable.notify_all();
		self.writable.notify_all();
	}
}

impl<T: Send> Interrupt for Shared<T> {
	fn interrupt(&self) {
		self.cancel();
	}
}

/// A bounded, blocking hand-off of arena slots from one producer to one consumer.
///
/// Slots are claimed strictly in ring order, so frames come out in exactly the order they were
/// committed. A full ring blocks the producer and an empty ring blocks the consumer; neither
/// wait has a time-out, but both return [Error::Cancelled] as soon as the [Shutdown] passed to
/// [Ring::new] is requested.
pub struct Ring<T> {
	pub producer: RingProducer<T>,
	pub consumer: RingConsumer<T>,
}

impl<T: Send + 'static> Ring<T> {
	pub fn new(arena: SlotArena<T>, shutdown: &Shutdown) -> Self {
		let shared = Arc::new(Shared {
			state: Mutex::new(RingState {
				arena,
				write_cursor: 0,
				read_cursor: 0,
				finished: false,
				aborted: None,
				cancelled: false,
				closed: false,
			}),
			readable: Condvar::new(),
			writable: Condvar::new(),
		});

		let listener: Weak<dyn Interrupt> = Arc::downgrade(&shared) as Weak<dyn Interrupt>;
		shutdown.register(listener);

		Self {
			producer: RingProducer {
				shared: shared.clone(),
				finished: false,
			},
			consumer: RingConsumer { shared },
		}
	}
}

/// The writing half of a [Ring]; there is exactly one.
pub struct RingProducer<T> {
	shared: Arc<Shared<T>>,
	finished: bool,
}

impl<T> RingProducer<T> {
	/// Block until the slot at the write cursor is writable, then claim it.
	///
	/// Returns [Error::Cancelled] on shutdown or [Error::Closed] if the consumer was dropped.
	pub fn acquire_write_slot(&mut self) -> Result<WriteSlot<'_, T>> {
		let mut state = self.shared.state.lock();
		let index = state.write_cursor;

		loop {
			if state.cancelled {
				return Err(Error::Cancelled);
			}

			if state.closed {
				return Err(Error::Closed);
			}

			if state.arena.state(index) == SlotState::Writable {
				break;
			}

			self.shared.writable.wait(&mut state);
		}

		let value = state.arena.lend(index);
		drop(state);

		Ok(WriteSlot {
			producer: self,
			index,
			value: Some(value),
		})
	}

	/// Publish a claimed slot to the consumer; the same as [WriteSlot::commit].
	pub fn commit_write(slot: WriteSlot<'_, T>) {
		slot.commit();
	}

	/// Signal the end of the stream.
	///
	/// The consumer still receives every committed frame, then `None`.
	pub fn finish(mut self) {
		self.close(None);
	}

	/// Stop the stream with an error; the consumer's next acquire returns it.
	pub fn abort(mut self, err: Error) {
		self.close(Some(err));
	}

	pub fn capacity(&self) -> usize {
		self.shared.state.lock().arena.capacity()
	}

	/// Returns true if the consumer is gone or shutdown was requested.
	pub fn is_closed(&self) -> bool {
		let state = self.shared.state.lock();
		state.closed || state.cancelled
	}

	fn close(&mut self, err: Option<Error>) {
		if self.finished {
			return;
		}
		self.finished = true;

		let mut state = self.shared.state.lock();
		state.finished = true;
		state.aborted = err;
		drop(state);

		self.shared.readable.notify_all();
	}
}

impl<T> Drop for RingProducer<T> {
	fn drop(&mut self) {
		self.close(None);
	}
}

/// The reading half of a [Ring]; there is exactly one.
pub struct RingConsumer<T> {
	shared: Arc<Shared<T>>,
}

impl<T> RingConsumer<T> {
	/// Block until the slot at the read cursor is readable, then claim it.
	///
	/// Returns `Ok(None)` once the producer finished and every committed slot was read.
	pub fn acquire_read_slot(&mut self) -> Result<Option<ReadSlot<'_, T>>> {
		let mut state = self.shared.state.lock();
		let index = state.read_cursor;

		loop {
			if state.cancelled {
				return Err(Error::Cancelled);
			}

			if let Some(err) = state.aborted.clone() {
				return Err(err);
			}

			// NOTE: readiness is decided by our own cursor, never the producer's.
			if state.arena.state(index) == SlotState::Readable {
				break;
			}

			if state.finished {
				return Ok(None);
			}

			self.shared.readable.wait(&mut state);
		}

		let value = state.arena.lend(index);
		drop(state);

		Ok(Some(ReadSlot {
			consumer: self,
			index,
			value: Some(value),
		}))
	}

	/// Hand a read slot back to the producer; the same as [ReadSlot::release].
	pub fn release_read_slot(slot: ReadSlot<'_, T>) {
		slot.release();
	}

	/// The number of committed slots waiting to be read, not counting one held by a [ReadSlot].
	pub fn len(&self) -> usize {
		self.shared.state.lock().arena.readable()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.shared.state.lock().arena.capacity()
	}
}

impl<T> Drop for RingConsumer<T> {
	fn drop(&mut self) {
		self.shared.state.lock().closed = true;
		self.shared.writable.notify_all();
	}
}

/// Exclusive write access to one slot, returned by [RingProducer::acquire_write_slot].
///
/// Dropping it without [WriteSlot::commit] abandons the write: the slot stays writable and the
/// cursor doesn't move.
pub struct WriteSlot<'a, T> {
	producer: &'a mut RingProducer<T>,
	index: usize,
	value: Option<T>,
}

impl<T> WriteSlot<'_, T> {
	pub fn index(&self) -> usize {
		self.index
	}

	/// Publish the slot to the consumer and wake it.
	pub fn commit(mut self) {
		let value = self.value.take().expect("slot committed twice");
		let shared = &self.producer.shared;

		let mut state = shared.state.lock();
		state.arena.restore(self.index, value, SlotState::Readable);
		state.write_cursor = state.advance(self.index);
		drop(state);

		shared.readable.notify_one();
	}
}

impl<T> Deref for WriteSlot<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		self.value.as_ref().unwrap()
	}
}

impl<T> DerefMut for WriteSlot<'_, T> {
	fn deref_mut(&mut self) -> &mut T {
		self.value.as_mut().unwrap()
	}
}

impl<T> Drop for WriteSlot<'_, T> {
	fn drop(&mut self) {
		if let Some(value) = self.value.take() {
			let mut state = self.producer.shared.state.lock();
			state.arena.restore(self.index, value, SlotState::Writable);
		}
	}
}

/// Exclusive read access to one slot, returned by [RingConsumer::acquire_read_slot].
///
/// The slot goes back to the producer on [ReadSlot::release] or when dropped.
pub struct ReadSlot<'a, T> {
	consumer: &'a mut RingConsumer<T>,
	index: usize,
	value: Option<T>,
}

impl<T> ReadSlot<'_, T> {
	pub fn index(&self) -> usize {
		self.index
	}

	/// Hand the slot back to the producer and wake it.
	pub fn release(self) {
		// The work happens in Drop.
	}
}

impl<T> Deref for ReadSlot<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		self.value.as_ref().unwrap()
	}
}

impl<T> Drop for ReadSlot<'_, T> {
	fn drop(&mut self) {
		let Some(value) = self.value.take() else {
			return;
		};

		let shared = &self.consumer.shared;

		let mut state = shared.state.lock();
		state.arena.restore(self.index, value, SlotState::Writable);
		state.read_cursor = state.advance(self.index);
		drop(state);

		shared.writable.notify_one();
	}
}
