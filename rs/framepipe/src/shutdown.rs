use std::{
	sync::{
		Arc, Weak,
		atomic::{AtomicBool, Ordering},
	},
	time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// Something blocked on its own lock that must be woken when shutdown is requested.
pub(crate) trait Interrupt: Send + Sync {
	fn interrupt(&self);
}

#[derive(Default)]
struct State {
	requested: bool,
	// Rings to cancel, dropped once the ring is gone.
	listeners: Vec<Weak<dyn Interrupt>>,
}

#[derive(Default)]
struct Inner {
	state: Mutex<State>,
	requested: AtomicBool,
	wake: Condvar,
}

/// A one-way signal to stop the pipeline.
///
/// Requesting shutdown wakes every thread sleeping in [Shutdown::sleep] and cancels every ring
/// created with this signal, so blocked `acquire_*` calls return [crate::Error::Cancelled].
/// Cloning is cheap; all clones observe the same signal.
#[derive(Clone, Default)]
pub struct Shutdown {
	inner: Arc<Inner>,
}

impl Shutdown {
	pub fn new() -> Self {
		Self::default()
	}

	/// Request shutdown. Only the first call has any effect.
	pub fn request(&self) {
		let listeners = {
			let mut state = self.inner.state.lock();
			if state.requested {
				return;
			}

			state.requested = true;
			self.inner.requested.store(true, Ordering::Release);
			std::mem::take(&mut state.listeners)
		};

		tracing::debug!(listeners = listeners.len(), "shutdown requested");

		self.inner.wake.notify_all();

		// Interrupt outside our lock; each listener takes its own.
		for listener in listeners.iter().filter_map(Weak::upgrade) {
			listener.interrupt();
		}
	}

	pub fn is_requested(&self) -> bool {
		self.inner.requested.load(Ordering::Acquire)
	}

	/// Sleep for `duration` or until shutdown is requested.
	///
	/// Returns true if the full duration elapsed, false if woken by shutdown.
	pub fn sleep(&self, duration: Duration) -> bool {
		let mut state = self.inner.state.lock();
		if state.requested {
			return false;
		}

		let Some(deadline) = Instant::now().checked_add(duration) else {
			self.inner.wake.wait_while(&mut state, |state| !state.requested);
			return false;
		};

		while !state.requested {
			if self.inner.wake.wait_until(&mut state, deadline).timed_out() {
				return !state.requested;
			}
		}

		false
	}

	pub(crate) fn register(&self, listener: Weak<dyn Interrupt>) {
		let mut state = self.inner.state.lock();
		if state.requested {
			drop(state);
			if let Some(listener) = listener.upgrade() {
				listener.interrupt();
			}
			return;
		}

		state.listeners.retain(|listener| listener.strong_count() > 0);
		state.listeners.push(listener);
	}
}

impl std::fmt::Debug for Shutdown {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Shutdown")
			.field("requested", &self.is_requested())
			.finish()
	}
}
