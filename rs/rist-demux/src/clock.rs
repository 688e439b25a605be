use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source used by the flush policy.
pub trait Clock: Send {
	fn now(&self) -> Instant;
}

/// Reads [Instant::now].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one and hand the other to a [crate::Registry].
#[derive(Clone, Debug)]
pub struct ManualClock {
	now: Arc<Mutex<Instant>>,
}

impl ManualClock {
	pub fn new() -> Self {
		Self::starting_at(Instant::now())
	}

	pub fn starting_at(now: Instant) -> Self {
		Self {
			now: Arc::new(Mutex::new(now)),
		}
	}

	pub fn advance(&self, duration: Duration) {
		*self.now.lock() += duration;
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for ManualClock {
	fn now(&self) -> Instant {
		*self.now.lock()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_manual_clock_is_shared() {
		let clock = ManualClock::new();
		let start = clock.now();

		let cloned = clock.clone();
		cloned.advance(Duration::from_millis(10));

		assert_eq!(clock.now() - start, Duration::from_millis(10));
		assert_eq!(clock.now(), cloned.now());
	}

	#[test]
	fn test_manual_clock_stands_still() {
		let clock = ManualClock::new();
		assert_eq!(clock.now(), clock.now());
	}
}
