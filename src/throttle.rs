use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::scheduler::Scheduler;

/// Coalescing trigger: any number of requests made while one is pending
/// collapse into that single pending run.
pub(crate) struct Throttle {
	delay: Duration,
	pending: Rc<Cell<bool>>,
}

impl Throttle {
	pub fn new(delay: Duration) -> Self {
		Throttle {
			delay,
			pending: Rc::new(Cell::new(false)),
		}
	}

	pub fn is_pending(&self) -> bool {
		self.pending.get()
	}

	/// Returns `true` when this call scheduled a new run.
	pub fn request(&self, scheduler: &dyn Scheduler, task: impl FnOnce() + 'static) -> bool {
		if self.pending.replace(true) {
			return false;
		}

		let pending = self.pending.clone();
		scheduler.schedule(
			self.delay,
			Box::new(move || {
				// cleared first so the task itself may request the next run
				pending.set(false);
				task();
			}),
		);

		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::ManualScheduler;

	#[test]
	fn requests_coalesce_until_fired() {
		let scheduler = ManualScheduler::new();
		let throttle = Throttle::new(Duration::from_millis(100));
		let runs = Rc::new(Cell::new(0));

		for _ in 0..10 {
			let runs = runs.clone();
			throttle.request(&scheduler, move || runs.set(runs.get() + 1));
		}

		assert!(throttle.is_pending());
		assert_eq!(scheduler.pending(), 1);

		scheduler.advance(Duration::from_millis(100));
		assert_eq!(runs.get(), 1);
		assert!(!throttle.is_pending());

		let runs2 = runs.clone();
		assert!(throttle.request(&scheduler, move || runs2.set(runs2.get() + 1)));
		scheduler.advance(Duration::from_millis(100));
		assert_eq!(runs.get(), 2);
	}
}
