//! The deferred-callback primitive the engine consumes.
//!
//! A [`Scope`](crate::Scope) never blocks and never spawns threads. It asks a
//! [`Scheduler`] to run a task once, later, after some delay, and that is the
//! only thing it needs from its environment.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

pub type Task = Box<dyn FnOnce()>;

pub trait Scheduler {
	/// Run `task` once, no earlier than `delay` from now.
	fn schedule(&self, delay: Duration, task: Task);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
	fn schedule(&self, delay: Duration, task: Task) {
		(**self).schedule(delay, task)
	}
}

/// A virtual clock. Nothing runs until the owner moves time forward with
/// [`tick`](ManualScheduler::tick), [`advance`](ManualScheduler::advance) or
/// [`run_until_idle`](ManualScheduler::run_until_idle).
///
/// Tasks due at the same instant run in the order they were scheduled.
#[derive(Clone, Default)]
pub struct ManualScheduler {
	queue: Rc<RefCell<Queue>>,
}

#[derive(Default)]
struct Queue {
	now: Duration,
	seq: u64,
	tasks: BTreeMap<(Duration, u64), Task>,
}

impl ManualScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn now(&self) -> Duration {
		self.queue.borrow().now
	}

	pub fn pending(&self) -> usize {
		self.queue.borrow().tasks.len()
	}

	pub fn next_due(&self) -> Option<Duration> {
		self.queue.borrow().tasks.keys().next().map(|(due, _)| *due)
	}

	/// Runs everything that is due without moving the clock.
	pub fn tick(&self) -> usize {
		self.advance(Duration::ZERO)
	}

	/// Moves the clock forward by `by`, running every task that becomes due,
	/// including tasks scheduled by those tasks.
	pub fn advance(&self, by: Duration) -> usize {
		let until = self.now() + by;
		let mut ran = 0;

		while let Some(task) = self.pop_due(Some(until)) {
			task();
			ran += 1;
		}

		let mut queue = self.queue.borrow_mut();
		if queue.now < until {
			queue.now = until;
		}

		ran
	}

	/// Runs tasks in due order, jumping the clock, until the queue is empty.
	pub fn run_until_idle(&self) -> usize {
		let mut ran = 0;
		while let Some(task) = self.pop_due(None) {
			task();
			ran += 1;
		}
		ran
	}

	fn pop_due(&self, until: Option<Duration>) -> Option<Task> {
		let mut queue = self.queue.borrow_mut();
		let key = *queue.tasks.keys().next()?;
		if matches!(until, Some(until) if key.0 > until) {
			return None;
		}

		if key.0 > queue.now {
			queue.now = key.0;
		}

		queue.tasks.remove(&key)
	}
}

impl Scheduler for ManualScheduler {
	fn schedule(&self, delay: Duration, task: Task) {
		let mut queue = self.queue.borrow_mut();
		let due = queue.now + delay;
		let seq = queue.seq;
		queue.seq += 1;
		queue.tasks.insert((due, seq), task);
	}
}

impl fmt::Debug for ManualScheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let queue = self.queue.borrow();
		f.debug_struct("ManualScheduler")
			.field("now", &queue.now)
			.field("pending", &queue.tasks.len())
			.finish()
	}
}

/// Spawns tasks on the current tokio `LocalSet`.
#[cfg(feature = "tokio")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalScheduler;

#[cfg(feature = "tokio")]
impl Scheduler for LocalScheduler {
	fn schedule(&self, delay: Duration, task: Task) {
		tokio::task::spawn_local(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			task();
		});
	}
}

#[cfg(target_arch = "wasm32")]
pub use crate::microtask::TimeoutScheduler;
