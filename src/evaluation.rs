use std::cell::RefCell;
use std::rc::Rc;

use crate::dependencies::DependencyRecord;
use crate::value::Tracked;
use crate::watcher::Watcher;

/// Stack of the records of every computation currently running. Its depth
/// is the nesting of derivations being computed.
#[derive(Default)]
pub(crate) struct Evaluation {
	stack: RefCell<Vec<DependencyRecord>>,
}

impl Evaluation {
	pub fn depth(&self) -> usize {
		self.stack.borrow().len()
	}

	/// Opens a record and returns the depth to close it at.
	pub fn open(&self) -> usize {
		let mut stack = self.stack.borrow_mut();
		let depth = stack.len();
		stack.push(DependencyRecord::new());
		depth
	}

	/// Closes the record opened at `depth`, dropping anything a faulty inner
	/// computation left above it.
	pub fn close(&self, depth: usize) -> DependencyRecord {
		let mut stack = self.stack.borrow_mut();
		stack.truncate(depth + 1);
		if stack.len() == depth + 1 {
			stack.pop().unwrap_or_default()
		} else {
			DependencyRecord::new()
		}
	}

	pub fn record_read(&self, value: Rc<dyn Tracked>) {
		if let Some(record) = self.stack.borrow_mut().last_mut() {
			record.read(value);
		}
	}

	pub fn record_write(&self, value: Rc<dyn Tracked>) {
		if let Some(record) = self.stack.borrow_mut().last_mut() {
			record.wrote(value);
		}
	}

	/// Returns `false` when no computation is running.
	pub fn record_child(&self, watcher: &Watcher) -> bool {
		match self.stack.borrow_mut().last_mut() {
			Some(record) => {
				record.spawned(watcher.clone());
				true
			}
			None => false,
		}
	}
}
