use std::rc::Rc;

use crate::id::{IdMap, ValueId, WatcherId};
use crate::value::Tracked;
use crate::watcher::Watcher;

/// What one run of a computation touched.
#[derive(Default)]
pub(crate) struct DependencyRecord {
	pulled: IdMap<ValueId, Rc<dyn Tracked>>,
	written: IdMap<ValueId, Rc<dyn Tracked>>,
	children: IdMap<WatcherId, Watcher>,
}

impl DependencyRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read(&mut self, value: Rc<dyn Tracked>) {
		self.pulled.entry(value.id()).or_insert(value);
	}

	pub fn wrote(&mut self, value: Rc<dyn Tracked>) {
		self.written.entry(value.id()).or_insert(value);
	}

	pub fn spawned(&mut self, watcher: Watcher) {
		self.children.entry(watcher.id()).or_insert(watcher);
	}

	/// Every value read or written, each once.
	pub fn touched(&self) -> Vec<Rc<dyn Tracked>> {
		let mut all: IdMap<ValueId, Rc<dyn Tracked>> = self.pulled.clone();
		for (id, value) in &self.written {
			all.entry(*id).or_insert_with(|| value.clone());
		}
		all.into_values().collect()
	}

	/// Splits the record into the subscription set (read and not written
	/// in the same run) and the spawned children.
	pub fn into_parts(self) -> (IdMap<ValueId, Rc<dyn Tracked>>, IdMap<WatcherId, Watcher>) {
		let DependencyRecord {
			mut pulled,
			written,
			children,
		} = self;

		pulled.retain(|id, _| !written.contains_key(id));
		(pulled, children)
	}

	#[cfg(test)]
	pub fn pulled_len(&self) -> usize {
		self.pulled.len()
	}
}
