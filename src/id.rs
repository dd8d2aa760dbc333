use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a tracked value. Used as the key of every table that
/// refers to values, so that two handles to the same cell compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(u64);

impl ValueId {
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		ValueId(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	pub fn raw(&self) -> u64 {
		self.0
	}
}

/// Identity of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(u64);

impl WatcherId {
	pub(crate) fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		WatcherId(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	pub fn raw(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for ValueId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "value#{}", self.0)
	}
}

impl fmt::Display for WatcherId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "watcher#{}", self.0)
	}
}

/// Insertion-ordered table keyed by identity.
pub(crate) type IdMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;
