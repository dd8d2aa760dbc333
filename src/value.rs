use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::id::{IdMap, ValueId, WatcherId};
use crate::scope::{Scope, ScopeInner};
use crate::watcher::{Watcher, WatcherBody};

/// The engine's view of a tracked value, independent of its payload type.
pub(crate) trait Tracked: 'static {
	fn id(&self) -> ValueId;

	/// The value changed since the last settled cycle and somebody listens.
	fn should_propagate(&self) -> bool;

	fn commit(&self);

	/// Live subscribers, in subscription order.
	fn watchers(&self) -> SmallVec<[Watcher; 4]>;

	fn subscribe(&self, watcher: &Watcher);

	fn unsubscribe(&self, watcher: WatcherId);
}

/// A mutable cell whose reads and writes are observed by its [`Scope`].
///
/// Cloning the handle does not clone the cell.
pub struct TrackedValue<T> {
	pub(crate) body: Rc<ValueBody<T>>,
}

pub(crate) struct ValueBody<T> {
	id: ValueId,
	raw: RefCell<T>,
	committed: RefCell<T>,
	watchers: RefCell<IdMap<WatcherId, Weak<WatcherBody>>>,
	producer: RefCell<Option<Weak<WatcherBody>>>,
	scope: Weak<ScopeInner>,
}

impl<T> Clone for TrackedValue<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> TrackedValue<T>
where
	T: Clone + PartialEq + 'static,
{
	pub(crate) fn new(scope: Weak<ScopeInner>, value: T) -> Self {
		TrackedValue {
			body: Rc::new(ValueBody {
				id: ValueId::next(),
				committed: RefCell::new(value.clone()),
				raw: RefCell::new(value),
				watchers: RefCell::new(IdMap::default()),
				producer: RefCell::new(None),
				scope,
			}),
		}
	}

	pub fn id(&self) -> ValueId {
		self.body.id
	}

	/// Current value. Registers a dependency of the running computation.
	pub fn read(&self) -> T {
		self.track_read();
		self.body.raw.borrow().clone()
	}

	pub fn read_untracked(&self) -> T {
		self.body.raw.borrow().clone()
	}

	/// Value as of the end of the last settled cycle. Registers a dependency.
	pub fn read_committed(&self) -> T {
		self.track_read();
		self.body.committed.borrow().clone()
	}

	pub fn committed_untracked(&self) -> T {
		self.body.committed.borrow().clone()
	}

	/// Borrows the current value. Registers a dependency.
	///
	/// Writing to the same value from inside `func` panics.
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		self.track_read();
		func(&self.body.raw.borrow())
	}

	pub fn with_untracked<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(&self.body.raw.borrow())
	}

	pub fn write(&self, value: T) {
		*self.body.raw.borrow_mut() = value;
		self.after_write();
	}

	/// Mutates the value in place and goes through the write path.
	///
	/// Reading the same value from inside `func` panics.
	pub fn update(&self, func: impl FnOnce(&mut T)) {
		func(&mut self.body.raw.borrow_mut());
		self.after_write();
	}

	pub fn replace(&self, value: T) -> T {
		let old = std::mem::replace(&mut *self.body.raw.borrow_mut(), value);
		self.after_write();
		old
	}

	pub fn commit(&self) {
		self.body.commit();
	}

	pub fn should_propagate(&self) -> bool {
		self.body.should_propagate()
	}

	pub fn subscriber_count(&self) -> usize {
		self.body.live_watchers()
	}

	/// The watcher that computes this value, if it is a live derivation.
	pub fn producer(&self) -> Option<Watcher> {
		let producer = self.body.producer.borrow();
		producer.as_ref().and_then(Watcher::upgrade)
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	pub(crate) fn set_producer(&self, watcher: &Watcher) {
		*self.body.producer.borrow_mut() = Some(watcher.downgrade());
	}

	pub(crate) fn erased(&self) -> Rc<dyn Tracked> {
		self.body.clone()
	}

	fn track_read(&self) {
		if let Some(inner) = self.body.scope.upgrade() {
			Scope::from_inner(inner).handle_get(self.erased());
		}
	}

	fn after_write(&self) {
		match self.body.scope.upgrade() {
			Some(inner) => Scope::from_inner(inner).handle_set(self.erased()),
			None => self.body.commit(),
		}
	}
}

impl<T> ValueBody<T> {
	fn live_watchers(&self) -> usize {
		self.watchers
			.borrow()
			.values()
			.filter(|w| w.strong_count() > 0)
			.count()
	}
}

impl<T> Tracked for ValueBody<T>
where
	T: Clone + PartialEq + 'static,
{
	fn id(&self) -> ValueId {
		self.id
	}

	fn should_propagate(&self) -> bool {
		*self.raw.borrow() != *self.committed.borrow() && self.live_watchers() > 0
	}

	fn commit(&self) {
		let raw = self.raw.borrow().clone();
		*self.committed.borrow_mut() = raw;
	}

	fn watchers(&self) -> SmallVec<[Watcher; 4]> {
		self.watchers
			.borrow()
			.values()
			.filter_map(Watcher::upgrade)
			.collect()
	}

	fn subscribe(&self, watcher: &Watcher) {
		let mut watchers = self.watchers.borrow_mut();
		watchers.retain(|_, w| w.strong_count() > 0);
		watchers.insert(watcher.id(), watcher.downgrade());
	}

	fn unsubscribe(&self, watcher: WatcherId) {
		self.watchers.borrow_mut().shift_remove(&watcher);
	}
}

/// Identity, not content.
impl<T> PartialEq for TrackedValue<T> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}
}

impl<T> Debug for TrackedValue<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TrackedValue")
			.field("id", &self.body.id)
			.field("raw", &*self.body.raw.borrow())
			.field("committed", &*self.body.committed.borrow())
			.finish()
	}
}

/// Either a plain value or one that is already tracked. Passing the latter
/// to [`Scope::wrap_value`] returns the very same cell.
pub enum MaybeTracked<T> {
	Plain(T),
	Tracked(TrackedValue<T>),
}

impl<T> From<TrackedValue<T>> for MaybeTracked<T> {
	fn from(value: TrackedValue<T>) -> Self {
		MaybeTracked::Tracked(value)
	}
}

impl<T> MaybeTracked<T> {
	pub fn is_tracked(&self) -> bool {
		matches!(self, MaybeTracked::Tracked(_))
	}
}
