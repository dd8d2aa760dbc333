use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::dependencies::DependencyRecord;
use crate::error::Fault;
use crate::id::{IdMap, ValueId, WatcherId};
use crate::value::Tracked;
use crate::Scope;

pub(crate) type Callback = Box<dyn FnMut(&Scope) -> Result<(), Fault>>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WatcherState {
	Active,
	/// Terminal. A disconnected watcher never runs again.
	Disconnected,
}

pub(crate) enum Kind {
	Derivation,
	/// Mirrors one value onto an external target while `alive` holds.
	Binding { alive: Box<dyn Fn() -> bool> },
}

/// A re-runnable computation together with what it currently depends on.
///
/// Handles are cheap to clone and compare by identity.
#[derive(Clone)]
pub struct Watcher {
	pub(crate) body: Rc<WatcherBody>,
}

pub(crate) struct WatcherBody {
	id: WatcherId,
	kind: Kind,
	callback: RefCell<Callback>,
	inner: RefCell<WatcherInner>,
}

struct WatcherInner {
	state: WatcherState,
	dependencies: IdMap<ValueId, Rc<dyn Tracked>>,
	children: IdMap<WatcherId, Watcher>,
	runs: u64,
	last_fault: Option<Rc<Fault>>,
}

impl Watcher {
	pub(crate) fn new(kind: Kind, callback: Callback) -> Self {
		Watcher {
			body: Rc::new(WatcherBody {
				id: WatcherId::next(),
				kind,
				callback: RefCell::new(callback),
				inner: RefCell::new(WatcherInner {
					state: WatcherState::Active,
					dependencies: IdMap::default(),
					children: IdMap::default(),
					runs: 0,
					last_fault: None,
				}),
			}),
		}
	}

	pub(crate) fn upgrade(weak: &Weak<WatcherBody>) -> Option<Watcher> {
		weak.upgrade().map(|body| Watcher { body })
	}

	pub(crate) fn downgrade(&self) -> Weak<WatcherBody> {
		Rc::downgrade(&self.body)
	}

	pub fn id(&self) -> WatcherId {
		self.body.id
	}

	pub fn state(&self) -> WatcherState {
		self.body.inner.borrow().state
	}

	pub fn is_connected(&self) -> bool {
		self.state() == WatcherState::Active
	}

	pub fn is_binding(&self) -> bool {
		matches!(self.body.kind, Kind::Binding { .. })
	}

	/// For a binding, whether its target is still alive. For a derivation,
	/// whether it is still connected.
	pub fn is_alive(&self) -> bool {
		match &self.body.kind {
			Kind::Binding { alive } => alive(),
			Kind::Derivation => self.is_connected(),
		}
	}

	/// Number of times the callback has been invoked.
	pub fn runs(&self) -> u64 {
		self.body.inner.borrow().runs
	}

	pub fn subscription_count(&self) -> usize {
		self.body.inner.borrow().dependencies.len()
	}

	pub fn child_count(&self) -> usize {
		self.body.inner.borrow().children.len()
	}

	pub fn children(&self) -> Vec<Watcher> {
		self.body.inner.borrow().children.values().cloned().collect()
	}

	pub fn last_fault(&self) -> Option<Rc<Fault>> {
		self.body.inner.borrow().last_fault.clone()
	}

	pub fn ptr_eq(&self, other: &Watcher) -> bool {
		Rc::ptr_eq(&self.body, &other.body)
	}

	/// Unsubscribes from every value, then disconnects every child,
	/// recursively. Idempotent.
	pub fn disconnect(&self) {
		let (dependencies, children) = {
			let mut inner = self.body.inner.borrow_mut();
			if inner.state == WatcherState::Disconnected {
				return;
			}
			inner.state = WatcherState::Disconnected;
			(
				std::mem::take(&mut inner.dependencies),
				std::mem::take(&mut inner.children),
			)
		};

		for value in dependencies.values() {
			value.unsubscribe(self.id());
		}

		for child in children.values() {
			child.disconnect();
		}

		trace!(watcher = %self.id(), children = children.len(), "disconnected");
	}

	/// Runs the callback, containing panics. `None` when the callback is
	/// already running further up the stack.
	pub(crate) fn invoke(&self, scope: &Scope) -> Option<Result<(), Fault>> {
		let mut guard = self.body.callback.try_borrow_mut().ok()?;
		self.body.inner.borrow_mut().runs += 1;

		let callback = &mut **guard;
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(scope)));
		Some(outcome.unwrap_or_else(|payload| Err(Fault::from_panic(payload))))
	}

	pub(crate) fn set_fault(&self, fault: Fault) {
		self.body.inner.borrow_mut().last_fault = Some(Rc::new(fault));
	}

	/// Subscribes to exactly `value`. Used for bindings, whose subscription
	/// is fixed at construction.
	pub(crate) fn bind_to(&self, value: Rc<dyn Tracked>) {
		value.subscribe(self);
		self.body
			.inner
			.borrow_mut()
			.dependencies
			.insert(value.id(), value);
	}

	/// Diffs the subscriptions and children of the last run against `record`.
	pub(crate) fn reconcile(&self, record: DependencyRecord) {
		let (pending, spawned) = record.into_parts();

		if self.is_binding() || !self.is_connected() {
			// bindings keep their fixed dependency and own no children
			for child in spawned.values() {
				child.disconnect();
			}
			return;
		}

		let (stale, fresh, orphans) = {
			let mut inner = self.body.inner.borrow_mut();

			let stale: Vec<_> = inner
				.dependencies
				.iter()
				.filter(|(id, _)| !pending.contains_key(*id))
				.map(|(_, value)| value.clone())
				.collect();

			let fresh: Vec<_> = pending
				.iter()
				.filter(|(id, _)| !inner.dependencies.contains_key(*id))
				.map(|(_, value)| value.clone())
				.collect();

			let orphans: Vec<_> = inner
				.children
				.iter()
				.filter(|(id, _)| !spawned.contains_key(*id))
				.map(|(_, child)| child.clone())
				.collect();

			inner.dependencies = pending;
			inner.children = spawned;

			(stale, fresh, orphans)
		};

		for value in stale {
			value.unsubscribe(self.id());
		}

		for value in fresh {
			value.subscribe(self);
		}

		for child in orphans {
			child.disconnect();
		}
	}
}

impl PartialEq for Watcher {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Watcher {}

impl fmt::Debug for Watcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.body.inner.borrow();
		f.debug_struct("Watcher")
			.field("id", &self.body.id)
			.field("binding", &self.is_binding())
			.field("state", &inner.state)
			.field("dependencies", &inner.dependencies.len())
			.field("children", &inner.children.len())
			.field("runs", &inner.runs)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::ManualScheduler;

	fn noop() -> Watcher {
		Watcher::new(Kind::Derivation, Box::new(|_: &Scope| -> Result<(), Fault> { Ok(()) }))
	}

	#[test]
	fn disconnect_cascades_to_children() {
		let scope = Scope::new(ManualScheduler::new());
		let value = scope.state(0);

		let parent = noop();
		let child = noop();
		let grandchild = noop();

		let mut record = DependencyRecord::new();
		record.spawned(grandchild.clone());
		child.reconcile(record);

		let mut record = DependencyRecord::new();
		record.read(value.erased());
		record.spawned(child.clone());
		parent.reconcile(record);

		assert_eq!(value.subscriber_count(), 1);
		assert_eq!(parent.child_count(), 1);

		parent.disconnect();

		assert_eq!(value.subscriber_count(), 0);
		assert_eq!(parent.child_count(), 0);
		assert_eq!(child.state(), WatcherState::Disconnected);
		assert_eq!(grandchild.state(), WatcherState::Disconnected);
	}

	#[test]
	fn reconcile_keeps_unchanged_subscriptions() {
		let scope = Scope::new(ManualScheduler::new());
		let a = scope.state(0);
		let b = scope.state(0);
		let watcher = noop();

		let mut record = DependencyRecord::new();
		record.read(a.erased());
		record.read(b.erased());
		watcher.reconcile(record);
		assert_eq!(watcher.subscription_count(), 2);

		let mut record = DependencyRecord::new();
		record.read(b.erased());
		watcher.reconcile(record);

		assert_eq!(watcher.subscription_count(), 1);
		assert_eq!(a.subscriber_count(), 0);
		assert_eq!(b.subscriber_count(), 1);
	}

	#[test]
	fn panics_become_faults() {
		let scope = Scope::new(ManualScheduler::new());
		let watcher = Watcher::new(
			Kind::Derivation,
			Box::new(|_: &Scope| -> Result<(), Fault> { panic!("kaboom") }),
		);

		let outcome = watcher.invoke(&scope).unwrap();
		let fault = outcome.unwrap_err();
		assert!(fault.is_panic());
		assert_eq!(watcher.runs(), 1);
	}
}
