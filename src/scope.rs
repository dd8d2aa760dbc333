use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use crate::binding::Binding;
use crate::config::{ScopeBuilder, ScopeConfig};
use crate::error::Fault;
use crate::evaluation::Evaluation;
use crate::id::{IdMap, ValueId, WatcherId};
use crate::scheduler::Scheduler;
use crate::throttle::Throttle;
use crate::value::{MaybeTracked, Tracked, TrackedValue};
use crate::watcher::{Callback, Kind, Watcher};

/// Owns a reactive graph: the stack of running computations, the values
/// waiting for propagation, and the two deferred passes (flush and sweep).
///
/// Scopes are independent of each other. Cloning a `Scope` clones the handle.
#[derive(Clone)]
pub struct Scope {
	inner: Rc<ScopeInner>,
}

pub(crate) struct ScopeInner {
	config: ScopeConfig,
	scheduler: Rc<dyn Scheduler>,
	evaluation: Evaluation,
	dirty: RefCell<IdMap<ValueId, Rc<dyn Tracked>>>,
	collected: RefCell<Vec<Vec<Rc<dyn Tracked>>>>,
	roots: RefCell<IdMap<WatcherId, Watcher>>,
	bindings: RefCell<IdMap<WatcherId, Watcher>>,
	flush: Throttle,
	sweep: Throttle,
	settling: Cell<bool>,
}

/// Outcome of one [`Scope::settle`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SettleReport {
	pub rounds: usize,
	/// The round limit was hit and the remaining dirtiness was dropped.
	pub truncated: bool,
	pub watchers_run: usize,
	pub bindings_run: usize,
	pub committed: usize,
}

/// Outcome of one [`Scope::sweep`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
	pub candidates: usize,
	pub disconnected: usize,
}

impl Scope {
	pub fn new(scheduler: impl Scheduler + 'static) -> Self {
		Scope::from_parts(ScopeConfig::default(), Rc::new(scheduler))
	}

	pub fn builder() -> ScopeBuilder {
		ScopeBuilder::new()
	}

	pub(crate) fn from_parts(config: ScopeConfig, scheduler: Rc<dyn Scheduler>) -> Self {
		Scope {
			inner: Rc::new(ScopeInner {
				flush: Throttle::new(config.flush_delay),
				sweep: Throttle::new(config.sweep_interval),
				config,
				scheduler,
				evaluation: Evaluation::default(),
				dirty: RefCell::new(IdMap::default()),
				collected: RefCell::new(Vec::new()),
				roots: RefCell::new(IdMap::default()),
				bindings: RefCell::new(IdMap::default()),
				settling: Cell::new(false),
			}),
		}
	}

	pub(crate) fn from_inner(inner: Rc<ScopeInner>) -> Self {
		Scope { inner }
	}

	pub(crate) fn downgrade(&self) -> Weak<ScopeInner> {
		Rc::downgrade(&self.inner)
	}

	pub fn config(&self) -> &ScopeConfig {
		&self.inner.config
	}

	/// Returns a tracked value as is, or puts a plain one into a new cell.
	pub fn wrap_value<T>(&self, value: MaybeTracked<T>) -> TrackedValue<T>
	where
		T: Clone + PartialEq + 'static,
	{
		match value {
			MaybeTracked::Tracked(value) => value,
			MaybeTracked::Plain(value) => self.state(value),
		}
	}

	pub fn state<T>(&self, value: T) -> TrackedValue<T>
	where
		T: Clone + PartialEq + 'static,
	{
		TrackedValue::new(self.downgrade(), value)
	}

	/// Declares a derivation and runs it once, synchronously.
	///
	/// `func` receives this scope (use it for nested derivations instead of
	/// capturing a clone, which would keep the scope alive forever) and the
	/// previous result. The returned cell starts as `None` and holds the
	/// latest result afterwards.
	///
	/// Called from inside another derivation, the new derivation becomes its
	/// child and is disconnected when the parent stops creating it.
	pub fn derive<T, F>(&self, mut func: F) -> TrackedValue<Option<T>>
	where
		T: Clone + PartialEq + 'static,
		F: FnMut(&Scope, Option<T>) -> T + 'static,
	{
		self.try_derive(move |scope, prev| Ok::<_, Infallible>(func(scope, prev)))
	}

	/// Like [`derive`](Scope::derive), for computations that can fail. On
	/// `Err` the result keeps its previous content.
	pub fn try_derive<T, E, F>(&self, mut func: F) -> TrackedValue<Option<T>>
	where
		T: Clone + PartialEq + 'static,
		E: std::error::Error + 'static,
		F: FnMut(&Scope, Option<T>) -> Result<T, E> + 'static,
	{
		let output = self.state(None::<T>);

		let callback: Callback = {
			let output = output.clone();
			Box::new(move |scope: &Scope| -> Result<(), Fault> {
				let prev = output.read_untracked();
				let next = func(scope, prev).map_err(Fault::failed)?;
				output.write(Some(next));
				Ok(())
			})
		};

		let watcher = Watcher::new(Kind::Derivation, callback);
		output.set_producer(&watcher);

		if !self.inner.evaluation.record_child(&watcher) {
			self.inner
				.roots
				.borrow_mut()
				.insert(watcher.id(), watcher.clone());
		}

		self.execute(&watcher);
		output
	}

	/// Ties `value` to an external target through `binding`. The binding is
	/// applied once right away.
	pub fn connect<T, B>(&self, value: &TrackedValue<T>, binding: B) -> Watcher
	where
		T: Clone + PartialEq + 'static,
		B: Binding<T>,
	{
		let binding = Rc::new(RefCell::new(binding));

		let alive: Box<dyn Fn() -> bool> = {
			let binding = binding.clone();
			// a binding busy applying is alive by definition
			Box::new(move || binding.try_borrow().map_or(true, |b| b.is_alive()))
		};

		let callback: Callback = {
			let value = value.clone();
			let mut initial = true;
			Box::new(move |_: &Scope| -> Result<(), Fault> {
				let current = value.read();
				let mut binding = binding.borrow_mut();
				if std::mem::take(&mut initial) || binding.is_alive() {
					let committed = value.committed_untracked();
					binding.apply(&current, &committed);
				}
				Ok(())
			})
		};

		let watcher = Watcher::new(Kind::Binding { alive }, callback);
		watcher.bind_to(value.erased());
		self.inner
			.bindings
			.borrow_mut()
			.insert(watcher.id(), watcher.clone());

		self.execute(&watcher);
		watcher
	}

	/// Propagates every pending change now. The scheduled flush calls this.
	pub fn settle(&self) -> SettleReport {
		let mut report = SettleReport::default();
		if self.inner.settling.replace(true) {
			// already settling further up the stack; that pass picks up
			// whatever is dirty now
			return report;
		}

		let mut settled: IdMap<ValueId, Rc<dyn Tracked>> = IdMap::default();

		while report.rounds < self.inner.config.max_rounds && self.is_dirty() {
			report.rounds += 1;

			let dirty = std::mem::take(&mut *self.inner.dirty.borrow_mut());
			let mut queue: IdMap<WatcherId, Watcher> = IdMap::default();

			for (id, value) in dirty {
				if !value.should_propagate() {
					continue;
				}

				for watcher in value.watchers() {
					if !watcher.is_binding() {
						queue.entry(watcher.id()).or_insert(watcher);
					}
				}

				settled.entry(id).or_insert(value);
			}

			for watcher in queue.values() {
				self.execute(watcher);
				report.watchers_run += 1;
			}
		}

		let residual = std::mem::take(&mut *self.inner.dirty.borrow_mut());
		if !residual.is_empty() {
			report.truncated = true;
			debug!(
				rounds = report.rounds,
				dropped = residual.len(),
				"propagation did not converge, dropping pending changes"
			);
		}

		let mut bindings: IdMap<WatcherId, Watcher> = IdMap::default();
		for value in settled.values() {
			if !value.should_propagate() {
				continue;
			}
			for watcher in value.watchers() {
				if watcher.is_binding() {
					bindings.entry(watcher.id()).or_insert(watcher);
				}
			}
		}

		for binding in bindings.values() {
			self.execute(binding);
			report.bindings_run += 1;
		}

		for value in settled.values() {
			value.commit();
		}
		report.committed = settled.len();

		self.inner.settling.set(false);

		debug!(
			rounds = report.rounds,
			watchers = report.watchers_run,
			bindings = report.bindings_run,
			committed = report.committed,
			truncated = report.truncated,
			"settled"
		);

		report
	}

	/// Disconnects the bindings seen since the last sweep whose target died,
	/// and forgets disconnected roots. The scheduled sweep calls this.
	pub fn sweep(&self) -> SweepReport {
		let collected = std::mem::take(&mut *self.inner.collected.borrow_mut());

		let mut candidates: IdMap<WatcherId, Watcher> = IdMap::default();
		for value in collected.iter().flatten() {
			for watcher in value.watchers() {
				if watcher.is_binding() {
					candidates.entry(watcher.id()).or_insert(watcher);
				}
			}
		}

		let mut report = SweepReport {
			candidates: candidates.len(),
			disconnected: 0,
		};

		for watcher in candidates.values() {
			if !watcher.is_alive() {
				watcher.disconnect();
				report.disconnected += 1;
			}
		}

		self.inner
			.bindings
			.borrow_mut()
			.retain(|_, watcher| watcher.is_connected());
		self.inner
			.roots
			.borrow_mut()
			.retain(|_, watcher| watcher.is_connected());

		trace!(
			records = collected.len(),
			candidates = report.candidates,
			disconnected = report.disconnected,
			"swept"
		);

		report
	}

	pub fn is_dirty(&self) -> bool {
		!self.inner.dirty.borrow().is_empty()
	}

	/// Number of computations currently running.
	pub fn depth(&self) -> usize {
		self.inner.evaluation.depth()
	}

	/// Top-level derivations owned by this scope.
	pub fn root_count(&self) -> usize {
		self.inner.roots.borrow().len()
	}

	pub fn binding_count(&self) -> usize {
		self.inner.bindings.borrow().len()
	}

	pub fn ptr_eq(&self, other: &Scope) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	pub(crate) fn handle_get(&self, value: Rc<dyn Tracked>) {
		self.inner.evaluation.record_read(value);
	}

	pub(crate) fn handle_set(&self, value: Rc<dyn Tracked>) {
		self.inner.evaluation.record_write(value.clone());

		if value.should_propagate() {
			self.inner
				.dirty
				.borrow_mut()
				.entry(value.id())
				.or_insert(value);
			self.request_flush();
		} else {
			value.commit();
		}
	}

	fn execute(&self, watcher: &Watcher) {
		if !watcher.is_connected() {
			trace!(watcher = %watcher.id(), "skipping disconnected watcher");
			return;
		}

		let depth = self.inner.evaluation.open();
		let outcome = watcher.invoke(self);
		let record = self.inner.evaluation.close(depth);

		match outcome {
			None => {
				warn!(watcher = %watcher.id(), "watcher is already running, skipping");
				return;
			}
			Some(Err(fault)) => {
				error!(watcher = %watcher.id(), error = %fault, "recomputation fault");
				watcher.set_fault(fault);
			}
			Some(Ok(())) => {
				trace!(watcher = %watcher.id(), depth, "ran");
			}
		}

		let touched = record.touched();
		watcher.reconcile(record);

		self.inner.collected.borrow_mut().push(touched);
		self.request_sweep();
	}

	fn request_flush(&self) {
		let scope = Rc::downgrade(&self.inner);
		self.inner.flush.request(&*self.inner.scheduler, move || {
			if let Some(inner) = scope.upgrade() {
				Scope::from_inner(inner).settle();
			}
		});
	}

	fn request_sweep(&self) {
		let scope = Rc::downgrade(&self.inner);
		self.inner.sweep.request(&*self.inner.scheduler, move || {
			if let Some(inner) = scope.upgrade() {
				Scope::from_inner(inner).sweep();
			}
		});
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("config", &self.inner.config)
			.field("depth", &self.depth())
			.field("dirty", &self.inner.dirty.borrow().len())
			.field("flush_pending", &self.inner.flush.is_pending())
			.field("roots", &self.root_count())
			.field("bindings", &self.binding_count())
			.finish()
	}
}
