/// The contract of a connectable watcher: something that mirrors one
/// tracked value onto an external target which can die.
///
/// The engine guarantees that
///
/// - `apply` runs once when the binding is connected, whatever `is_alive` says;
/// - afterwards `apply` runs only while `is_alive` holds, once per settled
///   cycle in which the value changed, after every ordinary derivation of that
///   cycle has reached its fixed point;
/// - a binding whose target died is disconnected by the next cleanup sweep
///   that sees it.
pub trait Binding<T>: 'static {
	/// Re-evaluated on every invocation.
	fn is_alive(&self) -> bool;

	/// `committed` is the value the previous cycle settled on, which is what
	/// the target currently reflects.
	fn apply(&mut self, current: &T, committed: &T);
}

/// A [`Binding`] made of two closures.
pub struct FnBinding<A, F> {
	alive: A,
	apply: F,
}

pub fn binding<T, A, F>(alive: A, apply: F) -> FnBinding<A, F>
where
	A: Fn() -> bool + 'static,
	F: FnMut(&T, &T) + 'static,
{
	FnBinding { alive, apply }
}

impl<T, A, F> Binding<T> for FnBinding<A, F>
where
	A: Fn() -> bool + 'static,
	F: FnMut(&T, &T) + 'static,
{
	fn is_alive(&self) -> bool {
		(self.alive)()
	}

	fn apply(&mut self, current: &T, committed: &T) {
		(self.apply)(current, committed)
	}
}
