//! Fine-grained reactive state.
//!
//! A [`Scope`] owns a graph of [`TrackedValue`]s and derivations. Reading a
//! tracked value inside a derivation subscribes the derivation to it; writing
//! schedules a flush that re-runs every affected derivation, round after
//! round, until nothing changes or the round limit is hit. Bindings made with
//! [`Scope::connect`] mirror a value onto something outside the graph and run
//! once per flush after all derivations settled. A periodic sweep drops
//! bindings whose target died.
//!
//! ```
//! use tether::{ManualScheduler, Scope};
//!
//! let scheduler = ManualScheduler::new();
//! let scope = Scope::new(scheduler.clone());
//!
//! let count = scope.state(1);
//! let double = scope.derive({
//! 	let count = count.clone();
//! 	move |_, _| count.read() * 2
//! });
//!
//! count.write(5);
//! count.write(21);
//! scheduler.tick();
//! assert_eq!(double.read(), Some(42));
//! ```

pub mod macros;

mod binding;
mod config;
mod dependencies;
mod error;
mod evaluation;
mod id;
#[cfg(target_arch = "wasm32")]
mod microtask;
mod reactive;
mod scheduler;
mod scope;
mod throttle;
mod value;
mod watcher;

pub use binding::{binding, Binding, FnBinding};
pub use config::{ScopeBuilder, ScopeConfig};
pub use error::{ConfigError, Fault};
pub use id::{ValueId, WatcherId};
pub use reactive::{
	unreactive, IntoNode, Node, RawArray, RawNode, RawObject, ReactiveArray, ReactiveObject,
	Unreactive, WrapContext,
};
#[cfg(feature = "tokio")]
pub use scheduler::LocalScheduler;
#[cfg(target_arch = "wasm32")]
pub use scheduler::TimeoutScheduler;
pub use scheduler::{ManualScheduler, Scheduler, Task};
pub use scope::{Scope, SettleReport, SweepReport};
pub use value::{MaybeTracked, TrackedValue};
pub use watcher::{Watcher, WatcherState};
