mod reactivity;
#[cfg(feature = "tokio")]
mod runtime;

use tether::{ManualScheduler, Scope};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn scope() -> (Scope, ManualScheduler) {
	init_tracing();
	let scheduler = ManualScheduler::new();
	(Scope::new(scheduler.clone()), scheduler)
}
