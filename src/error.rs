use std::any::Any;

use thiserror::Error;

/// A recomputation fault: the callback of a watcher did not complete.
///
/// Faults are contained at the watcher boundary. They are logged and kept
/// as [`Watcher::last_fault`](crate::Watcher::last_fault), never returned
/// to the code that triggered the run.
#[derive(Debug, Error)]
pub enum Fault {
	#[error("callback panicked: {message}")]
	Panicked { message: String },

	#[error("callback failed: {source}")]
	Failed {
		#[source]
		source: Box<dyn std::error::Error>,
	},
}

impl Fault {
	pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
		let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
			(*s).to_owned()
		} else if let Some(s) = payload.downcast_ref::<String>() {
			s.clone()
		} else {
			String::from("<non-string panic payload>")
		};

		Fault::Panicked { message }
	}

	pub(crate) fn failed(source: impl std::error::Error + 'static) -> Self {
		Fault::Failed {
			source: Box::new(source),
		}
	}

	pub fn is_panic(&self) -> bool {
		matches!(self, Fault::Panicked { .. })
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("`max_rounds` must be at least 1")]
	ZeroRounds,
}
