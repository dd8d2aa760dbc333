use std::rc::Rc;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scheduler::Scheduler;
use crate::Scope;

/// Tunables of a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
	/// Delay of the propagation flush after the first dirty write.
	pub flush_delay: Duration,
	/// Delay of the cleanup sweep after the first completed run.
	pub sweep_interval: Duration,
	/// Upper bound of propagation rounds per flush. Pending dirtiness left
	/// after the last round is dropped.
	pub max_rounds: usize,
}

impl ScopeConfig {
	pub const DEFAULT_MAX_ROUNDS: usize = 100;
	pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_rounds == 0 {
			return Err(ConfigError::ZeroRounds);
		}

		Ok(())
	}
}

impl Default for ScopeConfig {
	fn default() -> Self {
		ScopeConfig {
			flush_delay: Duration::ZERO,
			sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
			max_rounds: Self::DEFAULT_MAX_ROUNDS,
		}
	}
}

#[derive(Debug, Default)]
pub struct ScopeBuilder {
	config: ScopeConfig,
}

impl ScopeBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn flush_delay(mut self, delay: Duration) -> Self {
		self.config.flush_delay = delay;
		self
	}

	pub fn sweep_interval(mut self, interval: Duration) -> Self {
		self.config.sweep_interval = interval;
		self
	}

	pub fn max_rounds(mut self, rounds: usize) -> Self {
		self.config.max_rounds = rounds;
		self
	}

	pub fn config(&self) -> &ScopeConfig {
		&self.config
	}

	pub fn build(self, scheduler: impl Scheduler + 'static) -> Result<Scope, ConfigError> {
		self.config.validate()?;
		Ok(Scope::from_parts(self.config, Rc::new(scheduler)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::ManualScheduler;

	#[test]
	fn defaults() {
		let config = ScopeConfig::default();
		assert_eq!(config.max_rounds, 100);
		assert_eq!(config.sweep_interval, Duration::from_secs(1));
		assert_eq!(config.flush_delay, Duration::ZERO);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn zero_rounds_is_rejected() {
		let result = ScopeBuilder::new()
			.max_rounds(0)
			.build(ManualScheduler::new());
		assert_eq!(result.err(), Some(ConfigError::ZeroRounds));
	}

	#[test]
	fn builder_overrides() {
		let builder = ScopeBuilder::new()
			.max_rounds(7)
			.flush_delay(Duration::from_millis(5))
			.sweep_interval(Duration::from_millis(50));

		assert_eq!(builder.config().max_rounds, 7);
		assert_eq!(builder.config().flush_delay, Duration::from_millis(5));
		assert_eq!(builder.config().sweep_interval, Duration::from_millis(50));

		let scope = builder.build(ManualScheduler::new()).unwrap();
		assert_eq!(scope.config().max_rounds, 7);
	}
}
