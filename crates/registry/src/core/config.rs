//! Registry configuration.
//!
//! Defaults follow the create-once protocol's contract: waiters give up
//! after 90 s and, with verbose diagnostics on, report a potential deadlock
//! after 5 s. Hosts can embed [`RegistryConfig`] in their own serde config or
//! pick up `BEANERY_*` environment overrides with [`RegistryConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub const DEFAULT_CREATION_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_DEADLOCK_WARNING_AFTER: Duration = Duration::from_secs(5);
pub const DEFAULT_WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub const ENV_CREATION_TIMEOUT_MS: &str = "BEANERY_CREATION_TIMEOUT_MS";
pub const ENV_DEADLOCK_WARNING_MS: &str = "BEANERY_DEADLOCK_WARNING_MS";
pub const ENV_WAIT_POLL_MS: &str = "BEANERY_WAIT_POLL_MS";
pub const ENV_VERBOSE_DIAGNOSTICS: &str = "BEANERY_VERBOSE_DIAGNOSTICS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
	/// Upper bound a thread waits for another thread creating the same shared bean.
	#[serde(rename = "creation_timeout_ms", deserialize_with = "millis")]
	pub creation_timeout: Duration,
	/// Wait after which the potential-deadlock warning is logged (verbose only).
	#[serde(rename = "deadlock_warning_ms", deserialize_with = "millis")]
	pub deadlock_warning_after: Duration,
	/// Slice between re-checks of the creator marker while waiting.
	#[serde(rename = "wait_poll_ms", deserialize_with = "millis")]
	pub wait_poll_interval: Duration,
	/// Enables the deadlock warning and creator backtrace capture.
	pub verbose_diagnostics: bool,
	/// Decorate a shared bean once and hand out the cached decorated handle.
	pub decorate_once_per_shared_instance: bool,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			creation_timeout: DEFAULT_CREATION_TIMEOUT,
			deadlock_warning_after: DEFAULT_DEADLOCK_WARNING_AFTER,
			wait_poll_interval: DEFAULT_WAIT_POLL_INTERVAL,
			verbose_diagnostics: false,
			decorate_once_per_shared_instance: true,
		}
	}
}

impl RegistryConfig {
	/// Defaults with `BEANERY_*` environment overrides applied.
	pub fn from_env() -> Self {
		Self::default().apply_env(|key| std::env::var(key).ok())
	}

	/// Applies overrides read through `lookup`. Malformed values are logged and ignored.
	pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		if let Some(ms) = parse_env(&lookup, ENV_CREATION_TIMEOUT_MS, str::parse::<u64>) {
			self.creation_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = parse_env(&lookup, ENV_DEADLOCK_WARNING_MS, str::parse::<u64>) {
			self.deadlock_warning_after = Duration::from_millis(ms);
		}
		if let Some(ms) = parse_env(&lookup, ENV_WAIT_POLL_MS, str::parse::<u64>) {
			self.wait_poll_interval = Duration::from_millis(ms);
		}
		if let Some(on) = parse_env(&lookup, ENV_VERBOSE_DIAGNOSTICS, parse_flag) {
			self.verbose_diagnostics = on;
		}
		self
	}

	pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
		self.creation_timeout = timeout;
		self
	}

	pub fn with_deadlock_warning_after(mut self, after: Duration) -> Self {
		self.deadlock_warning_after = after;
		self
	}

	pub fn with_wait_poll_interval(mut self, interval: Duration) -> Self {
		self.wait_poll_interval = interval;
		self
	}

	pub fn with_verbose_diagnostics(mut self, on: bool) -> Self {
		self.verbose_diagnostics = on;
		self
	}

	pub fn with_decorate_once_per_shared_instance(mut self, on: bool) -> Self {
		self.decorate_once_per_shared_instance = on;
		self
	}

	/// Poll slice actually used by waiters; never zero.
	pub(crate) fn poll_slice(&self) -> Duration {
		self.wait_poll_interval.max(Duration::from_millis(1))
	}
}

fn parse_env<T, E: std::fmt::Display>(
	lookup: &impl Fn(&str) -> Option<String>,
	key: &str,
	parse: impl Fn(&str) -> Result<T, E>,
) -> Option<T> {
	let raw = lookup(key)?;
	match parse(raw.trim()) {
		Ok(value) => Some(value),
		Err(e) => {
			tracing::warn!("ignoring {key}={raw:?}: {e}");
			None
		}
	}
}

fn parse_flag(raw: &str) -> Result<bool, String> {
	match raw.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(format!("expected a boolean flag, got {other:?}")),
	}
}

fn millis<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
	u64::deserialize(de).map(Duration::from_millis)
}
