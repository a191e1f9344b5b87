use std::time::Duration;

use thiserror::Error;

use super::bean_type::{BeanType, join_path, join_types};
use super::thread::ThreadReport;

/// Error type returned by bean factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = BeanError> = std::result::Result<T, E>;

/// Errors raised by registration, resolution and instance production.
#[derive(Error, Debug)]
pub enum BeanError {
	/// Registration metadata violates an invariant; nothing was registered.
	#[error("invalid registration of {implementation}: {reason}")]
	InvalidRegistration {
		implementation: BeanType,
		reason: String,
	},

	#[error("no implementation found for {capability}{}", suggestion_hint(.suggestion))]
	NoImplementationFound {
		capability: BeanType,
		/// Closest registered capability name, if any is similar.
		suggestion: Option<&'static str>,
	},

	/// More than one candidate is left after resolution. Never resolved by guessing.
	#[error("ambiguous implementation for {capability}: [{}]", join_types(.candidates))]
	AmbiguousImplementation {
		capability: BeanType,
		candidates: Vec<BeanType>,
	},

	/// Re-entrant construction on one thread; `path` ends with the repeated type.
	#[error("circular dependency: {}", join_path(.path))]
	CircularDependency { path: Vec<BeanType> },

	#[error("creation of {implementation}{} failed: {reason}", capability_hint(.capability))]
	BeanCreationFailed {
		implementation: BeanType,
		/// Capability whose lookup triggered the creation, when known.
		capability: Option<BeanType>,
		reason: String,
		#[source]
		source: Option<BoxError>,
	},

	#[error(
		"timed out after {waited:?} waiting for {implementation} to be created by {creator} (waiting: {waiting})"
	)]
	BeanCreationTimeout {
		implementation: BeanType,
		waited: Duration,
		waiting: ThreadReport,
		creator: ThreadReport,
	},

	#[error("descriptor for {implementation} is disposed")]
	DescriptorDisposed { implementation: BeanType },

	/// The produced instance is not of the requested Rust type.
	#[error("instance of {implementation} is not a {expected}")]
	InstanceTypeMismatch {
		implementation: BeanType,
		expected: &'static str,
	},
}

impl BeanError {
	/// Errors that keep their identity when they bubble out of a nested construction.
	pub fn propagates_unwrapped(&self) -> bool {
		matches!(
			self,
			Self::CircularDependency { .. } | Self::BeanCreationTimeout { .. }
		)
	}

	/// Wraps a factory failure with the implementation being built.
	pub(crate) fn from_construction(implementation: BeanType, err: BoxError) -> Self {
		match err.downcast::<BeanError>() {
			Ok(inner) if inner.propagates_unwrapped() => *inner,
			Ok(inner) => Self::BeanCreationFailed {
				implementation,
				capability: None,
				reason: inner.to_string(),
				source: Some(inner as BoxError),
			},
			Err(other) => Self::BeanCreationFailed {
				implementation,
				capability: None,
				reason: other.to_string(),
				source: Some(other),
			},
		}
	}

	/// Fills in the looked-up capability on creation failures that lack one.
	pub(crate) fn with_capability(mut self, lookup: BeanType) -> Self {
		if let Self::BeanCreationFailed { capability, .. } = &mut self
			&& capability.is_none()
		{
			*capability = Some(lookup);
		}
		self
	}
}

fn suggestion_hint(suggestion: &Option<&'static str>) -> String {
	suggestion
		.map(|s| format!(" (did you mean `{s}`?)"))
		.unwrap_or_default()
}

fn capability_hint(capability: &Option<BeanType>) -> String {
	capability
		.map(|c| format!(" (looked up as {c})"))
		.unwrap_or_default()
}
