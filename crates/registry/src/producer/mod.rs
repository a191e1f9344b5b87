//! Instance production policies.
//!
//! A [`Descriptor`] owns exactly one [`InstanceProducer`], chosen from its
//! [`BeanScope`](crate::core::BeanScope) at registration unless a custom
//! producer was supplied:
//!
//! | Producer | Policy |
//! |----------|--------|
//! | [`PerRequestProducer`] | New instance on every call. |
//! | [`SharedProducer`] | Created at most once, then shared lock-free. |
//!
//! Every call into a [`BeanFactory`] goes through [`construct_guarded`], so
//! same-thread re-entry fails fast with a circular-dependency error.

mod per_request;
mod shared;

pub use per_request::PerRequestProducer;
pub use shared::SharedProducer;

use crate::core::{BeanError, BeanInstance, BeanType, BoxError, Result};
use crate::descriptor::Descriptor;
use crate::guard::CreationGuard;
use crate::registry::Registry;

/// Construction collaborator: builds one instance of an implementation.
///
/// Nested lookups go through `registry`; their errors convert into
/// [`BoxError`] with `?` and keep their identity where that matters
/// (see [`BeanError::propagates_unwrapped`]).
pub trait BeanFactory: Send + Sync {
	fn construct(&self, registry: &Registry) -> std::result::Result<BeanInstance, BoxError>;
}

impl<F> BeanFactory for F
where
	F: Fn(&Registry) -> std::result::Result<BeanInstance, BoxError> + Send + Sync,
{
	fn construct(&self, registry: &Registry) -> std::result::Result<BeanInstance, BoxError> {
		self(registry)
	}
}

/// Creation policy attached to a descriptor.
pub trait InstanceProducer: Send + Sync {
	fn produce(&self, registry: &Registry, descriptor: &Descriptor) -> Result<BeanInstance>;

	/// True if a shared instance is currently stored.
	fn has_instance(&self) -> bool {
		false
	}

	/// Drops any stored instance and wakes waiters. Called once on unregistration.
	fn dispose(&self) {}
}

/// Runs `factory` for `implementation` inside a [`CreationGuard`].
pub fn construct_guarded(
	factory: &dyn BeanFactory,
	registry: &Registry,
	implementation: BeanType,
) -> Result<BeanInstance> {
	let _guard = CreationGuard::enter(implementation)?;
	factory
		.construct(registry)
		.map_err(|e| BeanError::from_construction(implementation, e))
}
