//! Registered implementation records.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;

use crate::core::{BeanError, BeanInstance, BeanRegistration, BeanScope, BeanType, Result};
use crate::producer::{InstanceProducer, PerRequestProducer, SharedProducer};
use crate::registry::Registry;

/// One registered implementation and its metadata.
///
/// Immutable after registration except for the terminal disposed flag, which
/// is set when the descriptor is unregistered.
pub struct Descriptor {
	implementation: BeanType,
	capabilities: Box<[BeanType]>,
	priority: Option<f64>,
	override_target: Option<BeanType>,
	scope: BeanScope,
	create_eagerly: bool,
	producer: Arc<dyn InstanceProducer>,
	/// Registration sequence number, unique per registry.
	ordinal: u64,
	disposed: AtomicBool,
	decorated: ArcSwapOption<Decorated>,
}

/// Decorated handle cached for one raw shared instance.
struct Decorated {
	raw: BeanInstance,
	decorated: BeanInstance,
}

impl Descriptor {
	/// Builds the descriptor for a registration, picking its producer from the scope.
	pub(crate) fn from_registration(registration: BeanRegistration, ordinal: u64) -> Result<Self> {
		registration.validate()?;
		let implementation = registration.implementation;
		let capabilities = registration.capability_set().into_boxed_slice();
		let producer: Arc<dyn InstanceProducer> = match (
			registration.producer,
			registration.preset_instance,
			registration.factory,
		) {
			(Some(custom), _, _) => custom,
			(None, Some(instance), _) => Arc::new(SharedProducer::with_instance(instance)),
			(None, None, Some(factory)) => match registration.scope {
				BeanScope::Shared => Arc::new(SharedProducer::new(factory)),
				BeanScope::PerRequest => Arc::new(PerRequestProducer::new(factory)),
			},
			(None, None, None) => {
				return Err(BeanError::InvalidRegistration {
					implementation,
					reason: "no instance source".to_string(),
				});
			}
		};

		Ok(Self {
			implementation,
			capabilities,
			priority: registration.priority,
			override_target: registration.override_target,
			scope: registration.scope,
			create_eagerly: registration.create_eagerly,
			producer,
			ordinal,
			disposed: AtomicBool::new(false),
			decorated: ArcSwapOption::empty(),
		})
	}

	pub fn implementation(&self) -> BeanType {
		self.implementation
	}

	/// Capability closure, implementation type first.
	pub fn capabilities(&self) -> &[BeanType] {
		&self.capabilities
	}

	pub fn implements(&self, capability: BeanType) -> bool {
		self.capabilities.contains(&capability)
	}

	/// Priority given at registration, before inheritance from an override target.
	pub fn declared_priority(&self) -> Option<f64> {
		self.priority
	}

	pub fn override_target(&self) -> Option<BeanType> {
		self.override_target
	}

	pub fn scope(&self) -> BeanScope {
		self.scope
	}

	pub fn create_eagerly(&self) -> bool {
		self.create_eagerly
	}

	pub fn ordinal(&self) -> u64 {
		self.ordinal
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	/// True if a shared instance is currently held.
	pub fn has_instance(&self) -> bool {
		self.producer.has_instance()
	}

	/// Produces an instance through this descriptor's producer, undecorated.
	pub fn produce(&self, registry: &Registry) -> Result<BeanInstance> {
		if self.is_disposed() {
			return Err(BeanError::DescriptorDisposed {
				implementation: self.implementation,
			});
		}
		self.producer.produce(registry, self)
	}

	/// Terminal: marks the descriptor disposed and releases held instances.
	/// Returns false if it was already disposed.
	pub(crate) fn dispose(&self) -> bool {
		if self.disposed.swap(true, Ordering::SeqCst) {
			return false;
		}
		self.producer.dispose();
		self.decorated.store(None);
		true
	}

	/// Returns the cached decoration of `raw`, computing and caching it on a miss.
	pub(crate) fn decorated_once(
		&self,
		raw: &BeanInstance,
		decorate: impl FnOnce() -> BeanInstance,
	) -> BeanInstance {
		let current = self.decorated.load_full();
		if let Some(cached) = &current
			&& BeanInstance::ptr_eq(&cached.raw, raw)
		{
			return cached.decorated.clone();
		}

		let fresh = Arc::new(Decorated {
			raw: raw.clone(),
			decorated: decorate(),
		});
		let previous = self
			.decorated
			.compare_and_swap(&current, Some(Arc::clone(&fresh)));
		let stored = match (&*previous, &current) {
			(Some(p), Some(c)) => Arc::ptr_eq(p, c),
			(None, None) => true,
			_ => false,
		};
		// A dispose racing the swap may have cleared the slot before we stored.
		if stored && self.disposed.load(Ordering::SeqCst) {
			self.decorated.store(None);
			return fresh.decorated.clone();
		}
		match (&*previous, &current) {
			// Lost to a concurrent decoration of the same instance: hand out the winner.
			(Some(winner), Some(seen))
				if !Arc::ptr_eq(winner, seen) && BeanInstance::ptr_eq(&winner.raw, raw) =>
			{
				winner.decorated.clone()
			}
			(Some(winner), None) if BeanInstance::ptr_eq(&winner.raw, raw) => winner.decorated.clone(),
			_ => fresh.decorated.clone(),
		}
	}
}

impl std::fmt::Debug for Descriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Descriptor")
			.field("implementation", &self.implementation)
			.field("capabilities", &self.capabilities)
			.field("priority", &self.priority)
			.field("override_target", &self.override_target)
			.field("scope", &self.scope)
			.field("ordinal", &self.ordinal)
			.field("disposed", &self.is_disposed())
			.finish_non_exhaustive()
	}
}
