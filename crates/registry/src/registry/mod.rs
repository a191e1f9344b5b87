//! Top-level bean registry.
//!
//! # Role
//!
//! [`Registry`] maps capability types to [`Hierarchy`] resolvers and drives
//! instance production for lookups. State lives in one immutable [`Snapshot`]
//! published through `ArcSwap`, as in a copy-on-write index.
//!
//! # Invariants
//!
//! - Mutations build a whole new snapshot and publish it with compare-and-swap,
//!   retrying on contention. Readers never observe a partial registration
//!   (see `invariants::test_no_partial_registration`).
//! - A descriptor is disposed exactly once, after the snapshot without it has
//!   been published.
//! - Resolution failures are always surfaced. Nothing is picked by guessing.

mod decorate;
#[cfg(feature = "discovery")]
mod discovery;
mod invariants;
mod scope;
mod snapshot;

pub use decorate::BeanDecorator;
#[cfg(feature = "discovery")]
pub use discovery::BeanDeclaration;
pub use scope::{ScopeEvaluator, UnscopedEvaluator};
pub(crate) use snapshot::Snapshot;

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;

use crate::core::bean_type::join_types;
use crate::core::{
	BeanError, BeanInstance, BeanRegistration, BeanType, RegistryConfig, Result, ScopeKey,
};
use crate::descriptor::Descriptor;
use crate::hierarchy::Hierarchy;

/// Capability-name distance up to which "did you mean" suggestions are offered.
const SUGGESTION_DISTANCE: usize = 3;

/// Runtime registry of beans.
///
/// Independent instances are cheap to build; [`Registry::global`] is only a
/// convenience default.
pub struct Registry {
	config: RegistryConfig,
	snap: ArcSwap<Snapshot>,
	evaluator: Arc<dyn ScopeEvaluator>,
	decorator: Option<Arc<dyn BeanDecorator>>,
	next_ordinal: AtomicU64,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl Registry {
	pub fn new() -> Self {
		Self::with_config(RegistryConfig::default())
	}

	pub fn with_config(config: RegistryConfig) -> Self {
		Self {
			config,
			snap: ArcSwap::from_pointee(Snapshot::default()),
			evaluator: Arc::new(UnscopedEvaluator),
			decorator: None,
			next_ordinal: AtomicU64::new(0),
		}
	}

	pub fn with_scope_evaluator(mut self, evaluator: impl ScopeEvaluator + 'static) -> Self {
		self.evaluator = Arc::new(evaluator);
		self
	}

	pub fn with_decorator(mut self, decorator: impl BeanDecorator + 'static) -> Self {
		self.decorator = Some(Arc::new(decorator));
		self
	}

	/// Process-wide registry configured from the environment on first use.
	pub fn global() -> &'static Registry {
		static GLOBAL: LazyLock<Registry> =
			LazyLock::new(|| Registry::with_config(RegistryConfig::from_env()));
		&GLOBAL
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	/// Validates and registers a bean under every capability it declares.
	pub fn register(&self, registration: BeanRegistration) -> Result<Arc<Descriptor>> {
		let ordinal = self.next_ordinal.fetch_add(1, Ordering::Relaxed);
		let descriptor = Arc::new(Descriptor::from_registration(registration, ordinal)?);
		self.publish(|snap| Some(snap.with_descriptor(&descriptor)));
		tracing::trace!(
			bean = %descriptor.implementation(),
			capabilities = %join_types(descriptor.capabilities()),
			scope = %descriptor.scope(),
			ordinal,
			"registered"
		);
		Ok(descriptor)
	}

	/// Registers an already built shared instance.
	pub fn register_instance(
		&self,
		implementation: BeanType,
		capabilities: impl IntoIterator<Item = BeanType>,
		instance: BeanInstance,
	) -> Result<Arc<Descriptor>> {
		self.register(
			BeanRegistration::new(implementation)
				.capabilities(capabilities)
				.shared()
				.instance(instance),
		)
	}

	/// Removes `descriptor` and disposes it. Returns false if it was not registered.
	///
	/// Instances already handed out stay valid.
	pub fn unregister(&self, descriptor: &Arc<Descriptor>) -> bool {
		if !self.publish(|snap| snap.without_descriptor(descriptor)) {
			return false;
		}
		descriptor.dispose();
		tracing::trace!(bean = %descriptor.implementation(), ordinal = descriptor.ordinal(), "unregistered");
		true
	}

	/// Unregisters every descriptor of `implementation`; returns how many were removed.
	pub fn unregister_type(&self, implementation: BeanType) -> usize {
		let snap = self.snap.load_full();
		snap.descriptors
			.iter()
			.filter(|d| d.implementation() == implementation)
			.filter(|d| self.unregister(d))
			.count()
	}

	/// The descriptor that answers `capability`.
	pub fn resolve_single(
		&self,
		capability: BeanType,
		scope: Option<&ScopeKey>,
	) -> Result<Arc<Descriptor>> {
		let Some(hierarchy) = self.hierarchy(capability) else {
			return Err(self.not_found(capability));
		};
		let views = hierarchy.views(scope, self.evaluator.as_ref());
		match &*views.single {
			[] => Err(BeanError::NoImplementationFound {
				capability,
				suggestion: None,
			}),
			[only] => Ok(Arc::clone(only)),
			tied => Err(BeanError::AmbiguousImplementation {
				capability,
				candidates: tied.iter().map(|d| d.implementation()).collect(),
			}),
		}
	}

	/// Every applicable descriptor for `capability`, in rank order.
	pub fn resolve_all(&self, capability: BeanType, scope: Option<&ScopeKey>) -> Vec<Arc<Descriptor>> {
		self.hierarchy(capability)
			.map(|h| h.views(scope, self.evaluator.as_ref()).all.to_vec())
			.unwrap_or_default()
	}

	pub fn lookup_single(&self, capability: BeanType, scope: Option<&ScopeKey>) -> Result<BeanInstance> {
		let descriptor = self.resolve_single(capability, scope)?;
		self.instantiate(&descriptor, capability)
	}

	/// Like [`Registry::lookup_single`], but no match is `Ok(None)`. Ambiguity is still an error.
	pub fn lookup_optional(
		&self,
		capability: BeanType,
		scope: Option<&ScopeKey>,
	) -> Result<Option<BeanInstance>> {
		match self.resolve_single(capability, scope) {
			Ok(descriptor) => self.instantiate(&descriptor, capability).map(Some),
			Err(BeanError::NoImplementationFound { .. }) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Instances of every applicable descriptor, in rank order.
	///
	/// Descriptors unregistered while the lookup runs are skipped.
	pub fn lookup_all(&self, capability: BeanType, scope: Option<&ScopeKey>) -> Result<Vec<BeanInstance>> {
		let descriptors = self.resolve_all(capability, scope);
		let mut instances = Vec::with_capacity(descriptors.len());
		for descriptor in &descriptors {
			match self.instantiate(descriptor, capability) {
				Ok(instance) => instances.push(instance),
				Err(BeanError::DescriptorDisposed { implementation })
					if implementation == descriptor.implementation() =>
				{
					tracing::trace!(bean = %implementation, "skipping descriptor disposed during lookup");
				}
				Err(e) => return Err(e),
			}
		}
		Ok(instances)
	}

	/// Typed [`Registry::lookup_single`].
	pub fn get<T: Any + Send + Sync>(
		&self,
		capability: BeanType,
		scope: Option<&ScopeKey>,
	) -> Result<Arc<T>> {
		let descriptor = self.resolve_single(capability, scope)?;
		let instance = self.instantiate(&descriptor, capability)?;
		instance
			.downcast::<T>()
			.ok_or_else(|| BeanError::InstanceTypeMismatch {
				implementation: descriptor.implementation(),
				expected: std::any::type_name::<T>(),
			})
	}

	/// Descriptors registered under `capability`, in registration order. Nothing is instantiated.
	pub fn list_descriptors(&self, capability: BeanType) -> Vec<Arc<Descriptor>> {
		self.hierarchy(capability)
			.map(|h| h.descriptors().to_vec())
			.unwrap_or_default()
	}

	/// Every live descriptor, in registration order.
	pub fn registered_descriptors(&self) -> Vec<Arc<Descriptor>> {
		self.snap.load().descriptors.to_vec()
	}

	pub fn len(&self) -> usize {
		self.snap.load().descriptors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Instantiates every live shared descriptor marked for eager creation.
	///
	/// Stops at the first failure. Returns the number of beans produced.
	pub fn create_eager_beans(&self) -> Result<usize> {
		let snap = self.snap.load_full();
		let mut created = 0;
		for descriptor in snap.descriptors.iter().filter(|d| d.create_eagerly()) {
			if let Err(err) = descriptor.produce(self) {
				tracing::error!(bean = %descriptor.implementation(), error = %err, "eager creation failed");
				return Err(err);
			}
			created += 1;
		}
		tracing::debug!(created, "eager beans created");
		Ok(created)
	}

	/// Drops every cached view, e.g. after the scope evaluator's rules changed.
	pub fn invalidate_views(&self) {
		for hierarchy in self.snap.load().hierarchies.values() {
			hierarchy.clear_views();
		}
	}

	fn hierarchy(&self, capability: BeanType) -> Option<Arc<Hierarchy>> {
		self.snap.load().hierarchies.get(&capability).cloned()
	}

	fn instantiate(&self, descriptor: &Descriptor, capability: BeanType) -> Result<BeanInstance> {
		let instance = descriptor
			.produce(self)
			.map_err(|e| e.with_capability(capability))?;
		Ok(match &self.decorator {
			Some(decorator) => decorate::apply(decorator.as_ref(), &self.config, descriptor, instance),
			None => instance,
		})
	}

	fn not_found(&self, capability: BeanType) -> BeanError {
		let snap = self.snap.load();
		let wanted = capability.name();
		let suggestion = snap
			.hierarchies
			.keys()
			.map(|t| t.name())
			.filter(|name| *name != wanted)
			.map(|name| (strsim::levenshtein(wanted, name), name))
			.min()
			.filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
			.map(|(_, name)| name);
		BeanError::NoImplementationFound {
			capability,
			suggestion,
		}
	}

	/// Publishes `update(current)` with compare-and-swap, retrying on contention.
	/// Returns false without publishing if `update` yields `None`.
	fn publish(&self, update: impl Fn(&Snapshot) -> Option<Snapshot>) -> bool {
		loop {
			let old = self.snap.load_full();
			let Some(next) = update(&old) else {
				return false;
			};
			let prev = self.snap.compare_and_swap(&old, Arc::new(next));
			if Arc::ptr_eq(&prev, &old) {
				return true;
			}
		}
	}
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let snap = self.snap.load();
		f.debug_struct("Registry")
			.field("descriptors", &snap.descriptors.len())
			.field("capabilities", &snap.hierarchies.len())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
