use std::any::Any;
use std::sync::Arc;

use super::bean_type::BeanType;
use super::error::{BeanError, BoxError, Result};
use super::instance::BeanInstance;
use crate::producer::{BeanFactory, InstanceProducer};
use crate::registry::Registry;

/// Priority applied when none is declared or inherited.
pub const DEFAULT_PRIORITY: f64 = 0.0;

/// Instance lifetime of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BeanScope {
	/// A new instance for every lookup.
	#[default]
	PerRequest,
	/// Created at most once and shared until the descriptor is disposed.
	Shared,
}

impl std::fmt::Display for BeanScope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::PerRequest => f.write_str("per-request"),
			Self::Shared => f.write_str("shared"),
		}
	}
}

/// Opaque discriminator for context-dependent visibility (e.g. a session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(Arc<str>);

impl ScopeKey {
	pub fn new(key: impl Into<Arc<str>>) -> Self {
		Self(key.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ScopeKey {
	fn from(key: &str) -> Self {
		Self::new(key)
	}
}

impl From<String> for ScopeKey {
	fn from(key: String) -> Self {
		Self::new(key)
	}
}

impl std::fmt::Display for ScopeKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// Registration metadata, validated by [`Registry::register`].
///
/// ```rust,ignore
/// registry.register(
///     BeanRegistration::new(BeanType::concrete("app::PgStore"))
///         .capability(BeanType::interface("app::Store"))
///         .priority(-10.0)
///         .shared()
///         .factory(|_| Ok(BeanInstance::new(PgStore::connect()?))),
/// )?;
/// ```
#[derive(Clone)]
pub struct BeanRegistration {
	pub(crate) implementation: BeanType,
	pub(crate) capabilities: Vec<BeanType>,
	pub(crate) priority: Option<f64>,
	pub(crate) override_target: Option<BeanType>,
	pub(crate) scope: BeanScope,
	pub(crate) preset_instance: Option<BeanInstance>,
	pub(crate) factory: Option<Arc<dyn BeanFactory>>,
	pub(crate) producer: Option<Arc<dyn InstanceProducer>>,
	pub(crate) create_eagerly: bool,
}

impl BeanRegistration {
	pub fn new(implementation: BeanType) -> Self {
		Self {
			implementation,
			capabilities: Vec::new(),
			priority: None,
			override_target: None,
			scope: BeanScope::default(),
			preset_instance: None,
			factory: None,
			producer: None,
			create_eagerly: false,
		}
	}

	/// Registration for the concrete Rust type `T`.
	pub fn of<T: Any + Send + Sync>() -> Self {
		Self::new(BeanType::of::<T>())
	}

	pub fn capability(mut self, capability: BeanType) -> Self {
		self.capabilities.push(capability);
		self
	}

	pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = BeanType>) -> Self {
		self.capabilities.extend(capabilities);
		self
	}

	/// Lower values sort first.
	pub fn priority(mut self, priority: f64) -> Self {
		self.priority = Some(priority);
		self
	}

	/// Supersedes the concrete ancestor `target`, which must be one of the capabilities.
	pub fn overrides(mut self, target: BeanType) -> Self {
		self.override_target = Some(target);
		self
	}

	pub fn scope(mut self, scope: BeanScope) -> Self {
		self.scope = scope;
		self
	}

	pub fn shared(self) -> Self {
		self.scope(BeanScope::Shared)
	}

	/// Pre-built instance; only legal for shared descriptors.
	pub fn instance(mut self, instance: BeanInstance) -> Self {
		self.preset_instance = Some(instance);
		self
	}

	pub fn factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&Registry) -> std::result::Result<BeanInstance, BoxError> + Send + Sync + 'static,
	{
		self.factory = Some(Arc::new(factory));
		self
	}

	/// Factory that cannot fail and needs no registry access.
	pub fn construct_with<T, F>(self, make: F) -> Self
	where
		T: Any + Send + Sync,
		F: Fn() -> T + Send + Sync + 'static,
	{
		self.factory(move |_| Ok(BeanInstance::new(make())))
	}

	pub fn factory_arc(mut self, factory: Arc<dyn BeanFactory>) -> Self {
		self.factory = Some(factory);
		self
	}

	/// Replaces the scope-selected producer entirely.
	pub fn producer(mut self, producer: Arc<dyn InstanceProducer>) -> Self {
		self.producer = Some(producer);
		self
	}

	/// Instantiate during [`Registry::create_eager_beans`]; shared scope only.
	pub fn create_eagerly(mut self) -> Self {
		self.create_eagerly = true;
		self
	}

	pub fn implementation(&self) -> BeanType {
		self.implementation
	}

	/// Capability closure: the implementation first, then declared capabilities, deduplicated.
	pub(crate) fn capability_set(&self) -> Vec<BeanType> {
		let mut set = Vec::with_capacity(self.capabilities.len() + 1);
		set.push(self.implementation);
		for &cap in &self.capabilities {
			if !set.contains(&cap) {
				set.push(cap);
			}
		}
		set
	}

	pub(crate) fn validate(&self) -> Result<()> {
		let invalid = |reason: &str| {
			Err(BeanError::InvalidRegistration {
				implementation: self.implementation,
				reason: reason.to_string(),
			})
		};

		if !self.implementation.is_concrete() {
			return invalid("implementation type must be concrete");
		}
		if self.preset_instance.is_some() && self.scope != BeanScope::Shared {
			return invalid("a preset instance requires shared scope");
		}
		if self.create_eagerly && self.scope != BeanScope::Shared {
			return invalid("eager creation requires shared scope");
		}
		let sources = [
			self.preset_instance.is_some(),
			self.factory.is_some(),
			self.producer.is_some(),
		]
		.into_iter()
		.filter(|&set| set)
		.count();
		if sources != 1 {
			return invalid("exactly one of instance, factory or producer must be given");
		}
		if let Some(priority) = self.priority
			&& !priority.is_finite()
		{
			return invalid("priority must be finite");
		}
		if let Some(target) = self.override_target {
			if target == self.implementation {
				return invalid("a bean cannot override itself");
			}
			if !target.is_concrete() {
				return invalid("override target must be a concrete type");
			}
			if !self.capabilities.contains(&target) {
				return invalid("override target must be one of the declared capabilities");
			}
		}
		Ok(())
	}
}

impl std::fmt::Debug for BeanRegistration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BeanRegistration")
			.field("implementation", &self.implementation)
			.field("capabilities", &self.capabilities)
			.field("priority", &self.priority)
			.field("override_target", &self.override_target)
			.field("scope", &self.scope)
			.field("preset_instance", &self.preset_instance.is_some())
			.field("factory", &self.factory.is_some())
			.field("producer", &self.producer.is_some())
			.field("create_eagerly", &self.create_eagerly)
			.finish()
	}
}
