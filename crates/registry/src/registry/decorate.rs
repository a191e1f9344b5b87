use crate::core::{BeanInstance, BeanScope, RegistryConfig};
use crate::descriptor::Descriptor;

/// Wraps produced instances before lookups hand them out (proxies, metrics, ...).
pub trait BeanDecorator: Send + Sync {
	fn decorate(&self, descriptor: &Descriptor, instance: BeanInstance) -> BeanInstance;
}

impl<F> BeanDecorator for F
where
	F: Fn(&Descriptor, BeanInstance) -> BeanInstance + Send + Sync,
{
	fn decorate(&self, descriptor: &Descriptor, instance: BeanInstance) -> BeanInstance {
		self(descriptor, instance)
	}
}

pub(super) fn apply(
	decorator: &dyn BeanDecorator,
	config: &RegistryConfig,
	descriptor: &Descriptor,
	instance: BeanInstance,
) -> BeanInstance {
	if config.decorate_once_per_shared_instance && descriptor.scope() == BeanScope::Shared {
		descriptor.decorated_once(&instance, || decorator.decorate(descriptor, instance.clone()))
	} else {
		decorator.decorate(descriptor, instance)
	}
}
