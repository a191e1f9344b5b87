use std::sync::Arc;

use super::{BeanFactory, InstanceProducer, construct_guarded};
use crate::core::{BeanInstance, Result};
use crate::descriptor::Descriptor;
use crate::registry::Registry;

/// Builds a fresh instance on every call.
pub struct PerRequestProducer {
	factory: Arc<dyn BeanFactory>,
}

impl PerRequestProducer {
	pub fn new(factory: Arc<dyn BeanFactory>) -> Self {
		Self { factory }
	}
}

impl InstanceProducer for PerRequestProducer {
	fn produce(&self, registry: &Registry, descriptor: &Descriptor) -> Result<BeanInstance> {
		construct_guarded(self.factory.as_ref(), registry, descriptor.implementation())
	}
}
