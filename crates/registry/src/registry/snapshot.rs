//! Immutable registry state published through `ArcSwap`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::BeanType;
use crate::descriptor::Descriptor;
use crate::hierarchy::Hierarchy;

/// Single source of truth for lookups. Never mutated after publication.
#[derive(Default)]
pub(crate) struct Snapshot {
	pub(crate) hierarchies: FxHashMap<BeanType, Arc<Hierarchy>>,
	/// Every live descriptor in registration order.
	pub(crate) descriptors: Arc<[Arc<Descriptor>]>,
}

impl Snapshot {
	pub(crate) fn contains(&self, descriptor: &Arc<Descriptor>) -> bool {
		self.descriptors.iter().any(|d| Arc::ptr_eq(d, descriptor))
	}

	/// Copy with `descriptor` added under each of its capabilities.
	pub(crate) fn with_descriptor(&self, descriptor: &Arc<Descriptor>) -> Self {
		let mut hierarchies = self.hierarchies.clone();
		for &capability in descriptor.capabilities() {
			let next = match hierarchies.get(&capability) {
				Some(existing) => existing.with(Arc::clone(descriptor)),
				None => Hierarchy::new(capability, vec![Arc::clone(descriptor)]),
			};
			hierarchies.insert(capability, Arc::new(next));
		}

		let mut descriptors = self.descriptors.to_vec();
		descriptors.push(Arc::clone(descriptor));
		Self {
			hierarchies,
			descriptors: Arc::from(descriptors),
		}
	}

	/// Copy without `descriptor`, or `None` if it is not registered here.
	pub(crate) fn without_descriptor(&self, descriptor: &Arc<Descriptor>) -> Option<Self> {
		if !self.contains(descriptor) {
			return None;
		}

		let mut hierarchies = self.hierarchies.clone();
		for capability in descriptor.capabilities() {
			let Some(existing) = hierarchies.get(capability) else {
				continue;
			};
			match existing.without(descriptor) {
				Some(rest) => {
					hierarchies.insert(*capability, Arc::new(rest));
				}
				None => {
					hierarchies.remove(capability);
				}
			}
		}

		let descriptors: Vec<_> = self
			.descriptors
			.iter()
			.filter(|d| !Arc::ptr_eq(d, descriptor))
			.cloned()
			.collect();
		Some(Self {
			hierarchies,
			descriptors: Arc::from(descriptors),
		})
	}
}
