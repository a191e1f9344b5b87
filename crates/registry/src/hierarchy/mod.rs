//! Per-capability resolution with cached views.
//!
//! # Role
//!
//! A [`Hierarchy`] holds every live descriptor registered under one capability
//! and lazily computes its two ranked answers, the "all" view and the "single"
//! view, once per scope key.
//!
//! # Invariants
//!
//! - A hierarchy's descriptor set never changes. Registry mutations publish a
//!   fresh hierarchy for every capability they touch, so the view cache of the
//!   old one is discarded wholesale and readers never see a half-rebuilt view.
//! - Views are computed outside the cache lock. Two threads racing on a cold
//!   scope may both compute; the first insert wins and both results are equal.
//! - A view computed across a [`Hierarchy::clear_views`] is handed to its
//!   caller but never cached, so a cleared cache only refills with views
//!   built under the current evaluator rules.

mod resolve;

pub use resolve::effective_priority;

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{BeanType, ScopeKey};
use crate::descriptor::Descriptor;
use crate::registry::ScopeEvaluator;

/// Ranked answers for one capability and scope key.
#[derive(Debug, Clone)]
pub struct HierarchyViews {
	/// Every applicable descriptor, superseded ones removed, in rank order.
	pub all: Arc<[Arc<Descriptor>]>,
	/// Candidates for "the" implementation. More than one means ambiguity.
	pub single: Arc<[Arc<Descriptor>]>,
}

pub struct Hierarchy {
	capability: BeanType,
	/// Registration order.
	descriptors: Arc<[Arc<Descriptor>]>,
	views: RwLock<ViewCache>,
}

#[derive(Default)]
struct ViewCache {
	/// Bumped by every clear.
	generation: u64,
	entries: FxHashMap<Option<ScopeKey>, Arc<HierarchyViews>>,
}

impl Hierarchy {
	pub(crate) fn new(capability: BeanType, descriptors: Vec<Arc<Descriptor>>) -> Self {
		Self {
			capability,
			descriptors: Arc::from(descriptors),
			views: RwLock::new(ViewCache::default()),
		}
	}

	pub fn capability(&self) -> BeanType {
		self.capability
	}

	/// Registered descriptors in registration order, unranked.
	pub fn descriptors(&self) -> &[Arc<Descriptor>] {
		&self.descriptors
	}

	pub fn contains(&self, descriptor: &Arc<Descriptor>) -> bool {
		self.descriptors.iter().any(|d| Arc::ptr_eq(d, descriptor))
	}

	/// Copy with `descriptor` appended.
	pub(crate) fn with(&self, descriptor: Arc<Descriptor>) -> Self {
		let mut descriptors = self.descriptors.to_vec();
		descriptors.push(descriptor);
		Self::new(self.capability, descriptors)
	}

	/// Copy without `descriptor`, or `None` if nothing would remain.
	pub(crate) fn without(&self, descriptor: &Arc<Descriptor>) -> Option<Self> {
		let descriptors: Vec<_> = self
			.descriptors
			.iter()
			.filter(|d| !Arc::ptr_eq(d, descriptor))
			.cloned()
			.collect();
		(!descriptors.is_empty()).then(|| Self::new(self.capability, descriptors))
	}

	/// Cached views for `scope`, computing them on first use.
	pub fn views(
		&self,
		scope: Option<&ScopeKey>,
		evaluator: &dyn ScopeEvaluator,
	) -> Arc<HierarchyViews> {
		let key = scope.cloned();
		let generation = {
			let cache = self.views.read();
			if let Some(views) = cache.entries.get(&key) {
				return Arc::clone(views);
			}
			cache.generation
		};

		let mut candidates = self.descriptors.to_vec();
		evaluator.filter(scope, &mut candidates);
		let views = Arc::new(resolve::compute_views(self.capability, candidates));
		tracing::trace!(
			capability = %self.capability,
			scope = ?scope,
			all = views.all.len(),
			single = views.single.len(),
			"hierarchy views computed"
		);

		let mut cache = self.views.write();
		if cache.generation != generation {
			tracing::trace!(capability = %self.capability, "views cleared during computation; not caching");
			return views;
		}
		Arc::clone(cache.entries.entry(key).or_insert(views))
	}

	/// Drops every cached view; the next lookup recomputes.
	pub(crate) fn clear_views(&self) {
		let mut cache = self.views.write();
		cache.generation = cache.generation.wrapping_add(1);
		cache.entries.clear();
	}
}

impl std::fmt::Debug for Hierarchy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Hierarchy")
			.field("capability", &self.capability)
			.field("descriptors", &self.descriptors.len())
			.field("cached_scopes", &self.views.read().entries.len())
			.finish()
	}
}

#[cfg(test)]
mod tests;
