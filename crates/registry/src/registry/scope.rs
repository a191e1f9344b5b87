use std::sync::Arc;

use crate::core::ScopeKey;
use crate::descriptor::Descriptor;

/// Decides which descriptors are visible for a scope key.
///
/// Runs before ranking. Results are cached per key until the capability's
/// descriptor set changes or [`Registry::invalidate_views`] is called, so
/// `filter` must give the same answer for the same key.
///
/// [`Registry::invalidate_views`]: super::Registry::invalidate_views
pub trait ScopeEvaluator: Send + Sync {
	fn filter(&self, scope: Option<&ScopeKey>, candidates: &mut Vec<Arc<Descriptor>>);
}

/// Every descriptor is visible under every key.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnscopedEvaluator;

impl ScopeEvaluator for UnscopedEvaluator {
	fn filter(&self, _scope: Option<&ScopeKey>, _candidates: &mut Vec<Arc<Descriptor>>) {}
}
