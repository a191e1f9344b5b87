//! Ranking and override resolution for one capability.
//!
//! 1. Rank by (effective priority ascending, implementation name ascending).
//! 2. Keep the first descriptor per implementation type.
//! 3. Map each concrete override target to its first-ranked replacement.
//! 4. "All": ranked list minus every superseded implementation.
//! 5. "Single": for a concrete capability, chase the override map to the most
//!    specific replacement and keep only that implementation; then keep the
//!    candidates tied at the lowest priority. Ties are not broken by name.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::HierarchyViews;
use crate::core::{BeanType, DEFAULT_PRIORITY};
use crate::descriptor::Descriptor;

struct Ranked {
	priority: f64,
	descriptor: Arc<Descriptor>,
}

/// Priority `descriptor` ranks with inside `set`.
///
/// An explicit priority always wins. Otherwise an override inherits the
/// effective priority of the first registered descriptor of its target type in
/// `set`, transitively; anything else ranks at [`DEFAULT_PRIORITY`].
pub fn effective_priority(descriptor: &Descriptor, set: &[Arc<Descriptor>]) -> f64 {
	let mut current = descriptor;
	let mut visited: Vec<BeanType> = Vec::new();
	loop {
		if let Some(priority) = current.declared_priority() {
			return priority;
		}
		let Some(target) = current.override_target() else {
			return DEFAULT_PRIORITY;
		};
		visited.push(current.implementation());
		if visited.contains(&target) {
			return DEFAULT_PRIORITY;
		}
		let Some(next) = set.iter().find(|d| d.implementation() == target) else {
			return DEFAULT_PRIORITY;
		};
		current = next;
	}
}

pub(super) fn compute_views(capability: BeanType, candidates: Vec<Arc<Descriptor>>) -> HierarchyViews {
	let mut ranked: Vec<Ranked> = candidates
		.iter()
		.map(|descriptor| Ranked {
			priority: effective_priority(descriptor, &candidates),
			descriptor: Arc::clone(descriptor),
		})
		.collect();
	ranked.sort_by(|a, b| {
		a.priority
			.total_cmp(&b.priority)
			.then_with(|| a.descriptor.implementation().cmp(&b.descriptor.implementation()))
	});

	let mut seen = FxHashSet::default();
	ranked.retain(|r| seen.insert(r.descriptor.implementation()));

	let mut overrides: FxHashMap<BeanType, BeanType> = FxHashMap::default();
	for r in &ranked {
		if let Some(target) = r.descriptor.override_target()
			&& target.is_concrete()
		{
			overrides.entry(target).or_insert(r.descriptor.implementation());
		}
	}

	let all: Vec<&Ranked> = ranked
		.iter()
		.filter(|r| !overrides.contains_key(&r.descriptor.implementation()))
		.collect();

	let mut single = all.clone();
	if capability.is_concrete() {
		let resolved = chase_overrides(capability, &overrides);
		if resolved != capability {
			let replaced: Vec<&Ranked> = single
				.iter()
				.copied()
				.filter(|r| r.descriptor.implementation() == resolved)
				.collect();
			if !replaced.is_empty() {
				single = replaced;
			}
		}
	}
	if let Some(lowest) = single.first().map(|r| r.priority) {
		single.retain(|r| r.priority.total_cmp(&lowest).is_eq());
	}

	HierarchyViews {
		all: all.iter().map(|r| Arc::clone(&r.descriptor)).collect(),
		single: single.iter().map(|r| Arc::clone(&r.descriptor)).collect(),
	}
}

/// Follows target -> replacement links from `start` to the last reachable type.
fn chase_overrides(start: BeanType, overrides: &FxHashMap<BeanType, BeanType>) -> BeanType {
	let mut resolved = start;
	let mut visited = vec![start];
	while let Some(&next) = overrides.get(&resolved) {
		if visited.contains(&next) {
			tracing::warn!(
				capability = %start,
				cycle_at = %next,
				"override cycle; stopping at {resolved}"
			);
			break;
		}
		visited.push(next);
		resolved = next;
	}
	resolved
}
