use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;

use super::*;
use crate::core::{BeanRegistration, DEFAULT_PRIORITY};
use crate::registry::UnscopedEvaluator;

const T: BeanType = BeanType::interface("T");
const BASE: BeanType = BeanType::concrete("Base");
const A: BeanType = BeanType::concrete("A");
const B: BeanType = BeanType::concrete("B");
const C: BeanType = BeanType::concrete("C");

fn bean(implementation: BeanType) -> BeanRegistration {
	BeanRegistration::new(implementation)
		.capability(T)
		.construct_with(|| ())
}

fn descriptors(registrations: Vec<BeanRegistration>) -> Vec<Arc<Descriptor>> {
	registrations
		.into_iter()
		.enumerate()
		.map(|(i, r)| Arc::new(Descriptor::from_registration(r, i as u64).unwrap()))
		.collect()
}

fn names(list: &[Arc<Descriptor>]) -> Vec<&'static str> {
	list.iter().map(|d| d.implementation().name()).collect()
}

fn views_of(capability: BeanType, registrations: Vec<BeanRegistration>) -> HierarchyViews {
	resolve::compute_views(capability, descriptors(registrations))
}

#[test]
fn ranks_by_priority_then_name_and_keeps_single_ties() {
	let views = views_of(
		T,
		vec![
			bean(BeanType::concrete("X")).priority(10.0),
			bean(BeanType::concrete("Y")).priority(5.0),
			bean(BeanType::concrete("Z")).priority(5.0),
		],
	);
	assert_eq!(names(&views.all), ["Y", "Z", "X"]);
	assert_eq!(names(&views.single), ["Y", "Z"]);
}

#[test]
fn negative_priorities_rank_ahead_of_the_default() {
	let views = views_of(T, vec![bean(A), bean(B).priority(-1.5), bean(C).priority(3.0)]);
	assert_eq!(names(&views.all), ["B", "A", "C"]);
	assert_eq!(names(&views.single), ["B"]);
}

#[test]
fn override_supersedes_its_target_in_both_views() {
	let views = views_of(
		T,
		vec![bean(A), bean(B).capability(A).overrides(A)],
	);
	assert_eq!(names(&views.all), ["B"]);
	assert_eq!(names(&views.single), ["B"]);
}

#[test]
fn concrete_lookup_chases_override_chains() {
	let chain = || {
		vec![
			BeanRegistration::new(A).construct_with(|| ()),
			BeanRegistration::new(B).capability(A).overrides(A).construct_with(|| ()),
			BeanRegistration::new(C)
				.capabilities([A, B])
				.overrides(B)
				.priority(7.0)
				.construct_with(|| ()),
		]
	};
	let views = views_of(A, chain());
	assert_eq!(names(&views.all), ["C"]);
	assert_eq!(names(&views.single), ["C"]);
}

#[test]
fn single_view_of_a_concrete_type_filters_to_the_replacement() {
	// Sub extends Base without overriding it; Repl overrides Base.
	let sub = BeanType::concrete("Sub");
	let repl = BeanType::concrete("Repl");
	let views = views_of(
		BASE,
		vec![
			BeanRegistration::new(BASE).construct_with(|| ()),
			BeanRegistration::new(sub).capability(BASE).priority(-1.0).construct_with(|| ()),
			BeanRegistration::new(repl).capability(BASE).overrides(BASE).construct_with(|| ()),
		],
	);
	assert_eq!(names(&views.all), ["Sub", "Repl"]);
	assert_eq!(names(&views.single), ["Repl"]);
}

#[test]
fn subclasses_without_override_compete_for_single() {
	let sub = BeanType::concrete("Sub");
	let views = views_of(
		BASE,
		vec![
			BeanRegistration::new(BASE).construct_with(|| ()),
			BeanRegistration::new(sub).capability(BASE).construct_with(|| ()),
		],
	);
	assert_eq!(names(&views.all), ["Base", "Sub"]);
	assert_eq!(names(&views.single), ["Base", "Sub"]);
}

#[test]
fn overrides_inherit_the_target_priority() {
	let set = descriptors(vec![
		bean(A).priority(-5.0),
		bean(B).capability(A).overrides(A),
		bean(C).priority(-1.0),
	]);
	assert_eq!(effective_priority(&set[1], &set), -5.0);
	let views = resolve::compute_views(T, set);
	assert_eq!(names(&views.all), ["B", "C"]);
	assert_eq!(names(&views.single), ["B"]);
}

#[test]
fn explicit_priority_on_an_override_is_kept() {
	let set = descriptors(vec![bean(A).priority(-5.0), bean(B).capability(A).overrides(A).priority(2.0)]);
	assert_eq!(effective_priority(&set[1], &set), 2.0);
}

#[test]
fn override_cycles_fall_back_to_default_priority() {
	let set = descriptors(vec![
		bean(A).capability(B).overrides(B),
		bean(B).capability(A).overrides(A),
	]);
	assert_eq!(effective_priority(&set[0], &set), DEFAULT_PRIORITY);
	let views = resolve::compute_views(A, set);
	assert!(views.all.is_empty());
	assert!(views.single.is_empty());
}

#[test]
fn duplicate_implementations_are_collapsed() {
	let views = views_of(T, vec![bean(A), bean(A).priority(4.0), bean(B).priority(1.0)]);
	assert_eq!(names(&views.all), ["A", "B"]);
	assert_eq!(views.all[0].ordinal(), 0);
}

#[test]
fn interfaces_never_chase_overrides() {
	let views = views_of(
		T,
		vec![bean(A).priority(1.0), bean(B).capability(C).overrides(C).priority(2.0)],
	);
	assert_eq!(names(&views.single), ["A"]);
}

struct OnlyInScope(&'static str, BeanType);

impl ScopeEvaluator for OnlyInScope {
	fn filter(&self, scope: Option<&ScopeKey>, candidates: &mut Vec<Arc<Descriptor>>) {
		if scope.map(ScopeKey::as_str) != Some(self.0) {
			candidates.retain(|d| d.implementation() != self.1);
		}
	}
}

#[test]
fn views_are_cached_per_scope_key() {
	let hierarchy = Hierarchy::new(T, descriptors(vec![bean(A), bean(B).priority(-1.0)]));
	let evaluator = OnlyInScope("tenant-1", B);
	let tenant = ScopeKey::from("tenant-1");

	let unscoped = hierarchy.views(None, &evaluator);
	let scoped = hierarchy.views(Some(&tenant), &evaluator);
	assert_eq!(names(&unscoped.all), ["A"]);
	assert_eq!(names(&scoped.all), ["B", "A"]);

	assert!(Arc::ptr_eq(&scoped, &hierarchy.views(Some(&tenant), &evaluator)));
	hierarchy.clear_views();
	assert!(!Arc::ptr_eq(&scoped, &hierarchy.views(Some(&tenant), &evaluator)));
}

/// Hides `B` once `hide` is set; parks on `paused` during its first filter.
struct Switchable {
	hide: AtomicBool,
	armed: AtomicBool,
	paused: Barrier,
}

impl ScopeEvaluator for Switchable {
	fn filter(&self, _scope: Option<&ScopeKey>, candidates: &mut Vec<Arc<Descriptor>>) {
		let hide = self.hide.load(Ordering::SeqCst);
		if self.armed.swap(false, Ordering::SeqCst) {
			self.paused.wait();
			self.paused.wait();
		}
		if hide {
			candidates.retain(|d| d.implementation() != B);
		}
	}
}

#[test]
fn views_computed_across_a_clear_are_not_cached() {
	let hierarchy = Hierarchy::new(T, descriptors(vec![bean(A), bean(B)]));
	let evaluator = Switchable {
		hide: AtomicBool::new(false),
		armed: AtomicBool::new(true),
		paused: Barrier::new(2),
	};

	thread::scope(|scope| {
		let stale = scope.spawn(|| hierarchy.views(None, &evaluator));
		evaluator.paused.wait();
		evaluator.hide.store(true, Ordering::SeqCst);
		hierarchy.clear_views();
		evaluator.paused.wait();
		assert_eq!(names(&stale.join().unwrap().all), ["A", "B"]);
	});

	assert_eq!(names(&hierarchy.views(None, &evaluator).all), ["A"]);
}

#[test]
fn with_and_without_build_fresh_hierarchies() {
	let set = descriptors(vec![bean(A), bean(B)]);
	let first = Hierarchy::new(T, vec![Arc::clone(&set[0])]);
	let cached = first.views(None, &UnscopedEvaluator);
	assert_eq!(names(&cached.all), ["A"]);

	let both = first.with(Arc::clone(&set[1]));
	assert_eq!(names(&both.views(None, &UnscopedEvaluator).all), ["A", "B"]);
	assert!(both.contains(&set[1]));
	assert!(!first.contains(&set[1]));

	let only_b = both.without(&set[0]).unwrap();
	assert_eq!(names(only_b.descriptors()), ["B"]);
	assert!(only_b.without(&set[1]).is_none());
}
