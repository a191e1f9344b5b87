//! Invariant proofs against the public registry API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use proptest::prelude::*;

use crate::core::{BeanError, BeanInstance, BeanRegistration, BeanType};
use crate::registry::Registry;

const T: BeanType = BeanType::interface("T");

const NAMES: [&str; 12] = [
	"n00", "n01", "n02", "n03", "n04", "n05", "n06", "n07", "n08", "n09", "n10", "n11",
];

fn bean(name: &'static str, priority: f64) -> BeanRegistration {
	BeanRegistration::new(BeanType::concrete(name))
		.capability(T)
		.priority(priority)
		.construct_with(move || name)
}

fn implementations(registry: &Registry, capability: BeanType) -> Vec<&'static str> {
	registry
		.resolve_all(capability, None)
		.iter()
		.map(|d| d.implementation().name())
		.collect()
}

/// Invariant: the "all" view is ordered by (priority, implementation name)
/// regardless of registration order.
pub(crate) fn inv_rank_order(priorities: &[i16]) {
	let registry = Registry::new();
	for (i, &priority) in priorities.iter().enumerate().rev() {
		registry.register(bean(NAMES[i], f64::from(priority))).unwrap();
	}

	let mut expected: Vec<(i16, &str)> = priorities
		.iter()
		.enumerate()
		.map(|(i, &p)| (p, NAMES[i]))
		.collect();
	expected.sort();
	let expected: Vec<&str> = expected.into_iter().map(|(_, name)| name).collect();

	assert_eq!(implementations(&registry, T), expected);
	let instances: Vec<&str> = registry
		.lookup_all(T, None)
		.unwrap()
		.iter()
		.map(|i| *i.downcast_ref::<&'static str>().unwrap())
		.collect();
	assert_eq!(instances, expected);
}

/// Invariant: an override of a concrete type hides the target from every view
/// and answers single lookups of the target and its ancestors.
pub(crate) fn inv_override_replaces_target() {
	let base = BeanType::abstract_type("Base");
	let a = BeanType::concrete("A");
	let b = BeanType::concrete("B");
	let registry = Registry::new();
	registry
		.register(BeanRegistration::new(a).capabilities([base, T]).construct_with(|| "A"))
		.unwrap();
	registry
		.register(
			BeanRegistration::new(b)
				.capabilities([a, base, T])
				.overrides(a)
				.construct_with(|| "B"),
		)
		.unwrap();

	for capability in [a, base, T] {
		assert_eq!(implementations(&registry, capability), ["B"]);
		assert_eq!(registry.resolve_single(capability, None).unwrap().implementation(), b);
	}
}

/// Invariant: equal lowest priorities without an override relation are ambiguous.
pub(crate) fn inv_ties_are_ambiguous() {
	let registry = Registry::new();
	registry.register(bean("P", 1.0)).unwrap();
	registry.register(bean("Q", 1.0)).unwrap();
	registry.register(bean("R", 2.0)).unwrap();

	match registry.lookup_single(T, None) {
		Err(BeanError::AmbiguousImplementation { candidates, .. }) => {
			assert_eq!(candidates, [BeanType::concrete("P"), BeanType::concrete("Q")]);
		}
		other => panic!("expected ambiguity, got {other:?}"),
	}
}

/// Invariant: N concurrent first lookups of a shared bean run its factory once.
pub(crate) fn inv_single_construction(threads: usize) {
	let registry = Registry::new();
	let calls = Arc::new(AtomicUsize::new(0));
	registry
		.register(BeanRegistration::new(BeanType::concrete("S")).capability(T).shared().factory({
			let calls = Arc::clone(&calls);
			move |_| {
				calls.fetch_add(1, Ordering::SeqCst);
				thread::sleep(Duration::from_millis(10));
				Ok(BeanInstance::new(()))
			}
		}))
		.unwrap();

	let barrier = Barrier::new(threads);
	thread::scope(|scope| {
		for _ in 0..threads {
			scope.spawn(|| {
				barrier.wait();
				registry.lookup_single(T, None).unwrap();
			});
		}
	});
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Invariant: same-thread re-entry fails with the full path and never blocks.
pub(crate) fn inv_cycles_fail_fast() {
	let a = BeanType::concrete("A");
	let b = BeanType::concrete("B");
	let registry = Registry::new();
	registry
		.register(BeanRegistration::new(a).shared().factory(move |r: &Registry| {
			r.lookup_single(b, None)?;
			Ok(BeanInstance::new(()))
		}))
		.unwrap();
	registry
		.register(BeanRegistration::new(b).factory(move |r: &Registry| {
			r.lookup_single(a, None)?;
			Ok(BeanInstance::new(()))
		}))
		.unwrap();

	match registry.lookup_single(a, None) {
		Err(BeanError::CircularDependency { path }) => assert_eq!(path, [a, b, a]),
		other => panic!("expected a cycle, got {other:?}"),
	}
	assert!(crate::guard::is_released());
}

/// Invariant: a failing shared factory leaves the slot empty; the next call retries.
pub(crate) fn inv_failure_not_cached() {
	let registry = Registry::new();
	let calls = Arc::new(AtomicUsize::new(0));
	let descriptor = registry
		.register(BeanRegistration::new(BeanType::concrete("F")).shared().factory({
			let calls = Arc::clone(&calls);
			move |_| match calls.fetch_add(1, Ordering::SeqCst) {
				0 => Err("transient".into()),
				_ => Ok(BeanInstance::new(())),
			}
		}))
		.unwrap();

	assert!(descriptor.produce(&registry).is_err());
	assert!(!descriptor.has_instance());
	assert!(descriptor.produce(&registry).is_ok());
	assert!(descriptor.has_instance());
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Invariant: after unregistration a descriptor is absent from lookups and
/// direct production fails with `DescriptorDisposed`.
pub(crate) fn inv_unregister_disposes() {
	let registry = Registry::new();
	let keep = registry.register(bean("K", 0.0).shared()).unwrap();
	let gone = registry.register(bean("G", -1.0).shared()).unwrap();
	gone.produce(&registry).unwrap();

	assert!(registry.unregister(&gone));
	assert_eq!(implementations(&registry, T), ["K"]);
	assert_eq!(registry.resolve_single(T, None).unwrap().implementation(), keep.implementation());
	assert!(matches!(
		gone.produce(&registry),
		Err(BeanError::DescriptorDisposed { .. })
	));
}

/// Invariant: concurrent registrations all land, and every published
/// descriptor is reachable through each of its capabilities.
pub(crate) fn inv_no_partial_registration(writers: usize, per_writer: usize) {
	let registry = Registry::new();
	let barrier = Barrier::new(writers + 1);
	let done = AtomicUsize::new(0);

	thread::scope(|scope| {
		for w in 0..writers {
			let (registry, barrier, done) = (&registry, &barrier, &done);
			scope.spawn(move || {
				barrier.wait();
				for i in 0..per_writer {
					let name = NAMES[(w * per_writer + i) % NAMES.len()];
					registry.register(bean(name, (w * per_writer + i) as f64)).unwrap();
				}
				done.fetch_add(1, Ordering::SeqCst);
			});
		}

		barrier.wait();
		while done.load(Ordering::SeqCst) < writers {
			for descriptor in registry.registered_descriptors() {
				for &capability in descriptor.capabilities() {
					assert!(
						registry
							.list_descriptors(capability)
							.iter()
							.any(|d| Arc::ptr_eq(d, &descriptor)),
						"{descriptor:?} missing under {capability}"
					);
				}
			}
		}
	});

	assert_eq!(registry.len(), writers * per_writer);
	assert_eq!(registry.list_descriptors(T).len(), writers * per_writer);
}

/// Invariant: X(10), Y(5), Z(5) with Z named before Y rank [Z, Y, X] and
/// leave [Z, Y] tied for the single answer.
pub(crate) fn inv_reference_scenario() {
	let x = "c.X";
	let y = "b.Y";
	let z = "a.Z";
	let registry = Registry::new();
	registry.register(bean(x, 10.0)).unwrap();
	registry.register(bean(y, 5.0)).unwrap();
	registry.register(bean(z, 5.0)).unwrap();

	assert_eq!(implementations(&registry, T), [z, y, x]);
	match registry.lookup_single(T, None) {
		Err(BeanError::AmbiguousImplementation { candidates, .. }) => {
			assert_eq!(candidates, [BeanType::concrete(z), BeanType::concrete(y)]);
		}
		other => panic!("expected ambiguity, got {other:?}"),
	}
}

proptest! {
	#[test]
	fn test_rank_order(priorities in prop::collection::vec(-50i16..50, 1..NAMES.len())) {
		inv_rank_order(&priorities);
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_override_replaces_target() {
	inv_override_replaces_target();
}

#[cfg_attr(test, test)]
pub(crate) fn test_ties_are_ambiguous() {
	inv_ties_are_ambiguous();
}

#[cfg_attr(test, test)]
pub(crate) fn test_single_construction() {
	inv_single_construction(24);
}

#[cfg_attr(test, test)]
pub(crate) fn test_cycles_fail_fast() {
	inv_cycles_fail_fast();
}

#[cfg_attr(test, test)]
pub(crate) fn test_failure_not_cached() {
	inv_failure_not_cached();
}

#[cfg_attr(test, test)]
pub(crate) fn test_unregister_disposes() {
	inv_unregister_disposes();
}

#[cfg_attr(test, test)]
pub(crate) fn test_no_partial_registration() {
	inv_no_partial_registration(4, 3);
}

#[cfg_attr(test, test)]
pub(crate) fn test_reference_scenario() {
	inv_reference_scenario();
}
