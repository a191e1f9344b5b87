//! Create-once producer for shared beans.
//!
//! # Protocol
//!
//! 1. **Fast path:** a stored instance is returned without taking any lock.
//! 2. **Election:** the caller tries to move the creator marker from
//!    [`NO_THREAD`] to its own thread id with a compare-and-set.
//! 3. **Winner:** re-checks the slot, constructs under the creation guard and
//!    stores the result on success. The marker is cleared and all waiters are
//!    notified on every exit path, so failures are never cached.
//! 4. **Losers:** wait on the condition variable in poll slices bounded by
//!    [`RegistryConfig::creation_timeout`]. With verbose diagnostics a
//!    potential-deadlock warning carrying both thread reports is logged once
//!    after [`RegistryConfig::deadlock_warning_after`].
//!
//! A hung creator is never interrupted; only its waiters time out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{BeanFactory, InstanceProducer, construct_guarded};
use crate::core::thread::NO_THREAD;
use crate::core::{
	BeanError, BeanInstance, RegistryConfig, Result, ThreadReport, current_thread_id,
};
use crate::descriptor::Descriptor;
use crate::guard;
use crate::registry::Registry;

/// Produces one instance per descriptor and shares it until disposal.
pub struct SharedProducer {
	factory: Option<Arc<dyn BeanFactory>>,
	instance: ArcSwapOption<BeanInstance>,
	/// Id of the thread currently constructing, or [`NO_THREAD`].
	creator: AtomicU64,
	/// Creator's report while a creation is in flight. Doubles as the monitor
	/// guarding marker resets, disposal and the condition variable.
	monitor: Mutex<Option<ThreadReport>>,
	created: Condvar,
}

impl SharedProducer {
	pub fn new(factory: Arc<dyn BeanFactory>) -> Self {
		Self {
			factory: Some(factory),
			instance: ArcSwapOption::empty(),
			creator: AtomicU64::new(NO_THREAD),
			monitor: Mutex::new(None),
			created: Condvar::new(),
		}
	}

	/// Producer whose single instance already exists.
	pub fn with_instance(instance: BeanInstance) -> Self {
		Self {
			factory: None,
			instance: ArcSwapOption::from_pointee(instance),
			creator: AtomicU64::new(NO_THREAD),
			monitor: Mutex::new(None),
			created: Condvar::new(),
		}
	}

	fn stored(&self) -> Option<BeanInstance> {
		self.instance.load_full().map(|arc| BeanInstance::clone(&arc))
	}

	fn create(&self, registry: &Registry, descriptor: &Descriptor) -> Result<BeanInstance> {
		let implementation = descriptor.implementation();
		let _reset = CreatorReset { producer: self };
		let mut report = ThreadReport::capture_current(registry.config().verbose_diagnostics);
		report.creation_path.push(implementation);
		*self.monitor.lock() = Some(report);

		// Another creator may have finished between our fast-path miss and the election.
		if let Some(instance) = self.stored() {
			return Ok(instance);
		}
		let Some(factory) = &self.factory else {
			// A preset slot is only ever emptied by disposal.
			return Err(BeanError::DescriptorDisposed { implementation });
		};

		let instance = construct_guarded(factory.as_ref(), registry, implementation)?;

		let monitor = self.monitor.lock();
		if descriptor.is_disposed() {
			tracing::debug!(bean = %implementation, "descriptor disposed during creation; not caching instance");
		} else {
			self.instance.store(Some(Arc::new(instance.clone())));
			tracing::debug!(bean = %implementation, "shared instance created");
		}
		drop(monitor);
		Ok(instance)
	}

	fn await_creator(
		&self,
		config: &RegistryConfig,
		descriptor: &Descriptor,
		owner: u64,
	) -> Result<BeanInstance> {
		let implementation = descriptor.implementation();
		let started = Instant::now();
		let mut warned = !config.verbose_diagnostics;
		// Creator still in flight when the wait ran out, read under the monitor.
		let mut stalled_on = None;
		let mut monitor = self.monitor.lock();

		loop {
			let current = self.creator.load(Ordering::Acquire);
			if current == NO_THREAD || descriptor.is_disposed() {
				break;
			}
			let elapsed = started.elapsed();
			if elapsed >= config.creation_timeout {
				stalled_on = Some(current);
				break;
			}
			if !warned && elapsed >= config.deadlock_warning_after {
				warned = true;
				let creator = monitor.clone().unwrap_or_else(|| ThreadReport::unknown(owner));
				MutexGuard::unlocked(&mut monitor, || {
					let waiting = ThreadReport::capture_current(true);
					tracing::warn!(
						bean = %implementation,
						waited = ?elapsed,
						"potential deadlock while waiting for a shared instance\ncreator: {creator:#}\nwaiting: {waiting:#}"
					);
				});
				continue;
			}

			let mut slice = config.poll_slice().min(config.creation_timeout - elapsed);
			if !warned {
				slice = slice.min(config.deadlock_warning_after - elapsed);
			}
			// Timeouts and spurious wakeups both fall through to the re-check.
			self.created.wait_for(&mut monitor, slice);
		}

		let creator = monitor.clone();
		drop(monitor);

		if let Some(instance) = self.stored() {
			return Ok(instance);
		}
		if descriptor.is_disposed() {
			return Err(BeanError::DescriptorDisposed { implementation });
		}

		let waited = started.elapsed();
		if let Some(current) = stalled_on {
			let creator = creator.unwrap_or_else(|| ThreadReport::unknown(current));
			let waiting = ThreadReport::capture_current(true);
			tracing::warn!(
				bean = %implementation,
				waited = ?waited,
				"gave up waiting for a shared instance\ncreator: {creator:#}\nwaiting: {waiting:#}"
			);
			return Err(BeanError::BeanCreationTimeout {
				implementation,
				waited,
				waiting,
				creator,
			});
		}

		Err(BeanError::BeanCreationFailed {
			implementation,
			capability: None,
			reason: format!(
				"thread #{owner} finished creating it without storing an instance; its construction most likely failed"
			),
			source: None,
		})
	}
}

impl InstanceProducer for SharedProducer {
	fn produce(&self, registry: &Registry, descriptor: &Descriptor) -> Result<BeanInstance> {
		if let Some(instance) = self.stored() {
			return Ok(instance);
		}
		let implementation = descriptor.implementation();
		if descriptor.is_disposed() {
			return Err(BeanError::DescriptorDisposed { implementation });
		}

		let me = current_thread_id();
		match self
			.creator
			.compare_exchange(NO_THREAD, me, Ordering::AcqRel, Ordering::Acquire)
		{
			Ok(_) => self.create(registry, descriptor),
			// We are the creator: the factory asked for its own bean.
			Err(owner) if owner == me => {
				let mut path = guard::creation_path();
				path.push(implementation);
				Err(BeanError::CircularDependency { path })
			}
			Err(owner) => self.await_creator(registry.config(), descriptor, owner),
		}
	}

	fn has_instance(&self) -> bool {
		self.instance.load().is_some()
	}

	fn dispose(&self) {
		let _monitor = self.monitor.lock();
		self.instance.store(None);
		self.created.notify_all();
	}
}

/// Clears the creator marker and wakes waiters, success or failure.
struct CreatorReset<'a> {
	producer: &'a SharedProducer,
}

impl Drop for CreatorReset<'_> {
	fn drop(&mut self) {
		let mut report = self.producer.monitor.lock();
		*report = None;
		self.producer.creator.store(NO_THREAD, Ordering::Release);
		self.producer.created.notify_all();
	}
}
