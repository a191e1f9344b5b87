//! Per-thread creation stack used to detect re-entrant (cyclic) construction.
//!
//! # Invariants
//!
//! - A type is pushed before its factory runs and popped on every exit path,
//!   including unwinding (the pop lives in [`CreationGuard`]'s `Drop`).
//! - The thread-local stack is dropped once empty so pooled worker threads
//!   carry no state between unrelated lookups.
//! - Only same-thread re-entry is a cycle. Two threads building the same
//!   shared bean is the race handled by the shared producer.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::core::{BeanError, BeanType, Result};

thread_local! {
	static CREATION_STACK: RefCell<Option<Vec<BeanType>>> = const { RefCell::new(None) };
}

/// Scoped marker for one construction on the current thread.
#[must_use = "the type is popped as soon as the guard is dropped"]
pub struct CreationGuard {
	implementation: BeanType,
	_not_send: PhantomData<*const ()>,
}

impl CreationGuard {
	/// Pushes `implementation`, failing with [`BeanError::CircularDependency`]
	/// if it is already under construction on this thread.
	pub fn enter(implementation: BeanType) -> Result<Self> {
		CREATION_STACK.with(|cell| {
			let mut slot = cell.borrow_mut();
			let stack = slot.get_or_insert_with(Vec::new);
			if stack.contains(&implementation) {
				let mut path = stack.clone();
				path.push(implementation);
				return Err(BeanError::CircularDependency { path });
			}
			stack.push(implementation);
			Ok(Self {
				implementation,
				_not_send: PhantomData,
			})
		})
	}

	pub fn implementation(&self) -> BeanType {
		self.implementation
	}
}

impl Drop for CreationGuard {
	fn drop(&mut self) {
		// try_with: the thread-local may already be gone during thread teardown.
		let _ = CREATION_STACK.try_with(|cell| {
			let mut slot = cell.borrow_mut();
			let Some(stack) = slot.as_mut() else { return };
			if let Some(pos) = stack.iter().rposition(|&t| t == self.implementation) {
				debug_assert_eq!(pos + 1, stack.len(), "creation guards dropped out of order");
				stack.remove(pos);
			}
			if stack.is_empty() {
				*slot = None;
			}
		});
	}
}

/// Runs `f` with `implementation` on the creation stack.
pub fn guarded<T>(implementation: BeanType, f: impl FnOnce() -> Result<T>) -> Result<T> {
	let _guard = CreationGuard::enter(implementation)?;
	f()
}

/// Types under construction on the calling thread, outermost first.
pub fn creation_path() -> Vec<BeanType> {
	CREATION_STACK.with(|cell| cell.borrow().clone().unwrap_or_default())
}

pub fn is_under_construction(implementation: BeanType) -> bool {
	CREATION_STACK.with(|cell| {
		cell.borrow()
			.as_ref()
			.is_some_and(|stack| stack.contains(&implementation))
	})
}

/// True once the thread-local structure has been released.
pub(crate) fn is_released() -> bool {
	CREATION_STACK.with(|cell| cell.borrow().is_none())
}
