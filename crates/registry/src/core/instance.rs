use std::any::Any;
use std::sync::Arc;

/// Type-erased, cheaply clonable handle to a produced bean.
///
/// Trait-object beans are stored as an `Arc<dyn Trait>` value and read back
/// with `downcast_ref::<Arc<dyn Trait>>()`.
#[derive(Clone)]
pub struct BeanInstance(Arc<dyn Any + Send + Sync>);

impl BeanInstance {
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self(Arc::new(value))
	}

	pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self(value)
	}

	/// Returns a typed `Arc` sharing ownership with this handle.
	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		Arc::clone(&self.0).downcast::<T>().ok()
	}

	pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
		self.0.downcast_ref::<T>()
	}

	pub fn is<T: Any + Send + Sync>(&self) -> bool {
		self.0.is::<T>()
	}

	/// Returns true if both handles point at the same allocation.
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Arc::ptr_eq(&a.0, &b.0)
	}
}

impl std::fmt::Debug for BeanInstance {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("BeanInstance")
			.field(&Arc::as_ptr(&self.0).cast::<()>())
			.finish()
	}
}
