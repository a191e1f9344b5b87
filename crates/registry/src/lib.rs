//! Runtime bean registry.
//!
//! Resolves, at call time, which registered implementation answers a requested
//! capability, and manages the creation lifecycle of those implementations.
//!
//! # Modules
//!
//! - [`core`] - Types, instances, registration metadata, errors and config
//! - [`guard`] - Per-thread creation stack for cycle detection
//! - [`producer`] - Per-request and create-once instance production
//! - [`hierarchy`] - Priority and override resolution per capability
//! - [`registry`] - The [`Registry`] itself
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = Registry::new();
//! let store = BeanType::interface("app::Store");
//!
//! registry.register(
//!     BeanRegistration::new(BeanType::concrete("app::MemStore"))
//!         .capability(store)
//!         .shared()
//!         .construct_with(MemStore::default),
//! )?;
//!
//! let store: Arc<MemStore> = registry.get(store, None)?;
//! ```

pub mod core;
mod descriptor;
pub mod guard;
pub mod hierarchy;
pub mod producer;
pub mod registry;

pub use crate::core::{
	BeanError, BeanInstance, BeanRegistration, BeanScope, BeanType, BoxError, DEFAULT_PRIORITY,
	RegistryConfig, Result, ScopeKey, ThreadReport, TypeKind,
};

pub use descriptor::Descriptor;
pub use guard::CreationGuard;
pub use hierarchy::{Hierarchy, HierarchyViews};
pub use producer::{BeanFactory, InstanceProducer, PerRequestProducer, SharedProducer};
#[cfg(feature = "discovery")]
pub use registry::BeanDeclaration;
pub use registry::{BeanDecorator, Registry, ScopeEvaluator, UnscopedEvaluator};

#[cfg(feature = "discovery")]
#[doc(hidden)]
pub use inventory;
