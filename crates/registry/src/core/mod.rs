//! Shared bean registry vocabulary: types, instances, metadata, errors, config.

pub mod bean_type;
pub mod config;
pub mod error;
pub mod instance;
pub mod meta;
pub mod thread;

pub use bean_type::{BeanType, TypeKind};
pub use config::RegistryConfig;
pub use error::{BeanError, BoxError, Result};
pub use instance::BeanInstance;
pub use meta::{BeanRegistration, BeanScope, DEFAULT_PRIORITY, ScopeKey};
pub use thread::{ThreadReport, current_thread_id};
