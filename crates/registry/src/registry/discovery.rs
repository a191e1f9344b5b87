//! Link-time bean declarations collected with `inventory`.
//!
//! ```rust,ignore
//! inventory::submit! {
//!     BeanDeclaration::new(|| {
//!         BeanRegistration::of::<PgStore>()
//!             .capability(BeanType::of_trait::<dyn Store>())
//!             .shared()
//!             .construct_with(PgStore::default)
//!     })
//! }
//! ```

use std::sync::Arc;

use super::Registry;
use crate::core::{BeanRegistration, Result};
use crate::descriptor::Descriptor;

/// Statically submitted registration, materialized by [`Registry::populate_discovered`].
pub struct BeanDeclaration {
	declare: fn() -> BeanRegistration,
}

impl BeanDeclaration {
	pub const fn new(declare: fn() -> BeanRegistration) -> Self {
		Self { declare }
	}

	pub fn registration(&self) -> BeanRegistration {
		(self.declare)()
	}
}

inventory::collect!(BeanDeclaration);

impl Registry {
	/// Registers every submitted [`BeanDeclaration`], ordered by implementation name.
	///
	/// All declarations are validated before the first one is registered, so an
	/// invalid declaration leaves the registry untouched. Each call registers
	/// the declarations again.
	pub fn populate_discovered(&self) -> Result<Vec<Arc<Descriptor>>> {
		let mut registrations: Vec<BeanRegistration> = inventory::iter::<BeanDeclaration>
			.into_iter()
			.map(BeanDeclaration::registration)
			.collect();
		registrations.sort_by_key(BeanRegistration::implementation);
		for registration in &registrations {
			registration.validate()?;
		}

		let descriptors = registrations
			.into_iter()
			.map(|registration| self.register(registration))
			.collect::<Result<Vec<_>>>()?;
		tracing::debug!(count = descriptors.len(), "registered discovered beans");
		Ok(descriptors)
	}
}
