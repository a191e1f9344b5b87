use std::any::type_name;
use std::cmp::Ordering;

/// How a [`BeanType`] takes part in override resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TypeKind {
	/// Instantiable type. Only concrete types can be registered or overridden.
	#[default]
	Concrete,
	/// Abstract base type: usable as a capability, never as an implementation.
	Abstract,
	/// Pure interface (trait) capability.
	Interface,
}

impl TypeKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Concrete => "concrete",
			Self::Abstract => "abstract",
			Self::Interface => "interface",
		}
	}
}

/// Key under which implementations register and are looked up.
///
/// The registry never inspects types at runtime: callers declare the
/// capability closure of an implementation explicitly, and the [`TypeKind`]
/// tells the resolver whether override chasing applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeanType {
	name: &'static str,
	kind: TypeKind,
}

impl BeanType {
	pub const fn new(name: &'static str, kind: TypeKind) -> Self {
		Self { name, kind }
	}

	pub const fn concrete(name: &'static str) -> Self {
		Self::new(name, TypeKind::Concrete)
	}

	pub const fn abstract_type(name: &'static str) -> Self {
		Self::new(name, TypeKind::Abstract)
	}

	pub const fn interface(name: &'static str) -> Self {
		Self::new(name, TypeKind::Interface)
	}

	/// Concrete type named after the Rust type `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::concrete(type_name::<T>())
	}

	/// Interface type named after the trait object `T` (e.g. `dyn Store`).
	pub fn of_trait<T: ?Sized + 'static>() -> Self {
		Self::interface(type_name::<T>())
	}

	#[inline]
	pub const fn name(self) -> &'static str {
		self.name
	}

	#[inline]
	pub const fn kind(self) -> TypeKind {
		self.kind
	}

	#[inline]
	pub const fn is_concrete(self) -> bool {
		matches!(self.kind, TypeKind::Concrete)
	}
}

impl Ord for BeanType {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name
			.cmp(other.name)
			.then_with(|| self.kind.cmp(&other.kind))
	}
}

impl PartialOrd for BeanType {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl std::fmt::Display for BeanType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name)
	}
}

/// Renders a type list as `A, B, C`.
pub(crate) fn join_types(types: &[BeanType]) -> String {
	let mut out = String::new();
	for (i, ty) in types.iter().enumerate() {
		if i > 0 {
			out.push_str(", ");
		}
		out.push_str(ty.name);
	}
	out
}

/// Renders a construction path as `A -> B -> A`.
pub(crate) fn join_path(path: &[BeanType]) -> String {
	path.iter().map(|t| t.name).collect::<Vec<_>>().join(" -> ")
}
