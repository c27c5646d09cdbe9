//! Type descriptors and type-tagged values.
//!
//! Rust has no runtime subtyping, so every data type that takes part in
//! operation discovery declares itself once through [`data_type!`]:
//!
//! ```rust,ignore
//! data_type!(Animal);
//! data_type!(Dog: Animal);
//! data_type!(SearchConfig { default });
//! data_type!(RenameConfig { default, from: Dog });
//! ```
//!
//! The resulting [`TypeKey`] carries the declared supertypes (for
//! assignability checks) and the configuration constructors used by
//! `new_config`.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Implemented by every type that can flow through the operation model.
///
/// Use [`data_type!`](crate::data_type) rather than implementing this by hand.
pub trait Typed: Any + Send + Sync {
	/// Descriptor of the implementing type.
	const TYPE: TypeKey;
}

/// Configuration constructors attached to a [`TypeKey`].
#[derive(Clone, Copy)]
pub struct Constructors {
	default: Option<fn() -> Object>,
	from_target: Option<fn(&Object) -> Option<Object>>,
}

impl Constructors {
	/// No constructors; `new_config` on such a type is a programming error.
	pub const NONE: Self = Self {
		default: None,
		from_target: None,
	};

	/// Adds a no-argument constructor backed by [`Default`].
	pub const fn with_default<T: Typed + Default>(self) -> Self {
		Self {
			default: Some(construct_default::<T> as fn() -> Object),
			..self
		}
	}

	/// Adds a one-argument constructor accepting a target of type `T`.
	pub const fn with_from_target<C, T>(self) -> Self
	where
		C: Typed + for<'a> From<&'a T>,
		T: Typed,
	{
		Self {
			from_target: Some(construct_from_target::<C, T> as fn(&Object) -> Option<Object>),
			..self
		}
	}

	/// Returns true if a no-argument constructor is declared.
	pub fn has_default(&self) -> bool {
		self.default.is_some()
	}

	/// Returns true if a target-accepting constructor is declared.
	pub fn has_from_target(&self) -> bool {
		self.from_target.is_some()
	}
}

fn construct_default<T: Typed + Default>() -> Object {
	Object::new(T::default())
}

fn construct_from_target<C, T>(target: &Object) -> Option<Object>
where
	C: Typed + for<'a> From<&'a T>,
	T: Typed,
{
	target.downcast_ref::<T>().map(|t| Object::new(C::from(t)))
}

/// Descriptor of a registered type.
///
/// Equality and hashing only consider the underlying [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeKey {
	id: fn() -> TypeId,
	name: &'static str,
	supertypes: &'static [TypeKey],
	constructors: Constructors,
}

impl TypeKey {
	/// The unit type: both the "no configuration" and the "no result" sentinel.
	pub const NONE: TypeKey = <() as Typed>::TYPE;

	/// Creates a descriptor for `T` with no supertypes and no constructors.
	pub const fn new<T: 'static>(name: &'static str) -> Self {
		Self {
			id: TypeId::of::<T> as fn() -> TypeId,
			name,
			supertypes: &[],
			constructors: Constructors::NONE,
		}
	}

	/// Declares the direct supertypes of this type.
	pub const fn extends(self, supertypes: &'static [TypeKey]) -> Self {
		Self { supertypes, ..self }
	}

	/// Attaches configuration constructors.
	pub const fn constructors(self, constructors: Constructors) -> Self {
		Self { constructors, ..self }
	}

	/// Returns the descriptor of `T`.
	#[inline]
	pub fn of<T: Typed>() -> Self {
		T::TYPE
	}

	#[inline]
	pub fn type_id(&self) -> TypeId {
		(self.id)()
	}

	/// Returns the declared name, as written at the declaration site.
	#[inline]
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Returns the last path segment of the declared name.
	pub fn simple_name(&self) -> &'static str {
		self.name.rsplit("::").next().unwrap_or(self.name).trim()
	}

	/// Returns the directly declared supertypes.
	#[inline]
	pub fn supertypes(&self) -> &'static [TypeKey] {
		self.supertypes
	}

	/// Returns true for the [`TypeKey::NONE`] sentinel.
	#[inline]
	pub fn is_none(&self) -> bool {
		*self == Self::NONE
	}

	/// Returns true if a value of type `other` is assignable to `self`.
	///
	/// Reflexive and transitive over declared supertypes.
	pub fn is_supertype_of(&self, other: &TypeKey) -> bool {
		self == other || other.supertypes.iter().any(|sup| self.is_supertype_of(sup))
	}

	/// Returns true if `self` is a supertype of `other` but not vice versa.
	pub fn is_strict_ancestor_of(&self, other: &TypeKey) -> bool {
		self.is_supertype_of(other) && !other.is_supertype_of(self)
	}

	#[inline]
	pub fn constructors_declared(&self) -> &Constructors {
		&self.constructors
	}

	/// Instantiates via the no-argument constructor, if declared.
	pub fn construct_default(&self) -> Option<Object> {
		self.constructors.default.map(|ctor| ctor())
	}

	/// Instantiates via the target-accepting constructor, if declared and the
	/// target has the accepted type.
	pub fn construct_from_target(&self, target: &Object) -> Option<Object> {
		self.constructors.from_target.and_then(|ctor| ctor(target))
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.type_id() == other.type_id()
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.type_id().hash(state);
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self.name)
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// A shared, type-tagged dynamic value.
///
/// Used for operation targets, context objects, configurations and results.
/// Cloning is cheap; clones share the same allocation.
#[derive(Clone)]
pub struct Object {
	ty: TypeKey,
	value: Arc<dyn Any + Send + Sync>,
}

impl Object {
	/// Wraps a value of a registered type.
	pub fn new<T: Typed>(value: T) -> Self {
		Self {
			ty: T::TYPE,
			value: Arc::new(value),
		}
	}

	/// Wraps an already shared value of a registered type.
	pub fn from_arc<T: Typed>(value: Arc<T>) -> Self {
		Self { ty: T::TYPE, value }
	}

	/// Returns the descriptor of the concrete value type.
	#[inline]
	pub fn type_key(&self) -> TypeKey {
		self.ty
	}

	/// Returns true if this value is assignable to `ty`.
	#[inline]
	pub fn is_instance_of(&self, ty: TypeKey) -> bool {
		ty.is_supertype_of(&self.ty)
	}

	/// Borrows the value as its concrete type.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref::<T>()
	}

	/// Returns a shared handle to the value as its concrete type.
	pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.value.clone().downcast::<T>().ok()
	}

	/// Returns true if both objects share the same allocation.
	#[inline]
	pub fn ptr_eq(&self, other: &Object) -> bool {
		Arc::ptr_eq(&self.value, &other.value)
	}
}

impl fmt::Debug for Object {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Object").field(&self.ty.name).finish()
	}
}

/// Declares a [`Typed`] implementation for a data type.
///
/// # Forms
///
/// ```rust,ignore
/// data_type!(Animal);                          // plain type
/// data_type!(Dog: Animal);                     // with supertypes
/// data_type!(SearchConfig { default });        // Default-constructible config
/// data_type!(RenameConfig { default, from: Dog }); // also `From<&Dog>`
/// ```
#[macro_export]
macro_rules! data_type {
	($ty:ty $(: $($sup:ty),+ $(,)?)? $({ $($ctor:tt)* })?) => {
		impl $crate::Typed for $ty {
			const TYPE: $crate::TypeKey = $crate::TypeKey::new::<$ty>(stringify!($ty))
				.extends(&[$($(<$sup as $crate::Typed>::TYPE),+)?])
				.constructors($crate::__constructors!($ty; $($($ctor)*)?));
		}
	};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __constructors {
	($ty:ty;) => {
		$crate::Constructors::NONE
	};
	($ty:ty; default $(, $($rest:tt)*)?) => {
		$crate::__constructors!($ty; $($($rest)*)?).with_default::<$ty>()
	};
	($ty:ty; from: $target:ty $(, $($rest:tt)*)?) => {
		$crate::__constructors!($ty; $($($rest)*)?).with_from_target::<$ty, $target>()
	};
}

data_type!(());
data_type!(String);
data_type!(bool);
data_type!(i64);
data_type!(u64);
data_type!(f64);
