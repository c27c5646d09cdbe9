//! Explicit method registration.
//!
//! Every exposed method is described by a static [`MethodDef`] carrying its
//! [`Marker`] (query or action, plus the required label), its declared
//! parameter and return types, and an [`Invoker`] adapter that calls the real
//! method. Definitions are collected into a [`MethodTable`]:
//!
//! ```rust,ignore
//! static DOGS_ALL: MethodDef = MethodDef {
//!     owner: Dog::TYPE,
//!     name: "all",
//!     marker: Marker::query("All Dogs"),
//!     receiver: Receiver::Static,
//!     params: &[ProgressReporter::TYPE],
//!     returns: ReturnType::Sequence(Dog::TYPE),
//!     invoke: dogs_all,
//! };
//! inventory::submit! { MethodReg(&DOGS_ALL) }
//!
//! let table = MethodTable::builder("app").extend_inventory().build();
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap as HashMap;
use smallvec::SmallVec;

use crate::error::OpError;
use crate::progress::ProgressReporter;
use crate::types::{Object, TypeKey};

/// Which marker a method carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
	Query,
	Action,
}

/// The discovery marker: kind plus the required label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker {
	pub kind: MarkerKind,
	/// Short text suitable for a menu item or box title, e.g. "All Users".
	pub label: &'static str,
}

impl Marker {
	pub const fn query(label: &'static str) -> Self {
		Self {
			kind: MarkerKind::Query,
			label,
		}
	}

	pub const fn action(label: &'static str) -> Self {
		Self {
			kind: MarkerKind::Action,
			label,
		}
	}

	/// Returns the marker as written in error messages.
	pub const fn description(&self) -> &'static str {
		match self.kind {
			MarkerKind::Query => "#[query]",
			MarkerKind::Action => "#[action]",
		}
	}
}

/// Whether the method takes a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
	Static,
	Instance,
}

/// Declared return type of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
	/// Returns nothing.
	Unit,
	/// Returns one value.
	Value(TypeKey),
	/// Returns a lazy, single-pass sequence of items.
	Sequence(TypeKey),
}

/// Lazy, single-pass sequence of query result items.
pub type ResultStream = Box<dyn Iterator<Item = Object> + Send>;

/// What an [`Invoker`] hands back.
pub enum Output {
	Unit,
	Value(Object),
	Sequence(ResultStream),
}

impl Output {
	pub(crate) fn shape(&self) -> &'static str {
		match self {
			Self::Unit => "nothing",
			Self::Value(_) => "a value",
			Self::Sequence(_) => "a sequence",
		}
	}
}

impl fmt::Debug for Output {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unit => f.write_str("Unit"),
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Sequence(_) => f.write_str("Sequence(..)"),
		}
	}
}

/// One argument slot passed to an [`Invoker`].
#[derive(Debug, Clone)]
pub enum Arg {
	Context(Object),
	Progress(ProgressReporter),
	Config(Object),
}

/// The argument slots actually present for one invocation, in
/// context, progress, config order.
#[derive(Debug, Clone, Default)]
pub struct Args {
	slots: SmallVec<[Arg; 3]>,
}

impl Args {
	pub(crate) fn push(&mut self, arg: Arg) {
		self.slots.push(arg);
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Returns the slot at `index`.
	pub fn get(&self, index: usize) -> Option<&Arg> {
		self.slots.get(index)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arg> {
		self.slots.iter()
	}

	pub fn context(&self) -> Option<&Object> {
		self.slots.iter().find_map(|arg| match arg {
			Arg::Context(ctx) => Some(ctx),
			_ => None,
		})
	}

	pub fn progress(&self) -> Option<&ProgressReporter> {
		self.slots.iter().find_map(|arg| match arg {
			Arg::Progress(progress) => Some(progress),
			_ => None,
		})
	}

	pub fn config(&self) -> Option<&Object> {
		self.slots.iter().find_map(|arg| match arg {
			Arg::Config(config) => Some(config),
			_ => None,
		})
	}

	/// Borrows the context slot as `T`.
	pub fn context_as<T: Any>(&self) -> Result<&T, OpError> {
		downcast_slot(self.context(), "context")
	}

	/// Borrows the config slot as `T`.
	pub fn config_as<T: Any>(&self) -> Result<&T, OpError> {
		downcast_slot(self.config(), "config")
	}

	/// Returns the progress slot, or an error if the method did not declare one.
	pub fn reporter(&self) -> Result<&ProgressReporter, OpError> {
		self.progress()
			.ok_or_else(|| OpError::InvalidArgument("missing progress slot".to_string()))
	}
}

fn downcast_slot<'a, T: Any>(slot: Option<&'a Object>, what: &str) -> Result<&'a T, OpError> {
	let object = slot.ok_or_else(|| OpError::InvalidArgument(format!("missing {what} slot")))?;
	object.downcast_ref::<T>().ok_or_else(|| {
		OpError::InvalidArgument(format!(
			"{what} slot holds {}, expected {}",
			object.type_key(),
			std::any::type_name::<T>()
		))
	})
}

/// Adapter calling the underlying method.
///
/// Receives the bound target (instance methods only) and the present argument
/// slots. Failures, including [`OpError::Cancelled`], are propagated unchanged.
pub type Invoker = fn(target: Option<&Object>, args: &Args) -> Result<Output, OpError>;

/// Static description of one exposed method.
#[derive(Clone, Copy)]
pub struct MethodDef {
	/// The type declaring the method.
	pub owner: TypeKey,
	/// Method name, used in diagnostics and as part of the operation identity.
	pub name: &'static str,
	pub marker: Marker,
	pub receiver: Receiver,
	/// Declared parameter types in positional order.
	pub params: &'static [TypeKey],
	pub returns: ReturnType,
	pub invoke: Invoker,
}

impl MethodDef {
	/// Returns `Owner::name`.
	pub fn qualified_name(&self) -> String {
		format!("{}::{}", self.owner.name(), self.name)
	}

	#[inline]
	pub fn is_static(&self) -> bool {
		self.receiver == Receiver::Static
	}
}

impl fmt::Debug for MethodDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodDef")
			.field("owner", &self.owner)
			.field("name", &self.name)
			.field("marker", &self.marker)
			.field("receiver", &self.receiver)
			.field("params", &self.params)
			.field("returns", &self.returns)
			.finish_non_exhaustive()
	}
}

/// Inventory wrapper for globally registered methods.
pub struct MethodReg(pub &'static MethodDef);
inventory::collect!(MethodReg);

/// Policy for handling two definitions with the same owner and name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
	/// Panic with a detailed error message.
	#[default]
	Panic,
	/// Keep the first definition seen.
	FirstWins,
	/// Replace with the last definition seen, keeping the first position.
	LastWins,
}

impl DuplicatePolicy {
	/// `Panic` in debug builds, `FirstWins` in release builds.
	#[inline]
	pub fn for_build() -> Self {
		if cfg!(debug_assertions) {
			DuplicatePolicy::Panic
		} else {
			DuplicatePolicy::FirstWins
		}
	}
}

/// Registered methods grouped by owner type, in registration order.
pub struct MethodTable {
	label: &'static str,
	by_owner: HashMap<TypeKey, Vec<&'static MethodDef>>,
	len: usize,
}

impl MethodTable {
	pub fn builder(label: &'static str) -> MethodTableBuilder {
		MethodTableBuilder::new(label)
	}

	/// Table of every method submitted through [`MethodReg`].
	pub fn global() -> Arc<MethodTable> {
		static GLOBAL: LazyLock<Arc<MethodTable>> =
			LazyLock::new(|| Arc::new(MethodTable::builder("global").extend_inventory().build()));
		GLOBAL.clone()
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Methods declared on `owner`, in registration order.
	pub fn methods_of(&self, owner: TypeKey) -> &[&'static MethodDef] {
		self.by_owner.get(&owner).map_or(&[], Vec::as_slice)
	}

	/// Methods declared on `owner` carrying a marker of `kind`.
	pub fn marked(&self, owner: TypeKey, kind: MarkerKind) -> impl Iterator<Item = &'static MethodDef> + '_ {
		self.methods_of(owner)
			.iter()
			.copied()
			.filter(move |def| def.marker.kind == kind)
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

impl fmt::Debug for MethodTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodTable")
			.field("label", &self.label)
			.field("owners", &self.by_owner.len())
			.field("len", &self.len)
			.finish()
	}
}

/// Builder for [`MethodTable`].
pub struct MethodTableBuilder {
	label: &'static str,
	defs: Vec<&'static MethodDef>,
	policy: DuplicatePolicy,
}

impl MethodTableBuilder {
	/// Creates a builder; `label` names the table in diagnostics.
	pub fn new(label: &'static str) -> Self {
		Self {
			label,
			defs: Vec::new(),
			policy: DuplicatePolicy::for_build(),
		}
	}

	pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn push(mut self, def: &'static MethodDef) -> Self {
		self.defs.push(def);
		self
	}

	pub fn extend<I: IntoIterator<Item = &'static MethodDef>>(mut self, defs: I) -> Self {
		self.defs.extend(defs);
		self
	}

	/// Adds every definition submitted through [`MethodReg`].
	pub fn extend_inventory(mut self) -> Self {
		for reg in inventory::iter::<MethodReg> {
			self.defs.push(reg.0);
		}
		self
	}

	/// Builds the table, resolving duplicates according to the policy.
	///
	/// # Panics
	///
	/// Panics on a duplicate `(owner, name)` pair when the policy is
	/// [`DuplicatePolicy::Panic`].
	pub fn build(mut self) -> MethodTable {
		let mut seen = std::collections::HashSet::with_capacity(self.defs.len());
		self.defs.retain(|d| seen.insert(*d as *const MethodDef as usize));

		let mut by_owner: HashMap<TypeKey, Vec<&'static MethodDef>> = HashMap::default();
		let mut len = 0;
		for def in self.defs {
			let methods = by_owner.entry(def.owner).or_default();
			match methods.iter().position(|existing| existing.name == def.name) {
				None => {
					methods.push(def);
					len += 1;
				}
				Some(index) => match self.policy {
					DuplicatePolicy::Panic => panic!(
						"duplicate method in {}: {} registered twice",
						self.label,
						def.qualified_name()
					),
					DuplicatePolicy::FirstWins => {}
					DuplicatePolicy::LastWins => methods[index] = def,
				},
			}
		}

		tracing::debug!(table = self.label, methods = len, owners = by_owner.len(), "method table built");
		MethodTable {
			label: self.label,
			by_owner,
			len,
		}
	}
}

#[cfg(test)]
mod tests;
