//! Builds the navigation forest from a set of registered types.

use std::fmt;

use opsdeck_ops::label::name_from_camel_case;
use opsdeck_ops::{AnyOperation, OperationCache, RegistrationError, TypeKey};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::node::NavNode;
use crate::source::SourceTree;

/// Derives a display label for a type.
pub type Labeler = Box<dyn Fn(TypeKey) -> String + Send + Sync>;

/// Organizes types into a forest by their strict-ancestor relation.
#[derive(Default)]
pub struct NavTreeBuilder {
	labeler: Option<Labeler>,
}

impl NavTreeBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the default labeler, which splits the type's simple name at
	/// case transitions ("GoldenRetriever" becomes "Golden Retriever").
	pub fn labeler(mut self, labeler: impl Fn(TypeKey) -> String + Send + Sync + 'static) -> Self {
		self.labeler = Some(Box::new(labeler));
		self
	}

	pub fn label(&self, ty: TypeKey) -> String {
		match &self.labeler {
			Some(labeler) => labeler(ty),
			None => name_from_camel_case(ty.simple_name()),
		}
	}

	/// Builds the forest for `types`.
	///
	/// Each type is placed under its nearest strict ancestor among `types`;
	/// types without one become roots. Siblings keep the order of `types`, and
	/// repeated types are ignored.
	///
	/// # Errors
	///
	/// Registration errors raised while discovering a type's operations.
	pub fn build(&self, types: &[TypeKey], cache: &OperationCache) -> Result<NavForest, RegistrationError> {
		let mut seen = HashSet::default();
		let types: Vec<TypeKey> = types.iter().copied().filter(|ty| seen.insert(*ty)).collect();

		let mut subtypes: HashMap<TypeKey, Vec<TypeKey>> = HashMap::default();
		let mut roots = Vec::new();
		for &ty in &types {
			match nearest_ancestor(ty, &types) {
				Some(parent) => subtypes.entry(parent).or_default().push(ty),
				None => roots.push(ty),
			}
		}

		let mut by_type = HashMap::default();
		let roots = roots
			.into_iter()
			.map(|ty| self.make_node(ty, &subtypes, cache, &mut by_type))
			.collect::<Result<Vec<_>, _>>()?;

		tracing::debug!(types = types.len(), roots = roots.len(), "navigation forest built");
		Ok(NavForest { roots, by_type })
	}

	fn make_node(
		&self,
		ty: TypeKey,
		subtypes: &HashMap<TypeKey, Vec<TypeKey>>,
		cache: &OperationCache,
		by_type: &mut HashMap<TypeKey, NavNode>,
	) -> Result<NavNode, RegistrationError> {
		let children = subtypes
			.get(&ty)
			.map(Vec::as_slice)
			.unwrap_or_default()
			.iter()
			.map(|&sub| self.make_node(sub, subtypes, cache, by_type))
			.collect::<Result<Vec<_>, _>>()?;

		let operations = cache.operations(ty)?;
		let queries = operations.iter().filter_map(AnyOperation::as_static_query).cloned().collect();
		let actions = operations.iter().filter_map(AnyOperation::as_static_action).cloned().collect();
		let node = NavNode::new(ty, self.label(ty), cache.default_query(ty)?, queries, actions, children);
		by_type.insert(ty, node.clone());
		Ok(node)
	}
}

impl fmt::Debug for NavTreeBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavTreeBuilder")
			.field("custom_labeler", &self.labeler.is_some())
			.finish()
	}
}

/// Most specific strict ancestor of `ty` among `candidates`.
///
/// With incomparable ancestors (a diamond), the first one found wins unless a
/// later candidate is strictly more specific.
fn nearest_ancestor(ty: TypeKey, candidates: &[TypeKey]) -> Option<TypeKey> {
	let mut nearest: Option<TypeKey> = None;
	for &other in candidates {
		if other != ty && other.is_strict_ancestor_of(&ty) && nearest.is_none_or(|n| n.is_strict_ancestor_of(&other)) {
			nearest = Some(other);
		}
	}
	nearest
}

/// The built navigation forest.
#[derive(Debug, Clone, Default)]
pub struct NavForest {
	roots: Vec<NavNode>,
	by_type: HashMap<TypeKey, NavNode>,
}

impl NavForest {
	pub fn roots(&self) -> &[NavNode] {
		&self.roots
	}

	/// The node representing `ty`, wherever it sits in the forest.
	pub fn get(&self, ty: TypeKey) -> Option<&NavNode> {
		self.by_type.get(&ty)
	}

	/// Total number of nodes.
	pub fn len(&self) -> usize {
		self.by_type.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_type.is_empty()
	}
}

impl SourceTree for NavForest {
	type Node = NavNode;

	fn roots(&self) -> impl Iterator<Item = NavNode> {
		self.roots.iter().cloned()
	}

	fn children(&self, node: &NavNode) -> impl Iterator<Item = NavNode> {
		node.children().iter().cloned()
	}
}

#[cfg(test)]
mod tests;
