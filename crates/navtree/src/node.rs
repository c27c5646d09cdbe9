//! Navigation tree nodes.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use opsdeck_ops::{StaticAction, StaticQuery, TypeKey};

struct NodeData {
	ty: TypeKey,
	label: String,
	default_query: Option<Arc<StaticQuery>>,
	queries: Vec<Arc<StaticQuery>>,
	actions: Vec<Arc<StaticAction>>,
	children: Vec<NavNode>,
}

/// One registered type in the navigation forest.
///
/// Immutable once built; clones share the same data. Equality and hashing
/// consider only the represented type, so a rebuilt node matches its
/// predecessor.
#[derive(Clone)]
pub struct NavNode(Arc<NodeData>);

impl NavNode {
	pub(crate) fn new(
		ty: TypeKey,
		label: String,
		default_query: Option<Arc<StaticQuery>>,
		queries: Vec<Arc<StaticQuery>>,
		actions: Vec<Arc<StaticAction>>,
		children: Vec<NavNode>,
	) -> Self {
		Self(Arc::new(NodeData {
			ty,
			label,
			default_query,
			queries,
			actions,
			children,
		}))
	}

	/// The represented type.
	pub fn type_key(&self) -> TypeKey {
		self.0.ty
	}

	pub fn label(&self) -> &str {
		&self.0.label
	}

	/// Unconfigured static query listing instances of this type, if any.
	pub fn default_query(&self) -> Option<&Arc<StaticQuery>> {
		self.0.default_query.as_ref()
	}

	/// Static queries declared on this type.
	pub fn queries(&self) -> &[Arc<StaticQuery>] {
		&self.0.queries
	}

	/// Static actions declared on this type.
	pub fn actions(&self) -> &[Arc<StaticAction>] {
		&self.0.actions
	}

	/// Nodes of the nearest registered subtypes.
	pub fn children(&self) -> &[NavNode] {
		&self.0.children
	}

	/// Returns true if both handles share the same node data.
	pub fn ptr_eq(&self, other: &NavNode) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl PartialEq for NavNode {
	fn eq(&self, other: &Self) -> bool {
		self.0.ty == other.0.ty
	}
}

impl Eq for NavNode {}

impl Hash for NavNode {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.ty.hash(state);
	}
}

impl fmt::Debug for NavNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavNode")
			.field("label", &self.0.label)
			.field("queries", &self.0.queries.len())
			.field("actions", &self.0.actions.len())
			.field("children", &self.0.children)
			.finish()
	}
}
