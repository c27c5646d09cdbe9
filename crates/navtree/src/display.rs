//! Stateful display tree.
//!
//! A long-lived ordered forest whose nodes carry a source value plus caller
//! state (expansion, selection, ...). Values are unique across the tree and
//! indexed for lookup. A node can be detached together with its subtree and
//! re-attached elsewhere without losing its identity or state.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap as HashMap;
use slab::Slab;
use thiserror::Error;

/// Stable identity of a display node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
	#[error("value already present in the tree")]
	DuplicateValue,
	#[error("unknown node {0:?}")]
	UnknownNode(NodeId),
	#[error("node {0:?} is already attached")]
	AlreadyAttached(NodeId),
	#[error("node {0:?} is detached")]
	Detached(NodeId),
	#[error("node {0:?} cannot be attached inside its own subtree")]
	Cycle(NodeId),
	#[error("value is not equal to the one stored in node {0:?}")]
	ValueMismatch(NodeId),
	#[error("node {sibling:?} is not a sibling of {node:?}")]
	NotASibling { node: NodeId, sibling: NodeId },
}

struct Slot<N, S> {
	value: N,
	state: S,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	/// False while the node heads a detached subtree.
	linked: bool,
}

/// Ordered forest of display nodes keyed by [`NodeId`].
pub struct DisplayTree<N, S = ()> {
	slots: Slab<Slot<N, S>>,
	roots: Vec<NodeId>,
	index: HashMap<N, NodeId>,
}

impl<N, S> Default for DisplayTree<N, S> {
	fn default() -> Self {
		Self {
			slots: Slab::new(),
			roots: Vec::new(),
			index: HashMap::default(),
		}
	}
}

impl<N: Clone + Eq + Hash, S> DisplayTree<N, S> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of live nodes, attached or not.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	pub fn roots(&self) -> &[NodeId] {
		&self.roots
	}

	/// Children of `parent`, or the roots for `None`. Unknown ids have none.
	pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
		match parent {
			None => &self.roots,
			Some(id) => self.slots.get(id.0).map_or(&[], |slot| slot.children.as_slice()),
		}
	}

	/// Finds the node holding a value equal to `value`.
	pub fn find(&self, value: &N) -> Option<NodeId> {
		self.index.get(value).copied()
	}

	pub fn contains(&self, value: &N) -> bool {
		self.index.contains_key(value)
	}

	pub fn value(&self, id: NodeId) -> Option<&N> {
		self.slots.get(id.0).map(|slot| &slot.value)
	}

	pub fn state(&self, id: NodeId) -> Option<&S> {
		self.slots.get(id.0).map(|slot| &slot.state)
	}

	pub fn state_mut(&mut self, id: NodeId) -> Option<&mut S> {
		self.slots.get_mut(id.0).map(|slot| &mut slot.state)
	}

	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.slots.get(id.0).and_then(|slot| slot.parent)
	}

	/// Returns true if `id` is live and reachable from the roots.
	pub fn is_attached(&self, id: NodeId) -> bool {
		let mut cursor = Some(id);
		while let Some(current) = cursor {
			match self.slots.get(current.0) {
				Some(slot) if slot.linked => cursor = slot.parent,
				_ => return false,
			}
		}
		true
	}

	/// Returns true if `ancestor` is `id` or one of its ancestors.
	pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
		let mut cursor = Some(id);
		while let Some(current) = cursor {
			if current == ancestor {
				return true;
			}
			cursor = self.parent(current);
		}
		false
	}

	/// Replaces the stored value of `id` with an equal one.
	///
	/// # Errors
	///
	/// [`TreeError::ValueMismatch`] if `value` is not equal to the stored one.
	pub fn refresh_value(&mut self, id: NodeId, value: N) -> Result<(), TreeError> {
		let slot = self.slots.get_mut(id.0).ok_or(TreeError::UnknownNode(id))?;
		if slot.value != value {
			return Err(TreeError::ValueMismatch(id));
		}
		slot.value = value;
		Ok(())
	}

	/// Appends a new node under `parent` (or as a root).
	///
	/// # Errors
	///
	/// - [`TreeError::DuplicateValue`] if an equal value is already present.
	/// - [`TreeError::UnknownNode`] if `parent` is not live.
	pub fn insert_with_state(&mut self, parent: Option<NodeId>, value: N, state: S) -> Result<NodeId, TreeError> {
		if self.index.contains_key(&value) {
			return Err(TreeError::DuplicateValue);
		}
		if let Some(p) = parent
			&& !self.slots.contains(p.0)
		{
			return Err(TreeError::UnknownNode(p));
		}
		let id = NodeId(self.slots.insert(Slot {
			value: value.clone(),
			state,
			parent,
			children: Vec::new(),
			linked: true,
		}));
		self.index.insert(value, id);
		self.siblings_mut(parent).push(id);
		Ok(id)
	}

	/// Removes `id` from its parent's child list, keeping it and its subtree
	/// alive for a later [`attach`](Self::attach).
	///
	/// # Errors
	///
	/// [`TreeError::UnknownNode`] or [`TreeError::Detached`].
	pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
		let slot = self.slots.get_mut(id.0).ok_or(TreeError::UnknownNode(id))?;
		if !slot.linked {
			return Err(TreeError::Detached(id));
		}
		slot.linked = false;
		let parent = slot.parent.take();
		self.siblings_mut(parent).retain(|&sibling| sibling != id);
		Ok(())
	}

	/// Appends a detached node under `parent` (or as a root).
	///
	/// # Errors
	///
	/// - [`TreeError::UnknownNode`] if either node is not live.
	/// - [`TreeError::AlreadyAttached`] if `id` is not detached.
	/// - [`TreeError::Cycle`] if `parent` lies inside the subtree of `id`.
	pub fn attach(&mut self, parent: Option<NodeId>, id: NodeId) -> Result<(), TreeError> {
		let linked = self.slots.get(id.0).ok_or(TreeError::UnknownNode(id))?.linked;
		if linked {
			return Err(TreeError::AlreadyAttached(id));
		}
		if let Some(p) = parent {
			if !self.slots.contains(p.0) {
				return Err(TreeError::UnknownNode(p));
			}
			if self.is_ancestor_or_self(id, p) {
				return Err(TreeError::Cycle(id));
			}
		}
		let slot = &mut self.slots[id.0];
		slot.linked = true;
		slot.parent = parent;
		self.siblings_mut(parent).push(id);
		Ok(())
	}

	/// Moves `id` within its sibling list to sit right after `after`, or to
	/// the front for `None`.
	///
	/// # Errors
	///
	/// - [`TreeError::UnknownNode`] or [`TreeError::Detached`] for `id`.
	/// - [`TreeError::NotASibling`] if `after` has a different parent.
	pub fn move_after_sibling(&mut self, id: NodeId, after: Option<NodeId>) -> Result<(), TreeError> {
		let slot = self.slots.get(id.0).ok_or(TreeError::UnknownNode(id))?;
		if !slot.linked {
			return Err(TreeError::Detached(id));
		}
		let parent = slot.parent;
		let siblings = self.siblings_mut(parent);
		let from = siblings.iter().position(|&s| s == id).ok_or(TreeError::UnknownNode(id))?;
		siblings.remove(from);
		let to = match after {
			None => 0,
			Some(after) => match siblings.iter().position(|&s| s == after) {
				Some(pos) => pos + 1,
				None => {
					siblings.insert(from, id);
					return Err(TreeError::NotASibling { node: id, sibling: after });
				}
			},
		};
		siblings.insert(to, id);
		Ok(())
	}

	/// Destroys `id` and its whole subtree, attached or not.
	///
	/// Returns the number of nodes destroyed.
	///
	/// # Errors
	///
	/// [`TreeError::UnknownNode`] if `id` is not live.
	pub fn remove(&mut self, id: NodeId) -> Result<usize, TreeError> {
		let slot = self.slots.get(id.0).ok_or(TreeError::UnknownNode(id))?;
		if slot.linked {
			self.detach(id)?;
		}
		let mut removed = 0;
		let mut stack = vec![id];
		while let Some(next) = stack.pop() {
			let slot = self.slots.remove(next.0);
			self.index.remove(&slot.value);
			stack.extend(slot.children);
			removed += 1;
		}
		Ok(removed)
	}

	/// Values of the attached nodes in depth-first pre-order, with depths.
	pub fn walk(&self) -> Vec<(usize, &N)> {
		let mut out = Vec::with_capacity(self.slots.len());
		let mut stack: Vec<(usize, NodeId)> = self.roots.iter().rev().map(|&id| (0, id)).collect();
		while let Some((depth, id)) = stack.pop() {
			let slot = &self.slots[id.0];
			out.push((depth, &slot.value));
			stack.extend(slot.children.iter().rev().map(|&child| (depth + 1, child)));
		}
		out
	}

	fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
		match parent {
			None => &mut self.roots,
			Some(p) => &mut self.slots[p.0].children,
		}
	}
}

impl<N: Clone + Eq + Hash, S: Default> DisplayTree<N, S> {
	/// Appends a new node with default state.
	///
	/// # Errors
	///
	/// See [`insert_with_state`](Self::insert_with_state).
	pub fn insert(&mut self, parent: Option<NodeId>, value: N) -> Result<NodeId, TreeError> {
		self.insert_with_state(parent, value, S::default())
	}
}

impl<N: fmt::Debug, S> fmt::Debug for DisplayTree<N, S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DisplayTree")
			.field("len", &self.slots.len())
			.field("roots", &self.roots)
			.finish_non_exhaustive()
	}
}
