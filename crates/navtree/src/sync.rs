//! Incremental display-tree synchronization.
//!
//! [`reconcile`] walks the display tree level by level against a freshly
//! produced [`SourceTree`] and applies the fewest structural changes it can:
//! matching positions are left alone, nodes present elsewhere are moved
//! (keeping their identity and state), and only values absent from the whole
//! source are destroyed.
//!
//! A node that leaves one level is parked rather than destroyed. If it shows up
//! again later in the same pass, even under another parent, it is re-attached;
//! parked nodes still unclaimed when the pass ends are destroyed.

use std::hash::Hash;

use rustc_hash::FxHashSet as HashSet;

use crate::display::{DisplayTree, NodeId, TreeError};
use crate::source::SourceTree;

/// Structural changes applied by one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
	/// Nodes created for values new to the tree.
	pub inserted: usize,
	/// Existing nodes repositioned or re-parented.
	pub moved: usize,
	/// Nodes destroyed, subtrees included.
	pub removed: usize,
}

impl SyncReport {
	/// Returns true if the pass mutated the tree structure.
	pub fn changed(&self) -> bool {
		self.inserted + self.moved + self.removed > 0
	}
}

/// Reconciles `tree` against `source` and reports what changed.
///
/// Afterwards every level of `tree` lists exactly the source values in source
/// order. Stored values are refreshed with their equal source counterparts.
///
/// # Panics
///
/// Panics if the source yields the same value twice, whether among siblings
/// or under different parents, since values identify display nodes.
pub fn reconcile<N, S, T>(tree: &mut DisplayTree<N, S>, source: &T) -> SyncReport
where
	N: Clone + Eq + Hash,
	S: Default,
	T: SourceTree<Node = N>,
{
	let mut pass = Pass {
		tree,
		source,
		parked: Vec::new(),
		placed: HashSet::default(),
		report: SyncReport::default(),
	};
	pass.level(None, source.roots().collect());
	pass.finish()
}

struct Pass<'a, N, S, T> {
	tree: &'a mut DisplayTree<N, S>,
	source: &'a T,
	parked: Vec<NodeId>,
	/// Source values already claimed by an earlier level of this pass.
	placed: HashSet<N>,
	report: SyncReport,
}

impl<N, S, T> Pass<'_, N, S, T>
where
	N: Clone + Eq + Hash,
	S: Default,
	T: SourceTree<Node = N>,
{
	fn level(&mut self, parent: Option<NodeId>, wanted: Vec<N>) {
		let wanted_set: HashSet<&N> = wanted.iter().collect();
		assert_eq!(wanted_set.len(), wanted.len(), "source tree yields duplicate sibling values");
		for value in &wanted {
			assert!(self.placed.insert(value.clone()), "source tree yields a value under more than one parent");
		}

		let mut current: Vec<NodeId> = self.tree.children(parent).to_vec();
		let mut i = 0;
		while i < current.len() || i < wanted.len() {
			let existing = current.get(i).copied();
			let desired = wanted.get(i);

			if let (Some(id), Some(value)) = (existing, desired)
				&& self.tree.value(id) == Some(value)
			{
				i += 1;
				continue;
			}

			// Stale at this level: park it and look at whatever shifts into slot i.
			if let Some(id) = existing {
				let stale = desired.is_none() || self.tree.value(id).is_none_or(|value| !wanted_set.contains(value));
				if stale {
					self.park(id);
					current.remove(i);
					continue;
				}
			}

			let Some(value) = desired else {
				unreachable!("a wanted node left over past the end of the source level");
			};
			let id = self.place(parent, value, &mut current);
			let after = i.checked_sub(1).map(|prev| current[prev]);
			self.reposition(id, after);
			current.insert(i, id);
			i += 1;
		}
		debug_assert_eq!(current.len(), wanted.len());
		assert_eq!(self.tree.children(parent), current.as_slice(), "display level out of sync after reconciliation");

		for (id, value) in current.into_iter().zip(wanted) {
			let _ = self.tree.refresh_value(id, value.clone());
			let children = self.source.children(&value).collect();
			self.level(Some(id), children);
		}
	}

	/// Puts `value` under `parent`, moving its existing node if there is one.
	///
	/// The node ends up last in the parent's child list and is removed from
	/// `current` if it was there.
	fn place(&mut self, parent: Option<NodeId>, value: &N, current: &mut Vec<NodeId>) -> NodeId {
		let Some(id) = self.tree.find(value) else {
			self.report.inserted += 1;
			return match self.tree.insert(parent, value.clone()) {
				Ok(id) => id,
				Err(err) => unreachable!("inserting an absent value failed: {err}"),
			};
		};

		if let Some(pos) = current.iter().position(|&c| c == id) {
			current.remove(pos);
		}
		if let Some(p) = parent {
			assert!(!self.tree.is_ancestor_or_self(id, p), "source tree places a node inside its own subtree");
		}
		match self.tree.detach(id) {
			Ok(()) | Err(TreeError::Detached(_)) => {}
			Err(err) => unreachable!("detaching a live node failed: {err}"),
		}
		self.parked.retain(|&parked| parked != id);
		if let Err(err) = self.tree.attach(parent, id) {
			unreachable!("re-attaching a detached node failed: {err}");
		}
		self.report.moved += 1;
		id
	}

	fn reposition(&mut self, id: NodeId, after: Option<NodeId>) {
		if let Err(err) = self.tree.move_after_sibling(id, after) {
			unreachable!("positioning a freshly placed node failed: {err}");
		}
	}

	fn park(&mut self, id: NodeId) {
		if let Err(err) = self.tree.detach(id) {
			unreachable!("parking a listed node failed: {err}");
		}
		self.parked.push(id);
	}

	fn finish(mut self) -> SyncReport {
		for id in std::mem::take(&mut self.parked) {
			if let Ok(removed) = self.tree.remove(id) {
				self.report.removed += removed;
			}
		}
		if self.report.changed() {
			tracing::debug!(
				inserted = self.report.inserted,
				moved = self.report.moved,
				removed = self.report.removed,
				"display tree reconciled"
			);
		} else {
			tracing::trace!("display tree already in sync");
		}
		self.report
	}
}
