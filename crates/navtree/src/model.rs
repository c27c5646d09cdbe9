//! Refreshing navigation model.
//!
//! [`NavSource`] owns the registered type set and the forest built from it,
//! announcing every rebuild to its change listeners. [`NavTreeModel`] owns a
//! [`DisplayTree`] and brings it up to date with [`refresh`](NavTreeModel::refresh),
//! notifying its own listeners only when the pass changed something.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use opsdeck_ops::{OperationCache, RegistrationError, TypeKey};

use crate::builder::{NavForest, NavTreeBuilder};
use crate::display::DisplayTree;
use crate::node::NavNode;
use crate::source::{Listeners, SourceTree, Subscription};
use crate::sync::{SyncReport, reconcile};

/// Registered types and the navigation forest derived from them.
pub struct NavSource {
	builder: NavTreeBuilder,
	cache: Arc<OperationCache>,
	types: Vec<TypeKey>,
	forest: NavForest,
	changed: Listeners<()>,
}

impl NavSource {
	pub fn new(builder: NavTreeBuilder, cache: Arc<OperationCache>) -> Self {
		Self {
			builder,
			cache,
			types: Vec::new(),
			forest: NavForest::default(),
			changed: Listeners::new(),
		}
	}

	pub fn types(&self) -> &[TypeKey] {
		&self.types
	}

	pub fn forest(&self) -> &NavForest {
		&self.forest
	}

	pub fn cache(&self) -> &Arc<OperationCache> {
		&self.cache
	}

	/// Adds `ty` and rebuilds the forest. Returns false if it was already
	/// registered.
	///
	/// # Errors
	///
	/// Registration errors from discovering the operations of any type; the
	/// type set and forest are left unchanged.
	pub fn register(&mut self, ty: TypeKey) -> Result<bool, RegistrationError> {
		if self.types.contains(&ty) {
			return Ok(false);
		}
		self.types.push(ty);
		if let Err(err) = self.rebuild() {
			self.types.pop();
			return Err(err);
		}
		Ok(true)
	}

	/// Removes `ty` and rebuilds the forest. Returns false if it was not
	/// registered.
	///
	/// # Errors
	///
	/// Registration errors from rebuilding; the type set and forest are left
	/// unchanged.
	pub fn unregister(&mut self, ty: TypeKey) -> Result<bool, RegistrationError> {
		let Some(pos) = self.types.iter().position(|&t| t == ty) else {
			return Ok(false);
		};
		self.types.remove(pos);
		if let Err(err) = self.rebuild() {
			self.types.insert(pos, ty);
			return Err(err);
		}
		Ok(true)
	}

	/// Rebuilds the forest from the current type set and notifies listeners.
	///
	/// # Errors
	///
	/// Registration errors from the builder; the previous forest is kept.
	pub fn rebuild(&mut self) -> Result<(), RegistrationError> {
		self.forest = self.builder.build(&self.types, &self.cache)?;
		tracing::debug!(types = self.types.len(), "navigation source changed");
		self.changed.notify(&());
		Ok(())
	}

	/// Subscribes to forest rebuilds.
	pub fn on_change(&self, callback: impl Fn(&()) + Send + Sync + 'static) -> Subscription {
		self.changed.subscribe(callback)
	}

	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		self.changed.unsubscribe(subscription)
	}
}

impl SourceTree for NavSource {
	type Node = NavNode;

	fn roots(&self) -> impl Iterator<Item = NavNode> {
		SourceTree::roots(&self.forest)
	}

	fn children(&self, node: &NavNode) -> impl Iterator<Item = NavNode> {
		SourceTree::children(&self.forest, node)
	}
}

impl fmt::Debug for NavSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavSource")
			.field("types", &self.types)
			.field("forest", &self.forest)
			.field("listeners", &self.changed)
			.finish_non_exhaustive()
	}
}

/// A display tree kept in sync with a source tree on demand.
pub struct NavTreeModel<S = (), N = NavNode> {
	tree: DisplayTree<N, S>,
	refreshed: Listeners<SyncReport>,
}

impl<S, N> Default for NavTreeModel<S, N> {
	fn default() -> Self {
		Self {
			tree: DisplayTree::default(),
			refreshed: Listeners::new(),
		}
	}
}

impl<S: Default, N: Clone + Eq + Hash> NavTreeModel<S, N> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn tree(&self) -> &DisplayTree<N, S> {
		&self.tree
	}

	/// Mutable access for display state. Structural edits are overwritten by
	/// the next refresh.
	pub fn tree_mut(&mut self) -> &mut DisplayTree<N, S> {
		&mut self.tree
	}

	/// Reconciles the display tree against `source`.
	///
	/// Refresh listeners are notified with the report if anything changed.
	pub fn refresh(&mut self, source: &impl SourceTree<Node = N>) -> SyncReport {
		let report = reconcile(&mut self.tree, source);
		if report.changed() {
			self.refreshed.notify(&report);
		}
		report
	}

	/// Subscribes to refreshes that changed the tree.
	pub fn on_refresh(&self, callback: impl Fn(&SyncReport) + Send + Sync + 'static) -> Subscription {
		self.refreshed.subscribe(callback)
	}

	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		self.refreshed.unsubscribe(subscription)
	}
}

impl<S, N: Clone + Eq + Hash> fmt::Debug for NavTreeModel<S, N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavTreeModel")
			.field("len", &self.tree.len())
			.field("listeners", &self.refreshed)
			.finish()
	}
}

#[cfg(test)]
mod tests;
