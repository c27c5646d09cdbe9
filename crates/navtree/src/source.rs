//! Source-of-truth trees and change notification.

use std::fmt;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A freshly produced ordered forest, read level by level.
///
/// Node values are matched by equality, so every value must occur at most
/// once in the whole forest.
pub trait SourceTree {
	type Node: Clone + Eq + Hash;

	/// Root nodes in display order.
	fn roots(&self) -> impl Iterator<Item = Self::Node>;

	/// Children of `node` in display order. May be a one-shot lazy sequence.
	fn children(&self, node: &Self::Node) -> impl Iterator<Item = Self::Node>;
}

impl<T: SourceTree> SourceTree for &T {
	type Node = T::Node;

	fn roots(&self) -> impl Iterator<Item = Self::Node> {
		(**self).roots()
	}

	fn children(&self, node: &Self::Node) -> impl Iterator<Item = Self::Node> {
		(**self).children(node)
	}
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registered callbacks for one kind of event.
///
/// Callbacks run in registration order on the notifying thread. A panicking
/// callback is logged and does not prevent the others from running.
pub struct Listeners<E> {
	next_id: AtomicU64,
	entries: Mutex<Vec<(u64, Callback<E>)>>,
}

impl<E> Default for Listeners<E> {
	fn default() -> Self {
		Self {
			next_id: AtomicU64::new(0),
			entries: Mutex::new(Vec::new()),
		}
	}
}

impl<E> Listeners<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a callback. Dropping the returned [`Subscription`] keeps the
	/// callback registered; pass it to [`unsubscribe`](Self::unsubscribe).
	pub fn subscribe(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		self.entries.lock().push((id, Arc::new(callback)));
		Subscription { id }
	}

	/// Removes a callback. Returns false if it was already removed.
	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		let mut entries = self.entries.lock();
		let before = entries.len();
		entries.retain(|(id, _)| *id != subscription.id);
		entries.len() != before
	}

	/// Invokes every callback with `event`.
	pub fn notify(&self, event: &E) {
		let snapshot: Vec<(u64, Callback<E>)> = self.entries.lock().clone();
		for (id, callback) in snapshot {
			if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
				tracing::error!(listener = id, "listener panicked");
			}
		}
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

impl<E> fmt::Debug for Listeners<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listeners").field("len", &self.len()).finish()
	}
}

/// Token identifying one registered callback.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "keep the subscription to unsubscribe later"]
pub struct Subscription {
	id: u64,
}
