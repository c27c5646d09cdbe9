//! Navigation over registered data types.
//!
//! Registered types are arranged into a forest by their nearest registered
//! supertype, each node carrying the static operations discovered for its type.
//! A long-lived, stateful display tree is kept in step with that forest by an
//! incremental synchronizer that moves nodes instead of recreating them, so
//! expansion and selection survive a refresh.
//!
//! # Modules
//!
//! - [`builder`] - Forest construction ([`NavTreeBuilder`], [`NavForest`])
//! - [`node`] - Immutable forest nodes ([`NavNode`])
//! - [`source`] - Source trees and change listeners
//! - [`display`] - The stateful [`DisplayTree`]
//! - [`sync`] - Level-by-level [`reconcile`]
//! - [`model`] - [`NavSource`] and the refreshing [`NavTreeModel`]
//!
//! # Flow
//!
//! ```rust,ignore
//! let mut source = NavSource::new(NavTreeBuilder::new(), Arc::new(cache));
//! source.register(Animal::TYPE)?;
//! source.register(Dog::TYPE)?;
//!
//! let mut model = NavTreeModel::<Expanded>::new();
//! let _ = model.on_refresh(|report| tracing::info!(?report, "navigation changed"));
//! model.refresh(&source);
//! ```

pub mod builder;
pub mod display;
pub mod model;
pub mod node;
pub mod source;
pub mod sync;

#[cfg(test)]
mod fixtures;

pub use builder::{Labeler, NavForest, NavTreeBuilder};
pub use display::{DisplayTree, NodeId, TreeError};
pub use model::{NavSource, NavTreeModel};
pub use node::NavNode;
pub use source::{Listeners, SourceTree, Subscription};
pub use sync::{SyncReport, reconcile};
