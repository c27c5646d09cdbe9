//! Operation model for administrative data browsing.
//!
//! Data types expose two kinds of operations: read-only **queries** producing a
//! lazy sequence of items, and mutating **actions** producing one result. Each
//! is either static or bound to a target instance.
//!
//! # Modules
//!
//! - [`types`] - Type descriptors ([`TypeKey`]) and type-tagged values ([`Object`])
//! - [`method`] - Explicit method registration ([`MethodDef`], [`MethodTable`])
//! - [`scanner`] - Parameter classification and operation discovery
//! - [`operation`] - The four operation variants and their [`Handle`]s
//! - [`cache`] - Bounded per-type operation cache
//! - [`exec`] - One-at-a-time background execution
//! - [`label`] - Display labels from identifiers
//!
//! # Flow
//!
//! ```rust,ignore
//! let cache = OperationCache::new(MethodTable::global(), Some(context));
//! let query = cache.default_query(Dog::TYPE)?.expect("identity query");
//! let dogs = query.handle(None)?.perform(None, &ProgressReporter::discard())?;
//! ```

pub mod cache;
pub mod error;
pub mod exec;
pub mod label;
pub mod method;
pub mod operation;
pub mod progress;
pub mod scanner;
pub mod types;

#[cfg(test)]
mod fixtures;

pub use cache::{CacheConfig, OperationCache};
pub use error::{OpError, RegistrationError};
pub use exec::{TaskEvent, TaskId, TaskManager};
pub use method::{
	Arg, Args, DuplicatePolicy, Invoker, Marker, MarkerKind, MethodDef, MethodReg, MethodTable, MethodTableBuilder, Output,
	Receiver, ResultStream, ReturnType,
};
pub use operation::{
	Action, AnyOperation, Binding, Handle, InstanceAction, InstanceOperation, InstanceQuery, MethodKey, Operation, OperationKind,
	OperationMeta, Query, ResultType, StaticAction, StaticOperation, StaticQuery,
};
pub use progress::{Progress, ProgressReporter};
pub use scanner::{MethodScanner, OperationInfo, TypeAnalysis};
pub use types::{Constructors, Object, TypeKey, Typed};
pub use tokio_util::sync::CancellationToken;
/// Re-exported for [`inventory::submit!`] registrations.
pub use inventory;
