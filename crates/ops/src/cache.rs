//! Per-type operation cache.
//!
//! Entries are bounded by count and optionally by age. An evicted or expired
//! entry is recomputed on next access; since the scanner memoizes operations,
//! recomputation yields the same operation instances.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;
use crate::method::MethodTable;
use crate::operation::{AnyOperation, Operation, StaticQuery};
use crate::scanner::MethodScanner;
use crate::types::{Object, TypeKey};

/// Cache sizing and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
	/// Maximum number of types kept.
	#[serde(default = "default_capacity")]
	pub capacity: NonZeroUsize,
	/// Entries older than this many seconds are recomputed.
	#[serde(default)]
	pub max_age_secs: Option<u64>,
}

fn default_capacity() -> NonZeroUsize {
	NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN)
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			capacity: default_capacity(),
			max_age_secs: None,
		}
	}
}

impl CacheConfig {
	pub fn max_age(&self) -> Option<Duration> {
		self.max_age_secs.map(Duration::from_secs)
	}
}

struct CacheEntry {
	loaded_at: Instant,
	operations: Arc<[AnyOperation]>,
}

/// Memoized list of operations discovered on each type, for one context object.
pub struct OperationCache {
	scanner: MethodScanner,
	config: CacheConfig,
	entries: Mutex<LruCache<TypeKey, CacheEntry>>,
}

impl OperationCache {
	pub fn new(table: Arc<MethodTable>, context: Option<Object>) -> Self {
		Self::with_config(table, context, CacheConfig::default())
	}

	pub fn with_config(table: Arc<MethodTable>, context: Option<Object>, config: CacheConfig) -> Self {
		Self {
			scanner: MethodScanner::new(table, context),
			entries: Mutex::new(LruCache::new(config.capacity)),
			config,
		}
	}

	/// The context object used for the context parameter slot.
	pub fn context(&self) -> Option<&Object> {
		self.scanner.context()
	}

	pub fn config(&self) -> &CacheConfig {
		&self.config
	}

	/// All operations on `ty`: queries first, then actions.
	///
	/// # Errors
	///
	/// Registration errors from scanning `ty`; failures are not cached.
	pub fn operations(&self, ty: TypeKey) -> Result<Arc<[AnyOperation]>, RegistrationError> {
		if let Some(ops) = self.lookup(ty) {
			return Ok(ops);
		}

		let operations: Arc<[AnyOperation]> = self.scanner.find_operations(ty)?.into();
		let mut entries = self.entries.lock();
		if let Some((evicted, _)) = entries.push(
			ty,
			CacheEntry {
				loaded_at: Instant::now(),
				operations: operations.clone(),
			},
		) && evicted != ty
		{
			tracing::trace!(evicted = %evicted, "operation cache evicted entry");
		}
		Ok(operations)
	}

	fn lookup(&self, ty: TypeKey) -> Option<Arc<[AnyOperation]>> {
		let mut entries = self.entries.lock();
		let entry = entries.get(&ty)?;
		if let Some(max_age) = self.config.max_age()
			&& entry.loaded_at.elapsed() > max_age
		{
			entries.pop(&ty);
			tracing::debug!(ty = %ty, "operation cache entry expired");
			return None;
		}
		Some(entry.operations.clone())
	}

	/// The first static query on `ty` that needs no configuration and whose
	/// result item type is exactly `ty`.
	///
	/// # Errors
	///
	/// Registration errors from scanning `ty`.
	pub fn default_query(&self, ty: TypeKey) -> Result<Option<Arc<StaticQuery>>, RegistrationError> {
		let operations = self.operations(ty)?;
		Ok(operations
			.iter()
			.filter_map(AnyOperation::as_static_query)
			.find(|query| !query.requires_configuration() && query.result_type().item_type() == ty)
			.cloned())
	}

	/// Drops the entry for `ty`; the next access recomputes it.
	pub fn invalidate(&self, ty: TypeKey) -> bool {
		let removed = self.entries.lock().pop(&ty).is_some();
		if removed {
			tracing::debug!(ty = %ty, "operation cache entry invalidated");
		}
		removed
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	/// Number of cached types, counting expired entries until their next access.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

impl fmt::Debug for OperationCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OperationCache")
			.field("config", &self.config)
			.field("len", &self.len())
			.finish_non_exhaustive()
	}
}
