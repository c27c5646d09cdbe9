//! Method scanning and type analysis.
//!
//! [`TypeAnalysis`] classifies the declared parameters of one [`MethodDef`]
//! into the context, progress and config slots and derives the result type.
//! [`MethodScanner`] walks a [`MethodTable`] for one owner type and lazily
//! turns each marked method into an [`AnyOperation`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::error::RegistrationError;
use crate::method::{MarkerKind, MethodDef, MethodTable, Receiver, ReturnType};
use crate::operation::{
	AnyOperation, Binding, DrillDown, InstanceAction, InstanceQuery, MethodKey, OperationKind, OperationMeta, Performer, ResultType,
	StaticAction, StaticQuery,
};
use crate::progress::ProgressReporter;
use crate::types::{Object, TypeKey, Typed};

/// Immutable facts derived from one method's declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeAnalysis {
	is_static: bool,
	kind: OperationKind,
	context_type: Option<TypeKey>,
	has_progress: bool,
	config_type: Option<TypeKey>,
	result_type: ResultType,
}

impl TypeAnalysis {
	/// Classifies `method`'s parameters, greedily and in positional order:
	/// context, then progress, then config.
	///
	/// With a context object the first parameter is the context slot only if
	/// its declared type accepts the object. Without one, any first parameter
	/// other than the progress reporter is taken as the context slot.
	///
	/// # Errors
	///
	/// - [`RegistrationError::InvalidParameters`] if parameters remain after the
	///   three slots are filled.
	/// - [`RegistrationError::NotASequence`] for a query not returning a sequence.
	/// - [`RegistrationError::SequenceAction`] for an action returning a sequence.
	pub fn analyze(method: &MethodDef, context: Option<&Object>) -> Result<Self, RegistrationError> {
		let mut rest = method.params;

		let context_type = match rest.split_first() {
			Some((first, tail)) if accepts_context(first, context) => {
				rest = tail;
				Some(*first)
			}
			_ => None,
		};

		let has_progress = match rest.split_first() {
			Some((first, tail)) if first.is_supertype_of(&ProgressReporter::TYPE) => {
				rest = tail;
				true
			}
			_ => false,
		};

		let config_type = match rest {
			[] => None,
			[config] => Some(*config),
			_ => {
				return Err(RegistrationError::InvalidParameters {
					method: method.qualified_name(),
					marker: method.marker.description(),
				});
			}
		};

		let (kind, result_type) = match (method.marker.kind, method.returns) {
			(MarkerKind::Query, ReturnType::Sequence(item)) => (OperationKind::Query, ResultType::Sequence(item)),
			(MarkerKind::Query, _) => {
				return Err(RegistrationError::NotASequence {
					method: method.qualified_name(),
					marker: method.marker.description(),
				});
			}
			(MarkerKind::Action, ReturnType::Unit) => (OperationKind::Action, ResultType::None),
			(MarkerKind::Action, ReturnType::Value(ty)) if ty.is_none() => (OperationKind::Action, ResultType::None),
			(MarkerKind::Action, ReturnType::Value(ty)) => (OperationKind::Action, ResultType::Single(ty)),
			(MarkerKind::Action, ReturnType::Sequence(_)) => {
				return Err(RegistrationError::SequenceAction {
					method: method.qualified_name(),
					marker: method.marker.description(),
				});
			}
		};

		Ok(Self {
			is_static: method.receiver == Receiver::Static,
			kind,
			context_type,
			has_progress,
			config_type,
			result_type,
		})
	}

	#[inline]
	pub fn is_static(&self) -> bool {
		self.is_static
	}

	#[inline]
	pub fn kind(&self) -> OperationKind {
		self.kind
	}

	#[inline]
	pub fn has_context(&self) -> bool {
		self.context_type.is_some()
	}

	#[inline]
	pub fn has_progress(&self) -> bool {
		self.has_progress
	}

	#[inline]
	pub fn has_config(&self) -> bool {
		self.config_type.is_some()
	}

	/// Declared type of the context parameter, if present.
	pub fn context_type(&self) -> Option<TypeKey> {
		self.context_type
	}

	/// Configuration type, or [`TypeKey::NONE`] when there is no config slot.
	pub fn config_type(&self) -> TypeKey {
		self.config_type.unwrap_or(TypeKey::NONE)
	}

	pub fn result_type(&self) -> ResultType {
		self.result_type
	}
}

fn accepts_context(param: &TypeKey, context: Option<&Object>) -> bool {
	match context {
		Some(ctx) => param.is_supertype_of(&ctx.type_key()),
		None => !param.is_supertype_of(&ProgressReporter::TYPE),
	}
}

/// One scanned method with its analysis and its lazily built operation.
pub struct OperationInfo {
	method: &'static MethodDef,
	analysis: TypeAnalysis,
	operation: OnceLock<AnyOperation>,
}

impl OperationInfo {
	pub fn method(&self) -> &'static MethodDef {
		self.method
	}

	pub fn analysis(&self) -> &TypeAnalysis {
		&self.analysis
	}

	/// Returns the operation, building it on first request.
	///
	/// # Errors
	///
	/// Registration errors from scanning a query's result item type.
	fn operation(&self, scanner: &MethodScanner) -> Result<AnyOperation, RegistrationError> {
		if let Some(op) = self.operation.get() {
			return Ok(op.clone());
		}
		let drill_down = match self.analysis.kind {
			OperationKind::Query => scanner.drill_down(self.analysis.result_type.item_type())?,
			OperationKind::Action => DrillDown::default(),
		};
		let op = build_operation(self.method, self.analysis, scanner.context.clone(), drill_down);
		Ok(self.operation.get_or_init(|| op).clone())
	}
}

impl fmt::Debug for OperationInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OperationInfo")
			.field("method", &self.method.qualified_name())
			.field("analysis", &self.analysis)
			.field("built", &self.operation.get().is_some())
			.finish()
	}
}

fn build_operation(method: &'static MethodDef, analysis: TypeAnalysis, context: Option<Object>, drill_down: DrillDown) -> AnyOperation {
	let binding = if analysis.is_static { Binding::Static } else { Binding::Instance(method.owner) };
	let meta = OperationMeta {
		label: method.marker.label.to_string(),
		config_type: analysis.config_type(),
		result_type: analysis.result_type,
		binding,
		kind: analysis.kind,
		source: MethodKey {
			owner: method.owner,
			name: method.name,
		},
	};
	let performer = Arc::new(Performer::new(method, analysis, context));

	match (binding, analysis.kind) {
		(Binding::Static, OperationKind::Action) => AnyOperation::StaticAction(Arc::new(StaticAction::new(meta, performer, drill_down))),
		(Binding::Instance(_), OperationKind::Action) => {
			AnyOperation::InstanceAction(Arc::new(InstanceAction::new(meta, performer, drill_down)))
		}
		(Binding::Static, OperationKind::Query) => AnyOperation::StaticQuery(Arc::new(StaticQuery::new(meta, performer, drill_down))),
		(Binding::Instance(_), OperationKind::Query) => AnyOperation::InstanceQuery(Arc::new(InstanceQuery::new(meta, performer, drill_down))),
	}
}

/// Discovers marked methods in a [`MethodTable`] for a fixed context object.
///
/// Scanned methods are memoized, so each method yields exactly one operation
/// instance per scanner.
pub struct MethodScanner {
	table: Arc<MethodTable>,
	context: Option<Object>,
	infos: Mutex<HashMap<usize, Arc<OperationInfo>>>,
}

impl MethodScanner {
	pub fn new(table: Arc<MethodTable>, context: Option<Object>) -> Self {
		Self {
			table,
			context,
			infos: Mutex::new(HashMap::default()),
		}
	}

	pub fn table(&self) -> &Arc<MethodTable> {
		&self.table
	}

	pub fn context(&self) -> Option<&Object> {
		self.context.as_ref()
	}

	/// Analyzes every method on `owner` carrying a marker of `kind`, in
	/// registration order.
	///
	/// # Errors
	///
	/// The first [`RegistrationError`] encountered.
	pub fn scan(&self, owner: TypeKey, kind: MarkerKind) -> Result<Vec<Arc<OperationInfo>>, RegistrationError> {
		self.table.marked(owner, kind).map(|def| self.info(def)).collect()
	}

	fn info(&self, method: &'static MethodDef) -> Result<Arc<OperationInfo>, RegistrationError> {
		let key = method as *const MethodDef as usize;
		if let Some(info) = self.infos.lock().get(&key) {
			return Ok(info.clone());
		}
		let analysis = TypeAnalysis::analyze(method, self.context.as_ref())?;
		tracing::trace!(method = %method.qualified_name(), ?analysis, "scanned method");
		let info = Arc::new(OperationInfo {
			method,
			analysis,
			operation: OnceLock::new(),
		});
		Ok(self.infos.lock().entry(key).or_insert(info).clone())
	}

	/// Builds the operations declared on `owner` with a marker of `kind`.
	///
	/// # Errors
	///
	/// The first [`RegistrationError`] encountered.
	pub fn operations(&self, owner: TypeKey, kind: MarkerKind) -> Result<Vec<AnyOperation>, RegistrationError> {
		self.scan(owner, kind)?.iter().map(|info| info.operation(self)).collect()
	}

	/// Builds every operation on `owner`: queries first, then actions.
	///
	/// # Errors
	///
	/// The first [`RegistrationError`] encountered.
	pub fn find_operations(&self, owner: TypeKey) -> Result<Vec<AnyOperation>, RegistrationError> {
		let mut ops = self.operations(owner, MarkerKind::Query)?;
		ops.extend(self.operations(owner, MarkerKind::Action)?);
		tracing::debug!(owner = %owner, operations = ops.len(), "discovered operations");
		Ok(ops)
	}

	/// Operations exposed by a query's result item type, one level deep.
	fn drill_down(&self, item: TypeKey) -> Result<DrillDown, RegistrationError> {
		let mut drill_down = DrillDown::default();
		if item.is_none() {
			return Ok(drill_down);
		}
		for kind in [MarkerKind::Query, MarkerKind::Action] {
			for method in self.table.marked(item, kind) {
				let analysis = TypeAnalysis::analyze(method, self.context.as_ref())?;
				let op = build_operation(method, analysis, self.context.clone(), DrillDown::default());
				if op.is_static() {
					drill_down.statics.push(op);
				} else {
					drill_down.instances.push(op);
				}
			}
		}
		Ok(drill_down)
	}
}

impl fmt::Debug for MethodScanner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodScanner")
			.field("table", &self.table.label())
			.field("context", &self.context)
			.field("scanned", &self.infos.lock().len())
			.finish()
	}
}
