//! Operation model.
//!
//! Operations vary along two axes: binding ([`Binding::Static`] or
//! [`Binding::Instance`]) and kind ([`OperationKind::Action`] or
//! [`OperationKind::Query`]). The four concrete variants share the
//! [`Operation`] capability interface and are carried around as
//! [`AnyOperation`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::OpError;
use crate::method::{Arg, Args, MethodDef, Output, ResultStream};
use crate::progress::ProgressReporter;
use crate::scanner::TypeAnalysis;
use crate::types::{Object, TypeKey};

/// Whether an operation is bound to a target instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
	Static,
	/// Bound to one target assignable to the given type.
	Instance(TypeKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Mutating; produces one result.
	Action,
	/// Read-only; produces a lazy sequence of result items.
	Query,
}

/// Result-type descriptor of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
	/// The "no result" sentinel.
	None,
	Single(TypeKey),
	/// A lazy sequence of items of the given type.
	Sequence(TypeKey),
}

impl ResultType {
	/// Returns the single result type, or the item type for sequences.
	pub fn item_type(&self) -> TypeKey {
		match self {
			Self::None => TypeKey::NONE,
			Self::Single(ty) | Self::Sequence(ty) => *ty,
		}
	}
}

/// Identity of the method an operation was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
	pub owner: TypeKey,
	pub name: &'static str,
}

/// Descriptive metadata shared by all operations; drives value equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationMeta {
	pub label: String,
	pub config_type: TypeKey,
	pub result_type: ResultType,
	pub binding: Binding,
	pub kind: OperationKind,
	pub source: MethodKey,
}

/// Invocation state shared by an operation and every handle derived from it.
pub(crate) struct Performer {
	method: &'static MethodDef,
	analysis: TypeAnalysis,
	context: Option<Object>,
}

impl Performer {
	pub(crate) fn new(method: &'static MethodDef, analysis: TypeAnalysis, context: Option<Object>) -> Self {
		Self {
			method,
			analysis,
			context,
		}
	}

	fn call(&self, target: Option<&Object>, config: Option<Object>, progress: &ProgressReporter) -> Result<Output, OpError> {
		progress.checkpoint()?;

		let mut args = Args::default();
		if self.analysis.has_context() {
			match &self.context {
				Some(ctx) => args.push(Arg::Context(ctx.clone())),
				None => {
					return Err(OpError::InvalidArgument(format!(
						"{} declares a context parameter but no context object is configured",
						self.method.qualified_name()
					)));
				}
			}
		}
		if self.analysis.has_progress() {
			args.push(Arg::Progress(progress.clone()));
		}
		if let Some(config) = config.filter(|_| self.analysis.has_config()) {
			args.push(Arg::Config(config));
		}

		tracing::trace!(method = %self.method.qualified_name(), slots = args.len(), "invoking operation method");
		(self.method.invoke)(target, &args)
	}
}

/// Converts a raw invoker output into the typed result of one operation kind.
type Finish<R> = fn(&MethodDef, Output) -> Result<R, OpError>;

fn finish_action(method: &MethodDef, output: Output) -> Result<Option<Object>, OpError> {
	match output {
		Output::Unit => Ok(None),
		Output::Value(value) => Ok(Some(value)),
		other => Err(OpError::ReturnMismatch {
			method: method.qualified_name(),
			expected: "a value or nothing",
			found: other.shape(),
		}),
	}
}

fn finish_query(method: &MethodDef, output: Output) -> Result<ResultStream, OpError> {
	match output {
		Output::Sequence(stream) => Ok(stream),
		other => Err(OpError::ReturnMismatch {
			method: method.qualified_name(),
			expected: "a sequence",
			found: other.shape(),
		}),
	}
}

/// Common state of the four operation variants.
struct Core {
	meta: OperationMeta,
	performer: Arc<Performer>,
	drill_down: DrillDown,
}

impl Core {
	fn handle<R>(&self, target: Option<Object>, finish: Finish<R>) -> Handle<R> {
		Handle {
			performer: self.performer.clone(),
			config_type: self.meta.config_type,
			label: self.meta.label.clone(),
			target,
			finish,
		}
	}

	fn check_instance_target(&self, target: Option<&Object>) -> Result<Object, OpError> {
		let Binding::Instance(target_type) = self.meta.binding else {
			unreachable!("instance variant with static binding");
		};
		match target {
			Some(target) if target.is_instance_of(target_type) => Ok(target.clone()),
			Some(target) => Err(OpError::wrong_target(target_type, Some(target.type_key()))),
			None => Err(OpError::wrong_target(target_type, None)),
		}
	}

	fn check_static_target(&self, target: Option<&Object>) -> Result<(), OpError> {
		match target {
			None => Ok(()),
			Some(target) => Err(OpError::InvalidTarget(format!(
				"static operation \"{}\" does not accept a target (got {})",
				self.meta.label,
				target.type_key()
			))),
		}
	}

	fn new_static_config(&self) -> Option<Object> {
		let ty = self.meta.config_type;
		if ty.is_none() {
			return None;
		}
		match ty.construct_default() {
			Some(config) => Some(config),
			None => panic!("can't instantiate {ty}: no default constructor declared"),
		}
	}

	fn new_instance_config(&self, target: &Object) -> Option<Object> {
		let ty = self.meta.config_type;
		if ty.is_none() {
			return None;
		}
		match ty.construct_from_target(target).or_else(|| ty.construct_default()) {
			Some(config) => Some(config),
			None => panic!("can't instantiate {ty}: no usable constructor for target {}", target.type_key()),
		}
	}
}

impl fmt::Debug for Core {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Operation")
			.field("label", &self.meta.label)
			.field("kind", &self.meta.kind)
			.field("binding", &self.meta.binding)
			.field("config_type", &self.meta.config_type)
			.field("result_type", &self.meta.result_type)
			.finish()
	}
}

/// An operation bound to its target (if any), ready to execute.
///
/// `perform` runs synchronously on the calling thread; progress updates may be
/// delivered on any thread.
pub struct Handle<R> {
	performer: Arc<Performer>,
	config_type: TypeKey,
	label: String,
	target: Option<Object>,
	finish: Finish<R>,
}

impl<R> Clone for Handle<R> {
	fn clone(&self) -> Self {
		Self {
			performer: self.performer.clone(),
			config_type: self.config_type,
			label: self.label.clone(),
			target: self.target.clone(),
			finish: self.finish,
		}
	}
}

impl<R> Handle<R> {
	pub fn target(&self) -> Option<&Object> {
		self.target.as_ref()
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	/// Performs the operation.
	///
	/// # Errors
	///
	/// - [`OpError::InvalidConfig`] if a required configuration is missing or
	///   has the wrong type, or one is passed to an operation that takes none.
	/// - [`OpError::Cancelled`] if cancellation was requested before the call
	///   or observed by the method.
	/// - Any failure raised by the underlying method, unchanged.
	pub fn perform(&self, config: Option<Object>, progress: &ProgressReporter) -> Result<R, OpError> {
		match (&config, self.config_type.is_none()) {
			(None, true) => {}
			(Some(config), false) if config.is_instance_of(self.config_type) => {}
			(None, false) => {
				return Err(OpError::InvalidConfig(format!("\"{}\" requires a {} configuration", self.label, self.config_type)));
			}
			(Some(config), false) => {
				return Err(OpError::InvalidConfig(format!(
					"\"{}\" expects a {} configuration, got {}",
					self.label,
					self.config_type,
					config.type_key()
				)));
			}
			(Some(config), true) => {
				return Err(OpError::InvalidConfig(format!(
					"\"{}\" takes no configuration, got {}",
					self.label,
					config.type_key()
				)));
			}
		}

		let output = match self.performer.call(self.target.as_ref(), config, progress) {
			Ok(output) => output,
			Err(err) if !err.is_cancelled() && progress.is_cancelled() => {
				tracing::trace!(label = %self.label, error = %err, "failure after cancellation reported as cancelled");
				return Err(OpError::Cancelled);
			}
			Err(err) => return Err(err),
		};
		(self.finish)(self.performer.method, output)
	}
}

impl<R> fmt::Debug for Handle<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Handle")
			.field("label", &self.label)
			.field("target", &self.target)
			.finish_non_exhaustive()
	}
}

/// Capability interface shared by every operation variant.
pub trait Operation: fmt::Debug + Send + Sync {
	/// What a handle of this operation produces.
	type Output;

	fn meta(&self) -> &OperationMeta;

	fn label(&self) -> &str {
		&self.meta().label
	}

	/// Configuration type, or [`TypeKey::NONE`] if none is needed.
	fn config_type(&self) -> TypeKey {
		self.meta().config_type
	}

	fn result_type(&self) -> ResultType {
		self.meta().result_type
	}

	/// True unless the configuration type is the "no configuration" sentinel.
	fn requires_configuration(&self) -> bool {
		!self.config_type().is_none()
	}

	/// Binds the operation to `target`.
	///
	/// # Errors
	///
	/// [`OpError::InvalidTarget`] if a static operation receives a target, or an
	/// instance operation receives none or one of the wrong type.
	fn handle(&self, target: Option<&Object>) -> Result<Handle<Self::Output>, OpError>;
}

/// An operation not bound to a target.
pub trait StaticOperation: Operation {
	/// Creates a fresh configuration via the no-argument constructor.
	///
	/// Returns `None` when no configuration is required.
	///
	/// # Panics
	///
	/// Panics if the configuration type declares no default constructor.
	fn new_config(&self) -> Option<Object>;

	fn perform(&self, config: Option<Object>, progress: &ProgressReporter) -> Result<Self::Output, OpError> {
		self.handle(None)?.perform(config, progress)
	}
}

/// An operation bound to a target of a declared type.
pub trait InstanceOperation: Operation {
	fn target_type(&self) -> TypeKey;

	/// Creates a fresh configuration for `target`, preferring the
	/// target-accepting constructor and falling back to the default one.
	///
	/// # Errors
	///
	/// [`OpError::InvalidTarget`] if `target` has the wrong type.
	///
	/// # Panics
	///
	/// Panics if neither constructor can produce a configuration.
	fn new_config(&self, target: &Object) -> Result<Option<Object>, OpError>;

	fn perform(&self, target: &Object, config: Option<Object>, progress: &ProgressReporter) -> Result<Self::Output, OpError> {
		self.handle(Some(target))?.perform(config, progress)
	}
}

/// Read-only operation producing a lazy sequence.
pub trait Query: Operation<Output = ResultStream> {
	/// Type of the items the sequence yields.
	fn result_item_type(&self) -> TypeKey {
		self.result_type().item_type()
	}

	/// Static operations available on the result item type.
	fn static_operations(&self) -> &[AnyOperation];

	/// Instance operations applicable to individual result items.
	fn instance_operations(&self) -> &[AnyOperation];
}

/// Mutating operation producing at most one result.
pub trait Action: Operation<Output = Option<Object>> {}

/// Drill-down operations discovered on a query's result item type.
#[derive(Debug, Default)]
pub(crate) struct DrillDown {
	pub(crate) statics: Vec<AnyOperation>,
	pub(crate) instances: Vec<AnyOperation>,
}

macro_rules! operation_variant {
	($(#[$attr:meta])* $name:ident) => {
		$(#[$attr])*
		pub struct $name {
			core: Core,
		}

		impl $name {
			pub(crate) fn new(meta: OperationMeta, performer: Arc<Performer>, drill_down: DrillDown) -> Self {
				Self {
					core: Core {
						meta,
						performer,
						drill_down,
					},
				}
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				fmt::Debug::fmt(&self.core, f)
			}
		}

		impl PartialEq for $name {
			fn eq(&self, other: &Self) -> bool {
				self.core.meta == other.core.meta
			}
		}

		impl Eq for $name {}

		impl Hash for $name {
			fn hash<H: Hasher>(&self, state: &mut H) {
				self.core.meta.hash(state);
			}
		}
	};
}

operation_variant!(
	/// Action not bound to a target.
	StaticAction
);
operation_variant!(
	/// Action bound to a target instance.
	InstanceAction
);
operation_variant!(
	/// Query not bound to a target.
	StaticQuery
);
operation_variant!(
	/// Query bound to a target instance.
	InstanceQuery
);

impl Operation for StaticAction {
	type Output = Option<Object>;

	fn meta(&self) -> &OperationMeta {
		&self.core.meta
	}

	fn handle(&self, target: Option<&Object>) -> Result<Handle<Self::Output>, OpError> {
		self.core.check_static_target(target)?;
		Ok(self.core.handle(None, finish_action))
	}
}

impl StaticOperation for StaticAction {
	fn new_config(&self) -> Option<Object> {
		self.core.new_static_config()
	}
}

impl Action for StaticAction {}

impl Operation for InstanceAction {
	type Output = Option<Object>;

	fn meta(&self) -> &OperationMeta {
		&self.core.meta
	}

	fn handle(&self, target: Option<&Object>) -> Result<Handle<Self::Output>, OpError> {
		let target = self.core.check_instance_target(target)?;
		Ok(self.core.handle(Some(target), finish_action))
	}
}

impl InstanceOperation for InstanceAction {
	fn target_type(&self) -> TypeKey {
		binding_target(&self.core.meta)
	}

	fn new_config(&self, target: &Object) -> Result<Option<Object>, OpError> {
		let target = self.core.check_instance_target(Some(target))?;
		Ok(self.core.new_instance_config(&target))
	}
}

impl Action for InstanceAction {}

impl Operation for StaticQuery {
	type Output = ResultStream;

	fn meta(&self) -> &OperationMeta {
		&self.core.meta
	}

	fn handle(&self, target: Option<&Object>) -> Result<Handle<Self::Output>, OpError> {
		self.core.check_static_target(target)?;
		Ok(self.core.handle(None, finish_query))
	}
}

impl StaticOperation for StaticQuery {
	fn new_config(&self) -> Option<Object> {
		self.core.new_static_config()
	}
}

impl Query for StaticQuery {
	fn static_operations(&self) -> &[AnyOperation] {
		&self.core.drill_down.statics
	}

	fn instance_operations(&self) -> &[AnyOperation] {
		&self.core.drill_down.instances
	}
}

impl Operation for InstanceQuery {
	type Output = ResultStream;

	fn meta(&self) -> &OperationMeta {
		&self.core.meta
	}

	fn handle(&self, target: Option<&Object>) -> Result<Handle<Self::Output>, OpError> {
		let target = self.core.check_instance_target(target)?;
		Ok(self.core.handle(Some(target), finish_query))
	}
}

impl InstanceOperation for InstanceQuery {
	fn target_type(&self) -> TypeKey {
		binding_target(&self.core.meta)
	}

	fn new_config(&self, target: &Object) -> Result<Option<Object>, OpError> {
		let target = self.core.check_instance_target(Some(target))?;
		Ok(self.core.new_instance_config(&target))
	}
}

impl Query for InstanceQuery {
	fn static_operations(&self) -> &[AnyOperation] {
		&self.core.drill_down.statics
	}

	fn instance_operations(&self) -> &[AnyOperation] {
		&self.core.drill_down.instances
	}
}

fn binding_target(meta: &OperationMeta) -> TypeKey {
	match meta.binding {
		Binding::Instance(ty) => ty,
		Binding::Static => TypeKey::NONE,
	}
}

/// Tagged union over the four operation variants.
///
/// Equality and hashing are by value ([`OperationMeta`]).
#[derive(Debug, Clone)]
pub enum AnyOperation {
	StaticAction(Arc<StaticAction>),
	InstanceAction(Arc<InstanceAction>),
	StaticQuery(Arc<StaticQuery>),
	InstanceQuery(Arc<InstanceQuery>),
}

impl AnyOperation {
	pub fn meta(&self) -> &OperationMeta {
		match self {
			Self::StaticAction(op) => op.meta(),
			Self::InstanceAction(op) => op.meta(),
			Self::StaticQuery(op) => op.meta(),
			Self::InstanceQuery(op) => op.meta(),
		}
	}

	pub fn label(&self) -> &str {
		&self.meta().label
	}

	pub fn config_type(&self) -> TypeKey {
		self.meta().config_type
	}

	pub fn result_type(&self) -> ResultType {
		self.meta().result_type
	}

	pub fn requires_configuration(&self) -> bool {
		!self.config_type().is_none()
	}

	pub fn kind(&self) -> OperationKind {
		self.meta().kind
	}

	pub fn binding(&self) -> Binding {
		self.meta().binding
	}

	#[inline]
	pub fn is_static(&self) -> bool {
		matches!(self, Self::StaticAction(_) | Self::StaticQuery(_))
	}

	#[inline]
	pub fn is_query(&self) -> bool {
		matches!(self, Self::StaticQuery(_) | Self::InstanceQuery(_))
	}

	pub fn as_static_action(&self) -> Option<&Arc<StaticAction>> {
		match self {
			Self::StaticAction(op) => Some(op),
			_ => None,
		}
	}

	pub fn as_instance_action(&self) -> Option<&Arc<InstanceAction>> {
		match self {
			Self::InstanceAction(op) => Some(op),
			_ => None,
		}
	}

	pub fn as_static_query(&self) -> Option<&Arc<StaticQuery>> {
		match self {
			Self::StaticQuery(op) => Some(op),
			_ => None,
		}
	}

	pub fn as_instance_query(&self) -> Option<&Arc<InstanceQuery>> {
		match self {
			Self::InstanceQuery(op) => Some(op),
			_ => None,
		}
	}

	/// Creates a fresh configuration, dispatching on the binding.
	///
	/// # Errors
	///
	/// [`OpError::InvalidTarget`] under the same rules as [`Operation::handle`].
	pub fn new_config(&self, target: Option<&Object>) -> Result<Option<Object>, OpError> {
		match self {
			Self::StaticAction(op) => op.core.check_static_target(target).map(|()| op.new_config()),
			Self::StaticQuery(op) => op.core.check_static_target(target).map(|()| op.new_config()),
			Self::InstanceAction(op) => match target {
				Some(target) => op.new_config(target),
				None => Err(OpError::wrong_target(op.target_type(), None)),
			},
			Self::InstanceQuery(op) => match target {
				Some(target) => op.new_config(target),
				None => Err(OpError::wrong_target(op.target_type(), None)),
			},
		}
	}
}

impl PartialEq for AnyOperation {
	fn eq(&self, other: &Self) -> bool {
		self.meta() == other.meta()
	}
}

impl Eq for AnyOperation {}

impl Hash for AnyOperation {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.meta().hash(state);
	}
}
