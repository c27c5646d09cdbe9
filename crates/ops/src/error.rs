use std::sync::Arc;

use thiserror::Error;

use crate::types::TypeKey;

/// Errors detected while registering or scanning methods.
///
/// Raised before any operation is invoked; the message names the offending
/// method and the marker it carries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
	/// Parameters left over after the context, progress and config slots.
	#[error("invalid {marker} marker on method {method}: invalid parameters for method")]
	InvalidParameters { method: String, marker: &'static str },
	/// A query whose declared return type is not a sequence.
	#[error("invalid {marker} marker on method {method}: method is required to return a sequence")]
	NotASequence { method: String, marker: &'static str },
	/// An action whose declared return type is a sequence.
	#[error("invalid {marker} marker on method {method}: actions must return a single value or nothing")]
	SequenceAction { method: String, marker: &'static str },
}

/// Errors raised while binding or performing an operation.
#[derive(Error, Debug, Clone)]
pub enum OpError {
	/// The target passed to `handle`/`new_config` is missing, unexpected, or has the wrong type.
	#[error("invalid target: {0}")]
	InvalidTarget(String),
	/// The configuration passed to `perform` is missing or has the wrong type.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
	/// An invoker could not interpret one of its argument slots.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	/// An invoker produced an output that does not match the declared return shape.
	#[error("method {method} returned {found}, expected {expected}")]
	ReturnMismatch {
		method: String,
		expected: &'static str,
		found: &'static str,
	},
	/// The operation observed a cancellation request and stopped.
	#[error("operation cancelled")]
	Cancelled,
	/// The underlying method failed.
	#[error("operation failed: {source}")]
	Failed {
		#[source]
		source: Arc<dyn std::error::Error + Send + Sync>,
	},
	/// Catch-all failure with a message.
	#[error("{0}")]
	Other(String),
}

impl OpError {
	/// Wraps an underlying failure, preserving it as the error source.
	pub fn failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self::Failed { source: Arc::new(source) }
	}

	/// Returns true for the cancellation signal.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	pub(crate) fn wrong_target(expected: TypeKey, found: Option<TypeKey>) -> Self {
		match found {
			Some(found) => Self::InvalidTarget(format!("target is not of type {expected} (found {found})")),
			None => Self::InvalidTarget(format!("missing target of type {expected}")),
		}
	}
}
