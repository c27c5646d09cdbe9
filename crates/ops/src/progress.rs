//! Progress reports and cooperative cancellation.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::OpError;

/// Immutable snapshot of an operation's progress.
///
/// The ratio is clamped to `[0, 1]`; any non-finite input is treated as
/// indeterminate.
#[derive(Debug, Clone)]
pub struct Progress {
	ratio: f64,
	message: Option<String>,
}

impl Progress {
	pub fn new(ratio: f64, message: Option<String>) -> Self {
		let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { f64::NAN };
		Self { ratio, message }
	}

	/// Determinate progress without a message.
	pub fn ratio(ratio: f64) -> Self {
		Self::new(ratio, None)
	}

	/// Indeterminate progress with a status message.
	pub fn message(message: impl Into<String>) -> Self {
		Self::new(f64::NAN, Some(message.into()))
	}

	pub fn indeterminate() -> Self {
		Self::new(f64::NAN, None)
	}

	/// Returns the completion ratio, or NaN when indeterminate.
	#[inline]
	pub fn value(&self) -> f64 {
		self.ratio
	}

	#[inline]
	pub fn is_indeterminate(&self) -> bool {
		self.ratio.is_nan()
	}

	pub fn status(&self) -> Option<&str> {
		self.message.as_deref()
	}
}

impl PartialEq for Progress {
	fn eq(&self, other: &Self) -> bool {
		let same_ratio = (self.is_indeterminate() && other.is_indeterminate()) || self.ratio == other.ratio;
		same_ratio && self.message == other.message
	}
}

/// Progress sink handed to operations, bundled with their cancellation token.
///
/// Operations that run for a while should call [`checkpoint`](Self::checkpoint)
/// at reasonable intervals and return its error unchanged.
#[derive(Clone)]
pub struct ProgressReporter {
	sink: Arc<dyn Fn(Progress) + Send + Sync>,
	cancel: CancellationToken,
}

impl ProgressReporter {
	pub fn new(sink: impl Fn(Progress) + Send + Sync + 'static, cancel: CancellationToken) -> Self {
		Self {
			sink: Arc::new(sink),
			cancel,
		}
	}

	/// A reporter that drops every update and is never cancelled externally.
	pub fn discard() -> Self {
		Self::new(|_| {}, CancellationToken::new())
	}

	/// Delivers one progress update. May be called from any thread.
	pub fn report(&self, progress: Progress) {
		(self.sink)(progress);
	}

	pub fn cancel_token(&self) -> &CancellationToken {
		&self.cancel
	}

	#[inline]
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Returns [`OpError::Cancelled`] once cancellation has been requested.
	pub fn checkpoint(&self) -> Result<(), OpError> {
		if self.cancel.is_cancelled() { Err(OpError::Cancelled) } else { Ok(()) }
	}
}

impl fmt::Debug for ProgressReporter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProgressReporter")
			.field("cancelled", &self.cancel.is_cancelled())
			.finish_non_exhaustive()
	}
}

crate::data_type!(ProgressReporter);
