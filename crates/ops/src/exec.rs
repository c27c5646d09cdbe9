//! Background execution of operations, one task at a time.
//!
//! [`TaskManager`] runs blocking work on the tokio blocking pool. Starting a
//! new task cancels the outstanding one. Status changes are delivered to a
//! single listener, on the worker thread for everything but
//! [`TaskEvent::Started`].

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::OpError;

/// Identifies one task started by a [`TaskManager`]; never zero.
pub type TaskId = u64;

/// Status change of a managed task.
#[derive(Debug)]
pub enum TaskEvent<R> {
	Started(TaskId),
	/// The task was cancelled or superseded; its outcome, if any, is discarded.
	Cancelled(TaskId),
	Failed(TaskId, OpError),
	Completed(TaskId, R),
}

impl<R> TaskEvent<R> {
	pub fn id(&self) -> TaskId {
		match self {
			Self::Started(id) | Self::Cancelled(id) | Self::Failed(id, _) | Self::Completed(id, _) => *id,
		}
	}
}

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(1)
			.thread_name("opsdeck-exec")
			.build()
			.expect("failed to build opsdeck-exec global tokio runtime")
	});
	runtime.handle().clone()
}

#[derive(Debug)]
struct Running {
	id: TaskId,
	cancel: CancellationToken,
}

struct Shared<R> {
	next_id: AtomicU64,
	current: Mutex<Option<Running>>,
	listener: Box<dyn Fn(TaskEvent<R>) + Send + Sync>,
}

impl<R> Shared<R> {
	fn emit(&self, event: TaskEvent<R>) {
		(self.listener)(event);
	}

	/// Clears the current slot if it still belongs to `id`.
	fn release(&self, id: TaskId) {
		let mut current = self.current.lock();
		if current.as_ref().is_some_and(|running| running.id == id) {
			*current = None;
		}
	}
}

/// Runs at most one task at a time and reports its status.
pub struct TaskManager<R> {
	shared: Arc<Shared<R>>,
}

impl<R: Send + 'static> TaskManager<R> {
	pub fn new(listener: impl Fn(TaskEvent<R>) + Send + Sync + 'static) -> Self {
		Self {
			shared: Arc::new(Shared {
				next_id: AtomicU64::new(0),
				current: Mutex::new(None),
				listener: Box::new(listener),
			}),
		}
	}

	/// Starts `work` in the background, cancelling any outstanding task.
	///
	/// `work` receives the task's cancellation token and should observe it,
	/// typically through a [`ProgressReporter`](crate::ProgressReporter).
	pub fn start<F>(&self, work: F) -> TaskId
	where
		F: FnOnce(CancellationToken) -> Result<R, OpError> + Send + 'static,
	{
		let id = self.shared.next_id.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
		let cancel = CancellationToken::new();

		let superseded = self.shared.current.lock().replace(Running {
			id,
			cancel: cancel.clone(),
		});
		if let Some(previous) = superseded {
			tracing::debug!(task = previous.id, by = id, "task superseded");
			previous.cancel.cancel();
		}

		self.shared.emit(TaskEvent::Started(id));

		let shared = self.shared.clone();
		tracing::trace!(task = id, "exec.spawn_blocking");
		runtime_handle().spawn_blocking(move || {
			let outcome = catch_unwind(AssertUnwindSafe(|| work(cancel.clone())));
			shared.release(id);

			let event = match outcome {
				_ if cancel.is_cancelled() => TaskEvent::Cancelled(id),
				Ok(Ok(result)) => TaskEvent::Completed(id, result),
				Ok(Err(err)) if err.is_cancelled() => TaskEvent::Cancelled(id),
				Ok(Err(err)) => {
					tracing::debug!(task = id, error = %err, "task failed");
					TaskEvent::Failed(id, err)
				}
				Err(_) => {
					tracing::error!(task = id, "task panicked");
					TaskEvent::Failed(id, OpError::Other("task panicked".to_string()))
				}
			};
			shared.emit(event);
		});
		id
	}

	/// Requests cancellation of the outstanding task.
	///
	/// Returns the id of the cancelled task, or `None` if nothing was running.
	pub fn cancel(&self) -> Option<TaskId> {
		let running = self.shared.current.lock().take()?;
		tracing::debug!(task = running.id, "task cancel requested");
		running.cancel.cancel();
		Some(running.id)
	}

	/// Id of the outstanding task, if any.
	pub fn current(&self) -> Option<TaskId> {
		self.shared.current.lock().as_ref().map(|running| running.id)
	}
}

impl<R> fmt::Debug for TaskManager<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TaskManager")
			.field("current", &*self.shared.current.lock())
			.finish_non_exhaustive()
	}
}
