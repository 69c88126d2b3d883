use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use crate::error::{Error, Result};
use crate::pool_configuration::ErrorHandler;
use crate::remote_file;
use crate::task_status::{StatusCell, TaskStatus};

/// Identity metadata of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub description: String,
    pub source: Option<String>,
    pub destination: Option<PathBuf>,
}

impl TaskInfo {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source: None,
            destination: None,
        }
    }

    /// Metadata for a download. Without a description the URL's final path segment is used.
    pub fn download(url: &str, destination: &Path, description: Option<String>) -> Self {
        let description = description
            .filter(|value| !value.is_empty())
            .or_else(|| remote_file::file_name_from_url(url))
            .unwrap_or_else(|| url.to_string());
        Self {
            description,
            source: Some(url.to_string()),
            destination: Some(destination.to_path_buf()),
        }
    }
}

/// Execution context handed to a task body by the worker that runs it.
#[derive(Clone)]
pub struct TaskContext {
    info: Arc<TaskInfo>,
    cancel_token: CancellationToken,
}

impl TaskContext {
    pub(crate) fn new(info: Arc<TaskInfo>, cancel_token: CancellationToken) -> Self {
        Self {
            info,
            cancel_token,
        }
    }

    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Resolves once the pool has been cancelled.
    pub async fn cancelled(&self) {
        self.cancel_token.cancelled().await
    }

    pub fn check_cancelled(&self) -> Result<()> {
        match self.is_cancelled() {
            true => Err(Error::Cancelled),
            false => Ok(()),
        }
    }
}

/// A unit of work executed by the pool.
///
/// `run` is called at most once. A task that is dequeued after the pool was
/// cancelled never runs; `discard` is called instead.
///
/// Returning `Ok(status)` means the task handled its own outcome and `status`
/// is recorded as is. `Err(Error::Cancelled)` is recorded as a cancellation,
/// any other error (or a panic) is recorded as a failure and reported to the
/// pool's error handler.
pub trait Task: Send + 'static {
    fn info(&self) -> &TaskInfo;

    fn run(self: Box<Self>, ctx: TaskContext) -> BoxFuture<'static, Result<TaskStatus>>;

    fn discard(self: Box<Self>) {}
}

pub(crate) struct FnTask<F> {
    info: TaskInfo,
    body: F,
}

impl<F> FnTask<F> {
    pub fn new(info: TaskInfo, body: F) -> Self {
        Self {
            info,
            body,
        }
    }
}

impl<F, Fut> Task for FnTask<F>
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn run(self: Box<Self>, ctx: TaskContext) -> BoxFuture<'static, Result<TaskStatus>> {
        let FnTask { body, .. } = *self;
        Box::pin(async move {
            body(ctx).await?;
            Ok(TaskStatus::Succeeded)
        })
    }
}

/// Caller-side view of a submitted task.
#[derive(Clone)]
pub struct TaskHandle {
    id: u64,
    info: Arc<TaskInfo>,
    status: StatusCell,
    cancel_token: CancellationToken,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn info(&self) -> &TaskInfo {
        &self.info
    }

    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    /// True once the task ended cancelled, or while the pool is cancelling it.
    pub fn is_cancelled(&self) -> bool {
        match self.status() {
            TaskStatus::Cancelled => true,
            status => !status.is_terminal() && self.cancel_token.is_cancelled(),
        }
    }
}

/// A task on its way through the queue, paired with the status slot its handles observe.
pub(crate) struct QueuedTask {
    id: u64,
    info: Arc<TaskInfo>,
    task: Box<dyn Task>,
    status: StatusCell,
}

impl QueuedTask {
    pub fn new(id: u64, task: Box<dyn Task>, cancel_token: CancellationToken) -> (QueuedTask, TaskHandle) {
        let info = Arc::new(task.info().clone());
        let status = StatusCell::new();
        let handle = TaskHandle {
            id,
            info: info.clone(),
            status: status.clone(),
            cancel_token,
        };
        let queued = QueuedTask {
            id,
            info,
            task,
            status,
        };
        (queued, handle)
    }

    /// Runs the task under a catch-all boundary. Nothing a task does can unwind past this call.
    pub async fn run(self, cancel_token: CancellationToken, error_handler: Option<ErrorHandler>) {
        let QueuedTask { id, info, task, status } = self;
        status.set(TaskStatus::Running);

        let ctx = TaskContext::new(info.clone(), cancel_token);
        let result = AssertUnwindSafe(async move { task.run(ctx).await })
            .catch_unwind()
            .await;

        let final_status = match result {
            Ok(Ok(status)) if status.is_terminal() => status,
            Ok(Ok(_)) => TaskStatus::Succeeded,
            Ok(Err(e)) if e.is_cancelled() => {
                debug!(task = id, description = %info.description, "task cancelled");
                TaskStatus::Cancelled
            }
            Ok(Err(e)) => {
                report_failure(&info, &e, error_handler.as_ref());
                TaskStatus::Failed
            }
            Err(payload) => {
                let e = Error::TaskPanicked(panic_message(payload.as_ref()));
                report_failure(&info, &e, error_handler.as_ref());
                TaskStatus::Failed
            }
        };
        status.set(final_status);
    }

    /// Drops the task without running it.
    pub fn discard(self, error_handler: Option<&ErrorHandler>) {
        let QueuedTask { id, info, task, status } = self;
        debug!(task = id, description = %info.description, "discarding cancelled task");
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(move || task.discard())) {
            let e = Error::TaskPanicked(panic_message(payload.as_ref()));
            report_failure(&info, &e, error_handler);
        }
        status.set(TaskStatus::Cancelled);
    }
}

fn report_failure(info: &TaskInfo, e: &Error, error_handler: Option<&ErrorHandler>) {
    match error_handler {
        Some(handler) => {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(info, e)));
            if result.is_err() {
                error!(description = %info.description, error = %e, "error handler panicked");
            }
        }
        None => {
            error!(description = %info.description, error = %e, "task failed");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}
