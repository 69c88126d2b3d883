use tokio::runtime::Handle;
use crate::error::{Error, Result};
use crate::task::QueuedTask;

/// How a started pool runs its tasks. Chosen once, when the pool starts.
pub(crate) trait Executor: Send + Sync {
    /// Hands `task` over for execution. Every accepted task is either run or discarded exactly once.
    fn submit(&self, task: QueuedTask) -> Result<()>;

    /// Lets queued work drain and blocks until every worker has exited.
    fn shutdown(&self) -> Result<()>;

    /// Tears the runtime down without waiting. Used where blocking is not allowed,
    /// after the run has been cancelled.
    fn abandon(&self);
}

/// Pool control calls block the calling thread, so they are refused from inside a
/// worker: a task body or a completion callback.
pub(crate) fn ensure_outside_runtime(operation: &str) -> Result<()> {
    match Handle::try_current() {
        Ok(_) => Err(Error::Lifecycle(format!(
            "{} must not be called from inside a worker or an async runtime",
            operation
        ))),
        Err(_) => Ok(()),
    }
}
