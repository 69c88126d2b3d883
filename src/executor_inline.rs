use parking_lot::Mutex;
use tokio::runtime::{self, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::interrupt::InterruptWatch;
use crate::pool_configuration::{ErrorHandler, PoolConfiguration};
use crate::task::QueuedTask;

/// Single-worker strategy: no background worker, `submit` runs the task to
/// completion on the caller's thread.
pub(crate) struct InlineExecutor {
    runtime: Mutex<Option<Runtime>>,
    cancel_token: CancellationToken,
    error_handler: Option<ErrorHandler>,
}

impl InlineExecutor {
    pub fn new(
        config: &PoolConfiguration,
        cancel_token: CancellationToken,
        interrupt: Option<InterruptWatch>,
    ) -> Result<Self> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        // Only polled while a task is being driven by `block_on`, which is exactly
        // when there is something to abort.
        if let Some(interrupt) = interrupt {
            runtime.spawn(interrupt.watch(cancel_token.clone()));
        }
        debug!("started inline executor");
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            cancel_token,
            error_handler: config.error_handler.clone(),
        })
    }
}

impl Executor for InlineExecutor {
    fn submit(&self, task: QueuedTask) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            task.discard(self.error_handler.as_ref());
            return Ok(());
        }
        let runtime = self.runtime.lock();
        let Some(runtime) = runtime.as_ref() else {
            return Err(Error::Lifecycle("pool is shutting down".to_string()));
        };
        runtime.block_on(task.run(self.cancel_token.clone(), self.error_handler.clone()));
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        drop(self.runtime.lock().take());
        debug!("stopped inline executor");
        Ok(())
    }

    fn abandon(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }
}
