use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::error::{Error, Result};
use crate::executor::{ensure_outside_runtime, Executor};
use crate::executor_inline::InlineExecutor;
use crate::executor_threaded::ThreadedExecutor;
use crate::interrupt::InterruptWatch;
use crate::pool_configuration::PoolConfiguration;
use crate::task::{FnTask, QueuedTask, Task, TaskContext, TaskHandle, TaskInfo};

/// A fixed-size pool of workers executing submitted tasks.
///
/// The pool is started with [`WorkerPool::start`] and must be stopped again,
/// either explicitly or by dropping it. All control methods block the calling
/// thread and must not be called from inside a task or a completion callback.
///
/// With a single worker and `optimize` enabled no worker is spawned at all:
/// [`WorkerPool::submit`] runs the task on the caller's thread and only returns
/// once it has finished.
///
/// With `handle_interrupt` enabled, a Ctrl-C received at any point between
/// `start` and the end of `stop` cancels the run instead of killing the process.
/// Running tasks unwind, queued ones are discarded, later submissions fail with
/// [`Error::Interrupted`] and so does [`WorkerPool::stop_interruptible`].
pub struct WorkerPool {
    config: PoolConfiguration,
    next_id: AtomicU64,
    cancel_token: Mutex<CancellationToken>,
    executor: Mutex<Option<Arc<dyn Executor>>>,
    interrupt: Mutex<Option<InterruptWatch>>,
    interrupted: AtomicBool,
}

impl WorkerPool {
    pub fn new(config: PoolConfiguration) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(0),
            cancel_token: Mutex::new(CancellationToken::new()),
            executor: Mutex::new(None),
            interrupt: Mutex::new(None),
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.executor.lock().is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.lock().is_cancelled()
    }

    /// Whether the current or most recent run was ended by Ctrl-C.
    pub fn is_interrupted(&self) -> bool {
        self.check_interrupt()
    }

    pub fn start(&self) -> Result<()> {
        ensure_outside_runtime("start")?;
        let mut executor = self.executor.lock();
        if executor.is_some() {
            return Err(Error::Lifecycle("pool is not reentrant".to_string()));
        }

        let cancel_token = CancellationToken::new();
        let interrupt = match self.config.handle_interrupt {
            true => Some(InterruptWatch::install()?),
            false => None,
        };
        let started: Arc<dyn Executor> = match self.config.runs_inline() {
            true => Arc::new(InlineExecutor::new(&self.config, cancel_token.clone(), interrupt.clone())?),
            false => Arc::new(ThreadedExecutor::start(&self.config, cancel_token.clone(), interrupt.clone())?),
        };
        *self.cancel_token.lock() = cancel_token;
        *self.interrupt.lock() = interrupt;
        self.interrupted.store(false, Ordering::SeqCst);
        *executor = Some(started);
        Ok(())
    }

    /// Queues `task`.
    ///
    /// Once an interrupt has been received no further task is accepted. A call
    /// that was already blocked on a full queue still hands its task over; the
    /// task is then discarded as cancelled.
    pub fn submit(&self, task: Box<dyn Task>) -> Result<TaskHandle> {
        ensure_outside_runtime("submit")?;
        let executor = self.executor.lock().clone();
        let Some(executor) = executor else {
            return Err(Error::Lifecycle("pool is not running".to_string()));
        };
        if self.check_interrupt() {
            return Err(Error::Interrupted);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel_token = self.cancel_token.lock().clone();
        let (queued, handle) = QueuedTask::new(id, task, cancel_token);
        debug!(task = id, description = %handle.info().description, "submitting task");
        executor.submit(queued)?;
        Ok(handle)
    }

    /// Submits a closure as a task. An `Err` it returns is reported to the error handler.
    pub fn submit_fn<F, Fut>(&self, description: impl Into<String>, body: F) -> Result<TaskHandle>
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.submit(Box::new(FnTask::new(TaskInfo::new(description), body)))
    }

    /// Lets workers finish every queued task, then blocks until they have exited.
    pub fn stop(&self) -> Result<()> {
        self.shutdown()
    }

    /// Cancels running and queued tasks, then blocks until workers have exited.
    ///
    /// Running tasks see the cancellation at their next checkpoint. Queued tasks
    /// are discarded without running.
    pub fn cancel(&self) -> Result<()> {
        ensure_outside_runtime("cancel")?;
        if self.is_running() {
            debug!("cancelling worker pool");
            self.cancel_token.lock().cancel();
        }
        self.shutdown()
    }

    /// Like [`WorkerPool::stop`], but returns [`Error::Interrupted`] once the
    /// workers have unwound if the run was ended by Ctrl-C.
    pub fn stop_interruptible(&self) -> Result<()> {
        self.shutdown()?;
        match self.interrupted.load(Ordering::SeqCst) {
            true => Err(Error::Interrupted),
            false => Ok(()),
        }
    }

    fn shutdown(&self) -> Result<()> {
        ensure_outside_runtime("stop")?;
        let executor = self.executor.lock().take();
        let result = match executor {
            Some(executor) => executor.shutdown(),
            None => Ok(()),
        };
        // Checked before the listener goes, so an interrupt during the drain is not lost.
        self.check_interrupt();
        drop(self.interrupt.lock().take());
        result
    }

    fn check_interrupt(&self) -> bool {
        if self.interrupted.load(Ordering::SeqCst) {
            return true;
        }
        let interrupt = self.interrupt.lock().clone();
        let interrupted = match interrupt {
            Some(interrupt) => interrupt.check(&self.cancel_token.lock()),
            None => false,
        };
        if interrupted {
            self.interrupted.store(true, Ordering::SeqCst);
        }
        interrupted
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }
        if ensure_outside_runtime("drop").is_err() {
            // Blocking on the workers is not allowed here.
            self.cancel_token.lock().cancel();
            if let Some(executor) = self.executor.lock().take() {
                executor.abandon();
            }
            drop(self.interrupt.lock().take());
            return;
        }
        let result = match std::thread::panicking() {
            true => self.cancel(),
            false => self.stop(),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to shut down worker pool");
        }
    }
}
