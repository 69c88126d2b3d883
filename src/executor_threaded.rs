use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::{self, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::interrupt::InterruptWatch;
use crate::pool_configuration::{ErrorHandler, PoolConfiguration};
use crate::task::QueuedTask;
use crate::task_queue::{self, Message, TaskReceiver, TaskSender};

const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type SharedReceiver = Arc<tokio::sync::Mutex<TaskReceiver>>;

/// N workers on a dedicated runtime, all pulling from one shared queue.
pub(crate) struct ThreadedExecutor {
    runtime: Mutex<Option<Runtime>>,
    num_workers: usize,
    sender: Mutex<Option<TaskSender>>,
    receiver: SharedReceiver,
    workers: Mutex<Vec<JoinHandle<()>>>,
    error_handler: Option<ErrorHandler>,
}

impl ThreadedExecutor {
    pub fn start(
        config: &PoolConfiguration,
        cancel_token: CancellationToken,
        interrupt: Option<InterruptWatch>,
    ) -> Result<Self> {
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(config.num_workers)
            .thread_name(config.thread_name.clone())
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        if let Some(interrupt) = interrupt {
            runtime.spawn(interrupt.watch(cancel_token.clone()));
        }

        let (sender, receiver) = task_queue::channel(config.queue_capacity());
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..config.num_workers)
            .map(|index| {
                runtime.spawn(worker_loop(
                    index,
                    receiver.clone(),
                    cancel_token.clone(),
                    config.error_handler.clone(),
                ))
            })
            .collect();
        debug!(workers = config.num_workers, "started worker pool");

        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            num_workers: config.num_workers,
            sender: Mutex::new(Some(sender)),
            receiver,
            workers: Mutex::new(workers),
            error_handler: config.error_handler.clone(),
        })
    }
}

impl Executor for ThreadedExecutor {
    fn submit(&self, task: QueuedTask) -> Result<()> {
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            return Err(Error::Lifecycle("pool is shutting down".to_string()));
        };
        match sender.send_blocking(Message::Run(task)) {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::Lifecycle("pool is shutting down".to_string())),
        }
    }

    fn shutdown(&self) -> Result<()> {
        let Some(runtime) = self.runtime.lock().take() else {
            return Ok(());
        };
        let sender = self.sender.lock().take();
        let workers = std::mem::take(&mut *self.workers.lock());
        let num_workers = self.num_workers;

        runtime.block_on(async move {
            // Sentinels queue up behind pending tasks, so workers drain the queue before exiting.
            if let Some(sender) = sender {
                for _ in 0..num_workers {
                    if sender.send(Message::Stop).await.is_err() {
                        break;
                    }
                }
            }
            for result in join_all(workers).await {
                if let Err(e) = result {
                    error!(error = %e, "worker terminated abnormally");
                }
            }
        });

        // Anything that slipped in behind the sentinels never reached a worker.
        let leftovers = self.receiver.blocking_lock().close_and_drain();
        for task in leftovers {
            task.discard(self.error_handler.as_ref());
        }

        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        debug!("stopped worker pool");
        Ok(())
    }

    fn abandon(&self) {
        drop(self.sender.lock().take());
        self.workers.lock().clear();
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        if let Ok(mut receiver) = self.receiver.try_lock() {
            for task in receiver.close_and_drain() {
                task.discard(self.error_handler.as_ref());
            }
        }
    }
}

async fn worker_loop(
    index: usize,
    receiver: SharedReceiver,
    cancel_token: CancellationToken,
    error_handler: Option<ErrorHandler>,
) {
    debug!(worker = index, "worker started");
    loop {
        let message = receiver.lock().await.recv().await;
        match message {
            Some(Message::Run(task)) => {
                if cancel_token.is_cancelled() {
                    task.discard(error_handler.as_ref());
                    continue;
                }
                task.run(cancel_token.clone(), error_handler.clone()).await;
            }
            Some(Message::Stop) | None => break,
        }
    }
    debug!(worker = index, "worker exited");
}
