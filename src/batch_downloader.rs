use std::path::PathBuf;
use std::sync::Arc;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::info;
use crate::download_configuration::DownloadConfiguration;
use crate::download_operation::DownloadOperation;
use crate::download_outcome::CompletionCallback;
use crate::download_request::DownloadRequest;
use crate::download_task::DownloadTask;
use crate::error::{Error, Result};
use crate::pool_configuration::PoolConfiguration;
use crate::task::TaskInfo;
use crate::worker_pool::WorkerPool;

/// Downloads batches of URLs to files on a [`WorkerPool`].
///
/// Every submitted download ends in exactly one [`crate::DownloadOutcome`],
/// delivered to its completion callback on the worker that ran it. Failed and
/// cancelled downloads never leave a file at their destination.
pub struct BatchDownloader {
    config: Arc<DownloadConfiguration>,
    pool: WorkerPool,
    client: Mutex<Option<Client>>,
}

impl BatchDownloader {
    /// `handle_interrupt` on either configuration makes the pool listen for Ctrl-C.
    pub fn new(mut pool_config: PoolConfiguration, config: DownloadConfiguration) -> BatchDownloader {
        pool_config.handle_interrupt = pool_config.handle_interrupt || config.handle_interrupt;
        BatchDownloader {
            config: Arc::new(config),
            pool: WorkerPool::new(pool_config),
            client: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DownloadConfiguration {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    pub fn start(&self) -> Result<()> {
        // Pooled connections belong to the runtime that opened them, so every start gets a fresh client.
        let client = self.config.build_client()?;
        self.pool.start()?;
        *self.client.lock() = Some(client);
        Ok(())
    }

    pub fn submit_download(
        &self,
        url: impl Into<String>,
        output_file: impl Into<PathBuf>,
        description: Option<&str>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<DownloadOperation> {
        let request = DownloadRequest {
            url: url.into(),
            output_file: Some(output_file.into()),
            description: description.map(|value| value.to_string()),
            on_complete,
        };
        self.submit(request)
    }

    /// Queues one download.
    ///
    /// With `overwrite_existing` disabled an existing destination is skipped:
    /// nothing is queued and [`Error::DestinationExists`] is returned.
    pub fn submit(&self, request: DownloadRequest) -> Result<DownloadOperation> {
        let destination = self.config.resolve_output_file(request.destination()?);
        if !self.config.overwrite_existing && destination.is_file() {
            info!(path = %destination.display(), "Skipping");
            return Err(Error::DestinationExists(destination));
        }

        let client = self.client.lock().clone();
        let Some(client) = client.filter(|_| self.pool.is_running()) else {
            return Err(Error::Lifecycle("downloader is not running".to_string()));
        };

        let info = TaskInfo::download(&request.url, &destination, request.description);
        let task = DownloadTask::new(
            info,
            request.url.clone(),
            destination.clone(),
            client,
            self.config.clone(),
            request.on_complete,
        );
        let handle = self.pool.submit(Box::new(task))?;
        Ok(DownloadOperation::new(handle, request.url, destination))
    }

    /// Waits for every queued download to finish.
    pub fn stop(&self) -> Result<()> {
        self.pool.stop()
    }

    /// Aborts running downloads, removing their partial files, and drops queued ones.
    pub fn cancel(&self) -> Result<()> {
        self.pool.cancel()
    }

    /// Like [`BatchDownloader::stop`], but reports a batch ended by Ctrl-C.
    ///
    /// With `handle_interrupt` enabled a Ctrl-C at any time after `start` cancels
    /// the batch. Running downloads remove their partial files, queued ones are
    /// dropped and further submissions fail. Once everything has unwound this
    /// returns [`Error::Interrupted`].
    pub fn finish(&self) -> Result<()> {
        self.pool.stop_interruptible()
    }
}
