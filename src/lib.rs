//! # batch-downloader-rs
//!
//! A bounded worker pool for downloading batches of files.
//!
//! Features:
//! - Fixed-size worker pool with blocking or unbounded submission
//! - Inline execution for single-worker pools
//! - Streaming downloads with chunk-wise cooperative cancellation
//! - Exactly one completion callback per download, whatever the outcome
//! - No truncated files left behind on failure, cancellation or Ctrl-C
//!   (when `handle_interrupt` is set, the listener is active from `start` until stop)

mod executor;
mod executor_inline;
mod executor_threaded;
mod task_queue;
mod interrupt;
mod partial_file;
mod download_task;
pub mod error;
pub mod task;
pub mod task_status;
pub mod pool_configuration;
pub mod worker_pool;
pub mod remote_file;
pub mod download_configuration;
pub mod download_request;
pub mod download_outcome;
pub mod download_operation;
pub mod batch_downloader;
pub mod post_process;

pub use batch_downloader::BatchDownloader;
pub use download_configuration::DownloadConfiguration;
pub use download_operation::DownloadOperation;
pub use download_outcome::{CompletionCallback, DownloadCompletion, DownloadOutcome};
pub use download_request::DownloadRequest;
pub use error::{Error, Result};
pub use pool_configuration::PoolConfiguration;
pub use task::{Task, TaskContext, TaskHandle, TaskInfo};
pub use task_status::TaskStatus;
pub use worker_pool::WorkerPool;
