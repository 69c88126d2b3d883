use std::path::{Path, PathBuf};
use crate::task::TaskHandle;
use crate::task_status::TaskStatus;

/// Caller-side handle of one submitted download.
#[derive(Clone)]
pub struct DownloadOperation {
    handle: TaskHandle,
    url: String,
    output_file: PathBuf,
}

impl DownloadOperation {
    pub(crate) fn new(handle: TaskHandle, url: String, output_file: PathBuf) -> DownloadOperation {
        DownloadOperation {
            handle,
            url,
            output_file,
        }
    }

    pub fn id(&self) -> u64 {
        self.handle.id()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn description(&self) -> &str {
        &self.handle.info().description
    }

    pub fn status(&self) -> TaskStatus {
        self.handle.status()
    }

    pub fn is_done(&self) -> bool {
        self.handle.is_done()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    pub fn task_handle(&self) -> &TaskHandle {
        &self.handle
    }
}
