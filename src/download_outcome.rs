use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use crate::error::Error;
use crate::remote_file::RemoteFileInfo;
use crate::task_status::TaskStatus;

/// Final result of one download. Exactly one is produced per submitted download.
#[derive(Debug)]
pub enum DownloadOutcome {
    Success(u64),
    Failed(Error),
    Cancelled,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DownloadOutcome::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadOutcome::Cancelled)
    }

    pub fn bytes_written(&self) -> Option<u64> {
        match self {
            DownloadOutcome::Success(bytes_written) => Some(*bytes_written),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            DownloadOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            DownloadOutcome::Success(_) => TaskStatus::Succeeded,
            DownloadOutcome::Failed(_) => TaskStatus::Failed,
            DownloadOutcome::Cancelled => TaskStatus::Cancelled,
        }
    }
}

impl Display for DownloadOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadOutcome::Success(bytes_written) => write!(f, "Success ({} bytes)", bytes_written),
            DownloadOutcome::Failed(e) => write!(f, "Failed ({})", e),
            DownloadOutcome::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Handed to a download's completion callback, on the worker that ran it.
#[derive(Debug)]
pub struct DownloadCompletion {
    pub url: String,
    pub output_file: PathBuf,
    pub description: String,
    pub outcome: DownloadOutcome,
    /// Response metadata, absent when no response was received.
    pub remote: Option<RemoteFileInfo>,
}

pub type CompletionCallback = Box<dyn FnOnce(&DownloadCompletion) + Send + 'static>;
