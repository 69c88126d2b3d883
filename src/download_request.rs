use std::path::PathBuf;
use crate::download_outcome::{CompletionCallback, DownloadCompletion};
use crate::error::{Error, Result};
use crate::remote_file;

/// One entry of a batch: where to fetch from, where to write to, and who to tell.
pub struct DownloadRequest {
    pub url: String,
    /// Destination; derived from the URL's final path segment when unset.
    pub output_file: Option<PathBuf>,
    pub description: Option<String>,
    pub on_complete: Option<CompletionCallback>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> DownloadRequest {
        DownloadRequest {
            url: url.into(),
            output_file: None,
            description: None,
            on_complete: None,
        }
    }

    pub fn output_file(mut self, output_file: impl Into<PathBuf>) -> DownloadRequest {
        self.output_file = Some(output_file.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> DownloadRequest {
        self.description = Some(description.into());
        self
    }

    pub fn on_complete<F>(mut self, on_complete: F) -> DownloadRequest
    where
        F: FnOnce(&DownloadCompletion) + Send + 'static,
    {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    /// The explicit destination, or the URL's file name.
    pub(crate) fn destination(&self) -> Result<PathBuf> {
        if let Some(output_file) = &self.output_file {
            return Ok(output_file.clone());
        }
        remote_file::file_name_from_url(&self.url)
            .map(PathBuf::from)
            .ok_or_else(|| Error::Configuration(format!("cannot derive a file name from {}", self.url)))
    }
}
