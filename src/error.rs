use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected pool or downloader settings.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Operation not allowed in the pool's current lifecycle state.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// The request could not be sent, returned a non-2xx status or broke off mid-body.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("body of {url} ended after {received} of {expected} bytes")]
    IncompleteBody {
        url: String,
        received: u64,
        expected: u64,
    },

    #[error("destination {} already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("task failed: {0}")]
    Task(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// Cooperative abort. Not a failure: tasks return it when they observe cancellation.
    #[error("task cancelled")]
    Cancelled,

    #[error("interrupted")]
    Interrupted,

    #[error("failed to build worker runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to install interrupt handler: {0}")]
    InterruptHandler(#[source] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Network {
            url: url.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Interrupted)
    }
}
