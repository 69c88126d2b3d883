use std::path::PathBuf;
use std::sync::Arc;
use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::{Client, Response};
use tracing::{error, info};
use crate::download_configuration::DownloadConfiguration;
use crate::download_outcome::{CompletionCallback, DownloadCompletion, DownloadOutcome};
use crate::error::{Error, Result};
use crate::partial_file::PartialFile;
use crate::remote_file::RemoteFileInfo;
use crate::task::{Task, TaskContext, TaskInfo};
use crate::task_status::TaskStatus;

pub(crate) struct DownloadTask {
    job: DownloadJob,
    on_complete: Option<CompletionCallback>,
}

/// Everything a download needs while it runs. Kept apart from the callback so it can be
/// borrowed across awaits.
struct DownloadJob {
    info: TaskInfo,
    url: String,
    output_file: PathBuf,
    client: Client,
    config: Arc<DownloadConfiguration>,
}

impl DownloadTask {
    pub fn new(
        info: TaskInfo,
        url: String,
        output_file: PathBuf,
        client: Client,
        config: Arc<DownloadConfiguration>,
        on_complete: Option<CompletionCallback>,
    ) -> DownloadTask {
        DownloadTask {
            job: DownloadJob {
                info,
                url,
                output_file,
                client,
                config,
            },
            on_complete,
        }
    }
}

impl DownloadJob {
    fn complete(
        self,
        outcome: DownloadOutcome,
        remote: Option<RemoteFileInfo>,
        on_complete: Option<CompletionCallback>,
    ) -> TaskStatus {
        let status = outcome.status();
        let completion = DownloadCompletion {
            url: self.url,
            output_file: self.output_file,
            description: self.info.description,
            outcome,
            remote,
        };
        if let Some(on_complete) = on_complete {
            on_complete(&completion);
        }
        status
    }

    async fn download(&self, ctx: &TaskContext) -> (DownloadOutcome, Option<RemoteFileInfo>) {
        let description = self.info.description.as_str();

        let request = self.client.get(&self.url).send();
        let response = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                info!(description, "Aborting download");
                return (DownloadOutcome::Cancelled, None);
            }
            response = request => response,
        };
        let response = match response.and_then(|response| response.error_for_status()) {
            Ok(response) => response,
            Err(e) => {
                let e = Error::network(&self.url, e);
                error!(description, error = %e, "Download failed");
                return (DownloadOutcome::Failed(e), None);
            }
        };

        let remote = RemoteFileInfo::new(response.headers());
        if ctx.is_cancelled() {
            info!(description, "Aborting download");
            return (DownloadOutcome::Cancelled, Some(remote));
        }

        info!(description, url = %self.url, "Downloading ...");
        let mut file = match PartialFile::create(&self.output_file, self.config.create_dir).await {
            Ok(file) => file,
            Err(e) => {
                error!(description, error = %e, "Download failed");
                return (DownloadOutcome::Failed(e), Some(remote));
            }
        };

        let streamed = stream_body(
            &mut file,
            response,
            &self.url,
            self.config.chunk_size,
            remote.content_length,
            ctx,
        ).await;

        let outcome = match streamed {
            Ok(()) => match file.finish().await {
                Ok(bytes_written) => DownloadOutcome::Success(bytes_written),
                Err(e) => {
                    error!(description, error = %e, "Download failed");
                    DownloadOutcome::Failed(e)
                }
            },
            Err(e) if e.is_cancelled() => {
                info!(description, "Aborting download");
                file.discard().await;
                DownloadOutcome::Cancelled
            }
            Err(e) => {
                error!(description, error = %e, "Download failed");
                file.discard().await;
                DownloadOutcome::Failed(e)
            }
        };
        (outcome, Some(remote))
    }
}

impl Task for DownloadTask {
    fn info(&self) -> &TaskInfo {
        &self.job.info
    }

    fn run(self: Box<Self>, ctx: TaskContext) -> BoxFuture<'static, Result<TaskStatus>> {
        let DownloadTask { job, on_complete } = *self;
        Box::pin(async move {
            let (outcome, remote) = job.download(&ctx).await;
            Ok(job.complete(outcome, remote, on_complete))
        })
    }

    fn discard(self: Box<Self>) {
        let DownloadTask { job, on_complete } = *self;
        job.complete(DownloadOutcome::Cancelled, None, on_complete);
    }
}

/// Copies the body into `file` in `chunk_size` pieces, checking for cancellation
/// before every piece and while waiting for the network.
async fn stream_body(
    file: &mut PartialFile,
    response: Response,
    url: &str,
    chunk_size: usize,
    expected_length: Option<u64>,
    ctx: &TaskContext,
) -> Result<()> {
    let mut body = response.bytes_stream();
    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(Error::Cancelled),
            next = body.next() => next,
        };
        let Some(bytes) = next else {
            break;
        };
        let bytes = bytes.map_err(|e| Error::network(url, e))?;
        for chunk in bytes.chunks(chunk_size) {
            ctx.check_cancelled()?;
            file.write_async(chunk).await?;
        }
    }

    if let Some(expected) = expected_length {
        if file.written() != expected {
            return Err(Error::IncompleteBody {
                url: url.to_string(),
                received: file.written(),
                expected,
            });
        }
    }
    Ok(())
}
