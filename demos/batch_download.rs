use std::path::PathBuf;
use std::time::Duration;
use batch_downloader_rs::{post_process, BatchDownloader, DownloadConfiguration, DownloadRequest, Error, PoolConfiguration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// cargo run --example batch_download -- <output_dir> <workers> <url>...
pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "temp".to_string()));
    let num_workers = args.next().and_then(|value| value.parse().ok()).unwrap_or(4);
    let urls: Vec<String> = args.collect();
    if urls.is_empty() {
        eprintln!("usage: batch_download <output_dir> <workers> <url>...");
        return;
    }

    let pool_config = PoolConfiguration::with_workers(num_workers).unwrap();
    let config = DownloadConfiguration::new()
        .set_output_dir(output_dir)
        .set_connect_timeout(Duration::from_secs(10))
        .set_overwrite_existing(false)
        .build()
        .unwrap();

    let downloader = BatchDownloader::new(pool_config, config);
    downloader.start().unwrap();

    for url in urls {
        let request = DownloadRequest::new(url).on_complete(|completion| {
            if !completion.outcome.is_success() {
                warn!(url = %completion.url, outcome = %completion.outcome, "Not downloaded");
                return;
            }
            info!(path = %completion.output_file.display(), outcome = %completion.outcome, "Downloaded");
            if post_process::gzip_target(&completion.output_file).is_some() {
                if let Err(e) = post_process::unpack_gzip(&completion.output_file, true) {
                    warn!(error = %e, "Unpacking failed");
                }
            }
        });
        match downloader.submit(request) {
            Ok(operation) => info!(id = operation.id(), description = operation.description(), "Queued"),
            Err(Error::DestinationExists(path)) => info!(path = %path.display(), "Already downloaded"),
            Err(Error::Interrupted) => break,
            Err(e) => warn!(error = %e, "Could not queue download"),
        }
    }

    match downloader.finish() {
        Ok(()) => info!("Batch complete"),
        Err(Error::Interrupted) => {
            warn!("Batch interrupted, partial files removed");
            std::process::exit(130);
        }
        Err(e) => warn!(error = %e, "Batch ended with an error"),
    }
}
