mod common;

use std::io::Write;
use std::time::Duration;
use batch_downloader_rs::{
    post_process, BatchDownloader, DownloadConfiguration, DownloadRequest, Error, PoolConfiguration, TaskStatus,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use common::{body, file_len, stalling_server, truncating_server, unreachable_url, wait_until, Recorder, TestServer};

fn downloader(num_workers: usize, optimize: bool, config: DownloadConfiguration) -> BatchDownloader {
    let pool_config = PoolConfiguration::new()
        .set_num_workers(num_workers)
        .set_optimize(optimize)
        .set_blocking_submit(false)
        .build()
        .unwrap();
    BatchDownloader::new(pool_config, config)
}

#[test]
fn test_unreachable_host_fails_only_its_own_download() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();

    let downloader = downloader(2, true, DownloadConfiguration::default());
    downloader.start().unwrap();

    let mut urls = Vec::new();
    for index in 0..5u8 {
        let url = match index {
            2 => unreachable_url("/file_2.bin"),
            _ => server.serve(&format!("/file_{}.bin", index), body(4096, index)),
        };
        let output_file = dir.path().join(format!("file_{}.bin", index));
        downloader
            .submit_download(url.clone(), output_file, None, Some(recorder.callback()))
            .unwrap();
        urls.push(url);
    }
    downloader.stop().unwrap();

    assert_eq!(recorder.len(), 5);
    assert_eq!(recorder.count(TaskStatus::Succeeded), 4);
    assert_eq!(recorder.count(TaskStatus::Failed), 1);

    let failed = recorder.find(&urls[2]).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.is_some());
    assert!(!dir.path().join("file_2.bin").exists());

    for index in [0usize, 1, 3, 4] {
        let path = dir.path().join(format!("file_{}.bin", index));
        assert_eq!(std::fs::read(&path).unwrap(), body(4096, index as u8));
    }
}

#[test]
fn test_inline_download_completes_before_submit_returns() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let url = server.serve("/inline.bin", body(2048, 3));

    let downloader = downloader(1, true, DownloadConfiguration::default());
    downloader.start().unwrap();
    let operation = downloader
        .submit_download(url.clone(), dir.path().join("inline.bin"), Some("inline"), Some(recorder.callback()))
        .unwrap();

    assert_eq!(recorder.len(), 1);
    assert_eq!(operation.status(), TaskStatus::Succeeded);
    assert_eq!(operation.description(), "inline");

    let record = recorder.find(&url).unwrap();
    assert_eq!(record.description, "inline");
    assert_eq!(record.bytes_written, Some(2048));
    downloader.stop().unwrap();
}

#[test]
fn test_http_error_status_fails_without_file() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let url = server.serve_status("/missing.tbl", 404);
    let output_file = dir.path().join("missing.tbl");

    let downloader = downloader(2, true, DownloadConfiguration::default());
    downloader.start().unwrap();
    downloader
        .submit_download(url.clone(), &output_file, None, Some(recorder.callback()))
        .unwrap();
    downloader.stop().unwrap();

    let record = recorder.find(&url).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert!(record.error.unwrap().contains("404"));
    assert!(!output_file.exists());
}

#[test]
fn test_body_cut_short_fails_and_removes_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let url = truncating_server(8192, 100_000);
    let output_file = dir.path().join("truncated.bin");

    let downloader = downloader(2, true, DownloadConfiguration::default());
    downloader.start().unwrap();
    let operation = downloader
        .submit_download(url.clone(), &output_file, None, Some(recorder.callback()))
        .unwrap();
    downloader.stop().unwrap();

    let record = recorder.find(&url).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.content_length, Some(100_000));
    assert!(record.error.is_some());
    assert_eq!(operation.status(), TaskStatus::Failed);
    assert!(!output_file.exists());
}

#[test]
fn test_large_body_is_written_completely() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let content = body(100_000, 11);
    let url = server.serve("/large.bin", content.clone());
    let output_file = dir.path().join("nested/large.bin");

    let config = DownloadConfiguration::new().set_chunk_size(1024).build().unwrap();
    let downloader = downloader(3, true, config);
    downloader.start().unwrap();
    downloader
        .submit_download(url.clone(), &output_file, None, Some(recorder.callback()))
        .unwrap();
    downloader.stop().unwrap();

    let record = recorder.find(&url).unwrap();
    assert_eq!(record.status, TaskStatus::Succeeded);
    assert_eq!(record.bytes_written, Some(100_000));
    assert_eq!(record.content_length, Some(100_000));
    assert_eq!(file_len(&output_file), Some(100_000));
    assert_eq!(std::fs::read(&output_file).unwrap(), content);
}

#[test]
fn test_cancel_aborts_running_download_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let (url, release) = stalling_server(4096, 1_000_000);
    let output_file = dir.path().join("stall.bin");

    let downloader = downloader(1, false, DownloadConfiguration::default());
    downloader.start().unwrap();
    let operation = downloader
        .submit_download(url.clone(), &output_file, None, Some(recorder.callback()))
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || output_file.exists()));
    downloader.cancel().unwrap();
    let _ = release.send(());

    assert_eq!(recorder.len(), 1);
    assert_eq!(recorder.find(&url).unwrap().status, TaskStatus::Cancelled);
    assert_eq!(operation.status(), TaskStatus::Cancelled);
    assert!(operation.is_cancelled());
    assert!(!output_file.exists());
    assert!(!downloader.is_running());
}

#[test]
fn test_cancel_discards_queued_downloads() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let (stalled_url, release) = stalling_server(1024, 1_000_000);

    let downloader = downloader(1, false, DownloadConfiguration::default());
    downloader.start().unwrap();
    downloader
        .submit_download(stalled_url.clone(), dir.path().join("stall.bin"), None, Some(recorder.callback()))
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || dir.path().join("stall.bin").exists()));

    let mut queued = Vec::new();
    for index in 0..3 {
        let url = server.never_requested(&format!("/queued_{}.bin", index));
        let output_file = dir.path().join(format!("queued_{}.bin", index));
        let operation = downloader
            .submit_download(url, output_file, None, Some(recorder.callback()))
            .unwrap();
        queued.push(operation);
    }
    downloader.cancel().unwrap();
    let _ = release.send(());

    assert_eq!(recorder.len(), 4);
    assert_eq!(recorder.count(TaskStatus::Cancelled), 4);
    for operation in &queued {
        assert_eq!(operation.status(), TaskStatus::Cancelled);
        assert!(!operation.output_file().exists());
    }
    server.verify();
}

#[test]
fn test_existing_destination_is_skipped() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let url = server.never_requested("/kept.tbl");
    let output_file = dir.path().join("kept.tbl");
    std::fs::write(&output_file, b"already here").unwrap();

    let config = DownloadConfiguration::new().set_overwrite_existing(false).build().unwrap();
    let downloader = downloader(2, true, config);
    downloader.start().unwrap();
    let result = downloader.submit_download(url, &output_file, None, Some(recorder.callback()));
    downloader.stop().unwrap();

    assert!(matches!(result, Err(Error::DestinationExists(path)) if path == output_file));
    assert_eq!(recorder.len(), 0);
    assert_eq!(std::fs::read(&output_file).unwrap(), b"already here");
    server.verify();
}

#[test]
fn test_file_name_derived_into_output_dir() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let url = server.serve("/data/ETSS/planets.tbl", body(512, 5));

    let config = DownloadConfiguration::new().set_output_dir(dir.path()).build().unwrap();
    let downloader = downloader(2, true, config);
    downloader.start().unwrap();
    let request = DownloadRequest::new(url.clone()).on_complete(recorder.callback());
    let operation = downloader.submit(request).unwrap();
    downloader.stop().unwrap();

    let expected = dir.path().join("planets.tbl");
    assert_eq!(operation.output_file(), expected.as_path());
    assert_eq!(operation.description(), "planets.tbl");
    assert_eq!(recorder.find(&url).unwrap().output_file, expected);
    assert_eq!(file_len(&expected), Some(512));
}

#[test]
fn test_gzip_unpacked_from_callback() {
    let server = TestServer::start();
    let dir = tempfile::tempdir().unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"source_id,ra,dec\n1,45.0,0.1\n").unwrap();
    let url = server.serve("/GaiaSource_1.csv.gz", encoder.finish().unwrap());

    let unpacked = std::sync::Arc::new(parking_lot::Mutex::new(None));
    let slot = unpacked.clone();
    let request = DownloadRequest::new(url)
        .output_file(dir.path().join("GaiaSource_1.csv.gz"))
        .on_complete(move |completion| {
            if completion.outcome.is_success() {
                *slot.lock() = Some(post_process::unpack_gzip(&completion.output_file, true).unwrap());
            }
        });

    let downloader = downloader(2, true, DownloadConfiguration::default());
    downloader.start().unwrap();
    downloader.submit(request).unwrap();
    downloader.stop().unwrap();

    let unpacked = unpacked.lock().clone().unwrap();
    assert_eq!(unpacked, dir.path().join("GaiaSource_1.csv"));
    assert_eq!(std::fs::read(&unpacked).unwrap(), b"source_id,ra,dec\n1,45.0,0.1\n");
    assert!(!dir.path().join("GaiaSource_1.csv.gz").exists());
}

#[test]
fn test_every_callback_fires_before_stop_returns() {
    let server = TestServer::start();
    for num_workers in 1..=3 {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new();
        let downloader = downloader(num_workers, true, DownloadConfiguration::default());
        downloader.start().unwrap();

        for index in 0..8u8 {
            let url = server.serve(&format!("/w{}/part_{}.bin", num_workers, index), body(1500, index));
            let output_file = dir.path().join(format!("part_{}.bin", index));
            downloader
                .submit_download(url, output_file, None, Some(recorder.callback()))
                .unwrap();
        }
        downloader.stop().unwrap();

        assert_eq!(recorder.len(), 8);
        assert_eq!(recorder.count(TaskStatus::Succeeded), 8);
        for record in recorder.records() {
            assert_eq!(file_len(&record.output_file), Some(1500));
        }
    }
}
