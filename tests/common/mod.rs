#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use batch_downloader_rs::{CompletionCallback, DownloadCompletion, TaskStatus};
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What a completion callback saw, flattened so it can be compared after the fact.
#[derive(Debug, Clone)]
pub struct Record {
    pub url: String,
    pub output_file: PathBuf,
    pub description: String,
    pub status: TaskStatus,
    pub bytes_written: Option<u64>,
    pub error: Option<String>,
    pub content_length: Option<u64>,
}

#[derive(Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> CompletionCallback {
        let records = self.records.clone();
        Box::new(move |completion: &DownloadCompletion| {
            records.lock().push(Record {
                url: completion.url.clone(),
                output_file: completion.output_file.clone(),
                description: completion.description.clone(),
                status: completion.outcome.status(),
                bytes_written: completion.outcome.bytes_written(),
                error: completion.outcome.error().map(|e| e.to_string()),
                content_length: completion.remote.as_ref().and_then(|remote| remote.content_length),
            });
        })
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn find(&self, url: &str) -> Option<Record> {
        self.records.lock().iter().find(|record| record.url == url).cloned()
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.records.lock().iter().filter(|record| record.status == status).count()
    }
}

/// Mock HTTP server kept alive together with the runtime that started it.
pub struct TestServer {
    pub server: MockServer,
    pub runtime: Runtime,
}

impl TestServer {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn url(&self, file_path: &str) -> String {
        format!("{}{}", self.server.uri(), file_path)
    }

    pub fn serve(&self, file_path: &str, body: Vec<u8>) -> String {
        self.runtime.block_on(
            Mock::given(method("GET"))
                .and(path(file_path))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
                .mount(&self.server),
        );
        self.url(file_path)
    }

    pub fn serve_status(&self, file_path: &str, status: u16) -> String {
        self.runtime.block_on(
            Mock::given(method("GET"))
                .and(path(file_path))
                .respond_with(ResponseTemplate::new(status))
                .mount(&self.server),
        );
        self.url(file_path)
    }

    /// Serves `file_path` but fails verification if it is ever requested.
    pub fn never_requested(&self, file_path: &str) -> String {
        self.runtime.block_on(
            Mock::given(method("GET"))
                .and(path(file_path))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
                .expect(0)
                .mount(&self.server),
        );
        self.url(file_path)
    }

    pub fn verify(&self) {
        self.runtime.block_on(self.server.verify());
    }
}

pub fn body(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|index| (index as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// A URL nothing listens on.
pub fn unreachable_url(file_path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", address, file_path)
}

/// A server that announces `total_len` bytes, sends `prefix_len` of them and then
/// stalls until the returned sender fires or ten seconds pass.
pub fn stalling_server(prefix_len: usize, total_len: usize) -> (String, mpsc::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let (release_sender, release_receiver) = mpsc::channel::<()>();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = stream.read(&mut request);
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n\r\n",
            total_len
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&vec![7u8; prefix_len]);
        let _ = stream.flush();
        let _ = release_receiver.recv_timeout(Duration::from_secs(10));
    });
    (format!("http://{}/stall.bin", address), release_sender)
}

/// A server that announces `total_len` bytes, sends `prefix_len` of them and hangs up.
pub fn truncating_server(prefix_len: usize, total_len: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = [0u8; 4096];
        let _ = stream.read(&mut request);
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\n\r\n",
            total_len
        );
        let _ = stream.write_all(header.as_bytes());
        let _ = stream.write_all(&vec![7u8; prefix_len]);
        let _ = stream.flush();
        std::thread::sleep(Duration::from_millis(100));
    });
    format!("http://{}/truncated.bin", address)
}

pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

pub fn file_len(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|metadata| metadata.len())
}
