use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use crate::error::{Error, Result};

/// A destination file that is still being written.
///
/// Unless [`PartialFile::finish`] succeeds the file is removed again, by
/// [`PartialFile::discard`] or, if the task unwinds, when it is dropped.
pub(crate) struct PartialFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    finished: bool,
}

impl PartialFile {
    pub async fn create(path: &Path, create_dir: bool) -> Result<PartialFile> {
        if create_dir {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && parent.symlink_metadata().is_err() {
                    fs::create_dir_all(parent).await.map_err(|e| Error::io(parent, e))?;
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| Error::io(path, e))?;

        Ok(PartialFile {
            path: path.to_path_buf(),
            file: Some(file),
            written: 0,
            finished: false,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write_async(&mut self, buffer: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::io(&self.path, ErrorKind::NotConnected.into()));
        };
        file.write_all(buffer).await.map_err(|e| Error::io(&self.path, e))?;
        self.written += buffer.len() as u64;
        Ok(())
    }

    /// Flushes and closes the file, keeping it on disk.
    pub async fn finish(mut self) -> Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| Error::io(&self.path, e))?;
        }
        self.finished = true;
        Ok(self.written)
    }

    /// Closes and deletes the file. A failed delete is logged, never returned.
    pub async fn discard(mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
        self.finished = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => info!(path = %self.path.display(), "Removed incomplete file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!(path = %self.path.display(), error = %e, "Could not remove incomplete file"),
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.file.take());
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "Removed incomplete file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!(path = %self.path.display(), error = %e, "Could not remove incomplete file"),
        }
    }
}
