//! Work typically done from a completion callback once a download has landed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use flate2::read::GzDecoder;
use tracing::{info, warn};
use crate::error::{Error, Result};

/// Path a `.gz` file unpacks to, `None` for anything else.
pub fn gzip_target(path: &Path) -> Option<PathBuf> {
    match path.extension() {
        Some(extension) if extension.eq_ignore_ascii_case("gz") => Some(path.with_extension("")),
        _ => None,
    }
}

/// Decompresses `path` next to itself and optionally removes the archive.
///
/// Blocks on file I/O; callers on a worker should keep archives small or
/// hand the work to another thread.
pub fn unpack_gzip(path: &Path, remove_original: bool) -> Result<PathBuf> {
    let Some(target) = gzip_target(path) else {
        return Err(Error::Configuration(format!("{} is not a .gz file", path.display())));
    };
    info!(path = %path.display(), "Unpacking");

    if let Err(e) = decompress(path, &target) {
        if let Err(remove_error) = std::fs::remove_file(&target) {
            warn!(path = %target.display(), error = %remove_error, "Could not remove incomplete file");
        }
        return Err(e);
    }

    if remove_original {
        std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(target)
}

fn decompress(source: &Path, target: &Path) -> Result<()> {
    let input = File::open(source).map_err(|e| Error::io(source, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(input));
    let output = File::create(target).map_err(|e| Error::io(target, e))?;
    let mut writer = BufWriter::new(output);
    std::io::copy(&mut decoder, &mut writer).map_err(|e| Error::io(source, e))?;
    writer.flush().map_err(|e| Error::io(target, e))?;
    Ok(())
}
