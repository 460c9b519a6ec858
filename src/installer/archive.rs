//! Zip extraction for appliance artifacts.
//!
//! Extraction runs on the blocking pool. Entries overwrite whatever already
//! exists at their target path, and entries that would land outside the
//! destination directory are rejected.

use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use tokio::task::spawn_blocking;
use tracing::debug;
use zip::ZipArchive;

/// Extracts a zip archive held in memory into `dest`.
///
/// Takes ownership of the bytes so they are freed as soon as extraction ends.
/// Returns the number of files written.
pub async fn extract_zip(data: Vec<u8>, dest: &Path) -> io::Result<usize> {
    let dest = dest.to_owned();
    spawn_blocking(move || extract_zip_sync(&data, &dest)).await?
}

fn extract_zip_sync(data: &[u8], dest: &Path) -> io::Result<usize> {
    fs::create_dir_all(dest)?;

    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(invalid_data)?;
    let mut files = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(invalid_data)?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("archive entry '{}' escapes the installation directory", entry.name()),
            ));
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = fs::File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        files += 1;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }

    debug!(
        archive_size = data.len(),
        files,
        "extracted archive into {}",
        dest.display()
    );

    Ok(files)
}

fn invalid_data(e: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}
