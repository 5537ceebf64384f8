//! Archive extraction.
//!
//! Supported formats:
//! - `.zip` (the exporting application's native backup format)
//! - `.tar.gz` / `.tgz`
//! - `.tar.zst`
//!
//! Extraction is skipped entirely when the target directory already exists,
//! even if the archive changed since it was first unpacked. A failed
//! extraction leaves whatever was written so far in place.

use crate::models::ArchiveFormat;
use crate::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

/// Ensure `archive` has been unpacked into `target`.
///
/// Returns `true` if extraction ran, `false` if `target` already existed.
pub fn ensure_unpacked(archive: &Path, target: &Path) -> Result<bool> {
    if target.exists() {
        tracing::debug!(target = %target.display(), "already unpacked");
        return Ok(false);
    }

    let format = archive
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(ArchiveFormat::detect)
        .map(|(format, _)| format)
        .ok_or_else(|| {
            Error::Extraction(format!("unrecognized archive type: {}", archive.display()))
        })?;

    // Open before creating the target so a missing archive leaves nothing behind
    let file = File::open(archive)?;
    fs::create_dir_all(target)?;

    tracing::info!(archive = %archive.display(), target = %target.display(), %format, "unpacking archive");
    match format {
        ArchiveFormat::Zip => unpack_zip(file, target),
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(BufReader::new(file)), target),
        ArchiveFormat::TarZst => {
            let decoder = zstd::stream::read::Decoder::new(file)
                .map_err(|e| Error::Extraction(format!("invalid zstd stream: {}", e)))?;
            unpack_tar(decoder, target)
        }
        ArchiveFormat::Json => Err(Error::InvalidInput(format!(
            "{} is a plain export and cannot be unpacked",
            archive.display()
        ))),
    }?;
    Ok(true)
}

fn unpack_zip(file: File, target: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    archive.extract(target)?;
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, target: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive
        .unpack(target)
        .map_err(|e| Error::Extraction(format!("tar extraction failed: {}", e)))
}
