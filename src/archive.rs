//! ZIP packing and unpacking for project trees and model uploads.
//!
//! Hydrus and Modflow models arrive as ZIP archives and whole projects are
//! downloaded as one. Archives are small (model input decks), so both
//! directions work on in-memory buffers; the DAOs run these functions on the
//! blocking pool.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;

use crate::error::AppError;

/// Unpack an uploaded archive into `(relative path, content)` pairs.
///
/// Directory entries are skipped (paths are implied by the file entries) and
/// Windows-style separators are normalized to `/`.
///
/// # Errors
///
/// - `Archive` when the data is not a readable ZIP file
/// - `InvalidRequest` when an entry would escape the extraction root
///   (absolute path or `..` component)
pub fn unpack_archive(data: &[u8]) -> Result<Vec<(String, Vec<u8>)>, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let path = file
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "Archive entry escapes the extraction root: {}",
                    file.name()
                ))
            })?;
        let name = path.to_string_lossy().replace('\\', "/");
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        entries.push((name, content));
    }
    Ok(entries)
}

/// Pack `(relative path, content)` pairs into a ZIP archive.
pub fn pack_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, AppError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(content)?;
    }
    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
