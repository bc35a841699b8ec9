//! Zip extraction functionality
//!
//! This module provides safe zip extraction with path validation to prevent
//! directory traversal attacks from hostile archives.

use std::fs;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use wpaudit_core::error::AuditError;
use wpaudit_core::utils::safe_join;

use crate::ArchiveResult;

/// Largest single entry we are willing to unpack (256 MiB)
pub const MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

/// Counters describing one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
    pub skipped: usize,
}

/// Extract a zip archive into `dest_dir`.
///
/// `label` names the archive in errors. Any entry that would land outside
/// `dest_dir` aborts the extraction; symlinks and oversized entries are skipped.
pub fn extract_zip<R: Read + Seek>(reader: R, dest_dir: &Path, label: &str) -> ArchiveResult<ExtractStats> {
    extract_zip_with_limit(reader, dest_dir, label, MAX_ENTRY_SIZE)
}

/// [`extract_zip`] with an explicit per-entry size cap.
///
/// An entry whose header claims to fit but inflates past the cap fails the
/// whole extraction rather than being kept truncated.
pub(crate) fn extract_zip_with_limit<R: Read + Seek>(
    reader: R,
    dest_dir: &Path,
    label: &str,
    max_entry_size: u64,
) -> ArchiveResult<ExtractStats> {
    let mut archive = ZipArchive::new(reader).map_err(|e| zip_error(label, e))?;

    fs::create_dir_all(dest_dir)
        .map_err(|e| AuditError::io(format!("Failed to create {}", dest_dir.display()), e))?;

    let mut stats = ExtractStats::default();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| zip_error(label, e))?;

        let relative = entry.enclosed_name().ok_or_else(|| AuditError::UnsafePath {
            path: entry.name().to_string(),
        })?;
        let safe_path = safe_join(dest_dir, &relative)?;

        if entry.is_dir() {
            fs::create_dir_all(&safe_path)
                .map_err(|e| AuditError::io(format!("Failed to create {}", safe_path.display()), e))?;
            stats.directories += 1;
            continue;
        }

        if entry.is_symlink() {
            warn!(archive = label, entry = entry.name(), "skipping symlink entry");
            stats.skipped += 1;
            continue;
        }

        if entry.size() > max_entry_size {
            warn!(archive = label, entry = entry.name(), size = entry.size(), "skipping oversized entry");
            stats.skipped += 1;
            continue;
        }

        if let Some(parent) = safe_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AuditError::io(format!("Failed to create {}", parent.display()), e))?;
        }

        let mut file = fs::File::create(&safe_path)
            .map_err(|e| AuditError::io(format!("Failed to create {}", safe_path.display()), e))?;

        // A corrupt deflate stream surfaces here as an io::Error
        let written = std::io::copy(&mut (&mut entry).take(max_entry_size + 1), &mut file)
            .map_err(|e| AuditError::Archive {
                slug: label.to_string(),
                reason: format!("failed to inflate {}: {}", relative.display(), e),
            })?;

        if written > max_entry_size {
            return Err(AuditError::Archive {
                slug: label.to_string(),
                reason: format!(
                    "{} inflates past {} bytes although its header claims {}",
                    relative.display(),
                    max_entry_size,
                    entry.size()
                ),
            });
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                // Always keep the owner able to read and later delete the tree
                let permissions = fs::Permissions::from_mode((mode & 0o777) | 0o600);
                let _ = fs::set_permissions(&safe_path, permissions);
            }
        }

        stats.files += 1;
        stats.bytes += written;
    }

    debug!(archive = label, files = stats.files, bytes = stats.bytes, "archive extracted");
    Ok(stats)
}

fn zip_error(label: &str, err: ZipError) -> AuditError {
    let reason = match err {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            format!("Not a zip file or corrupt zip file ({})", err)
        }
        other => other.to_string(),
    };
    AuditError::Archive {
        slug: label.to_string(),
        reason,
    }
}
