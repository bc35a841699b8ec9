//! Idempotent download-and-unpack of one plugin archive
//!
//! Layout under the download root:
//!
//! ```text
//! <root>/plugins/<slug>/...               finished package
//! <root>/plugins/<slug>/.wpaudit-complete completion marker
//! <root>/plugins/.staging/<slug>XXXX/     in-flight extraction
//! ```
//!
//! A package directory only ever appears through a rename out of the staging
//! area, after its marker has been written.

use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wpaudit_core::error::AuditError;
use wpaudit_core::types::PackageDescriptor;
use wpaudit_registry::RegistryClient;

use crate::zipfile::extract_zip;
use crate::ArchiveResult;

/// Directory under the download root holding one directory per plugin
pub const PLUGINS_DIR: &str = "plugins";

/// Scratch area for in-flight extractions, inside `PLUGINS_DIR`
pub const STAGING_DIR: &str = ".staging";

/// Written into a package directory once extraction has fully succeeded
pub const MARKER_FILE: &str = ".wpaudit-complete";

/// Contents of the completion marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub slug: String,
    pub version: Option<String>,
    pub download_link: String,
    pub files: usize,
    pub bytes: u64,
    pub extracted_at: DateTime<Utc>,
}

/// What `acquire` did for a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// Archive downloaded and unpacked
    Extracted { files: usize },
    /// Package directory already on disk; `complete` tells whether it has a marker
    AlreadyPresent { complete: bool },
    /// Nothing to download (no archive link)
    Skipped,
}

/// Downloads and unpacks plugin archives under `<root>/plugins`
pub struct ArchiveAcquirer<'a> {
    client: &'a RegistryClient,
    plugins_dir: PathBuf,
    staging_dir: PathBuf,
}

impl<'a> ArchiveAcquirer<'a> {
    /// Prepare `<root>/plugins`, discarding leftovers of interrupted runs
    pub fn new(client: &'a RegistryClient, root: &Path) -> ArchiveResult<Self> {
        let plugins_dir = root.join(PLUGINS_DIR);
        let staging_dir = plugins_dir.join(STAGING_DIR);

        if staging_dir.exists() {
            debug!(path = %staging_dir.display(), "purging stale staging area");
            fs::remove_dir_all(&staging_dir)
                .map_err(|e| AuditError::io(format!("Failed to purge {}", staging_dir.display()), e))?;
        }
        fs::create_dir_all(&staging_dir)
            .map_err(|e| AuditError::io(format!("Failed to create {}", staging_dir.display()), e))?;

        Ok(Self {
            client,
            plugins_dir,
            staging_dir,
        })
    }

    /// `<root>/plugins`
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Where the package for `slug` lives once acquired
    pub fn package_dir(&self, slug: &str) -> PathBuf {
        self.plugins_dir.join(slug)
    }

    /// Download and unpack the descriptor's archive unless already on disk.
    ///
    /// An existing package directory short-circuits before any network or
    /// filesystem write.
    pub async fn acquire(&self, descriptor: &PackageDescriptor) -> ArchiveResult<Acquisition> {
        let slug = descriptor.slug.as_str();
        validate_slug(slug)?;

        let target = self.package_dir(slug);
        if target.exists() {
            let complete = is_complete(&target);
            if complete {
                debug!(slug, "Plugin folder already exists, skipping: {}", target.display());
            } else {
                warn!(
                    slug,
                    "Plugin folder already exists without a completion marker, skipping: {}",
                    target.display()
                );
            }
            return Ok(Acquisition::AlreadyPresent { complete });
        }

        let link = match descriptor.download_link.as_deref() {
            Some(link) if !link.is_empty() => link,
            _ => {
                warn!(slug, "Plugin has no download link, skipping");
                return Ok(Acquisition::Skipped);
            }
        };

        info!(slug, "Downloading and extracting plugin: {}", slug);
        let bytes = self.client.download_archive(link).await?;

        let job = StagedExtraction {
            slug: slug.to_string(),
            version: descriptor.version.clone(),
            download_link: link.to_string(),
            staging_dir: self.staging_dir.clone(),
            target,
        };

        let files = tokio::task::spawn_blocking(move || job.run(bytes))
            .await
            .map_err(|e| AuditError::Archive {
                slug: slug.to_string(),
                reason: format!("extraction task failed: {}", e),
            })??;

        Ok(Acquisition::Extracted { files })
    }
}

/// Everything the blocking half of an acquisition needs
struct StagedExtraction {
    slug: String,
    version: Option<String>,
    download_link: String,
    staging_dir: PathBuf,
    target: PathBuf,
}

impl StagedExtraction {
    fn run(self, bytes: Vec<u8>) -> ArchiveResult<usize> {
        // Dropped on every exit path, taking partial output with it
        let stage = tempfile::Builder::new()
            .prefix(&self.slug)
            .tempdir_in(&self.staging_dir)
            .map_err(|e| AuditError::io(format!("Failed to create staging dir for {}", self.slug), e))?;

        let stats = extract_zip(Cursor::new(bytes), stage.path(), &self.slug)?;

        let staged_package = stage.path().join(&self.slug);
        if !staged_package.is_dir() {
            return Err(AuditError::ArchiveLayout { slug: self.slug });
        }

        let marker = CompletionMarker {
            slug: self.slug.clone(),
            version: self.version,
            download_link: self.download_link,
            files: stats.files,
            bytes: stats.bytes,
            extracted_at: Utc::now(),
        };
        write_marker(&staged_package, &marker)?;

        fs::rename(&staged_package, &self.target).map_err(|e| {
            AuditError::io(format!("Failed to move {} into place", self.slug), e)
        })?;

        debug!(slug = %self.slug, files = stats.files, "package in place");
        Ok(stats.files)
    }
}

/// Whether `package_dir` carries a completion marker
pub fn is_complete(package_dir: &Path) -> bool {
    package_dir.join(MARKER_FILE).is_file()
}

/// Read the completion marker of a package directory
pub fn read_marker(package_dir: &Path) -> ArchiveResult<CompletionMarker> {
    let path = package_dir.join(MARKER_FILE);
    let content = fs::read_to_string(&path)
        .map_err(|e| AuditError::io(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&content).map_err(|e| AuditError::Archive {
        slug: package_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        reason: format!("unreadable completion marker: {}", e),
    })
}

/// Write the marker next to the package contents via temp file + rename
fn write_marker(package_dir: &Path, marker: &CompletionMarker) -> ArchiveResult<()> {
    let final_path = package_dir.join(MARKER_FILE);
    let tmp_path = package_dir.join(format!("{}.tmp", MARKER_FILE));

    let body = serde_json::to_vec_pretty(marker).map_err(|e| AuditError::Archive {
        slug: marker.slug.clone(),
        reason: format!("failed to encode completion marker: {}", e),
    })?;

    fs::write(&tmp_path, body)
        .map_err(|e| AuditError::io(format!("Failed to write {}", tmp_path.display()), e))?;
    fs::rename(&tmp_path, &final_path)
        .map_err(|e| AuditError::io(format!("Failed to write {}", final_path.display()), e))?;

    Ok(())
}

/// A slug must name exactly one visible directory under `plugins/`
fn validate_slug(slug: &str) -> ArchiveResult<()> {
    let mut components = Path::new(slug).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if !single_normal || slug.starts_with('.') || slug.contains('\\') {
        return Err(AuditError::UnsafePath {
            path: slug.to_string(),
        });
    }
    Ok(())
}
