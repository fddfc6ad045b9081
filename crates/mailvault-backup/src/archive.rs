//! Artifact creation and lookup.
//!
//! A finished working directory is packed into
//! `<archive_dir>/<identifier>_<run_timestamp>.tar.gz`. The artifact is
//! written under a `.partial` name and renamed into place once complete, so
//! a present artifact is always a whole one. Artifact presence is the only
//! resumability marker.

use crate::compression::{calculate_checksum, effective_level, DEFAULT_COMPRESSION_LEVEL};
use crate::error::PackagingError;
use crate::manifest::{ArchiveManifest, MANIFEST_FILENAME};
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use mailvault_core::types::{ARCHIVE_EXTENSION, PARTIAL_SUFFIX};
use mailvault_core::{EntityRecord, RunLayout, RunTimestamp};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tar::{Builder as TarBuilder, Header};
use walkdir::WalkDir;

/// A packaged backup.
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub entity_identifier: String,
    pub run_timestamp: RunTimestamp,
    pub created_at: DateTime<Utc>,
    /// Size of the compressed artifact
    pub size_bytes: u64,
    pub path: PathBuf,
    /// SHA256 of the artifact, hex encoded
    pub checksum: String,
    /// Files packed from the working directory
    pub file_count: usize,
}

/// Packs working directories into artifacts.
#[derive(Debug, Clone)]
pub struct ArchivePackager {
    layout: RunLayout,
    compression_level: u32,
    tool_name: String,
}

impl ArchivePackager {
    pub fn new(layout: RunLayout, tool_name: impl Into<String>) -> Self {
        Self {
            layout,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            tool_name: tool_name.into(),
        }
    }

    /// Sets the compression level.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = effective_level(level);
        self
    }

    /// Package `work_dir` for `entity`, then remove the working directory.
    ///
    /// A missing or empty working directory still yields an artifact holding
    /// only the manifest.
    pub fn package(&self, entity: &EntityRecord, work_dir: &Path) -> Result<ArchiveRecord, PackagingError> {
        let final_path = self.layout.archive_path(&entity.identifier);
        let partial_path = partial_path_for(&final_path);

        let files = collect_files(work_dir)?;
        let total_size_bytes = files.iter().map(|(_, size)| size).sum();
        let manifest = ArchiveManifest::new(
            &entity.identifier,
            &entity.display_name,
            self.layout.run_timestamp().as_str(),
            &self.tool_name,
            files.len(),
            total_size_bytes,
        );

        if let Err(e) = self.write_archive(&partial_path, work_dir, &files, &manifest) {
            let _ = fs::remove_file(&partial_path);
            return Err(e);
        }
        fs::rename(&partial_path, &final_path)?;

        let size_bytes = fs::metadata(&final_path)?.len();
        let checksum = calculate_checksum(&final_path)?;

        tracing::info!(
            account = %entity.identifier,
            path = %final_path.display(),
            size_bytes,
            files = files.len(),
            "Created archive"
        );

        match remove_work_dir(work_dir, &self.layout.temp_root()) {
            Ok(true) => tracing::debug!("Removed working directory {}", work_dir.display()),
            Ok(false) => {}
            Err(e) => tracing::warn!("{}", e),
        }

        Ok(ArchiveRecord {
            entity_identifier: entity.identifier.clone(),
            run_timestamp: self.layout.run_timestamp().clone(),
            created_at: manifest.created_at,
            size_bytes,
            path: final_path,
            checksum,
            file_count: files.len(),
        })
    }

    fn write_archive(
        &self,
        output_path: &Path,
        work_dir: &Path,
        files: &[(PathBuf, u64)],
        manifest: &ArchiveManifest,
    ) -> Result<(), PackagingError> {
        let file = create_private(output_path)?;
        let encoder = GzEncoder::new(file, Compression::new(self.compression_level));
        let mut tar = TarBuilder::new(encoder);

        // Manifest first
        let json = manifest
            .to_json()
            .map_err(|e| PackagingError::archive(output_path, e))?;
        let mut header = Header::new_gnu();
        header.set_size(json.len() as u64);
        header.set_mode(0o600);
        header.set_mtime(manifest.created_at.timestamp().max(0) as u64);
        header.set_cksum();
        tar.append_data(&mut header, MANIFEST_FILENAME, json.as_bytes())?;

        for (rel_path, _) in files {
            tar.append_path_with_name(work_dir.join(rel_path), rel_path)?;
        }

        let encoder = tar.into_inner()?;
        let file = encoder.finish()?;
        file.sync_all()?;
        Ok(())
    }
}

/// Files under `dir` as (relative path, size), sorted for stable output
fn collect_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>, PackagingError> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| PackagingError::archive(dir, format!("Failed to walk directory: {e}")))?;
        if entry.file_type().is_file() {
            let rel_path = entry
                .path()
                .strip_prefix(dir)
                .map_err(|e| PackagingError::archive(dir, e))?
                .to_path_buf();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push((rel_path, size));
        }
    }

    Ok(files)
}

/// Count regular files under `dir`, recursively
pub fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

fn partial_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Remove a working directory, but only when it lies strictly inside `root`
///
/// Returns `Ok(false)` when there was nothing to remove.
pub fn remove_work_dir(work_dir: &Path, root: &Path) -> Result<bool, PackagingError> {
    if !work_dir.exists() {
        return Ok(false);
    }

    let canonical = work_dir.canonicalize()?;
    let canonical_root = root.canonicalize()?;
    if canonical == canonical_root || !canonical.starts_with(&canonical_root) {
        return Err(PackagingError::UnsafeCleanup {
            path: canonical,
            root: canonical_root,
        });
    }

    fs::remove_dir_all(&canonical)?;
    Ok(true)
}

/// An artifact found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub identifier: String,
    pub run_timestamp: RunTimestamp,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Lookup over the artifacts in an archive directory
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    archive_dir: PathBuf,
}

impl ArchiveIndex {
    pub fn new(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
        }
    }

    /// Existing artifact for an account from any run
    pub fn find_existing(&self, identifier: &str) -> Option<PathBuf> {
        self.entries()
            .into_iter()
            .find(|entry| entry.identifier == identifier)
            .map(|entry| entry.path)
    }

    /// Artifacts produced by one run, sorted by name
    pub fn created_in_run(&self, run_timestamp: &RunTimestamp) -> Vec<ArchiveEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| &entry.run_timestamp == run_timestamp)
            .collect()
    }

    /// Every complete artifact, sorted by name
    ///
    /// `.partial` files and names that do not end in a valid run timestamp
    /// are ignored.
    pub fn entries(&self) -> Vec<ArchiveEntry> {
        let Ok(dir) = fs::read_dir(&self.archive_dir) else {
            return Vec::new();
        };

        let suffix = format!(".{}", ARCHIVE_EXTENSION);
        let mut entries: Vec<ArchiveEntry> = dir
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let stem = name.strip_suffix(&suffix)?;
                let (identifier, timestamp) = stem.rsplit_once('_')?;
                let run_timestamp = RunTimestamp::parse(timestamp)?;
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() || identifier.is_empty() {
                    return None;
                }
                Some(ArchiveEntry {
                    identifier: identifier.to_string(),
                    run_timestamp,
                    path: entry.path(),
                    size_bytes: metadata.len(),
                })
            })
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}
