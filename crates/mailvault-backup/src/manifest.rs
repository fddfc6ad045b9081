//! Artifact manifest format.
//!
//! The manifest is stored as the first member of every artifact, describing
//! which account it holds, which run produced it and what went in.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PackagingError;

/// Version of the manifest format.
pub const MANIFEST_VERSION: &str = "1.0.0";

/// Name of the manifest member in the artifact.
pub const MANIFEST_FILENAME: &str = ".mailvault-manifest.json";

/// Manifest stored in each artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    /// Manifest format version
    pub version: String,

    /// Account identifier
    pub entity: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    /// Run that produced the artifact
    pub run_timestamp: String,

    pub created_at: DateTime<Utc>,

    /// What created this artifact (e.g., "mailvault v0.4.0")
    pub created_by: String,

    /// Backup tool that produced the contents
    pub tool: String,

    pub compression: String,

    /// Files from the working directory (manifest excluded)
    pub file_count: usize,

    /// Total uncompressed size of those files in bytes
    pub total_size_bytes: u64,
}

impl ArchiveManifest {
    pub fn new(
        entity: impl Into<String>,
        display_name: impl Into<String>,
        run_timestamp: impl Into<String>,
        tool: impl Into<String>,
        file_count: usize,
        total_size_bytes: u64,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            entity: entity.into(),
            display_name: display_name.into(),
            run_timestamp: run_timestamp.into(),
            created_at: Utc::now(),
            created_by: format!("mailvault v{}", env!("CARGO_PKG_VERSION")),
            tool: tool.into(),
            compression: "gzip".to_string(),
            file_count,
            total_size_bytes,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Read the manifest from the first member of an artifact
pub fn read_manifest(archive_path: &Path) -> Result<ArchiveManifest, PackagingError> {
    let file = File::open(archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut entries = archive.entries()?;
    let mut first = entries
        .next()
        .ok_or_else(|| PackagingError::archive(archive_path, "archive is empty"))??;

    let name = first.path()?.to_string_lossy().into_owned();
    if name != MANIFEST_FILENAME {
        return Err(PackagingError::archive(
            archive_path,
            format!("first member is {name}, expected {MANIFEST_FILENAME}"),
        ));
    }

    let mut json = String::new();
    first.read_to_string(&mut json)?;
    ArchiveManifest::from_json(&json).map_err(|e| PackagingError::archive(archive_path, e))
}
