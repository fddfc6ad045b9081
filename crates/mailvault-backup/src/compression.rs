//! Compression settings and artifact checksums

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Default compression level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

pub const CHECKSUM_ALGORITHM: &str = "sha256";

/// Clamp a configured level into the range gzip accepts
pub fn effective_level(level: u32) -> u32 {
    level.clamp(1, 9)
}

/// Calculates SHA256 checksum of a file.
pub fn calculate_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;

    Ok(format!("{:x}", hasher.finalize()))
}
