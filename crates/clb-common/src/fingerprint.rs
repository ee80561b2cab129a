//! Source file fingerprints recorded alongside an import run

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// SHA-256 digest and size of an input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Lowercase hex SHA-256 digest
    pub sha256: String,
    /// Number of bytes hashed
    pub bytes: u64,
}

impl Fingerprint {
    /// Fingerprint a file on disk
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        Self::of_reader(&mut file)
    }

    /// Fingerprint any readable source
    pub fn of_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        let mut bytes = 0u64;

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
            bytes += bytes_read as u64;
        }

        Ok(Self {
            sha256: hex::encode(hasher.finalize()),
            bytes,
        })
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{} ({} bytes)", self.sha256, self.bytes)
    }
}
