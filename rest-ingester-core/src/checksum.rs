//! Datastream checksum algorithms and local digest computation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384, Sha512};

/// Checksum algorithm requested from the repository for uploaded datastreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumType {
    None,
    Md5,
    #[default]
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumType {
    /// Name sent as the `checksumType` form field.
    pub fn fedora_name(self) -> &'static str {
        match self {
            ChecksumType::None => "DISABLED",
            ChecksumType::Md5 => "MD5",
            ChecksumType::Sha1 => "SHA-1",
            ChecksumType::Sha256 => "SHA-256",
            ChecksumType::Sha384 => "SHA-384",
            ChecksumType::Sha512 => "SHA-512",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != ChecksumType::None
    }

    /// Lowercase hex digest of `bytes`, or `None` when checksums are disabled.
    pub fn digest(self, bytes: &[u8]) -> Option<String> {
        let hex = match self {
            ChecksumType::None => return None,
            ChecksumType::Md5 => hex::encode(Md5::digest(bytes)),
            ChecksumType::Sha1 => hex::encode(Sha1::digest(bytes)),
            ChecksumType::Sha256 => hex::encode(Sha256::digest(bytes)),
            ChecksumType::Sha384 => hex::encode(Sha384::digest(bytes)),
            ChecksumType::Sha512 => hex::encode(Sha512::digest(bytes)),
        };
        Some(hex)
    }

    /// Digest of the file at `path`.
    pub fn local_checksum(self, path: &Path) -> std::io::Result<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(self.digest(&bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChecksumType(pub String);

impl fmt::Display for UnknownChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown checksum type {:?} (expected none, MD5, SHA-1, SHA-256, SHA-384 or SHA-512)",
            self.0
        )
    }
}

impl std::error::Error for UnknownChecksumType {}

impl FromStr for ChecksumType {
    type Err = UnknownChecksumType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" | "DISABLED" => Ok(ChecksumType::None),
            "MD5" => Ok(ChecksumType::Md5),
            "SHA-1" | "SHA1" => Ok(ChecksumType::Sha1),
            "SHA-256" | "SHA256" => Ok(ChecksumType::Sha256),
            "SHA-384" | "SHA384" => Ok(ChecksumType::Sha384),
            "SHA-512" | "SHA512" => Ok(ChecksumType::Sha512),
            _ => Err(UnknownChecksumType(s.to_string())),
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fedora_name())
    }
}
