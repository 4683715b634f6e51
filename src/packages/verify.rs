// src/packages/verify.rs

//! Check installed files against the sizes and digests rpm recorded

use crate::error::{Error, Result};
use crate::packages::rpm::{DigestAlgorithm, PackageInfo};
use crate::packages::traits::FileInfo;
use serde::Serialize;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Outcome of checking one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Ok,
    Missing,
    /// Present but could not be read
    Unreadable { reason: String },
    SizeMismatch { expected: i64, actual: u64 },
    DigestMismatch { expected: String, actual: String },
    /// Digest algorithm is not one this build can recompute
    Unchecked { algorithm: DigestAlgorithm },
}

impl FileStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileStatus::Missing
                | FileStatus::Unreadable { .. }
                | FileStatus::SizeMismatch { .. }
                | FileStatus::DigestMismatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileVerification {
    pub path: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Verify the regular files of a package installed below `root`
///
/// Directories, symlinks and `%ghost` files are skipped. A file digest
/// algorithm code the crate does not know fails the whole call.
///
/// # Arguments
///
/// * `package` - Package record read from the database
/// * `root` - Filesystem root the package was installed into (usually `/`)
pub fn verify_files(package: &PackageInfo, root: &Path) -> Result<Vec<FileVerification>> {
    let files = package.installed_files()?;
    let mut algorithm = None;
    let mut results = Vec::new();

    for file in files.iter().filter(|f| f.is_regular() && !f.is_ghost()) {
        if file.digest.is_some() && algorithm.is_none() {
            algorithm = Some(package.digest_algorithm()?);
        }

        let status = verify_file(file, root, algorithm)?;
        debug!("Verified {}: {:?}", file.path, status);
        results.push(FileVerification {
            path: file.path.clone(),
            status,
        });
    }

    Ok(results)
}

fn verify_file(
    file: &FileInfo,
    root: &Path,
    algorithm: Option<DigestAlgorithm>,
) -> Result<FileStatus> {
    let full_path = root.join(file.path.trim_start_matches('/'));

    let metadata = match fs::symlink_metadata(&full_path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FileStatus::Missing),
        Err(e) => return Ok(FileStatus::Unreadable { reason: e.to_string() }),
    };

    if let Some(expected) = file.size {
        let expected = i64::from(expected);
        if u64::try_from(expected).ok() != Some(metadata.len()) {
            return Ok(FileStatus::SizeMismatch {
                expected,
                actual: metadata.len(),
            });
        }
    }

    let (Some(expected), Some(algorithm)) = (file.digest.as_deref(), algorithm) else {
        return Ok(FileStatus::Ok);
    };

    let actual = match algorithm {
        DigestAlgorithm::Sha224 => hash_file::<Sha224>(&full_path),
        DigestAlgorithm::Sha256 => hash_file::<Sha256>(&full_path),
        DigestAlgorithm::Sha384 => hash_file::<Sha384>(&full_path),
        DigestAlgorithm::Sha512 => hash_file::<Sha512>(&full_path),
        other => return Ok(FileStatus::Unchecked { algorithm: other }),
    };

    match actual {
        Ok(actual) if actual.eq_ignore_ascii_case(expected) => Ok(FileStatus::Ok),
        Ok(actual) => Ok(FileStatus::DigestMismatch {
            expected: expected.to_string(),
            actual,
        }),
        Err(Error::Io(e)) => Ok(FileStatus::Unreadable { reason: e.to_string() }),
        Err(e) => Err(e),
    }
}

fn hash_file<D: Digest + Write>(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    io::copy(&mut file, &mut hasher)?;

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
