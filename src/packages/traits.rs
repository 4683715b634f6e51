// src/packages/traits.rs

//! Common types shared by package records

use super::tags::{RPMFILE_GHOST, S_IFMT, S_IFREG};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Metadata about one installed file
///
/// Attributes the header does not carry for this position are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub mode: Option<u16>,
    pub size: Option<i32>,
    /// Hex digest in the package's file digest algorithm
    pub digest: Option<String>,
    pub flags: Option<i32>,
    pub user_name: Option<String>,
    pub group_name: Option<String>,
}

impl FileInfo {
    pub fn is_regular(&self) -> bool {
        self.mode.is_some_and(|mode| mode & S_IFMT == S_IFREG)
    }

    /// `%ghost` files are owned by the package but not installed by it
    pub fn is_ghost(&self) -> bool {
        self.flags.is_some_and(|flags| flags & RPMFILE_GHOST != 0)
    }
}

/// Dependency information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Comparison and version, e.g. `>= 2.34`
    pub constraint: Option<String>,
    pub dep_type: DependencyType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Requires,
    Provides,
}

/// Common interface for installed package records
pub trait PackageMetadata {
    /// Get the package name
    fn name(&self) -> &str;

    /// Get the package version
    fn version(&self) -> &str;

    /// Get the package architecture (e.g., "x86_64", "noarch")
    fn architecture(&self) -> Option<&str>;

    /// Get the one-line package summary
    fn summary(&self) -> Option<&str>;

    /// Get the list of installed files
    fn files(&self) -> Result<Vec<FileInfo>>;

    /// Get requirements followed by provides
    fn dependencies(&self) -> Vec<Dependency>;
}
