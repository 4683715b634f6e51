// src/packages/mod.rs

//! Installed package records
//!
//! Turns the entries of one decoded header into a [`PackageInfo`]: identity,
//! provenance, signature summaries, dependencies and the per-file arrays
//! from which the installed file list is rebuilt.

pub mod pgp;
pub mod rpm;
pub mod tags;
pub mod traits;
pub mod verify;

pub use pgp::PgpSignature;
pub use rpm::{DigestAlgorithm, PackageInfo, get_nevra};
pub use traits::{Dependency, DependencyType, FileInfo, PackageMetadata};
pub use verify::{FileStatus, FileVerification, verify_files};
