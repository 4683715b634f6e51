// src/lib.rs

//! rpmdb: reader for the legacy rpm installed-package database
//!
//! Reads `/var/lib/rpm/Packages`, the Berkeley DB hash file rpm used before
//! moving to SQLite, without linking against Berkeley DB or librpm.
//!
//! # Architecture
//!
//! - `bdb`: hash-database page reader, yields raw values in on-disk order
//! - `header`: rpm header blob decoder with region and length verification
//! - `packages`: projection of header entries onto package records
//! - `database`: the three layers chained, plus batch scanning

pub mod bdb;
pub mod database;
mod error;
pub mod header;
pub mod packages;

pub use database::{
    DatabaseFormat, RpmDatabase, ScanMode, ScanOptions, ScanReport, decode_package,
    detect_database_format, scan_packages,
};
pub use error::{Error, Result};
pub use packages::PackageInfo;
