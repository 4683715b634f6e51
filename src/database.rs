// src/database.rs

//! Installed-package database facade
//!
//! Chains the three layers: the hash page reader produces raw values, the
//! header decoder turns each into entries, and the projector builds a
//! [`PackageInfo`] from them.

use crate::bdb::metadata::{HASH_MAGIC, HASH_MAGIC_SWAPPED};
use crate::bdb::{Endian, Entries, HashDatabase, HashFileMetadata, RawEntry};
use crate::error::{Error, Result};
use crate::header::header_import;
use crate::packages::{PackageInfo, get_nevra};
use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};

/// Decode one raw database value into a package record
pub fn decode_package(blob: &[u8]) -> Result<PackageInfo> {
    let entries = header_import(blob)?;
    get_nevra(&entries)
}

/// An opened rpm `Packages` database
pub struct RpmDatabase<R = BufReader<File>> {
    db: HashDatabase<R>,
}

impl RpmDatabase<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: HashDatabase::open(path)?,
        })
    }
}

impl<R: Read + Seek> RpmDatabase<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        Ok(Self {
            db: HashDatabase::from_reader(reader)?,
        })
    }

    pub fn metadata(&self) -> &HashFileMetadata {
        self.db.metadata()
    }

    /// Lazily decode every package in on-disk order
    ///
    /// A malformed header yields an `Err` for that package only; the
    /// iterator ends after the first read error.
    pub fn packages(&mut self) -> Packages<'_, R> {
        Packages {
            entries: self.db.entries(),
        }
    }

    pub fn into_inner(self) -> R {
        self.db.into_inner()
    }
}

pub struct Packages<'a, R> {
    entries: Entries<'a, R>,
}

impl<R: Read + Seek> Iterator for Packages<'_, R> {
    type Item = Result<PackageInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        Some(entry.and_then(|entry| decode_package(&entry.value)))
    }
}

/// How the page reader is driven during a batch scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanMode {
    /// Pages are read on the calling thread as values are consumed
    #[default]
    Inline,
    /// Pages are read on a dedicated producer thread
    Background,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub mode: ScanMode,
    /// Decode headers on the rayon thread pool
    pub parallel_decode: bool,
    /// Record malformed headers and keep going instead of failing
    pub skip_invalid: bool,
}

/// A header that could not be decoded during a tolerant scan
#[derive(Debug)]
pub struct SkippedEntry {
    pub page_no: u32,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Packages in on-disk order
    pub packages: Vec<PackageInfo>,
    pub skipped: Vec<SkippedEntry>,
}

impl ScanReport {
    fn record(
        &mut self,
        page_no: u32,
        result: Result<PackageInfo>,
        skip_invalid: bool,
    ) -> Result<()> {
        match result {
            Ok(package) => self.packages.push(package),
            Err(error) if skip_invalid => {
                warn!("Skipping malformed header on page {}: {}", page_no, error);
                self.skipped.push(SkippedEntry { page_no, error });
            }
            Err(error) => return Err(error),
        }
        Ok(())
    }
}

/// Read every package from the database at `path`
///
/// Read errors and database-level format errors always abort the scan.
/// Header decode errors abort it too unless `skip_invalid` is set.
///
/// # Arguments
///
/// * `path` - Path to the `Packages` file
/// * `options` - Reader mode, parallel decoding and error tolerance
pub fn scan_packages(path: impl AsRef<Path>, options: &ScanOptions) -> Result<ScanReport> {
    let path = path.as_ref();
    let mut db = HashDatabase::open(path)?;
    info!(
        "Scanning {} ({} pages of {} bytes)",
        path.display(),
        u64::from(db.metadata().last_page_no) + 1,
        db.metadata().page_size
    );

    let entries: Box<dyn Iterator<Item = Result<RawEntry>> + '_> = match options.mode {
        ScanMode::Inline => Box::new(db.entries()),
        ScanMode::Background => Box::new(db.spawn_scan()?),
    };

    let mut report = ScanReport::default();

    if options.parallel_decode {
        let raw: Vec<RawEntry> = entries.collect::<Result<_>>()?;
        debug!("Decoding {} headers in parallel", raw.len());

        let decoded: Vec<(u32, Result<PackageInfo>)> = raw
            .par_iter()
            .map(|entry| (entry.page_no, decode_package(&entry.value)))
            .collect();
        for (page_no, result) in decoded {
            report.record(page_no, result, options.skip_invalid)?;
        }
    } else {
        for entry in entries {
            let entry = entry?;
            report.record(entry.page_no, decode_package(&entry.value), options.skip_invalid)?;
        }
    }

    info!(
        "Read {} packages from {} ({} skipped)",
        report.packages.len(),
        path.display(),
        report.skipped.len()
    );
    Ok(report)
}

/// On-disk formats an rpm database can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseFormat {
    /// Legacy Berkeley DB hash file (`Packages`)
    BerkeleyHash(Endian),
    /// rpm >= 4.16 default (`rpmdb.sqlite`)
    Sqlite,
    /// rpm native database (`Packages.db`)
    Ndb,
    Unknown,
}

impl DatabaseFormat {
    pub fn is_readable(self) -> bool {
        matches!(self, DatabaseFormat::BerkeleyHash(_))
    }
}

/// Detect the database format from magic bytes
pub fn detect_database_format(path: impl AsRef<Path>) -> Result<DatabaseFormat> {
    let mut magic = Vec::with_capacity(16);
    File::open(path.as_ref())?.take(16).read_to_end(&mut magic)?;

    // SQLite header: "SQLite format 3\0"
    if magic.starts_with(b"SQLite format 3\0") {
        return Ok(DatabaseFormat::Sqlite);
    }

    // NDB package index: "RpmP" at offset 0
    if magic.starts_with(b"RpmP") {
        return Ok(DatabaseFormat::Ndb);
    }

    // Berkeley DB: magic number at offset 12 in either byte order
    if magic.len() == 16 {
        match LittleEndian::read_u32(&magic[12..16]) {
            HASH_MAGIC => return Ok(DatabaseFormat::BerkeleyHash(Endian::Little)),
            HASH_MAGIC_SWAPPED => return Ok(DatabaseFormat::BerkeleyHash(Endian::Big)),
            _ => {}
        }
    }

    Ok(DatabaseFormat::Unknown)
}
