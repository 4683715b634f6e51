// src/bdb/mod.rs

//! Berkeley DB hash database reader
//!
//! Reads the legacy `/var/lib/rpm/Packages` file page by page and yields the
//! raw bytes of every stored value. Values that do not fit in a hash bucket
//! live in chains of overflow pages; those chains are reassembled here.
//!
//! This layer knows nothing about RPM. Everything it produces is an opaque
//! byte blob handed to [`crate::header`].
//!
//! Only the hash access method is supported. Btree, queue and recno
//! databases, encrypted databases and write-ahead log recovery are not.

mod entries;
pub mod metadata;
pub mod page;
#[doc(hidden)]
pub mod testing;

pub use entries::{Entries, RawEntry, ScanEvent, Scanner};
pub use metadata::HashFileMetadata;

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use page::{OffPageEntry, PAGE_HEADER_SIZE, PageHeader, PageType};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

/// Byte order of the integers stored in database pages
///
/// Decided once from the metadata page magic number and applied to every
/// page read afterwards. RPM header blobs are unaffected; they are always
/// big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub(crate) fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    pub(crate) fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    /// True when the file was written on a host of the opposite byte order
    /// to the little-endian layout Berkeley DB magic numbers are checked in
    pub fn is_swapped(self) -> bool {
        self == Endian::Big
    }
}

/// An opened Berkeley DB hash database
///
/// Owns the file handle. Pages are read on demand and never cached.
pub struct HashDatabase<R = BufReader<File>> {
    reader: R,
    metadata: HashFileMetadata,
}

impl HashDatabase<BufReader<File>> {
    /// Open a hash database file and validate its metadata page
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database file (usually `/var/lib/rpm/Packages`)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening Berkeley DB hash database: {}", path.display());

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> HashDatabase<R> {
    /// Wrap any seekable byte source holding a hash database
    pub fn from_reader(mut reader: R) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;

        let mut buf = [0u8; metadata::METADATA_PAGE_SIZE];
        reader.read_exact(&mut buf)?;

        let metadata = HashFileMetadata::parse(&buf)?;
        debug!(
            "Hash metadata: version {}, page size {}, last page {}, {:?} endian",
            metadata.version, metadata.page_size, metadata.last_page_no, metadata.endian
        );

        Ok(Self { reader, metadata })
    }

    /// Metadata parsed from the first page
    pub fn metadata(&self) -> &HashFileMetadata {
        &self.metadata
    }

    /// Lazily iterate over every stored value in on-disk page/slot order
    pub fn entries(&mut self) -> Entries<'_, R> {
        Entries::new(self)
    }

    /// Give back the underlying reader, closing nothing
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read one full page. A short read is an error, never padded.
    pub(crate) fn read_page(&mut self, page_no: u32) -> Result<Vec<u8>> {
        let page_size = self.metadata.page_size as usize;
        let position = u64::from(page_no) * u64::from(self.metadata.page_size);

        self.reader.seek(SeekFrom::Start(position))?;
        let mut page = vec![0u8; page_size];
        self.reader.read_exact(&mut page)?;

        Ok(page)
    }

    /// Follow an overflow chain and concatenate its fragments into one value
    pub(crate) fn read_overflow_value(&mut self, entry: &OffPageEntry) -> Result<Vec<u8>> {
        let endian = self.metadata.endian;
        let last_page_no = self.metadata.last_page_no;

        // A chain can visit each page at most once.
        let max_hops = u64::from(last_page_no) + 1;
        let mut hops = 0u64;

        let mut value = Vec::new();
        let mut current = entry.page_no;

        while current != 0 {
            hops += 1;
            if hops > max_hops {
                return Err(Error::Format(format!(
                    "overflow chain starting at page {} does not terminate",
                    entry.page_no
                )));
            }
            if current > last_page_no {
                return Err(Error::Format(format!(
                    "overflow page {} is beyond the last page {}",
                    current, last_page_no
                )));
            }

            let page = self.read_page(current)?;
            let header = PageHeader::parse(&page, endian)?;

            if header.page_type != PageType::Overflow {
                debug!(
                    "Skipping page {} of type {:?} inside overflow chain",
                    current, header.page_type
                );
                current = header.next_page_no;
                continue;
            }

            if header.next_page_no == 0 {
                let end = PAGE_HEADER_SIZE + header.free_area_offset as usize;
                let fragment = page.get(PAGE_HEADER_SIZE..end).ok_or_else(|| {
                    Error::Format(format!(
                        "overflow page {} claims {} bytes, page size is {}",
                        current,
                        header.free_area_offset,
                        page.len()
                    ))
                })?;
                value.extend_from_slice(fragment);
            } else {
                value.extend_from_slice(&page[PAGE_HEADER_SIZE..]);
            }

            current = header.next_page_no;
        }

        if value.len() != entry.length as usize {
            warn!(
                "Overflow value at page {} is {} bytes, descriptor says {}",
                entry.page_no,
                value.len(),
                entry.length
            );
        }

        Ok(value)
    }
}

impl<R: Read + Seek + Send + 'static> HashDatabase<R> {
    /// Scan the database on a background thread
    ///
    /// A single producer walks the pages and pushes every value into an
    /// unbounded channel, followed by a terminal [`ScanEvent::Done`] or a
    /// [`ScanEvent::Failed`] carrying the error. The returned [`Scanner`]
    /// yields them in the same order. Dropping the scanner stops the
    /// producer at its next send, which also drops the file handle.
    pub fn spawn_scan(mut self) -> Result<Scanner> {
        let (tx, rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("rpmdb-scan".to_string())
            .spawn(move || {
                for item in self.entries() {
                    let event = match item {
                        Ok(entry) => ScanEvent::Entry(entry),
                        Err(e) => ScanEvent::Failed(e),
                    };
                    let failed = matches!(event, ScanEvent::Failed(_));

                    if tx.send(event).is_err() {
                        debug!("Scan consumer went away, stopping");
                        return;
                    }
                    if failed {
                        return;
                    }
                }
                let _ = tx.send(ScanEvent::Done);
            })?;

        Ok(Scanner::new(rx, worker))
    }
}
