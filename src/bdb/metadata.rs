// src/bdb/metadata.rs

//! Hash database metadata page
//!
//! The first 512 bytes of the file hold the generic Berkeley DB metadata
//! followed by the hash access method fields at offset 72.

use super::Endian;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Bytes of the metadata page that are parsed, regardless of page size
pub const METADATA_PAGE_SIZE: usize = 512;

/// Hash access method magic number as read on a matching-endian host
pub const HASH_MAGIC: u32 = 0x0006_1561;

/// The same magic number written by an opposite-endian host
pub const HASH_MAGIC_SWAPPED: u32 = 0x6115_0600;

/// Page type code of a hash metadata page
pub const HASH_METADATA_PAGE_TYPE: u8 = 8;

/// Page sizes Berkeley DB can create
pub const VALID_PAGE_SIZES: [u32; 7] = [512, 1024, 2048, 4096, 8192, 16384, 32768];

const MAGIC_OFFSET: usize = 12;
const HASH_FIELDS_OFFSET: u64 = 72;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFileMetadata {
    pub lsn: [u8; 8],
    pub page_no: u32,
    pub magic: u32,
    pub version: u32,
    pub page_size: u32,
    pub encryption_algorithm: u8,
    pub page_type: u8,
    pub meta_flags: u8,
    pub free_list_page: u32,
    pub last_page_no: u32,
    pub n_parts: u32,
    pub key_count: u32,
    pub record_count: u32,
    pub flags: u32,
    pub unique_file_id: [u8; 19],

    // Hash access method fields
    pub max_bucket: u32,
    pub high_mask: u32,
    pub low_mask: u32,
    pub fill_factor: u32,
    pub num_keys: u32,
    pub char_key_hash: u32,

    /// Byte order detected from the magic number
    pub endian: Endian,
}

impl HashFileMetadata {
    /// Parse and validate the metadata page
    ///
    /// The magic number decides the byte order: the canonical constant means
    /// little-endian, the byte-swapped constant means big-endian, anything
    /// else is not a hash database.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < METADATA_PAGE_SIZE {
            return Err(Error::Format(format!(
                "metadata page is {} bytes, expected {}",
                buf.len(),
                METADATA_PAGE_SIZE
            )));
        }

        let endian = match LittleEndian::read_u32(&buf[MAGIC_OFFSET..MAGIC_OFFSET + 4]) {
            HASH_MAGIC => Endian::Little,
            HASH_MAGIC_SWAPPED => Endian::Big,
            other => {
                return Err(Error::Format(format!(
                    "unexpected magic number {:#010x}, not a Berkeley DB hash file",
                    other
                )));
            }
        };

        let metadata = match endian {
            Endian::Little => Self::parse_with::<LittleEndian>(buf, endian)?,
            Endian::Big => Self::parse_with::<BigEndian>(buf, endian)?,
        };
        metadata.validate()?;

        Ok(metadata)
    }

    fn parse_with<E: ByteOrder>(buf: &[u8], endian: Endian) -> Result<Self> {
        let mut r = Cursor::new(buf);

        let mut lsn = [0u8; 8];
        r.read_exact(&mut lsn)?;
        let page_no = r.read_u32::<E>()?;
        let magic = r.read_u32::<E>()?;
        let version = r.read_u32::<E>()?;
        let page_size = r.read_u32::<E>()?;
        let encryption_algorithm = r.read_u8()?;
        let page_type = r.read_u8()?;
        let meta_flags = r.read_u8()?;
        let _unused = r.read_u8()?;
        let free_list_page = r.read_u32::<E>()?;
        let last_page_no = r.read_u32::<E>()?;
        let n_parts = r.read_u32::<E>()?;
        let key_count = r.read_u32::<E>()?;
        let record_count = r.read_u32::<E>()?;
        let flags = r.read_u32::<E>()?;
        let mut unique_file_id = [0u8; 19];
        r.read_exact(&mut unique_file_id)?;

        r.set_position(HASH_FIELDS_OFFSET);

        Ok(Self {
            lsn,
            page_no,
            magic,
            version,
            page_size,
            encryption_algorithm,
            page_type,
            meta_flags,
            free_list_page,
            last_page_no,
            n_parts,
            key_count,
            record_count,
            flags,
            unique_file_id,
            max_bucket: r.read_u32::<E>()?,
            high_mask: r.read_u32::<E>()?,
            low_mask: r.read_u32::<E>()?,
            fill_factor: r.read_u32::<E>()?,
            num_keys: r.read_u32::<E>()?,
            char_key_hash: r.read_u32::<E>()?,
            endian,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.magic != HASH_MAGIC {
            return Err(Error::Format(format!(
                "unexpected magic number {:#010x}",
                self.magic
            )));
        }
        if self.encryption_algorithm != 0 {
            return Err(Error::Format(format!(
                "encrypted databases are not supported (algorithm {})",
                self.encryption_algorithm
            )));
        }
        if self.page_type != HASH_METADATA_PAGE_TYPE {
            return Err(Error::Format(format!(
                "unexpected metadata page type {}, expected {}",
                self.page_type, HASH_METADATA_PAGE_TYPE
            )));
        }
        if !VALID_PAGE_SIZES.contains(&self.page_size) {
            return Err(Error::Format(format!(
                "unsupported page size {}",
                self.page_size
            )));
        }
        Ok(())
    }
}
