// src/bdb/page.rs

//! Page-level structures of a hash database
//!
//! Every page starts with the same 26-byte header. Hash pages follow it with
//! an array of 2-byte offsets, one per stored item, where items alternate
//! key, value, key, value. A value too large for the page is stored as a
//! 12-byte off-page descriptor pointing at a chain of overflow pages.

use super::Endian;
use crate::error::{Error, Result};

pub const PAGE_HEADER_SIZE: usize = 26;
pub const HASH_INDEX_ENTRY_SIZE: usize = 2;
pub const OFF_PAGE_ENTRY_SIZE: usize = 12;

/// Item type byte marking an off-page (overflow) value inside a hash page
pub const OFF_PAGE_ITEM_TYPE: u8 = 3;

const HASH_UNSORTED_PAGE_TYPE: u8 = 2;
const OVERFLOW_PAGE_TYPE: u8 = 7;
const HASH_METADATA_PAGE_TYPE: u8 = 8;
const HASH_PAGE_TYPE: u8 = 13;

/// Page type codes this reader distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    HashUnsorted,
    Overflow,
    HashMetadata,
    Hash,
    Other(u8),
}

impl PageType {
    /// Pages whose index array holds key/value items
    pub fn is_hash(self) -> bool {
        matches!(self, PageType::Hash | PageType::HashUnsorted)
    }
}

impl From<u8> for PageType {
    fn from(code: u8) -> Self {
        match code {
            HASH_UNSORTED_PAGE_TYPE => PageType::HashUnsorted,
            OVERFLOW_PAGE_TYPE => PageType::Overflow,
            HASH_METADATA_PAGE_TYPE => PageType::HashMetadata,
            HASH_PAGE_TYPE => PageType::Hash,
            other => PageType::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub lsn: [u8; 8],
    pub page_no: u32,
    pub prev_page_no: u32,
    pub next_page_no: u32,
    pub num_entries: u16,
    /// Start of free space on hash pages; bytes used on overflow pages
    pub free_area_offset: u16,
    pub tree_level: u8,
    pub page_type: PageType,
}

impl PageHeader {
    pub fn parse(page: &[u8], endian: Endian) -> Result<Self> {
        if page.len() < PAGE_HEADER_SIZE {
            return Err(Error::Format(format!(
                "page of {} bytes is too small for a page header",
                page.len()
            )));
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&page[0..8]);

        Ok(Self {
            lsn,
            page_no: endian.read_u32(&page[8..12]),
            prev_page_no: endian.read_u32(&page[12..16]),
            next_page_no: endian.read_u32(&page[16..20]),
            num_entries: endian.read_u16(&page[20..22]),
            free_area_offset: endian.read_u16(&page[22..24]),
            tree_level: page[24],
            page_type: PageType::from(page[25]),
        })
    }
}

/// Descriptor of a value stored in an overflow chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffPageEntry {
    pub item_type: u8,
    /// First page of the overflow chain
    pub page_no: u32,
    /// Total length of the value in bytes
    pub length: u32,
}

impl OffPageEntry {
    pub fn parse(page: &[u8], offset: usize, endian: Endian) -> Result<Self> {
        let buf = page
            .get(offset..offset + OFF_PAGE_ENTRY_SIZE)
            .ok_or_else(|| {
                Error::Format(format!(
                    "off-page entry at offset {} runs past the end of the page",
                    offset
                ))
            })?;

        Ok(Self {
            item_type: buf[0],
            page_no: endian.read_u32(&buf[4..8]),
            length: endian.read_u32(&buf[8..12]),
        })
    }
}

/// Offsets of the value items on a hash page
///
/// The index array holds `num_entries` offsets in key/value pairs; only the
/// second offset of each pair is returned. An odd count means the page is
/// corrupt and is rejected rather than dropping the unpaired entry.
pub fn hash_value_offsets(page: &[u8], num_entries: u16, endian: Endian) -> Result<Vec<u16>> {
    if num_entries % 2 != 0 {
        return Err(Error::Format(format!(
            "hash page index has {} entries, entries must come in key/value pairs",
            num_entries
        )));
    }

    let index_end = PAGE_HEADER_SIZE + num_entries as usize * HASH_INDEX_ENTRY_SIZE;
    let index = page.get(PAGE_HEADER_SIZE..index_end).ok_or_else(|| {
        Error::Format(format!(
            "hash page index of {} entries does not fit in a {} byte page",
            num_entries,
            page.len()
        ))
    })?;

    Ok(index
        .chunks_exact(HASH_INDEX_ENTRY_SIZE)
        .skip(1)
        .step_by(2)
        .map(|entry| endian.read_u16(entry))
        .collect())
}
