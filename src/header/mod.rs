// src/header/mod.rs

//! RPM header blob decoder
//!
//! A header blob is a big-endian index count and data length, an index of
//! 16-byte records, and a data segment the records point into. Headers
//! written by rpm start with an immutable region record whose trailer, at
//! the end of the region's data, says how many records the region covers.
//! Entries appended after installation (the "dribble") follow the trailer
//! and take precedence over region entries with the same tag.
//!
//! Decoding checks every record for range, alignment and type, then resolves
//! each payload while accumulating the padded data length. That length must
//! come out equal to the declared data length.

mod blob;
mod entry;
mod import;

pub use blob::{HdrBlob, data_length};
pub use entry::{EntryInfo, IndexEntry, TagType};

use crate::error::Result;
use tracing::debug;

/// Region tag of a package header
pub const HEADER_IMAGE: i32 = 61;
/// Region tag of a signature header
pub const HEADER_SIGNATURES: i32 = 62;
/// Region tag of the immutable header stored in the database
pub const HEADER_IMMUTABLE: i32 = 63;
/// Smallest tag a non-region entry may carry
pub const HEADER_I18NTABLE: i32 = 100;

/// Size of one index record
pub const ENTRY_INFO_SIZE: usize = 16;
/// Count of a region record, and the size of its trailer
pub const REGION_TAG_COUNT: usize = 16;
/// Upper bound on index plus data size
pub const HEADER_MAX_BYTES: usize = 256 * 1024 * 1024;

/// Decode a header blob into its entries
///
/// Entries come back in index order with dribble replacements applied.
/// Payload slices borrow from `data`.
pub fn header_import(data: &[u8]) -> Result<Vec<IndexEntry<'_>>> {
    let blob = HdrBlob::init(data)?;
    let entries = blob.import()?;
    debug!(
        "Decoded header: {} index records, {} data bytes, {} entries",
        blob.il,
        blob.dl,
        entries.len()
    );
    Ok(entries)
}

#[doc(hidden)]
pub mod testing {
    //! Builder for well-formed header blobs used by tests

    use super::*;

    struct PendingEntry {
        tag: i32,
        tag_type: TagType,
        count: u32,
        payload: Vec<u8>,
    }

    pub struct HeaderBuilder {
        region_tag: Option<i32>,
        region: Vec<PendingEntry>,
        dribble: Vec<PendingEntry>,
        in_dribble: bool,
    }

    impl Default for HeaderBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HeaderBuilder {
        /// Header with an immutable region, as stored in the database
        pub fn new() -> Self {
            Self::with_region(HEADER_IMMUTABLE)
        }

        pub fn with_region(region_tag: i32) -> Self {
            Self {
                region_tag: Some(region_tag),
                region: Vec::new(),
                dribble: Vec::new(),
                in_dribble: false,
            }
        }

        pub fn without_region() -> Self {
            Self {
                region_tag: None,
                ..Self::new()
            }
        }

        /// Entries added after this call go after the region trailer
        pub fn dribble(mut self) -> Self {
            self.in_dribble = true;
            self
        }

        pub fn string(self, tag: i32, value: &str) -> Self {
            self.push(tag, TagType::String, 1, nul_terminated(&[value]))
        }

        pub fn i18n_string(self, tag: i32, value: &str) -> Self {
            self.push(tag, TagType::I18nString, 1, nul_terminated(&[value]))
        }

        pub fn string_array(self, tag: i32, values: &[&str]) -> Self {
            self.push(tag, TagType::StringArray, values.len() as u32, nul_terminated(values))
        }

        pub fn i32_array(self, tag: i32, values: &[i32]) -> Self {
            let payload = values.iter().flat_map(|v| v.to_be_bytes()).collect();
            self.push(tag, TagType::Int32, values.len() as u32, payload)
        }

        pub fn u16_array(self, tag: i32, values: &[u16]) -> Self {
            let payload = values.iter().flat_map(|v| v.to_be_bytes()).collect();
            self.push(tag, TagType::Int16, values.len() as u32, payload)
        }

        pub fn bin(self, tag: i32, value: &[u8]) -> Self {
            self.push(tag, TagType::Bin, value.len() as u32, value.to_vec())
        }

        fn push(mut self, tag: i32, tag_type: TagType, count: u32, payload: Vec<u8>) -> Self {
            let entry = PendingEntry {
                tag,
                tag_type,
                count,
                payload,
            };
            if self.in_dribble {
                self.dribble.push(entry);
            } else {
                self.region.push(entry);
            }
            self
        }

        pub fn build(self) -> Vec<u8> {
            let mut index = Vec::new();
            let mut data = Vec::new();

            let mut records: Vec<[i32; 4]> = Vec::new();
            for entry in &self.region {
                records.push(place(&mut data, entry));
            }

            if let Some(region_tag) = self.region_tag {
                let ril = (self.region.len() + 1) as i32;
                let trailer_offset = data.len() as i32;
                let trailer = [
                    region_tag,
                    TagType::Bin as i32,
                    -ril * ENTRY_INFO_SIZE as i32,
                    REGION_TAG_COUNT as i32,
                ];
                data.extend(trailer.iter().flat_map(|v| v.to_be_bytes()));
                records.insert(
                    0,
                    [region_tag, TagType::Bin as i32, trailer_offset, REGION_TAG_COUNT as i32],
                );
            }

            for entry in &self.dribble {
                records.push(place(&mut data, entry));
            }

            for record in &records {
                index.extend(record.iter().flat_map(|v| v.to_be_bytes()));
            }

            let mut blob = Vec::new();
            blob.extend_from_slice(&(records.len() as i32).to_be_bytes());
            blob.extend_from_slice(&(data.len() as i32).to_be_bytes());
            blob.extend(index);
            blob.extend(data);
            blob
        }

        /// Position of the region trailer within a built blob
        pub fn trailer_position(blob: &[u8]) -> usize {
            let il = i32::from_be_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
            let offset = i32::from_be_bytes([blob[16], blob[17], blob[18], blob[19]]) as usize;
            8 + il * ENTRY_INFO_SIZE + offset
        }
    }

    fn place(data: &mut Vec<u8>, entry: &PendingEntry) -> [i32; 4] {
        let alignment = entry.tag_type.alignment();
        while data.len() % alignment != 0 {
            data.push(0);
        }
        let offset = data.len() as i32;
        data.extend_from_slice(&entry.payload);
        [entry.tag, entry.tag_type as i32, offset, entry.count as i32]
    }

    fn nul_terminated(values: &[&str]) -> Vec<u8> {
        let mut payload = Vec::new();
        for value in values {
            payload.extend_from_slice(value.as_bytes());
            payload.push(0);
        }
        payload
    }
}
