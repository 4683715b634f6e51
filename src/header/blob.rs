// src/header/blob.rs

//! Header blob framing and structural verification

use super::entry::{EntryInfo, TagType};
use super::{
    ENTRY_INFO_SIZE, HEADER_I18NTABLE, HEADER_IMAGE, HEADER_IMMUTABLE, HEADER_MAX_BYTES,
    HEADER_SIGNATURES, REGION_TAG_COUNT,
};
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Parse state of one header blob
///
/// Built by [`HdrBlob::init`], which also runs region and entry
/// verification, and consumed by [`HdrBlob::import`].
#[derive(Debug, Clone)]
pub struct HdrBlob<'a> {
    pub(super) data: &'a [u8],
    /// Number of index records
    pub il: usize,
    /// Length of the data segment
    pub dl: usize,
    pub data_start: usize,
    pub data_end: usize,
    pub pvlen: usize,
    pub entries: Vec<EntryInfo>,
    /// Tag of the integrity region, if the header has one
    pub region_tag: Option<i32>,
    /// Index records covered by the region, including the region record
    pub ril: usize,
    /// Data bytes covered by the region, including its trailer
    pub rdl: usize,
}

impl<'a> HdrBlob<'a> {
    /// Frame a raw header blob and verify its structure
    pub fn init(data: &'a [u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Format(format!(
                "header blob of {} bytes is too short",
                data.len()
            )));
        }

        let il = i64::from(BigEndian::read_i32(&data[0..4]));
        let dl = i64::from(BigEndian::read_i32(&data[4..8]));

        if il < 1 {
            return Err(Error::Format(format!("header has {} index entries", il)));
        }
        if dl < 0 {
            return Err(Error::Format(format!("header data length {} is negative", dl)));
        }

        let data_start = 8 + il * ENTRY_INFO_SIZE as i64;
        let pvlen = data_start + dl;
        if pvlen >= HEADER_MAX_BYTES as i64 {
            return Err(Error::Format(format!(
                "header size {} exceeds the {} byte limit",
                pvlen, HEADER_MAX_BYTES
            )));
        }

        let (il, dl) = (il as usize, dl as usize);
        let (data_start, pvlen) = (data_start as usize, pvlen as usize);
        if data.len() < pvlen {
            return Err(Error::Format(format!(
                "header blob is {} bytes, index and data need {}",
                data.len(),
                pvlen
            )));
        }

        let entries = data[8..data_start]
            .chunks_exact(ENTRY_INFO_SIZE)
            .map(EntryInfo::parse)
            .collect::<Result<Vec<_>>>()?;

        let mut blob = Self {
            data,
            il,
            dl,
            data_start,
            data_end: pvlen,
            pvlen,
            entries,
            region_tag: None,
            ril: 0,
            rdl: 0,
        };

        blob.verify_region()?;
        blob.verify_info()?;

        Ok(blob)
    }

    /// Check the integrity region described by the first index record
    ///
    /// A header whose first tag is not a region tag has no region, which is
    /// valid. Otherwise the record must point at a trailer inside the data
    /// segment whose negated offset gives the number of index records the
    /// region covers.
    pub fn verify_region(&mut self) -> Result<()> {
        let first = self.entries[0];

        if !matches!(first.tag, HEADER_IMAGE | HEADER_SIGNATURES | HEADER_IMMUTABLE) {
            return Ok(());
        }
        let region_tag = first.tag;

        if first.tag_type() != Some(TagType::Bin) || first.count as usize != REGION_TAG_COUNT {
            return Err(Error::Format(format!(
                "region tag {} has type {} and count {}",
                region_tag, first.type_code, first.count
            )));
        }

        let trailer_end = i64::from(first.offset) + REGION_TAG_COUNT as i64;
        if first.offset < 0 || trailer_end > self.dl as i64 {
            return Err(Error::Format(format!(
                "region {} trailer offset {} is outside the data segment",
                region_tag, first.offset
            )));
        }

        let region_end = self.data_start + first.offset as usize;
        let trailer = EntryInfo::parse(&self.data[region_end..region_end + REGION_TAG_COUNT])?;
        let rdl = region_end + REGION_TAG_COUNT - self.data_start;

        // Some old packages carry HEADERIMAGE in the signature region trailer
        let mut trailer_tag = trailer.tag;
        if region_tag == HEADER_SIGNATURES && trailer_tag == HEADER_IMAGE {
            trailer_tag = HEADER_SIGNATURES;
        }

        if trailer_tag != region_tag
            || trailer.tag_type() != Some(TagType::Bin)
            || trailer.count as usize != REGION_TAG_COUNT
        {
            return Err(Error::Format(format!(
                "region {} trailer mismatch: tag {}, type {}, count {}",
                region_tag, trailer.tag, trailer.type_code, trailer.count
            )));
        }

        let region_size = -i64::from(trailer.offset);
        if region_size % REGION_TAG_COUNT as i64 != 0 {
            return Err(Error::Format(format!(
                "region {} trailer offset {} is not a multiple of {}",
                region_tag, trailer.offset, REGION_TAG_COUNT
            )));
        }

        let ril = region_size / ENTRY_INFO_SIZE as i64;
        if ril < 1 || ril > self.il as i64 || rdl > self.dl {
            return Err(Error::Format(format!(
                "region {} size out of range: il {} ril {} dl {} rdl {}",
                region_tag, self.il, ril, self.dl, rdl
            )));
        }

        self.region_tag = Some(region_tag);
        self.ril = ril as usize;
        self.rdl = rdl;

        Ok(())
    }

    /// Check every index record after the region record
    pub fn verify_info(&self) -> Result<()> {
        let skip = usize::from(self.region_tag.is_some());
        let mut end: i64 = 0;

        for info in &self.entries[skip..] {
            let offset = i64::from(info.offset);

            if end > offset {
                return Err(Error::Format(format!(
                    "tag {}: offset {} overlaps the previous entry ending at {}",
                    info.tag, offset, end
                )));
            }
            if info.tag < HEADER_I18NTABLE {
                return Err(Error::Format(format!("tag {} is below the minimum tag", info.tag)));
            }
            let tag_type = info.tag_type().ok_or_else(|| {
                Error::Format(format!("tag {}: invalid type {}", info.tag, info.type_code))
            })?;
            if offset % tag_type.alignment() as i64 != 0 {
                return Err(Error::Format(format!(
                    "tag {}: {} offset {} is not aligned to {} bytes",
                    info.tag,
                    tag_type,
                    offset,
                    tag_type.alignment()
                )));
            }
            if offset < 0 || offset > self.dl as i64 {
                return Err(Error::Format(format!(
                    "tag {}: offset {} is outside the data segment of {} bytes",
                    info.tag, offset, self.dl
                )));
            }

            let start = self.data_start + offset as usize;
            let length = data_length(self.data, tag_type, info.count, start, self.data_end)
                .filter(|&length| length > 0)
                .ok_or_else(|| {
                    Error::Format(format!(
                        "tag {}: invalid data length for {} x {}",
                        info.tag, info.count, tag_type
                    ))
                })?;

            end = offset + length as i64;
            if end > self.dl as i64 {
                return Err(Error::Format(format!(
                    "tag {}: data ends at {}, past the data segment of {} bytes",
                    info.tag, end, self.dl
                )));
            }
        }

        Ok(())
    }
}

/// Byte length of an entry's payload starting at `start`
///
/// Fixed-size types are `size * count` and must end by `data_end`. STRING
/// must have a count of one. String arrays are measured by scanning for
/// `count` NUL terminators before `data_end`. `None` means the entry cannot
/// be valid.
pub fn data_length(
    data: &[u8],
    tag_type: TagType,
    count: u32,
    start: usize,
    data_end: usize,
) -> Option<usize> {
    match tag_type {
        TagType::String => {
            if count != 1 {
                return None;
            }
            string_tag_length(data, 1, start, data_end)
        }
        TagType::StringArray | TagType::I18nString => {
            string_tag_length(data, count, start, data_end)
        }
        fixed => {
            let length = fixed.size()?.checked_mul(count as usize)?;
            if start.checked_add(length)? > data_end {
                return None;
            }
            Some(length)
        }
    }
}

fn string_tag_length(data: &[u8], count: u32, start: usize, data_end: usize) -> Option<usize> {
    if start >= data_end || data_end > data.len() {
        return None;
    }

    let mut position = start;
    for _ in 0..count {
        let terminator = data.get(position..data_end)?.iter().position(|&b| b == 0)?;
        position += terminator + 1;
    }

    Some(position - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::testing::HeaderBuilder;

    #[test]
    fn test_init_reads_lengths() {
        let blob = HeaderBuilder::new()
            .string(1000, "bash")
            .string(1001, "5.1.8")
            .build();
        let hdr = HdrBlob::init(&blob).unwrap();

        assert_eq!(hdr.il, 3);
        assert_eq!(hdr.data_start, 8 + 3 * 16);
        assert_eq!(hdr.data_end, hdr.data_start + hdr.dl);
        assert_eq!(hdr.pvlen, blob.len());
        assert_eq!(hdr.region_tag, Some(HEADER_IMMUTABLE));
        assert_eq!(hdr.ril, 3);
        assert_eq!(hdr.rdl, hdr.dl);
    }

    #[test]
    fn test_init_rejects_empty_index() {
        let blob = [0u8, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(HdrBlob::init(&blob), Err(Error::Format(_))));
    }

    #[test]
    fn test_init_rejects_oversized_header() {
        let mut blob = vec![0u8; 8];
        blob[0..4].copy_from_slice(&1i32.to_be_bytes());
        blob[4..8].copy_from_slice(&(HEADER_MAX_BYTES as i32).to_be_bytes());
        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("limit")));
    }

    #[test]
    fn test_init_rejects_truncated_blob() {
        let blob = HeaderBuilder::new().string(1000, "bash").build();
        let result = HdrBlob::init(&blob[..blob.len() - 3]);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_header_without_region() {
        let blob = HeaderBuilder::without_region()
            .string(1000, "zlib")
            .build();
        let hdr = HdrBlob::init(&blob).unwrap();
        assert_eq!(hdr.region_tag, None);
        assert_eq!(hdr.ril, 0);
    }

    #[test]
    fn test_region_trailer_offset_not_multiple_of_16() {
        let mut blob = HeaderBuilder::new().string(1000, "bash").build();
        let trailer = HeaderBuilder::trailer_position(&blob);
        // Trailer offset is stored negated: -(ril * 16). Make it -33.
        blob[trailer + 8..trailer + 12].copy_from_slice(&(-33i32).to_be_bytes());

        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("multiple")));
    }

    #[test]
    fn test_region_trailer_ril_beyond_index() {
        let mut blob = HeaderBuilder::new().string(1000, "bash").build();
        let trailer = HeaderBuilder::trailer_position(&blob);
        blob[trailer + 8..trailer + 12].copy_from_slice(&(-16 * 9i32).to_be_bytes());

        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("out of range")));
    }

    #[test]
    fn test_region_trailer_offset_out_of_range() {
        for offset in [4000i32, -16] {
            let mut blob = HeaderBuilder::new().string(1000, "bash").build();
            // Region record offset lives at bytes 8..12 of the first index record
            blob[8 + 8..8 + 12].copy_from_slice(&offset.to_be_bytes());

            let result = HdrBlob::init(&blob);
            let rejected = matches!(
                &result,
                Err(Error::Format(msg)) if msg.contains("outside the data segment")
            );
            assert!(rejected, "offset {}: {:?}", offset, result.err());
        }
    }

    #[test]
    fn test_region_trailer_tag_mismatch() {
        let mut blob = HeaderBuilder::new().string(1000, "bash").build();
        let trailer = HeaderBuilder::trailer_position(&blob);
        blob[trailer..trailer + 4].copy_from_slice(&HEADER_SIGNATURES.to_be_bytes());

        assert!(matches!(HdrBlob::init(&blob), Err(Error::Format(_))));
    }

    #[test]
    fn test_signature_region_accepts_image_trailer() {
        let mut blob = HeaderBuilder::with_region(HEADER_SIGNATURES)
            .bin(1004, &[0xaa; 16])
            .build();
        let trailer = HeaderBuilder::trailer_position(&blob);
        blob[trailer..trailer + 4].copy_from_slice(&HEADER_IMAGE.to_be_bytes());

        let hdr = HdrBlob::init(&blob).unwrap();
        assert_eq!(hdr.region_tag, Some(HEADER_SIGNATURES));
    }

    #[test]
    fn test_region_tag_with_wrong_count() {
        let mut blob = HeaderBuilder::new().string(1000, "bash").build();
        // Region record count lives at bytes 12..16 of the first index record
        blob[8 + 12..8 + 16].copy_from_slice(&8u32.to_be_bytes());
        assert!(matches!(HdrBlob::init(&blob), Err(Error::Format(_))));
    }

    #[test]
    fn test_int32_at_odd_offset_fails_alignment() {
        // "ab\0" takes three bytes, one byte of padding, then the INT32 at 4
        let mut blob = HeaderBuilder::without_region()
            .string(1000, "ab")
            .i32_array(1009, &[42])
            .build();
        let record = 8 + 16;
        blob[record + 8..record + 12].copy_from_slice(&5i32.to_be_bytes());

        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("aligned")));
    }

    #[test]
    fn test_overlapping_entries_rejected() {
        let mut blob = HeaderBuilder::without_region()
            .string(1000, "abcdef")
            .string(1001, "1.0")
            .build();
        // Point the second string into the middle of the first
        let record = 8 + 16;
        blob[record + 8..record + 12].copy_from_slice(&2i32.to_be_bytes());

        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("overlaps")));
    }

    #[test]
    fn test_entry_offset_beyond_data_length() {
        let mut blob = HeaderBuilder::without_region()
            .string(1000, "bash")
            .string(1001, "1.0")
            .build();
        let record = 8 + 16;
        blob[record + 8..record + 12].copy_from_slice(&1000i32.to_be_bytes());

        let result = HdrBlob::init(&blob);
        assert!(matches!(
            result,
            Err(Error::Format(msg)) if msg.contains("offset 1000 is outside the data segment")
        ));
    }

    #[test]
    fn test_tag_below_minimum_rejected() {
        let blob = HeaderBuilder::without_region().string(99, "x").build();
        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("minimum")));
    }

    #[test]
    fn test_invalid_type_rejected() {
        let mut blob = HeaderBuilder::without_region().string(1000, "x").build();
        blob[8 + 4..8 + 8].copy_from_slice(&12u32.to_be_bytes());
        let result = HdrBlob::init(&blob);
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("invalid type")));
    }

    #[test]
    fn test_data_length_fixed_types() {
        let data = [0u8; 32];
        assert_eq!(data_length(&data, TagType::Int32, 3, 0, 32), Some(12));
        assert_eq!(data_length(&data, TagType::Int64, 4, 8, 32), None);
        assert_eq!(data_length(&data, TagType::Int16, 4, 24, 32), Some(8));
        assert_eq!(data_length(&data, TagType::Null, 1, 0, 32), Some(0));
    }

    #[test]
    fn test_data_length_strings() {
        let data = b"one\0two\0three\0";
        assert_eq!(data_length(data, TagType::String, 1, 0, data.len()), Some(4));
        assert_eq!(data_length(data, TagType::String, 2, 0, data.len()), None);
        assert_eq!(data_length(data, TagType::StringArray, 3, 0, data.len()), Some(14));
        assert_eq!(data_length(data, TagType::I18nString, 2, 4, data.len()), Some(10));
        // Not enough terminators before the end
        assert_eq!(data_length(data, TagType::StringArray, 4, 0, data.len()), None);
        assert_eq!(data_length(b"abc", TagType::String, 1, 0, 3), None);
        assert_eq!(data_length(data, TagType::String, 1, 14, data.len()), None);
    }
}
