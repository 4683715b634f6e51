// src/header/import.rs

//! Payload resolution and dribble merge

use super::blob::{HdrBlob, data_length};
use super::entry::{EntryInfo, IndexEntry};
use super::{HEADER_I18NTABLE, REGION_TAG_COUNT};
use crate::error::{Error, Result};
use tracing::debug;

/// Resolve the payload of each index record
///
/// Returns the entries and the running data length after the last one,
/// starting from `rdlen`. Each entry's length is taken from the next
/// record's offset for string types that are not last in `infos`, and
/// computed from the payload otherwise. The running length is padded to
/// the element size before each fixed-width entry is added.
pub(super) fn region_swab<'a>(
    blob: &HdrBlob<'a>,
    infos: &[EntryInfo],
    mut rdlen: usize,
) -> Result<(Vec<IndexEntry<'a>>, usize)> {
    let mut entries = Vec::with_capacity(infos.len());

    for (i, info) in infos.iter().enumerate() {
        let tag_type = info.tag_type().ok_or_else(|| {
            Error::Format(format!("tag {}: invalid type {}", info.tag, info.type_code))
        })?;

        let offset = usize::try_from(info.offset).map_err(|_| {
            Error::Format(format!("tag {}: negative offset {}", info.tag, info.offset))
        })?;
        let start = blob.data_start + offset;
        if start >= blob.data_end {
            return Err(Error::Format(format!(
                "tag {}: data starts at {}, past the data segment end {}",
                info.tag, start, blob.data_end
            )));
        }

        let next = infos.get(i + 1).filter(|_| tag_type.size().is_none());
        let length = match next {
            Some(next) => i64::from(next.offset) - i64::from(info.offset),
            None => data_length(blob.data, tag_type, info.count, start, blob.data_end)
                .map_or(0, |length| length as i64),
        };
        if length <= 0 {
            return Err(Error::Format(format!(
                "tag {}: invalid data length {}",
                info.tag, length
            )));
        }
        let length = length as usize;

        let end = start + length;
        if end > blob.data_end {
            return Err(Error::Format(format!(
                "tag {}: data ends at {}, past the data segment end {}",
                info.tag, end, blob.data_end
            )));
        }

        if let Some(size) = tag_type.size().filter(|&size| size > 1) {
            let remainder = rdlen % size;
            if remainder != 0 {
                rdlen += size - remainder;
            }
        }
        rdlen += length;

        if blob.data_start + rdlen > blob.data_end {
            return Err(Error::Format(format!(
                "tag {}: accumulated data length {} exceeds the data segment",
                info.tag, rdlen
            )));
        }

        entries.push(IndexEntry {
            info: *info,
            tag_type,
            length,
            rdlen,
            data: &blob.data[start..end],
        });
    }

    Ok((entries, rdlen))
}

impl<'a> HdrBlob<'a> {
    /// Resolve every entry of the blob and check the accumulated length
    ///
    /// Region headers contribute the records covered by the region, then any
    /// dribble records appended after it. A dribble entry replaces the region
    /// entry with the same tag in place; new tags are appended in dribble
    /// order. The accumulated length, plus the region trailer, must equal the
    /// declared data length exactly.
    pub fn import(&self) -> Result<Vec<IndexEntry<'a>>> {
        let first = self.entries[0];

        if first.tag >= HEADER_I18NTABLE {
            let (entries, rdlen) = region_swab(self, &self.entries, 0)?;
            self.check_length(rdlen)?;
            return Ok(entries);
        }

        let ril = if first.offset == 0 { self.il } else { self.ril };
        if ril < 1 || ril > self.il {
            return Err(Error::Format(format!(
                "region covers {} of {} index records",
                ril, self.il
            )));
        }

        let (mut entries, mut rdlen) = region_swab(self, &self.entries[1..ril], 0)?;

        if ril < self.il {
            let (dribble, dribble_rdlen) = region_swab(self, &self.entries[ril..], rdlen)?;
            debug!(
                "Merging {} dribble entries into {} region entries",
                dribble.len(),
                entries.len()
            );
            merge_dribble(&mut entries, dribble);
            rdlen = dribble_rdlen;
        }

        rdlen += REGION_TAG_COUNT;
        self.check_length(rdlen)?;

        Ok(entries)
    }

    fn check_length(&self, rdlen: usize) -> Result<()> {
        if rdlen != self.dl {
            return Err(Error::Format(format!(
                "accumulated data length {} does not match declared length {}",
                rdlen, self.dl
            )));
        }
        Ok(())
    }
}

fn merge_dribble<'a>(entries: &mut Vec<IndexEntry<'a>>, dribble: Vec<IndexEntry<'a>>) {
    for entry in dribble {
        match entries.iter_mut().find(|e| e.tag() == entry.tag()) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}
