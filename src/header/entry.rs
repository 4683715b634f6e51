// src/header/entry.rs

//! Header index records and their payloads

use super::ENTRY_INFO_SIZE;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type of a header entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagType {
    Null = 0,
    Char = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    String = 6,
    Bin = 7,
    StringArray = 8,
    I18nString = 9,
}

impl TagType {
    pub fn from_u32(code: u32) -> Option<Self> {
        Some(match code {
            0 => TagType::Null,
            1 => TagType::Char,
            2 => TagType::Int8,
            3 => TagType::Int16,
            4 => TagType::Int32,
            5 => TagType::Int64,
            6 => TagType::String,
            7 => TagType::Bin,
            8 => TagType::StringArray,
            9 => TagType::I18nString,
            _ => return None,
        })
    }

    /// Size of one element, `None` for NUL-terminated string types
    pub fn size(self) -> Option<usize> {
        match self {
            TagType::Null => Some(0),
            TagType::Char | TagType::Int8 | TagType::Bin => Some(1),
            TagType::Int16 => Some(2),
            TagType::Int32 => Some(4),
            TagType::Int64 => Some(8),
            TagType::String | TagType::StringArray | TagType::I18nString => None,
        }
    }

    /// Required alignment of the entry's offset in the data segment
    pub fn alignment(self) -> usize {
        match self {
            TagType::Int16 => 2,
            TagType::Int32 => 4,
            TagType::Int64 => 8,
            _ => 1,
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagType::Null => "NULL",
            TagType::Char => "CHAR",
            TagType::Int8 => "INT8",
            TagType::Int16 => "INT16",
            TagType::Int32 => "INT32",
            TagType::Int64 => "INT64",
            TagType::String => "STRING",
            TagType::Bin => "BIN",
            TagType::StringArray => "STRING_ARRAY",
            TagType::I18nString => "I18NSTRING",
        };
        f.write_str(name)
    }
}

/// Fixed 16-byte index record locating one entry's payload
///
/// Always stored big-endian, whatever byte order the surrounding database
/// uses. The type is kept as the raw code so that invalid codes can be
/// reported by the verifier instead of being lost at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub tag: i32,
    pub type_code: u32,
    pub offset: i32,
    pub count: u32,
}

impl EntryInfo {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < ENTRY_INFO_SIZE {
            return Err(Error::Format(format!(
                "entry info needs {} bytes, got {}",
                ENTRY_INFO_SIZE,
                buf.len()
            )));
        }

        Ok(Self {
            tag: BigEndian::read_i32(&buf[0..4]),
            type_code: BigEndian::read_u32(&buf[4..8]),
            offset: BigEndian::read_i32(&buf[8..12]),
            count: BigEndian::read_u32(&buf[12..16]),
        })
    }

    pub fn tag_type(&self) -> Option<TagType> {
        TagType::from_u32(self.type_code)
    }
}

/// A verified entry together with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry<'a> {
    pub info: EntryInfo,
    pub tag_type: TagType,
    /// Payload length in bytes
    pub length: usize,
    /// Running, alignment-padded data length after this entry
    pub rdlen: usize,
    pub data: &'a [u8],
}

impl<'a> IndexEntry<'a> {
    pub fn tag(&self) -> i32 {
        self.info.tag
    }

    pub fn count(&self) -> usize {
        self.info.count as usize
    }

    /// First NUL-terminated string of the payload
    pub fn as_string(&self) -> String {
        let end = self
            .data
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.data.len());
        String::from_utf8_lossy(&self.data[..end]).into_owned()
    }

    /// `count` NUL-terminated strings
    pub fn as_string_array(&self) -> Vec<String> {
        self.data
            .split(|&b| b == 0)
            .take(self.count())
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect()
    }

    pub fn as_i32_array(&self) -> Result<Vec<i32>> {
        Ok(self
            .fixed_elements(4)?
            .chunks_exact(4)
            .map(BigEndian::read_i32)
            .collect())
    }

    pub fn as_i32(&self) -> Result<i32> {
        self.as_i32_array()?.first().copied().ok_or_else(|| {
            Error::Format(format!("tag {} has no INT32 value", self.tag()))
        })
    }

    pub fn as_u16_array(&self) -> Result<Vec<u16>> {
        Ok(self
            .fixed_elements(2)?
            .chunks_exact(2)
            .map(BigEndian::read_u16)
            .collect())
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    fn fixed_elements(&self, size: usize) -> Result<&'a [u8]> {
        let needed = self.count() * size;
        self.data.get(..needed).ok_or_else(|| {
            Error::Format(format!(
                "tag {} declares {} elements of {} bytes but holds {} bytes",
                self.tag(),
                self.count(),
                size,
                self.data.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag_type: TagType, count: u32, data: &[u8]) -> IndexEntry<'_> {
        IndexEntry {
            info: EntryInfo {
                tag: 1000,
                type_code: tag_type as u32,
                offset: 0,
                count,
            },
            tag_type,
            length: data.len(),
            rdlen: data.len(),
            data,
        }
    }

    #[test]
    fn test_type_sizes_and_alignment() {
        assert_eq!(TagType::Int16.size(), Some(2));
        assert_eq!(TagType::Int64.alignment(), 8);
        assert_eq!(TagType::StringArray.size(), None);
        assert_eq!(TagType::Bin.alignment(), 1);
        assert_eq!(TagType::from_u32(9), Some(TagType::I18nString));
        assert_eq!(TagType::from_u32(10), None);
    }

    #[test]
    fn test_entry_info_is_big_endian() {
        let buf = [
            0x00, 0x00, 0x03, 0xe8, // tag 1000
            0x00, 0x00, 0x00, 0x06, // STRING
            0x00, 0x00, 0x00, 0x10, // offset 16
            0x00, 0x00, 0x00, 0x01, // count 1
        ];
        let info = EntryInfo::parse(&buf).unwrap();
        assert_eq!(info.tag, 1000);
        assert_eq!(info.tag_type(), Some(TagType::String));
        assert_eq!(info.offset, 16);
        assert_eq!(info.count, 1);
    }

    #[test]
    fn test_negative_trailer_offset() {
        let mut buf = [0u8; 16];
        buf[8..12].copy_from_slice(&(-48i32).to_be_bytes());
        assert_eq!(EntryInfo::parse(&buf).unwrap().offset, -48);
    }

    #[test]
    fn test_string_payloads() {
        let data = b"bash\0";
        assert_eq!(entry(TagType::String, 1, data).as_string(), "bash");

        let data = b"/usr/\0/etc/\0\0\0";
        let names = entry(TagType::StringArray, 2, data).as_string_array();
        assert_eq!(names, vec!["/usr/", "/etc/"]);
    }

    #[test]
    fn test_integer_payloads() {
        let data = [0, 0, 0, 1, 0xff, 0xff, 0xff, 0xfe];
        assert_eq!(entry(TagType::Int32, 2, &data).as_i32_array().unwrap(), vec![1, -2]);

        let data = [0x81, 0xa4, 0x41, 0xed];
        assert_eq!(
            entry(TagType::Int16, 2, &data).as_u16_array().unwrap(),
            vec![0o100644, 0o40755]
        );
    }

    #[test]
    fn test_short_integer_payload_rejected() {
        let data = [0, 0, 0, 1];
        assert!(entry(TagType::Int32, 2, &data).as_i32_array().is_err());
    }
}
