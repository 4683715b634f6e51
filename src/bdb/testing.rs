// src/bdb/testing.rs

//! Builder for synthetic hash database files used by tests

use super::Endian;
use super::metadata::{HASH_MAGIC, HASH_METADATA_PAGE_TYPE};
use super::page::{OFF_PAGE_ENTRY_SIZE, OFF_PAGE_ITEM_TYPE, PAGE_HEADER_SIZE};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

const KEY_DATA_ITEM_TYPE: u8 = 1;
const OVERFLOW_PAGE_TYPE: u8 = 7;
const HASH_PAGE_TYPE: u8 = 13;

/// One value slot on a hash page
pub enum Item<'a> {
    /// Stored in an overflow chain, referenced by an off-page descriptor
    OffPage(&'a [u8]),
    /// Stored directly on the hash page
    Inline(&'a [u8]),
}

pub struct HashFileBuilder {
    endian: Endian,
    page_size: usize,
    /// Pages 1..; the metadata page is produced by `build`
    pages: Vec<Vec<u8>>,
}

impl HashFileBuilder {
    pub fn new(endian: Endian, page_size: usize) -> Self {
        Self {
            endian,
            page_size,
            pages: Vec::new(),
        }
    }

    fn put_u16(&self, buf: &mut [u8], value: u16) {
        match self.endian {
            Endian::Little => LittleEndian::write_u16(buf, value),
            Endian::Big => BigEndian::write_u16(buf, value),
        }
    }

    fn put_u32(&self, buf: &mut [u8], value: u32) {
        match self.endian {
            Endian::Little => LittleEndian::write_u32(buf, value),
            Endian::Big => BigEndian::write_u32(buf, value),
        }
    }

    fn allocate(&mut self) -> u32 {
        self.pages.push(vec![0u8; self.page_size]);
        self.pages.len() as u32
    }

    fn write_header(
        &mut self,
        page_no: u32,
        prev: u32,
        next: u32,
        entries: u16,
        offset: u16,
        ty: u8,
    ) {
        let mut page = std::mem::take(&mut self.pages[page_no as usize - 1]);
        self.put_u32(&mut page[8..12], page_no);
        self.put_u32(&mut page[12..16], prev);
        self.put_u32(&mut page[16..20], next);
        self.put_u16(&mut page[20..22], entries);
        self.put_u16(&mut page[22..24], offset);
        page[25] = ty;
        self.pages[page_no as usize - 1] = page;
    }

    /// Write `value` across as many overflow pages as it needs
    fn overflow_chain(&mut self, value: &[u8]) -> u32 {
        let capacity = self.page_size - PAGE_HEADER_SIZE;
        let chunks: Vec<&[u8]> = value.chunks(capacity).collect();
        let first = self.pages.len() as u32 + 1;

        for (i, chunk) in chunks.iter().enumerate() {
            let page_no = self.allocate();
            let prev = if i == 0 { 0 } else { page_no - 1 };
            let next = if i + 1 == chunks.len() { 0 } else { page_no + 1 };
            self.write_header(page_no, prev, next, 1, chunk.len() as u16, OVERFLOW_PAGE_TYPE);
            let page = &mut self.pages[page_no as usize - 1];
            page[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + chunk.len()].copy_from_slice(chunk);
        }

        first
    }

    /// Add a hash page with one key/value pair per item
    pub fn hash_page(&mut self, items: &[Item<'_>]) -> u32 {
        let page_no = self.allocate();
        let mut bytes: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

        for (slot, item) in items.iter().enumerate() {
            let mut key = vec![KEY_DATA_ITEM_TYPE];
            key.extend_from_slice(&(slot as u32 + 1).to_le_bytes());

            let value = match item {
                Item::OffPage(value) => {
                    let chain = self.overflow_chain(value);
                    let mut descriptor = vec![0u8; OFF_PAGE_ENTRY_SIZE];
                    descriptor[0] = OFF_PAGE_ITEM_TYPE;
                    self.put_u32(&mut descriptor[4..8], chain);
                    self.put_u32(&mut descriptor[8..12], value.len() as u32);
                    descriptor
                }
                Item::Inline(value) => {
                    let mut data = vec![KEY_DATA_ITEM_TYPE];
                    data.extend_from_slice(value);
                    data
                }
            };
            bytes.push((key, value));
        }

        let mut page = std::mem::take(&mut self.pages[page_no as usize - 1]);
        let mut top = self.page_size;
        let mut index = PAGE_HEADER_SIZE;
        for (key, value) in &bytes {
            for item in [key, value] {
                top -= item.len();
                page[top..top + item.len()].copy_from_slice(item);
                self.put_u16(&mut page[index..index + 2], top as u16);
                index += 2;
            }
        }
        assert!(index <= top, "hash page items overflow the page");
        self.pages[page_no as usize - 1] = page;

        self.write_header(page_no, 0, 0, (items.len() * 2) as u16, top as u16, HASH_PAGE_TYPE);
        page_no
    }

    /// Add a page of some other type, e.g. a btree or free page
    pub fn other_page(&mut self, page_type: u8) -> u32 {
        let page_no = self.allocate();
        self.write_header(page_no, 0, 0, 0, 0, page_type);
        page_no
    }

    /// Mutable access to a built page, for corrupting it
    pub fn page_mut(&mut self, page_no: u32) -> &mut [u8] {
        &mut self.pages[page_no as usize - 1]
    }

    pub fn build(self) -> Vec<u8> {
        let mut meta = vec![0u8; self.page_size];
        self.put_u32(&mut meta[12..16], HASH_MAGIC);
        self.put_u32(&mut meta[16..20], 9);
        self.put_u32(&mut meta[20..24], self.page_size as u32);
        meta[25] = HASH_METADATA_PAGE_TYPE;
        self.put_u32(&mut meta[32..36], self.pages.len() as u32);

        let mut file = meta;
        for page in &self.pages {
            file.extend_from_slice(page);
        }
        file
    }
}
