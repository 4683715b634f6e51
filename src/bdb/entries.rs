// src/bdb/entries.rs

//! Value streams over a hash database
//!
//! [`Entries`] is the synchronous form: a generator that reads the next page
//! only when the consumer asks for the next value. [`Scanner`] is the
//! threaded form fed by [`HashDatabase::spawn_scan`]. Both yield values in
//! on-disk page/slot order and never yield a value twice.

use super::HashDatabase;
use super::page::{self, OFF_PAGE_ITEM_TYPE, OffPageEntry, PageHeader};
use crate::error::{Error, Result};
use std::io::{Read, Seek};
use std::iter::FusedIterator;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::debug;

/// One fully reassembled value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Hash page the value's descriptor was found on
    pub page_no: u32,
    pub value: Vec<u8>,
}

/// Message sent from the background scanner
///
/// `Done` and `Failed` are terminal; nothing follows them.
#[derive(Debug)]
pub enum ScanEvent {
    Entry(RawEntry),
    Done,
    Failed(Error),
}

/// Hash page currently being drained
struct HashPage {
    page_no: u32,
    data: Vec<u8>,
    values: std::vec::IntoIter<u16>,
}

/// Lazy iterator over every off-page value in the database
///
/// Yields `Ok(RawEntry)` per value, then ends. After an `Err` nothing more is
/// yielded.
pub struct Entries<'a, R> {
    db: &'a mut HashDatabase<R>,
    next_page_no: u64,
    page: Option<HashPage>,
    finished: bool,
}

impl<'a, R: Read + Seek> Entries<'a, R> {
    pub(super) fn new(db: &'a mut HashDatabase<R>) -> Self {
        Self {
            db,
            next_page_no: 0,
            page: None,
            finished: false,
        }
    }

    fn advance(&mut self) -> Result<Option<RawEntry>> {
        let endian = self.db.metadata.endian;

        loop {
            if let Some(page) = self.page.as_mut() {
                for offset in page.values.by_ref() {
                    let offset = offset as usize;
                    let item_type = *page.data.get(offset).ok_or_else(|| {
                        Error::Format(format!(
                            "hash page {} has an item offset {} past the page end",
                            page.page_no, offset
                        ))
                    })?;

                    // Inline values never hold package headers
                    if item_type != OFF_PAGE_ITEM_TYPE {
                        continue;
                    }

                    let descriptor = OffPageEntry::parse(&page.data, offset, endian)?;
                    let value = self.db.read_overflow_value(&descriptor)?;
                    debug!(
                        "Read {} byte value from page {} (overflow chain at {})",
                        value.len(),
                        page.page_no,
                        descriptor.page_no
                    );

                    return Ok(Some(RawEntry {
                        page_no: page.page_no,
                        value,
                    }));
                }
                self.page = None;
            }

            if self.next_page_no > u64::from(self.db.metadata.last_page_no) {
                return Ok(None);
            }
            let page_no = self.next_page_no as u32;
            self.next_page_no += 1;

            let data = self.db.read_page(page_no)?;
            let header = PageHeader::parse(&data, endian)?;
            if !header.page_type.is_hash() {
                continue;
            }

            let values = page::hash_value_offsets(&data, header.num_entries, endian)?;
            self.page = Some(HashPage {
                page_no,
                data,
                values: values.into_iter(),
            });
        }
    }
}

impl<R: Read + Seek> Iterator for Entries<'_, R> {
    type Item = Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read + Seek> FusedIterator for Entries<'_, R> {}

/// Consumer side of a background scan
pub struct Scanner {
    rx: mpsc::Receiver<ScanEvent>,
    worker: Option<JoinHandle<()>>,
    completed: bool,
    finished: bool,
}

impl Scanner {
    pub(super) fn new(rx: mpsc::Receiver<ScanEvent>, worker: JoinHandle<()>) -> Self {
        Self {
            rx,
            worker: Some(worker),
            completed: false,
            finished: false,
        }
    }

    /// Block until the next event from the producer
    ///
    /// Returns `None` once a terminal event has been delivered.
    pub fn recv_event(&mut self) -> Option<ScanEvent> {
        if self.finished {
            return None;
        }

        let event = match self.rx.recv() {
            Ok(event) => event,
            Err(_) => ScanEvent::Failed(self.worker_failure()),
        };

        match &event {
            ScanEvent::Entry(_) => {}
            ScanEvent::Done => {
                self.completed = true;
                self.finished = true;
                self.join_worker();
            }
            ScanEvent::Failed(_) => {
                self.finished = true;
                self.join_worker();
            }
        }

        Some(event)
    }

    /// True once the producer has reported that every page was read
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn worker_failure(&mut self) -> Error {
        let reason = match self.worker.take().map(JoinHandle::join) {
            Some(Err(_)) => "scan thread panicked",
            _ => "scan thread exited without reporting completion",
        };
        Error::ScanWorker(reason.to_string())
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("Scan thread panicked after its final event");
            }
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.recv_event()? {
            ScanEvent::Entry(entry) => Some(Ok(entry)),
            ScanEvent::Done => None,
            ScanEvent::Failed(e) => Some(Err(e)),
        }
    }
}

impl FusedIterator for Scanner {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdb::Endian;
    use crate::bdb::testing::{HashFileBuilder, Item};
    use crate::bdb::page::PAGE_HEADER_SIZE;
    use byteorder::{ByteOrder, LittleEndian};
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    const PAGE_SIZE: usize = 512;

    /// Metadata page, one hash page holding `value` off-page, and the
    /// overflow pages 2 and 3 it spills into
    fn single_value_db(value: &[u8]) -> Vec<u8> {
        let mut builder = HashFileBuilder::new(Endian::Little, PAGE_SIZE);
        builder.hash_page(&[Item::OffPage(value)]);
        builder.build()
    }

    #[test]
    fn test_entries_reassemble_overflow_chain() {
        let value: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
        let mut db = HashDatabase::from_reader(Cursor::new(single_value_db(&value))).unwrap();

        let entries: Vec<RawEntry> = db.entries().collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].page_no, 1);
        assert_eq!(entries[0].value, value);
    }

    #[test]
    fn test_entries_skip_inline_items_and_other_pages() {
        let first = vec![0xa1; 40];
        let second = vec![0xb2; 1200];
        let third = vec![0xc3; 30];

        let mut builder = HashFileBuilder::new(Endian::Little, PAGE_SIZE);
        builder.hash_page(&[Item::OffPage(&first), Item::Inline(b"inline value")]);
        builder.other_page(5);
        builder.hash_page(&[Item::OffPage(&second), Item::OffPage(&third)]);

        let mut db = HashDatabase::from_reader(Cursor::new(builder.build())).unwrap();
        let values: Vec<Vec<u8>> = db
            .entries()
            .map(|entry| entry.map(|e| e.value))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(values, vec![first, second, third]);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_non_overflow_page_in_chain_is_skipped() {
        let value: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
        let mut builder = HashFileBuilder::new(Endian::Little, PAGE_SIZE);
        builder.hash_page(&[Item::OffPage(&value)]);
        // First link of the chain becomes a btree leaf page
        builder.page_mut(2)[25] = 5;

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let mut db = HashDatabase::from_reader(Cursor::new(builder.build())).unwrap();
        let entries: Vec<RawEntry> = tracing::subscriber::with_default(subscriber, || {
            db.entries().collect::<Result<_>>().unwrap()
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, &value[PAGE_SIZE - PAGE_HEADER_SIZE..]);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("is 214 bytes, descriptor says 700"));
    }

    #[test]
    fn test_entries_is_fused_after_end() {
        let value = vec![0x5a; 600];
        let mut db = HashDatabase::from_reader(Cursor::new(single_value_db(&value))).unwrap();

        let mut entries = db.entries();
        assert!(entries.next().unwrap().is_ok());
        assert!(entries.next().is_none());
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_truncated_file_is_io_error() {
        let value = vec![0x11; 600];
        let mut file = single_value_db(&value);
        file.truncate(PAGE_SIZE * 3 + 100);

        let mut db = HashDatabase::from_reader(Cursor::new(file)).unwrap();
        let mut entries = db.entries();
        assert!(matches!(entries.next(), Some(Err(Error::Io(_)))));
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_overflow_cycle_rejected() {
        let value = vec![0x22; 600];
        let mut file = single_value_db(&value);
        // Point the last overflow page back at the first
        LittleEndian::write_u32(&mut file[PAGE_SIZE * 3 + 16..PAGE_SIZE * 3 + 20], 2);

        let mut db = HashDatabase::from_reader(Cursor::new(file)).unwrap();
        let result: Result<Vec<RawEntry>> = db.entries().collect();
        assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("does not terminate")));
    }

    #[test]
    fn test_background_scanner_matches_inline() {
        let value: Vec<u8> = (0..650u32).map(|i| (i * 7 % 256) as u8).collect();
        let file = single_value_db(&value);

        let mut inline_db = HashDatabase::from_reader(Cursor::new(file.clone())).unwrap();
        let inline: Vec<RawEntry> = inline_db.entries().collect::<Result<_>>().unwrap();

        let mut scanner = HashDatabase::from_reader(Cursor::new(file))
            .unwrap()
            .spawn_scan()
            .unwrap();
        let threaded: Vec<RawEntry> = scanner.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(inline, threaded);
        assert!(scanner.is_complete());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_background_scanner_reports_failure_as_event() {
        let value = vec![0x33; 600];
        let mut file = single_value_db(&value);
        file.truncate(PAGE_SIZE * 2 + 10);

        let mut scanner = HashDatabase::from_reader(Cursor::new(file))
            .unwrap()
            .spawn_scan()
            .unwrap();

        assert!(matches!(scanner.recv_event(), Some(ScanEvent::Failed(Error::Io(_)))));
        assert!(scanner.recv_event().is_none());
        assert!(!scanner.is_complete());
    }
}
