//! Fixed-width record files with slot reuse.
//!
//! A [`FixedArray`] stores records of one fixed shape — a key column
//! followed by a payload column — at stable integer *slots*. Removed slots
//! are chained into an intrusive free list and handed out again by
//! [`FixedArray::add`], so slot indices stay dense without ever moving a
//! live record.
//!
//! # On-disk layout
//!
//! ```text
//! [HEADER 32B]
//! [KEY | PAYLOAD]   slot 0
//! [KEY | PAYLOAD]   slot 1
//! ...
//! ```
//!
//! Header: magic `FXA1`, format version, key width, payload width, free
//! list head, free count (integers big-endian). The slot count is derived
//! from the file length, so appending a record never requires a header
//! update — a torn append leaves a partial trailing record that the next
//! open ignores.
//!
//! A deleted record has an all-zero key column; the first 4 payload bytes
//! hold the next free slot (hence payload width must be at least 4).
//! Because a zeroed key *is* the deleted marker, writing a record with an
//! all-zero key is refused.
//!
//! # Write ordering
//!
//! Record bytes are written before the header that accounts for them.
//! A crash between the two leaves either an ignorable partial record
//! (append) or a zeroed record not yet on the free list (remove) — the
//! slot leaks but scans skip it.
//!
//! All I/O is positioned (`read_at`/`write_at`); the struct carries no
//! seek cursor.


use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::encoding::{self, EncodingError};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

const MAGIC: [u8; 4] = *b"FXA1";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 32;

/// Sentinel for "no free slot".
const NIL: u32 = u32::MAX;

/// Records fetched per read during a content scan.
const SCAN_BATCH: usize = 256;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors raised by fixed-array file operations.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file exists but its header disagrees with the expected shape.
    #[error("bad array header in {path}: {detail}")]
    BadHeader {
        /// File the header was read from.
        path: String,
        /// What disagreed.
        detail: String,
    },

    /// A slot index beyond the current file size.
    #[error("slot {slot} out of range (array has {size} slots)")]
    SlotOutOfRange {
        /// Requested slot.
        slot: u32,
        /// Total slots in the file.
        size: u32,
    },

    /// Key bytes of the wrong width.
    #[error("key is {got} bytes, array stores {expected}-byte keys")]
    WrongKeyWidth {
        /// Bytes supplied.
        got: usize,
        /// Bytes required.
        expected: usize,
    },

    /// Payload bytes of the wrong width.
    #[error("payload is {got} bytes, array stores {expected}-byte payloads")]
    WrongPayloadWidth {
        /// Bytes supplied.
        got: usize,
        /// Bytes required.
        expected: usize,
    },

    /// An all-zero key would alias the deleted-slot marker.
    #[error("all-zero keys are reserved for deleted slots")]
    ZeroKey,

    /// Column codec failure while reading or writing the header.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

// ------------------------------------------------------------------------------------------------
// Records
// ------------------------------------------------------------------------------------------------

/// One record read from an array slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRecord {
    /// Key column; all zeros for a deleted slot.
    pub key: Vec<u8>,
    /// Payload column.
    pub payload: Vec<u8>,
}

impl ArrayRecord {
    /// Whether this record is the deleted-slot marker.
    pub fn is_deleted(&self) -> bool {
        self.key.iter().all(|&b| b == 0)
    }
}

// ------------------------------------------------------------------------------------------------
// FixedArray
// ------------------------------------------------------------------------------------------------

/// A fixed-width record file with free-list slot reuse.
#[derive(Debug)]
pub struct FixedArray {
    file: File,
    path: PathBuf,
    key_width: usize,
    payload_width: usize,
    slot_count: u32,
    free_head: u32,
    free_count: u32,
}

impl FixedArray {
    /// Open the array at `path`, creating it if missing.
    ///
    /// An existing file must carry a valid header whose widths match the
    /// requested ones.
    pub fn open(
        path: impl AsRef<Path>,
        key_width: usize,
        payload_width: usize,
    ) -> Result<Self, ArrayError> {
        let path = path.as_ref().to_path_buf();
        if payload_width < 4 {
            return Err(ArrayError::BadHeader {
                path: path.display().to_string(),
                detail: format!("payload width {payload_width} below free-list minimum of 4"),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let len = file.metadata()?.len();

        let mut array = Self {
            file,
            path,
            key_width,
            payload_width,
            slot_count: 0,
            free_head: NIL,
            free_count: 0,
        };

        if len == 0 {
            array.write_header()?;
            return Ok(array);
        }

        array.read_header()?;
        let record_width = array.record_width() as u64;
        let body = len.saturating_sub(HEADER_LEN as u64);
        if body % record_width != 0 {
            warn!(
                path = %array.path.display(),
                trailing = body % record_width,
                "array file has a partial trailing record; ignoring it"
            );
        }
        array.slot_count = u32::try_from(body / record_width).unwrap_or(u32::MAX);
        Ok(array)
    }

    /// Total record width (key + payload).
    fn record_width(&self) -> usize {
        self.key_width + self.payload_width
    }

    fn slot_offset(&self, slot: u32) -> u64 {
        HEADER_LEN as u64 + u64::from(slot) * self.record_width() as u64
    }

    /// Path this array is backed by.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total slots, including deleted ones.
    pub fn size(&self) -> u32 {
        self.slot_count
    }

    /// Deleted (reusable) slots.
    pub fn free(&self) -> u32 {
        self.free_count
    }

    /// Live records.
    pub fn used(&self) -> u32 {
        self.slot_count - self.free_count
    }

    // --------------------------------------------------------------------
    // Header I/O
    // --------------------------------------------------------------------

    fn write_header(&mut self) -> Result<(), ArrayError> {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        encoding::put_u16(&mut buf, 4, VERSION)?;
        encoding::put_u32(&mut buf, 8, self.key_width as u32)?;
        encoding::put_u32(&mut buf, 12, self.payload_width as u32)?;
        encoding::put_u32(&mut buf, 16, self.free_head)?;
        encoding::put_u32(&mut buf, 20, self.free_count)?;
        self.file.write_all_at(&buf, 0)?;
        Ok(())
    }

    fn read_header(&mut self) -> Result<(), ArrayError> {
        let mut buf = [0u8; HEADER_LEN];
        self.file.read_exact_at(&mut buf, 0).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ArrayError::BadHeader {
                    path: self.path.display().to_string(),
                    detail: "file shorter than header".into(),
                }
            } else {
                ArrayError::Io(e)
            }
        })?;

        if buf[0..4] != MAGIC {
            return Err(self.header_err("bad magic"));
        }
        let version = encoding::get_u16(&buf, 4)?;
        if version != VERSION {
            return Err(self.header_err(&format!("unsupported version {version}")));
        }
        let key_width = encoding::get_u32(&buf, 8)? as usize;
        let payload_width = encoding::get_u32(&buf, 12)? as usize;
        if key_width != self.key_width || payload_width != self.payload_width {
            return Err(self.header_err(&format!(
                "stored widths {key_width}+{payload_width}, expected {}+{}",
                self.key_width, self.payload_width
            )));
        }
        self.free_head = encoding::get_u32(&buf, 16)?;
        self.free_count = encoding::get_u32(&buf, 20)?;
        Ok(())
    }

    fn header_err(&self, detail: &str) -> ArrayError {
        ArrayError::BadHeader {
            path: self.path.display().to_string(),
            detail: detail.to_string(),
        }
    }

    // --------------------------------------------------------------------
    // Record I/O
    // --------------------------------------------------------------------

    fn check_widths(&self, key: &[u8], payload: &[u8]) -> Result<(), ArrayError> {
        if key.len() != self.key_width {
            return Err(ArrayError::WrongKeyWidth {
                got: key.len(),
                expected: self.key_width,
            });
        }
        if payload.len() != self.payload_width {
            return Err(ArrayError::WrongPayloadWidth {
                got: payload.len(),
                expected: self.payload_width,
            });
        }
        if key.iter().all(|&b| b == 0) {
            return Err(ArrayError::ZeroKey);
        }
        Ok(())
    }

    fn write_record(&mut self, slot: u32, key: &[u8], payload: &[u8]) -> Result<(), ArrayError> {
        let mut buf = Vec::with_capacity(self.record_width());
        buf.extend_from_slice(key);
        buf.extend_from_slice(payload);
        self.file.write_all_at(&buf, self.slot_offset(slot))?;
        Ok(())
    }

    /// Read the record at `slot`.
    pub fn get(&self, slot: u32) -> Result<ArrayRecord, ArrayError> {
        if slot >= self.slot_count {
            return Err(ArrayError::SlotOutOfRange {
                slot,
                size: self.slot_count,
            });
        }
        let mut buf = vec![0u8; self.record_width()];
        self.file.read_exact_at(&mut buf, self.slot_offset(slot))?;
        let payload = buf.split_off(self.key_width);
        Ok(ArrayRecord { key: buf, payload })
    }

    /// Store a record in a reused or freshly appended slot; returns the slot.
    pub fn add(&mut self, key: &[u8], payload: &[u8]) -> Result<u32, ArrayError> {
        self.check_widths(key, payload)?;

        if self.free_head != NIL {
            let slot = self.free_head;
            let record = self.get(slot)?;
            let next = encoding::get_u32(&record.payload, 0)?;
            self.write_record(slot, key, payload)?;
            self.free_head = next;
            self.free_count -= 1;
            self.write_header()?;
            return Ok(slot);
        }

        let slot = self.slot_count;
        self.write_record(slot, key, payload)?;
        self.slot_count += 1;
        Ok(slot)
    }

    /// Overwrite the record at an existing slot.
    pub fn set(&mut self, slot: u32, key: &[u8], payload: &[u8]) -> Result<(), ArrayError> {
        self.check_widths(key, payload)?;
        if slot >= self.slot_count {
            return Err(ArrayError::SlotOutOfRange {
                slot,
                size: self.slot_count,
            });
        }
        self.write_record(slot, key, payload)
    }

    /// Mark the slot deleted and chain it into the free list.
    ///
    /// Removing an already-deleted slot is a no-op: the read-repair path
    /// may legitimately ask to erase a slot that a prior repair already
    /// cleared, and re-linking it would corrupt the free list.
    pub fn remove(&mut self, slot: u32) -> Result<(), ArrayError> {
        if slot >= self.slot_count {
            return Err(ArrayError::SlotOutOfRange {
                slot,
                size: self.slot_count,
            });
        }
        let record = self.get(slot)?;
        if record.is_deleted() {
            debug!(path = %self.path.display(), slot, "remove of already-deleted slot");
            return Ok(());
        }

        let zero_key = vec![0u8; self.key_width];
        let mut payload = record.payload;
        encoding::put_u32(&mut payload, 0, self.free_head)?;
        self.write_record(slot, &zero_key, &payload)?;

        self.free_head = slot;
        self.free_count += 1;
        self.write_header()?;
        Ok(())
    }

    /// Iterate over live records in slot order, reading in batches.
    pub fn content_rows(&self) -> ContentRows<'_> {
        ContentRows {
            array: self,
            next_slot: 0,
            buffer: Vec::new(),
            buffer_first: 0,
            buffer_slots: 0,
        }
    }

    /// Force written data to stable storage.
    pub fn flush(&mut self) -> Result<(), ArrayError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Flush and release the handle.
    pub fn close(mut self) -> Result<(), ArrayError> {
        self.flush()
    }
}

// ------------------------------------------------------------------------------------------------
// Content scan
// ------------------------------------------------------------------------------------------------

/// Batched scan over live records of a [`FixedArray`].
///
/// Deleted slots are skipped. Slots written *after* the iterator was
/// created are not visited.
pub struct ContentRows<'a> {
    array: &'a FixedArray,
    next_slot: u32,
    buffer: Vec<u8>,
    /// Slot index of the first record in `buffer`.
    buffer_first: u32,
    /// Records currently buffered.
    buffer_slots: u32,
}

impl ContentRows<'_> {
    fn fill_buffer(&mut self) -> Result<(), ArrayError> {
        let remaining = self.array.slot_count - self.next_slot;
        let take = remaining.min(SCAN_BATCH as u32);
        let record_width = self.array.record_width();
        self.buffer.resize(take as usize * record_width, 0);
        self.array
            .file
            .read_exact_at(&mut self.buffer, self.array.slot_offset(self.next_slot))?;
        self.buffer_first = self.next_slot;
        self.buffer_slots = take;
        Ok(())
    }
}

impl Iterator for ContentRows<'_> {
    type Item = Result<(u32, ArrayRecord), ArrayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.next_slot >= self.array.slot_count {
                return None;
            }
            if self.next_slot >= self.buffer_first + self.buffer_slots || self.buffer_slots == 0 {
                if let Err(e) = self.fill_buffer() {
                    self.next_slot = self.array.slot_count; // stop after error
                    return Some(Err(e));
                }
            }

            let slot = self.next_slot;
            self.next_slot += 1;

            let record_width = self.array.record_width();
            let start = (slot - self.buffer_first) as usize * record_width;
            let record = &self.buffer[start..start + record_width];
            let key = &record[..self.array.key_width];
            if key.iter().all(|&b| b == 0) {
                continue; // deleted
            }
            return Some(Ok((
                slot,
                ArrayRecord {
                    key: key.to_vec(),
                    payload: record[self.array.key_width..].to_vec(),
                },
            )));
        }
    }
}
