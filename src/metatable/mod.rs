//! Persistent metadata table: one entry per live key.
//!
//! The table maps a fixed-width key to its [`MetaEntry`] — the pointer
//! record naming which partition file and slot hold the key's collection,
//! how many rows it had when last written, and day-granularity access
//! timestamps. It is the authority the index consults before touching any
//! array file.
//!
//! # Storage model
//!
//! Entries live in a single [`FixedArray`] file; an in-memory ordered map
//! (key → slot, in the configured [`KeyOrder`]) is rebuilt by scanning the
//! file at open. Mutations write through to the file immediately, so the
//! map never holds state the disk lacks. If the file carries the same key
//! twice — the stale-key self-heal of the index can produce this — the
//! entry at the higher slot wins and the duplicate is logged.
//!
//! # Entry layout
//!
//! `[key | chunk_size u32 | chunk_count u32 | cluster_idx u8 | flags u8 |
//! index_pos u32 | last_read u16 | last_wrote u16]`, integers big-endian.


use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::array::{ArrayError, FixedArray};
use crate::encoding::{self, EncodingError};
use crate::order::{KeyOrder, OrderedKey};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Width of the fixed columns following the key.
pub const ENTRY_FIXED_WIDTH: usize = 18;

const OFF_CHUNK_SIZE: usize = 0;
const OFF_CHUNK_COUNT: usize = 4;
const OFF_CLUSTER_IDX: usize = 8;
const OFF_FLAGS: usize = 9;
const OFF_INDEX_POS: usize = 10;
const OFF_LAST_READ: usize = 14;
const OFF_LAST_WROTE: usize = 16;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors raised by metadata-table operations.
#[derive(Debug, Error)]
pub enum MetaError {
    /// Underlying record-file failure.
    #[error("array error: {0}")]
    Array(#[from] ArrayError),

    /// Column codec failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// `add_unique` found the key already present.
    #[error("key already present in metadata table")]
    KeyExists,

    /// A key of the wrong width was supplied.
    #[error("key is {got} bytes, table stores {expected}-byte keys")]
    WrongKeyWidth {
        /// Bytes supplied.
        got: usize,
        /// Bytes required.
        expected: usize,
    },
}

// ------------------------------------------------------------------------------------------------
// MetaEntry
// ------------------------------------------------------------------------------------------------

/// Per-key metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    /// The collection key.
    pub key: Vec<u8>,
    /// Payload row width at the time of the last write.
    pub chunk_size: u32,
    /// Live rows in the collection at the time of the last write.
    pub chunk_count: u32,
    /// Partition number of the array file holding the collection.
    pub cluster_idx: u8,
    /// Reserved, zero.
    pub flags: u8,
    /// Slot index inside the array file.
    pub index_pos: u32,
    /// Days since 2000-01-01 of the last read.
    pub last_read: u16,
    /// Days since 2000-01-01 of the last write.
    pub last_wrote: u16,
}

impl MetaEntry {
    /// Build a fresh entry stamped with `today` for both timestamps.
    pub fn new(
        key: Vec<u8>,
        chunk_size: u32,
        chunk_count: u32,
        cluster_idx: u8,
        index_pos: u32,
        today: u16,
    ) -> Self {
        Self {
            key,
            chunk_size,
            chunk_count,
            cluster_idx,
            flags: 0,
            index_pos,
            last_read: today,
            last_wrote: today,
        }
    }

    /// Encode the fixed columns (everything after the key).
    fn encode_fixed(&self) -> Result<Vec<u8>, MetaError> {
        let mut buf = vec![0u8; ENTRY_FIXED_WIDTH];
        encoding::put_u32(&mut buf, OFF_CHUNK_SIZE, self.chunk_size)?;
        encoding::put_u32(&mut buf, OFF_CHUNK_COUNT, self.chunk_count)?;
        buf[OFF_CLUSTER_IDX] = self.cluster_idx;
        buf[OFF_FLAGS] = self.flags;
        encoding::put_u32(&mut buf, OFF_INDEX_POS, self.index_pos)?;
        encoding::put_u16(&mut buf, OFF_LAST_READ, self.last_read)?;
        encoding::put_u16(&mut buf, OFF_LAST_WROTE, self.last_wrote)?;
        Ok(buf)
    }

    /// Decode from a key column and the fixed-column bytes.
    fn decode(key: Vec<u8>, fixed: &[u8]) -> Result<Self, MetaError> {
        encoding::require(fixed, ENTRY_FIXED_WIDTH)?;
        Ok(Self {
            key,
            chunk_size: encoding::get_u32(fixed, OFF_CHUNK_SIZE)?,
            chunk_count: encoding::get_u32(fixed, OFF_CHUNK_COUNT)?,
            cluster_idx: fixed[OFF_CLUSTER_IDX],
            flags: fixed[OFF_FLAGS],
            index_pos: encoding::get_u32(fixed, OFF_INDEX_POS)?,
            last_read: encoding::get_u16(fixed, OFF_LAST_READ)?,
            last_wrote: encoding::get_u16(fixed, OFF_LAST_WROTE)?,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// MetaTable
// ------------------------------------------------------------------------------------------------

/// Ordered, persistent key → [`MetaEntry`] table.
#[derive(Debug)]
pub struct MetaTable {
    array: FixedArray,
    map: BTreeMap<OrderedKey, u32>,
    order: KeyOrder,
    key_width: usize,
}

impl MetaTable {
    /// Open the table file at `path`, creating it if missing, and rebuild
    /// the in-memory key map from its live records.
    pub fn open(
        path: impl AsRef<Path>,
        key_width: usize,
        order: KeyOrder,
    ) -> Result<Self, MetaError> {
        let array = FixedArray::open(path, key_width, ENTRY_FIXED_WIDTH)?;

        let mut map = BTreeMap::new();
        for item in array.content_rows() {
            let (slot, record) = item?;
            let previous = map.insert(OrderedKey::new(order, record.key), slot);
            if let Some(old_slot) = previous {
                warn!(
                    path = %array.path().display(),
                    old_slot,
                    new_slot = slot,
                    "duplicate key in metadata table; keeping the later slot"
                );
            }
        }
        info!(
            path = %array.path().display(),
            entries = map.len(),
            "opened metadata table"
        );

        Ok(Self {
            array,
            map,
            order,
            key_width,
        })
    }

    fn check_key(&self, key: &[u8]) -> Result<(), MetaError> {
        if key.len() != self.key_width {
            return Err(MetaError::WrongKeyWidth {
                got: key.len(),
                expected: self.key_width,
            });
        }
        Ok(())
    }

    fn ordered(&self, key: &[u8]) -> OrderedKey {
        OrderedKey::new(self.order, key.to_vec())
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.map.len()
    }

    /// Whether `key` has an entry.
    pub fn has(&self, key: &[u8]) -> bool {
        self.map.contains_key(&self.ordered(key))
    }

    /// Load the entry for `key`, if any.
    pub fn get(&self, key: &[u8]) -> Result<Option<MetaEntry>, MetaError> {
        self.check_key(key)?;
        let Some(&slot) = self.map.get(&self.ordered(key)) else {
            return Ok(None);
        };
        let record = self.array.get(slot)?;
        Ok(Some(MetaEntry::decode(record.key, &record.payload)?))
    }

    /// Insert a new entry; fails with [`MetaError::KeyExists`] if present.
    pub fn add_unique(&mut self, entry: &MetaEntry) -> Result<(), MetaError> {
        self.check_key(&entry.key)?;
        if self.has(&entry.key) {
            return Err(MetaError::KeyExists);
        }
        let fixed = entry.encode_fixed()?;
        let slot = self.array.add(&entry.key, &fixed)?;
        self.map.insert(self.ordered(&entry.key), slot);
        Ok(())
    }

    /// Upsert an entry.
    pub fn put(&mut self, entry: &MetaEntry) -> Result<(), MetaError> {
        self.check_key(&entry.key)?;
        let fixed = entry.encode_fixed()?;
        if let Some(&slot) = self.map.get(&self.ordered(&entry.key)) {
            self.array.set(slot, &entry.key, &fixed)?;
        } else {
            let slot = self.array.add(&entry.key, &fixed)?;
            self.map.insert(self.ordered(&entry.key), slot);
        }
        Ok(())
    }

    /// Bulk upsert, stamping every entry's `last_wrote` with `day`.
    ///
    /// Entries that already have a table slot are written in slot order so
    /// consecutive writes land near each other on disk; new entries are
    /// appended afterwards.
    pub fn put_multiple(&mut self, entries: Vec<MetaEntry>, day: u16) -> Result<(), MetaError> {
        let mut existing: Vec<(u32, MetaEntry)> = Vec::new();
        let mut fresh: Vec<MetaEntry> = Vec::new();
        for mut entry in entries {
            self.check_key(&entry.key)?;
            entry.last_wrote = day;
            match self.map.get(&self.ordered(&entry.key)) {
                Some(&slot) => existing.push((slot, entry)),
                None => fresh.push(entry),
            }
        }

        existing.sort_by_key(|(slot, _)| *slot);
        for (slot, entry) in existing {
            let fixed = entry.encode_fixed()?;
            self.array.set(slot, &entry.key, &fixed)?;
        }
        for entry in fresh {
            let fixed = entry.encode_fixed()?;
            let slot = self.array.add(&entry.key, &fixed)?;
            self.map.insert(self.ordered(&entry.key), slot);
        }
        Ok(())
    }

    /// Remove and return the entry for `key`.
    pub fn remove(&mut self, key: &[u8]) -> Result<Option<MetaEntry>, MetaError> {
        self.check_key(key)?;
        let Some(slot) = self.map.remove(&self.ordered(key)) else {
            return Ok(None);
        };
        let record = self.array.get(slot)?;
        let entry = MetaEntry::decode(record.key, &record.payload)?;
        self.array.remove(slot)?;
        Ok(Some(entry))
    }

    /// Iterate entries in key order starting at `start_key` (or the
    /// smallest key). With `rotating`, iteration wraps past the largest
    /// key and continues until it would revisit the starting point.
    ///
    /// The key sequence is snapshotted at creation; entries removed while
    /// iterating are skipped, mutated ones are read in their latest state.
    pub fn rows(&self, rotating: bool, start_key: Option<&[u8]>) -> MetaRows<'_> {
        MetaRows {
            table: self,
            keys: self.snapshot_keys(rotating, start_key).into_iter(),
        }
    }

    /// The key sequence [`MetaTable::rows`] would visit, as of now.
    pub(crate) fn snapshot_keys(&self, rotating: bool, start_key: Option<&[u8]>) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = Vec::with_capacity(self.map.len());
        match start_key {
            None => keys.extend(self.map.keys().map(|k| k.bytes().to_vec())),
            Some(start) => {
                let start = self.ordered(start);
                keys.extend(self.map.range(start.clone()..).map(|(k, _)| k.bytes().to_vec()));
                if rotating {
                    keys.extend(self.map.range(..start).map(|(k, _)| k.bytes().to_vec()));
                }
            }
        }
        keys
    }

    /// Flush table records to stable storage.
    pub fn close(&mut self) -> Result<(), MetaError> {
        self.array.flush()?;
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Row iteration
// ------------------------------------------------------------------------------------------------

/// Ordered entry iterator returned by [`MetaTable::rows`].
pub struct MetaRows<'a> {
    table: &'a MetaTable,
    keys: std::vec::IntoIter<Vec<u8>>,
}

impl Iterator for MetaRows<'_> {
    type Item = Result<MetaEntry, MetaError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            match self.table.get(&key) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue, // removed since the snapshot
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
