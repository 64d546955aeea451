//! In-memory row collections and their slot blob codec.
//!
//! A [`RowCollection`] is an ordered, deduplicated multiset of fixed-width
//! payload rows — the value type of the collection index. Rows are held in
//! one flat buffer with a stride of the payload width, the way they are
//! laid out on disk, so export is a header prepend plus a copy.
//!
//! The first column of a row is its **primary key**; ordering, dedup, and
//! removal all operate on it under the schema's [`KeyOrder`].
//!
//! # Slot blob format
//!
//! A collection serializes into a slot of capacity `C` as
//! `EXPORT_OVERHEAD + C * P` bytes:
//!
//! ```text
//! [LIVE_COUNT u32 BE][CHUNK_SIZE u16 BE][ORDER_TAG u8][0u8]
//! [ROWS_CRC32 u32 BE][RESERVED 4B]
//! [ROW 0][ROW 1]...[ROW live-1][ZERO PADDING to C rows]
//! ```
//!
//! The blob is self-describing: the live count and the chunk size at export
//! time are read back from the header, so a blob written under an older,
//! narrower schema can still be decoded — its rows are zero-padded up to
//! the current width (schemas only ever grow by appended columns). The
//! CRC32 covers exactly the live-row region; a mismatch means the slot
//! content cannot be trusted at all.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crc32fast::Hasher as Crc32;
use thiserror::Error;

use crate::encoding::{self, EncodingError};
use crate::rowdef::RowDef;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Header bytes preceding the row region of an exported blob.
pub const EXPORT_OVERHEAD: usize = 16;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors raised by collection operations and the blob codec.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A row had a different width than the schema prescribes.
    #[error("row is {got} bytes, schema prescribes {expected}")]
    WrongRowWidth {
        /// Bytes supplied.
        got: usize,
        /// Bytes required by the schema.
        expected: usize,
    },

    /// The blob is shorter than its header claims.
    #[error("blob too small: need {needed} bytes, have {available}")]
    BlobTooSmall {
        /// Bytes implied by the header.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// The stored row CRC does not match the recomputed one.
    #[error("blob checksum mismatch: stored {stored:#010X}, computed {computed:#010X}")]
    ChecksumMismatch {
        /// CRC32 read from the header.
        stored: u32,
        /// CRC32 recomputed over the live-row region.
        computed: u32,
    },

    /// The blob was exported under an unknown or different key order.
    #[error("blob carries unknown or foreign key-order tag {0}")]
    OrderMismatch(u8),

    /// The blob's rows are wider than the current schema — schemas only
    /// ever grow, so this indicates opening with the wrong definition.
    #[error("blob chunk size {stored} exceeds current row width {current}")]
    ChunkSizeTooLarge {
        /// Row width recorded in the blob.
        stored: usize,
        /// Current schema row width.
        current: usize,
    },

    /// More live rows than the destination slot capacity.
    #[error("{count} rows exceed the slot capacity of {capacity}")]
    CapacityExceeded {
        /// Live rows in the collection.
        count: usize,
        /// Rows the slot can hold.
        capacity: usize,
    },

    /// Column codec failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}

// ------------------------------------------------------------------------------------------------
// RowCollection
// ------------------------------------------------------------------------------------------------

/// Ordered, deduplicated multiset of fixed-width payload rows.
#[derive(Debug, Clone)]
pub struct RowCollection {
    rowdef: Arc<RowDef>,
    /// Flat row storage, stride `rowdef.width()`.
    data: Vec<u8>,
    /// True when rows are known to be in primary-key order.
    sorted: bool,
}

impl RowCollection {
    /// Create an empty collection for the given schema.
    pub fn new(rowdef: Arc<RowDef>) -> Self {
        Self {
            rowdef,
            data: Vec::new(),
            sorted: true,
        }
    }

    /// Create an empty collection with room for `rows` rows.
    pub fn with_capacity(rowdef: Arc<RowDef>, rows: usize) -> Self {
        let width = rowdef.width();
        Self {
            rowdef,
            data: Vec::with_capacity(rows * width),
            sorted: true,
        }
    }

    /// Decode a collection from a slot blob.
    ///
    /// Rows exported under a narrower (older, prefix-compatible) schema are
    /// zero-padded to the current width.
    pub fn from_blob(rowdef: Arc<RowDef>, blob: &[u8]) -> Result<Self, CollectionError> {
        encoding::require(blob, EXPORT_OVERHEAD)?;
        let count = encoding::get_u32(blob, 0)? as usize;
        let stored_width = encoding::get_u16(blob, 4)? as usize;
        let order_tag = blob[6];
        let stored_crc = encoding::get_u32(blob, 8)?;

        let current_width = rowdef.width();
        if stored_width > current_width {
            return Err(CollectionError::ChunkSizeTooLarge {
                stored: stored_width,
                current: current_width,
            });
        }
        if stored_width == 0 {
            return Err(CollectionError::WrongRowWidth {
                got: 0,
                expected: current_width,
            });
        }
        match crate::order::KeyOrder::from_tag(order_tag) {
            Some(order) if order == rowdef.order() => {}
            _ => return Err(CollectionError::OrderMismatch(order_tag)),
        }

        let rows_len = count * stored_width;
        let needed = EXPORT_OVERHEAD + rows_len;
        if blob.len() < needed {
            return Err(CollectionError::BlobTooSmall {
                needed,
                available: blob.len(),
            });
        }
        let rows = &blob[EXPORT_OVERHEAD..needed];

        let mut hasher = Crc32::new();
        hasher.update(rows);
        let computed = hasher.finalize();
        if computed != stored_crc {
            return Err(CollectionError::ChecksumMismatch {
                stored: stored_crc,
                computed,
            });
        }

        let mut data = Vec::with_capacity(count * current_width);
        if stored_width == current_width {
            data.extend_from_slice(rows);
        } else {
            for row in rows.chunks_exact(stored_width) {
                data.extend_from_slice(row);
                data.resize(data.len() + (current_width - stored_width), 0);
            }
        }

        // Re-derive the sorted flag rather than trusting the exporter.
        let mut collection = Self {
            rowdef,
            data,
            sorted: false,
        };
        collection.sorted = collection.check_sorted();
        Ok(collection)
    }

    /// Serialize into a slot blob of the given row capacity.
    pub fn export(&self, capacity: usize) -> Result<Vec<u8>, CollectionError> {
        let count = self.size();
        if count > capacity {
            return Err(CollectionError::CapacityExceeded { count, capacity });
        }
        let width = self.rowdef.width();
        let mut blob = vec![0u8; EXPORT_OVERHEAD + capacity * width];

        encoding::put_u32(&mut blob, 0, count as u32)?;
        let width_u16 =
            u16::try_from(width).map_err(|_| EncodingError::ColumnOverflow {
                value: width as u64,
                width: 2,
            })?;
        encoding::put_u16(&mut blob, 4, width_u16)?;
        blob[6] = self.rowdef.order().tag();

        let mut hasher = Crc32::new();
        hasher.update(&self.data);
        encoding::put_u32(&mut blob, 8, hasher.finalize())?;

        blob[EXPORT_OVERHEAD..EXPORT_OVERHEAD + self.data.len()].copy_from_slice(&self.data);
        Ok(blob)
    }

    // --------------------------------------------------------------------
    // Accessors
    // --------------------------------------------------------------------

    /// Number of live rows.
    pub fn size(&self) -> usize {
        if self.rowdef.width() == 0 {
            return 0;
        }
        self.data.len() / self.rowdef.width()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The schema this collection was built with.
    pub fn rowdef(&self) -> &Arc<RowDef> {
        &self.rowdef
    }

    /// The `i`-th row.
    pub fn row(&self, i: usize) -> &[u8] {
        let w = self.rowdef.width();
        &self.data[i * w..(i + 1) * w]
    }

    /// Iterate over rows in storage order.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.rowdef.width())
    }

    /// Primary-key bytes of the `i`-th row.
    fn primary(&self, i: usize) -> &[u8] {
        &self.row(i)[..self.rowdef.primary_width()]
    }

    // --------------------------------------------------------------------
    // Mutation
    // --------------------------------------------------------------------

    /// Append one row. Ordering is restored lazily by [`RowCollection::sort`].
    pub fn add(&mut self, row: &[u8]) -> Result<(), CollectionError> {
        let width = self.rowdef.width();
        if row.len() != width {
            return Err(CollectionError::WrongRowWidth {
                got: row.len(),
                expected: width,
            });
        }
        // Appends in primary-key order keep the sorted flag alive.
        if self.sorted && !self.is_empty() {
            let in_order = {
                let order = self.rowdef.order();
                let pk = self.rowdef.primary_width();
                let last = self.primary(self.size() - 1);
                order.compare(last, &row[..pk]) != std::cmp::Ordering::Greater
            };
            self.sorted = in_order;
        }
        self.data.extend_from_slice(row);
        Ok(())
    }

    /// Append every row of `other` (append-union; sort + uniq afterwards to
    /// restore set semantics).
    pub fn add_all(&mut self, other: &RowCollection) -> Result<(), CollectionError> {
        if other.rowdef.width() != self.rowdef.width() {
            return Err(CollectionError::WrongRowWidth {
                got: other.rowdef.width(),
                expected: self.rowdef.width(),
            });
        }
        if other.is_empty() {
            return Ok(());
        }
        self.data.extend_from_slice(&other.data);
        self.sorted = false;
        Ok(())
    }

    /// Sort rows by primary key in the schema's order. Stable, so earlier
    /// insertions win any later dedup among equal keys.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }
        let width = self.rowdef.width();
        let pk = self.rowdef.primary_width();
        let order = self.rowdef.order();
        let mut rows: Vec<&[u8]> = self.data.chunks_exact(width).collect();
        rows.sort_by(|a, b| order.compare(&a[..pk], &b[..pk]));
        let mut sorted = Vec::with_capacity(self.data.len());
        for row in rows {
            sorted.extend_from_slice(row);
        }
        self.data = sorted;
        self.sorted = true;
    }

    /// Drop rows whose primary key equals that of their predecessor,
    /// keeping the first occurrence. Requires a prior [`RowCollection::sort`].
    pub fn uniq(&mut self) {
        if self.size() < 2 {
            return;
        }
        debug_assert!(self.sorted, "uniq on unsorted collection");
        let width = self.rowdef.width();
        let pk = self.rowdef.primary_width();
        let order = self.rowdef.order();
        let mut keep = Vec::with_capacity(self.data.len());
        let mut last_key: Option<Vec<u8>> = None;
        for row in self.data.chunks_exact(width) {
            let key = &row[..pk];
            let duplicate = last_key
                .as_deref()
                .is_some_and(|k| order.compare(k, key) == std::cmp::Ordering::Equal);
            if !duplicate {
                keep.extend_from_slice(row);
                last_key = Some(key.to_vec());
            }
        }
        self.data = keep;
    }

    /// Release spare buffer capacity.
    pub fn trim(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Whether a row with this primary key exists.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Remove the row with this primary key, returning it.
    pub fn remove_key(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let i = self.find(key)?;
        let width = self.rowdef.width();
        let removed = self.row(i).to_vec();
        self.data.drain(i * width..(i + 1) * width);
        Some(removed)
    }

    /// Index of the row with this primary key, if any. Binary search when
    /// sorted, linear scan otherwise.
    fn find(&self, key: &[u8]) -> Option<usize> {
        let order = self.rowdef.order();
        let pk = self.rowdef.primary_width();
        let probe = &key[..key.len().min(pk)];
        if self.sorted {
            let mut lo = 0usize;
            let mut hi = self.size();
            while lo < hi {
                let mid = (lo + hi) / 2;
                match order.compare(self.primary(mid), probe) {
                    std::cmp::Ordering::Less => lo = mid + 1,
                    std::cmp::Ordering::Greater => hi = mid,
                    std::cmp::Ordering::Equal => return Some(mid),
                }
            }
            None
        } else {
            (0..self.size())
                .find(|&i| order.compare(self.primary(i), probe) == std::cmp::Ordering::Equal)
        }
    }

    fn check_sorted(&self) -> bool {
        let order = self.rowdef.order();
        (1..self.size()).all(|i| {
            order.compare(self.primary(i - 1), self.primary(i)) != std::cmp::Ordering::Greater
        })
    }
}
