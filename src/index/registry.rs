//! Lazily opened, cached array-file handles.
//!
//! Array files are opened on first use and kept open for the life of the
//! index. The cache key is `(partition, chunk_size)` — one live array per
//! capacity tier and row width. Writes only ever target serial 0; higher
//! serials are a reserved migration hook that bootstrap tolerates reading
//! (an opened higher serial replaces the cache entry for its tier, as the
//! newest file wins).

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::info;

use super::{IndexError, naming, sizing::PartitionSizing};
use crate::array::FixedArray;
use crate::collection::EXPORT_OVERHEAD;

/// Cache of open [`FixedArray`] handles keyed by `(partition, chunk_size)`.
#[derive(Debug)]
pub(crate) struct ArrayRegistry {
    dir: PathBuf,
    stub: String,
    load_factor: u32,
    key_width: usize,
    sizing: PartitionSizing,
    arrays: HashMap<(u8, usize), FixedArray>,
}

impl ArrayRegistry {
    pub(crate) fn new(
        dir: PathBuf,
        stub: String,
        load_factor: u32,
        key_width: usize,
        sizing: PartitionSizing,
    ) -> Self {
        Self {
            dir,
            stub,
            load_factor,
            key_width,
            sizing,
            arrays: HashMap::new(),
        }
    }

    /// Slot payload width for a tier: blob overhead plus capacity rows.
    fn payload_width(&self, partition: u8, chunk_size: usize) -> usize {
        EXPORT_OVERHEAD + self.sizing.slot_capacity(partition) * chunk_size
    }

    /// Whether `partition` is within the configured tier count.
    pub(crate) fn valid_partition(&self, partition: u8) -> bool {
        self.sizing.valid_partition(partition)
    }

    /// Return the cached handle for `(partition, chunk_size)`, opening or
    /// creating the serial-0 file on first use.
    ///
    /// Writes never target another serial, so `serial != 0` is refused.
    pub(crate) fn get_or_open(
        &mut self,
        partition: u8,
        serial: u8,
        chunk_size: usize,
    ) -> Result<&mut FixedArray, IndexError> {
        if serial != 0 {
            return Err(IndexError::SerialUnsupported(serial));
        }
        self.open_serial(partition, serial, chunk_size)
    }

    /// Bootstrap-only entry point: open an existing array file of any
    /// serial and cache it under its tier.
    pub(crate) fn open_for_bootstrap(
        &mut self,
        partition: u8,
        serial: u8,
        chunk_size: usize,
    ) -> Result<&mut FixedArray, IndexError> {
        // A higher serial replaces whatever the tier currently maps to.
        if serial != 0 {
            self.arrays.remove(&(partition, chunk_size));
        }
        self.open_serial(partition, serial, chunk_size)
    }

    fn open_serial(
        &mut self,
        partition: u8,
        serial: u8,
        chunk_size: usize,
    ) -> Result<&mut FixedArray, IndexError> {
        // Corrupt metadata can name a partition beyond the configured
        // tiers; the capacity arithmetic must not run on one.
        if !self.sizing.valid_partition(partition) {
            return Err(IndexError::Internal(format!(
                "partition {partition} beyond the configured maximum"
            )));
        }
        let key = (partition, chunk_size);
        if !self.arrays.contains_key(&key) {
            let path = naming::array_file(
                &self.dir,
                &self.stub,
                self.load_factor,
                chunk_size,
                partition,
                serial,
            );
            let array =
                FixedArray::open(&path, self.key_width, self.payload_width(partition, chunk_size))?;
            info!(
                path = %array.path().display(),
                slots = array.size(),
                free = array.free(),
                "opened array file"
            );
            self.arrays.insert(key, array);
        }
        // The entry was just inserted if it was missing.
        self.arrays
            .get_mut(&key)
            .ok_or_else(|| IndexError::Internal("array vanished from registry".into()))
    }

    /// Flush and drop every cached handle exactly once.
    pub(crate) fn close_all(&mut self) -> Result<(), IndexError> {
        for (_, array) in self.arrays.drain() {
            array.close()?;
        }
        Ok(())
    }
}
