//! # Collection Index
//!
//! The core of ShelfDB: a persistent map from a fixed-width key to a
//! [`RowCollection`], stored across **capacity-tiered array files**.
//!
//! ## Design Overview
//!
//! Collections have wildly varying sizes but array files want fixed-width
//! records, so slots come in tiers: partition `n` is an array file whose
//! slots each hold exactly `L^(n+1)` rows (`L` = load factor). A
//! collection lives in the smallest partition that fits it. When a merge
//! grows it past its tier's capacity it *transits* — the old slot is
//! freed and the collection is appended into a bigger tier. Shrinking
//! rewrites the slot in place; a collection is never demoted while its
//! slot still holds it.
//!
//! The metadata table maps each key to its current home: partition, slot
//! index, row count, and day-granularity access stamps. Array writes
//! always precede metadata writes, so a crash strands at worst an orphan
//! slot that the next metadata rebuild reclaims — never a metadata entry
//! pointing at data that was never written.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  CollectionIndex                      │
//! │                                                       │
//! │  ┌────────────┐     ┌───────────────────────────────┐ │
//! │  │ MetaTable  │     │ ArrayRegistry                 │ │
//! │  │ key→entry  │     │  partition 0: slots of L rows │ │
//! │  │ (ordered)  │     │  partition 1: slots of L²     │ │
//! │  └────────────┘     │  partition 2: slots of L³ ... │ │
//! │        ▲            └───────────────────────────────┘ │
//! │        │ rebuilt by scanning when absent              │
//! │        └── bootstrap ─────────────────────────────────│
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Self-healing reads
//!
//! Every read goes through a repair path that cross-checks the slot
//! against its metadata entry:
//!
//! - slot missing entirely → hard [`IndexError::Corruption`];
//! - malformed slot key or undecodable blob → slot and entry are erased,
//!   an empty collection is returned (the data is unrecoverable);
//! - slot key differs from the entry's key → the entry is rebound to the
//!   slot's actual key (possibly duplicating another entry — preferred
//!   over losing the collection);
//! - row count drift → metadata is corrected from the blob.
//!
//! The healed cases are logged, never raised.
//!
//! ## Concurrency Model
//!
//! Single mutator: one `Mutex` guards all state and every public
//! operation holds it for its full duration. All I/O is synchronous.
//!
//! ## Guarantees
//!
//! - A collection read back equals the collection written, as a set.
//! - A collection always sits in a partition whose capacity covers its
//!   metadata row count.
//! - Deleting the metadata table and reopening rebuilds it from the
//!   array files alone, identical up to timestamps.

pub(crate) mod batch;
pub(crate) mod bootstrap;
pub(crate) mod naming;
pub(crate) mod properties;
pub(crate) mod registry;
pub(crate) mod sizing;

mod iter;
pub use iter::KeyCollections;

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::array::ArrayError;
use crate::collection::{CollectionError, EXPORT_OVERHEAD, RowCollection};
use crate::encoding;
use crate::metatable::{MetaEntry, MetaError, MetaTable};
use crate::order::KeyOrder;
use crate::rowdef::RowDef;

use registry::ArrayRegistry;
use sizing::PartitionSizing;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors returned by collection-index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error from an array file.
    #[error("array error: {0}")]
    Array(#[from] ArrayError),

    /// Error from the metadata table.
    #[error("metadata error: {0}")]
    Meta(#[from] MetaError),

    /// Error from a row collection or its blob codec.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),

    /// A collection larger than the largest configured partition.
    #[error("collection of {count} rows exceeds the largest partition capacity of {max}")]
    CapacityExceeded {
        /// Rows in the offending collection.
        count: usize,
        /// Largest slot capacity the configuration allows.
        max: usize,
    },

    /// The stored payload schema is not a prefix of the requested one.
    #[error("stored rowdef '{stored}' is not subsumed by requested rowdef '{requested}'")]
    SchemaIncompatible {
        /// Descriptor found in the property file.
        stored: String,
        /// Descriptor supplied to `open`.
        requested: String,
    },

    /// Metadata points at a slot the array file does not have. The
    /// on-disk state is left untouched; recovery is an offline rebuild.
    #[error("array file {file} has no slot {slot} although metadata references it")]
    Corruption {
        /// Array file that was consulted.
        file: String,
        /// Slot the metadata entry referenced.
        slot: u32,
    },

    /// Writes may only target serial 0; other serials are a reserved
    /// migration hook.
    #[error("writing array serial {0} is not supported")]
    SerialUnsupported(u8),

    /// A rejected configuration value.
    #[error("bad configuration: {0}")]
    BadConfig(String),

    /// Operation on a closed index.
    #[error("collection index is closed")]
    Closed,

    /// Internal invariant violation (poisoned lock, impossible state).
    #[error("internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration for a [`CollectionIndex`] instance, passed to
/// [`CollectionIndex::open`].
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Width of collection keys in bytes.
    pub key_width: usize,

    /// Ordering of collection keys (also used for row primary keys).
    pub order: KeyOrder,

    /// Geometric growth ratio between partition capacities. Typically 4.
    pub load_factor: u32,

    /// Number of partitions, i.e. capacity tiers. The largest collection
    /// the index accepts has `load_factor ^ max_partitions` rows.
    pub max_partitions: u8,
}

// ------------------------------------------------------------------------------------------------
// CollectionIndex
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct IndexInner {
    meta: MetaTable,
    arrays: ArrayRegistry,
    sizing: PartitionSizing,
    payload: Arc<RowDef>,
    order: KeyOrder,
    closed: bool,
}

/// Persistent keyed row-collection index.
#[derive(Debug)]
pub struct CollectionIndex {
    inner: Mutex<IndexInner>,
    /// Shared payload schema, readable without the lock.
    payload: Arc<RowDef>,
    min_mem: usize,
}

impl CollectionIndex {
    /// Open (or create) an index in `dir` under the given file stub.
    ///
    /// If the directory has array files but no metadata table, the table
    /// is rebuilt from the array contents before the call returns. An
    /// existing property file whose stored schema is not a prefix of
    /// `payload` fails the open with [`IndexError::SchemaIncompatible`].
    pub fn open(
        dir: impl AsRef<Path>,
        stub: &str,
        payload: RowDef,
        config: IndexConfig,
    ) -> Result<Self, IndexError> {
        let dir = dir.as_ref().to_path_buf();
        Self::validate(&payload, &config)?;
        fs::create_dir_all(&dir)?;

        properties::check_and_update(&dir, stub, config.load_factor, &payload)?;

        let payload = Arc::new(payload);
        let sizing = PartitionSizing::new(config.load_factor, config.max_partitions);
        let index_path = naming::index_file(&dir, stub);
        let needs_bootstrap = !index_path.exists();

        let mut meta = MetaTable::open(&index_path, config.key_width, config.order)?;
        let mut arrays = ArrayRegistry::new(
            dir.clone(),
            stub.to_string(),
            config.load_factor,
            config.key_width,
            sizing,
        );

        if needs_bootstrap {
            bootstrap::rebuild(&dir, stub, config.load_factor, &payload, &mut arrays, &mut meta)?;
        }

        let min_mem = 2 * sizing.max_capacity() * payload.width();
        info!(
            dir = %dir.display(),
            stub,
            entries = meta.size(),
            "opened collection index"
        );

        Ok(Self {
            payload: payload.clone(),
            min_mem,
            inner: Mutex::new(IndexInner {
                meta,
                arrays,
                sizing,
                payload,
                order: config.order,
                closed: false,
            }),
        })
    }

    fn validate(payload: &RowDef, config: &IndexConfig) -> Result<(), IndexError> {
        if config.key_width == 0 {
            return Err(IndexError::BadConfig("key width must be positive".into()));
        }
        if config.load_factor < 2 {
            return Err(IndexError::BadConfig(format!(
                "load factor {} below minimum of 2",
                config.load_factor
            )));
        }
        if config.max_partitions == 0 {
            return Err(IndexError::BadConfig("at least one partition is required".into()));
        }
        if payload.width() > usize::from(u16::MAX) {
            return Err(IndexError::BadConfig(format!(
                "payload row width {} exceeds the blob header limit",
                payload.width()
            )));
        }
        let max_capacity = u128::from(config.load_factor)
            .checked_pow(u32::from(config.max_partitions))
            .unwrap_or(u128::MAX);
        let largest_blob = EXPORT_OVERHEAD as u128 + max_capacity * payload.width() as u128;
        if largest_blob > u128::from(u32::MAX) {
            return Err(IndexError::BadConfig(format!(
                "largest slot blob of {largest_blob} bytes exceeds the array record limit"
            )));
        }
        Ok(())
    }

    /// Lock the index, refusing if it was closed.
    fn guard(&self) -> Result<MutexGuard<'_, IndexInner>, IndexError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| IndexError::Internal("mutex poisoned".into()))?;
        if inner.closed {
            return Err(IndexError::Closed);
        }
        Ok(inner)
    }

    // --------------------------------------------------------------------
    // Collection construction helpers
    // --------------------------------------------------------------------

    /// The payload schema this index stores.
    pub fn payload_rowdef(&self) -> &Arc<RowDef> {
        &self.payload
    }

    /// An empty collection matching this index's payload schema.
    pub fn new_collection(&self) -> RowCollection {
        RowCollection::new(self.payload.clone())
    }

    /// Upper bound on the working-set bytes needed to sort the largest
    /// storable collection.
    pub fn min_mem(&self) -> usize {
        self.min_mem
    }

    // --------------------------------------------------------------------
    // Metadata delegates
    // --------------------------------------------------------------------

    /// Number of keys in the index.
    pub fn size(&self) -> Result<usize, IndexError> {
        Ok(self.guard()?.meta.size())
    }

    /// Whether `key` has a stored collection.
    pub fn has(&self, key: &[u8]) -> Result<bool, IndexError> {
        Ok(self.guard()?.meta.has(key))
    }

    /// Row count of the collection under `key` per metadata, without
    /// loading the collection. Zero when the key is absent.
    pub fn index_size(&self, key: &[u8]) -> Result<usize, IndexError> {
        let inner = self.guard()?;
        Ok(inner
            .meta
            .get(key)?
            .map(|entry| entry.chunk_count as usize)
            .unwrap_or(0))
    }

    /// The raw metadata entry for `key`, if any — partition, slot index,
    /// row count, and day stamps. Intended for diagnostics and for
    /// external eviction policies built on the access stamps.
    pub fn metadata_of(&self, key: &[u8]) -> Result<Option<MetaEntry>, IndexError> {
        Ok(self.guard()?.meta.get(key)?)
    }

    // --------------------------------------------------------------------
    // put
    // --------------------------------------------------------------------

    /// Overwrite the collection stored under `key`.
    ///
    /// An empty `collection` deletes the key (and is a no-op when the key
    /// is absent). Otherwise the collection replaces its old slot in
    /// place while that slot still fits it, or transits to the partition
    /// matching its new size when it has outgrown the slot.
    pub fn put(&self, key: &[u8], collection: &RowCollection) -> Result<(), IndexError> {
        let mut inner = self.guard()?;

        let Some(mut entry) = inner.meta.get(key)? else {
            if collection.is_empty() {
                return Ok(());
            }
            let entry = Self::put_new(&mut inner, key, collection)?;
            inner.meta.add_unique(&entry)?;
            return Ok(());
        };

        if collection.is_empty() {
            // Total delete: slot first, metadata second.
            inner
                .arrays
                .get_or_open(entry.cluster_idx, 0, entry.chunk_size as usize)?
                .remove(entry.index_pos)?;
            inner.meta.remove(key)?;
            return Ok(());
        }

        Self::write_back(&mut inner, key, collection, &mut entry)?;
        inner.meta.put(&entry)?;
        Ok(())
    }

    /// Append a slot for a key the index does not have yet. The caller
    /// writes the returned metadata entry.
    fn put_new(
        inner: &mut IndexInner,
        key: &[u8],
        collection: &RowCollection,
    ) -> Result<MetaEntry, IndexError> {
        let partition = inner.sizing.partition_for(collection.size())?;
        let capacity = inner.sizing.slot_capacity(partition);
        let blob = collection.export(capacity)?;

        let chunk_size = inner.payload.width();
        let array = inner.arrays.get_or_open(partition, 0, chunk_size)?;
        let slot = array.add(key, &blob)?;

        Ok(MetaEntry::new(
            key.to_vec(),
            chunk_size as u32,
            collection.size() as u32,
            partition,
            slot,
            encoding::today(),
        ))
    }

    /// Replace-or-transit an existing collection, updating `entry` in
    /// place. The caller writes the entry back to the metadata table.
    ///
    /// The collection stays in its current slot as long as that slot
    /// still holds it — a shrink never demotes. Transit happens when the
    /// required partition exceeds the current one, or when the entry was
    /// written under a stale chunk size (the migration hook: the next
    /// write rewrites the collection at the current width, in the tier
    /// its size calls for).
    fn write_back(
        inner: &mut IndexInner,
        key: &[u8],
        collection: &RowCollection,
        entry: &mut MetaEntry,
    ) -> Result<(), IndexError> {
        let required = inner.sizing.partition_for(collection.size())?;
        let current_width = inner.payload.width();

        if required <= entry.cluster_idx && entry.chunk_size as usize == current_width {
            // In-place replace: the current slot still fits.
            let capacity = inner.sizing.slot_capacity(entry.cluster_idx);
            let blob = collection.export(capacity)?;
            inner
                .arrays
                .get_or_open(entry.cluster_idx, 0, current_width)?
                .set(entry.index_pos, key, &blob)?;
        } else {
            // Transit: free the old slot, append into the required tier.
            inner
                .arrays
                .get_or_open(entry.cluster_idx, 0, entry.chunk_size as usize)?
                .remove(entry.index_pos)?;

            let capacity = inner.sizing.slot_capacity(required);
            let blob = collection.export(capacity)?;
            let array = inner.arrays.get_or_open(required, 0, current_width)?;
            entry.index_pos = array.add(key, &blob)?;
            entry.cluster_idx = required;
        }

        entry.chunk_size = current_width as u32;
        entry.chunk_count = collection.size() as u32;
        entry.last_wrote = encoding::today();
        Ok(())
    }

    // --------------------------------------------------------------------
    // merge
    // --------------------------------------------------------------------

    /// Union `collection` into whatever is stored under `key`.
    ///
    /// Absent keys take the new-insert path; present keys load the stored
    /// collection, append-union, sort, deduplicate, and write back with
    /// replace-or-transit. Empty input is a no-op.
    pub fn merge(&self, key: &[u8], collection: &RowCollection) -> Result<(), IndexError> {
        if collection.is_empty() {
            return Ok(());
        }
        let mut inner = self.guard()?;

        match inner.meta.get(key)? {
            None => {
                let entry = Self::put_new(&mut inner, key, collection)?;
                inner.meta.add_unique(&entry)?;
            }
            Some(mut entry) => {
                Self::merge_existing(&mut inner, key, collection, &mut entry)?;
                inner.meta.put(&entry)?;
            }
        }
        Ok(())
    }

    /// Merge a batch, amortizing metadata I/O.
    ///
    /// New keys are inserted immediately; merges into existing keys do
    /// all their array work first and commit their metadata entries as
    /// one bulk write at the end. A failure mid-batch leaves every
    /// already-merged slot consistent on the array side; entries not yet
    /// committed are reconstructed by the next metadata rebuild.
    pub fn merge_multiple(
        &self,
        containers: Vec<(Vec<u8>, RowCollection)>,
    ) -> Result<(), IndexError> {
        let mut inner = self.guard()?;

        let (new_items, existing_items) = batch::split(&inner.meta, containers)?;

        for item in new_items {
            let entry = Self::put_new(&mut inner, &item.key, &item.collection)?;
            inner.meta.add_unique(&entry)?;
        }

        let mut buffer: Vec<MetaEntry> = Vec::with_capacity(existing_items.len());
        for item in existing_items {
            let mut entry = item.entry;
            Self::merge_existing(&mut inner, &item.key, &item.collection, &mut entry)?;
            buffer.push(entry);
        }
        inner.meta.put_multiple(buffer, encoding::today())?;
        Ok(())
    }

    fn merge_existing(
        inner: &mut IndexInner,
        key: &[u8],
        incoming: &RowCollection,
        entry: &mut MetaEntry,
    ) -> Result<(), IndexError> {
        let mut stored = Self::read_repair(inner, entry, false)?;
        stored.add_all(incoming)?;
        stored.sort();
        stored.uniq();
        stored.trim();
        Self::write_back(inner, key, &stored, entry)
    }

    // --------------------------------------------------------------------
    // remove
    // --------------------------------------------------------------------

    /// Remove every row whose primary key appears in `remove_keys` from
    /// the collection under `key`; returns how many rows were removed.
    ///
    /// Keys may be raw bytes or textual names — both are interpreted as
    /// the same byte sequence, padded or truncated to the primary-key
    /// width. A collection emptied by the removal is deleted outright.
    pub fn remove<I>(&self, key: &[u8], remove_keys: I) -> Result<usize, IndexError>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let pk_width = self.payload.primary_width();
        let probes: Vec<Vec<u8>> = remove_keys
            .into_iter()
            .map(|k| {
                let mut probe = k.as_ref().to_vec();
                probe.truncate(pk_width);
                probe.resize(pk_width, 0);
                probe
            })
            .collect();
        if probes.is_empty() {
            return Ok(0);
        }

        let mut inner = self.guard()?;
        let Some(mut entry) = inner.meta.get(key)? else {
            return Ok(0);
        };

        let mut stored = Self::read_repair(&mut inner, &mut entry, false)?;
        let mut removed = 0usize;
        for probe in &probes {
            if stored.remove_key(probe).is_some() {
                removed += 1;
            }
        }
        stored.sort();
        stored.trim();

        if stored.is_empty() {
            inner
                .arrays
                .get_or_open(entry.cluster_idx, 0, entry.chunk_size as usize)?
                .remove(entry.index_pos)?;
            inner.meta.remove(key)?;
            return Ok(removed);
        }

        Self::write_back(&mut inner, key, &stored, &mut entry)?;
        inner.meta.put(&entry)?;
        Ok(removed)
    }

    // --------------------------------------------------------------------
    // get / delete
    // --------------------------------------------------------------------

    /// Load the collection stored under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Option<RowCollection>, IndexError> {
        let mut inner = self.guard()?;
        let Some(mut entry) = inner.meta.get(key)? else {
            return Ok(None);
        };
        let collection = Self::read_repair(&mut inner, &mut entry, false)?;
        Ok(Some(collection))
    }

    /// Remove `key` entirely, returning its collection.
    pub fn delete(&self, key: &[u8]) -> Result<Option<RowCollection>, IndexError> {
        let mut inner = self.guard()?;
        let Some(mut entry) = inner.meta.remove(key)? else {
            return Ok(None);
        };
        let collection = Self::read_repair(&mut inner, &mut entry, true)?;
        Ok(Some(collection))
    }

    /// Read used by the key-collection iterator: one metadata lookup and
    /// one repairing slot read under a fresh lock acquisition.
    pub(crate) fn read_one(
        &self,
        key: &[u8],
    ) -> Result<Option<(Vec<u8>, RowCollection)>, IndexError> {
        let mut inner = self.guard()?;
        let Some(mut entry) = inner.meta.get(key)? else {
            return Ok(None);
        };
        let collection = Self::read_repair(&mut inner, &mut entry, false)?;
        Ok(Some((key.to_vec(), collection)))
    }

    /// The common read-and-repair path.
    ///
    /// Reads the slot `entry` points at, heals every inconsistency it can
    /// diagnose locally, and returns the slot's collection. With `delete`
    /// the slot is freed before returning; removing the metadata entry is
    /// then the caller's responsibility.
    fn read_repair(
        inner: &mut IndexInner,
        entry: &mut MetaEntry,
        delete: bool,
    ) -> Result<RowCollection, IndexError> {
        let chunk_size = entry.chunk_size as usize;

        let (record, file) = {
            let array = inner.arrays.get_or_open(entry.cluster_idx, 0, chunk_size)?;
            let file = array.path().display().to_string();
            match array.get(entry.index_pos) {
                Ok(record) => (record, file),
                Err(ArrayError::SlotOutOfRange { slot, .. }) => {
                    return Err(IndexError::Corruption { file, slot });
                }
                Err(e) => return Err(e.into()),
            }
        };

        let order = inner.order;

        // Malformed slot key: the record cannot be attributed to any key.
        // Both the slot and the entry are unrecoverable.
        if !order.wellformed(&record.key) {
            inner
                .arrays
                .get_or_open(entry.cluster_idx, 0, chunk_size)?
                .remove(entry.index_pos)?;
            inner.meta.remove(&entry.key)?;
            error!(
                file = %file,
                slot = entry.index_pos,
                "lost a collection: malformed slot key"
            );
            return Ok(RowCollection::new(inner.payload.clone()));
        }

        // Undecodable blob: same treatment as a malformed key.
        let collection = match RowCollection::from_blob(inner.payload.clone(), &record.payload) {
            Ok(collection) => collection,
            Err(e) => {
                inner
                    .arrays
                    .get_or_open(entry.cluster_idx, 0, chunk_size)?
                    .remove(entry.index_pos)?;
                inner.meta.remove(&entry.key)?;
                error!(
                    file = %file,
                    slot = entry.index_pos,
                    error = %e,
                    "lost a collection: undecodable slot blob"
                );
                return Ok(RowCollection::new(inner.payload.clone()));
            }
        };

        // Wrong key in the slot: the stale entry cannot be fixed. Rebind
        // a fresh entry to the slot under its actual key — this may
        // duplicate an entry elsewhere, which beats losing the slot.
        let mut rebound = false;
        if order.compare(&record.key, &entry.key) != Ordering::Equal
            || !order.wellformed(&entry.key)
        {
            inner.meta.remove(&entry.key)?;
            let fresh = MetaEntry::new(
                record.key.clone(),
                entry.chunk_size,
                collection.size() as u32,
                entry.cluster_idx,
                entry.index_pos,
                encoding::today(),
            );
            inner.meta.put(&fresh)?;
            rebound = true;
            error!(
                file = %file,
                slot = entry.index_pos,
                "slot key does not match metadata entry; entry rebound to the slot's key"
            );
        }

        // Count drift: the blob is the authority.
        if collection.size() as u32 != entry.chunk_count {
            warn!(
                file = %file,
                slot = entry.index_pos,
                metadata = entry.chunk_count,
                blob = collection.size(),
                "chunk count drifted; metadata auto-fixed"
            );
            entry.chunk_count = collection.size() as u32;
            // A rebound entry was already written with the correct count;
            // a deleting caller is about to drop the entry anyway.
            if !delete && !rebound {
                inner.meta.put(entry)?;
            }
        }

        if delete {
            inner
                .arrays
                .get_or_open(entry.cluster_idx, 0, chunk_size)?
                .remove(entry.index_pos)?;
        }

        Ok(collection)
    }

    // --------------------------------------------------------------------
    // Iteration
    // --------------------------------------------------------------------

    /// Iterate `(key, collection)` pairs in metadata key order starting
    /// at `start_key`; with `rotate`, wrap past the largest key and
    /// continue up to (not including) the starting point again.
    pub fn key_collections(
        &self,
        start_key: Option<&[u8]>,
        rotate: bool,
    ) -> Result<KeyCollections<'_>, IndexError> {
        let inner = self.guard()?;
        let keys = inner.meta.snapshot_keys(rotate, start_key);
        Ok(KeyCollections::new(self, keys))
    }

    // --------------------------------------------------------------------
    // Shutdown
    // --------------------------------------------------------------------

    /// Flush and close: metadata table first, then every cached array
    /// file exactly once. Any later operation fails with
    /// [`IndexError::Closed`].
    pub fn close(&self) -> Result<(), IndexError> {
        let mut inner = self.guard()?;
        inner.meta.close()?;
        inner.arrays.close_all()?;
        inner.closed = true;
        info!("collection index closed");
        Ok(())
    }
}
