//! # ShelfDB
//!
//! An embeddable, persistent **keyed-collection index**: a disk-resident
//! map from a fixed-width key to an ordered, deduplicated set of
//! fixed-width payload rows. Built as the storage substrate for a
//! reverse word index (word hash → posting rows), but nothing in the
//! design assumes that domain.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   CollectionIndex                       │
//! │                                                         │
//! │  ┌─────────────┐   ┌─────────────────────────────────┐  │
//! │  │  MetaTable  │   │          ArrayRegistry          │  │
//! │  │ key → entry │   │  ┌─────────┐ ┌─────────┐        │  │
//! │  │  (ordered,  │   │  │ part. 0 │ │ part. 1 │  ...   │  │
//! │  │ persistent) │   │  │ L rows  │ │ L² rows │        │  │
//! │  └─────────────┘   │  │ / slot  │ │ / slot  │        │  │
//! │        ▲           │  └─────────┘ └─────────┘        │  │
//! │        │ bootstrap │        FixedArray files          │  │
//! │        └───────────┴─────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Collections grow and shrink, but array files want fixed-width records
//! — so slots come in capacity tiers (*partitions*), each a power of the
//! load factor. A collection lives in the smallest slot that fits it and
//! *transits* between tiers when its size crosses a boundary.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`index`] | The collection index core — put, merge, remove, get, delete, iterate, bootstrap |
//! | [`metatable`] | Persistent ordered key → metadata-entry table |
//! | [`array`] | Fixed-width record files with free-list slot reuse |
//! | [`collection`] | In-memory row collections and the slot blob codec |
//! | [`rowdef`] | Payload schema descriptors and prefix-compatible evolution |
//! | [`order`] | Key orderings (natural, base64) and well-formedness |
//! | [`encoding`] | Fixed-width big-endian column codec and day timestamps |
//!
//! ## Key Features
//!
//! - **Capacity-tiered storage** — variable-sized collections in
//!   fixed-slot files, promoted and demoted across tiers as they grow
//!   and shrink.
//! - **Crash-ordered writes** — array slots are written before the
//!   metadata that references them; a crash strands reclaimable dead
//!   space, never a dangling pointer.
//! - **Bootstrap recovery** — deleting the metadata table is survivable:
//!   it is rebuilt by scanning the array files.
//! - **Self-healing reads** — stale keys, drifted row counts, and
//!   undecodable slots are repaired (and logged) on the read path.
//! - **CRC-protected blobs** — every stored collection carries a CRC32
//!   over its live rows.
//! - **Prefix-compatible schema evolution** — payload columns may be
//!   appended across reopens, never reshaped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelfdb::index::{CollectionIndex, IndexConfig};
//! use shelfdb::order::KeyOrder;
//! use shelfdb::rowdef::RowDef;
//!
//! let payload = RowDef::parse("doc-10, attrs-80", KeyOrder::Natural).unwrap();
//! let index = CollectionIndex::open(
//!     "/var/lib/myapp/words",
//!     "words",
//!     payload,
//!     IndexConfig {
//!         key_width: 9,
//!         order: KeyOrder::Natural,
//!         load_factor: 4,
//!         max_partitions: 8,
//!     },
//! )
//! .unwrap();
//!
//! // Store a collection of rows under a key.
//! let mut posting = index.new_collection();
//! let mut row = vec![0u8; 90];
//! row[..3].copy_from_slice(b"doc");
//! posting.add(&row).unwrap();
//! index.put(b"erstes   ", &posting).unwrap();
//!
//! // Union more rows in later.
//! index.merge(b"erstes   ", &posting).unwrap();
//!
//! // Read back.
//! let stored = index.get(b"erstes   ").unwrap().unwrap();
//! assert_eq!(stored.size(), 1);
//!
//! index.close().unwrap();
//! ```

pub mod array;
pub mod collection;
pub mod encoding;
pub mod index;
pub mod metatable;
pub mod order;
pub mod rowdef;

pub use collection::RowCollection;
pub use index::{CollectionIndex, IndexConfig, IndexError, KeyCollections};
pub use order::KeyOrder;
pub use rowdef::RowDef;
