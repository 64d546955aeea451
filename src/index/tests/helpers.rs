use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::collection::RowCollection;
use crate::index::{CollectionIndex, IndexConfig};
use crate::order::KeyOrder;
use crate::rowdef::RowDef;

/// Key width used throughout the index tests.
pub const KEY_WIDTH: usize = 9;

/// Payload row width of the `a-10, b-80` test schema.
pub const ROW_WIDTH: usize = 90;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times — only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The standard test configuration: load factor 4, 9-byte keys, natural
/// order, partitions 0..8.
pub fn default_config() -> IndexConfig {
    init_tracing();
    IndexConfig {
        key_width: KEY_WIDTH,
        order: KeyOrder::Natural,
        load_factor: 4,
        max_partitions: 8,
    }
}

/// The standard `a-10, b-80` payload schema.
pub fn payload() -> RowDef {
    RowDef::parse("a-10, b-80", KeyOrder::Natural).unwrap()
}

/// Open an index under the `words` stub with the standard configuration.
pub fn open_index(dir: &Path) -> CollectionIndex {
    CollectionIndex::open(dir, "words", payload(), default_config()).unwrap()
}

/// A 9-byte key, space-padded like a fixed-width word hash.
pub fn key(s: &str) -> Vec<u8> {
    let mut k = vec![b' '; KEY_WIDTH];
    k[..s.len()].copy_from_slice(s.as_bytes());
    k
}

/// A 90-byte payload row whose primary column starts with `pk` and whose
/// second column is filled with `fill`.
pub fn row(pk: &str, fill: u8) -> Vec<u8> {
    let mut r = vec![0u8; ROW_WIDTH];
    r[..pk.len()].copy_from_slice(pk.as_bytes());
    r[10..].fill(fill);
    r
}

/// A collection of `n` rows with primary keys `<prefix>0 .. <prefix>n-1`.
pub fn collection(index: &CollectionIndex, prefix: &str, n: usize) -> RowCollection {
    let mut c = index.new_collection();
    for i in 0..n {
        c.add(&row(&format!("{prefix}{i}"), 0xAB)).unwrap();
    }
    c
}

/// Primary keys of a collection's rows, as trimmed strings.
pub fn primary_keys(c: &RowCollection) -> Vec<String> {
    c.rows()
        .map(|r| {
            String::from_utf8_lossy(&r[..10])
                .trim_end_matches('\0')
                .to_string()
        })
        .collect()
}
