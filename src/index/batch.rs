//! Batch classification for bulk merges.
//!
//! A merge batch mixes keys the index has never seen with keys that
//! already own a slot. The two kinds take different write paths — new
//! inserts commit their metadata immediately, existing merges buffer
//! their mutated entries for one bulk metadata write — so the batch is
//! split by a single classification pass before any array I/O happens.

use crate::collection::RowCollection;
use crate::metatable::{MetaEntry, MetaTable};

use super::IndexError;

/// A batch element routed to the new-insert path.
pub(crate) struct NewItem {
    pub key: Vec<u8>,
    pub collection: RowCollection,
}

/// A batch element routed to the merge-existing path, carrying the
/// metadata entry found by the classification lookup.
pub(crate) struct ExistingItem {
    pub key: Vec<u8>,
    pub collection: RowCollection,
    pub entry: MetaEntry,
}

/// One classified batch element.
pub(crate) enum MergeItem {
    New(NewItem),
    Existing(ExistingItem),
}

/// Classify every `(key, collection)` pair with one metadata lookup each.
///
/// Empty collections are dropped — merging nothing is a no-op.
pub(crate) fn split(
    meta: &MetaTable,
    batch: Vec<(Vec<u8>, RowCollection)>,
) -> Result<(Vec<NewItem>, Vec<ExistingItem>), IndexError> {
    let mut new_items = Vec::new();
    let mut existing_items = Vec::new();
    for (key, collection) in batch {
        if collection.is_empty() {
            continue;
        }
        let item = match meta.get(&key)? {
            None => MergeItem::New(NewItem { key, collection }),
            Some(entry) => MergeItem::Existing(ExistingItem {
                key,
                collection,
                entry,
            }),
        };
        match item {
            MergeItem::New(item) => new_items.push(item),
            MergeItem::Existing(item) => existing_items.push(item),
        }
    }
    Ok((new_items, existing_items))
}
