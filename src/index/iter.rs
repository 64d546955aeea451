//! Lazy iteration over `(key, collection)` pairs in metadata key order.

use crate::collection::RowCollection;

use super::{CollectionIndex, IndexError};

/// Iterator returned by [`CollectionIndex::key_collections`].
///
/// The key sequence is snapshotted when the iterator is created; every
/// `next` performs one metadata read plus one read-and-repair, so each
/// yielded collection reflects the state at the time it is visited. Keys
/// deleted since the snapshot are skipped. Mutating a key *while* it is
/// being iterated past is undefined behavior for the iteration order.
#[derive(Debug)]
pub struct KeyCollections<'a> {
    index: &'a CollectionIndex,
    keys: std::vec::IntoIter<Vec<u8>>,
}

impl<'a> KeyCollections<'a> {
    pub(crate) fn new(index: &'a CollectionIndex, keys: Vec<Vec<u8>>) -> Self {
        Self {
            index,
            keys: keys.into_iter(),
        }
    }
}

impl Iterator for KeyCollections<'_> {
    type Item = Result<(Vec<u8>, RowCollection), IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            match self.index.read_one(&key) {
                Ok(Some(pair)) => return Some(Ok(pair)),
                Ok(None) => continue, // deleted since the snapshot
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
