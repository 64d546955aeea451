//! Read-path self-healing: count drift, stale slot keys, malformed
//! keys, undecodable blobs, and hard corruption.
//!
//! Each test manufactures an inconsistency by reopening the on-disk
//! files through the lower layers while the index is closed, then
//! verifies the repair the next read performs.

#[cfg(test)]
mod tests {
    use crate::array::FixedArray;
    use crate::collection::EXPORT_OVERHEAD;
    use crate::index::tests::helpers::*;
    use crate::index::{CollectionIndex, IndexConfig, IndexError};
    use crate::metatable::MetaTable;
    use crate::order::KeyOrder;
    use crate::rowdef::RowDef;
    use tempfile::TempDir;

    /// Open the partition-0 array file of the standard test index.
    fn open_partition0(dir: &std::path::Path) -> FixedArray {
        FixedArray::open(
            dir.join("words.04.005A.00.00.kca"),
            KEY_WIDTH,
            EXPORT_OVERHEAD + 4 * ROW_WIDTH,
        )
        .unwrap()
    }

    fn open_meta(dir: &std::path::Path) -> MetaTable {
        MetaTable::open(dir.join("words.index"), KEY_WIDTH, KeyOrder::Natural).unwrap()
    }

    // ----------------------------------------------------------------
    // Count drift
    // ----------------------------------------------------------------

    /// # Scenario
    /// The metadata row count disagrees with the blob's live count.
    ///
    /// # Expected behavior
    /// The blob wins: `get` returns the blob's rows and rewrites the
    /// metadata count. Nothing is raised.
    #[test]
    fn count_drift_is_healed_from_blob() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 3)).unwrap();
            index.close().unwrap();
        }

        // Corrupt the count in the metadata entry.
        {
            let mut meta = open_meta(temp.path());
            let mut entry = meta.get(&key("k1")).unwrap().unwrap();
            entry.chunk_count = 99;
            meta.put(&entry).unwrap();
            meta.close().unwrap();
        }

        let index = open_index(temp.path());
        assert_eq!(index.index_size(&key("k1")).unwrap(), 99);

        let got = index.get(&key("k1")).unwrap().unwrap();
        assert_eq!(got.size(), 3);
        // Metadata was auto-fixed.
        assert_eq!(index.index_size(&key("k1")).unwrap(), 3);
    }

    // ----------------------------------------------------------------
    // Stale slot key
    // ----------------------------------------------------------------

    /// # Scenario
    /// The slot holds a well-formed key that differs from the metadata
    /// entry pointing at it.
    ///
    /// # Expected behavior
    /// The stale entry is erased and a fresh entry is bound to the
    /// slot's actual key. The slot's collection is returned.
    #[test]
    fn stale_slot_key_rebinds_entry() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 2)).unwrap();
            index.close().unwrap();
        }

        // Rewrite the slot under a different key.
        {
            let mut array = open_partition0(temp.path());
            let record = array.get(0).unwrap();
            array.set(0, &key("other"), &record.payload).unwrap();
            array.close().unwrap();
        }

        let index = open_index(temp.path());
        let got = index.get(&key("k1")).unwrap().unwrap();
        assert_eq!(got.size(), 2);

        // The entry now lives under the slot's actual key.
        assert!(!index.has(&key("k1")).unwrap());
        let rebound = index.metadata_of(&key("other")).unwrap().unwrap();
        assert_eq!(rebound.index_pos, 0);
        assert_eq!(rebound.chunk_count, 2);

        // And reads through the rebound entry are clean.
        assert_eq!(index.get(&key("other")).unwrap().unwrap().size(), 2);
    }

    // ----------------------------------------------------------------
    // Malformed slot key
    // ----------------------------------------------------------------

    /// # Scenario
    /// Under base64 key order, the slot key is overwritten with bytes
    /// outside the alphabet.
    ///
    /// # Expected behavior
    /// The collection is unrecoverable: slot and metadata entry are
    /// erased and an empty collection is returned.
    #[test]
    fn malformed_slot_key_erases_slot_and_entry() {
        let temp = TempDir::new().unwrap();
        let config = IndexConfig {
            key_width: 4,
            order: KeyOrder::Base64,
            load_factor: 4,
            max_partitions: 8,
        };
        let payload = RowDef::parse("a-4, b-4", KeyOrder::Base64).unwrap();

        {
            let index =
                CollectionIndex::open(temp.path(), "hashes", payload.clone(), config.clone())
                    .unwrap();
            let mut c = index.new_collection();
            c.add(b"AAAAXXXX").unwrap();
            index.put(b"Key0", &c).unwrap();
            index.close().unwrap();
        }

        // 4-byte keys, 8-byte rows: partition 0 slots hold 4 rows.
        {
            let mut array = FixedArray::open(
                temp.path().join("hashes.04.0008.00.00.kca"),
                4,
                EXPORT_OVERHEAD + 4 * 8,
            )
            .unwrap();
            let record = array.get(0).unwrap();
            array.set(0, b"!!!!", &record.payload).unwrap();
            array.close().unwrap();
        }

        let index = CollectionIndex::open(temp.path(), "hashes", payload, config).unwrap();
        let got = index.get(b"Key0").unwrap().unwrap();
        assert!(got.is_empty());

        assert!(!index.has(b"Key0").unwrap());
        assert_eq!(index.size().unwrap(), 0);
    }

    // ----------------------------------------------------------------
    // Undecodable blob
    // ----------------------------------------------------------------

    /// A blob whose checksum no longer matches is treated as lost:
    /// slot and entry are erased, an empty collection comes back.
    #[test]
    fn corrupt_blob_erases_slot_and_entry() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 2)).unwrap();
            index.close().unwrap();
        }

        {
            let mut array = open_partition0(temp.path());
            let record = array.get(0).unwrap();
            let mut payload = record.payload;
            payload[EXPORT_OVERHEAD + 3] ^= 0xFF; // flip a byte inside row 0
            array.set(0, &record.key, &payload).unwrap();
            array.close().unwrap();
        }

        let index = open_index(temp.path());
        let got = index.get(&key("k1")).unwrap().unwrap();
        assert!(got.is_empty());
        assert!(!index.has(&key("k1")).unwrap());
    }

    // ----------------------------------------------------------------
    // Hard corruption
    // ----------------------------------------------------------------

    /// # Scenario
    /// Metadata references a slot beyond the array file's end.
    ///
    /// # Expected behavior
    /// `get` surfaces `Corruption` and leaves the on-disk state alone.
    #[test]
    fn missing_slot_raises_corruption() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 2)).unwrap();
            index.close().unwrap();
        }

        {
            let mut meta = open_meta(temp.path());
            let mut entry = meta.get(&key("k1")).unwrap().unwrap();
            entry.index_pos = 99;
            meta.put(&entry).unwrap();
            meta.close().unwrap();
        }

        let index = open_index(temp.path());
        let err = index.get(&key("k1")).unwrap_err();
        assert!(matches!(err, IndexError::Corruption { slot: 99, .. }));

        // The entry is still there — recovery is an offline concern.
        assert!(index.has(&key("k1")).unwrap());
    }
}
