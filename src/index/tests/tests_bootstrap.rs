//! Metadata rebuild from array files: full reconstruction after the
//! table is lost, idempotency, and foreign-file tolerance.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use crate::index::tests::helpers::*;
    use tempfile::TempDir;

    /// Build the 17-key ladder, close, and return (key → row count).
    fn populate_ladder(dir: &std::path::Path) -> BTreeMap<Vec<u8>, usize> {
        let index = open_index(dir);
        let mut expected = BTreeMap::new();
        for i in 1..=17usize {
            let k = key(&format!("key-{i}"));
            index.put(&k, &collection(&index, "r", i)).unwrap();
            expected.insert(k, i);
        }
        index.close().unwrap();
        expected
    }

    /// # Scenario
    /// Populate an index, delete its metadata table file, reopen.
    ///
    /// # Expected behavior
    /// Bootstrap rebuilds every entry from the array files: all keys are
    /// back with their original row counts and a partition that covers
    /// them, and every collection reads back intact.
    #[test]
    fn deleted_metadata_table_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        let expected = populate_ladder(temp.path());

        fs::remove_file(temp.path().join("words.index")).unwrap();

        let index = open_index(temp.path());
        assert_eq!(index.size().unwrap(), expected.len());

        for (k, count) in &expected {
            let entry = index.metadata_of(k).unwrap().unwrap();
            assert_eq!(entry.chunk_count as usize, *count);
            let capacity = 4usize.pow(u32::from(entry.cluster_idx) + 1);
            assert!(capacity >= *count);

            let got = index.get(k).unwrap().unwrap();
            assert_eq!(got.size(), *count);
        }
    }

    /// Rebuilding twice from the same array files yields identical
    /// entries, timestamps aside.
    #[test]
    fn rebuild_is_idempotent() {
        let temp = TempDir::new().unwrap();
        populate_ladder(temp.path());

        let snapshot = |dir: &std::path::Path| -> BTreeMap<Vec<u8>, (u32, u8, u32)> {
            fs::remove_file(dir.join("words.index")).unwrap();
            let index = open_index(dir);
            let mut snap = BTreeMap::new();
            for item in index.key_collections(None, false).unwrap() {
                let (k, _) = item.unwrap();
                let e = index.metadata_of(&k).unwrap().unwrap();
                snap.insert(k, (e.chunk_count, e.cluster_idx, e.index_pos));
            }
            index.close().unwrap();
            snap
        };

        let first = snapshot(temp.path());
        let second = snapshot(temp.path());
        assert_eq!(first, second);
    }

    /// Files that do not match the exact array-file name shape are left
    /// alone by the rebuild.
    #[test]
    fn foreign_files_are_ignored() {
        let temp = TempDir::new().unwrap();
        let expected = populate_ladder(temp.path());

        // Decoys: wrong suffix, wrong stub, lowercase hex, stray noise.
        for name in [
            "words.04.005A.00.00.sst",
            "other.04.005A.00.00.kca",
            "words.04.005a.00.00.kca",
            "notes.txt",
        ] {
            fs::write(temp.path().join(name), b"not an array file").unwrap();
        }

        fs::remove_file(temp.path().join("words.index")).unwrap();
        let index = open_index(temp.path());

        assert_eq!(index.size().unwrap(), expected.len());
        index.close().unwrap();

        // Decoys untouched.
        assert_eq!(
            fs::read(temp.path().join("other.04.005A.00.00.kca")).unwrap(),
            b"not an array file"
        );
    }

    /// An orphan slot — written but never indexed, as a crash between
    /// array write and metadata write leaves behind — is adopted by the
    /// next rebuild.
    #[test]
    fn orphan_slots_are_adopted() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 2)).unwrap();
            index.close().unwrap();
        }

        // Simulate the crash aftermath: a slot exists, its entry does not.
        {
            use crate::array::FixedArray;
            use crate::collection::{EXPORT_OVERHEAD, RowCollection};
            use std::sync::Arc;

            let mut array = FixedArray::open(
                temp.path().join("words.04.005A.00.00.kca"),
                KEY_WIDTH,
                EXPORT_OVERHEAD + 4 * ROW_WIDTH,
            )
            .unwrap();
            let mut orphan = RowCollection::new(Arc::new(payload()));
            orphan.add(&row("x0", 1)).unwrap();
            let blob = orphan.export(4).unwrap();
            array.add(&key("orphan"), &blob).unwrap();
            array.close().unwrap();
        }

        fs::remove_file(temp.path().join("words.index")).unwrap();
        let index = open_index(temp.path());

        assert_eq!(index.size().unwrap(), 2);
        assert_eq!(index.index_size(&key("orphan")).unwrap(), 1);
    }

    /// A fresh directory bootstraps to an empty index without complaint.
    #[test]
    fn fresh_directory_opens_empty() {
        let temp = TempDir::new().unwrap();
        let index = open_index(temp.path());
        assert_eq!(index.size().unwrap(), 0);
    }
}
