//! Property-file behavior: schema compatibility gate and rewrite rules.

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::index::tests::helpers::*;
    use crate::index::{CollectionIndex, IndexError};
    use crate::order::KeyOrder;
    use crate::rowdef::RowDef;
    use tempfile::TempDir;

    fn property_path(dir: &std::path::Path) -> std::path::PathBuf {
        dir.join("words.04.005A.properties")
    }

    // ----------------------------------------------------------------
    // Compatibility gate
    // ----------------------------------------------------------------

    /// Reopening with the identical schema succeeds and keeps the file.
    #[test]
    fn reopen_with_same_schema_succeeds() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 2)).unwrap();
            index.close().unwrap();
        }

        let index = open_index(temp.path());
        assert_eq!(index.index_size(&key("k1")).unwrap(), 2);

        let text = fs::read_to_string(property_path(temp.path())).unwrap();
        assert!(text.contains("rowdef = a-10, b-80"));
    }

    /// # Scenario
    /// Reopen with a schema of the same total width whose columns were
    /// renamed — not a prefix extension of the stored one.
    ///
    /// # Expected behavior
    /// The open is refused with `SchemaIncompatible`.
    #[test]
    fn incompatible_schema_refuses_open() {
        let temp = TempDir::new().unwrap();
        {
            open_index(temp.path()).close().unwrap();
        }

        let renamed = RowDef::parse("x-10, b-80", KeyOrder::Natural).unwrap();
        let err =
            CollectionIndex::open(temp.path(), "words", renamed, default_config()).unwrap_err();
        assert!(matches!(err, IndexError::SchemaIncompatible { .. }));

        let reordered = RowDef::parse("b-80, a-10", KeyOrder::Natural).unwrap();
        assert!(matches!(
            CollectionIndex::open(temp.path(), "words", reordered, default_config()).unwrap_err(),
            IndexError::SchemaIncompatible { .. }
        ));
    }

    /// An unparseable stored descriptor is as incompatible as a wrong one.
    #[test]
    fn garbage_stored_rowdef_refuses_open() {
        let temp = TempDir::new().unwrap();
        {
            open_index(temp.path()).close().unwrap();
        }
        fs::write(
            property_path(temp.path()),
            "# collection index properties\nrowdef = ???\n",
        )
        .unwrap();

        assert!(matches!(
            CollectionIndex::open(temp.path(), "words", payload(), default_config()).unwrap_err(),
            IndexError::SchemaIncompatible { .. }
        ));
    }

    /// Appending a column changes the chunk size, so the grown schema
    /// gets its own property file; old data remains readable through the
    /// prefix-compatible blob decode.
    #[test]
    fn appended_column_opens_and_reads_old_rows() {
        let temp = TempDir::new().unwrap();
        {
            let index = open_index(temp.path());
            index.put(&key("k1"), &collection(&index, "a", 3)).unwrap();
            index.close().unwrap();
        }

        let grown = RowDef::parse("a-10, b-80, c-4", KeyOrder::Natural).unwrap();
        let index =
            CollectionIndex::open(temp.path(), "words", grown, default_config()).unwrap();

        let got = index.get(&key("k1")).unwrap().unwrap();
        assert_eq!(got.size(), 3);
        for r in got.rows() {
            assert_eq!(r.len(), 94);
            assert!(r[90..].iter().all(|&b| b == 0));
        }
        // The 94-byte schema wrote its own property file.
        assert!(temp.path().join("words.04.005E.properties").exists());
    }

    // ----------------------------------------------------------------
    // Rewrite rules
    // ----------------------------------------------------------------

    /// Keys other than `rowdef` survive the rewrite on open.
    #[test]
    fn unknown_property_keys_are_preserved() {
        let temp = TempDir::new().unwrap();
        {
            open_index(temp.path()).close().unwrap();
        }

        let mut text = fs::read_to_string(property_path(temp.path())).unwrap();
        text.push_str("owner = indexer-7\n");
        fs::write(property_path(temp.path()), text).unwrap();

        open_index(temp.path()).close().unwrap();

        let text = fs::read_to_string(property_path(temp.path())).unwrap();
        assert!(text.contains("owner = indexer-7"));
        assert!(text.contains("rowdef = a-10, b-80"));
    }
}
