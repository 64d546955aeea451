//! Set-operation tests for `RowCollection`: add, union, sort, dedup, and
//! primary-key removal under both key orders.

#[cfg(test)]
mod tests {
    use crate::collection::RowCollection;
    use crate::order::KeyOrder;
    use crate::rowdef::RowDef;
    use std::sync::Arc;

    fn rowdef() -> Arc<RowDef> {
        Arc::new(RowDef::parse("a-4, b-6", KeyOrder::Natural).unwrap())
    }

    /// Build a 10-byte row with primary key `key` and a `b` column filled
    /// with `fill`.
    fn row(key: &str, fill: u8) -> Vec<u8> {
        let mut r = vec![0u8; 10];
        r[..key.len()].copy_from_slice(key.as_bytes());
        r[4..].fill(fill);
        r
    }

    fn keys_of(c: &RowCollection) -> Vec<String> {
        c.rows()
            .map(|r| String::from_utf8_lossy(&r[..4]).trim_end_matches('\0').to_string())
            .collect()
    }

    // ----------------------------------------------------------------
    // Basic add / size
    // ----------------------------------------------------------------

    #[test]
    fn add_counts_rows_and_checks_width() {
        let mut c = RowCollection::new(rowdef());
        assert!(c.is_empty());

        c.add(&row("bbb", 1)).unwrap();
        c.add(&row("aaa", 2)).unwrap();
        assert_eq!(c.size(), 2);

        assert!(c.add(&[0u8; 9]).is_err());
        assert_eq!(c.size(), 2);
    }

    // ----------------------------------------------------------------
    // Sort + uniq
    // ----------------------------------------------------------------

    #[test]
    fn sort_orders_by_primary_key() {
        let mut c = RowCollection::new(rowdef());
        for k in ["ccc", "aaa", "bbb"] {
            c.add(&row(k, 0)).unwrap();
        }
        c.sort();
        assert_eq!(keys_of(&c), ["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn uniq_keeps_first_occurrence() {
        let mut c = RowCollection::new(rowdef());
        c.add(&row("aaa", 1)).unwrap();
        c.add(&row("bbb", 2)).unwrap();
        c.add(&row("aaa", 3)).unwrap();
        c.sort();
        c.uniq();

        assert_eq!(c.size(), 2);
        // Stable sort keeps the fill=1 version of "aaa".
        assert_eq!(c.row(0)[4], 1);
    }

    #[test]
    fn add_all_then_sort_uniq_is_set_union() {
        let mut old = RowCollection::new(rowdef());
        for k in ["aaa", "bbb", "ccc"] {
            old.add(&row(k, 1)).unwrap();
        }
        let mut incoming = RowCollection::new(rowdef());
        for k in ["bbb", "ddd"] {
            incoming.add(&row(k, 9)).unwrap();
        }

        old.add_all(&incoming).unwrap();
        old.sort();
        old.uniq();
        old.trim();

        assert_eq!(keys_of(&old), ["aaa", "bbb", "ccc", "ddd"]);
        // The stored row wins over the merged-in duplicate.
        assert_eq!(old.row(1)[4], 1);
    }

    // ----------------------------------------------------------------
    // Primary-key removal
    // ----------------------------------------------------------------

    #[test]
    fn remove_key_returns_the_row() {
        let mut c = RowCollection::new(rowdef());
        for k in ["aaa", "bbb", "ccc"] {
            c.add(&row(k, 7)).unwrap();
        }
        c.sort();

        let removed = c.remove_key(&row("bbb", 0)[..4]).unwrap();
        assert_eq!(&removed[..3], b"bbb");
        assert_eq!(c.size(), 2);
        assert!(!c.contains_key(&row("bbb", 0)[..4]));
        assert!(c.remove_key(&row("zzz", 0)[..4]).is_none());
    }

    #[test]
    fn remove_key_works_unsorted_too() {
        let mut c = RowCollection::new(rowdef());
        c.add(&row("ccc", 0)).unwrap();
        c.add(&row("aaa", 0)).unwrap();

        assert!(c.remove_key(&row("aaa", 0)[..4]).is_some());
        assert_eq!(c.size(), 1);
    }

    // ----------------------------------------------------------------
    // Base64 ordering
    // ----------------------------------------------------------------

    #[test]
    fn base64_order_sorts_by_alphabet_rank() {
        let def = Arc::new(RowDef::parse("a-1, b-1", KeyOrder::Base64).unwrap());
        let mut c = RowCollection::new(def);
        for k in [b"a0", b"_0", b"00"] {
            c.add(k).unwrap();
        }
        c.sort();
        let keys: Vec<u8> = c.rows().map(|r| r[0]).collect();
        // '0' < 'a' < '_' in base64 rank order.
        assert_eq!(keys, vec![b'0', b'a', b'_']);
    }
}
