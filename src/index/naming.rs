//! File naming for array and property files.
//!
//! Array files are named `<stub>.<LF>.<CS>.<PN>.<SN>.kca` — load factor,
//! chunk size, partition number, and serial number as zero-padded
//! uppercase hex of widths 2, 4, 2, and 2. Property files are
//! `<stub>.<LF>.<CS>.properties`. Parsing accepts exactly this shape and
//! nothing else, so foreign files sharing the directory are ignored.
//!
//! The serial number lets an old and a new array coexist for the same
//! (partition, chunk size) during a future migration; current writes
//! always use serial 0, but bootstrap reads any serial it finds.

use std::path::{Path, PathBuf};

/// Suffix of array files.
pub(crate) const ARRAY_SUFFIX: &str = "kca";

/// Path of the array file for the given parameters.
pub(crate) fn array_file(
    dir: &Path,
    stub: &str,
    load_factor: u32,
    chunk_size: usize,
    partition: u8,
    serial: u8,
) -> PathBuf {
    dir.join(format!(
        "{stub}.{load_factor:02X}.{chunk_size:04X}.{partition:02X}.{serial:02X}.{ARRAY_SUFFIX}"
    ))
}

/// Path of the property file for the given stub, load factor, and chunk size.
pub(crate) fn property_file(dir: &Path, stub: &str, load_factor: u32, chunk_size: usize) -> PathBuf {
    dir.join(format!("{stub}.{load_factor:02X}.{chunk_size:04X}.properties"))
}

/// Path of the metadata table file.
pub(crate) fn index_file(dir: &Path, stub: &str) -> PathBuf {
    dir.join(format!("{stub}.index"))
}

/// Fields parsed from an array file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArrayFileName {
    pub chunk_size: usize,
    pub partition: u8,
    pub serial: u8,
}

/// Parse `name` as an array file of this stub and load factor.
///
/// Returns `None` for anything that deviates from the exact shape —
/// wrong stub, wrong load factor, lowercase hex, wrong field widths, or
/// a different suffix.
pub(crate) fn parse_array_file(stub: &str, load_factor: u32, name: &str) -> Option<ArrayFileName> {
    let rest = name.strip_prefix(stub)?.strip_prefix('.')?;
    let mut fields = rest.split('.');
    let lf = hex_field(fields.next()?, 2)?;
    let cs = hex_field(fields.next()?, 4)?;
    let pn = hex_field(fields.next()?, 2)?;
    let sn = hex_field(fields.next()?, 2)?;
    if fields.next() != Some(ARRAY_SUFFIX) || fields.next().is_some() {
        return None;
    }
    if lf != u64::from(load_factor) {
        return None;
    }
    Some(ArrayFileName {
        chunk_size: cs as usize,
        partition: u8::try_from(pn).ok()?,
        serial: u8::try_from(sn).ok()?,
    })
}

/// Parse a zero-padded uppercase hex field of exactly `width` digits.
fn hex_field(s: &str, width: usize) -> Option<u64> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
        return None;
    }
    u64::from_str_radix(s, 16).ok()
}

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------
