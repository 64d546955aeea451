//! The property file: persisted schema descriptor and compatibility gate.
//!
//! `<stub>.<LF>.<CS>.properties` is a plain `key = value` text file whose
//! `rowdef` entry records the payload schema the array files were written
//! under. Opening an index checks that the stored descriptor is subsumed
//! by the requested one (columns may only be appended, never renamed,
//! reordered, or resized) and refuses the open otherwise — reinterpreting
//! existing rows under an incompatible layout would corrupt every
//! collection silently.
//!
//! After a successful check the file is rewritten with the current
//! descriptor. Keys other than `rowdef` are preserved verbatim.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use super::{IndexError, naming};
use crate::rowdef::RowDef;

const ROWDEF_KEY: &str = "rowdef";

/// Check the stored schema descriptor against `payload` and rewrite the
/// property file with the current one.
pub(crate) fn check_and_update(
    dir: &Path,
    stub: &str,
    load_factor: u32,
    payload: &RowDef,
) -> Result<(), IndexError> {
    let path = naming::property_file(dir, stub, load_factor, payload.width());

    let mut props: BTreeMap<String, String> = BTreeMap::new();
    if path.exists() {
        let text = fs::read_to_string(&path)?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                props.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        if let Some(stored) = props.get(ROWDEF_KEY) {
            let compatible = RowDef::parse(stored, payload.order())
                .is_ok_and(|stored_def| payload.subsumes(&stored_def));
            if !compatible {
                return Err(IndexError::SchemaIncompatible {
                    stored: stored.clone(),
                    requested: payload.descriptor(),
                });
            }
            if stored != &payload.descriptor() {
                info!(
                    stored = %stored,
                    requested = %payload.descriptor(),
                    "payload schema extended"
                );
            }
        }
    }

    props.insert(ROWDEF_KEY.to_string(), payload.descriptor());

    // Write-then-rename so a crash never leaves a half-written file.
    let tmp = path.with_extension("properties.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        writeln!(file, "# collection index properties")?;
        for (key, value) in &props {
            writeln!(file, "{key} = {value}")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, &path)?;
    Ok(())
}
