//! Metadata reconstruction from array files.
//!
//! When an index directory has array files but no `<stub>.index`, the
//! metadata table is rebuilt from scratch: every array file whose name
//! matches the current stub and load factor is scanned slot by slot, and
//! each live record becomes a fresh metadata entry whose chunk count is
//! read out of the slot blob itself.
//!
//! The rebuild is idempotent up to timestamps — the same on-disk state
//! always reconstructs the same entries, stamped with the day the rebuild
//! ran. Files are visited in sorted name order, so when the same key
//! appears in several serials of one tier the highest serial wins the
//! final upsert.
//!
//! Slots whose blob fails to decode (bad checksum, foreign header) are
//! skipped with a warning; they become dead space reclaimable only by an
//! offline rebuild of the array file.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::collection::RowCollection;
use crate::encoding;
use crate::metatable::{MetaEntry, MetaTable};
use crate::rowdef::RowDef;

use super::{IndexError, naming, registry::ArrayRegistry};

/// Entries buffered between bulk metadata writes.
const FLUSH_BATCH: usize = 1024;

/// Wall-clock spacing of progress reports.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Rebuild the metadata table from every matching array file in `dir`.
pub(crate) fn rebuild(
    dir: &Path,
    stub: &str,
    load_factor: u32,
    payload: &Arc<RowDef>,
    registry: &mut ArrayRegistry,
    meta: &mut MetaTable,
) -> Result<(), IndexError> {
    let mut files: Vec<(String, naming::ArrayFileName)> = Vec::new();
    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let Ok(name) = dir_entry.file_name().into_string() else {
            continue;
        };
        if let Some(parsed) = naming::parse_array_file(stub, load_factor, &name) {
            files.push((name, parsed));
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    info!(stub, files = files.len(), "rebuilding metadata index from array files");
    let today = encoding::today();
    let mut total_entries: u64 = 0;

    for (name, parsed) in files {
        if !registry.valid_partition(parsed.partition) {
            warn!(
                file = %name,
                partition = parsed.partition,
                "skipping array file of a partition beyond the configured maximum"
            );
            continue;
        }
        let array = &*registry.open_for_bootstrap(parsed.partition, parsed.serial, parsed.chunk_size)?;
        let live_slots = u64::from(array.used());

        let started = Instant::now();
        let mut last_report = started;
        let mut batch: Vec<MetaEntry> = Vec::new();
        let mut count: u64 = 0;

        for item in array.content_rows() {
            let (slot, record) = item?;
            let collection = match RowCollection::from_blob(payload.clone(), &record.payload) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %name, slot, error = %e, "skipping undecodable slot");
                    continue;
                }
            };

            batch.push(MetaEntry::new(
                record.key,
                parsed.chunk_size as u32,
                collection.size() as u32,
                parsed.partition,
                slot,
                today,
            ));
            count += 1;

            if batch.len() >= FLUSH_BATCH {
                meta.put_multiple(std::mem::take(&mut batch), today)?;
            }

            if last_report.elapsed() >= PROGRESS_INTERVAL {
                let elapsed = started.elapsed().as_secs().max(1);
                let eta_min = elapsed * live_slots.saturating_sub(count) / count / 60;
                info!(
                    file = %name,
                    entries = count,
                    eta_minutes = eta_min,
                    "metadata rebuild in progress"
                );
                last_report = Instant::now();
            }
        }

        meta.put_multiple(batch, today)?;
        total_entries += count;
    }

    info!(entries = total_entries, "metadata rebuild complete");
    Ok(())
}
