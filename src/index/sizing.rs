//! Partition sizing: mapping collection sizes to capacity tiers.
//!
//! Partition `n` stores collections in slots of exactly `L^(n+1)` rows,
//! where `L` is the load factor. A collection of `c` rows belongs to the
//! smallest partition whose capacity holds it, so partition 0 covers
//! sizes `1..=L`, partition 1 covers `L+1..=L^2`, and so on. The number
//! of partitions is capped; a collection that would need a partition
//! beyond the cap is rejected rather than stored.

use super::IndexError;

/// Capacity-tier arithmetic for one index instance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PartitionSizing {
    load_factor: u32,
    max_partitions: u8,
}

impl PartitionSizing {
    pub(crate) fn new(load_factor: u32, max_partitions: u8) -> Self {
        Self {
            load_factor,
            max_partitions,
        }
    }

    /// Rows a slot of partition `n` holds: `L^(n+1)`.
    pub(crate) fn slot_capacity(&self, partition: u8) -> usize {
        (self.load_factor as usize).pow(u32::from(partition) + 1)
    }

    /// Whether `partition` is within the configured tier count.
    pub(crate) fn valid_partition(&self, partition: u8) -> bool {
        partition < self.max_partitions
    }

    /// Largest collection any partition can hold: `L^max_partitions`.
    pub(crate) fn max_capacity(&self) -> usize {
        (self.load_factor as usize).pow(u32::from(self.max_partitions))
    }

    /// Smallest partition whose slot capacity holds `count` rows.
    ///
    /// Empty collections are sized as one row — they are only ever sized
    /// transiently before a total delete takes a different path.
    pub(crate) fn partition_for(&self, count: usize) -> Result<u8, IndexError> {
        let count = count.max(1);
        let mut capacity = self.load_factor as usize;
        let mut partition: u8 = 0;
        while capacity < count {
            capacity *= self.load_factor as usize;
            partition += 1;
            if partition >= self.max_partitions {
                return Err(IndexError::CapacityExceeded {
                    count,
                    max: self.max_capacity(),
                });
            }
        }
        Ok(partition)
    }
}

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------
