//! The bounded log buffer.

use std::collections::VecDeque;

use serde::Serialize;
use swapsync_types::logs::LogRecord;

use crate::hash::{hash_record, LogHash};
use crate::parse::parse_batch;
use crate::{LogError, Result};

/// Buffer length above which the oldest tenth is evicted.
pub const DEFAULT_HIGH_WATER_MARK: usize = 5000;

/// A record together with its content hash.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HashedLogEntry {
    pub record: LogRecord,
    pub hash: LogHash,
}

impl HashedLogEntry {
    pub fn new(record: LogRecord) -> Self {
        let hash = hash_record(&record);
        Self { record, hash }
    }
}

/// Append-only log buffer with amortized eviction.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    entries: VecDeque<HashedLogEntry>,
    high_water_mark: usize,
    /// Records ingested since creation, evicted ones included.
    total_ingested: u64,
    /// Records dropped by eviction since creation.
    total_evicted: u64,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            total_ingested: 0,
            total_evicted: 0,
        }
    }
}

impl LogBuffer {
    /// Create a buffer with the default high-water mark.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer that evicts once it holds more than `high_water_mark`
    /// entries.
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidHighWaterMark`] if `high_water_mark` is zero.
    pub fn with_high_water_mark(high_water_mark: usize) -> Result<Self> {
        if high_water_mark == 0 {
            return Err(LogError::InvalidHighWaterMark(high_water_mark));
        }
        Ok(Self {
            high_water_mark,
            ..Self::default()
        })
    }

    /// Parse `raw_batch`, append its records in order, then evict.
    ///
    /// Returns the number of records appended.
    pub fn ingest(&mut self, raw_batch: &str) -> usize {
        let records = parse_batch(raw_batch);
        let appended = records.len();
        self.entries
            .extend(records.into_iter().map(HashedLogEntry::new));
        self.total_ingested += appended as u64;
        self.evict();
        appended
    }

    /// Drop the oldest `len / 10` entries if the buffer is over the mark.
    ///
    /// Shedding a tenth instead of just the overflow keeps eviction off the
    /// path of every subsequent insert.
    fn evict(&mut self) -> usize {
        let len = self.entries.len();
        if len <= self.high_water_mark {
            return 0;
        }
        let excess = len / 10;
        self.entries.drain(..excess);
        self.total_evicted += excess as u64;
        tracing::trace!(evicted = excess, remaining = self.entries.len(), "log buffer evicted");
        excess
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    pub fn total_ingested(&self) -> u64 {
        self.total_ingested
    }

    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    /// Entries oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HashedLogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    /// Copy of the newest `limit` entries, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<HashedLogEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }
}
