use crate::framing::TelemetryRecord;
use crate::prelude::*;

/// Default number of records kept by a [TelemetryHistory].
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Fixed-capacity ring of the most recent telemetry records.
///
/// Slots are allocated once up front; pushing into a full ring overwrites the
/// oldest record.
#[derive(Debug, Clone)]
pub struct TelemetryHistory {
    slots: Vec<Option<TelemetryRecord>>,
    // Index of the oldest record
    head: usize,
    len: usize,
}

impl Default for TelemetryHistory {
    fn default() -> Self {
        TelemetryHistory {
            slots: vec![None; DEFAULT_HISTORY_CAPACITY],
            head: 0,
            len: 0,
        }
    }
}

impl TelemetryHistory {
    /// # Errors
    /// [Error::Invariant] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Invariant(
                "history capacity must be greater than zero".to_string(),
            ));
        }
        Ok(TelemetryHistory {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        })
    }

    /// Append `record`, returning the evicted oldest record if the ring was full.
    pub fn push(&mut self, record: TelemetryRecord) -> Option<TelemetryRecord> {
        let cap = self.slots.len();
        if self.len < cap {
            let idx = (self.head + self.len) % cap;
            self.slots[idx] = Some(record);
            self.len += 1;
            None
        } else {
            let evicted = self.slots[self.head].replace(record);
            self.head = (self.head + 1) % cap;
            evicted
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recently pushed record.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.len - 1) % self.slots.len();
        self.slots[idx].as_ref()
    }

    /// Records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        let cap = self.slots.len();
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % cap].as_ref())
    }

    /// Copy of the records, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TelemetryRecord> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.head = 0;
        self.len = 0;
    }
}
