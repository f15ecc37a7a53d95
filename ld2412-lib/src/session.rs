//! A single sensor stream: buffering, framing, decoding and analytics.
use std::collections::VecDeque;

use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::{
    self, Alert, AlertThresholds, BehaviorClassifier, BehaviorState, StatisticsAggregator, Stats,
    TelemetryHistory, DEFAULT_HISTORY_CAPACITY,
};
use crate::framing::{
    ByteStreamBuffer, CommandFrame, Decoded, FrameDecoder, FrameScanner, TelemetryRecord,
    DEFAULT_FOOTER_WINDOW, DEFAULT_HIGH_WATER, DEFAULT_LOW_WATER, MAGIC_LEN,
};
use crate::prelude::*;

/// Maximum number of undrained records, alerts, or command frames a session holds.
/// Beyond this the oldest are dropped.
pub const MAX_PENDING: usize = 1024;

// Footer search starts 8 bytes into a frame so smaller windows can never match.
const MIN_FOOTER_WINDOW: usize = 9;

/// Tunables for a [Session].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Buffer length that triggers truncation.
    pub high_water: usize,
    /// Number of trailing bytes kept on truncation.
    pub low_water: usize,
    /// Bytes from a header within which its footer must begin.
    pub footer_window: usize,
    pub history_capacity: usize,
    pub thresholds: AlertThresholds,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            high_water: DEFAULT_HIGH_WATER,
            low_water: DEFAULT_LOW_WATER,
            footer_window: DEFAULT_FOOTER_WINDOW,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_water_marks(mut self, high: usize, low: usize) -> Self {
        self.high_water = high;
        self.low_water = low;
        self
    }

    #[must_use]
    pub fn with_footer_window(mut self, window: usize) -> Self {
        self.footer_window = window;
        self
    }

    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// # Errors
    /// [Error::Invariant] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.low_water >= self.high_water {
            return Err(Error::Invariant(format!(
                "low water mark {} must be less than high water mark {}",
                self.low_water, self.high_water
            )));
        }
        if self.history_capacity == 0 {
            return Err(Error::Invariant(
                "history capacity must be greater than zero".to_string(),
            ));
        }
        if self.footer_window < MIN_FOOTER_WINDOW {
            return Err(Error::Invariant(format!(
                "footer window must be at least {MIN_FOOTER_WINDOW}, got {}",
                self.footer_window
            )));
        }
        // A header waiting on its window must survive truncation.
        if self.footer_window.saturating_add(MAGIC_LEN - 1) > self.low_water {
            return Err(Error::Invariant(format!(
                "footer window {} does not fit in low water mark {}",
                self.footer_window, self.low_water
            )));
        }
        Ok(())
    }
}

/// Counts of what happened to the bytes fed into a [Session].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamCounters {
    pub bytes_received: u64,
    pub telemetry_frames: u64,
    pub command_frames: u64,
    /// Header matches without a footer in the search window.
    pub sync_misses: u64,
    /// Frames dropped because they were too short to decode.
    pub malformed_frames: u64,
    /// Number of times the buffer was cut back to its low-water mark.
    pub buffer_truncations: u64,
}

fn push_pending<T>(queue: &mut VecDeque<T>, value: T, what: &str) {
    if queue.len() == MAX_PENDING {
        queue.pop_front();
        trace!("pending {what} full; dropping oldest");
    }
    queue.push_back(value);
}

/// Session owns all decoding and analytics state for one byte stream.
///
/// Feed it chunks of bytes in arrival order; results are pulled using the
/// snapshot and drain accessors. The same sequence of bytes always produces the
/// same results, regardless of how it is chunked.
///
/// # Example
/// ```
/// use ld2412::{Session, SessionConfig};
///
/// let mut session = Session::new(SessionConfig::default().with_history_capacity(10)).unwrap();
/// session.feed(&[0xf4, 0xf3, 0xf2, 0xf1, 0x0b, 0x00, 0x02, 0xaa, 0x01, 0x00, 0x00,
///                0x00, 0x28, 0x00, 0x20, 0x28, 0x00, 0x00, 0xf8, 0xf7, 0xf6, 0xf5]).unwrap();
///
/// let alerts = session.drain_alerts();
/// assert_eq!(alerts.len(), 1, "40cm is near range");
/// ```
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    buffer: ByteStreamBuffer,
    scanner: FrameScanner,
    decoder: FrameDecoder,
    history: TelemetryHistory,
    stats: StatisticsAggregator,
    behavior: BehaviorClassifier,
    counters: StreamCounters,
    records: VecDeque<TelemetryRecord>,
    alerts: VecDeque<Alert>,
    commands: VecDeque<CommandFrame>,
}

impl Default for Session {
    fn default() -> Self {
        let config = SessionConfig::default();
        Session {
            buffer: ByteStreamBuffer::default(),
            scanner: FrameScanner::new(config.footer_window),
            decoder: FrameDecoder::default(),
            history: TelemetryHistory::default(),
            stats: StatisticsAggregator::default(),
            behavior: BehaviorClassifier::default(),
            counters: StreamCounters::default(),
            records: VecDeque::default(),
            alerts: VecDeque::default(),
            commands: VecDeque::default(),
            config,
        }
    }
}

impl Session {
    /// # Errors
    /// [Error::Invariant] if `config` is invalid.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Session {
            buffer: ByteStreamBuffer::new(config.high_water, config.low_water)?,
            scanner: FrameScanner::new(config.footer_window),
            decoder: FrameDecoder::default(),
            history: TelemetryHistory::new(config.history_capacity)?,
            stats: StatisticsAggregator::default(),
            behavior: BehaviorClassifier::default(),
            counters: StreamCounters::default(),
            records: VecDeque::default(),
            alerts: VecDeque::default(),
            commands: VecDeque::default(),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process a chunk of stream bytes, returning the number of telemetry records
    /// decoded from it.
    ///
    /// Stream noise, false headers and malformed frames are counted in
    /// [Session::stream_counters] rather than returned as errors.
    ///
    /// # Errors
    /// [Error::Invariant] if internal state is inconsistent. This does not happen
    /// for any input.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<usize> {
        self.counters.bytes_received += chunk.len() as u64;
        self.buffer.append(chunk);

        let scan = self.scanner.scan(&self.buffer);
        self.counters.sync_misses += scan.sync_misses as u64;
        self.buffer.consume(scan.consumed)?;

        let mut decoded = 0;
        for frame in &scan.frames {
            match self.decoder.decode(frame) {
                Ok(Decoded::Telemetry(rec)) => {
                    self.counters.telemetry_frames += 1;
                    self.handle_record(rec);
                    decoded += 1;
                }
                Ok(Decoded::Command(cmd)) => {
                    self.counters.command_frames += 1;
                    push_pending(&mut self.commands, cmd, "commands");
                }
                Err(Error::MalformedFrame { .. } | Error::UnrecognizedFrame) => {
                    self.counters.malformed_frames += 1;
                }
                Err(err) => return Err(err),
            }
        }

        if self.buffer.truncate_if_oversized() {
            debug!(
                offset = self.buffer.offset(),
                kept = self.buffer.len(),
                "buffer over high water mark; truncated"
            );
            self.counters.buffer_truncations += 1;
        }

        Ok(decoded)
    }

    fn handle_record(&mut self, rec: TelemetryRecord) {
        self.history.push(rec.clone());
        self.stats.update(&rec, &self.history);
        self.behavior.update(&rec);
        for alert in analysis::check(&rec, self.behavior.state(), &self.config.thresholds) {
            debug!(index = rec.captured_at, "{alert}");
            push_pending(&mut self.alerts, alert, "alerts");
        }
        push_pending(&mut self.records, rec, "records");
    }

    /// Discard all buffered bytes and accumulated state. Configuration is kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanner.kind_hits.clear();
        self.decoder.reset();
        self.history.clear();
        self.stats.reset();
        self.behavior.reset();
        self.counters = StreamCounters::default();
        self.records.clear();
        self.alerts.clear();
        self.commands.clear();
    }

    #[must_use]
    pub fn latest_record(&self) -> Option<TelemetryRecord> {
        self.history.latest().cloned()
    }

    #[must_use]
    pub fn stats_snapshot(&self) -> Stats {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn behavior_snapshot(&self) -> BehaviorState {
        self.behavior.snapshot()
    }

    /// Alerts raised since the last call, oldest first.
    pub fn drain_alerts(&mut self) -> Vec<Alert> {
        self.alerts.drain(..).collect()
    }

    /// Command and acknowledgment frames seen since the last call, oldest first.
    pub fn drain_commands(&mut self) -> Vec<CommandFrame> {
        self.commands.drain(..).collect()
    }

    /// Telemetry records decoded since the last call, oldest first.
    pub fn drain_records(&mut self) -> Vec<TelemetryRecord> {
        self.records.drain(..).collect()
    }

    /// Copy of the telemetry history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<TelemetryRecord> {
        self.history.to_vec()
    }

    #[must_use]
    pub fn stream_counters(&self) -> StreamCounters {
        self.counters.clone()
    }

    /// Number of bytes currently buffered waiting for a complete frame.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
