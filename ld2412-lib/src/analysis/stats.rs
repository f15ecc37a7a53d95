#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::TelemetryHistory;
use crate::framing::TelemetryRecord;

/// Counters and extrema accumulated over decoded telemetry.
///
/// Counters cover every record since the last reset; the energy averages only
/// cover records currently in the [TelemetryHistory].
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stats {
    pub total_frames: u64,
    pub moving_detections: u64,
    pub still_detections: u64,
    pub no_target_count: u64,
    /// Smallest positive detection distance seen, if any.
    pub min_detection_distance_cm: Option<u16>,
    pub max_detection_distance_cm: u16,
    pub avg_moving_energy: f64,
    pub avg_still_energy: f64,
    pub max_moving_energy: u8,
    pub max_still_energy: u8,
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

impl Stats {
    /// Percentage of frames reporting a moving target.
    #[must_use]
    pub fn moving_rate(&self) -> f64 {
        percent(self.moving_detections, self.total_frames)
    }

    /// Percentage of frames reporting a still target.
    #[must_use]
    pub fn still_rate(&self) -> f64 {
        percent(self.still_detections, self.total_frames)
    }

    /// Percentage of frames reporting no target.
    #[must_use]
    pub fn no_target_rate(&self) -> f64 {
        percent(self.no_target_count, self.total_frames)
    }
}

/// Maintains [Stats] as records are added to a [TelemetryHistory].
#[derive(Debug, Default, Clone)]
pub struct StatisticsAggregator {
    stats: Stats,
}

impl StatisticsAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for `record`, which must already have been pushed to `history`.
    pub fn update(&mut self, record: &TelemetryRecord, history: &TelemetryHistory) {
        let stats = &mut self.stats;
        let state = record.target_state;

        stats.total_frames += 1;
        if state.is_moving() {
            stats.moving_detections += 1;
        }
        if state.is_still() {
            stats.still_detections += 1;
        }
        if !state.has_target() {
            stats.no_target_count += 1;
        }

        let dist = record.detection_distance_cm;
        if dist > 0 {
            stats.min_detection_distance_cm = Some(
                stats
                    .min_detection_distance_cm
                    .map_or(dist, |min| min.min(dist)),
            );
            stats.max_detection_distance_cm = stats.max_detection_distance_cm.max(dist);
        }

        stats.max_moving_energy = stats.max_moving_energy.max(record.moving_energy);
        stats.max_still_energy = stats.max_still_energy.max(record.still_energy);

        if !history.is_empty() {
            let (moving, still) = history.iter().fold((0u64, 0u64), |(m, s), r| {
                (m + u64::from(r.moving_energy), s + u64::from(r.still_energy))
            });
            let count = history.len() as f64;
            stats.avg_moving_energy = moving as f64 / count;
            stats.avg_still_energy = still as f64 / count;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Stats {
        self.stats.clone()
    }

    pub fn reset(&mut self) {
        self.stats = Stats::default();
    }
}
