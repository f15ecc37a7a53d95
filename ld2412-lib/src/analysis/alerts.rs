use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::BehaviorState;
use crate::framing::TelemetryRecord;

/// Thresholds used by [check].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlertThresholds {
    /// Positive detection distances below this are [Alert::NearRange].
    pub near_range_cm: u16,
    /// Energies above this are [Alert::HighMovingEnergy]/[Alert::HighStillEnergy].
    pub high_energy: u8,
    /// Distance drop over the last 3 positive samples that is [Alert::RapidApproach].
    pub rapid_approach_cm: u16,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        AlertThresholds {
            near_range_cm: 50,
            high_energy: 80,
            rapid_approach_cm: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "alert", rename_all = "snake_case"))]
pub enum Alert {
    NearRange { distance_cm: u16 },
    HighMovingEnergy { energy: u8 },
    HighStillEnergy { energy: u8 },
    RapidApproach { from_cm: u16, to_cm: u16 },
}

impl Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alert::NearRange { distance_cm } => write!(f, "target near: {distance_cm}cm"),
            Alert::HighMovingEnergy { energy } => write!(f, "high moving energy: {energy}"),
            Alert::HighStillEnergy { energy } => write!(f, "high still energy: {energy}"),
            Alert::RapidApproach { from_cm, to_cm } => {
                write!(f, "rapid approach: {from_cm}cm -> {to_cm}cm")
            }
        }
    }
}

/// Evaluate the alert rules for `record` given the behavior state after it was
/// classified. Every rule that matches produces an alert; nothing is deduplicated.
#[must_use]
pub fn check(
    record: &TelemetryRecord,
    behavior: &BehaviorState,
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::default();

    let dist = record.detection_distance_cm;
    if dist > 0 && dist < thresholds.near_range_cm {
        alerts.push(Alert::NearRange { distance_cm: dist });
    }
    if record.moving_energy > thresholds.high_energy {
        alerts.push(Alert::HighMovingEnergy {
            energy: record.moving_energy,
        });
    }
    if record.still_energy > thresholds.high_energy {
        alerts.push(Alert::HighStillEnergy {
            energy: record.still_energy,
        });
    }

    let window = &behavior.distance_window;
    if window.len() >= 3 {
        let to = window[window.len() - 1];
        let from = window[window.len() - 3];
        if i32::from(to) < i32::from(from) - i32::from(thresholds.rapid_approach_cm) {
            alerts.push(Alert::RapidApproach {
                from_cm: from,
                to_cm: to,
            });
        }
    }

    alerts
}
