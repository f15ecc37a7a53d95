use std::collections::VecDeque;
use std::fmt::Display;

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::framing::TelemetryRecord;

/// Number of samples in the trend and noise windows.
pub const BEHAVIOR_WINDOW: usize = 10;
/// Distance change across a full window, in cm, beyond which the target is
/// considered to be approaching or leaving.
pub const TREND_DELTA_CM: i32 = 50;
/// A full state window with more than this many state changes is noise.
pub const NOISE_TRANSITIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Pattern {
    Approach,
    Leave,
    Stable,
    Noise,
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pattern::Approach => "approach",
            Pattern::Leave => "leave",
            Pattern::Stable => "stable",
            Pattern::Noise => "noise",
        };
        write!(f, "{name}")
    }
}

/// Pattern counters and the trailing windows they are computed from.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BehaviorState {
    pub approach_count: u64,
    pub leave_count: u64,
    pub stable_count: u64,
    pub noise_count: u64,
    /// The most recent positive detection distances, oldest first.
    pub distance_window: VecDeque<u16>,
    /// The most recent raw target state bytes, oldest first.
    pub state_window: VecDeque<u8>,
}

impl BehaviorState {
    /// Pattern observed most often, or `None` if nothing has been classified.
    ///
    /// Ties go to the first of approach, leave, stable, noise.
    #[must_use]
    pub fn dominant(&self) -> Option<Pattern> {
        let mut best: Option<(Pattern, u64)> = None;
        for (pattern, count) in [
            (Pattern::Approach, self.approach_count),
            (Pattern::Leave, self.leave_count),
            (Pattern::Stable, self.stable_count),
            (Pattern::Noise, self.noise_count),
        ] {
            match best {
                Some((_, n)) if count <= n => {}
                _ if count > 0 => best = Some((pattern, count)),
                _ => {}
            }
        }
        best.map(|(pattern, _)| pattern)
    }

    #[must_use]
    pub fn count(&self, pattern: Pattern) -> u64 {
        match pattern {
            Pattern::Approach => self.approach_count,
            Pattern::Leave => self.leave_count,
            Pattern::Stable => self.stable_count,
            Pattern::Noise => self.noise_count,
        }
    }
}

fn push_bounded<T>(window: &mut VecDeque<T>, value: T) {
    if window.len() == BEHAVIOR_WINDOW {
        window.pop_front();
    }
    window.push_back(value);
}

/// Classifies movement trends and state flicker over trailing windows.
#[derive(Debug, Default, Clone)]
pub struct BehaviorClassifier {
    state: BehaviorState,
}

impl BehaviorClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the windows with `record` and return the patterns it produced, at
    /// most one trend pattern followed by at most one noise pattern.
    pub fn update(&mut self, record: &TelemetryRecord) -> Vec<Pattern> {
        let mut patterns = Vec::with_capacity(2);
        let state = &mut self.state;

        let dist = record.detection_distance_cm;
        if dist > 0 {
            push_bounded(&mut state.distance_window, dist);
            if state.distance_window.len() == BEHAVIOR_WINDOW {
                let first = i32::from(state.distance_window[0]);
                let last = i32::from(state.distance_window[BEHAVIOR_WINDOW - 1]);
                let delta = last - first;
                let pattern = if delta < -TREND_DELTA_CM {
                    state.approach_count += 1;
                    Pattern::Approach
                } else if delta > TREND_DELTA_CM {
                    state.leave_count += 1;
                    Pattern::Leave
                } else {
                    state.stable_count += 1;
                    Pattern::Stable
                };
                if pattern != Pattern::Stable {
                    debug!(index = record.captured_at, delta, "{pattern}");
                }
                patterns.push(pattern);
            }
        }

        push_bounded(&mut state.state_window, record.target_state.0);
        let transitions = state
            .state_window
            .iter()
            .zip(state.state_window.iter().skip(1))
            .filter(|(a, b)| a != b)
            .count();
        if transitions > NOISE_TRANSITIONS {
            debug!(index = record.captured_at, transitions, "noise");
            state.noise_count += 1;
            patterns.push(Pattern::Noise);
        }

        patterns
    }

    #[must_use]
    pub fn state(&self) -> &BehaviorState {
        &self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> BehaviorState {
        self.state.clone()
    }

    pub fn reset(&mut self) {
        self.state = BehaviorState::default();
    }
}
