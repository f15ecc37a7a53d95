//! Rolling analytics over decoded telemetry.
//!
//! Records flow through [TelemetryHistory], [StatisticsAggregator],
//! [BehaviorClassifier] and finally the alert rules in [check], in that order.
mod alerts;
mod behavior;
mod history;
mod stats;

pub use alerts::*;
pub use behavior::*;
pub use history::*;
pub use stats::*;
