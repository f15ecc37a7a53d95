#![doc = include_str!("../README.md")]

mod error;

pub mod analysis;
pub mod framing;
pub mod monitor;
pub mod session;

pub use error::{Error, Result};
pub use monitor::{Monitor, MonitorOpts};
pub use session::{Session, SessionConfig, StreamCounters};

pub(crate) mod prelude {
    pub use crate::error::{Error, Result};
}
