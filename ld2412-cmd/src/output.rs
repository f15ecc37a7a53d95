use std::{fmt::Display, io::Write};

use anyhow::{Context, Result};
use ld2412::{
    analysis::Alert,
    framing::{CommandFrame, TelemetryRecord},
};
use serde::Serialize;

use crate::info::Format;

/// A single line of streaming output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event<'a> {
    Record(&'a TelemetryRecord),
    Command(&'a CommandFrame),
    Alert(&'a Alert),
}

impl Display for Event<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Record(rec) => {
                write!(
                    f,
                    "#{:<6} {:<21} moving {:>4}cm/{:>3}  still {:>4}cm/{:>3}  detect {:>4}cm",
                    rec.captured_at,
                    rec.target_state.to_string(),
                    rec.moving_distance_cm,
                    rec.moving_energy,
                    rec.still_distance_cm,
                    rec.still_energy,
                    rec.detection_distance_cm,
                )?;
                match rec.ambient_light {
                    Some(light) => write!(f, "  light {light:>3}"),
                    None => Ok(()),
                }
            }
            Event::Command(cmd) => {
                let payload: String = cmd.payload.iter().map(|b| format!("{b:02x}")).collect();
                write!(
                    f,
                    "{} {} payload=[{payload}]",
                    if cmd.is_ack() { "ack" } else { "command" },
                    cmd.code()
                )
            }
            Event::Alert(alert) => write!(f, "ALERT {alert}"),
        }
    }
}

/// An [Event] along with the stream offset it was found at.
#[derive(Debug, Serialize)]
pub struct Located<'a> {
    pub offset: usize,
    #[serde(flatten)]
    pub event: Event<'a>,
}

pub fn write_event<W: Write>(out: &mut W, event: &Event, format: &Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer(&mut *out, event).context("serializing to json")?;
            writeln!(out).context("writing output")
        }
        Format::Text => writeln!(out, "{event}").context("writing output"),
    }
}

pub fn write_located<W: Write>(out: &mut W, located: &Located, format: &Format) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer(&mut *out, located).context("serializing to json")?;
            writeln!(out).context("writing output")
        }
        Format::Text => {
            writeln!(out, "{:>8}  {}", located.offset, located.event).context("writing output")
        }
    }
}
