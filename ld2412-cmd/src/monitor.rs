use std::{
    fs::File,
    io::{stdin, stdout, Read, Write},
    path::Path,
    time::Duration,
};

use anyhow::{Context, Result};
use ld2412::{Monitor, MonitorOpts, Session, SessionConfig};
use tracing::{info, warn};

use crate::info::{write_info, Format, Info};
use crate::output::{write_event, Event};

pub struct Options {
    pub interval: Duration,
    pub format: Format,
    pub records: bool,
}

/// Opens `input`, which may be `-` for stdin. Returns the source and whether it is
/// a finite source that should be read until EOF.
fn open(input: &Path) -> Result<(Box<dyn Read + Send>, bool)> {
    if input == Path::new("-") {
        return Ok((Box::new(stdin()), true));
    }
    let file = File::open(input).with_context(|| format!("opening {input:?}"))?;
    let is_file = file
        .metadata()
        .with_context(|| format!("reading metadata for {input:?}"))?
        .is_file();
    Ok((Box::new(file), is_file))
}

fn emit<W: Write>(session: &mut Session, out: &mut W, opts: &Options) -> Result<()> {
    let records = session.drain_records();
    if opts.records {
        for rec in &records {
            write_event(out, &Event::Record(rec), &opts.format)?;
        }
    }
    for cmd in &session.drain_commands() {
        write_event(out, &Event::Command(cmd), &opts.format)?;
    }
    for alert in &session.drain_alerts() {
        write_event(out, &Event::Alert(alert), &opts.format)?;
    }
    out.flush().context("flushing output")
}

pub fn monitor(input: &Path, config: SessionConfig, opts: &Options) -> Result<()> {
    let (source, finite) = open(input)?;
    let monitor_opts = MonitorOpts::builder()
        .session(config)
        .tick_interval(opts.interval)
        .stop_on_eof(finite)
        .build();

    info!("monitoring {input:?}");
    let mut monitor = Monitor::start(source, monitor_opts).context("starting monitor")?;
    let mut out = stdout();

    while !monitor.is_finished() {
        monitor.next_tick()?;
        emit(monitor.session_mut(), &mut out, opts)?;
    }

    let zult = monitor.stop();
    if let Err(err) = &zult {
        warn!("monitoring ended: {err}");
    }
    emit(monitor.session_mut(), &mut out, opts)?;

    let summary = Info::new(&input.to_string_lossy(), monitor.session());
    write_info(&summary, &opts.format)?;

    zult.context("reading input")
}
