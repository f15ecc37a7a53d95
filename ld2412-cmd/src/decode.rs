use std::{
    fs::File,
    io::{stdout, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use ld2412::{
    framing::{ByteStreamBuffer, Decoded, FrameDecoder, FrameScanner},
    Error, SessionConfig,
};
use tracing::{debug, info};

use crate::info::Format;
use crate::output::{write_located, Event, Located};

#[derive(Debug, Default)]
struct Counts {
    telemetry: usize,
    commands: usize,
    malformed: usize,
    sync_misses: usize,
    truncations: usize,
}

/// Decode every frame in `src`, writing one line per frame to `out`.
fn decode_frames<R: Read, W: Write>(
    src: R,
    out: &mut W,
    format: &Format,
    config: &SessionConfig,
) -> Result<Counts> {
    let mut reader = BufReader::new(src);
    let mut buffer = ByteStreamBuffer::new(config.high_water, config.low_water)?;
    let mut scanner = FrameScanner::new(config.footer_window);
    let mut decoder = FrameDecoder::new();
    let mut counts = Counts::default();

    let mut buf = vec![0u8; 4096];
    loop {
        let n = reader.read(&mut buf).context("reading input")?;
        if n == 0 {
            break;
        }
        buffer.append(&buf[..n]);
        let scan = scanner.scan(&buffer);
        buffer.consume(scan.consumed)?;
        counts.sync_misses += scan.sync_misses;

        for frame in &scan.frames {
            let decoded = match decoder.decode(frame) {
                Ok(decoded) => decoded,
                Err(Error::MalformedFrame { .. } | Error::UnrecognizedFrame) => {
                    counts.malformed += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let event = match &decoded {
                Decoded::Telemetry(rec) => {
                    counts.telemetry += 1;
                    Event::Record(rec)
                }
                Decoded::Command(cmd) => {
                    counts.commands += 1;
                    Event::Command(cmd)
                }
            };
            let located = Located {
                offset: frame.offset,
                event,
            };
            write_located(out, &located, format)?;
        }

        if buffer.truncate_if_oversized() {
            counts.truncations += 1;
            debug!("buffer truncated at offset {}", buffer.offset());
        }
    }
    out.flush().context("flushing output")?;

    Ok(counts)
}

pub fn decode(fpath: &Path, format: &Format, config: &SessionConfig) -> Result<()> {
    let src = File::open(fpath).context("opening input")?;
    let mut out = BufWriter::new(stdout().lock());
    let counts = decode_frames(src, &mut out, format, config)?;
    info!(
        "decoded {} telemetry and {} command frames; {} malformed, {} sync misses, {} truncations",
        counts.telemetry, counts.commands, counts.malformed, counts.sync_misses, counts.truncations
    );
    Ok(())
}
