use std::collections::HashMap;

use tracing::{debug, trace};

use super::{ByteStreamBuffer, Frame, FrameKind};

/// Default number of bytes, counted from the first header byte, searched for a
/// footer before a header match is considered a false positive.
pub const DEFAULT_FOOTER_WINDOW: usize = 50;

/// Length of every header and footer magic.
pub const MAGIC_LEN: usize = 4;
// Footer search starts after header(4) + length(2) + type/command word(2).
const FOOTER_SEARCH_START: usize = 8;

/// Result of a single [FrameScanner::scan].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Scan {
    /// Frames found, in stream order.
    pub frames: Vec<Frame>,
    /// Number of bytes at the front of the buffer the scanner is done with. Bytes
    /// after this may still be part of a frame that is not complete yet.
    pub consumed: usize,
    /// Header matches for which no footer was found within the window.
    pub sync_misses: usize,
}

/// FrameScanner locates frames in a [ByteStreamBuffer] using the header and footer
/// magic for each [FrameKind].
///
/// A header match followed by no footer inside the bounded window is treated as a
/// false positive and scanning resynchronizes by sliding one byte. The window bound
/// keeps a garbage-heavy stream from forcing a rescan of the whole buffer per call.
///
/// A header whose window is not completely buffered yet is left in place so a frame
/// split across chunk boundaries is matched once the rest arrives.
#[derive(Debug, Clone)]
pub struct FrameScanner {
    window: usize,
    /// Count of frames found for each kind.
    pub kind_hits: HashMap<FrameKind, usize>,
}

impl Default for FrameScanner {
    fn default() -> Self {
        FrameScanner::new(DEFAULT_FOOTER_WINDOW)
    }
}

impl FrameScanner {
    /// Creates a new scanner.
    ///
    /// `window` is the number of bytes from the start of a header within which the
    /// footer must start. It must be larger than 8 for any frame to be found.
    #[must_use]
    pub fn new(window: usize) -> Self {
        FrameScanner {
            window,
            kind_hits: HashMap::new(),
        }
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Scan `buffer` from the front and return all complete frames along with the
    /// number of leading bytes that can be discarded.
    ///
    /// The buffer is not modified; callers consume [Scan::consumed] bytes themselves
    /// once they are done with the result.
    pub fn scan(&mut self, buffer: &ByteStreamBuffer) -> Scan {
        let dat = buffer.as_slice();
        let mut zult = Scan::default();
        let mut cursor = 0;

        loop {
            let Some((start, kind)) = find_header(dat, cursor) else {
                // Keep a possible partial header at the tail
                zult.consumed = cursor.max(dat.len().saturating_sub(MAGIC_LEN - 1));
                break;
            };
            let Some((_, footer)) = kind.magic() else {
                zult.consumed = start + 1;
                break;
            };

            match find_footer(dat, start, footer, self.window) {
                Some(end) => {
                    let frame = Frame {
                        kind,
                        data: dat[start..end].to_vec(),
                        offset: buffer.offset() + start,
                    };
                    trace!(offset = frame.offset, len = frame.len(), kind = ?kind, "frame");
                    self.kind_hits
                        .entry(kind)
                        .and_modify(|count| *count += 1)
                        .or_insert(1);
                    zult.frames.push(frame);
                    cursor = end;
                }
                None if dat.len()
                    < start
                        .saturating_add(self.window)
                        .saturating_add(MAGIC_LEN - 1) =>
                {
                    // Window not fully buffered, wait for more bytes
                    zult.consumed = start;
                    break;
                }
                None => {
                    debug!(
                        offset = buffer.offset() + start,
                        kind = ?kind,
                        "no footer within {} bytes of header; resyncing",
                        self.window
                    );
                    zult.sync_misses += 1;
                    cursor = start + 1;
                }
            }
        }

        zult
    }
}

/// Find the first header at or after `from`.
fn find_header(dat: &[u8], from: usize) -> Option<(usize, FrameKind)> {
    if dat.len() < MAGIC_LEN {
        return None;
    }
    (from..=dat.len() - MAGIC_LEN)
        .find_map(|i| FrameKind::from_header(&dat[i..i + MAGIC_LEN]).map(|kind| (i, kind)))
}

/// Find `footer` starting in `[start + 8, start + window)` and return the index one
/// past its last byte.
fn find_footer(dat: &[u8], start: usize, footer: &[u8; 4], window: usize) -> Option<usize> {
    let last = start
        .saturating_add(window)
        .min(dat.len().saturating_sub(MAGIC_LEN - 1));
    (start + FOOTER_SEARCH_START..last)
        .find(|&j| dat[j..j + MAGIC_LEN] == footer[..])
        .map(|j| j + MAGIC_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const TELEMETRY: [u8; 22] = [
        0xf4, 0xf3, 0xf2, 0xf1, 0x0b, 0x00, 0x02, 0xaa, 0x03, 0x78, 0x00,
        0x55, 0x96, 0x00, 0x40, 0x78, 0x00, 0x10, 0xf8, 0xf7, 0xf6, 0xf5,
    ];
    const COMMAND: [u8; 12] = [
        0xfd, 0xfc, 0xfb, 0xfa, 0x02, 0x00, 0x12, 0x00, 0x04, 0x03, 0x02, 0x01,
    ];

    fn buffer(dat: &[u8]) -> ByteStreamBuffer {
        let mut buf = ByteStreamBuffer::default();
        buf.append(dat);
        buf
    }

    #[test]
    fn finds_single_telemetry_frame() {
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buffer(&TELEMETRY));

        assert_eq!(scan.frames.len(), 1);
        assert_eq!(scan.frames[0].kind, FrameKind::Telemetry);
        assert_eq!(scan.frames[0].data, TELEMETRY.to_vec());
        assert_eq!(scan.frames[0].offset, 0);
        assert_eq!(scan.consumed, TELEMETRY.len());
        assert_eq!(scan.sync_misses, 0);
    }

    #[test]
    fn finds_mixed_frames_in_order() {
        let mut dat = vec![0x00, 0x11];
        dat.extend_from_slice(&COMMAND);
        dat.extend_from_slice(&TELEMETRY);
        dat.extend_from_slice(&[0x22, 0x33]);
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buffer(&dat));

        assert_eq!(scan.frames.len(), 2);
        assert_eq!(scan.frames[0].kind, FrameKind::Command);
        assert_eq!(scan.frames[0].offset, 2);
        assert_eq!(scan.frames[1].kind, FrameKind::Telemetry);
        assert_eq!(scan.frames[1].offset, 14);
        assert_eq!(scanner.kind_hits[&FrameKind::Command], 1);
        assert_eq!(scanner.kind_hits[&FrameKind::Telemetry], 1);
        // trailing garbage shorter than a header is held back
        assert_eq!(scan.consumed, 36);
    }

    #[test]
    fn mismatched_footer_is_not_a_frame() {
        // telemetry header closed by a command footer
        let mut dat = TELEMETRY[..18].to_vec();
        dat.extend_from_slice(&COMMAND[8..]);
        dat.resize(100, 0x00);
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buffer(&dat));

        assert!(scan.frames.is_empty());
        assert_eq!(scan.sync_misses, 1);
    }

    #[test]
    fn incomplete_window_is_held() {
        let mut scanner = FrameScanner::default();
        let mut dat = vec![0xaa; 5];
        dat.extend_from_slice(&TELEMETRY[..15]);
        let scan = scanner.scan(&buffer(&dat));

        assert!(scan.frames.is_empty());
        assert_eq!(scan.consumed, 5, "header start must not be consumed");
        assert_eq!(scan.sync_misses, 0);
    }

    #[test]
    fn false_header_resyncs_by_one_byte() {
        let mut dat = TELEMETRY[..4].to_vec();
        dat.extend(std::iter::repeat(0x00).take(60));
        dat.extend_from_slice(&TELEMETRY);
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buffer(&dat));

        assert_eq!(scan.sync_misses, 1);
        assert_eq!(scan.frames.len(), 1);
        assert_eq!(scan.frames[0].offset, 64);
    }

    #[test]
    fn footer_outside_window_is_not_matched() {
        let mut dat = TELEMETRY[..18].to_vec();
        dat.extend(std::iter::repeat(0x00).take(40));
        dat.extend_from_slice(&TELEMETRY[18..]);
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buffer(&dat));

        assert!(scan.frames.is_empty());
        assert_eq!(scan.sync_misses, 1);
    }

    #[test]
    fn unbounded_window() {
        let mut scanner = FrameScanner::new(usize::MAX);
        let mut dat = TELEMETRY.to_vec();
        dat.extend_from_slice(&TELEMETRY[..4]);
        let scan = scanner.scan(&buffer(&dat));

        assert_eq!(scan.frames.len(), 1);
        // the trailing header can never see its whole window so it is held
        assert_eq!(scan.consumed, TELEMETRY.len());
        assert_eq!(scan.sync_misses, 0);
    }

    #[test]
    fn short_buffers() {
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buffer(&[]));
        assert_eq!(scan, Scan::default());

        let scan = scanner.scan(&buffer(&[0xf4, 0xf3]));
        assert!(scan.frames.is_empty());
        assert_eq!(scan.consumed, 0);
    }

    #[test]
    fn frame_offsets_account_for_consumed_bytes() {
        let mut buf = buffer(&[0x00; 10]);
        buf.consume(10).unwrap();
        buf.append(&TELEMETRY);
        let mut scanner = FrameScanner::default();
        let scan = scanner.scan(&buf);

        assert_eq!(scan.frames[0].offset, 10);
    }
}
