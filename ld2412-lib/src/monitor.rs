//! Background reading of a byte source into a [Session].
//!
//! A producer thread reads the source and sends chunks over a bounded channel. The
//! caller drains the channel from its own thread, usually once per tick, so all
//! session state is only ever touched by a single thread.
use std::{
    io::{ErrorKind, Read},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam::channel::{bounded, tick, Receiver, SendTimeoutError, Sender};
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::prelude::*;
use crate::{Session, SessionConfig};

/// Options for [Monitor::start].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ld2412::MonitorOpts;
///
/// let opts = MonitorOpts::builder()
///     .tick_interval(Duration::from_millis(50))
///     .stop_on_eof(true)
///     .build();
/// assert_eq!(opts.channel_capacity, 64);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct MonitorOpts {
    /// Configuration for the [Session] the monitor feeds.
    #[builder(default)]
    pub session: SessionConfig,
    /// Maximum number of bytes per read.
    #[builder(default = 256)]
    pub chunk_size: usize,
    /// Number of chunks that may be waiting for the consumer. When full the producer
    /// blocks until the consumer catches up; chunks are never dropped.
    #[builder(default = 64)]
    pub channel_capacity: usize,
    /// How long the producer waits after an empty read, and how often it re-checks
    /// for cancellation while blocked on a full channel.
    #[builder(default = Duration::from_millis(10))]
    pub poll_interval: Duration,
    /// Interval of the consumer tick, see [Monitor::next_tick].
    #[builder(default = Duration::from_millis(100))]
    pub tick_interval: Duration,
    /// Stop reading once the source reports end of stream. Used when replaying a
    /// capture file; for a live serial device a zero length read just means no data
    /// yet.
    #[builder(default)]
    pub stop_on_eof: bool,
}

impl Default for MonitorOpts {
    fn default() -> Self {
        MonitorOpts::builder().build()
    }
}

/// Monitor owns a producer thread reading from a byte source and the [Session]
/// those bytes are fed to.
///
/// # Example
/// ```
/// use std::io::Cursor;
/// use ld2412::{Monitor, MonitorOpts};
///
/// let dat = hex::decode("f4f3f2f10b0002aa03780055960040780010f8f7f6f5").unwrap();
/// let opts = MonitorOpts::builder().stop_on_eof(true).build();
/// let mut monitor = Monitor::start(Cursor::new(dat), opts).unwrap();
/// while !monitor.is_finished() {
///     monitor.next_tick().unwrap();
/// }
/// monitor.stop().unwrap();
///
/// assert_eq!(monitor.session().stats_snapshot().total_frames, 1);
/// ```
pub struct Monitor {
    session: Session,
    chunks: Receiver<Vec<u8>>,
    ticker: Receiver<Instant>,
    monitoring: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<()>>>,
    poll_interval: Duration,
}

impl Monitor {
    /// Start reading `source` in a background thread.
    ///
    /// # Errors
    /// [Error::Invariant] if the session configuration is invalid, or [Error::Io] if the
    /// producer thread cannot be started.
    pub fn start<R>(source: R, opts: MonitorOpts) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let session = Session::new(opts.session.clone())?;
        let (tx, rx) = bounded(opts.channel_capacity.max(1));
        let monitoring = Arc::new(AtomicBool::new(true));

        let producer = Producer {
            tx,
            monitoring: monitoring.clone(),
            chunk_size: opts.chunk_size.max(1),
            poll_interval: opts.poll_interval,
            stop_on_eof: opts.stop_on_eof,
        };
        let handle = thread::Builder::new()
            .name("ld2412_reader".into())
            .spawn(move || producer.run(source))?;

        Ok(Monitor {
            session,
            chunks: rx,
            ticker: tick(opts.tick_interval),
            monitoring,
            handle: Some(handle),
            poll_interval: opts.poll_interval,
        })
    }

    /// Feed every chunk currently waiting in the channel to the session without
    /// blocking. Returns the number of telemetry records decoded.
    ///
    /// # Errors
    /// Any error from [Session::feed].
    pub fn drain(&mut self) -> Result<usize> {
        let mut decoded = 0;
        for chunk in self.chunks.try_iter() {
            decoded += self.session.feed(&chunk)?;
        }
        Ok(decoded)
    }

    /// Block until the next tick, then [Monitor::drain].
    ///
    /// # Errors
    /// Any error from [Monitor::drain].
    pub fn next_tick(&mut self) -> Result<usize> {
        // The ticker never disconnects while we hold it
        let _ = self.ticker.recv();
        self.drain()
    }

    /// Tick source used by [Monitor::next_tick], for callers that want to `select!`
    /// on it alongside their own channels.
    #[must_use]
    pub fn ticker(&self) -> &Receiver<Instant> {
        &self.ticker
    }

    /// True while the producer thread is reading.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// True once the producer has stopped and every chunk it sent has been drained.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.is_running() && self.chunks.is_empty()
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Stop the producer, feed any chunks still queued to the session, and report
    /// how the producer ended.
    ///
    /// The producer only notices cancellation between reads, so a source that
    /// blocks forever on read will also block this call. Serial devices should be
    /// opened with a read timeout.
    ///
    /// # Errors
    /// [Error::Transport] if the source failed while reading, or any error from
    /// [Session::feed].
    pub fn stop(&mut self) -> Result<()> {
        self.monitoring.store(false, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // keep draining so a producer blocked on a full channel can get out
        while !handle.is_finished() {
            self.drain()?;
            thread::sleep(self.poll_interval);
        }
        let zult = handle
            .join()
            .map_err(|_| Error::Transport("reader thread panicked".to_string()))?;
        self.drain()?;
        debug!("monitor stopped");
        zult
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.monitoring.store(false, Ordering::Relaxed);
    }
}

struct Producer {
    tx: Sender<Vec<u8>>,
    monitoring: Arc<AtomicBool>,
    chunk_size: usize,
    poll_interval: Duration,
    stop_on_eof: bool,
}

impl Producer {
    fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::Relaxed)
    }

    fn run<R: Read>(self, mut source: R) -> Result<()> {
        let mut buf = vec![0u8; self.chunk_size];
        while self.is_monitoring() {
            match source.read(&mut buf) {
                Ok(0) if self.stop_on_eof => {
                    debug!("end of stream");
                    break;
                }
                Ok(0) => thread::sleep(self.poll_interval),
                Ok(n) => {
                    if !self.send(buf[..n].to_vec()) {
                        break;
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                    ) =>
                {
                    thread::sleep(self.poll_interval);
                }
                Err(err) => {
                    warn!("reading stream failed: {err}");
                    return Err(Error::Transport(err.to_string()));
                }
            }
        }
        Ok(())
    }

    // Blocks while the channel is full. Returns false if the consumer is gone or
    // monitoring was cancelled.
    fn send(&self, mut chunk: Vec<u8>) -> bool {
        loop {
            match self.tx.send_timeout(chunk, self.poll_interval) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(c)) => {
                    if !self.is_monitoring() {
                        debug!("cancelled while channel full; dropping {} bytes", c.len());
                        return false;
                    }
                    chunk = c;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    debug!("consumer gone");
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TELEMETRY: [u8; 22] = [
        0xf4, 0xf3, 0xf2, 0xf1, 0x0b, 0x00, 0x02, 0xaa, 0x03, 0x78, 0x00, 0x55, 0x96, 0x00, 0x40,
        0x78, 0x00, 0x10, 0xf8, 0xf7, 0xf6, 0xf5,
    ];

    fn fast_opts() -> MonitorOpts {
        MonitorOpts::builder()
            .tick_interval(Duration::from_millis(1))
            .poll_interval(Duration::from_millis(1))
            .stop_on_eof(true)
            .build()
    }

    fn run_to_end(monitor: &mut Monitor) {
        while !monitor.is_finished() {
            monitor.next_tick().unwrap();
        }
    }

    struct FailingReader {
        remaining: Vec<u8>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining.is_empty() {
                return Err(std::io::Error::new(ErrorKind::BrokenPipe, "unplugged"));
            }
            let n = buf.len().min(self.remaining.len());
            buf[..n].copy_from_slice(&self.remaining[..n]);
            self.remaining.drain(..n);
            Ok(n)
        }
    }

    #[test]
    fn replays_to_eof() {
        let dat: Vec<u8> = TELEMETRY.repeat(20);
        let mut monitor = Monitor::start(Cursor::new(dat), fast_opts()).unwrap();
        run_to_end(&mut monitor);
        monitor.stop().unwrap();

        let session = monitor.session();
        assert_eq!(session.stats_snapshot().total_frames, 20);
        assert_eq!(session.stream_counters().bytes_received, 440);
    }

    #[test]
    fn small_channel_does_not_drop_chunks() {
        let dat: Vec<u8> = TELEMETRY.repeat(50);
        let opts = MonitorOpts::builder()
            .chunk_size(7)
            .channel_capacity(1)
            .tick_interval(Duration::from_millis(5))
            .poll_interval(Duration::from_millis(1))
            .stop_on_eof(true)
            .build();
        let mut monitor = Monitor::start(Cursor::new(dat), opts).unwrap();
        run_to_end(&mut monitor);
        monitor.stop().unwrap();

        assert_eq!(monitor.session().stream_counters().bytes_received, 1100);
        assert_eq!(monitor.session().stats_snapshot().total_frames, 50);
    }

    #[test]
    fn transport_error_is_reported_by_stop() {
        let reader = FailingReader {
            remaining: TELEMETRY.repeat(2),
        };
        let mut monitor = Monitor::start(reader, fast_opts()).unwrap();
        run_to_end(&mut monitor);

        let zult = monitor.stop();
        assert!(matches!(zult, Err(Error::Transport(_))), "got {zult:?}");
        // data read before the failure is still decoded
        assert_eq!(monitor.session().stats_snapshot().total_frames, 2);
    }

    #[test]
    fn stop_without_eof() {
        let opts = MonitorOpts::builder()
            .poll_interval(Duration::from_millis(1))
            .build();
        let mut monitor = Monitor::start(Cursor::new(TELEMETRY.to_vec()), opts).unwrap();
        thread::sleep(Duration::from_millis(20));

        monitor.stop().unwrap();
        assert!(!monitor.is_running());
        assert_eq!(monitor.session().stats_snapshot().total_frames, 1);
        // stopping twice is fine
        monitor.stop().unwrap();
    }

    #[test]
    fn invalid_session_config() {
        let opts = MonitorOpts::builder()
            .session(SessionConfig::default().with_history_capacity(0))
            .build();
        assert!(Monitor::start(Cursor::new(vec![]), opts).is_err());
    }
}
