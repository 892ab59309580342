// Blocking transport: exact-length reads, line reads and bounded-retry writes
use crate::config::{Timeout, TransportConfig};
use crate::error::{Result, TransportError};
use crate::traits::{Closer, Stream};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

/// Largest single read handed to the stream by `read`
const READ_CHUNK: usize = 8192;

/// Liveness flag and closer shared between a transport and its
/// disconnect handles.
struct Shared {
    closed: AtomicBool,
    closer: Box<dyn Closer>,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the connection unless someone already did.
    /// Returns true for the single caller that performed the close.
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.closer.close() {
            debug!(error = %e, "closing stream failed");
        }
        true
    }
}

/// Closes a [`Transport`] from another thread.
///
/// An operation blocked on the connection wakes up and fails with
/// `ConnectionClosed`.
#[derive(Clone)]
pub struct DisconnectHandle {
    shared: Arc<Shared>,
}

impl DisconnectHandle {
    pub fn disconnect(&self) {
        if self.shared.close() {
            debug!("transport disconnected by handle");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

/// A synchronous transport owning exactly one byte-stream connection.
///
/// Every operation is all-or-nothing: it either completes or returns an
/// error. Once disconnected, every operation fails with
/// [`TransportError::ConnectionClosed`]; a new transport is needed to
/// reconnect. The connection is closed when the transport is dropped.
pub struct Transport<S: Stream> {
    stream: Option<S>,
    shared: Arc<Shared>,
    config: TransportConfig,
}

impl<S: Stream> Transport<S> {
    /// Wrap a connected stream, applying `timeout` to its reads and writes.
    pub fn new(stream: S, timeout: impl Into<Timeout>) -> Result<Self> {
        Self::with_config(stream, TransportConfig::new(timeout.into()))
    }

    pub fn with_config(mut stream: S, config: TransportConfig) -> Result<Self> {
        if !stream.is_open() {
            return Err(TransportError::InvalidHandle(
                "stream is not connected".to_string(),
            ));
        }
        stream.set_timeout(config.timeout)?;
        let closer = stream.closer()?;

        debug!(
            timeout_secs = config.timeout.seconds(),
            timeout_usecs = config.timeout.microseconds(),
            "transport ready"
        );
        Ok(Transport {
            stream: Some(stream),
            shared: Arc::new(Shared {
                closed: AtomicBool::new(false),
                closer: Box::new(closer),
            }),
            config,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed() && self.stream.as_ref().is_some_and(|s| s.is_open())
    }

    pub fn disconnect_handle(&self) -> DisconnectHandle {
        DisconnectHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Write all of `data`.
    ///
    /// Short writes are continued from where they stopped. A call that
    /// accepts zero bytes counts against `write_retry_limit`; the count
    /// covers the whole call and is not reset by progress.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let limit = self.config.write_retry_limit;
        let shared = &self.shared;
        let stream = live(&mut self.stream, shared)?;

        let mut remaining = data;
        let mut stalls = 0;
        while !remaining.is_empty() && stalls < limit {
            if shared.is_closed() {
                return Err(TransportError::ConnectionClosed);
            }
            match stream.write(remaining) {
                Ok(0) => {
                    stalls += 1;
                    trace!(stalls, remaining = remaining.len(), "zero-byte write");
                }
                Ok(n) => remaining = &remaining[n.min(remaining.len())..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::from_io(e, shared.is_closed())),
            }
        }

        if !remaining.is_empty() {
            let written = data.len() - remaining.len();
            warn!(written, remaining = remaining.len(), stalls, "write gave up");
            return Err(TransportError::WriteFailed {
                written,
                remaining: remaining.len(),
            });
        }
        Ok(())
    }

    /// Read exactly `length` bytes.
    ///
    /// Zero-byte reads are retried without limit; only the socket timeout
    /// or a disconnect ends a stalled read. The buffer grows as bytes
    /// arrive, so `length` is never allocated up front. After an error the
    /// bytes already consumed are lost and the stream position is
    /// unspecified; reconnect before issuing further commands.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        let shared = &self.shared;
        let stream = live(&mut self.stream, shared)?;

        let mut buffer = Vec::with_capacity(length.min(READ_CHUNK));
        let mut chunk = [0u8; READ_CHUNK];
        let mut stalled = false;
        while buffer.len() < length {
            if shared.is_closed() {
                return Err(TransportError::ConnectionClosed);
            }
            let want = (length - buffer.len()).min(READ_CHUNK);
            match stream.read(&mut chunk[..want]) {
                Ok(0) => {
                    if !stalled {
                        trace!(filled = buffer.len(), length, "zero-byte read, retrying");
                        stalled = true;
                    }
                    thread::yield_now();
                }
                Ok(n) => buffer.extend_from_slice(&chunk[..n.min(want)]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(TransportError::from_io(e, shared.is_closed())),
            }
        }
        Ok(buffer)
    }

    /// Read the next line with trailing whitespace (terminator included)
    /// removed. Lines longer than `max_line_length` are cut at the bound.
    ///
    /// If the call fails part way through a line (a timeout, say), the
    /// partial line is discarded and the next call starts mid-line. Treat
    /// any `Io` error as the end of the session and reconnect.
    pub fn get_line(&mut self) -> Result<String> {
        let limit = self.config.max_line_length;
        let shared = &self.shared;
        let stream = live(&mut self.stream, shared)?;

        let mut line = Vec::new();
        match stream.read_line(&mut line, limit) {
            Ok(0) if shared.is_closed() => return Err(TransportError::ConnectionClosed),
            Ok(0) => {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection ended before a line was read",
                )))
            }
            Ok(_) => {}
            Err(e) => return Err(TransportError::from_io(e, shared.is_closed())),
        }

        let end = line
            .iter()
            .rposition(|&b| !is_trailing_space(b))
            .map_or(0, |i| i + 1);
        line.truncate(end);
        String::from_utf8(line)
            .map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Close the connection. Safe to call any number of times.
    pub fn disconnect(&mut self) {
        if self.shared.close() {
            debug!("transport disconnected");
        }
        self.stream = None;
    }
}

impl<S: Stream> Drop for Transport<S> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// The stream, if it may still be used.
fn live<'a, S: Stream>(stream: &'a mut Option<S>, shared: &Shared) -> Result<&'a mut S> {
    if shared.is_closed() {
        // closed through a handle: release the descriptor now
        *stream = None;
        return Err(TransportError::ConnectionClosed);
    }
    match stream {
        Some(s) if s.is_open() => Ok(s),
        _ => Err(TransportError::ConnectionClosed),
    }
}

fn is_trailing_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\0' | 0x0b)
}
