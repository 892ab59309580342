// Transport error types
use nix::errno::Errno;
use std::io;
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors raised by [`Transport`](crate::Transport) operations.
///
/// Every fault is surfaced as exactly one of these; nothing is retried
/// silently apart from zero-byte write stalls.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The handle given at construction is not a live byte stream
    #[error("A valid stream handle is required: {0}")]
    InvalidHandle(String),

    /// The connection was closed, locally or underneath us
    #[error("The connection was closed")]
    ConnectionClosed,

    /// The OS reported a hard error (including read/write timeouts)
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    /// The socket kept accepting zero bytes until the retry budget ran out
    #[error("Write failed: {written} bytes written, {remaining} bytes remaining")]
    WriteFailed {
        /// Bytes accepted before giving up.
        written: usize,
        /// Bytes that were never sent.
        remaining: usize,
    },
}

impl TransportError {
    /// Raw OS error code, if the error came from a system call.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Io(err) => err.raw_os_error(),
            _ => None,
        }
    }

    /// The OS error classified as an errno value.
    pub fn errno(&self) -> Option<Errno> {
        self.os_code().map(Errno::from_raw)
    }

    /// True when the error is the configured socket timeout firing.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Map an OS error to a transport error.
    ///
    /// `closed` is the liveness flag observed after the call failed: once the
    /// connection has been closed any error it provoked is reported as
    /// `ConnectionClosed`, as are descriptors that are no longer sockets.
    pub(crate) fn from_io(err: io::Error, closed: bool) -> Self {
        if closed {
            return Self::ConnectionClosed;
        }
        match err.raw_os_error() {
            Some(libc::EBADF) | Some(libc::ENOTCONN) => Self::ConnectionClosed,
            _ => Self::Io(err),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::from_io(err, false)
    }
}
