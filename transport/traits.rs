// Stream abstraction - the byte-stream handle a Transport drives
use crate::config::Timeout;
use std::io::Result;

/// A connected, bidirectional byte stream.
///
/// Calls may complete partially: `write` and `read` report how many bytes
/// they moved and may legitimately report zero.
pub trait Stream: Send {
    /// Closes this stream from any thread.
    type Closer: Closer;

    /// Write some prefix of `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read at most `buf.len()` bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Append bytes up to and including the next `\n` to `buf`, reading at
    /// most `limit` bytes. Returns the number of bytes appended; zero means
    /// end of stream.
    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> Result<usize>;

    /// Bound how long blocking reads and writes may wait.
    fn set_timeout(&mut self, timeout: Timeout) -> Result<()>;

    /// Whether the handle is still a live, connected stream.
    fn is_open(&self) -> bool;

    /// A closer bound to the same underlying connection.
    fn closer(&self) -> Result<Self::Closer>;
}

/// Closes a connection, possibly while another thread is blocked on it.
pub trait Closer: Send + Sync + 'static {
    fn close(&self) -> Result<()>;
}
