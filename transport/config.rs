// Transport configuration: socket timeout and partial-I/O limits
use std::time::Duration;

/// Zero-byte stalls tolerated by a single `write` call
pub const DEFAULT_WRITE_RETRY_LIMIT: u32 = 10;

/// Upper bound on a single line read, terminator included.
///
/// The whole bound is usable: a line of 8192 bytes is returned intact,
/// whereas C-style bounded reads (`fgets` and friends) stop one byte
/// short, at 8191, to leave room for a NUL.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8192;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MICROS_PER_SEC: u32 = 1_000_000;

/// Blocking timeout applied to the socket, split into whole seconds and
/// microseconds.
///
/// A zero timeout means blocking calls never time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timeout {
    seconds: u64,
    microseconds: u32,
}

impl Timeout {
    /// No timeout: block until the call completes
    pub const NONE: Timeout = Timeout {
        seconds: 0,
        microseconds: 0,
    };

    /// Build a timeout; microseconds past one second carry into `seconds`.
    pub fn new(seconds: u64, microseconds: u32) -> Self {
        Timeout {
            seconds: seconds.saturating_add(u64::from(microseconds / MICROS_PER_SEC)),
            microseconds: microseconds % MICROS_PER_SEC,
        }
    }

    pub fn from_secs(seconds: u64) -> Self {
        Timeout::new(seconds, 0)
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn microseconds(&self) -> u32 {
        self.microseconds
    }

    pub fn is_none(&self) -> bool {
        self.seconds == 0 && self.microseconds == 0
    }

    /// The timeout as a `Duration`, or `None` when unlimited
    pub fn as_duration(&self) -> Option<Duration> {
        if self.is_none() {
            None
        } else {
            Some(Duration::new(self.seconds, self.microseconds * 1_000))
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::new(duration.as_secs(), duration.subsec_micros())
    }
}

/// Configuration for a [`Transport`](crate::Transport)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Applied to reads and writes at construction
    pub timeout: Timeout,

    /// Total zero-byte stalls allowed per `write` before `WriteFailed`
    pub write_retry_limit: u32,

    /// Bound passed to each line read
    pub max_line_length: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Timeout::from_secs(DEFAULT_TIMEOUT_SECS),
            write_retry_limit: DEFAULT_WRITE_RETRY_LIMIT,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl TransportConfig {
    pub fn new(timeout: Timeout) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Set the socket timeout
    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Set the zero-byte write stall budget
    pub fn with_write_retry_limit(mut self, limit: u32) -> Self {
        self.write_retry_limit = limit;
        self
    }

    /// Set the line read bound (at least one byte)
    pub fn with_max_line_length(mut self, length: usize) -> Self {
        self.max_line_length = length.max(1);
        self
    }
}
