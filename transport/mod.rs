// Transport module: blocking byte-stream transport for the work-queue client
//
// The protocol layer above talks to a `Transport`, which owns one connected
// stream and turns its partial reads and writes into exact-length reads,
// line reads and complete writes.
pub mod blocking;
pub mod config;
pub mod error;
pub mod socket;
mod sys;
pub mod traits;

#[cfg(test)]
mod mock;

pub use blocking::*;
pub use config::*;
pub use error::*;
pub use socket::*;
pub use sys::FdCloser;
pub use traits::*;
