// Low-level socket helpers shared by every OS-backed stream
use crate::config::Timeout;
use crate::traits::Closer;
use nix::errno::Errno;
use nix::sys::socket::{
    getpeername, getsockname, getsockopt, setsockopt, shutdown, sockopt, AddressFamily, Shutdown,
    SockType, SockaddrLike, SockaddrStorage,
};
use nix::sys::time::TimeVal;
use std::io::Result;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};

/// Apply `timeout` to both directions (SO_RCVTIMEO / SO_SNDTIMEO).
pub(crate) fn set_timeout<F: AsFd>(fd: &F, timeout: Timeout) -> Result<()> {
    let seconds = libc::time_t::try_from(timeout.seconds()).unwrap_or(libc::time_t::MAX);
    let tv = TimeVal::new(seconds, timeout.microseconds() as libc::suseconds_t);
    setsockopt(fd, sockopt::ReceiveTimeout, &tv)?;
    setsockopt(fd, sockopt::SendTimeout, &tv)?;
    Ok(())
}

/// True while the descriptor is a socket with a connected peer.
pub(crate) fn is_connected<F: AsFd>(fd: &F) -> bool {
    getpeername::<SockaddrStorage>(fd.as_fd().as_raw_fd()).is_ok()
}

/// Check that `fd` is a connected stream socket and report its family.
pub(crate) fn stream_family<F: AsFd>(fd: &F) -> std::result::Result<AddressFamily, String> {
    match getsockopt(fd, sockopt::SockType) {
        Ok(SockType::Stream) => {}
        Ok(other) => return Err(format!("expected a stream socket, got {:?}", other)),
        Err(Errno::ENOTSOCK) => return Err("descriptor is not a socket".to_string()),
        Err(e) => return Err(format!("cannot inspect descriptor: {}", e)),
    }

    let local = getsockname::<SockaddrStorage>(fd.as_fd().as_raw_fd())
        .map_err(|e| format!("cannot read socket address: {}", e))?;
    let family = local
        .family()
        .ok_or_else(|| "socket has no address family".to_string())?;

    if !is_connected(fd) {
        return Err("socket is not connected".to_string());
    }
    Ok(family)
}

/// Shuts a connection down through a duplicated descriptor.
///
/// Shutdown wakes any thread blocked on the connection. The duplicate keeps
/// the descriptor number reserved until the closer itself is dropped.
#[derive(Debug)]
pub struct FdCloser {
    fd: OwnedFd,
}

impl FdCloser {
    pub(crate) fn duplicate<F: AsFd>(fd: &F) -> Result<Self> {
        Ok(FdCloser {
            fd: fd.as_fd().try_clone_to_owned()?,
        })
    }
}

impl Closer for FdCloser {
    fn close(&self) -> Result<()> {
        match shutdown(self.fd.as_raw_fd(), Shutdown::Both) {
            // peer already gone
            Ok(()) | Err(Errno::ENOTCONN) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
