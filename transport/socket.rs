// OS socket streams: TCP, Unix-domain and raw descriptors
//
// All kinds share one buffered implementation. Reads go through a BufReader so
// that line reads and exact-length reads consume the same byte sequence;
// writes bypass it and hit the socket directly.
use crate::config::Timeout;
use crate::error::{Result, TransportError};
use crate::sys::{self, FdCloser};
use crate::traits::Stream;
use nix::sys::socket::AddressFamily;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::UnixStream;

/// A connected OS socket with read-side buffering
pub struct Socket<T> {
    inner: BufReader<T>,
}

pub type TcpSocket = Socket<TcpStream>;
pub type UnixSocket = Socket<UnixStream>;

impl<T: Read> Socket<T> {
    pub fn new(stream: T) -> Self {
        Socket {
            inner: BufReader::new(stream),
        }
    }

    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Bytes received from the OS but not yet handed out
    pub fn buffered(&self) -> usize {
        self.inner.buffer().len()
    }
}

impl<T: Read> From<T> for Socket<T> {
    fn from(stream: T) -> Self {
        Socket::new(stream)
    }
}

impl<T: AsFd> AsFd for Socket<T> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.get_ref().as_fd()
    }
}

impl<T> Stream for Socket<T>
where
    T: Read + Write + AsFd + Send,
{
    type Closer = FdCloser;

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.inner.get_mut().write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize> {
        self.inner
            .by_ref()
            .take(limit as u64)
            .read_until(b'\n', buf)
    }

    fn set_timeout(&mut self, timeout: Timeout) -> io::Result<()> {
        sys::set_timeout(&*self, timeout)
    }

    fn is_open(&self) -> bool {
        sys::is_connected(self)
    }

    fn closer(&self) -> io::Result<FdCloser> {
        FdCloser::duplicate(self)
    }
}

/// A stream socket of whichever kind a raw descriptor turns out to be
pub enum AnySocket {
    Tcp(TcpSocket),
    Unix(UnixSocket),
}

impl AnySocket {
    /// Adopt a descriptor that must be a connected stream socket.
    ///
    /// Datagram sockets, listening or unconnected sockets and non-socket
    /// descriptors fail with `InvalidHandle`; the descriptor is closed.
    pub fn from_fd(fd: OwnedFd) -> Result<Self> {
        let family = sys::stream_family(&fd).map_err(TransportError::InvalidHandle)?;
        match family {
            AddressFamily::Inet | AddressFamily::Inet6 => {
                Ok(AnySocket::Tcp(Socket::new(TcpStream::from(fd))))
            }
            AddressFamily::Unix => Ok(AnySocket::Unix(Socket::new(UnixStream::from(fd)))),
            other => Err(TransportError::InvalidHandle(format!(
                "unsupported address family {:?}",
                other
            ))),
        }
    }

    fn stream(&mut self) -> &mut dyn Stream<Closer = FdCloser> {
        match self {
            AnySocket::Tcp(s) => s,
            AnySocket::Unix(s) => s,
        }
    }
}

impl AsFd for AnySocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            AnySocket::Tcp(s) => s.as_fd(),
            AnySocket::Unix(s) => s.as_fd(),
        }
    }
}

impl Stream for AnySocket {
    type Closer = FdCloser;

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.stream().write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream().read(buf)
    }

    fn read_line(&mut self, buf: &mut Vec<u8>, limit: usize) -> io::Result<usize> {
        self.stream().read_line(buf, limit)
    }

    fn set_timeout(&mut self, timeout: Timeout) -> io::Result<()> {
        sys::set_timeout(&*self, timeout)
    }

    fn is_open(&self) -> bool {
        sys::is_connected(self)
    }

    fn closer(&self) -> io::Result<FdCloser> {
        FdCloser::duplicate(self)
    }
}
