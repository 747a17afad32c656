//! The blocking request/response byte channel to the peer.
//!
//! A tagged union of two transports, per the "tagged union of transports"
//! design note: `Socket` (TCP or UNIX-domain stream) and `Pipes` (a pair of
//! inherited file descriptors), behind one [`Transport::exchange`] method.

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::unix::io::FromRawFd;
use std::os::unix::net::UnixStream;

use tracing::{debug, trace};

use crate::error::TransportError;

/// Messages are bounded; chosen generously above any real signal list's
/// request/response size.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// A single synchronous request/response exchange with the peer.
///
/// Implementations send `request`, then block for the response. An empty
/// return value means the peer closed the channel ("0 bytes"
/// case, surfaced to the host as `END`); an `Err` is a non-recoverable I/O
/// error.
pub trait Transport {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// TCP or UNIX-domain stream socket, selected by whether `PEER_SOCKET`
/// contains a `:`.
enum Stream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

pub struct SocketTransport {
    stream: Stream,
}

impl SocketTransport {
    /// Connects a TCP stream to `host:port`. Name resolution uses the first
    /// returned address.
    pub fn connect_tcp(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        debug!(addr, "connected TCP peer socket");
        Ok(SocketTransport {
            stream: Stream::Tcp(stream),
        })
    }

    /// Connects a UNIX-domain stream socket at `path`, unlinking any stale
    /// binding left at that path first (the peer owns and binds it; a prior
    /// crashed run can leave the inode behind).
    pub fn connect_unix(path: &str) -> Result<Self, TransportError> {
        let _ = std::fs::remove_file(path);
        let stream = UnixStream::connect(path)?;
        debug!(path, "connected UNIX peer socket");
        Ok(SocketTransport {
            stream: Stream::Unix(stream),
        })
    }
}

impl Transport for SocketTransport {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        match &mut self.stream {
            Stream::Tcp(s) => exchange_on(s, request),
            Stream::Unix(s) => exchange_on(s, request),
        }
    }
}

/// Inherited pipe file descriptors used as read/write endpoints
/// (`PEER_READ_PIPE`/`PEER_WRITE_PIPE`).
pub struct PipeTransport {
    read: File,
    write: File,
}

impl PipeTransport {
    /// # Safety
    ///
    /// `read_fd` and `write_fd` must be valid, open file descriptors owned
    /// by no one else; they are consumed by the returned `PipeTransport`.
    pub unsafe fn from_raw_fds(read_fd: i32, write_fd: i32) -> Self {
        PipeTransport {
            read: File::from_raw_fd(read_fd),
            write: File::from_raw_fd(write_fd),
        }
    }
}

impl Transport for PipeTransport {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        if let Err(e) = write_request(&mut self.write, request) {
            return map_write_error(e);
        }
        read_response(&mut self.read)
    }
}

fn exchange_on<S: Read + Write>(
    stream: &mut S,
    request: &[u8],
) -> Result<Vec<u8>, TransportError> {
    if let Err(e) = write_request(stream, request) {
        return map_write_error(e);
    }
    read_response(stream)
}

fn write_request<W: Write>(w: &mut W, request: &[u8]) -> io::Result<()> {
    trace!(bytes = request.len(), "sending request");
    w.write_all(request)
}

/// A write failure with a broken-peer indication collapses to "0 bytes"
/// (end of session); any other error propagates.
fn map_write_error(e: io::Error) -> Result<Vec<u8>, TransportError> {
    if e.kind() == io::ErrorKind::BrokenPipe {
        debug!("peer pipe broken on write, treating as session end");
        Ok(Vec::new())
    } else {
        Err(TransportError::Io(e))
    }
}

fn read_response<R: Read>(r: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut buf = vec![0u8; MAX_MESSAGE_LEN];
    let n = r.read(&mut buf)?;
    buf.truncate(n);
    trace!(bytes = n, "received response");
    Ok(buf)
}
