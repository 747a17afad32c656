//! Environment-variable configuration: `PEER_SOCKET` takes
//! precedence over the `PEER_READ_PIPE`/`PEER_WRITE_PIPE` pair; absence of
//! both is `ConfigError::Missing`.

use std::env;

use tracing::info;

use crate::error::ConfigError;
use crate::transport::{PipeTransport, SocketTransport, Transport};

const VAR_SOCKET: &str = "PEER_SOCKET";
const VAR_READ_PIPE: &str = "PEER_READ_PIPE";
const VAR_WRITE_PIPE: &str = "PEER_WRITE_PIPE";

/// Builds the configured [`Transport`] by reading the environment once at
/// startup, evaluated only from [`cosim_core::Session::startup`](crate::Session::startup).
pub fn transport_from_env() -> Result<Box<dyn Transport>, ConfigError> {
    if let Ok(addr) = env::var(VAR_SOCKET) {
        return connect_socket(&addr);
    }

    let read = env::var(VAR_READ_PIPE).ok();
    let write = env::var(VAR_WRITE_PIPE).ok();
    match (read, write) {
        (Some(r), Some(w)) => connect_pipes(&r, &w),
        _ => Err(ConfigError::Missing),
    }
}

fn connect_socket(addr: &str) -> Result<Box<dyn Transport>, ConfigError> {
    if addr.contains(':') {
        info!(addr, "connecting TCP peer socket");
        let t = SocketTransport::connect_tcp(addr).map_err(|e| ConfigError::Resolve {
            addr: addr.to_string(),
            source: io_source(e),
        })?;
        Ok(Box::new(t))
    } else {
        info!(path = addr, "connecting UNIX peer socket");
        let t = SocketTransport::connect_unix(addr).map_err(|e| ConfigError::Resolve {
            addr: addr.to_string(),
            source: io_source(e),
        })?;
        Ok(Box::new(t))
    }
}

fn connect_pipes(read: &str, write: &str) -> Result<Box<dyn Transport>, ConfigError> {
    let read_fd: i32 = read.parse().map_err(|_| ConfigError::InvalidPipeFd {
        var: VAR_READ_PIPE,
        value: read.to_string(),
    })?;
    let write_fd: i32 = write.parse().map_err(|_| ConfigError::InvalidPipeFd {
        var: VAR_WRITE_PIPE,
        value: write.to_string(),
    })?;
    info!(read_fd, write_fd, "using inherited pipe descriptors");
    // SAFETY: the host process is contractually responsible for handing us
    // valid, exclusively-owned descriptors via these environment variables.
    let transport = unsafe { PipeTransport::from_raw_fds(read_fd, write_fd) };
    Ok(Box::new(transport))
}

fn io_source(e: crate::error::TransportError) -> std::io::Error {
    match e {
        crate::error::TransportError::Io(io) => io,
    }
}
