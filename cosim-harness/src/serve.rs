//! A minimal scripted peer: stands in for the external driver process so
//! `cosim-plugin`/`cosim-core` can be exercised end-to-end without a real
//! VHDL simulator.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;
use tracing::{debug, info};

#[derive(StructOpt, Debug)]
pub struct ServeOpt {
    /// Address to listen on: `host:port` for TCP, a filesystem path for a
    /// UNIX-domain socket (matches the two `PEER_SOCKET` forms).
    #[structopt(long)]
    listen: String,

    /// Optional script file: one verbatim response line per update round,
    /// sent in order. Once exhausted, the connection is closed (simulating
    /// peer shutdown). Without a script, every update round is acknowledged
    /// by echoing the request's peer time back with no value changes,
    /// which keeps the session alive on delta cycles indefinitely.
    #[structopt(long, parse(from_os_str))]
    script: Option<PathBuf>,
}

pub fn run(opt: ServeOpt) -> Result<()> {
    let script: Vec<String> = match &opt.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading script file {path:?}"))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    if opt.listen.contains(':') {
        let listener = TcpListener::bind(&opt.listen)
            .with_context(|| format!("binding TCP listener on {:?}", opt.listen))?;
        info!(addr = %opt.listen, "listening for TCP peer connection");
        let (stream, peer) = listener.accept().context("accepting TCP connection")?;
        info!(%peer, "accepted TCP connection");
        serve_connection(stream, script)
    } else {
        let _ = fs::remove_file(&opt.listen);
        let listener = UnixListener::bind(&opt.listen)
            .with_context(|| format!("binding UNIX listener on {:?}", opt.listen))?;
        info!(path = %opt.listen, "listening for UNIX peer connection");
        let (stream, _) = listener.accept().context("accepting UNIX connection")?;
        info!("accepted UNIX connection");
        serve_connection(stream, script)
    }
}

/// Runs the handshake then the update-round loop over one already-accepted
/// connection. `stream` plays both ends of the blocking request/response
/// exchange the transport side of `cosim-core` performs, so no cloning or
/// concurrent read/write is needed -- the protocol is strictly serialized.
fn serve_connection<S: Read + Write>(mut stream: S, script: Vec<String>) -> Result<()> {
    let mut buf = [0u8; 4096];

    for step in ["FROM", "TO", "START"] {
        let n = stream.read(&mut buf).context("reading handshake request")?;
        if n == 0 {
            bail!("peer closed before handshake completed at {step}");
        }
        debug!(step, request = %String::from_utf8_lossy(&buf[..n]), "handshake step");
        stream.write_all(b"OK").context("writing handshake ack")?;
    }
    info!("handshake complete");

    let mut script = script.into_iter();
    loop {
        let n = stream.read(&mut buf).context("reading update request")?;
        if n == 0 {
            info!("client closed the channel");
            return Ok(());
        }
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        debug!(request = %request, "update request");

        let response = match script.next() {
            Some(line) => line,
            None => match echo_peer_time(&request) {
                Some(echo) => echo,
                None => {
                    info!("script exhausted and request carried no peer time; closing");
                    return Ok(());
                }
            },
        };
        debug!(response = %response, "update response");
        stream
            .write_all(response.as_bytes())
            .context("writing update response")?;
    }
}

/// Builds a no-op response that echoes the request's leading peer-time
/// token back unchanged and offers no value changes, keeping the session
/// alive on delta cycles.
fn echo_peer_time(request: &str) -> Option<String> {
    let peer_time = request.split_whitespace().next()?;
    Some(format!("{peer_time} "))
}
