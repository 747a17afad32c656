//! Offline development tool for the cosimulation bridge: a scripted peer
//! stub (`serve`) standing in for the external driver process, and a
//! transcript pretty-printer (`dump`) for debugging a captured session log.
//! Neither is loaded by the simulator; both exist purely to exercise
//! `cosim-core`/`cosim-plugin` without a real VHDL toolchain, the way the
//! teacher's `itm-decode` exercises a decoder without a live trace probe.

mod dump;
mod serve;

use anyhow::Result;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(about = "Development harness for the cosimulation bridge protocol")]
enum Opt {
    /// Accept one connection, acknowledge the handshake, and answer each
    /// update round from a script (or echo the peer time back unchanged).
    Serve(serve::ServeOpt),

    /// Replay a captured request/response transcript and pretty-print the
    /// decoded handshake and update-round frames.
    Dump(dump::DumpOpt),
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match Opt::from_args() {
        Opt::Serve(opt) => serve::run(opt),
        Opt::Dump(opt) => dump::run(opt),
    }
}
