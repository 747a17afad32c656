//! Replays a captured request/response transcript and pretty-prints the
//! decoded handshake and update-round frames -- the read-only counterpart
//! to `serve`, useful when debugging a captured session log.
//!
//! Transcript format: one frame per line, prefixed `C: ` for a
//! client-to-peer request or `S: ` for the peer's response, in the order
//! they were exchanged.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cosim_core::protocol::{is_affirmative, parse_update_response, ResponseValue};
use serde::Serialize;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub struct DumpOpt {
    /// Transcript file to replay.
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Emit each frame as one line of JSON instead of human-readable text.
    #[structopt(long)]
    json: bool,
}

pub fn run(opt: DumpOpt) -> Result<()> {
    let text = fs::read_to_string(&opt.file)
        .with_context(|| format!("reading transcript {:?}", opt.file))?;

    let mut round = 0usize;
    for line in text.lines() {
        let frame = if let Some(body) = line.strip_prefix("C: ") {
            round += 1;
            classify_request(round, body)
        } else if let Some(body) = line.strip_prefix("S: ") {
            classify_response(body)
        } else {
            // Blank lines and anything without a C:/S: prefix are comments.
            continue;
        };

        if opt.json {
            emit_json(&frame);
        } else {
            print_frame(&frame);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
enum Frame {
    HandshakeRequest { round: usize, step: &'static str, body: String },
    HandshakeAck { body: String },
    UpdateRequest { round: usize, peer_time: u64, values: Vec<ResponseValue> },
    UpdateResponse { peer_time: u64, values: Vec<ResponseValue> },
    Unparsed { direction: &'static str, body: String },
}

/// Classifies one `C: `-prefixed transcript line. `round` is the 1-based
/// ordinal of this request among the transcript's client frames.
fn classify_request(round: usize, body: &str) -> Frame {
    if let Some(rest) = body.strip_prefix("FROM ") {
        Frame::HandshakeRequest { round, step: "FROM", body: rest.to_string() }
    } else if let Some(rest) = body.strip_prefix("TO ") {
        Frame::HandshakeRequest { round, step: "TO", body: rest.to_string() }
    } else if body.trim_start().starts_with("START") {
        Frame::HandshakeRequest { round, step: "START", body: String::new() }
    } else {
        match parse_update_response(body) {
            Ok((peer_time, values)) => Frame::UpdateRequest { round, peer_time, values },
            Err(_) => Frame::Unparsed { direction: "->", body: body.to_string() },
        }
    }
}

/// Classifies one `S: `-prefixed transcript line: either a bare handshake
/// acknowledgement or an update-round response, which share the
/// `"<peer_time'> [<name> <hexval> ]*"` grammar with the request side.
fn classify_response(body: &str) -> Frame {
    if is_affirmative(body.as_bytes()) {
        Frame::HandshakeAck { body: body.to_string() }
    } else {
        match parse_update_response(body) {
            Ok((peer_time, values)) => Frame::UpdateResponse { peer_time, values },
            Err(_) => Frame::Unparsed { direction: "<-", body: body.to_string() },
        }
    }
}

fn emit_json(frame: &Frame) {
    match serde_json::to_string(frame) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("failed to serialize frame: {e}"),
    }
}

fn print_frame(frame: &Frame) {
    match frame {
        Frame::HandshakeRequest { round, step, body } => {
            println!("[{round}] -> handshake {step:<5} {body}");
        }
        Frame::HandshakeAck { body } => println!("      <- ack {body:?}"),
        Frame::UpdateRequest { round, peer_time, values } => {
            println!("[{round}] -> update peer_time={peer_time}");
            for v in values {
                println!("          {} = {}", v.name, v.hex);
            }
        }
        Frame::UpdateResponse { peer_time, values } => {
            println!("      <- update peer_time'={peer_time}");
            for v in values {
                println!("          {} = {}", v.name, v.hex);
            }
        }
        Frame::Unparsed { direction, body } => println!("      {direction} {body:?} (unparsed)"),
    }
}
