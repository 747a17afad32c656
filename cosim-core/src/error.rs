//! Error types surfaced by this crate.
//!
//! Every error kind here corresponds to a row in the error-handling table of
//! the bridge's design notes: each one terminates the session, there is no
//! retry policy.

use std::io;

use crate::signal::Direction;

/// Failures that can occur while reading the `PEER_SOCKET` /
/// `PEER_READ_PIPE` / `PEER_WRITE_PIPE` environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither `PEER_SOCKET` nor the pipe-descriptor pair was set.
    #[error("no peer transport configured: set PEER_SOCKET or PEER_READ_PIPE/PEER_WRITE_PIPE")]
    Missing,

    /// `PEER_READ_PIPE`/`PEER_WRITE_PIPE` were present but not parseable as
    /// file descriptors.
    #[error("{var} is not a valid file descriptor: {value:?}")]
    InvalidPipeFd { var: &'static str, value: String },

    /// `PEER_SOCKET` named a host:port pair that could not be resolved.
    #[error("failed to resolve peer socket address {addr:?}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Failures parsing the `FROM`/`TO` signal-list strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Number of names did not match the number of widths, or the string
    /// was otherwise malformed.
    #[error("malformed signal list: {0:?}")]
    Malformed(String),

    /// A width token was not a positive integer.
    #[error("signal {name:?} has a non-positive or non-numeric width: {token:?}")]
    InvalidWidth { name: String, token: String },
}

/// Failures in the packer/unpacker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    /// A wire character was neither a valid hex digit nor `_`.
    #[error("invalid character {ch:?} in hex value {text:?}")]
    InvalidHexChar { text: String, ch: char },

    /// A descriptor held a non-strict logic value (not `0`/`1`) at render
    /// time; hex rendering cannot represent it unambiguously.
    #[error("signal {descriptor:?} contains a non-binary value at bit {bit_index} and cannot be rendered as hex")]
    NonBinaryOutput { descriptor: String, bit_index: usize },

    /// A raw host byte did not map to one of the nine logic values.
    #[error("byte {0:#x} is not a valid nine-valued logic digit")]
    InvalidLogicByte(u8),
}

/// Failures in the session controller / protocol layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Handshake response lacked the affirmative `'O'`/`'K'` prefix.
    #[error("peer rejected handshake: {0:?}")]
    NegativeAck(String),

    /// A response could not be parsed as `<peer_time> [<name> <hex>]*`.
    #[error("malformed response: {0:?}")]
    Malformed(String),

    /// The echoed descriptor name at position `index` did not match the
    /// positionally-bound `FROM_SET` descriptor.
    #[error("response value {index} named {echoed:?}, expected {expected:?}")]
    NameMismatch {
        index: usize,
        expected: String,
        echoed: String,
    },

    /// A configured set's vector changed direction or length between
    /// update rounds.
    #[error("inconsistent vector for set: expected {expected_len} bits in {expected_dir:?}, got {actual_len} bits in {actual_dir:?}")]
    InconsistentVector {
        expected_len: usize,
        expected_dir: Direction,
        actual_len: usize,
        actual_dir: Direction,
    },

    /// `startup` was invoked a second time on an already-initialized
    /// session.
    #[error("session already initialized")]
    AlreadyInitialized,
}

/// Transport-layer failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error on peer transport: {0}")]
    Io(#[from] io::Error),
}

/// The union of everything that can cause a session to fail.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
