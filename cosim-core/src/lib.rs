//! Protocol, signal-mapping, and time-advance engine for a byte-stream
//! co-simulation bridge between a VHDL simulator and an external
//! hardware-description runtime.
//!
//! This crate is transport- and FFI-agnostic: it owns the wire grammar, the
//! nine-valued logic representation, the signal descriptor tables, and the
//! session state machine, but knows nothing about VHPI, dynamic loading, or
//! command-line interfaces -- those live in `cosim-plugin` and
//! `cosim-harness`.

pub mod config;
pub mod error;
pub mod logic;
pub mod packer;
pub mod protocol;
pub mod session;
pub mod signal;
pub mod time;
pub mod transport;

pub use config::transport_from_env;
pub use error::{ConfigError, PackError, ParseError, ProtocolError, SessionError, TransportError};
pub use logic::{Direction, LogicBit, LogicVector};
pub use session::{Session, UpdateOutcome};
pub use signal::{Flags, SignalDescriptor, SignalSet};
pub use time::{TimeModel, TimeState};
pub use transport::{PipeTransport, SocketTransport, Transport, MAX_MESSAGE_LEN};
