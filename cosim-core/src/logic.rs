//! Nine-valued logic and the host's contiguous vector representation.
//!
//! All direction-dependent bit indexing funnels through
//! [`storage_offset`], the one function that knows how a descriptor's
//! declared MSB-to-LSB bit order maps onto the host vector's storage array.

use std::convert::TryFrom;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One nine-valued logic digit, in the order the host byte encoding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum LogicBit {
    /// Uninitialized.
    U = 0,
    /// Unknown/forcing.
    X = 1,
    /// Forcing 0.
    Zero = 2,
    /// Forcing 1.
    One = 3,
    /// High impedance.
    Z = 4,
    /// Weak unknown.
    W = 5,
    /// Weak 0.
    L = 6,
    /// Weak 1.
    H = 7,
    /// Don't care.
    DontCare = 8,
}

impl LogicBit {
    /// The wire/display character for this value.
    pub fn as_char(self) -> char {
        match self {
            LogicBit::U => 'U',
            LogicBit::X => 'X',
            LogicBit::Zero => '0',
            LogicBit::One => '1',
            LogicBit::Z => 'Z',
            LogicBit::W => 'W',
            LogicBit::L => 'L',
            LogicBit::H => 'H',
            LogicBit::DontCare => '-',
        }
    }

    /// Whether this value is one of the two strict binary values `0`/`1`.
    /// Only strict values can be rendered unambiguously as hex.
    pub fn is_strict(self) -> bool {
        matches!(self, LogicBit::Zero | LogicBit::One)
    }

    /// `true` for [`LogicBit::One`], `false` for everything else. Callers
    /// must check [`is_strict`](Self::is_strict) first if the distinction
    /// between `0` and a non-binary value matters.
    pub fn as_bool_lossy(self) -> bool {
        matches!(self, LogicBit::One | LogicBit::H)
    }

    /// Maps a strict boolean bit to `0`/`1`. Used when expanding wire hex
    /// nibbles back into logic digits ( `apply`).
    pub fn from_bool(bit: bool) -> LogicBit {
        if bit {
            LogicBit::One
        } else {
            LogicBit::Zero
        }
    }
}

impl TryFrom<u8> for LogicBit {
    type Error = crate::error::PackError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => LogicBit::U,
            1 => LogicBit::X,
            2 => LogicBit::Zero,
            3 => LogicBit::One,
            4 => LogicBit::Z,
            5 => LogicBit::W,
            6 => LogicBit::L,
            7 => LogicBit::H,
            8 => LogicBit::DontCare,
            other => return Err(crate::error::PackError::InvalidLogicByte(other)),
        })
    }
}

impl From<LogicBit> for u8 {
    fn from(bit: LogicBit) -> u8 {
        bit as u8
    }
}

impl fmt::Display for LogicBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Which end of the host's declared range holds storage index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// `TO_LEFT`: storage index 0 is the left-most declared bit (VHDL `to`).
    ToLeft,
    /// `TO_RIGHT`: storage index 0 is the right-most declared bit (VHDL `downto`).
    ToRight,
}

/// The host-supplied contiguous storage for one signal set: one
/// [`LogicBit`] per bit, bounded by `direction`.
#[derive(Debug, Clone)]
pub struct LogicVector {
    bits: Vec<LogicBit>,
    direction: Direction,
}

impl LogicVector {
    pub fn new(bits: Vec<LogicBit>, direction: Direction) -> Self {
        LogicVector { bits, direction }
    }

    /// Builds a vector of all-`U` bits of the given length, used to seed a
    /// freshly-configured `FROM_SET`'s `dataout` before the first apply.
    pub fn uninitialized(length: usize, direction: Direction) -> Self {
        LogicVector::new(vec![LogicBit::U; length], direction)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn as_slice(&self) -> &[LogicBit] {
        &self.bits
    }

    pub fn as_mut_slice(&mut self) -> &mut [LogicBit] {
        &mut self.bits
    }

    /// Reads the bit at declared-order position `i` (`0` = MSB) of a
    /// descriptor occupying `[lo, lo+width)`, honoring `self.direction`.
    pub fn read_bit(&self, lo: usize, width: usize, i: usize) -> LogicBit {
        self.bits[lo + storage_offset(i, self.direction, width)]
    }

    /// Writes the bit at declared-order position `i` (`0` = MSB) of a
    /// descriptor occupying `[lo, lo+width)`, honoring `self.direction`.
    pub fn write_bit(&mut self, lo: usize, width: usize, i: usize, value: LogicBit) {
        let idx = lo + storage_offset(i, self.direction, width);
        self.bits[idx] = value;
    }
}

/// Maps a descriptor's declared MSB-to-LSB bit order (`i`, `0` = MSB) to an
/// offset within its `[lo, lo+width)` slice of the host vector's storage.
///
/// `ToLeft` vectors store bits in declared order already (offset == `i`).
/// `ToRight` (`downto`) vectors store the right-most (least significant)
/// declared bit first, so the mapping reverses within the slice.
pub fn storage_offset(i: usize, direction: Direction, width: usize) -> usize {
    match direction {
        Direction::ToLeft => i,
        Direction::ToRight => width - 1 - i,
    }
}
