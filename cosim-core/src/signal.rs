//! The signal descriptor table: a parsed, typed view of the `FROM`/`TO`
//! signal lists, and their configuration against a host vector.

pub use crate::logic::Direction;
use crate::error::ParseError;
use crate::logic::{LogicBit, LogicVector};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-descriptor state flags. Kept as three plain booleans
/// rather than a re-implementation of the original's bitmask `FLAG_*`
/// defines -- nothing downstream needs them packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Flags {
    /// Not yet assigned a slice into a host vector.
    pub unconfigured: bool,
    /// Still carries its power-on value; re-armed for emission at `t=0`
    /// by the delta-cycle hack.
    pub initial_val: bool,
    /// Differs from the shadow value since the last round.
    pub has_changed: bool,
}

/// One named logic signal.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalDescriptor {
    // NOTE: Clone is derived so tests can snapshot a descriptor's shadow
    // value independently of the owning `SignalSet`.
    pub name: String,
    pub width: usize,
    /// Half-open bit range `[lo, hi)` into the set's host vector. `None`
    /// until [`SignalSet::configure`] assigns it.
    pub slice: Option<(usize, usize)>,
    pub flags: Flags,
    /// Last-committed value, one [`LogicBit`] per bit in declared
    /// (MSB-first) order.
    pub shadow: Vec<LogicBit>,
}

impl SignalDescriptor {
    fn new(name: String, width: usize, initial_val: bool) -> Self {
        SignalDescriptor {
            name,
            width,
            slice: None,
            flags: Flags {
                unconfigured: true,
                initial_val,
                has_changed: false,
            },
            shadow: vec![LogicBit::U; width],
        }
    }

    pub fn lo(&self) -> usize {
        self.slice.expect("descriptor not yet configured").0
    }
}

/// An ordered sequence of [`SignalDescriptor`]s: either a `FROM_SET` or a
/// `TO_SET`.
#[derive(Debug, Clone)]
pub struct SignalSet {
    descriptors: Vec<SignalDescriptor>,
    direction: Option<Direction>,
    total_width: usize,
}

impl SignalSet {
    /// Parses a whitespace-separated `<name> <width> ...` string.
    ///
    /// `initial_val` marks freshly-parsed descriptors with
    /// [`Flags::initial_val`] set; this should be `true` for a `TO_SET`
    /// (whose first emitted values are the power-on hack) and
    /// `false` for a `FROM_SET`.
    pub fn parse(input: &str, initial_val: bool) -> Result<SignalSet, ParseError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(ParseError::Malformed(input.to_string()));
        }

        let mut descriptors = Vec::with_capacity(tokens.len() / 2);
        for pair in tokens.chunks_exact(2) {
            let name = pair[0];
            let token = pair[1];
            let width: i64 = token
                .parse()
                .map_err(|_| ParseError::InvalidWidth {
                    name: name.to_string(),
                    token: token.to_string(),
                })?;
            if width <= 0 {
                return Err(ParseError::InvalidWidth {
                    name: name.to_string(),
                    token: token.to_string(),
                });
            }
            descriptors.push(SignalDescriptor::new(name.to_string(), width as usize, initial_val));
        }

        Ok(SignalSet {
            descriptors,
            direction: None,
            total_width: 0,
        })
    }

    pub fn descriptors(&self) -> &[SignalDescriptor] {
        &self.descriptors
    }

    pub fn descriptors_mut(&mut self) -> &mut [SignalDescriptor] {
        &mut self.descriptors
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn total_width(&self) -> usize {
        self.total_width
    }

    pub fn is_unconfigured(&self) -> bool {
        self.direction.is_none()
    }

    /// Find a descriptor by name, if present.
    pub fn find(&self, name: &str) -> Option<&SignalDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Assigns each descriptor a slice `[lo, hi)` into `vector` by
    /// accumulating widths from the vector's least-significant end (bit 0),
    /// copies `vector`'s direction onto the set, and clears
    /// [`Flags::unconfigured`] on every descriptor.
    ///
    /// Not idempotent: callers must check [`is_unconfigured`](Self::is_unconfigured)
    /// first, exactly as the session controller does.
    pub fn configure(&mut self, vector: &LogicVector) {
        let mut lo = 0;
        for d in &mut self.descriptors {
            let hi = lo + d.width;
            d.slice = Some((lo, hi));
            d.flags.unconfigured = false;
            lo = hi;
        }
        self.total_width = lo;
        self.direction = Some(vector.direction());
        debug_assert_eq!(self.total_width, vector.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pairs_names_and_widths() {
        let set = SignalSet::parse("a 1 b 2", false).unwrap();
        assert_eq!(set.descriptors().len(), 2);
        assert_eq!(set.descriptors()[0].name, "a");
        assert_eq!(set.descriptors()[0].width, 1);
        assert_eq!(set.descriptors()[1].name, "b");
        assert_eq!(set.descriptors()[1].width, 2);
    }

    #[test]
    fn parse_rejects_unpaired_tokens() {
        assert!(SignalSet::parse("a 1 b", false).is_err());
    }

    #[test]
    fn parse_rejects_non_positive_width() {
        assert!(SignalSet::parse("a 0", false).is_err());
        assert!(SignalSet::parse("a -1", false).is_err());
        assert!(SignalSet::parse("a x", false).is_err());
    }

    #[test]
    fn configure_assigns_contiguous_disjoint_slices() {
        let mut set = SignalSet::parse("a 1 b 2 c 3", false).unwrap();
        let vector = LogicVector::uninitialized(6, Direction::ToLeft);
        set.configure(&vector);

        assert_eq!(set.descriptors()[0].slice, Some((0, 1)));
        assert_eq!(set.descriptors()[1].slice, Some((1, 3)));
        assert_eq!(set.descriptors()[2].slice, Some((3, 6)));
        assert_eq!(set.total_width(), 6);
        assert!(!set.is_unconfigured());
    }
}
