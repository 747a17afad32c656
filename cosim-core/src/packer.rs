//! Bidirectional projection between the host's wide logic vector and the
//! per-signal values, and the hexadecimal wire encoding.

use bitmatch::bitmatch;

use crate::error::PackError;
use crate::logic::LogicBit;
use crate::logic::LogicVector;
use crate::signal::SignalDescriptor;
use crate::signal::SignalSet;

/// For each descriptor in `to_set`, reads its slice out of `vector`,
/// compares it element-wise against the shadow, and sets
/// [`Flags::has_changed`](crate::signal::Flags::has_changed) on difference,
/// updating the shadow to the new value ( `observe`).
///
/// Returns the names of descriptors whose shadow changed, in descriptor
/// order.
pub fn observe(to_set: &mut SignalSet, vector: &LogicVector) -> Vec<String> {
    let mut changed = Vec::new();
    for d in to_set.descriptors_mut() {
        let (lo, _hi) = d.slice.expect("observe called before configure");
        let mut any_change = false;
        for i in 0..d.width {
            let current = vector.read_bit(lo, d.width, i);
            if d.shadow[i] != current {
                any_change = true;
                d.shadow[i] = current;
            }
        }
        if any_change {
            d.flags.has_changed = true;
            changed.push(d.name.clone());
        }
    }
    changed
}

/// Renders a descriptor's shadow value as lower-case hexadecimal, grouping
/// four bits into one nibble and padding the leading nibble's high bits
/// with zero when `width` is not a multiple of four.
///
/// Fails with [`PackError::NonBinaryOutput`] if any shadow bit is not
/// strictly `0`/`1` -- such a value cannot be rendered as hex unambiguously.
pub fn render(descriptor: &SignalDescriptor) -> Result<String, PackError> {
    let width = descriptor.width;
    let nibble_count = width.div_ceil(4);
    let pad_bits = nibble_count * 4 - width;

    // MSB-first bit stream: the zero pad fills the unused high bits of the
    // leading nibble, followed by the descriptor's value in declared
    // (MSB-first) order.
    let mut sig_bits = Vec::with_capacity(nibble_count * 4);
    sig_bits.extend(std::iter::repeat(LogicBit::Zero).take(pad_bits));
    sig_bits.extend_from_slice(&descriptor.shadow);

    let mut out = String::with_capacity(nibble_count);
    for nibble_bits in sig_bits.chunks(4) {
        let mut nibble: u8 = 0;
        for (bit_index, bit) in nibble_bits.iter().enumerate() {
            if !bit.is_strict() {
                return Err(PackError::NonBinaryOutput {
                    descriptor: descriptor.name.clone(),
                    bit_index,
                });
            }
            nibble = (nibble << 1) | (bit.as_bool_lossy() as u8);
        }
        out.push(std::char::from_digit(nibble as u32, 16).expect("nibble fits in one hex digit"));
    }
    Ok(out)
}

/// Parses `text` as an unsigned hexadecimal number (right-to-left, so the
/// right-most character is the least-significant nibble), expands each
/// nibble to four strict-logic bits, pads missing high bits with `'0'`, and
/// writes the result into `from_set`'s descriptor at position `index`
/// (positional matching -- the caller is responsible for verifying the
/// echoed name separately).
///
/// The in-vector bits for any descriptor not named in the response are left
/// untouched -- callers simply don't call `apply` for them.
pub fn apply(
    from_set: &mut SignalSet,
    vector: &mut LogicVector,
    index: usize,
    text: &str,
) -> Result<(), PackError> {
    let width = from_set.descriptors()[index].width;
    let bits = parse_hex(text, width)?;

    let d = &mut from_set.descriptors_mut()[index];
    let (lo, _hi) = d.slice.expect("apply called before configure");
    d.shadow.copy_from_slice(&bits);
    for (i, bit) in bits.iter().enumerate() {
        vector.write_bit(lo, width, i, *bit);
    }
    Ok(())
}

/// Parses a hexadecimal string (with optional `_` separators, ignored) into
/// `width` bits in declared MSB-first order.
fn parse_hex(text: &str, width: usize) -> Result<Vec<LogicBit>, PackError> {
    let mut sig_bits: Vec<LogicBit> = Vec::new(); // LSB-first, growing toward MSB

    for ch in text.chars().rev() {
        if ch == '_' {
            continue;
        }
        let nibble = ch.to_digit(16).ok_or_else(|| PackError::InvalidHexChar {
            text: text.to_string(),
            ch,
        })? as u8;

        #[bitmatch]
        let "abcd" = nibble;
        // `a` is the nibble's MSB, `d` its LSB; push LSB-first.
        sig_bits.push(LogicBit::from_bool(d != 0));
        sig_bits.push(LogicBit::from_bool(c != 0));
        sig_bits.push(LogicBit::from_bool(b != 0));
        sig_bits.push(LogicBit::from_bool(a != 0));
    }

    if sig_bits.len() < width {
        sig_bits.resize(width, LogicBit::Zero);
    }
    sig_bits.truncate(width);

    // sig_bits is LSB-first; reverse to get declared MSB-first order.
    sig_bits.reverse();
    Ok(sig_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::Direction;

    fn descriptor_with_value(width: usize, value: u32) -> SignalDescriptor {
        let mut set = SignalSet::parse(&format!("x {width}"), false).unwrap();
        let vector = LogicVector::uninitialized(width, Direction::ToLeft);
        set.configure(&vector);
        let d = &mut set.descriptors_mut()[0];
        for i in 0..width {
            let bit = (value >> (width - 1 - i)) & 1 != 0;
            d.shadow[i] = LogicBit::from_bool(bit);
        }
        set.descriptors()[0].clone()
    }

    #[test]
    fn render_width_1() {
        assert_eq!(render(&descriptor_with_value(1, 0)).unwrap(), "0");
        assert_eq!(render(&descriptor_with_value(1, 1)).unwrap(), "1");
    }

    #[test]
    fn render_width_3_pads_high_nibble_bits() {
        // 0b101 = 5
        assert_eq!(render(&descriptor_with_value(3, 0b101)).unwrap(), "5");
    }

    #[test]
    fn render_width_33_uses_nine_hex_chars() {
        let d = descriptor_with_value(33, 0); // all-zero, but width still drives digit count
        let text = render(&d).unwrap();
        assert_eq!(text.len(), 9);
    }

    #[test]
    fn render_rejects_non_binary() {
        let mut d = descriptor_with_value(2, 0);
        d.shadow[0] = LogicBit::X;
        assert!(matches!(
            render(&d),
            Err(PackError::NonBinaryOutput { .. })
        ));
    }

    #[test]
    fn parse_hex_pads_missing_high_bits() {
        let bits = parse_hex("5", 3).unwrap();
        // declared MSB-first for width 3, value 0b101
        assert_eq!(bits[0], LogicBit::One);
        assert_eq!(bits[1], LogicBit::Zero);
        assert_eq!(bits[2], LogicBit::One);
    }

    #[test]
    fn parse_hex_ignores_underscores() {
        let a = parse_hex("1_2", 8).unwrap();
        let b = parse_hex("12", 8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_hex_rejects_invalid_char() {
        assert!(parse_hex("1g", 8).is_err());
    }

    #[test]
    fn observe_detects_change_and_updates_shadow() {
        let mut set = SignalSet::parse("c 3", true).unwrap();
        let mut vector = LogicVector::uninitialized(3, Direction::ToLeft);
        set.configure(&vector);

        let changed = observe(&mut set, &vector);
        assert!(changed.is_empty(), "all-U shadow matches all-U vector");

        vector.write_bit(0, 3, 2, LogicBit::One);
        let changed = observe(&mut set, &vector);
        assert_eq!(changed, vec!["c".to_string()]);
        assert!(set.descriptors()[0].flags.has_changed);

        // Idempotence: running observe again with no mutation clears nothing
        // new (no changes) and yields no repeated changed names.
        let changed_again = observe(&mut set, &vector);
        assert!(changed_again.is_empty());
    }

    #[test]
    fn round_trip_apply_after_render_both_directions() {
        for direction in [Direction::ToLeft, Direction::ToRight] {
            let mut to_set = SignalSet::parse("v 9", true).unwrap();
            let mut to_vector = LogicVector::uninitialized(9, direction);
            to_set.configure(&to_vector);
            for i in 0..9 {
                to_vector.write_bit(0, 9, i, LogicBit::from_bool(i % 3 == 0));
            }
            observe(&mut to_set, &to_vector);
            let text = render(&to_set.descriptors()[0]).unwrap();

            let mut from_set = SignalSet::parse("v 9", false).unwrap();
            let mut from_vector = LogicVector::uninitialized(9, direction);
            from_set.configure(&from_vector);
            apply(&mut from_set, &mut from_vector, 0, &text).unwrap();

            for i in 0..9 {
                assert_eq!(
                    to_vector.read_bit(0, 9, i),
                    from_vector.read_bit(0, 9, i),
                    "bit {i} mismatch for direction {direction:?}"
                );
            }
        }
    }
}
