//! Wire-message formatting and parsing, kept independent of
//! socket I/O so the grammar can be tested in isolation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PackError, ProtocolError};
use crate::packer::render;
use crate::signal::SignalSet;

/// `"FROM <sim_time> <name1> <width1> ... <nameN> <widthN> "` or the `TO`
/// equivalent.
pub fn format_signal_list(keyword: &str, sim_time: u64, set: &SignalSet) -> String {
    let mut out = format!("{keyword} {sim_time} ");
    for d in set.descriptors() {
        out.push_str(&d.name);
        out.push(' ');
        out.push_str(&d.width.to_string());
        out.push(' ');
    }
    out
}

/// `"START "`.
pub fn format_start() -> String {
    "START ".to_string()
}

/// An affirmative handshake reply has `'O'` or `'K'` as its first character.
pub fn is_affirmative(response: &[u8]) -> bool {
    matches!(response.first(), Some(b'O') | Some(b'K'))
}

/// Builds an update-round request body: `"<peer_time> [<name> <hexval> ]*"`
/// for every descriptor with `has_changed` set. Clears
/// `has_changed` on every descriptor it emits.
pub fn format_update_request(
    peer_time: u64,
    to_set: &mut SignalSet,
) -> Result<String, PackError> {
    let mut out = format!("{peer_time} ");
    for d in to_set.descriptors_mut() {
        if !d.flags.has_changed {
            continue;
        }
        let hex = render(d)?;
        out.push_str(&d.name);
        out.push(' ');
        out.push_str(&hex);
        out.push(' ');
        d.flags.has_changed = false;
    }
    Ok(out)
}

/// One `<name> <hexval>` pair from an update-round response, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResponseValue {
    pub name: String,
    pub hex: String,
}

/// Parses `"<peer_time'> [<name> <hexval> ]*"`.
pub fn parse_update_response(text: &str) -> Result<(u64, Vec<ResponseValue>), ProtocolError> {
    let mut tokens = text.split_whitespace();

    let peer_time: u64 = tokens
        .next()
        .ok_or_else(|| ProtocolError::Malformed(text.to_string()))?
        .parse()
        .map_err(|_| ProtocolError::Malformed(text.to_string()))?;

    let mut values = Vec::new();
    loop {
        let name = match tokens.next() {
            Some(n) => n,
            None => break,
        };
        let hex = tokens
            .next()
            .ok_or_else(|| ProtocolError::Malformed(text.to_string()))?;
        values.push(ResponseValue {
            name: name.to_string(),
            hex: hex.to_string(),
        });
    }

    Ok((peer_time, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Direction, LogicVector};

    #[test]
    fn format_signal_list_matches_grammar() {
        let set = SignalSet::parse("a 1 b 2", false).unwrap();
        assert_eq!(format_signal_list("FROM", 0, &set), "FROM 0 a 1 b 2 ");
    }

    #[test]
    fn is_affirmative_accepts_o_or_k() {
        assert!(is_affirmative(b"OK"));
        assert!(is_affirmative(b"Konfirmed"));
        assert!(!is_affirmative(b"ERR"));
        assert!(!is_affirmative(b""));
    }

    #[test]
    fn empty_update_request_is_just_the_time() {
        let mut set = SignalSet::parse("c 3", false).unwrap();
        let vector = LogicVector::uninitialized(3, Direction::ToLeft);
        set.configure(&vector);
        assert_eq!(format_update_request(12, &mut set).unwrap(), "12 ");
    }

    #[test]
    fn parse_update_response_roundtrip() {
        let (peer_time, values) = parse_update_response("12 a 1 b 2").unwrap();
        assert_eq!(peer_time, 12);
        assert_eq!(
            values,
            vec![
                ResponseValue {
                    name: "a".to_string(),
                    hex: "1".to_string()
                },
                ResponseValue {
                    name: "b".to_string(),
                    hex: "2".to_string()
                },
            ]
        );
    }

    #[test]
    fn parse_update_response_empty() {
        let (peer_time, values) = parse_update_response("100 ").unwrap();
        assert_eq!(peer_time, 100);
        assert!(values.is_empty());
    }

    #[test]
    fn parse_update_response_rejects_dangling_name() {
        assert!(parse_update_response("12 a").is_err());
    }
}
