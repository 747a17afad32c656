//! End-to-end session-controller tests driven entirely through the public
//! API, using an in-memory loopback [`Transport`] in place of a real socket
//! or pipe pair.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use cosim_core::{Direction, LogicBit, LogicVector, Session, SessionError, Transport, TransportError, UpdateOutcome};

struct Loopback {
    responses: VecDeque<Vec<u8>>,
    sent: Rc<RefCell<Vec<String>>>,
}

impl Transport for Loopback {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.sent
            .borrow_mut()
            .push(String::from_utf8_lossy(request).to_string());
        Ok(self.responses.pop_front().unwrap_or_default())
    }
}

fn session_with(
    responses: &[&str],
    from_signals: &str,
    to_signals: &str,
) -> (Session, Rc<RefCell<Vec<String>>>) {
    let sent = Rc::new(RefCell::new(Vec::new()));
    let transport = Box::new(Loopback {
        responses: responses.iter().map(|s| s.as_bytes().to_vec()).collect(),
        sent: Rc::clone(&sent),
    });
    let session = Session::startup(0, 1000, from_signals, to_signals, transport).unwrap();
    (session, sent)
}

#[test]
fn startup_completes_on_three_affirmative_acks() {
    let (_session, sent) = session_with(&["OK", "OK", "OK"], "a 1", "b 2");
    assert_eq!(sent.borrow().len(), 3);
    assert!(sent.borrow()[0].starts_with("FROM 0 a 1 "));
    assert!(sent.borrow()[1].starts_with("TO 0 b 2 "));
    assert_eq!(sent.borrow()[2], "START ");
}

#[test]
fn startup_fails_on_negative_ack() {
    let transport = Box::new(Loopback {
        responses: VecDeque::from([b"ERR".to_vec()]),
        sent: Rc::new(RefCell::new(Vec::new())),
    });
    let err = Session::startup(0, 1000, "a 1", "b 2", transport).unwrap_err();
    assert!(matches!(err, SessionError::Protocol(_)));
}

#[test]
fn first_round_with_no_changes_is_a_delta_cycle() {
    let (mut session, _sent) = session_with(&["OK", "OK", "OK", "0 "], "", "c 4");

    let datain = LogicVector::uninitialized(4, Direction::ToLeft);
    let mut dataout = LogicVector::uninitialized(0, Direction::ToLeft);

    let outcome = session.update(&datain, &mut dataout, 0).unwrap();
    assert_eq!(outcome, UpdateOutcome::Delta);
}

#[test]
fn changed_to_signal_is_rendered_into_the_request() {
    let (mut session, sent) = session_with(&["OK", "OK", "OK", "0 "], "", "q 8");

    let mut datain = LogicVector::uninitialized(8, Direction::ToLeft);
    for i in 0..8 {
        datain.write_bit(0, 8, i, LogicBit::from_bool(i == 7));
    }
    let mut dataout = LogicVector::uninitialized(0, Direction::ToLeft);

    session.update(&datain, &mut dataout, 0).unwrap();
    assert_eq!(sent.borrow()[3], "0 q 01 ");
}

#[test]
fn from_signal_apply_writes_back_into_dataout() {
    let (mut session, _sent) = session_with(&["OK", "OK", "OK", "12 a 1 b 2"], "a 1 b 2", "");

    let datain = LogicVector::uninitialized(0, Direction::ToLeft);
    let mut dataout = LogicVector::uninitialized(3, Direction::ToLeft);

    let outcome = session.update(&datain, &mut dataout, 12_000).unwrap();
    assert_eq!(outcome, UpdateOutcome::Signal);
    // a=1 (width 1), b=2 i.e. binary 10 (width 2, MSB first).
    assert_eq!(dataout.read_bit(0, 1, 0), LogicBit::One);
    assert_eq!(dataout.read_bit(1, 2, 0), LogicBit::One);
    assert_eq!(dataout.read_bit(1, 2, 1), LogicBit::Zero);
}

#[test]
fn peer_time_advance_yields_time_outcome_and_a_matching_delay() {
    let (mut session, _sent) = session_with(&["OK", "OK", "OK", "50 "], "", "c 1");

    let datain = LogicVector::uninitialized(1, Direction::ToLeft);
    let mut dataout = LogicVector::uninitialized(0, Direction::ToLeft);

    let outcome = session.update(&datain, &mut dataout, 5_000).unwrap();
    assert_eq!(outcome, UpdateOutcome::Time);
    assert_eq!(session.next_delay(5_000), 45_000);
}

#[test]
fn empty_peer_response_ends_the_session() {
    let (mut session, _sent) = session_with(&["OK", "OK", "OK", ""], "", "c 1");

    let datain = LogicVector::uninitialized(1, Direction::ToLeft);
    let mut dataout = LogicVector::uninitialized(0, Direction::ToLeft);

    assert_eq!(
        session.update(&datain, &mut dataout, 0).unwrap(),
        UpdateOutcome::End
    );
    // Once closed, further entries return End without consulting the peer.
    assert_eq!(
        session.update(&datain, &mut dataout, 1_000).unwrap(),
        UpdateOutcome::End
    );
}

#[test]
fn response_naming_the_wrong_signal_is_a_protocol_error() {
    let (mut session, _sent) = session_with(&["OK", "OK", "OK", "0 wrong_name 1"], "a 1", "");

    let datain = LogicVector::uninitialized(0, Direction::ToLeft);
    let mut dataout = LogicVector::uninitialized(1, Direction::ToLeft);

    let err = session.update(&datain, &mut dataout, 0).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(cosim_core::ProtocolError::NameMismatch { .. })
    ));
}
