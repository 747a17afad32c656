//! The session controller: handshake, per-round protocol driving, and the
//! return-code decision.

use tracing::{debug, info, warn};

use crate::error::{ProtocolError, SessionError};
use crate::logic::LogicVector;
use crate::packer::{apply, observe};
use crate::protocol::{format_signal_list, format_start, format_update_request, is_affirmative, parse_update_response};
use crate::signal::SignalSet;
use crate::time::{TimeModel, TimeState};
use crate::transport::Transport;

/// `{INIT, FROM_SENT, TO_SENT, READY, CLOSED, FAILED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    FromSent,
    ToSent,
    Ready,
    Closed,
    Failed,
}

/// What the host should do next once an update round's decision is made,
/// surfaced as `END`/`SIGNAL`/`TIME`/`DELTA` by `cosim-plugin`. `ERROR` is a
/// `Result::Err` at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The peer closed the channel; tear down.
    End,
    /// Resume on the next `datain` change.
    Signal,
    /// Resume after `next_delay`.
    Time,
    /// Resume after a zero-time delta cycle.
    Delta,
}

/// `{transport, from_set, to_set, time_state, initialized?}`.
pub struct Session {
    transport: Box<dyn Transport>,
    from_set: SignalSet,
    to_set: SignalSet,
    time: TimeState,
    model: TimeModel,
    state: State,
}

impl Session {
    /// Runs the `FROM`/`TO`/`START` handshake and returns a `Session` in
    /// the `Ready` state.
    ///
    /// `from_signals`/`to_signals` are the raw whitespace-separated
    /// `<name> <width> ...` strings. `resolution` must be
    /// non-zero.
    pub fn startup(
        sim_time: u64,
        resolution: u64,
        from_signals: &str,
        to_signals: &str,
        mut transport: Box<dyn Transport>,
    ) -> Result<Session, SessionError> {
        // `TO_SET` values carry `initial_val` so the power-on hack
        // re-emits them on the first non-trivial round; `FROM_SET` does
        // not (the peer supplies those).
        let from_set = SignalSet::parse(from_signals, false)?;
        let to_set = SignalSet::parse(to_signals, true)?;

        let mut state = State::Init;

        let from_req = format_signal_list("FROM", sim_time, &from_set);
        let resp = transport.exchange(from_req.as_bytes())?;
        check_handshake_ack(&resp)?;
        state = State::FromSent;
        debug!(?state, "handshake: FROM acknowledged");

        let to_req = format_signal_list("TO", sim_time, &to_set);
        let resp = transport.exchange(to_req.as_bytes())?;
        check_handshake_ack(&resp)?;
        state = State::ToSent;
        debug!(?state, "handshake: TO acknowledged");

        let resp = transport.exchange(format_start().as_bytes())?;
        check_handshake_ack(&resp)?;
        state = State::Ready;
        info!("handshake complete, session ready");

        Ok(Session {
            transport,
            from_set,
            to_set,
            time: TimeState::new(resolution, sim_time),
            model: TimeModel::new(resolution),
            state,
        })
    }

    /// Runs one update round.
    ///
    /// `datain` is the `TO_SET`'s host vector (observed); `dataout` is the
    /// `FROM_SET`'s host vector (written). Returns `Err` on any protocol,
    /// pack, or transport failure, which the caller surfaces as `ERROR`.
    pub fn update(
        &mut self,
        datain: &LogicVector,
        dataout: &mut LogicVector,
        sim_time: u64,
    ) -> Result<UpdateOutcome, SessionError> {
        if self.state == State::Closed {
            return Ok(UpdateOutcome::End);
        }
        if self.state == State::Failed {
            return Err(SessionError::Protocol(ProtocolError::Malformed(
                "update called on a failed session".to_string(),
            )));
        }

        // Step 1: configure on first sight, else verify consistency.
        if self.to_set.is_unconfigured() {
            self.to_set.configure(datain);
        } else {
            check_consistency(&self.to_set, datain)?;
        }
        if self.from_set.is_unconfigured() {
            self.from_set.configure(dataout);
        } else {
            check_consistency(&self.from_set, dataout)?;
        }

        // Step 2.
        observe(&mut self.to_set, datain);

        // Step 3.
        let current_peer_time = self.model.peer_of(sim_time);
        let request = format_update_request(current_peer_time, &mut self.to_set)?;

        // Step 4.
        let response = match self.transport.exchange(request.as_bytes()) {
            Ok(bytes) if bytes.is_empty() => {
                self.state = State::Closed;
                debug!("peer closed channel");
                return Ok(UpdateOutcome::End);
            }
            Ok(bytes) => bytes,
            Err(e) => {
                self.state = State::Failed;
                return Err(SessionError::Transport(e));
            }
        };
        let response_text = std::str::from_utf8(&response)
            .map_err(|_| ProtocolError::Malformed("non-UTF-8 response".to_string()))?;

        // Step 5.
        let (peer_time_prime, values) = parse_update_response(response_text)?;

        // Step 6: positional matching against FROM_SET, with an additional
        // name check (recommended strengthening of the legacy
        // behavior).
        for (i, value) in values.iter().enumerate() {
            let expected = self
                .from_set
                .descriptors()
                .get(i)
                .ok_or_else(|| ProtocolError::Malformed(response_text.to_string()))?;
            if expected.name != value.name {
                return Err(SessionError::Protocol(ProtocolError::NameMismatch {
                    index: i,
                    expected: expected.name.clone(),
                    echoed: value.name.clone(),
                }));
            }
            apply(&mut self.from_set, dataout, i, &value.hex)?;
        }

        self.time.sim_time = sim_time;
        self.time.peer_time = current_peer_time;

        // Step 7: decision. Order matters -- a time advance takes priority
        // over an empty response, which takes priority over a time regression.
        let outcome = if peer_time_prime > current_peer_time {
            self.time.next_trigger = peer_time_prime;
            UpdateOutcome::Time
        } else if values.is_empty() {
            if sim_time == 0 {
                rearm_initial_values(&mut self.to_set);
            }
            UpdateOutcome::Delta
        } else if peer_time_prime < current_peer_time {
            UpdateOutcome::Delta
        } else {
            UpdateOutcome::Signal
        };

        debug!(?outcome, peer_time_prime, current_peer_time, "update round complete");
        Ok(outcome)
    }

    /// Simulator-time delay until the next forced wake-up.
    /// Consulted by the host when `update` returns `Time`.
    pub fn next_delay(&self, sim_time: u64) -> u64 {
        self.model.next_delay(sim_time, self.time.next_trigger)
    }
}

fn check_handshake_ack(response: &[u8]) -> Result<(), ProtocolError> {
    if is_affirmative(response) {
        Ok(())
    } else {
        let text = String::from_utf8_lossy(response).to_string();
        warn!(response = %text, "peer rejected handshake step");
        Err(ProtocolError::NegativeAck(text))
    }
}

fn check_consistency(set: &SignalSet, vector: &LogicVector) -> Result<(), ProtocolError> {
    let expected_dir = set.direction().expect("configured set has a direction");
    if set.total_width() != vector.len() || expected_dir != vector.direction() {
        return Err(ProtocolError::InconsistentVector {
            expected_len: set.total_width(),
            expected_dir,
            actual_len: vector.len(),
            actual_dir: vector.direction(),
        });
    }
    Ok(())
}

/// The `t=0` power-on hack: any `TO_SET` descriptor still bearing
/// `initial_val` has its `has_changed` set and `initial_val` cleared, so the
/// next round re-emits the initial values.
fn rearm_initial_values(to_set: &mut SignalSet) {
    for d in to_set.descriptors_mut() {
        if d.flags.initial_val {
            d.flags.has_changed = true;
            d.flags.initial_val = false;
        }
    }
}
