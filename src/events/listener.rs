// Event listener - READY / header / payload / RESULT handshake with supervisord

use crate::error::{Result, UptimemonError};
use crate::events::parse_tokens;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Outcome reported back to the supervisor for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckResult {
    Ok,
    Fail,
}

impl AckResult {
    fn body(self) -> &'static str {
        match self {
            AckResult::Ok => "OK",
            AckResult::Fail => "FAIL",
        }
    }
}

/// A notification received from the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub headers: BTreeMap<String, String>,
    pub payload: String,
}

impl Event {
    pub fn event_name(&self) -> &str {
        self.headers
            .get("eventname")
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// TICK_5, TICK_60 and TICK_3600 all count as ticks
    pub fn is_tick(&self) -> bool {
        self.event_name().starts_with("TICK")
    }

    pub fn payload_tokens(&self) -> BTreeMap<String, String> {
        parse_tokens(&self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerState {
    Idle,
    AwaitingAck,
}

/// Event listener bound to explicit input and output streams
///
/// The supervisor talks to its listeners over their stdin/stdout, so nothing
/// else may write to `output`. Every event returned by `wait_for_event` must
/// be acknowledged exactly once before the next wait.
pub struct EventListener<R, W> {
    input: R,
    output: W,
    state: ListenerState,
}

impl<R: BufRead, W: Write> EventListener<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            state: ListenerState::Idle,
        }
    }

    /// Signal readiness and block until the next event arrives
    ///
    /// Returns `Ok(None)` when the supervisor closes the stream.
    pub fn wait_for_event(&mut self) -> Result<Option<Event>> {
        if self.state == ListenerState::AwaitingAck {
            return Err(UptimemonError::ProtocolError(
                "previous event has not been acknowledged".to_string(),
            ));
        }

        self.output.write_all(b"READY\n")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let headers = parse_tokens(&line);
        let len = headers
            .get("len")
            .ok_or_else(|| {
                UptimemonError::ProtocolError(format!("header line has no len: {:?}", line.trim_end()))
            })?
            .parse::<usize>()
            .map_err(|_| {
                UptimemonError::ProtocolError(format!("invalid len in header: {:?}", line.trim_end()))
            })?;

        let mut payload = vec![0u8; len];
        self.input.read_exact(&mut payload).map_err(|e| {
            UptimemonError::ProtocolError(format!("truncated payload ({} bytes expected): {}", len, e))
        })?;

        self.state = ListenerState::AwaitingAck;
        Ok(Some(Event {
            headers,
            payload: String::from_utf8_lossy(&payload).into_owned(),
        }))
    }

    /// Send the RESULT message for the pending event
    pub fn acknowledge(&mut self, result: AckResult) -> Result<()> {
        if self.state != ListenerState::AwaitingAck {
            return Err(UptimemonError::ProtocolError(
                "no event is waiting for acknowledgement".to_string(),
            ));
        }

        let body = result.body();
        write!(self.output, "RESULT {}\n{}", body.len(), body)?;
        self.output.flush()?;
        self.state = ListenerState::Idle;
        Ok(())
    }

    pub fn ok(&mut self) -> Result<()> {
        self.acknowledge(AckResult::Ok)
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
