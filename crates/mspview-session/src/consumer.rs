//! The side of a session that reads answers and picks the next request.

use std::time::Instant;

use mspview_frame::{command_name, Message, MspVersion, Status};
use tracing::{debug, warn};

use crate::sequence::{Sequence, Step};
use crate::telemetry::{Field, Telemetry};

/// Where decoded values end up.
pub trait TelemetryDisplay {
    /// A field has a new formatted value.
    fn update(&mut self, field: Field, value: &str);

    /// A link was opened on `port`.
    fn connected(&mut self, port: &str);

    /// The link was lost or could not be opened.
    fn disconnected(&mut self, reason: &str);
}

/// What the supervisor should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Request this command next.
    Send(u16),
    /// A telemetry cycle completed; this command opens the next one.
    CycleComplete(u16),
    /// Keep waiting for the outstanding answer.
    Wait,
}

/// Chooses commands in response to messages.
pub trait Consumer {
    /// First request after a link opens.
    fn initial_command(&mut self) -> u16;

    /// Handle one message and choose what happens next.
    ///
    /// `answers_outstanding` is false for anything other than the answer to
    /// the request in flight, such as a late duplicate after a re-send. The
    /// supervisor ignores the returned action in that case.
    fn on_message(&mut self, message: &Message, answers_outstanding: bool) -> Action;

    fn on_connected(&mut self, _port: &str) {}

    fn on_disconnected(&mut self, _reason: &str) {}
}

/// Default consumer: walks the polling order and renders every answer.
pub struct TelemetryPoller<D> {
    display: D,
    sequence: Sequence,
    version: MspVersion,
    messages: u64,
    started: Option<Instant>,
}

impl<D: TelemetryDisplay> TelemetryPoller<D> {
    pub fn new(version: MspVersion, display: D) -> Self {
        Self {
            display,
            sequence: Sequence::new(version),
            version,
            messages: 0,
            started: None,
        }
    }

    /// Messages received since the link opened.
    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn into_display(self) -> D {
        self.display
    }

    fn render(&mut self, message: &Message) {
        let Some(field) = Field::for_command(message.command) else {
            return;
        };
        if message.status != Status::Ok {
            debug!(
                command = message.command,
                status = message.status.as_str(),
                "answer unusable"
            );
            self.display.update(field, "n/a");
            return;
        }
        match Telemetry::decode(message.command, &message.payload) {
            Ok(Some(Telemetry::Ident { compat })) => {
                let text = format!("{compat} (msp protocol v{})", self.version.number());
                self.display.update(field, &text);
            }
            Ok(Some(value)) => self.display.update(value.field(), &value.to_string()),
            Ok(None) => {}
            Err(err) => {
                debug!(error = %err, "undecodable payload");
                self.display.update(field, "n/a");
            }
        }
    }

    fn report_rate(&mut self) {
        let elapsed = self
            .started
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or_default();
        let rate = if elapsed > 0.0 {
            self.messages as f64 / elapsed
        } else {
            0.0
        };
        let text = format!("{} messages in {elapsed:.3}s ({rate:.1} m/s)", self.messages);
        self.display.update(Field::Rate, &text);
    }
}

impl<D: TelemetryDisplay> Consumer for TelemetryPoller<D> {
    fn initial_command(&mut self) -> u16 {
        self.sequence.first()
    }

    fn on_message(&mut self, message: &Message, answers_outstanding: bool) -> Action {
        self.messages += 1;
        if answers_outstanding && message.command == self.sequence.first() {
            self.started = Some(Instant::now());
        }
        self.render(message);

        match self.sequence.step(message.command) {
            Step::Unsolicited => Action::Wait,
            Step::Unexpected => {
                warn!(
                    command = message.command,
                    name = command_name(message.command),
                    ok = message.is_ok(),
                    "unexpected MSP answer"
                );
                Action::Wait
            }
            _ if !answers_outstanding => {
                debug!(
                    command = message.command,
                    name = command_name(message.command),
                    "late duplicate answer"
                );
                Action::Wait
            }
            Step::Next(next) => Action::Send(next),
            Step::CycleEnd(next) => {
                self.report_rate();
                Action::CycleComplete(next)
            }
        }
    }

    fn on_connected(&mut self, port: &str) {
        self.messages = 0;
        self.started = None;
        self.display.connected(port);
    }

    fn on_disconnected(&mut self, reason: &str) {
        self.display.disconnected(reason);
    }
}
