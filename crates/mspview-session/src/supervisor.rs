//! Connection lifecycle: Disconnected -> Connecting -> Active -> Disconnected.
//!
//! Every recoverable failure (no candidate port, open failure, link loss)
//! lands back in `Disconnected`, waits the fixed backoff and tries again. The
//! only errors returned from [`Supervisor::run`] are misconfigurations that
//! retrying cannot fix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mspview_frame::command_name;
use mspview_transport::{DeviceClass, DeviceDescriptor, PortDiscovery};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::consumer::{Action, Consumer};
use crate::error::{Result, SessionError};
use crate::session::Session;

/// Granularity at which waits observe the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Active,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Disconnected => "disconnected",
            Phase::Connecting => "connecting",
            Phase::Active => "active",
        }
    }
}

/// Why [`Supervisor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// One telemetry cycle finished in `once` mode.
    Completed,
    /// The running flag was cleared.
    Stopped,
}

/// How an active session ended.
enum SessionEnd {
    Completed,
    Stopped,
    Lost(String),
}

/// Owns the retry loop and drives one session at a time.
pub struct Supervisor<C, P> {
    descriptor: DeviceDescriptor,
    config: SessionConfig,
    consumer: C,
    discovery: P,
    running: Arc<AtomicBool>,
    phase: Phase,
}

impl<C: Consumer, P: PortDiscovery> Supervisor<C, P> {
    pub fn new(descriptor: DeviceDescriptor, config: SessionConfig, consumer: C, discovery: P) -> Self {
        Self {
            descriptor,
            config,
            consumer,
            discovery,
            running: Arc::new(AtomicBool::new(true)),
            phase: Phase::Disconnected,
        }
    }

    /// Share an externally owned running flag, e.g. one cleared by Ctrl-C.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Flag that stops the supervisor when cleared.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn into_consumer(self) -> C {
        self.consumer
    }

    /// Run until `once` completes or the running flag is cleared.
    pub fn run(&mut self) -> Result<Outcome> {
        match self.descriptor.class() {
            DeviceClass::None => {
                return Err(SessionError::InvalidDescriptor(self.descriptor.to_string()))
            }
            DeviceClass::Bluetooth => {
                return Err(SessionError::Unsupported(format!(
                    "bluetooth device {}",
                    self.descriptor
                )))
            }
            _ => {}
        }

        while self.is_running() {
            self.set_phase(Phase::Connecting);
            let Some(target) = self.resolve_target() else {
                self.fail("no candidate port");
                continue;
            };

            let mut session = match Session::open(&target, &self.config) {
                Ok(session) => session,
                Err(err) => {
                    warn!(target = %target, error = %err, "open failed");
                    self.fail(&err.to_string());
                    continue;
                }
            };

            self.set_phase(Phase::Active);
            self.consumer.on_connected(session.label());
            let end = self.drive(&mut session);
            session.close();

            match end {
                SessionEnd::Completed => {
                    self.set_phase(Phase::Disconnected);
                    return Ok(Outcome::Completed);
                }
                SessionEnd::Stopped => break,
                SessionEnd::Lost(reason) => {
                    warn!(reason = %reason, "link lost");
                    self.fail(&reason);
                }
            }
        }

        self.set_phase(Phase::Disconnected);
        info!("supervisor stopped");
        Ok(Outcome::Stopped)
    }

    fn resolve_target(&self) -> Option<DeviceDescriptor> {
        match &self.descriptor {
            DeviceDescriptor::Auto => {
                let port = self.discovery.find_candidate_port()?;
                debug!(port = %port, "discovered candidate port");
                Some(DeviceDescriptor::serial(port))
            }
            other => Some(other.clone()),
        }
    }

    /// Strict request/response loop over one session.
    fn drive(&mut self, session: &mut Session) -> SessionEnd {
        let mut outstanding = self.consumer.initial_command();
        if let Err(err) = session.send(outstanding) {
            return SessionEnd::Lost(err.to_string());
        }
        let mut sent_at = Instant::now();

        loop {
            if !self.is_running() {
                return SessionEnd::Stopped;
            }

            let message = match session.recv_timeout(POLL_INTERVAL) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    if sent_at.elapsed() >= self.config.response_timeout {
                        debug!(
                            command = outstanding,
                            name = command_name(outstanding),
                            "response timeout, re-sending"
                        );
                        if let Err(err) = session.send(outstanding) {
                            return SessionEnd::Lost(err.to_string());
                        }
                        sent_at = Instant::now();
                    }
                    continue;
                }
                Err(err) => return SessionEnd::Lost(err.to_string()),
            };

            if message.is_link_failed() {
                return SessionEnd::Lost("link failed".to_string());
            }

            // Only the answer to the outstanding request moves the cadence on;
            // late duplicates after a re-send are shown but not followed.
            let answers_outstanding = message.command == outstanding;
            let action = self.consumer.on_message(&message, answers_outstanding);
            if !answers_outstanding {
                continue;
            }

            let next = match action {
                Action::Wait => continue,
                Action::Send(next) => next,
                Action::CycleComplete(next) => {
                    if self.config.once {
                        return SessionEnd::Completed;
                    }
                    if let Some(pacing) = self.config.pacing {
                        if !self.pause(pacing) {
                            return SessionEnd::Stopped;
                        }
                    }
                    next
                }
            };

            outstanding = next;
            if let Err(err) = session.send(outstanding) {
                return SessionEnd::Lost(err.to_string());
            }
            sent_at = Instant::now();
        }
    }

    /// Back to `Disconnected`: notify, then wait out the backoff.
    fn fail(&mut self, reason: &str) {
        self.set_phase(Phase::Disconnected);
        self.consumer.on_disconnected(reason);
        self.pause(self.config.backoff);
    }

    /// Sleep for `duration` unless stopped first. Returns whether still running.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
        false
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = self.phase.as_str(), to = phase.as_str(), "phase change");
            self.phase = phase;
        }
    }
}
