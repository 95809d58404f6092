use std::io::Read;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use mspview_frame::{FrameConfig, FrameError, FrameReader, Message, RequestWriter};
use mspview_transport::{DeviceDescriptor, MspStream, TransportError};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// One open link: a receive thread feeding an ordered queue, and a writer.
///
/// Dropping the session closes the transport, which unblocks the receive
/// thread, and then joins it.
pub struct Session {
    stream: MspStream,
    writer: RequestWriter<MspStream>,
    inbox: Receiver<Message>,
    receiver: Option<JoinHandle<()>>,
}

impl Session {
    /// Open the link a descriptor points at and start receiving.
    pub fn open(descriptor: &DeviceDescriptor, config: &SessionConfig) -> Result<Self> {
        let stream = mspview_transport::open(descriptor, &config.serial)?;
        Self::from_stream(stream, config.frame_config())
    }

    /// Start a session on an already open stream.
    pub fn from_stream(stream: MspStream, frame_config: FrameConfig) -> Result<Self> {
        let reader = FrameReader::with_config(stream.try_clone()?, frame_config.clone());
        let writer = RequestWriter::with_config(stream.try_clone()?, frame_config);

        let (tx, inbox) = crossbeam_channel::unbounded();
        let receiver = thread::Builder::new()
            .name(format!("mspview-rx {}", stream.label()))
            .spawn(move || receive_loop(reader, tx))
            .map_err(TransportError::Io)?;

        info!(link = stream.label(), "session started");
        Ok(Self {
            stream,
            writer,
            inbox,
            receiver: Some(receiver),
        })
    }

    /// Port name or endpoint of the link.
    pub fn label(&self) -> &str {
        self.stream.label()
    }

    /// Send a request without payload.
    pub fn send(&mut self, command: u16) -> Result<()> {
        self.writer.request(command)?;
        Ok(())
    }

    /// Next queued message, or `None` if nothing arrived within `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SessionError::Disconnected(
                "receive thread exited".to_string(),
            )),
        }
    }

    /// Close the link and wait for the receive thread.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stream.close();
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                warn!(link = self.stream.label(), "receive thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decode messages until the link fails, then emit one `LinkFailed`.
///
/// A frame cut short by the failure is dropped by the reader and never
/// reaches the queue.
pub(crate) fn receive_loop<T: Read>(mut reader: FrameReader<T>, tx: Sender<Message>) {
    loop {
        match reader.read_message() {
            Ok(message) => {
                if tx.send(message).is_err() {
                    debug!("session dropped, receive loop exiting");
                    return;
                }
            }
            Err(FrameError::ConnectionClosed) => {
                info!("link closed by peer");
                break;
            }
            Err(err) => {
                warn!(error = %err, "link read failed");
                break;
            }
        }
    }
    let _ = tx.send(Message::link_failed());
}
