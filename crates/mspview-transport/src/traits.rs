use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::DeviceClass;
use crate::error::{Result, TransportError};
use crate::net::UdpLink;

/// A connected flight-controller link: implements Read + Write.
///
/// This is the fundamental I/O type returned by [`crate::open`]. Clones made
/// with [`MspStream::try_clone`] share one close flag, so closing any handle
/// makes every pending or future read on the others fail with
/// `ConnectionAborted`. That is the only way a session stops its receive
/// thread.
pub struct MspStream {
    inner: MspStreamInner,
    closed: Arc<AtomicBool>,
    label: String,
}

enum MspStreamInner {
    Serial(Box<dyn serialport::SerialPort>),
    Tcp(TcpStream),
    Udp(UdpLink),
}

impl Read for MspStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        match &mut self.inner {
            MspStreamInner::Serial(port) => port.read(buf),
            MspStreamInner::Tcp(stream) => stream.read(buf),
            MspStreamInner::Udp(link) => link.recv(buf),
        }
    }
}

impl Write for MspStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        match &mut self.inner {
            MspStreamInner::Serial(port) => port.write(buf),
            MspStreamInner::Tcp(stream) => stream.write(buf),
            MspStreamInner::Udp(link) => link.send(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            MspStreamInner::Serial(port) => port.flush(),
            MspStreamInner::Tcp(stream) => stream.flush(),
            MspStreamInner::Udp(_) => Ok(()),
        }
    }
}

impl MspStream {
    pub(crate) fn from_serial(port: Box<dyn serialport::SerialPort>, path: &str) -> Self {
        Self::with_inner(MspStreamInner::Serial(port), path.to_string())
    }

    pub(crate) fn from_tcp(stream: TcpStream, address: String) -> Self {
        Self::with_inner(MspStreamInner::Tcp(stream), address)
    }

    pub(crate) fn from_udp(link: UdpLink, address: String) -> Self {
        Self::with_inner(MspStreamInner::Udp(link), address)
    }

    fn with_inner(inner: MspStreamInner, label: String) -> Self {
        Self {
            inner,
            closed: Arc::new(AtomicBool::new(false)),
            label,
        }
    }

    /// Port name or endpoint this stream was opened on.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Transport family of the underlying link.
    pub fn class(&self) -> DeviceClass {
        match &self.inner {
            MspStreamInner::Serial(_) => DeviceClass::Serial,
            MspStreamInner::Tcp(_) => DeviceClass::Tcp,
            MspStreamInner::Udp(_) => DeviceClass::Udp,
        }
    }

    /// Try to clone this stream. The clone shares the close flag.
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            MspStreamInner::Serial(port) => {
                let cloned = port.try_clone().map_err(|source| TransportError::Serial {
                    path: self.label.clone(),
                    source,
                })?;
                MspStreamInner::Serial(cloned)
            }
            MspStreamInner::Tcp(stream) => MspStreamInner::Tcp(stream.try_clone()?),
            MspStreamInner::Udp(link) => MspStreamInner::Udp(link.try_clone()?),
        };
        Ok(Self {
            inner,
            closed: Arc::clone(&self.closed),
            label: self.label.clone(),
        })
    }

    /// Close the link for every handle sharing it.
    ///
    /// TCP sockets are shut down so a blocked read returns immediately; serial
    /// and UDP reads observe the flag on their next poll timeout.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(link = %self.label, "closing transport");
        if let MspStreamInner::Tcp(stream) = &self.inner {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    /// Whether [`MspStream::close`] has been called on any handle.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "transport closed")
}

impl std::fmt::Debug for MspStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MspStream")
            .field("type", &self.class().as_str())
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}
