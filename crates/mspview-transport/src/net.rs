use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::descriptor::host_port;
use crate::error::{Result, TransportError};
use crate::traits::MspStream;

/// Poll interval for UDP reads so a closed link is noticed promptly.
pub const UDP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolve and connect a TCP endpoint (blocking).
///
/// Reads on the returned stream may deliver any fraction of a frame.
pub fn connect_tcp(host: &str, port: u16) -> Result<MspStream> {
    let address = host_port(host, port);
    let candidates = resolve(&address)?;
    let stream = TcpStream::connect(&candidates[..]).map_err(|source| TransportError::Connect {
        address: address.clone(),
        source,
    })?;
    stream.set_nodelay(true)?;
    info!(%address, "connected tcp endpoint");
    Ok(MspStream::from_tcp(stream, address))
}

/// Bind a UDP socket and, when the remote end is known, connect it.
///
/// An unspecified remote host (`""`, `0.0.0.0`, `::`) means "listen": without
/// a bind port the socket binds the primary port and replies to whoever sent
/// the latest datagram; with a bind port the remote is taken to be loopback.
pub fn open_udp(
    host: &str,
    port: u16,
    bind_host: Option<&str>,
    bind_port: Option<u16>,
) -> Result<MspStream> {
    let unspecified = matches!(host, "" | "0.0.0.0" | "::");
    let ipv6 = host.contains(':');

    let local_port = match (bind_port, unspecified) {
        (Some(bind_port), _) => bind_port,
        (None, true) => port,
        (None, false) => 0,
    };
    let local_host = bind_host.unwrap_or(if ipv6 { "::" } else { "0.0.0.0" });
    let local = host_port(local_host, local_port);
    let socket = UdpSocket::bind(&local).map_err(|source| TransportError::Bind {
        address: local.clone(),
        source,
    })?;
    socket.set_read_timeout(Some(UDP_POLL_INTERVAL))?;

    let remote = if !unspecified {
        Some(host_port(host, port))
    } else if bind_port.is_some() {
        Some(host_port(if ipv6 { "::1" } else { "127.0.0.1" }, port))
    } else {
        None
    };

    if let Some(remote) = &remote {
        let candidates = resolve(remote)?;
        socket
            .connect(&candidates[..])
            .map_err(|source| TransportError::Connect {
                address: remote.clone(),
                source,
            })?;
    }

    let label = remote.clone().unwrap_or_else(|| local.clone());
    info!(%local, remote = remote.as_deref().unwrap_or("<learned>"), "opened udp endpoint");
    Ok(MspStream::from_udp(
        UdpLink {
            socket,
            connected: remote.is_some(),
            peer: Arc::new(Mutex::new(None)),
        },
        label,
    ))
}

fn resolve(address: &str) -> Result<Vec<SocketAddr>> {
    let candidates: Vec<SocketAddr> = address
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            address: address.to_string(),
            source,
        })?
        .collect();
    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            address: address.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
        });
    }
    Ok(candidates)
}

/// UDP socket used as a stream source. Every datagram is assumed to carry
/// whole frames; the decoder does not care either way.
pub(crate) struct UdpLink {
    socket: UdpSocket,
    connected: bool,
    peer: Arc<Mutex<Option<SocketAddr>>>,
}

impl UdpLink {
    pub(crate) fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let (read, from) = self.socket.recv_from(buf)?;
            if read == 0 {
                // An empty datagram is not end-of-stream.
                continue;
            }
            if !self.connected {
                *self.peer.lock().unwrap_or_else(|e| e.into_inner()) = Some(from);
            }
            return Ok(read);
        }
    }

    pub(crate) fn send(&self, buf: &[u8]) -> io::Result<usize> {
        if self.connected {
            return self.socket.send(buf);
        }
        let peer = *self.peer.lock().unwrap_or_else(|e| e.into_inner());
        match peer {
            Some(peer) => self.socket.send_to(buf, peer),
            None => {
                debug!(size = buf.len(), "no udp peer yet; dropping datagram");
                Ok(buf.len())
            }
        }
    }

    pub(crate) fn try_clone(&self) -> io::Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone()?,
            connected: self.connected,
            peer: Arc::clone(&self.peer),
        })
    }
}
