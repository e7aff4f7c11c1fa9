use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::os::fd::AsRawFd;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::descriptor::split_host_port;
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// UDP transport.
///
/// The socket is connected to the target, so one `receive` yields one
/// inbound datagram from it. Datagrams larger than the receive buffer lose
/// their tail; a full buffer triggers a warning because that loss is then
/// likely. A zero-length datagram is indistinguishable from closure on a
/// connected socket, a known limit of this medium.
pub struct Udp {
    host: String,
    port: Option<u16>,
    buffer_size: usize,
    socket: Option<UdpSocket>,
}

impl Udp {
    /// Default receive buffer size. Generous for instrument answers while
    /// keeping the full-buffer warning meaningful.
    pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

    /// Create a UDP transport for `host`, optionally fixing the port.
    pub fn new(host: impl Into<String>, port: impl Into<Option<u16>>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            socket: None,
        }
    }

    /// Create a UDP transport from a `host[:port]` descriptor.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let (host, port) = split_host_port(descriptor)?;
        Ok(Self::new(host, port))
    }

    /// Receive buffer size for subsequent reads.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the port only if none has been set yet.
    pub fn set_default_port(&mut self, port: u16) {
        if self.port.is_none() {
            self.port = Some(port);
        }
    }

    /// The `host:port` form of the target, for diagnostics.
    pub fn descriptor(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "udp"
    }

    fn connected(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(TransportError::NotConnected)
    }
}

impl Transport for Udp {
    fn open(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }
        let port = self.port.ok_or_else(|| TransportError::MissingPort {
            descriptor: self.host.clone(),
        })?;
        let connect_error = |source| TransportError::Connect {
            descriptor: self.descriptor(),
            source,
        };

        let target = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(connect_error)?
            .next()
            .ok_or_else(|| {
                connect_error(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no address found",
                ))
            })?;
        let local = match target {
            SocketAddr::V4(_) => SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local).map_err(connect_error)?;
        socket.connect(target).map_err(connect_error)?;
        debug!(descriptor = %self.descriptor(), "connected over udp");
        self.socket = Some(socket);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(socket) = self.socket.take() {
            // std exposes shutdown for TCP only; go through libc so a
            // cloned receive blocked in recv wakes up.
            // SAFETY: the descriptor is an open socket owned by this
            // process until `socket` drops at the end of this block.
            unsafe {
                let _ = libc::shutdown(socket.as_raw_fd(), libc::SHUT_RDWR);
            }
            debug!(descriptor = %self.descriptor(), "closed udp transport");
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.connected()?.send(data)?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Bytes> {
        let buffer_size = self.buffer_size;
        let socket = self.connected()?;
        let mut chunk = vec![0u8; buffer_size];
        loop {
            match socket.recv(&mut chunk) {
                Ok(n) => {
                    if n == buffer_size {
                        warn!(
                            bytes = n,
                            "inbound datagram filled the receive buffer; its tail may have been dropped"
                        );
                    }
                    return Ok(Bytes::copy_from_slice(&chunk[..n]));
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn try_clone(&self) -> Result<Self> {
        let socket = match &self.socket {
            Some(socket) => Some(socket.try_clone()?),
            None => None,
        };
        Ok(Self {
            host: self.host.clone(),
            port: self.port,
            buffer_size: self.buffer_size,
            socket,
        })
    }
}

impl std::fmt::Debug for Udp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Udp")
            .field("descriptor", &self.descriptor())
            .field("connected", &self.socket.is_some())
            .finish()
    }
}
