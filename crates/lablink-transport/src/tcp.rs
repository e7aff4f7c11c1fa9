use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use bytes::Bytes;
use tracing::debug;

use crate::descriptor::split_host_port;
use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// TCP transport.
///
/// Covers LAN instruments, LXI raw-socket ports, and serial-over-terminal
/// servers. The port may be left unset at construction and filled in later
/// through [`set_default_port`](Tcp::set_default_port), so a driver can
/// carry the protocol default while the user only names the host.
pub struct Tcp {
    host: String,
    port: Option<u16>,
    buffer_size: usize,
    stream: Option<TcpStream>,
}

impl Tcp {
    /// Default receive chunk size.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// Create a TCP transport for `host`, optionally fixing the port.
    pub fn new(host: impl Into<String>, port: impl Into<Option<u16>>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            stream: None,
        }
    }

    /// Create a TCP transport from a `host[:port]` descriptor.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let (host, port) = split_host_port(descriptor)?;
        Ok(Self::new(host, port))
    }

    /// Receive chunk size for subsequent reads.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the port only if none has been set yet.
    ///
    /// Lets the user leave the port empty and the driver or protocol layer
    /// supply its default later.
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
        "tcp"
    }

    fn connected(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl Transport for Tcp {
    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let port = self.port.ok_or_else(|| TransportError::MissingPort {
            descriptor: self.host.clone(),
        })?;
        let stream =
            TcpStream::connect((self.host.as_str(), port)).map_err(|e| TransportError::Connect {
                descriptor: self.descriptor(),
                source: e,
            })?;
        // Instrument exchanges are short request/response turns; keep them
        // out of Nagle's queue.
        stream.set_nodelay(true)?;
        debug!(descriptor = %self.descriptor(), "connected over tcp");
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            // Shut down both halves so a cloned receive observes EOF
            // instead of hanging. Teardown errors on a dead peer are noise.
            let _ = stream.shutdown(Shutdown::Both);
            debug!(descriptor = %self.descriptor(), "closed tcp transport");
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.connected()?.write_all(data).map_err(Into::into)
    }

    fn receive(&mut self) -> Result<Bytes> {
        let buffer_size = self.buffer_size;
        let stream = self.connected()?;
        let mut chunk = vec![0u8; buffer_size];
        loop {
            match stream.read(&mut chunk) {
                Ok(n) => return Ok(Bytes::copy_from_slice(&chunk[..n])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn try_clone(&self) -> Result<Self> {
        let stream = match &self.stream {
            Some(stream) => Some(stream.try_clone()?),
            None => None,
        };
        Ok(Self {
            host: self.host.clone(),
            port: self.port,
            buffer_size: self.buffer_size,
            stream,
        })
    }
}

impl std::fmt::Debug for Tcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tcp")
            .field("descriptor", &self.descriptor())
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn open_without_a_port_fails_fast() {
        let mut tcp = Tcp::new("127.0.0.1", None);
        assert!(matches!(
            tcp.open(),
            Err(TransportError::MissingPort { .. })
        ));
    }

    #[test]
    fn default_port_fills_only_an_unset_port() {
        let mut tcp = Tcp::new("scope.lab.local", None);
        tcp.set_default_port(5025);
        assert_eq!(tcp.descriptor(), "scope.lab.local:5025");

        let mut fixed = Tcp::new("scope.lab.local", 4880);
        fixed.set_default_port(5025);
        assert_eq!(fixed.descriptor(), "scope.lab.local:4880");
    }

    #[test]
    fn descriptor_form_roundtrips() {
        let tcp = Tcp::from_descriptor("192.168.1.40:5025").unwrap();
        assert_eq!(tcp.descriptor(), "192.168.1.40:5025");
        assert!(matches!(
            Tcp::from_descriptor("host:notaport"),
            Err(TransportError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn write_and_receive_need_an_open_connection() {
        let mut tcp = Tcp::new("127.0.0.1", 5025);
        assert!(matches!(
            tcp.write(b"*IDN?\n"),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(tcp.receive(), Err(TransportError::NotConnected)));
    }

    #[test]
    fn roundtrip_against_a_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = peer.read(&mut buf).unwrap();
            peer.write_all(&buf[..n]).unwrap();
            // Dropping the socket closes the connection.
        });

        let mut tcp = Tcp::new("127.0.0.1", port);
        tcp.open().unwrap();
        tcp.write(b"*IDN?\n").unwrap();

        let reply = tcp.receive().unwrap();
        assert_eq!(reply.as_ref(), b"*IDN?\n");

        let eof = tcp.receive().unwrap();
        assert!(eof.is_empty(), "peer close should surface as an empty chunk");

        server.join().expect("server thread should finish");
    }

    #[test]
    fn close_unblocks_a_cloned_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut tcp = Tcp::new("127.0.0.1", port);
        tcp.open().unwrap();

        // Hold the server side open so only close() can end the wait.
        let (server_side, _) = listener.accept().unwrap();

        let mut receiver = tcp.try_clone().unwrap();
        let blocked = thread::spawn(move || receiver.receive());

        thread::sleep(Duration::from_millis(20));
        tcp.close().unwrap();

        let outcome = blocked.join().expect("receive thread should finish");
        match outcome {
            Ok(chunk) => assert!(chunk.is_empty()),
            Err(_) => {}
        }
        drop(server_side);
    }

    #[test]
    fn reopen_after_close_makes_a_fresh_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            for _ in 0..2 {
                let (mut peer, _) = listener.accept().unwrap();
                peer.write_all(b"hi").unwrap();
            }
        });

        let mut tcp = Tcp::new("127.0.0.1", port);
        tcp.open().unwrap();
        assert_eq!(tcp.receive().unwrap().as_ref(), b"hi");
        tcp.close().unwrap();

        tcp.open().unwrap();
        assert_eq!(tcp.receive().unwrap().as_ref(), b"hi");
        tcp.close().unwrap();

        server.join().expect("server thread should finish");
    }
}
