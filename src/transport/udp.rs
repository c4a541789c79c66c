//! UDP transport for networked vocoder servers (AMBEserver and friends)
//!
//! The server is addressed as `ip:port`. The local socket binds the same
//! port on all interfaces and every request goes to the server address.
//!
//! Each response is one datagram: `prepare_next_message` waits briefly for
//! it and stages it, then `read` drains the staged bytes.

use super::Transport;
use crate::constants::{MIN_UDP_PORT, UDP_BUFFER_SIZE, UDP_RECEIVE_TIMEOUT_MS};
use crate::error::{DvError, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;
use tracing::{debug, info};

/// UDP transport
///
/// # Example
///
/// ```ignore
/// let transport = UdpTransport::open("172.18.0.2:2345")?;
/// ```
pub struct UdpTransport {
    server: SocketAddrV4,
    socket: Option<UdpSocket>,
    response: Box<[u8; UDP_BUFFER_SIZE]>,
    response_len: usize,
    response_pos: usize,
}

impl UdpTransport {
    /// Bind the local socket and target the server at `address`
    pub fn open(address: &str) -> Result<Self> {
        let server = parse_address(address)?;
        let socket = create_reusable_udp_socket(server.port())?;

        info!("Opened UDP vocoder link to {}", server);

        Ok(Self {
            server,
            socket: Some(socket),
            response: Box::new([0u8; UDP_BUFFER_SIZE]),
            response_len: 0,
            response_pos: 0,
        })
    }

    /// Server address requests are sent to
    pub fn server(&self) -> SocketAddrV4 {
        self.server
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(DvError::Closed)
    }
}

impl Transport for UdpTransport {
    fn prepare_next_message(&mut self) -> Result<()> {
        self.response_len = 0;
        self.response_pos = 0;

        let socket = self.socket.as_ref().ok_or(DvError::Closed)?;
        match socket.recv_from(&mut self.response[..]) {
            Ok((n, _)) if n > 0 => {
                self.response_len = n;
                Ok(())
            }
            Ok(_) => Err(DvError::NoMessage),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Err(DvError::NoMessage)
            }
            Err(e) => Err(DvError::Read { source: e }),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.socket()?;
        let remaining = &self.response[self.response_pos..self.response_len];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.response_pos += n;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.socket()?
            .send_to(data, self.server)
            .map_err(|e| DvError::Write { source: e })
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            info!("Closed UDP vocoder link to {}", self.server);
        }
    }
}

/// Parse `a.b.c.d:port`, requiring a non-privileged 4-5 digit port
fn parse_address(address: &str) -> Result<SocketAddrV4> {
    let invalid = |reason| DvError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let (ip, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected ip:port"))?;
    let ip: Ipv4Addr = ip.parse().map_err(|_| invalid("not an IPv4 address"))?;

    if !(4..=5).contains(&port.len()) || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("port must have 4 or 5 digits"));
    }
    let port: u16 = port.parse().map_err(|_| invalid("port out of range"))?;
    if port < MIN_UDP_PORT {
        return Err(invalid("port below 1024"));
    }

    Ok(SocketAddrV4::new(ip, port))
}

/// Create a blocking UDP socket with SO_REUSEADDR bound to `port` on all interfaces
fn create_reusable_udp_socket(port: u16) -> Result<UdpSocket> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let map_err = |e| DvError::UdpBind { port, source: e };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(map_err)?;
    socket.set_reuse_address(true).map_err(map_err)?;
    socket
        .set_read_timeout(Some(Duration::from_millis(UDP_RECEIVE_TIMEOUT_MS)))
        .map_err(map_err)?;
    socket.bind(&addr.into()).map_err(map_err)?;

    debug!("Bound UDP socket on {}", addr);
    Ok(socket.into())
}
