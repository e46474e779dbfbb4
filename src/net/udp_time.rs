//! UDP time protocol: empty-datagram request, ASCII microsecond reply.
//!
//! The client lets the sorter time its runs against an external clock; the
//! server side backs the standalone `udptime` binary. Both ends speak the
//! same trivial wire format: the request carries no payload, the reply is a
//! decimal integer of microseconds since the Unix epoch.

use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::constants::{PORT_RANGE_MAX, PORT_RANGE_MIN};
use crate::error::{Result, SortbenchError};

/// How long the client waits for a timestamp reply before giving up.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Validate a port argument against the allowed range.
pub fn check_port(port: u32) -> Result<u16> {
    if !(PORT_RANGE_MIN..=PORT_RANGE_MAX).contains(&port) {
        return Err(SortbenchError::port_out_of_range(port));
    }
    Ok(port as u16)
}

/// Parse and validate an IPv4 address argument.
pub fn check_ipv4(addr: &str) -> Result<Ipv4Addr> {
    addr.parse()
        .map_err(|_| SortbenchError::invalid_ip(addr))
}

/// Client half of the time protocol.
pub struct UdpTimeClient {
    socket: UdpSocket,
    server: SocketAddrV4,
}

impl UdpTimeClient {
    /// Create a client socket aimed at `addr:port`.
    pub fn connect(addr: &str, port: u32) -> Result<Self> {
        let ip = check_ipv4(addr)?;
        let port = check_port(port)?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_read_timeout(Some(REPLY_TIMEOUT))?;
        Ok(Self {
            socket,
            server: SocketAddrV4::new(ip, port),
        })
    }

    /// Fetch one microsecond timestamp from the server.
    pub fn fetch_micros(&self) -> Result<u64> {
        self.socket.send_to(&[], self.server)?;

        let mut reply = [0u8; 255];
        let len = self.socket.recv(&mut reply)?;
        let text = std::str::from_utf8(&reply[..len]).map_err(|_| {
            SortbenchError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "time server reply is not ASCII",
            ))
        })?;
        let micros = text.trim().parse::<u64>().map_err(|_| {
            SortbenchError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("time server reply '{text}' is not a timestamp"),
            ))
        })?;
        debug!(micros, "time server replied");
        Ok(micros)
    }
}

/// Current wall clock in microseconds since the Unix epoch.
pub fn epoch_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Serve timestamps on `0.0.0.0:port` until the process dies.
pub fn serve_time(port: u32) -> Result<()> {
    let port = check_port(port)?;
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
    info!(port, "time server listening");

    let mut request = [0u8; 16];
    loop {
        let (_, client) = match socket.recv_from(&mut request) {
            Ok(received) => received,
            Err(err) => {
                warn!(%err, "request receive failed");
                continue;
            }
        };
        let reply = epoch_micros().to_string();
        info!(%client, %reply, "serving timestamp");
        if let Err(err) = socket.send_to(reply.as_bytes(), client) {
            warn!(%err, %client, "timestamp send failed");
        }
    }
}
