//! UDP result reporting.
//!
//! After each sort the producer can broadcast a one-line result to a remote
//! collector: `nickname,model,filename,md5,algorithm,time_ms`. The reply is
//! `+OK` or `-ERR ...` and is informational only — every failure on this
//! path is logged and dropped, the benchmark run never stops for it.

use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{MAXCHARS, MD5SUM_CHARS, NICKNAME};
use crate::error::Result;
use crate::net::udp_time::{check_ipv4, check_port};
use crate::record::SortStat;

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Client half of the result-report protocol.
pub struct UdpReportClient {
    socket: UdpSocket,
    server: SocketAddrV4,
    model: String,
}

impl UdpReportClient {
    /// Create a client socket aimed at `addr:port`, capturing the machine
    /// model name sent with every report.
    pub fn connect(addr: &str, port: u32) -> Result<Self> {
        let ip = check_ipv4(addr)?;
        let port = check_port(port)?;

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.set_read_timeout(Some(REPLY_TIMEOUT))?;
        Ok(Self {
            socket,
            server: SocketAddrV4::new(ip, port),
            model: machine_model(),
        })
    }

    /// Send one result line and log the server's verdict. Never fails the
    /// run: transport problems and `-ERR` replies are both just logged.
    pub fn report(&self, stat: &SortStat, md5: &str) {
        let line = format!(
            "{},{},{},{},{},{:.0}",
            NICKNAME, self.model, stat.filename, md5, stat.algorithm, stat.time_ms
        );

        if let Err(err) = self.socket.send_to(line.as_bytes(), self.server) {
            warn!(%err, "result report send failed");
            return;
        }

        let mut reply = [0u8; MAXCHARS];
        match self.socket.recv(&mut reply) {
            Ok(len) => {
                let text = String::from_utf8_lossy(&reply[..len]);
                if text.starts_with("+OK") {
                    debug!(%text, "result accepted");
                } else {
                    warn!(%text, "result rejected by server");
                }
            }
            Err(err) => warn!(%err, "no reply from results server"),
        }
    }
}

/// CPU model name reported to the results server.
fn machine_model() -> String {
    let system = sysinfo::System::new_all();
    system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// md5 digest of a file, via the `md5sum` utility.
///
/// Returns `None` (logged by the caller) when the utility is missing or the
/// file cannot be hashed.
pub fn md5sum_of(path: &Path) -> Option<String> {
    let output = Command::new("md5sum").arg(path).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let digest: String = text.chars().take(MD5SUM_CHARS).collect();
    (digest.len() == MD5SUM_CHARS && digest.chars().all(|c| c.is_ascii_hexdigit()))
        .then_some(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket as StdUdpSocket;
    use std::thread;

    #[test]
    fn report_line_reaches_server_and_reply_is_consumed() {
        let server = StdUdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = server.local_addr().unwrap().port() as u32;

        let handle = thread::spawn(move || {
            let mut buf = [0u8; MAXCHARS];
            let (len, client) = server.recv_from(&mut buf).unwrap();
            server.send_to(b"+OK", client).unwrap();
            String::from_utf8_lossy(&buf[..len]).into_owned()
        });

        let client = UdpReportClient::connect("127.0.0.1", port).unwrap();
        let stat = SortStat {
            filename: "a.txt".into(),
            nlines: 3,
            algorithm: "quick".into(),
            niterations: 5,
            nswaps: 1,
            time_ms: 9.7,
        };
        client.report(&stat, "0123456789abcdef0123456789abcdef");

        let line = handle.join().unwrap();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], NICKNAME);
        assert_eq!(fields[2], "a.txt");
        assert_eq!(fields[4], "quick");
        assert_eq!(fields[5], "10");
    }

    #[test]
    fn md5_of_missing_file_is_none() {
        assert!(md5sum_of(Path::new("/no/such/file-for-md5")).is_none());
    }
}
