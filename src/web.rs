//! Embedded statistics web server (the viewer's second thread).
//!
//! The drain loop appends one HTML table row per record to a shared content
//! buffer; this thread serves a snapshot of that buffer to every connection
//! as a complete HTTP/1.0 response and closes. No request parsing happens at
//! all — whatever the client sent is ignored.
//!
//! Shutdown: the main thread raises the flag, shuts the listening socket
//! down in both directions and joins. The accept loop wakes with an error,
//! sees the flag, and exits.

use std::io::{self, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use crate::constants::HTTP_MAX_CONNECTIONS;
use crate::error::Result;

/// Accumulated table rows, shared between the drain loop and the server.
pub type ContentBuffer = Arc<Mutex<String>>;

/// Fixed scaffold wrapped around the row buffer on every response.
const PAGE_PREFIX: &str = "<html><head><title>Sorter Statistics</title></head><body>\
<table border='1'><caption>Sorter benchmark results</caption>\
<tr><td>filename</td><td>nlines</td><td>algorithm</td><td>niterations</td><td>nswaps</td>\
<td>time</td></tr>";
const PAGE_SUFFIX: &str = "</table></body></html>";

/// Create an empty content buffer.
pub fn content_buffer() -> ContentBuffer {
    Arc::new(Mutex::new(String::new()))
}

/// Append one rendered row under the buffer lock.
pub fn push_row(content: &ContentBuffer, row: &str) {
    content.lock().push_str(row);
}

/// Handle to the serving thread.
pub struct WebServer {
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    port: u16,
}

impl WebServer {
    /// Bind `[::]` (falling back to `0.0.0.0`) on `port` and start serving.
    ///
    /// Port 0 asks the kernel for an ephemeral port; `port()` reports the
    /// bound one.
    pub fn spawn(port: u16, content: ContentBuffer) -> Result<Self> {
        let listener = bind_listener(port)?;
        let port = listener.local_addr()?.port();

        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_listener = listener.try_clone()?;
        let flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || serve_loop(accept_listener, content, flag));

        info!(port, "statistics web server listening");
        Ok(Self {
            listener,
            shutdown,
            handle: Some(handle),
            port,
        })
    }

    /// Port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting, wake the blocked accept, and join the thread.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // SAFETY: the fd stays valid until self drops below; shutting it
        // down both ways is what unblocks the accept call.
        unsafe {
            libc::shutdown(self.listener.as_raw_fd(), libc::SHUT_RDWR);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!("statistics web server stopped");
    }
}

fn bind_listener(port: u16) -> Result<TcpListener> {
    let v6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    match bind_one(v6) {
        Ok(listener) => Ok(listener),
        Err(err) => {
            debug!(%err, "IPv6 bind failed; trying IPv4");
            Ok(bind_one(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?)
        }
    }
}

fn bind_one(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    // Don't hold the port hostage across restarts.
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(HTTP_MAX_CONNECTIONS)?;
    Ok(socket.into())
}

fn serve_loop(listener: TcpListener, content: ContentBuffer, shutdown: Arc<AtomicBool>) {
    for connection in listener.incoming() {
        match connection {
            Ok(mut stream) => {
                if let Err(err) = serve_one(&mut stream, &content) {
                    warn!(%err, "response write failed");
                }
            }
            Err(err) => {
                if shutdown.load(Ordering::SeqCst) {
                    debug!("accept loop got the shutdown signal");
                    break;
                }
                warn!(%err, "connection accept failed");
            }
        }
    }
}

fn serve_one(stream: &mut TcpStream, content: &ContentBuffer) -> io::Result<()> {
    let body = {
        let rows = content.lock();
        format!("{PAGE_PREFIX}{rows}{PAGE_SUFFIX}")
    };
    let head = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(body.as_bytes())?;
    Ok(())
}
