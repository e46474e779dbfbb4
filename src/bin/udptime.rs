//! udptime - the UDP time server.
//!
//! Replies to every datagram (the request payload is ignored) with the
//! current wall clock as an ASCII decimal count of microseconds since the
//! Unix epoch. The sorter's remote-clock mode points at this server.

use std::env;
use std::process;

use sortbench::net::serve_time;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = env::args().collect();
    if argv.len() != 2 {
        eprintln!("Usage: {} <port to listen>", argv[0]);
        process::exit(1);
    }

    let port = match argv[1].parse::<u32>() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("'{}' is not a port number", argv[1]);
            process::exit(1);
        }
    };

    if let Err(err) = serve_time(port) {
        eprintln!("udptime: {err}");
        process::exit(err.exit_code());
    }
}
