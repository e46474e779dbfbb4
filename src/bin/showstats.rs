//! showstats - the viewer side of the benchmark harness.
//!
//! Attaches to a running sorter's shared region (identified by the same
//! path token the sorter was started from) and streams every statistics
//! record to stdout or a CSV export, optionally serving them over HTTP.

use std::env;
use std::process;

use sortbench::net::check_port;
use sortbench::viewer::{self, ViewerConfig};

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {program} <path token> [-e <csv file>] [-w <http port>]\n\
         The path token is the sorter executable path the producer was\n\
         started from; '.csv' is appended to the export name when missing."
    );
    process::exit(1);
}

fn parse_args(argv: &[String]) -> ViewerConfig {
    let program = argv[0].as_str();
    let mut path_token = None;
    let mut export = None;
    let mut http_port = None;

    let mut iter = argv[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-e" | "--export" => match iter.next() {
                Some(name) => export = Some(name.clone()),
                None => usage(program),
            },
            "-w" | "--http" => match iter.next() {
                Some(text) => match text.parse::<u32>() {
                    Ok(port) => http_port = Some(port),
                    Err(_) => {
                        eprintln!("'{text}' is not a port number");
                        usage(program);
                    }
                },
                None => usage(program),
            },
            other if !other.starts_with('-') && path_token.is_none() => {
                path_token = Some(other.to_string());
            }
            other => {
                eprintln!("unknown option '{other}'");
                usage(program);
            }
        }
    }

    let Some(path_token) = path_token else {
        usage(program);
    };

    // Range-check the port up front so the typed exit code fires before any
    // attach attempt.
    let http_port = match http_port {
        Some(port) => match check_port(port) {
            Ok(port) => Some(port),
            Err(err) => {
                eprintln!("showstats: {err}");
                process::exit(err.exit_code());
            }
        },
        None => None,
    };

    ViewerConfig {
        path_token,
        export,
        http_port,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = env::args().collect();
    let config = parse_args(&argv);

    if let Err(err) = viewer::run(&config) {
        eprintln!("showstats: {err}");
        process::exit(err.exit_code());
    }
}
