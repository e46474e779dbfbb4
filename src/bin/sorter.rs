//! sorter - the producer side of the benchmark harness.
//!
//! Scans an input directory, runs the selected sort algorithms over every
//! regular file, writes the sorted outputs, and publishes one statistics
//! record per `(file × algorithm)` pair into the shared region for a
//! `showstats` viewer to drain.

use std::env;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::process;

use nix::unistd::ForkResult;

use sortbench::constants::HEADER_DATE_FORMAT;
use sortbench::driver::{self, DriverConfig, SortClock};
use sortbench::ipc::StatProducer;
use sortbench::lines::regular_files;
use sortbench::net::{UdpReportClient, UdpTimeClient};
use sortbench::sorters::{self, Algorithm};
use sortbench::{Result, SortbenchError};

struct Args {
    input: PathBuf,
    output: PathBuf,
    algorithms: Vec<Algorithm>,
    daemon: bool,
    log: Option<PathBuf>,
    time_server: Option<(String, u32)>,
    stats_server: Option<(String, u32)>,
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {program} -i <input dir> -o <output dir> -s <algorithm> [-s <algorithm> ...]\n\
         \x20          [-d -l <log file>] [--time-server <ip> --time-port <port>]\n\
         \x20          [--stats-server <ip> --stats-port <port>]\n\
         Algorithms: bubble, merge, quick, shell, qsort\n\
         Daemon mode requires a log file and excludes the UDP modes; the two\n\
         UDP modes are mutually exclusive with each other."
    );
    process::exit(1);
}

fn parse_args(argv: &[String]) -> Args {
    let program = argv[0].as_str();
    let mut args = Args {
        input: PathBuf::new(),
        output: PathBuf::new(),
        algorithms: Vec::new(),
        daemon: false,
        log: None,
        time_server: None,
        stats_server: None,
    };
    let (mut time_addr, mut time_port) = (None::<String>, None::<u32>);
    let (mut stats_addr, mut stats_port) = (None::<String>, None::<u32>);

    let mut iter = argv[1..].iter();
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| -> String {
            match iter.next() {
                Some(v) => v.clone(),
                None => {
                    eprintln!("missing value for {name}");
                    usage(program);
                }
            }
        };
        match flag.as_str() {
            "-i" | "--input" => args.input = PathBuf::from(value(flag)),
            "-o" | "--output" => args.output = PathBuf::from(value(flag)),
            "-s" | "--algorithm" => {
                let tag = value(flag);
                match Algorithm::parse(&tag) {
                    Some(algorithm) => args.algorithms.push(algorithm),
                    None => {
                        eprintln!("unknown algorithm '{tag}'");
                        usage(program);
                    }
                }
            }
            "-d" | "--daemon" => args.daemon = true,
            "-l" | "--log" => args.log = Some(PathBuf::from(value(flag))),
            "--time-server" => time_addr = Some(value(flag)),
            "--time-port" => time_port = parse_port(&value(flag), program),
            "--stats-server" => stats_addr = Some(value(flag)),
            "--stats-port" => stats_port = parse_port(&value(flag), program),
            other => {
                eprintln!("unknown option '{other}'");
                usage(program);
            }
        }
    }

    if args.input.as_os_str().is_empty()
        || args.output.as_os_str().is_empty()
        || args.algorithms.is_empty()
    {
        usage(program);
    }

    args.time_server = match (time_addr, time_port) {
        (Some(addr), Some(port)) => Some((addr, port)),
        (None, None) => None,
        _ => {
            eprintln!("--time-server and --time-port must be given together");
            usage(program);
        }
    };
    args.stats_server = match (stats_addr, stats_port) {
        (Some(addr), Some(port)) => Some((addr, port)),
        (None, None) => None,
        _ => {
            eprintln!("--stats-server and --stats-port must be given together");
            usage(program);
        }
    };

    if args.daemon && args.log.is_none() {
        eprintln!("daemon mode requested but no log file given");
        usage(program);
    }
    if args.daemon && (args.time_server.is_some() || args.stats_server.is_some()) {
        eprintln!("daemon mode excludes the UDP modes");
        usage(program);
    }
    if args.time_server.is_some() && args.stats_server.is_some() {
        eprintln!("the time-server and stats-server modes are mutually exclusive");
        usage(program);
    }
    args
}

fn parse_port(text: &str, program: &str) -> Option<u32> {
    match text.parse::<u32>() {
        Ok(port) => Some(port),
        Err(_) => {
            eprintln!("'{text}' is not a port number");
            usage(program);
        }
    }
}

fn daemonize() {
    // SAFETY: single-threaded at this point; the tracing and interrupt
    // machinery is installed after the fork.
    match unsafe { nix::unistd::fork() } {
        Ok(ForkResult::Parent { .. }) => process::exit(0),
        Ok(ForkResult::Child) => {}
        Err(err) => {
            eprintln!("fork for daemon mode failed: {err}");
            process::exit(1);
        }
    }
}

/// Redirect stdout to the log file; the returned handle must stay alive for
/// the duration of the run.
fn redirect_stdout(path: &Path) -> Result<File> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    // SAFETY: both fds are valid; dup2 replaces stdout atomically.
    if unsafe { libc::dup2(file.as_raw_fd(), libc::STDOUT_FILENO) } == -1 {
        return Err(SortbenchError::Io(std::io::Error::last_os_error()));
    }
    Ok(file)
}

fn print_header(argv: &[String], files: usize, algorithms: usize) {
    println!("\n# sorter");
    println!("# options: {}", argv[1..].join(" "));
    println!(
        "# start date: {}",
        chrono::Local::now().format(HEADER_DATE_FORMAT)
    );
    let host = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
    let user = env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    println!("# machine: {host}, user: {user}");
    println!("# PID: {}", process::id());
    println!("# Files to process: {files}");
    println!("# Algorithms to execute: {algorithms}");
    println!("#-----------------------");
}

fn run(args: Args, algorithms: Vec<Algorithm>, argv: &[String]) -> Result<()> {
    // Validate the UDP endpoints before touching any IPC object.
    let clock = match &args.time_server {
        Some((addr, port)) => SortClock::Remote(UdpTimeClient::connect(addr, *port)?),
        None => SortClock::Monotonic,
    };
    let report = match &args.stats_server {
        Some((addr, port)) => Some(UdpReportClient::connect(addr, *port)?),
        None => None,
    };

    if !args.output.is_dir() {
        return Err(SortbenchError::output_write(
            args.output.display().to_string(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "output directory not found"),
        ));
    }

    let files = regular_files(&args.input)?;
    print_header(argv, files.len(), algorithms.len());

    // The path token doubles as the rendezvous identifier for showstats.
    let mut producer = StatProducer::open(&argv[0], files.len(), algorithms.len())?;
    producer.publish_algorithm_list(&sorters::join_names(&algorithms))?;

    let config = DriverConfig {
        input_dir: args.input.clone(),
        output_dir: args.output.clone(),
        algorithms,
        clock,
        report,
    };
    driver::run(&config, &files, &mut producer)?;

    // Blocks until any attached viewer lets go, then removes the region.
    producer.await_detach_then_destroy();
    Ok(())
}

fn main() {
    let argv: Vec<String> = env::args().collect();
    let args = parse_args(&argv);
    let algorithms = sorters::dedup_preserving_order(&args.algorithms);

    if args.daemon {
        daemonize();
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Keep the log handle alive so stdout stays redirected.
    let _log_file = match &args.log {
        Some(path) => match redirect_stdout(path) {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!("unable to log to '{}': {err}", path.display());
                process::exit(err.exit_code());
            }
        },
        None => None,
    };

    if let Err(err) = driver::install_interrupt_handler() {
        eprintln!("unable to install the SIGINT handler: {err}");
        process::exit(err.exit_code());
    }

    if let Err(err) = run(args, algorithms, &argv) {
        eprintln!("sorter: {err}");
        process::exit(err.exit_code());
    }
}
