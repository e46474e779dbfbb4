//! The sort driver: feeds the producer controller.
//!
//! Walks the input files, runs every selected algorithm over each one, times
//! the runs, writes the sorted outputs, and hands one record per
//! `(file × algorithm)` pair to the producer. A SIGINT stops enumeration:
//! the record in flight is published with the finalize flag and the drive
//! loop ends.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Local};
use once_cell::sync::OnceCell;
use tracing::warn;

use crate::constants::HEADER_DATE_FORMAT;
use crate::error::Result;
use crate::ipc::StatProducer;
use crate::lines::{load_lines, save_sorted};
use crate::net::{md5sum_of, UdpReportClient, UdpTimeClient};
use crate::record::SortStat;
use crate::sorters::{Algorithm, SortCounters};

/// Moment the first SIGINT arrived, if any. The handler only ever stores
/// into this cell; everything else reads.
static INTERRUPTED_AT: OnceCell<DateTime<Local>> = OnceCell::new();

/// Install the SIGINT hook. Call once, before the drive loop starts.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        let _ = INTERRUPTED_AT.set(Local::now());
    })
    .map_err(|err| std::io::Error::other(err).into())
}

/// Whether a SIGINT has been observed.
pub fn interrupted() -> bool {
    INTERRUPTED_AT.get().is_some()
}

/// Formatted interrupt timestamp for the teardown notice.
pub fn interrupt_notice() -> Option<String> {
    INTERRUPTED_AT
        .get()
        .map(|at| at.format(HEADER_DATE_FORMAT).to_string())
}

/// Clock used to time one sort run.
pub enum SortClock {
    /// Local monotonic clock.
    Monotonic,
    /// Difference of two timestamps fetched from a UDP time server.
    Remote(UdpTimeClient),
}

impl SortClock {
    /// Run `work` and return its elapsed time in milliseconds.
    pub fn time_ms<F: FnOnce()>(&self, work: F) -> Result<f32> {
        match self {
            Self::Monotonic => {
                let started = Instant::now();
                work();
                Ok(started.elapsed().as_secs_f32() * 1000.0)
            }
            Self::Remote(client) => {
                let started = client.fetch_micros()?;
                work();
                let ended = client.fetch_micros()?;
                Ok(ended.saturating_sub(started) as f32 / 1000.0)
            }
        }
    }
}

/// Driver configuration, assembled by the sorter binary.
pub struct DriverConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Deduplicated, in first-occurrence order.
    pub algorithms: Vec<Algorithm>,
    pub clock: SortClock,
    pub report: Option<UdpReportClient>,
}

/// Process `files` (the census the region was sized from) and publish one
/// record per `(file × algorithm)` pair. Always signals shutdown on the way
/// out, so the consumer wakes even when nothing was published.
pub fn run(config: &DriverConfig, files: &[String], producer: &mut StatProducer) -> Result<()> {
    let files_total = files.len();
    let algorithms_total = config.algorithms.len();

    'files: for (file_index, name) in files.iter().enumerate() {
        if interrupted() {
            break;
        }
        let input_path = config.input_dir.join(name);
        let output_path = config.output_dir.join(name);
        let lines = load_lines(&input_path)?;

        for (algorithm_index, algorithm) in config.algorithms.iter().enumerate() {
            // Each algorithm sorts its own clone of the line references.
            let mut view: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
            let mut counters = SortCounters::default();
            let time_ms = config
                .clock
                .time_ms(|| counters = algorithm.run(&mut view))?;

            save_sorted(&output_path, &view)?;

            let stat = SortStat {
                filename: name.clone(),
                nlines: lines.len() as i32,
                algorithm: algorithm.name().to_string(),
                niterations: counters.iterations,
                nswaps: counters.swaps,
                time_ms,
            };
            println!(
                "[{}/{}]{}:[{}/{}]{}:{:.0}",
                file_index + 1,
                files_total,
                stat.filename,
                algorithm_index + 1,
                algorithms_total,
                stat.algorithm,
                stat.time_ms
            );

            let finalize = interrupted();
            producer.append(&stat, finalize)?;

            if let Some(report) = &config.report {
                match md5sum_of(&output_path) {
                    Some(md5) => report.report(&stat, &md5),
                    None => {
                        warn!(path = %output_path.display(), "md5sum failed; reporting without digest");
                        report.report(&stat, "");
                    }
                }
            }

            if finalize {
                break 'files;
            }
        }
    }

    producer.signal_shutdown()?;

    if let Some(at) = interrupt_notice() {
        println!("\nOperation interrupted by user {at}");
    }
    Ok(())
}
