//! The statistics viewer: drains the shared region into stdout or a CSV
//! file, mirroring every record into the web server's content buffer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use tracing::info;

use crate::constants::{CSV_EXTENSION, HEADER_DATE_FORMAT};
use crate::error::Result;
use crate::ipc::StatConsumer;
use crate::web::{self, ContentBuffer, WebServer};

/// Viewer run configuration, assembled from the command line.
pub struct ViewerConfig {
    /// Path token shared with the producer.
    pub path_token: String,
    /// CSV export filename; `.csv` is appended when missing.
    pub export: Option<String>,
    /// Port for the embedded web server.
    pub http_port: Option<u16>,
}

/// Append the CSV extension unless the name already carries it
/// (case-insensitively).
pub fn ensure_csv_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(CSV_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{CSV_EXTENSION}")
    }
}

/// Attach, drain until the producer finalizes, detach.
pub fn run(config: &ViewerConfig) -> Result<()> {
    let content: ContentBuffer = web::content_buffer();
    let server = match config.http_port {
        Some(port) => Some(WebServer::spawn(port, Arc::clone(&content))?),
        None => None,
    };

    let outcome = drain_to_sinks(config, &content);

    if let Some(server) = server {
        server.stop();
    }
    outcome
}

fn drain_to_sinks(config: &ViewerConfig, content: &ContentBuffer) -> Result<()> {
    let mut consumer = StatConsumer::attach(&config.path_token)?;
    info!(
        files = consumer.file_count(),
        algorithms = consumer.algorithm_count(),
        "attached to sorter region"
    );

    let mut out: Box<dyn Write> = match &config.export {
        Some(name) => {
            let filename = ensure_csv_extension(name);
            Box::new(BufWriter::new(File::create(&filename)?))
        }
        None => Box::new(io::stdout().lock()),
    };

    write_header(&mut out, consumer.algorithms())?;

    // The sink cannot return an error to the drain loop; remember the first
    // write failure and surface it afterwards.
    let mut sink_err: Option<io::Error> = None;
    let drained = consumer.drain(|stat| {
        if sink_err.is_none() {
            let write = writeln!(out, "{}", stat.csv_row()).and_then(|()| out.flush());
            if let Err(err) = write {
                sink_err = Some(err);
            }
        }
        web::push_row(content, &stat.html_row());
    });

    let detached = consumer.detach();
    drained?;
    detached?;
    if let Some(err) = sink_err {
        return Err(err.into());
    }
    Ok(())
}

fn write_header(out: &mut dyn Write, algorithms: &str) -> io::Result<()> {
    let date = chrono::Local::now().format(HEADER_DATE_FORMAT);
    writeln!(out, "# showstats - sorter benchmark")?;
    writeln!(out, "# Selected algorithms: {algorithms}")?;
    writeln!(out, "# Date: {date}")?;
    writeln!(out, "# filename,nlines,algorithm,niterations,nswaps,time")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_appended_when_missing() {
        assert_eq!(ensure_csv_extension("results"), "results.csv");
        assert_eq!(ensure_csv_extension("results.dat"), "results.dat.csv");
    }

    #[test]
    fn csv_extension_detected_case_insensitively() {
        assert_eq!(ensure_csv_extension("results.csv"), "results.csv");
        assert_eq!(ensure_csv_extension("results.CSV"), "results.CSV");
    }

    #[test]
    fn header_has_four_comment_lines() {
        let mut buf = Vec::new();
        write_header(&mut buf, "quick, bubble").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with('#')));
        assert_eq!(lines[1], "# Selected algorithms: quick, bubble");
        assert_eq!(lines[3], "# filename,nlines,algorithm,niterations,nswaps,time");
    }
}
