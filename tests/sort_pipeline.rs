//! Full pipeline: sort driver → producer → shared region → consumer.

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::Result;

use sortbench::driver::{self, DriverConfig, SortClock};
use sortbench::ipc::{StatConsumer, StatProducer};
use sortbench::lines::regular_files;
use sortbench::sorters::{self, Algorithm};
use sortbench::SortStat;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sortbench-pipeline-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn driver_publishes_one_record_per_file_algorithm_pair() -> Result<()> {
    let base = scratch_dir("s1");
    let input = base.join("input");
    let output = base.join("output");
    fs::create_dir_all(&input)?;
    fs::create_dir_all(&output)?;
    fs::write(input.join("a.txt"), "pear\napple\nfig\n")?;
    fs::write(input.join("b.txt"), "solo\n")?;

    let token = base.join("token");
    File::create(&token)?;
    let token_str = token.to_string_lossy().into_owned();

    let algorithms = sorters::dedup_preserving_order(&[
        Algorithm::Quick,
        Algorithm::Bubble,
        Algorithm::Quick, // duplicate selection collapses
    ]);
    assert_eq!(algorithms.len(), 2);

    let files = regular_files(&input)?;
    let mut producer = StatProducer::open(&token_str, files.len(), algorithms.len())?;
    producer.publish_algorithm_list(&sorters::join_names(&algorithms))?;

    let (attached_tx, attached_rx) = mpsc::channel();
    let consumer_token = token_str.clone();
    let consumer = thread::spawn(move || -> Result<Vec<SortStat>> {
        let mut consumer = StatConsumer::attach(&consumer_token)?;
        attached_tx.send(()).ok();
        let mut records = Vec::new();
        consumer.drain(|stat| records.push(stat))?;
        consumer.detach()?;
        Ok(records)
    });
    attached_rx.recv()?;

    let config = DriverConfig {
        input_dir: input.clone(),
        output_dir: output.clone(),
        algorithms: algorithms.clone(),
        clock: SortClock::Monotonic,
        report: None,
    };
    driver::run(&config, &files, &mut producer)?;
    producer.await_detach_then_destroy();

    let records = consumer.join().unwrap()?;
    assert_eq!(records.len(), files.len() * algorithms.len());

    // Files in census order; algorithms in selection order within each file.
    let mut expected_pairs = Vec::new();
    for file in &files {
        for algorithm in &algorithms {
            expected_pairs.push((file.clone(), algorithm.name().to_string()));
        }
    }
    let actual_pairs: Vec<(String, String)> = records
        .iter()
        .map(|r| (r.filename.clone(), r.algorithm.clone()))
        .collect();
    assert_eq!(actual_pairs, expected_pairs);

    for record in &records {
        let expected_lines = if record.filename == "a.txt" { 3 } else { 1 };
        assert_eq!(record.nlines, expected_lines, "{}", record.filename);
        assert!(record.time_ms >= 0.0);
    }

    // The sorted outputs landed next to the inputs, sorted.
    assert_eq!(
        fs::read_to_string(output.join("a.txt"))?,
        "apple\nfig\npear\n"
    );
    assert_eq!(fs::read_to_string(output.join("b.txt"))?, "solo\n");

    let _ = fs::remove_dir_all(&base);
    Ok(())
}

#[test]
fn existing_outputs_are_not_clobbered() -> Result<()> {
    let base = scratch_dir("skip");
    let input = base.join("input");
    let output = base.join("output");
    fs::create_dir_all(&input)?;
    fs::create_dir_all(&output)?;
    fs::write(input.join("data.txt"), "b\na\n")?;
    fs::write(output.join("data.txt"), "pre-existing\n")?;

    let token = base.join("token");
    File::create(&token)?;
    let token_str = token.to_string_lossy().into_owned();

    let algorithms = vec![Algorithm::Shell];
    let files = regular_files(&input)?;
    let mut producer = StatProducer::open(&token_str, files.len(), algorithms.len())?;
    producer.publish_algorithm_list(&sorters::join_names(&algorithms))?;

    let config = DriverConfig {
        input_dir: input,
        output_dir: output.clone(),
        algorithms,
        clock: SortClock::Monotonic,
        report: None,
    };
    driver::run(&config, &files, &mut producer)?;
    producer.await_detach_then_destroy();

    assert_eq!(
        fs::read_to_string(output.join("data.txt"))?,
        "pre-existing\n"
    );

    let _ = fs::remove_dir_all(&base);
    Ok(())
}
