//! Producer/consumer protocol tests over a real System V region.
//!
//! Each test creates its own token file so the derived keys never collide
//! with another test or a stale run. Producer and consumer run in one
//! process (separate threads) — System V objects do not care, and it keeps
//! the scenarios deterministic.

use std::fs::File;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::Result;

use sortbench::ipc::sem::SemSet;
use sortbench::ipc::shm::ShmSegment;
use sortbench::ipc::{derive_key_pair, StatConsumer, StatProducer};
use sortbench::{SortStat, SortbenchError};

fn token_file(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "sortbench-token-{}-{}",
        tag,
        std::process::id()
    ));
    File::create(&path).unwrap();
    path
}

fn sample_stat(index: i32) -> SortStat {
    SortStat {
        filename: format!("file-{index}.txt"),
        nlines: index + 1,
        algorithm: if index % 2 == 0 { "quick" } else { "bubble" }.to_string(),
        niterations: 10 * index,
        nswaps: 3 * index,
        time_ms: index as f32 * 1.5,
    }
}

/// Consumer in a thread: reports once attached, returns the drained records.
fn spawn_consumer(
    token: String,
) -> (mpsc::Receiver<()>, thread::JoinHandle<Result<Vec<SortStat>>>) {
    let (attached_tx, attached_rx) = mpsc::channel();
    let handle = thread::spawn(move || -> Result<Vec<SortStat>> {
        let mut consumer = StatConsumer::attach(&token)?;
        attached_tx.send(()).ok();
        let mut records = Vec::new();
        consumer.drain(|stat| records.push(stat))?;
        consumer.detach()?;
        Ok(records)
    });
    (attached_rx, handle)
}

fn assert_region_gone(token: &str) {
    let keys = derive_key_pair(token).unwrap();
    for key in [keys.control, keys.data] {
        assert!(matches!(
            SemSet::open_existing(key),
            Err(SortbenchError::ProducerNotRunning)
        ));
        assert!(matches!(
            ShmSegment::open_existing(key),
            Err(SortbenchError::ProducerNotRunning)
        ));
    }
}

#[test]
fn records_are_delivered_exactly_once_in_order() -> Result<()> {
    let token = token_file("order");
    let token_str = token.to_string_lossy().into_owned();

    let mut producer = StatProducer::open(&token_str, 2, 2)?;
    producer.publish_algorithm_list("quick, bubble")?;

    // Two records land before the consumer exists (late join).
    producer.append(&sample_stat(0), false)?;
    producer.append(&sample_stat(1), false)?;

    let (attached, consumer) = spawn_consumer(token_str.clone());
    attached.recv()?;

    producer.append(&sample_stat(2), false)?;
    producer.append(&sample_stat(3), false)?;
    producer.signal_shutdown()?;
    producer.await_detach_then_destroy();

    let records = consumer.join().unwrap()?;
    let expected: Vec<SortStat> = (0..4).map(sample_stat).collect();
    assert_eq!(records, expected);

    assert_region_gone(&token_str);
    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn consumer_snapshots_the_control_header() -> Result<()> {
    let token = token_file("header");
    let token_str = token.to_string_lossy().into_owned();

    let mut producer = StatProducer::open(&token_str, 3, 2)?;
    producer.publish_algorithm_list("merge, shell")?;

    let (attached_tx, attached_rx) = mpsc::channel();
    let consumer_token = token_str.clone();
    let handle = thread::spawn(move || -> Result<(i32, i32, String)> {
        let mut consumer = StatConsumer::attach(&consumer_token)?;
        attached_tx.send(()).ok();
        let header = (
            consumer.file_count(),
            consumer.algorithm_count(),
            consumer.algorithms().to_string(),
        );
        consumer.drain(|_| {})?;
        consumer.detach()?;
        Ok(header)
    });
    attached_rx.recv()?;

    producer.signal_shutdown()?;
    producer.await_detach_then_destroy();

    let (files, algorithms, names) = handle.join().unwrap()?;
    assert_eq!(files, 3);
    assert_eq!(algorithms, 2);
    assert_eq!(names, "merge, shell");

    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn second_consumer_is_locked_out() -> Result<()> {
    let token = token_file("consumer-lockout");
    let token_str = token.to_string_lossy().into_owned();

    let mut producer = StatProducer::open(&token_str, 1, 1)?;
    producer.publish_algorithm_list("quick")?;

    let mut first = StatConsumer::attach(&token_str)?;

    let second = StatConsumer::attach(&token_str);
    assert!(matches!(
        second,
        Err(SortbenchError::AnotherConsumerPresent)
    ));

    // The first consumer's stream is unaffected by the rejected attach.
    producer.append(&sample_stat(0), true)?;
    let mut records = Vec::new();
    first.drain(|stat| records.push(stat))?;
    first.detach()?;
    assert_eq!(records, vec![sample_stat(0)]);

    producer.await_detach_then_destroy();
    assert_region_gone(&token_str);
    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn second_producer_is_locked_out() -> Result<()> {
    let token = token_file("producer-lockout");
    let token_str = token.to_string_lossy().into_owned();

    let mut first = StatProducer::open(&token_str, 1, 1)?;
    first.publish_algorithm_list("bubble")?;

    let second = StatProducer::open(&token_str, 1, 1);
    assert!(matches!(second, Err(SortbenchError::AlreadyRunning)));

    // The first producer's region survived the rejected open.
    first.append(&sample_stat(0), false)?;
    assert_eq!(first.published(), 1);

    first.signal_shutdown()?;
    first.await_detach_then_destroy();
    assert_region_gone(&token_str);
    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn finalize_record_ends_the_drain_early() -> Result<()> {
    let token = token_file("finalize");
    let token_str = token.to_string_lossy().into_owned();

    // Capacity for 20 records, but the run is interrupted after 5.
    let mut producer = StatProducer::open(&token_str, 10, 2)?;
    producer.publish_algorithm_list("quick, bubble")?;

    let (attached, consumer) = spawn_consumer(token_str.clone());
    attached.recv()?;

    for index in 0..4 {
        producer.append(&sample_stat(index), false)?;
    }
    producer.append(&sample_stat(4), true)?;
    producer.signal_shutdown()?;
    producer.await_detach_then_destroy();

    let records = consumer.join().unwrap()?;
    assert_eq!(records.len(), 5);
    assert_eq!(records[4], sample_stat(4));

    assert_region_gone(&token_str);
    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn shutdown_signal_is_idempotent() -> Result<()> {
    let token = token_file("idempotent");
    let token_str = token.to_string_lossy().into_owned();

    let mut producer = StatProducer::open(&token_str, 1, 1)?;
    producer.publish_algorithm_list("shell")?;
    producer.signal_shutdown()?;
    producer.signal_shutdown()?;

    // Exactly one wake is outstanding: the consumer takes it, sees the exit
    // flag with nothing to read, and leaves cleanly.
    let (attached, consumer) = spawn_consumer(token_str.clone());
    attached.recv()?;
    let records = consumer.join().unwrap()?;
    assert!(records.is_empty());

    producer.await_detach_then_destroy();
    assert_region_gone(&token_str);
    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn empty_run_still_hands_the_consumer_a_clean_exit() -> Result<()> {
    let token = token_file("empty");
    let token_str = token.to_string_lossy().into_owned();

    // No input files at all.
    let mut producer = StatProducer::open(&token_str, 0, 2)?;
    producer.publish_algorithm_list("quick, bubble")?;

    let (attached, consumer) = spawn_consumer(token_str.clone());
    attached.recv()?;

    producer.signal_shutdown()?;
    producer.await_detach_then_destroy();

    let records = consumer.join().unwrap()?;
    assert!(records.is_empty());

    assert_region_gone(&token_str);
    let _ = std::fs::remove_file(&token);
    Ok(())
}

#[test]
fn attach_without_a_producer_is_rejected() {
    let token = token_file("no-producer");
    let token_str = token.to_string_lossy().into_owned();

    let result = StatConsumer::attach(&token_str);
    assert!(matches!(result, Err(SortbenchError::ProducerNotRunning)));
    let _ = std::fs::remove_file(&token);
}

#[test]
fn long_strings_survive_the_region_truncated() -> Result<()> {
    let token = token_file("truncation");
    let token_str = token.to_string_lossy().into_owned();

    let mut producer = StatProducer::open(&token_str, 1, 1)?;
    producer.publish_algorithm_list("quick")?;

    let (attached, consumer) = spawn_consumer(token_str.clone());
    attached.recv()?;

    let mut stat = sample_stat(0);
    stat.filename = "f".repeat(5000);
    producer.append(&stat, true)?;
    producer.await_detach_then_destroy();

    let records = consumer.join().unwrap()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename.len(), sortbench::constants::MAXCHARS);
    assert_eq!(records[0].algorithm, stat.algorithm);

    let _ = std::fs::remove_file(&token);
    Ok(())
}
