//! # sortbench
//!
//! A two-process benchmark harness for text-file sorting. A long-running
//! **sorter** scans an input directory, runs a configurable set of
//! comparison sorts over each file, and publishes per-`(file × algorithm)`
//! statistics into a System V shared-memory region. A separate **showstats**
//! viewer attaches to the same region and streams the records to stdout, a
//! CSV export, and an embedded HTTP endpoint — in publish order, exactly
//! once, without ever linking the producer.
//!
//! The crate is organized around that rendezvous:
//!
//! - [`ipc`] — the region layout, semaphore discipline and the two
//!   controllers ([`ipc::StatProducer`], [`ipc::StatConsumer`])
//! - [`driver`] — the sort driver feeding the producer
//! - [`sorters`] — the comparison-sort algorithm set with work counters
//! - [`viewer`] / [`web`] — the consumer loop and its HTTP serve thread
//! - [`net`] — the optional UDP time source and result reporter

pub mod constants;
pub mod driver;
pub mod error;
pub mod ipc;
pub mod lines;
pub mod net;
pub mod record;
pub mod sorters;
pub mod viewer;
pub mod web;

pub use error::{Result, SortbenchError};
pub use record::SortStat;
