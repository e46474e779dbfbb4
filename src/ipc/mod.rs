//! Cross-process coordination over System V shared memory.
//!
//! Two independent programs rendezvous here: the sorter (producer) and the
//! statistics viewer (consumer). They share nothing but a pair of segments
//! and a pair of semaphore sets, all keyed off a common path token.
//!
//! ```text
//! sorter (producer)            kernel IPC objects            showstats (consumer)
//! ┌───────────────┐      ┌─────────────────────────┐      ┌──────────────────┐
//! │ StatProducer ─┼──────┼─► control seg + sems    │◄─────┼─ StatConsumer    │
//! │   append()    │      │   data seg + sems       │      │    drain(sink)   │
//! └───────────────┘      └─────────────────────────┘      └──────────────────┘
//! ```
//!
//! Locking discipline: whenever both mutexes are taken together the order is
//! `DATA_MUTEX` then `CTRL_MUTEX`, on both sides. This is the only
//! deadlock-avoidance rule in the protocol.

pub mod consumer;
pub mod key;
pub mod layout;
pub mod producer;
pub mod sem;
pub mod shm;

pub use consumer::StatConsumer;
pub use key::{derive_key_pair, KeyPair};
pub use producer::StatProducer;
