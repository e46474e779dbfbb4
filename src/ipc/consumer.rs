//! Consumer side of the shared statistics region.
//!
//! A consumer attaches to an existing region, claims the single consumer
//! slot under `CTRL_MUTEX`, holds the exit gate while it drains, and
//! delivers every published record exactly once, in producer order.

use std::sync::atomic::Ordering;

use tracing::{debug, warn};

use crate::constants::{CTRL_MUTEX, DATA_AVAILABLE, DATA_MUTEX, EXIT_GATE};
use crate::error::{Result, SortbenchError};
use crate::ipc::key::derive_key_pair;
use crate::ipc::layout::{read_inline_str, ControlBlock, StatSlot};
use crate::ipc::sem::SemSet;
use crate::ipc::shm::ShmSegment;
use crate::record::SortStat;

/// Consumer controller over an existing shared region.
///
/// State machine: `Unattached → Locked → Draining → Detached`; any failure
/// in `drain` still ends in `Detached` because the viewer detaches on both
/// paths, and `Drop` covers the remainder defensively.
pub struct StatConsumer {
    control_seg: ShmSegment,
    data_seg: ShmSegment,
    ctrl_sems: SemSet,
    data_sems: SemSet,
    n_files: i32,
    n_algorithms: i32,
    algorithms: String,
    detached: bool,
}

impl StatConsumer {
    /// Attach to the producer's region under `path_token` and claim the
    /// consumer slot.
    ///
    /// Blocks on `CTRL_MUTEX` until the producer has published its algorithm
    /// list. Fails with `ProducerNotRunning` when the region does not exist
    /// and `AnotherConsumerPresent` when the slot is taken.
    pub fn attach(path_token: &str) -> Result<Self> {
        let keys = derive_key_pair(path_token)?;

        let mut control_seg = ShmSegment::open_existing(keys.control)?;

        // Defensive hint only; `locked` under CTRL_MUTEX is the authority.
        // Exactly one attacher (the producer) is expected at this point.
        match control_seg.attach_count()? {
            0 => return Err(SortbenchError::ProducerNotRunning),
            1 => {}
            _ => return Err(SortbenchError::AnotherConsumerPresent),
        }

        control_seg.attach(false)?;
        let ctrl_sems = SemSet::open_existing(keys.control)?;

        let mut data_seg = ShmSegment::open_existing(keys.data)?;
        data_seg.attach(true)?;
        let data_sems = SemSet::open_existing(keys.data)?;

        let mut consumer = Self {
            control_seg,
            data_seg,
            ctrl_sems,
            data_sems,
            n_files: 0,
            n_algorithms: 0,
            algorithms: String::new(),
            detached: false,
        };

        consumer.claim_slot()?;
        consumer.ctrl_sems.wait(EXIT_GATE)?;
        debug!("consumer attached and holding the exit gate");
        Ok(consumer)
    }

    fn claim_slot(&mut self) -> Result<()> {
        self.ctrl_sems.wait(CTRL_MUTEX)?;

        if self.control().locked.load(Ordering::Acquire) != 0 {
            // Leave everything untouched for the consumer that owns the slot.
            self.ctrl_sems.post(CTRL_MUTEX)?;
            self.detached = true;
            let _ = self.data_seg.detach();
            let _ = self.control_seg.detach();
            return Err(SortbenchError::AnotherConsumerPresent);
        }

        // Header fields are stable once the producer released CTRL_MUTEX
        // for the first time.
        let (files, algorithms, names) = {
            let ctrl = self.control();
            ctrl.locked.store(1, Ordering::Release);
            (
                ctrl.number_of_files.load(Ordering::Acquire),
                ctrl.number_of_algorithms.load(Ordering::Acquire),
                read_inline_str(&ctrl.selected_algorithms),
            )
        };
        self.n_files = files;
        self.n_algorithms = algorithms;
        self.algorithms = names;

        self.ctrl_sems.post(CTRL_MUTEX)?;
        Ok(())
    }

    fn control(&self) -> &ControlBlock {
        // SAFETY: attached for the lifetime of self; see producer.rs.
        unsafe { &*(self.control_seg.as_ptr() as *const ControlBlock) }
    }

    fn slot_ptr(&self) -> *const StatSlot {
        self.data_seg.as_ptr() as *const StatSlot
    }

    /// Comma-joined algorithm names the producer selected.
    pub fn algorithms(&self) -> &str {
        &self.algorithms
    }

    /// Number of input files the producer plans to process.
    pub fn file_count(&self) -> i32 {
        self.n_files
    }

    /// Number of distinct algorithms the producer selected.
    pub fn algorithm_count(&self) -> i32 {
        self.n_algorithms
    }

    /// Drain records until the producer finalizes, invoking `sink` for each
    /// record outside the critical section.
    ///
    /// One record is delivered per `DATA_AVAILABLE` wake; when more unread
    /// records remain the consumer re-raises the signal itself (the
    /// self-pump), so a late joiner catches up without further producer
    /// wakes while the signal stays bounded to one outstanding wake.
    pub fn drain<F: FnMut(SortStat)>(&mut self, mut sink: F) -> Result<()> {
        let mut cursor: usize = 0;
        loop {
            self.data_sems.wait(DATA_AVAILABLE)?;
            self.data_sems.wait(DATA_MUTEX)?;

            let ctrl = self.control();
            let snap_index = ctrl.index_stat.load(Ordering::Acquire).max(0) as usize;
            let snap_exit = ctrl.to_exit.load(Ordering::Acquire) != 0;

            let mut record = None;
            if cursor < snap_index {
                // SAFETY: slots below snap_index are published and immutable;
                // cursor < snap_index <= capacity.
                let slot = unsafe { self.slot_ptr().add(cursor).read() };
                record = Some(slot);
                cursor += 1;
                if cursor < snap_index {
                    self.data_sems.raise_if_clear(DATA_AVAILABLE)?;
                }
            }
            let exit_now = snap_exit && cursor >= snap_index;

            self.data_sems.post(DATA_MUTEX)?;

            if let Some(slot) = record {
                sink(SortStat::from_slot(&slot));
            }
            if exit_now {
                debug!(records = cursor, "producer finalized; drain complete");
                return Ok(());
            }
        }
    }

    /// Release the consumer slot, detach, and release the exit gate so the
    /// producer may destroy the region.
    pub fn detach(&mut self) -> Result<()> {
        if self.detached {
            return Ok(());
        }

        self.ctrl_sems.wait(CTRL_MUTEX)?;
        self.control().locked.store(0, Ordering::Release);
        self.ctrl_sems.post(CTRL_MUTEX)?;

        self.data_seg.detach()?;
        self.control_seg.detach()?;
        self.detached = true;

        self.ctrl_sems.post(EXIT_GATE)?;
        debug!("consumer detached and released the exit gate");
        Ok(())
    }
}

impl Drop for StatConsumer {
    fn drop(&mut self) {
        // A consumer that dies without detaching would block the producer's
        // teardown forever; release the slot and the gate best-effort.
        if !self.detached {
            warn!("consumer dropped while attached; detaching defensively");
            if let Err(err) = self.detach() {
                warn!(%err, "defensive detach failed; region may stay held");
            }
        }
    }
}
