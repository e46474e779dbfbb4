//! Producer side of the shared statistics region.
//!
//! The producer owns the region lifecycle: it creates both segments and both
//! semaphore sets exclusively (a second producer under the same path token
//! fails with `AlreadyRunning`), admits at most one consumer, appends
//! records, signals shutdown, and destroys the region once the exit gate
//! shows every consumer has detached.

use std::mem;
use std::ptr;
use std::sync::atomic::Ordering;

use tracing::{debug, warn};

use crate::constants::{CTRL_MUTEX, DATA_AVAILABLE, DATA_MUTEX, EXIT_GATE, INLINE_STR_LEN};
use crate::error::Result;
use crate::ipc::key::derive_key_pair;
use crate::ipc::layout::{write_inline_str, ControlBlock, StatSlot};
use crate::ipc::sem::SemSet;
use crate::ipc::shm::ShmSegment;
use crate::record::SortStat;

/// Producer controller over the shared region.
pub struct StatProducer {
    control_seg: ShmSegment,
    data_seg: ShmSegment,
    ctrl_sems: SemSet,
    data_sems: SemSet,
    capacity: usize,
    admitted: bool,
}

/// Partially created region, unwound in reverse creation order when a later
/// creation step fails.
#[derive(Default)]
struct Partial {
    control_seg: Option<ShmSegment>,
    ctrl_sems: Option<SemSet>,
    data_seg: Option<ShmSegment>,
    data_sems: Option<SemSet>,
}

impl Partial {
    fn unwind(mut self) {
        if let Some(sems) = self.data_sems.take() {
            if let Err(err) = sems.remove() {
                warn!(%err, "unwind: data semaphore set removal failed");
            }
        }
        if let Some(mut seg) = self.data_seg.take() {
            let _ = seg.detach();
            if let Err(err) = seg.remove() {
                warn!(%err, "unwind: data segment removal failed");
            }
        }
        if let Some(sems) = self.ctrl_sems.take() {
            if let Err(err) = sems.remove() {
                warn!(%err, "unwind: control semaphore set removal failed");
            }
        }
        if let Some(mut seg) = self.control_seg.take() {
            let _ = seg.detach();
            if let Err(err) = seg.remove() {
                warn!(%err, "unwind: control segment removal failed");
            }
        }
    }
}

impl StatProducer {
    /// Create the region for `n_files × n_algos` records.
    ///
    /// The consumer is *not* admitted yet: `CTRL_MUTEX` starts held and is
    /// released by `publish_algorithm_list`.
    pub fn open(path_token: &str, n_files: usize, n_algos: usize) -> Result<Self> {
        let keys = derive_key_pair(path_token)?;
        let capacity = n_files * n_algos;

        let mut partial = Partial::default();
        if let Err(err) = Self::open_stages(&mut partial, keys.control, keys.data, capacity) {
            partial.unwind();
            return Err(err);
        }

        let (Some(control_seg), Some(data_seg), Some(ctrl_sems), Some(data_sems)) = (
            partial.control_seg.take(),
            partial.data_seg.take(),
            partial.ctrl_sems.take(),
            partial.data_sems.take(),
        ) else {
            unreachable!("open_stages populates every field on success")
        };

        let producer = Self {
            control_seg,
            data_seg,
            ctrl_sems,
            data_sems,
            capacity,
            admitted: false,
        };

        let ctrl = producer.control();
        ctrl.number_of_files.store(n_files as i32, Ordering::Release);
        ctrl.number_of_algorithms.store(n_algos as i32, Ordering::Release);
        ctrl.to_exit.store(0, Ordering::Release);
        ctrl.locked.store(0, Ordering::Release);
        ctrl.index_stat.store(0, Ordering::Release);

        debug!(capacity, "shared statistics region created");
        Ok(producer)
    }

    fn open_stages(
        partial: &mut Partial,
        control_key: libc::key_t,
        data_key: libc::key_t,
        capacity: usize,
    ) -> Result<()> {
        partial.control_seg = Some(ShmSegment::create_exclusive(
            control_key,
            mem::size_of::<ControlBlock>(),
        )?);
        let ctrl_sems = SemSet::create_exclusive(control_key, 2)?;
        partial.ctrl_sems = Some(ctrl_sems);

        // CTRL_MUTEX is born held; EXIT_GATE is born released.
        ctrl_sems.set_value(CTRL_MUTEX, 0)?;
        ctrl_sems.set_value(EXIT_GATE, 1)?;

        // A zero-capacity run still needs a non-empty segment.
        let data_size = mem::size_of::<StatSlot>() * capacity.max(1);
        partial.data_seg = Some(ShmSegment::create_exclusive(data_key, data_size)?);
        let data_sems = SemSet::create_exclusive(data_key, 2)?;
        partial.data_sems = Some(data_sems);

        data_sems.set_value(DATA_MUTEX, 1)?;
        data_sems.set_value(DATA_AVAILABLE, 0)?;

        if let Some(seg) = partial.control_seg.as_mut() {
            seg.attach(false)?;
        }
        if let Some(seg) = partial.data_seg.as_mut() {
            seg.attach(false)?;
        }
        Ok(())
    }

    fn control(&self) -> &ControlBlock {
        // SAFETY: the control segment stays attached for the lifetime of
        // self and holds an initialized ControlBlock (the kernel zero-fills
        // fresh segments, a valid state for every field).
        unsafe { &*(self.control_seg.as_ptr() as *const ControlBlock) }
    }

    fn slot_ptr(&self) -> *mut StatSlot {
        self.data_seg.as_ptr() as *mut StatSlot
    }

    /// Record capacity of the data segment.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records published so far.
    pub fn published(&self) -> usize {
        self.control().index_stat.load(Ordering::Acquire).max(0) as usize
    }

    /// Write the human-readable algorithm list and admit a consumer by
    /// releasing `CTRL_MUTEX`. Must be called exactly once, before the first
    /// `append`.
    pub fn publish_algorithm_list(&mut self, names: &str) -> Result<()> {
        debug_assert!(!self.admitted, "algorithm list already published");

        let block = self.control_seg.as_ptr() as *mut ControlBlock;
        let mut buf = [0u8; INLINE_STR_LEN];
        write_inline_str(&mut buf, names);
        // SAFETY: no consumer can observe the field before CTRL_MUTEX is
        // released below, so this plain write does not race.
        unsafe { ptr::write(ptr::addr_of_mut!((*block).selected_algorithms), buf) };

        self.ctrl_sems.post(CTRL_MUTEX)?;
        self.admitted = true;
        Ok(())
    }

    /// Publish one record; with `finalize` also raises `to_exit` in the same
    /// critical section so the consumer sees the flag no later than the
    /// record.
    pub fn append(&mut self, stat: &SortStat, finalize: bool) -> Result<()> {
        debug_assert!(self.admitted, "append before publish_algorithm_list");

        self.data_sems.wait(DATA_MUTEX)?;
        self.ctrl_sems.wait(CTRL_MUTEX)?;

        let ctrl = self.control();
        let index = ctrl.index_stat.load(Ordering::Acquire);
        debug_assert!((index as usize) < self.capacity, "region capacity exceeded");

        // SAFETY: index < capacity, the slot array spans the data segment,
        // and DATA_MUTEX excludes the consumer from reading a half-written
        // slot.
        unsafe { self.slot_ptr().add(index as usize).write(stat.to_slot()) };

        if finalize {
            ctrl.to_exit.store(1, Ordering::Release);
        }
        ctrl.index_stat.store(index + 1, Ordering::Release);

        self.ctrl_sems.post(CTRL_MUTEX)?;
        self.data_sems.raise_if_clear(DATA_AVAILABLE)?;
        self.data_sems.post(DATA_MUTEX)?;
        Ok(())
    }

    /// Raise `to_exit` and wake the consumer once. Idempotent; called
    /// unconditionally after the drive loop whether or not the last record
    /// carried the finalize flag.
    pub fn signal_shutdown(&mut self) -> Result<()> {
        self.ctrl_sems.wait(CTRL_MUTEX)?;
        self.control().to_exit.store(1, Ordering::Release);
        self.ctrl_sems.post(CTRL_MUTEX)?;
        self.data_sems.raise_if_clear(DATA_AVAILABLE)?;
        Ok(())
    }

    /// Block until no consumer holds the exit gate, then tear the region
    /// down. Failures are logged and cleanup continues best-effort; a leaked
    /// object here needs operator attention either way.
    pub fn await_detach_then_destroy(mut self) {
        if let Err(err) = self.ctrl_sems.wait(EXIT_GATE) {
            warn!(%err, "exit gate wait failed; destroying region anyway");
        }

        if let Err(err) = self.data_seg.detach() {
            warn!(%err, "data segment detach failed");
        }
        if let Err(err) = self.control_seg.detach() {
            warn!(%err, "control segment detach failed");
        }
        if let Err(err) = self.data_seg.remove() {
            warn!(%err, "data segment removal failed");
        }
        if let Err(err) = self.control_seg.remove() {
            warn!(%err, "control segment removal failed");
        }
        if let Err(err) = self.data_sems.remove() {
            warn!(%err, "data semaphore set removal failed");
        }
        if let Err(err) = self.ctrl_sems.remove() {
            warn!(%err, "control semaphore set removal failed");
        }
        debug!("shared statistics region destroyed");
    }
}
