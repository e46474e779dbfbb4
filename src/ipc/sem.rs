//! System V semaphore set wrapper.
//!
//! Each shared region uses two sets of two counting semaphores (see
//! `constants` for the slot assignments). This wrapper owns nothing kernel
//! side by default: removal is an explicit operation performed by the
//! producer once the exit gate clears. A `SemSet` value is therefore `Copy`
//! cheap to hand around — it is just the set id.

use std::io;

use crate::error::{Result, SortbenchError};

/// Access mode for freshly created IPC objects (owner read/write).
const IPC_MODE: libc::c_int = 0o600;

/// Argument union for `semctl`, mirroring `union semun`.
#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
union Semun {
    val: libc::c_int,
    buf: *mut libc::semid_ds,
    array: *mut libc::c_ushort,
}

/// Handle to a System V semaphore set.
#[derive(Debug, Clone, Copy)]
pub struct SemSet {
    id: libc::c_int,
}

impl SemSet {
    /// Create a set of `count` semaphores under `key`, failing if a set for
    /// that key already exists.
    ///
    /// The exclusive create is the lockout against a second producer:
    /// `EEXIST` maps to `AlreadyRunning`.
    pub fn create_exclusive(key: libc::key_t, count: libc::c_int) -> Result<Self> {
        // SAFETY: plain syscall, no pointers involved.
        let id = unsafe {
            libc::semget(key, count, IPC_MODE | libc::IPC_CREAT | libc::IPC_EXCL)
        };
        if id == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                return Err(SortbenchError::AlreadyRunning);
            }
            return Err(SortbenchError::SemCreateFailed(err));
        }
        Ok(Self { id })
    }

    /// Look up an existing set under `key`.
    ///
    /// `ENOENT` means the producer has not created the region (or already
    /// destroyed it) and maps to `ProducerNotRunning`.
    pub fn open_existing(key: libc::key_t) -> Result<Self> {
        // SAFETY: plain syscall.
        let id = unsafe { libc::semget(key, 0, 0) };
        if id == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOENT) {
                return Err(SortbenchError::ProducerNotRunning);
            }
            return Err(SortbenchError::SemOpFailed(err));
        }
        Ok(Self { id })
    }

    /// Set the value of one slot (only used right after creation).
    pub fn set_value(&self, slot: u16, value: libc::c_int) -> Result<()> {
        let arg = Semun { val: value };
        // SAFETY: SETVAL reads the `val` member of the union argument.
        let rc = unsafe {
            libc::semctl(self.id, slot as libc::c_int, libc::SETVAL, arg)
        };
        if rc == -1 {
            return Err(SortbenchError::last_os(SortbenchError::SemOpFailed));
        }
        Ok(())
    }

    /// Read the current value of one slot.
    pub fn value(&self, slot: u16) -> Result<libc::c_int> {
        // SAFETY: GETVAL takes no argument beyond the slot index.
        let rc = unsafe { libc::semctl(self.id, slot as libc::c_int, libc::GETVAL) };
        if rc == -1 {
            return Err(SortbenchError::last_os(SortbenchError::SemOpFailed));
        }
        Ok(rc)
    }

    /// Blocking decrement of one slot. Restarts on `EINTR`, so a signal
    /// delivered to this process does not break the protocol mid-wait.
    pub fn wait(&self, slot: u16) -> Result<()> {
        self.op(slot, -1)
    }

    /// Increment of one slot.
    pub fn post(&self, slot: u16) -> Result<()> {
        self.op(slot, 1)
    }

    /// Raise a slot to 1 only if it currently reads 0.
    ///
    /// This keeps the level-triggered `DATA_AVAILABLE` signal bounded: both
    /// the producer's publication wake and the consumer's self-pump go
    /// through here, so the slot never counts past one outstanding wake.
    pub fn raise_if_clear(&self, slot: u16) -> Result<()> {
        if self.value(slot)? == 0 {
            self.post(slot)?;
        }
        Ok(())
    }

    fn op(&self, slot: u16, delta: libc::c_short) -> Result<()> {
        let mut buf = libc::sembuf {
            sem_num: slot,
            sem_op: delta,
            sem_flg: 0,
        };
        loop {
            // SAFETY: buf is a valid sembuf for the duration of the call.
            let rc = unsafe { libc::semop(self.id, &mut buf, 1) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(SortbenchError::SemOpFailed(err));
        }
    }

    /// Remove the set from the system. Producer-only.
    pub fn remove(&self) -> Result<()> {
        // SAFETY: IPC_RMID takes no argument.
        let rc = unsafe { libc::semctl(self.id, 0, libc::IPC_RMID) };
        if rc == -1 {
            return Err(SortbenchError::last_os(SortbenchError::SemDestroyFailed));
        }
        Ok(())
    }
}
