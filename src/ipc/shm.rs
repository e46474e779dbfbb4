//! System V shared-memory segment wrapper.
//!
//! A `ShmSegment` tracks one segment id plus, once attached, the mapping
//! address. Dropping a still-attached segment detaches it; removal of the
//! segment from the system is an explicit producer-side operation, performed
//! only after the exit gate shows no consumer remains.

use std::io;
use std::ptr;

use crate::error::{Result, SortbenchError};

const IPC_MODE: libc::c_int = 0o600;

/// Handle to a System V shared-memory segment, attached or not.
#[derive(Debug)]
pub struct ShmSegment {
    id: libc::c_int,
    addr: Option<ptr::NonNull<u8>>,
    size: usize,
}

impl ShmSegment {
    /// Create a segment of `size` bytes under `key`, failing with
    /// `AlreadyRunning` if one already exists for that key.
    pub fn create_exclusive(key: libc::key_t, size: usize) -> Result<Self> {
        // SAFETY: plain syscall.
        let id = unsafe {
            libc::shmget(key, size, IPC_MODE | libc::IPC_CREAT | libc::IPC_EXCL)
        };
        if id == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                return Err(SortbenchError::AlreadyRunning);
            }
            return Err(SortbenchError::ShmCreateFailed(err));
        }
        Ok(Self { id, addr: None, size })
    }

    /// Look up an existing segment under `key` without creating anything.
    pub fn open_existing(key: libc::key_t) -> Result<Self> {
        // SAFETY: plain syscall; size 0 means "whatever exists".
        let id = unsafe { libc::shmget(key, 0, 0) };
        if id == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOENT) {
                return Err(SortbenchError::ProducerNotRunning);
            }
            return Err(SortbenchError::ShmAttachFailed(err));
        }
        Ok(Self { id, addr: None, size: 0 })
    }

    /// Attach the segment into this process.
    pub fn attach(&mut self, read_only: bool) -> Result<()> {
        debug_assert!(self.addr.is_none(), "segment already attached");
        let flags = if read_only { libc::SHM_RDONLY } else { 0 };
        // SAFETY: the kernel picks the address; -1 cast is the documented
        // failure sentinel.
        let addr = unsafe { libc::shmat(self.id, ptr::null(), flags) };
        if addr as isize == -1 {
            return Err(SortbenchError::last_os(SortbenchError::ShmAttachFailed));
        }
        self.addr = ptr::NonNull::new(addr as *mut u8);
        Ok(())
    }

    /// Detach the segment from this process.
    pub fn detach(&mut self) -> Result<()> {
        if let Some(addr) = self.addr.take() {
            // SAFETY: addr came from a successful shmat and has not been
            // detached since.
            let rc = unsafe { libc::shmdt(addr.as_ptr() as *const libc::c_void) };
            if rc == -1 {
                return Err(SortbenchError::last_os(SortbenchError::ShmDetachFailed));
            }
        }
        Ok(())
    }

    /// Mark the segment for removal. Producer-only.
    pub fn remove(&self) -> Result<()> {
        // SAFETY: IPC_RMID ignores the buffer argument.
        let rc = unsafe { libc::shmctl(self.id, libc::IPC_RMID, ptr::null_mut()) };
        if rc == -1 {
            return Err(SortbenchError::last_os(SortbenchError::ShmDestroyFailed));
        }
        Ok(())
    }

    /// Number of processes currently attached, via `IPC_STAT`.
    pub fn attach_count(&self) -> Result<u64> {
        let mut info: libc::shmid_ds = unsafe { std::mem::zeroed() };
        // SAFETY: info is a valid, writable shmid_ds.
        let rc = unsafe { libc::shmctl(self.id, libc::IPC_STAT, &mut info) };
        if rc == -1 {
            return Err(SortbenchError::last_os(SortbenchError::ShmAttachFailed));
        }
        Ok(info.shm_nattch as u64)
    }

    /// Base address of the attached mapping.
    ///
    /// # Panics
    /// Panics if the segment is not attached; all call sites attach during
    /// construction and never hand the pointer out before that.
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr.expect("shared segment not attached").as_ptr()
    }

    /// Declared size at creation (zero for opened segments).
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for ShmSegment {
    fn drop(&mut self) {
        if self.addr.is_some() {
            if let Err(err) = self.detach() {
                tracing::warn!(%err, "leaking shared memory attachment on drop");
            }
        }
    }
}

// SAFETY: the raw mapping address may be used from the thread that drives
// the controller; all cross-process access is serialized by the region's
// semaphores, and the handle itself holds no thread-affine state.
unsafe impl Send for ShmSegment {}
