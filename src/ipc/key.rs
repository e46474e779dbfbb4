//! IPC key derivation.
//!
//! Producer and consumer rendezvous through a pair of System V IPC keys
//! derived from a common filesystem path (the *path token*, conventionally
//! the producer's executable path) and two single-character discriminators:
//! `'c'` for the control objects and `'d'` for the data objects. Any two
//! processes that agree on the path token derive the same pair.

use std::ffi::CString;

use crate::constants::{CONTROL_KEY_ID, DATA_KEY_ID};
use crate::error::{Result, SortbenchError};

/// The derived key pair for one shared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    /// Key for the control segment and control semaphore set.
    pub control: libc::key_t,
    /// Key for the data segment and data semaphore set.
    pub data: libc::key_t,
}

/// Derive the control/data key pair from a path token.
///
/// The token must name an existing filesystem entry; `ftok` folds its device
/// and inode numbers with the discriminator byte.
pub fn derive_key_pair(path_token: &str) -> Result<KeyPair> {
    Ok(KeyPair {
        control: ftok(path_token, CONTROL_KEY_ID)?,
        data: ftok(path_token, DATA_KEY_ID)?,
    })
}

fn ftok(path_token: &str, id: u8) -> Result<libc::key_t> {
    let c_path = CString::new(path_token)
        .map_err(|_| SortbenchError::key_derivation(path_token))?;

    // SAFETY: c_path is a valid NUL-terminated string for the duration of
    // the call; ftok only reads it.
    let key = unsafe { libc::ftok(c_path.as_ptr(), id as libc::c_int) };
    if key == -1 {
        return Err(SortbenchError::key_derivation(path_token));
    }
    Ok(key)
}
