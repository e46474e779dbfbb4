//! Wire-level layout of the shared region.
//!
//! Both processes map these structs directly over the System V segments, so
//! the layout is part of the protocol: `#[repr(C)]`, host endianness, same
//! host for producer and consumer. Scalar control fields are `AtomicI32`
//! (layout-identical to `int32`) because they are read and written from two
//! processes; the record slots are plain POD, immutable once published.
//!
//! ```text
//! control segment                    data segment
//! ┌──────────────────────┐           ┌──────────┬──────────┬─────┐
//! │ ControlBlock         │           │ StatSlot │ StatSlot │ ... │
//! │  counts, algorithms, │           │  [0]     │  [1]     │     │
//! │  to_exit, locked,    │           └──────────┴──────────┴─────┘
//! │  index_stat          │           capacity = files × algorithms
//! └──────────────────────┘
//! ```
//!
//! Inline strings are `MAXCHARS + 1` bytes: content truncated to `MAXCHARS`,
//! zero-filled tail, and a terminator pinned at index `MAXCHARS` so the
//! terminator write can never land outside the buffer.

use std::sync::atomic::AtomicI32;

use static_assertions::const_assert_eq;

use crate::constants::{INLINE_STR_LEN, MAXCHARS};

/// Fixed header of the region, one instance in the control segment.
#[repr(C)]
pub struct ControlBlock {
    /// Count of regular files the producer plans to process.
    pub number_of_files: AtomicI32,
    /// Count of distinct sort algorithms selected.
    pub number_of_algorithms: AtomicI32,
    /// Comma-joined human-readable algorithm names.
    pub selected_algorithms: [u8; INLINE_STR_LEN],
    /// Set once by the producer when no further records will be written.
    pub to_exit: AtomicI32,
    /// Set by the consumer holding the single consumer slot.
    pub locked: AtomicI32,
    /// Records written so far; producer is the only writer.
    pub index_stat: AtomicI32,
}

/// One published `(file × algorithm)` measurement.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StatSlot {
    pub filename: [u8; INLINE_STR_LEN],
    pub nlines: i32,
    pub algorithm: [u8; INLINE_STR_LEN],
    pub niterations: i32,
    pub nswaps: i32,
    pub time_ms: f32,
}

// The consumer may be built separately from the producer; pin the sizes so a
// drifting field can't silently shear the protocol.
const_assert_eq!(std::mem::size_of::<ControlBlock>(), 1048);
const_assert_eq!(std::mem::size_of::<StatSlot>(), 2072);
const_assert_eq!(std::mem::align_of::<ControlBlock>(), 4);
const_assert_eq!(std::mem::align_of::<StatSlot>(), 4);

impl StatSlot {
    /// An all-zero slot (empty strings, zero counters).
    pub fn zeroed() -> Self {
        Self {
            filename: [0; INLINE_STR_LEN],
            nlines: 0,
            algorithm: [0; INLINE_STR_LEN],
            niterations: 0,
            nswaps: 0,
            time_ms: 0.0,
        }
    }
}

/// Copy `src` into an inline buffer: zero-fill, truncate to `MAXCHARS`
/// bytes, terminator at index `MAXCHARS`.
pub fn write_inline_str(dst: &mut [u8; INLINE_STR_LEN], src: &str) {
    dst.fill(0);
    let bytes = src.as_bytes();
    let len = bytes.len().min(MAXCHARS);
    dst[..len].copy_from_slice(&bytes[..len]);
    dst[MAXCHARS] = 0;
}

/// Read an inline buffer back out, up to the first NUL.
pub fn read_inline_str(src: &[u8; INLINE_STR_LEN]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(MAXCHARS);
    String::from_utf8_lossy(&src[..end]).into_owned()
}
