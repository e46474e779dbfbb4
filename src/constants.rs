//! Shared constants for the sortbench harness.
//!
//! Both the producer (`sorter`) and the consumer (`showstats`) are compiled
//! against these values; the shared-memory layout in `ipc::layout` depends on
//! them, so changing any of them is a wire-format break.

/// Maximum number of characters carried by an inline string field in the
/// shared region (filenames, algorithm names, the selected-algorithms list).
pub const MAXCHARS: usize = 1024;

/// Inline string buffers reserve one extra byte so the terminator at index
/// `MAXCHARS` stays inside the buffer.
pub const INLINE_STR_LEN: usize = MAXCHARS + 1;

/// Number of hex characters in an md5 digest.
pub const MD5SUM_CHARS: usize = 32;

/// Lowest port number accepted for any network endpoint.
pub const PORT_RANGE_MIN: u32 = 1;

/// Highest port number accepted for any network endpoint.
pub const PORT_RANGE_MAX: u32 = 65535;

/// Nickname sent in every UDP result report.
pub const NICKNAME: &str = "antiThreads";

/// Extension appended to CSV export filenames that lack it.
pub const CSV_EXTENSION: &str = ".csv";

/// Listen backlog for the embedded statistics web server.
pub const HTTP_MAX_CONNECTIONS: i32 = 10;

/// Key discriminator for the control segment and control semaphore set.
pub const CONTROL_KEY_ID: u8 = b'c';

/// Key discriminator for the data segment and data semaphore set.
pub const DATA_KEY_ID: u8 = b'd';

// Control semaphore set slots.

/// Mutex over the control-segment fields (slot 0). Created held; the
/// producer releases it once the algorithm list is published.
pub const CTRL_MUTEX: u16 = 0;

/// Exit gate (slot 1). Consumers hold it while attached; the producer blocks
/// on it before destroying the region.
pub const EXIT_GATE: u16 = 1;

// Data semaphore set slots.

/// Mutex over the record-write critical section (slot 0).
pub const DATA_MUTEX: u16 = 0;

/// Level-triggered "new record published" signal (slot 1), bounded to {0,1}.
pub const DATA_AVAILABLE: u16 = 1;

/// Timestamp format used by the log headers and the interrupt notice.
pub const HEADER_DATE_FORMAT: &str = "@%Y-%m-%d %Hh%M";
