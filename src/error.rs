//! Error types and exit-code mapping for sortbench.

use thiserror::Error;

/// Result type alias for sortbench operations
pub type Result<T> = std::result::Result<T, SortbenchError>;

/// Main error type shared by the producer, the consumer and the tools
#[derive(Error, Debug)]
pub enum SortbenchError {
    /// Another producer already owns the region under this path token
    #[error("another sorter is already running (shared region exists)")]
    AlreadyRunning,

    /// No producer has created the region under this path token
    #[error("no sorter is running (shared region not found)")]
    ProducerNotRunning,

    /// The single consumer slot is already claimed
    #[error("another consumer is already attached to the shared region")]
    AnotherConsumerPresent,

    /// `ftok` could not derive an IPC key from the path token
    #[error("IPC key derivation failed for '{path}': {source}")]
    IpcKeyDerivationFailed {
        /// Path token the key was derived from
        path: String,
        source: std::io::Error,
    },

    /// Shared-memory segment creation failed
    #[error("shared memory creation failed: {0}")]
    ShmCreateFailed(#[source] std::io::Error),

    /// Shared-memory attach failed
    #[error("shared memory attach failed: {0}")]
    ShmAttachFailed(#[source] std::io::Error),

    /// Shared-memory detach failed
    #[error("shared memory detach failed: {0}")]
    ShmDetachFailed(#[source] std::io::Error),

    /// Shared-memory segment removal failed
    #[error("shared memory removal failed: {0}")]
    ShmDestroyFailed(#[source] std::io::Error),

    /// Semaphore set creation failed
    #[error("semaphore set creation failed: {0}")]
    SemCreateFailed(#[source] std::io::Error),

    /// A semaphore operation (wait/post/get/set) failed
    #[error("semaphore operation failed: {0}")]
    SemOpFailed(#[source] std::io::Error),

    /// Semaphore set removal failed
    #[error("semaphore set removal failed: {0}")]
    SemDestroyFailed(#[source] std::io::Error),

    /// A port argument fell outside `[1, 65535]`
    #[error("port {port} is out of the allowed range [1, 65535]")]
    PortOutOfRange {
        /// The rejected value
        port: u32,
    },

    /// An address argument did not parse as an IPv4 address
    #[error("'{addr}' is not a valid IP address")]
    InvalidIpAddress {
        /// The rejected value
        addr: String,
    },

    /// Reading an input file or directory failed
    #[error("failed to read sort input '{path}': {source}")]
    SortInputRead {
        /// Input path that could not be read
        path: String,
        source: std::io::Error,
    },

    /// Writing a sorted output file failed
    #[error("failed to write sort output '{path}': {source}")]
    SortOutputWrite {
        /// Output path that could not be written
        path: String,
        source: std::io::Error,
    },

    /// I/O outside the typed cases above (sockets, log files, CSV export)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SortbenchError {
    /// Capture the current errno as the payload of the given constructor.
    pub fn last_os(make: fn(std::io::Error) -> Self) -> Self {
        make(std::io::Error::last_os_error())
    }

    /// Create a key-derivation error from the current errno.
    pub fn key_derivation(path: impl Into<String>) -> Self {
        Self::IpcKeyDerivationFailed {
            path: path.into(),
            source: std::io::Error::last_os_error(),
        }
    }

    /// Create a port-range error.
    pub fn port_out_of_range(port: u32) -> Self {
        Self::PortOutOfRange { port }
    }

    /// Create an invalid-address error.
    pub fn invalid_ip(addr: impl Into<String>) -> Self {
        Self::InvalidIpAddress { addr: addr.into() }
    }

    /// Create an input-read error.
    pub fn input_read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::SortInputRead { path: path.into(), source }
    }

    /// Create an output-write error.
    pub fn output_write(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::SortOutputWrite { path: path.into(), source }
    }

    /// Process exit status for this error kind.
    ///
    /// Every kind maps to a distinct non-zero code so scripts can tell the
    /// lockout cases apart from plain I/O failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyRunning => 10,
            Self::ProducerNotRunning => 11,
            Self::AnotherConsumerPresent => 12,
            Self::IpcKeyDerivationFailed { .. } => 13,
            Self::ShmCreateFailed(_) => 14,
            Self::ShmAttachFailed(_) => 15,
            Self::ShmDetachFailed(_) => 16,
            Self::ShmDestroyFailed(_) => 17,
            Self::SemCreateFailed(_) => 18,
            Self::SemOpFailed(_) => 19,
            Self::SemDestroyFailed(_) => 20,
            Self::PortOutOfRange { .. } => 21,
            Self::InvalidIpAddress { .. } => 22,
            Self::SortInputRead { .. } => 23,
            Self::SortOutputWrite { .. } => 24,
            Self::Io(_) => 25,
        }
    }

    /// True for the two expected rendezvous rejections that a wrapper script
    /// may want to retry after the peer goes away.
    pub fn is_lockout(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::AnotherConsumerPresent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let errs = [
            SortbenchError::AlreadyRunning,
            SortbenchError::ProducerNotRunning,
            SortbenchError::AnotherConsumerPresent,
            SortbenchError::key_derivation("/nope"),
            SortbenchError::ShmCreateFailed(std::io::Error::other("x")),
            SortbenchError::ShmAttachFailed(std::io::Error::other("x")),
            SortbenchError::ShmDetachFailed(std::io::Error::other("x")),
            SortbenchError::ShmDestroyFailed(std::io::Error::other("x")),
            SortbenchError::SemCreateFailed(std::io::Error::other("x")),
            SortbenchError::SemOpFailed(std::io::Error::other("x")),
            SortbenchError::SemDestroyFailed(std::io::Error::other("x")),
            SortbenchError::port_out_of_range(0),
            SortbenchError::invalid_ip("nope"),
            SortbenchError::input_read("in", std::io::Error::other("x")),
            SortbenchError::output_write("out", std::io::Error::other("x")),
            SortbenchError::Io(std::io::Error::other("x")),
        ];
        let mut codes: Vec<i32> = errs.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
        assert!(codes.iter().all(|&c| c != 0));
    }

    #[test]
    fn lockout_classification() {
        assert!(SortbenchError::AlreadyRunning.is_lockout());
        assert!(SortbenchError::AnotherConsumerPresent.is_lockout());
        assert!(!SortbenchError::ProducerNotRunning.is_lockout());
    }
}
