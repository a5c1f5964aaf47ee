//! Error types for radix sort calls and converter registration.
//!
//! Every failure is a broken call contract; nothing here is retryable.

use std::time::Duration;

use thiserror::Error;

use crate::NumberSystem;

/// Result type alias for radix engine operations
pub type Result<T> = std::result::Result<T, SortError>;

/// Error type for radix engine operations
#[derive(Error, Debug)]
pub enum SortError {
    /// Digit width outside the supported range
    #[error("Invalid radix width {bits} (must be between {min} and {max})")]
    RadixBitsOutOfRange {
        /// The requested digit width
        bits: u32,
        /// Smallest supported width
        min: u32,
        /// Largest supported width
        max: u32,
    },

    /// Auxiliary buffer smaller than the sizing functions require
    #[error("Workspace of {provided} elements is insufficient ({required} needed); use workspace_size to determine the minimum")]
    WorkspaceTooSmall {
        /// Elements supplied by the caller
        provided: usize,
        /// Elements the call needs
        required: usize,
    },

    /// Key type is not 8, 16, 32 or 64 bits wide, or differs from its radix type
    #[error("Sort type '{type_name}' is {bytes} bytes, which is not supported")]
    UnsupportedKeyWidth {
        /// The offending type
        type_name: &'static str,
        /// Its size in bytes
        bytes: usize,
    },

    /// Bucket tables hold `u32` counts
    #[error("Cannot sort {len} keys in one call (at most {max})")]
    TooManyKeys {
        /// Number of keys supplied
        len: usize,
        /// Largest supported count
        max: usize,
    },

    /// A buffer could not be reinterpreted as radix keys
    #[error("Cannot reinterpret '{value_type}' as '{radix_type}': {reason}")]
    IncompatibleLayout {
        /// Domain type
        value_type: &'static str,
        /// Radix key type
        radix_type: &'static str,
        /// Description from the cast
        reason: String,
    },

    /// Type was never classified
    #[error("No number-system is defined for '{type_name}'")]
    UnknownNumberSystem {
        /// The unclassified type
        type_name: &'static str,
    },

    /// Type already classified differently
    #[error("The number-system for '{type_name}' is {existing:?} and cannot be changed to {requested:?}")]
    NumberSystemConflict {
        /// The classified type
        type_name: &'static str,
        /// Current classification
        existing: NumberSystem,
        /// Rejected classification
        requested: NumberSystem,
    },

    /// Domain and radix types have different sizes
    #[error("The size of '{value_type}' ({value_size} bytes) and '{radix_type}' ({radix_size} bytes) must match")]
    SizeMismatch {
        /// Domain type
        value_type: &'static str,
        /// Size of the domain type
        value_size: usize,
        /// Radix key type
        radix_type: &'static str,
        /// Size of the radix key type
        radix_size: usize,
    },

    /// Attempt to replace a built-in converter with a user converter
    #[error("The existing converter for '{value_type}' -> '{radix_type}' is inbuilt and cannot be replaced")]
    BuiltinConverter {
        /// Domain type
        value_type: &'static str,
        /// Radix key type
        radix_type: &'static str,
    },

    /// Nothing registered for the pair
    #[error("No radix converter is registered to map between '{value_type}' and '{radix_type}'")]
    MissingConverter {
        /// Domain type
        value_type: &'static str,
        /// Radix key type
        radix_type: &'static str,
    },

    /// `Registry::install` called after the global registry was set up
    #[error("The global converter registry has already been initialized")]
    RegistryInitialized,

    /// Phase barrier was not reached in time
    #[error("Timeout after {timeout:?} waiting for {outstanding} parallel workers to complete")]
    WorkerTimeout {
        /// The configured bound
        timeout: Duration,
        /// Workers that had not reported
        outstanding: usize,
    },

    /// The operating system refused to start a worker thread
    #[error("Failed to start parallel worker {worker}: {source}")]
    WorkerSpawn {
        /// Worker index
        worker: usize,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A worker panicked or its channel closed
    #[error("Parallel worker {worker} failed during the {phase} phase")]
    WorkerFailed {
        /// Worker index
        worker: usize,
        /// Phase name
        phase: &'static str,
    },
}
