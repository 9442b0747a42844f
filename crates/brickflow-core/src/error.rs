//! Error types shared across the brickflow workspace.

use thiserror::Error;

/// Workspace-wide error type.
///
/// Contract violations are fatal and non-retryable; `Transient` is the
/// only variant the retry helper in `brickflow-io` treats as
/// retry-eligible.
#[derive(Error, Debug)]
pub enum Error {
    /// An accessor (or any other producer) returned a buffer whose shape
    /// did not match the box it was asked to fill.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [i64; 3],
        actual: [i64; 3],
    },

    /// A box operation was attempted on a box with no (or negative)
    /// intersection where one was required.
    #[error("empty intersection: {0}")]
    EmptyIntersection(String),

    /// A grid or box precondition was violated (e.g. halo on a pad grid,
    /// a pad grid that doesn't evenly divide a brick's logical box).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Access to a brick that has already been explicitly destroyed.
    #[error("attempted to access a destroyed brick: {0}")]
    DestroyedBrick(String),

    /// A lazy thunk or compressed blob failed to materialise into a
    /// buffer of the expected shape.
    #[error("materialisation failed: {0}")]
    Materialisation(String),

    /// Compression/decompression round-trip failure.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// Transient I/O failure, eligible for the retry policy in
    /// `brickflow-io::retry`. Not a contract violation.
    #[error("transient I/O error: {0}")]
    Transient(String),

    /// Retries (both inner and outer loops) were exhausted; this is a
    /// fatal, non-retryable escalation of a `Transient` error.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: String },
}

impl Error {
    /// True if this error is (or wraps) a transient, retry-eligible
    /// condition.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

/// Result type alias used throughout the brickflow workspace.
pub type Result<T> = std::result::Result<T, Error>;
