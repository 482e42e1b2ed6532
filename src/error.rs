//! Crate-wide error taxonomy.
//!
//! Each subsystem owns a narrow `thiserror` enum; [`CeremonyError`] is the
//! top-level sum type returned by every public engine entry point, following
//! the layered-enum idiom used throughout this crate (`#[from]` conversions
//! rather than `anyhow`-style erasure, so callers can match on failure kind).

use thiserror::Error;

/// Errors raised by [`crate::codec`] while encoding/decoding points and
/// integers, or while seeking to a named section.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The reader ran out of bytes before a complete value was read.
    #[error("truncated read: expected {expected} bytes, got {got}")]
    Truncated {
        /// Bytes required to decode the pending value.
        expected: usize,
        /// Bytes actually available.
        got: usize,
    },
    /// A decoded point's coordinates do not satisfy the curve equation.
    #[error("point not on curve")]
    PointNotOnCurve,
    /// A decoded point satisfies the curve equation but is outside the
    /// prime-order subgroup.
    #[error("point not in subgroup")]
    PointNotInSubgroup,
    /// Underlying I/O failure (open/read/write/seek).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while validating a contribution chain or a single
/// `same_ratio` / powers-consistency check.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// A pairing-based consistency check failed.
    #[error("pairing check failed: {0}")]
    PairingCheckFailed(&'static str),
    /// A contribution's recomputed hash did not match the stored hash.
    #[error("contribution hash mismatch at index {0}")]
    HashMismatch(usize),
    /// `[delta]_1` and `[delta]_2` are not consistent under the fixed
    /// generators.
    #[error("delta G1/G2 inconsistency")]
    DeltaInconsistent,
    /// The public prefix of `L` changed between origin and candidate files.
    #[error("public L prefix changed between origin and candidate")]
    PublicLChanged,
    /// The final contribution's delta does not match the parameter block.
    #[error("last contribution delta isn't the same as in parameters")]
    LastDeltaMismatch,
    /// `BetaG2` does not match the final contribution's recorded beta.
    #[error("BetaG2 does not match final contribution")]
    BetaG2Mismatch,
}

/// Errors raised by [`crate::phase1`].
#[derive(Error, Debug)]
pub enum Phase1Error {
    /// Propagated codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Propagated verification failure.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// `power` exceeds the maximum supported domain size (2^26).
    #[error("power {0} exceeds maximum of 26")]
    PowerTooLarge(u8),
    /// `power` is below the minimum supported domain size (2^1).
    #[error("power {0} is below minimum of 1")]
    PowerTooSmall(u8),
    /// Header fields are internally inconsistent (e.g. wrong section length).
    #[error("malformed phase1 header: {0}")]
    BadHeader(&'static str),
}

/// Errors raised by [`crate::phase2`].
#[derive(Error, Debug)]
pub enum Phase2Error {
    /// Propagated codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Propagated verification failure.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// Propagated Phase 1 failure (reading the source SRS).
    #[error(transparent)]
    Phase1(#[from] Phase1Error),
    /// The Phase 1 file's power is too small for the R1CS's constraint count.
    #[error("phase 1 capacity 2^{power} = {capacity} is smaller than constraints {constraints}")]
    Capacity {
        /// Phase 1 `power` field.
        power: u8,
        /// `2^power`.
        capacity: u64,
        /// Number of R1CS constraints requested.
        constraints: u64,
    },
    /// Two files expected to share a header (modulo `contributions`) differ.
    #[error("header mismatch between input and origin: {0}")]
    HeaderMismatch(&'static str),
}

/// Top-level error type returned by every public engine entry point.
#[derive(Error, Debug)]
pub enum CeremonyError {
    /// Malformed or missing CLI argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Underlying I/O failure not otherwise wrapped by a subsystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Propagated codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Propagated verification failure.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// Propagated Phase 1 engine failure.
    #[error(transparent)]
    Phase1(#[from] Phase1Error),
    /// Propagated Phase 2 engine failure.
    #[error(transparent)]
    Phase2(#[from] Phase2Error),
    /// An invariant the implementation assumes was violated; not a user error.
    #[error("internal error: {0}")]
    Internal(&'static str),
}
