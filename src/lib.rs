//! Groth16 trusted-setup ceremony engine over BN254.
//!
//! This crate implements the two-phase multi-party-computation ceremony that
//! produces a Groth16 structured reference string: a circuit-independent
//! "Powers of Tau" phase ([`phase1`]) followed by a circuit-specific phase
//! ([`phase2`]), each exposing Initialize/Contribute/Verify, and a final
//! [`key_extractor`] step that assembles proving/verifying keys from the
//! finalized Phase 2 output.
//!
//! ## Invariants
//!
//! - **Field & curve.** The scalar field is `ark_bn254::Fr`; G1/G2 points are
//!   `ark_bn254::{G1Affine, G2Affine}`. All arithmetic is constant-time as
//!   provided by Arkworks; this crate forbids unsafe code throughout.
//! - **Encoding.** Phase 1 files use compressed point encoding; Phase 2,
//!   `evals`, and key files use raw (uncompressed) encoding. See [`codec`].
//! - **Pairing checks.** Every consistency check is one fused
//!   `multi_pairing` call, never two separate pairings compared after the
//!   fact (see [`pairing::same_ratio`]).
//! - **Determinism.** Every participant's secret scalars come from
//!   `rand::rngs::OsRng`; a fixed-seed generator is available only behind
//!   the `dev-srs` feature, and its output must never be used in production.
//!
//! These invariants are enforced by design across the submodules. A
//! violation is surfaced as a typed error in [`error`], never undefined
//! behavior.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Crate-wide error taxonomy (`CodecError`, `VerifyError`, `Phase1Error`,
/// `Phase2Error`, `CeremonyError`).
pub mod error;
/// Deterministic binary serialization and file-layout bookkeeping.
pub mod codec;
/// Fused pairing checks and randomized powers-consistency checks.
pub mod pairing;
/// Knowledge-of-exponent public keys and the SHA-256 contribution hash chain.
pub mod transcript;
/// Streaming batched scalar multiplication over large point sections.
pub mod batch_scale;
/// In-place radix-2 DIF inverse FFT, monomial-to-Lagrange basis conversion.
pub mod lagrange;
/// Read-only R1CS description consumed by Phase 2.
pub mod r1cs;
/// Phase 1 (Powers of Tau) engine: Initialize, Contribute, Verify.
pub mod phase1;
/// Phase 2 (circuit-specific) engine: Initialize, Contribute, Verify.
pub mod phase2;
/// Assemble Groth16 proving/verifying keys from a finalized Phase 2 state.
pub mod key_extractor;
/// Known-ceremony digest registry (advisory sanity check on Phase 1 files).
pub mod ceremony_digest;

pub use error::CeremonyError;
