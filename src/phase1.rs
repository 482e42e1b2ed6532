//! Phase 1 (Powers of Tau) engine: Initialize, Contribute, Verify.

use crate::batch_scale::{batch_scale_g1, batch_scale_g2, FirstPointRule};
use crate::codec::{Decoder, Encoder, Encoding, Phase1Layout, Trust};
use crate::error::{Phase1Error, VerifyError};
use crate::pairing::{powers_consistency_g1, powers_consistency_g2, same_ratio};
use crate::transcript::{self, PublicKey, DST_ALPHA, DST_BETA, DST_TAU_DELTA};
use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::UniformRand;
use ark_serialize::CanonicalSerialize;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::io::{Read, Seek, Write};

/// Maximum supported power (`N = 2^power`, `power <= 26`).
pub const MAX_POWER: u8 = 26;

/// Minimum supported power: below this, `TauG1` (length `2^power+1 - 1`)
/// has fewer than 2 points and the powers-consistency check degenerates.
pub const MIN_POWER: u8 = 1;

/// Phase 1 file header: `power: u8`, `contributions: u16` (big-endian).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// `log2(N)`.
    pub power: u8,
    /// Number of contributions appended so far.
    pub contributions: u16,
}

impl Header {
    fn read<R: Read>(dec: &mut Decoder<R>) -> Result<Self, Phase1Error> {
        let power = dec.decode_u8()?;
        let contributions = dec.decode_u16()?;
        Ok(Header { power, contributions })
    }

    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase1Error> {
        enc.encode_u8(self.power)?;
        enc.encode_u16(self.contributions)?;
        Ok(())
    }
}

/// One Phase 1 contribution record (§3).
#[derive(Clone, Copy, Debug)]
pub struct Contribution {
    /// `[tau]_1` at the time of this contribution.
    pub g1_tau: G1Affine,
    /// `[alpha]_1`.
    pub g1_alpha: G1Affine,
    /// `[beta]_1`.
    pub g1_beta: G1Affine,
    /// `[tau]_2`.
    pub g2_tau: G2Affine,
    /// `[beta]_2`.
    pub g2_beta: G2Affine,
    /// Knowledge-of-exponent proof for tau.
    pub pk_tau: PublicKey,
    /// Knowledge-of-exponent proof for alpha.
    pub pk_alpha: PublicKey,
    /// Knowledge-of-exponent proof for beta.
    pub pk_beta: PublicKey,
    /// SHA-256 over the fields above, excluding this hash.
    pub hash: [u8; 32],
}

impl Contribution {
    /// The all-generators, no-proof bootstrap record with `hash = []`
    /// (the virtual default that contribution 0's `prev` resolves to).
    fn default_contribution() -> Self {
        let one = Fr::from(1u64);
        Contribution {
            g1_tau: G1Affine::generator(),
            g1_alpha: G1Affine::generator(),
            g1_beta: G1Affine::generator(),
            g2_tau: G2Affine::generator(),
            g2_beta: G2Affine::generator(),
            pk_tau: transcript::generate_public_key(one, &[], DST_TAU_DELTA),
            pk_alpha: transcript::generate_public_key(one, &[], DST_ALPHA),
            pk_beta: transcript::generate_public_key(one, &[], DST_BETA),
            hash: [0u8; 32],
        }
    }

    fn is_bootstrap(&self) -> bool {
        self.hash == [0u8; 32]
    }

    fn prev_hash_bytes(&self) -> Vec<u8> {
        if self.is_bootstrap() {
            Vec::new()
        } else {
            self.hash.to_vec()
        }
    }

    fn serialize_for_hash(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for p in [&self.g1_tau, &self.g1_alpha, &self.g1_beta] {
            p.serialize_compressed(&mut buf).expect("serialize g1");
        }
        for p in [&self.g2_tau, &self.g2_beta] {
            p.serialize_compressed(&mut buf).expect("serialize g2");
        }
        for pk in [&self.pk_tau, &self.pk_alpha, &self.pk_beta] {
            pk.s.serialize_compressed(&mut buf).expect("serialize s");
            pk.sx.serialize_compressed(&mut buf).expect("serialize sx");
            pk.spx
                .serialize_compressed(&mut buf)
                .expect("serialize spx");
        }
        buf
    }

    fn compute_hash(&self) -> [u8; 32] {
        Sha256::digest(self.serialize_for_hash()).into()
    }

    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase1Error> {
        enc.encode_g1(&self.g1_tau)?;
        enc.encode_g1(&self.g1_alpha)?;
        enc.encode_g1(&self.g1_beta)?;
        enc.encode_g2(&self.g2_tau)?;
        enc.encode_g2(&self.g2_beta)?;
        for pk in [&self.pk_tau, &self.pk_alpha, &self.pk_beta] {
            enc.encode_g1(&pk.s)?;
            enc.encode_g1(&pk.sx)?;
            enc.encode_g2(&pk.spx)?;
        }
        enc.encode_hash(&self.hash)?;
        Ok(())
    }

    fn read<R: Read>(dec: &mut Decoder<R>) -> Result<Self, Phase1Error> {
        let g1_tau = dec.decode_g1(Trust::Untrusted)?;
        let g1_alpha = dec.decode_g1(Trust::Untrusted)?;
        let g1_beta = dec.decode_g1(Trust::Untrusted)?;
        let g2_tau = dec.decode_g2(Trust::Untrusted)?;
        let g2_beta = dec.decode_g2(Trust::Untrusted)?;
        let mut read_pk = |dec: &mut Decoder<R>| -> Result<PublicKey, Phase1Error> {
            let s = dec.decode_g1(Trust::Untrusted)?;
            let sx = dec.decode_g1(Trust::Untrusted)?;
            let spx = dec.decode_g2(Trust::Untrusted)?;
            Ok(PublicKey { s, sx, spx })
        };
        let pk_tau = read_pk(dec)?;
        let pk_alpha = read_pk(dec)?;
        let pk_beta = read_pk(dec)?;
        let hash = dec.decode_hash()?;
        Ok(Contribution {
            g1_tau,
            g1_alpha,
            g1_beta,
            g2_tau,
            g2_beta,
            pk_tau,
            pk_alpha,
            pk_beta,
            hash,
        })
    }
}

/// Initialize a Phase 1 file of the given power: header + four monomial
/// sections filled with generators (tau = alpha = beta = 1).
pub fn initialize<W: Write>(power: u8, out: W) -> Result<(), Phase1Error> {
    if power > MAX_POWER {
        return Err(Phase1Error::PowerTooLarge(power));
    }
    if power < MIN_POWER {
        return Err(Phase1Error::PowerTooSmall(power));
    }
    let n = 1usize << power;
    let header = Header { power, contributions: 0 };
    let mut enc = Encoder::new(out, Encoding::Compressed);
    header.write(&mut enc)?;

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();
    for _ in 0..(2 * n - 1) {
        enc.encode_g1(&g1)?;
    }
    for _ in 0..n {
        enc.encode_g1(&g1)?; // AlphaTauG1: alpha = 1
    }
    for _ in 0..n {
        enc.encode_g1(&g1)?; // BetaTauG1: beta = 1
    }
    for _ in 0..n {
        enc.encode_g2(&g2)?;
    }
    enc.encode_g2(&g2)?; // BetaG2: beta = 1
    enc.flush()?;
    Ok(())
}

/// Fold in a fresh, independently-sampled contribution: read `input`, write
/// the updated SRS plus an appended Contribution record to `output`.
pub fn contribute<R: Read + Seek, W: Write>(input: R, out: W) -> Result<(), Phase1Error> {
    let mut rng = OsRng;
    let tau = Fr::rand(&mut rng);
    let alpha = Fr::rand(&mut rng);
    let beta = Fr::rand(&mut rng);
    contribute_with_scalars(input, out, tau, alpha, beta)
}

/// Deterministic contribution for local development only: samples from a
/// fixed-seed `StdRng` instead of `OsRng`, matching the grounding crate's
/// gating of `srs_setup::generate_dev_srs` behind the same feature (§5,
/// "Determinism"). The resulting tau is public; never use this file's
/// output in production.
#[cfg(feature = "dev-srs")]
pub fn dev_contribute<R: Read + Seek, W: Write>(input: R, out: W) -> Result<(), Phase1Error> {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::from_seed([42u8; 32]);
    let tau = Fr::rand(&mut rng);
    let alpha = Fr::rand(&mut rng);
    let beta = Fr::rand(&mut rng);
    contribute_with_scalars(input, out, tau, alpha, beta)
}

fn contribute_with_scalars<R: Read + Seek, W: Write>(
    mut input: R,
    out: W,
    tau: Fr,
    alpha: Fr,
    beta: Fr,
) -> Result<(), Phase1Error> {
    let mut dec = Decoder::new(&mut input, Encoding::Compressed);
    let header = Header::read(&mut dec)?;
    let n = 1usize << header.power;
    let one = Fr::from(1u64);

    let mut enc = Encoder::new(out, Encoding::Compressed);
    let new_header = Header {
        power: header.power,
        contributions: header
            .contributions
            .checked_add(1)
            .ok_or(Phase1Error::BadHeader("contributions overflow"))?,
    };
    new_header.write(&mut enc)?;

    let (_, g1_tau) = batch_scale_g1(
        &mut dec,
        &mut enc,
        2 * n - 1,
        one,
        tau,
        one,
        FirstPointRule::TauOnly,
    )?;
    let (_, g1_alpha) = batch_scale_g1(
        &mut dec,
        &mut enc,
        n,
        one,
        tau,
        alpha,
        FirstPointRule::WithMultiplicand,
    )?;
    let (_, g1_beta) = batch_scale_g1(
        &mut dec,
        &mut enc,
        n,
        one,
        tau,
        beta,
        FirstPointRule::WithMultiplicand,
    )?;
    let (_, g2_tau) = batch_scale_g2(
        &mut dec,
        &mut enc,
        n,
        one,
        tau,
        one,
        FirstPointRule::TauOnly,
    )?;

    let old_beta_g2 = dec.decode_g2(Trust::Untrusted)?;
    let new_beta_g2 = (old_beta_g2 * beta).into_affine();
    enc.encode_g2(&new_beta_g2)?;

    // Copy through existing contributions unchanged, tracking the last one's
    // hash to chain the new contribution against.
    let mut last_hash: Vec<u8> = Vec::new();
    for _ in 0..header.contributions {
        let c = Contribution::read(&mut dec)?;
        last_hash = c.hash.to_vec();
        c.write(&mut enc)?;
    }

    let pk_tau = transcript::generate_public_key(tau, &last_hash, DST_TAU_DELTA);
    let pk_alpha = transcript::generate_public_key(alpha, &last_hash, DST_ALPHA);
    let pk_beta = transcript::generate_public_key(beta, &last_hash, DST_BETA);

    let mut new_contribution = Contribution {
        g1_tau,
        g1_alpha,
        g1_beta,
        g2_tau,
        g2_beta: new_beta_g2,
        pk_tau,
        pk_alpha,
        pk_beta,
        hash: [0u8; 32],
    };
    new_contribution.hash = new_contribution.compute_hash();
    new_contribution.write(&mut enc)?;
    enc.flush()?;
    Ok(())
}

fn verify_contribution(cur: &Contribution, prev: &Contribution) -> Result<(), Phase1Error> {
    let prev_hash = prev.prev_hash_bytes();

    for (dst, pk, cur_g1, prev_g1) in [
        (DST_TAU_DELTA, &cur.pk_tau, cur.g1_tau, prev.g1_tau),
        (DST_ALPHA, &cur.pk_alpha, cur.g1_alpha, prev.g1_alpha),
        (DST_BETA, &cur.pk_beta, cur.g1_beta, prev.g1_beta),
    ] {
        let sp = transcript::recompute_sp(pk, &prev_hash, dst);
        if !same_ratio(&pk.s, &pk.sx, &pk.spx, &sp) {
            return Err(VerifyError::PairingCheckFailed("knowledge proof").into());
        }
        if !same_ratio(&cur_g1, &prev_g1, &sp, &pk.spx) {
            return Err(VerifyError::PairingCheckFailed("G1 update proof").into());
        }
    }

    // tau and beta additionally update elements in G2; prove the same x
    // multiplied the G2 accumulator using the tau/beta public keys' S/SX.
    if !same_ratio(&cur.pk_tau.s, &cur.pk_tau.sx, &cur.g2_tau, &prev.g2_tau) {
        return Err(VerifyError::PairingCheckFailed("G2 tau update proof").into());
    }
    if !same_ratio(&cur.pk_beta.s, &cur.pk_beta.sx, &cur.g2_beta, &prev.g2_beta) {
        return Err(VerifyError::PairingCheckFailed("G2 beta update proof").into());
    }

    let recomputed = cur.compute_hash();
    if recomputed != cur.hash {
        return Err(VerifyError::HashMismatch(0).into());
    }
    Ok(())
}

/// Verify a Phase 1 file end to end: the randomized powers-consistency
/// check over each section, the `BetaG2` equality, and the full contribution
/// chain replay.
pub fn verify<R: Read + Seek>(mut input: R) -> Result<(), Phase1Error> {
    let mut dec = Decoder::new(&mut input, Encoding::Compressed);
    let header = Header::read(&mut dec)?;
    if header.power < MIN_POWER {
        return Err(Phase1Error::PowerTooSmall(header.power));
    }
    let n = 1usize << header.power;

    let tau_g1 = dec.decode_g1_vec(2 * n - 1, Trust::Untrusted)?;
    let alpha_tau_g1 = dec.decode_g1_vec(n, Trust::Untrusted)?;
    let beta_tau_g1 = dec.decode_g1_vec(n, Trust::Untrusted)?;
    let tau_g2 = dec.decode_g2_vec(n, Trust::Untrusted)?;
    let beta_g2 = dec.decode_g2(Trust::Untrusted)?;

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();

    if tau_g1.is_empty() || tau_g1[0] != g1 {
        return Err(VerifyError::PairingCheckFailed("TauG1[0] != g1").into());
    }

    // Powers consistency: TauG1 against itself, anchored by tau_g2[1].
    let tau_g2_1 = tau_g2.get(1).copied().unwrap_or(g2);
    let (l1, l2) = powers_consistency_g1(&tau_g1);
    if !same_ratio(&l1, &l2, &tau_g2_1, &g2) {
        return Err(VerifyError::PairingCheckFailed("TauG1 powers consistency").into());
    }
    if alpha_tau_g1.len() >= 2 {
        let (l1, l2) = powers_consistency_g1(&alpha_tau_g1);
        if !same_ratio(&l1, &l2, &tau_g2_1, &g2) {
            return Err(VerifyError::PairingCheckFailed("AlphaTauG1 powers consistency").into());
        }
    }
    if beta_tau_g1.len() >= 2 {
        let (l1, l2) = powers_consistency_g1(&beta_tau_g1);
        if !same_ratio(&l1, &l2, &tau_g2_1, &g2) {
            return Err(VerifyError::PairingCheckFailed("BetaTauG1 powers consistency").into());
        }
    }
    if tau_g2.len() >= 2 {
        let (l1, l2) = powers_consistency_g2(&tau_g2);
        let tau_g1_1 = tau_g1.get(1).copied().unwrap_or(g1);
        if !same_ratio(&tau_g1_1, &g1, &l1, &l2) {
            return Err(VerifyError::PairingCheckFailed("TauG2 powers consistency").into());
        }
    }

    let mut contributions = Vec::with_capacity(header.contributions as usize);
    for _ in 0..header.contributions {
        contributions.push(Contribution::read(&mut dec)?);
    }

    if let Some(last) = contributions.last() {
        if last.g2_beta != beta_g2 {
            return Err(VerifyError::BetaG2Mismatch.into());
        }
        if last.g1_tau != *tau_g1.get(1).unwrap_or(&g1) {
            return Err(VerifyError::PairingCheckFailed("final contribution tau mismatch").into());
        }
    } else if beta_g2 != g2 {
        return Err(VerifyError::BetaG2Mismatch.into());
    }

    let mut prev = Contribution::default_contribution();
    for cur in &contributions {
        verify_contribution(cur, &prev)?;
        prev = *cur;
    }

    Ok(())
}

/// File size (bytes) of a Phase 1 file with the given power and
/// contribution count, per [`Phase1Layout`].
pub fn file_size(power: u8, contributions: u16) -> u64 {
    Phase1Layout::new(power).total_size(contributions)
}

/// Read the header and, if present, the final contribution's `[alpha]_1`,
/// `[beta]_1`, `[beta]_2` — the three scalars [`crate::phase2`] needs out of
/// a finalized Phase 1 file to seed its `evals` side-file. Falls back to the
/// generators when the file has no contributions yet (tau = alpha = beta = 1).
pub fn read_last_contribution_fields<R: Read + Seek>(
    mut input: R,
) -> Result<(Header, G1Affine, G1Affine, G2Affine), Phase1Error> {
    let header = {
        let mut dec = Decoder::new(&mut input, Encoding::Compressed);
        Header::read(&mut dec)?
    };
    if header.contributions == 0 {
        return Ok((
            header,
            G1Affine::generator(),
            G1Affine::generator(),
            G2Affine::generator(),
        ));
    }
    let layout = Phase1Layout::new(header.power);
    let offset = layout.last_contribution_offset(header.contributions);
    input
        .seek(std::io::SeekFrom::Start(offset))
        .map_err(crate::error::CodecError::from)?;
    let mut dec = Decoder::new(&mut input, Encoding::Compressed);
    let c = Contribution::read(&mut dec)?;
    Ok((header, c.g1_alpha, c.g1_beta, c.g2_beta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn init_bytes(power: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        initialize(power, &mut buf).unwrap();
        buf
    }

    #[test]
    fn initialize_then_verify_succeeds_for_small_power() {
        let buf = init_bytes(4);
        assert_eq!(buf.len() as u64, file_size(4, 0));
        verify(Cursor::new(&buf)).unwrap();
    }

    #[test]
    fn s1_scenario_file_size() {
        let buf = init_bytes(4);
        assert_eq!(buf.len(), 3107);
    }

    #[test]
    fn contribute_then_verify_chain_succeeds() {
        let mut buf = init_bytes(6);
        for _ in 0..3 {
            let mut out = Vec::new();
            contribute(Cursor::new(&buf), &mut out).unwrap();
            buf = out;
        }
        verify(Cursor::new(&buf)).unwrap();

        let mut dec = Decoder::new(Cursor::new(&buf), Encoding::Compressed);
        let header = Header::read(&mut dec).unwrap();
        assert_eq!(header.contributions, 3);
    }

    #[test]
    fn corrupting_tau_g1_breaks_verification() {
        let mut buf = init_bytes(6);
        let mut out = Vec::new();
        contribute(Cursor::new(&buf), &mut out).unwrap();
        buf = out;

        // Flip a byte inside the TauG1 section (right after the header).
        buf[10] ^= 0xFF;
        assert!(verify(Cursor::new(&buf)).is_err());
    }

    #[test]
    fn initialize_rejects_power_zero() {
        let mut buf = Vec::new();
        let err = initialize(0, &mut buf).unwrap_err();
        assert!(matches!(err, Phase1Error::PowerTooSmall(0)));
    }

    #[test]
    fn verify_rejects_power_zero_header_instead_of_panicking() {
        // A well-formed power=0 file: header + TauG1 (len 1) + AlphaTauG1
        // (len 1) + BetaTauG1 (len 1) + TauG2 (len 1) + BetaG2, all
        // generators. `initialize` now refuses to produce this, so build it
        // by hand to exercise `verify`'s own defense against an adversarial
        // file claiming power=0.
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf, Encoding::Compressed);
            Header { power: 0, contributions: 0 }.write(&mut enc).unwrap();
            let g1 = G1Affine::generator();
            let g2 = G2Affine::generator();
            enc.encode_g1(&g1).unwrap(); // TauG1[0], len 2*1-1=1
            enc.encode_g1(&g1).unwrap(); // AlphaTauG1[0]
            enc.encode_g1(&g1).unwrap(); // BetaTauG1[0]
            enc.encode_g2(&g2).unwrap(); // TauG2[0]
            enc.encode_g2(&g2).unwrap(); // BetaG2
            enc.flush().unwrap();
        }
        let err = verify(Cursor::new(&buf)).unwrap_err();
        assert!(matches!(err, Phase1Error::PowerTooSmall(0)));
    }

    #[test]
    fn s5_scenario_tau_at_one_fails_before_chain_examined() {
        let mut buf = init_bytes(3);
        // TauG1[1] lives right after the header and TauG1[0].
        let layout = Phase1Layout::new(3);
        let idx = (layout.tau_g1_offset() + crate::codec::G1_COMPRESSED as u64) as usize;
        // Corrupt the compressed point's flag/leading bytes so it decodes
        // to a different, but still valid, point than g1.
        buf[idx] ^= 0x40;
        let err = verify(Cursor::new(&buf));
        assert!(err.is_err());
    }

    #[test]
    #[cfg(feature = "dev-srs")]
    fn dev_contribute_is_deterministic_and_verifies() {
        let buf = init_bytes(4);

        let mut a = Vec::new();
        dev_contribute(Cursor::new(&buf), &mut a).unwrap();
        let mut b = Vec::new();
        dev_contribute(Cursor::new(&buf), &mut b).unwrap();

        assert_eq!(a, b);
        verify(Cursor::new(&a)).unwrap();
    }
}
