//! Phase 2 (circuit-specific) engine: Initialize, Contribute, Verify.
//!
//! Wire-role bookkeeping: this crate's [`crate::r1cs::R1cs`] gives each wire
//! a flat index over `0..raw_wires()`. A wire is **public** if its index
//! falls in `0..num_public`, or if it is the commitment circuit's reserved
//! `commitment_index` (moved to public per §4.6.1); **committed-private** if
//! it appears in `commitment_info.committed_wires`; otherwise **witness**.
//! The phase2 file's `L` section holds the public entries (an invariant
//! prefix) followed by the non-committed witness entries (the part scaled by
//! delta on every Contribute); `evals` separately keeps `vkk` (a copy of the
//! public prefix, for the verifying key) and `ckk` (the committed-private
//! entries, which the Groth16 commitment extension consumes, not the regular
//! delta-scaled pipeline). This split is an explicit design decision filling
//! an open question in the source material — see DESIGN.md.

use crate::batch_scale::{batch_scale_g1, FirstPointRule};
use crate::codec::{Decoder, Encoder, Encoding, Phase2Layout, Trust};
use crate::error::{Phase2Error, VerifyError};
use crate::lagrange::{bit_reverse, lagrange_g1, lagrange_g2};
use crate::pairing::{msm_g1, random_scalars, same_ratio};
use crate::phase1;
use crate::r1cs::R1cs;
use crate::transcript::{self, PublicKey, DST_TAU_DELTA};
use ark_bn254::{Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, UniformRand, Zero};
use ark_serialize::CanonicalSerialize;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::io::{Read, Seek, SeekFrom, Write};

fn next_pow2(n: u32) -> u32 {
    if n <= 1 {
        return 1;
    }
    1u32 << (32 - (n - 1).leading_zeros())
}

/// Phase 2 file header (§3): six `u32` fields plus a `u16` contribution count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Total wire count (`internal + public + secret`), unadjusted for any
    /// commitment-slot move.
    pub wires: u32,
    /// Non-committed witness wire count.
    pub witness: u32,
    /// Public wire count (including the commitment slot, if any).
    pub public: u32,
    /// Committed-private wire count.
    pub private_committed: u32,
    /// Number of R1CS constraints.
    pub constraints: u32,
    /// `next_pow2(constraints)`.
    pub domain: u32,
    /// Number of contributions appended so far.
    pub contributions: u16,
}

impl Header {
    fn from_r1cs(r1cs: &R1cs) -> Self {
        let roles = classify_wires(r1cs);
        let public = roles.iter().filter(|r| **r == WireRole::Public).count() as u32;
        let witness = roles.iter().filter(|r| **r == WireRole::Witness).count() as u32;
        let private_committed = r1cs.num_private_committed() as u32;
        let constraints = r1cs.constraints.len() as u32;
        Header {
            wires: r1cs.raw_wires() as u32,
            witness,
            public,
            private_committed,
            constraints,
            domain: next_pow2(constraints),
            contributions: 0,
        }
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> Result<Self, Phase2Error> {
        Ok(Header {
            wires: dec.decode_u32()?,
            witness: dec.decode_u32()?,
            public: dec.decode_u32()?,
            private_committed: dec.decode_u32()?,
            constraints: dec.decode_u32()?,
            domain: dec.decode_u32()?,
            contributions: dec.decode_u16()?,
        })
    }

    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase2Error> {
        enc.encode_u32(self.wires)?;
        enc.encode_u32(self.witness)?;
        enc.encode_u32(self.public)?;
        enc.encode_u32(self.private_committed)?;
        enc.encode_u32(self.constraints)?;
        enc.encode_u32(self.domain)?;
        enc.encode_u16(self.contributions)?;
        Ok(())
    }

    /// `true` if every field matches `other` except `contributions`.
    pub fn matches_ignoring_contributions(&self, other: &Header) -> bool {
        self.wires == other.wires
            && self.witness == other.witness
            && self.public == other.public
            && self.private_committed == other.private_committed
            && self.constraints == other.constraints
            && self.domain == other.domain
    }

    /// Length of the `L` section stored in the phase2 file itself:
    /// `public + witness` (the committed-private part lives in `evals`).
    pub fn l_len(&self) -> usize {
        (self.public + self.witness) as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WireRole {
    Public,
    CommittedPrivate,
    Witness,
}

fn classify_wires(r1cs: &R1cs) -> Vec<WireRole> {
    let mut roles = vec![WireRole::Witness; r1cs.raw_wires()];
    for role in roles.iter_mut().take(r1cs.num_public) {
        *role = WireRole::Public;
    }
    if let Some(info) = &r1cs.commitment_info {
        for &w in &info.committed_wires {
            roles[w] = WireRole::CommittedPrivate;
        }
        roles[info.commitment_index] = WireRole::Public;
    }
    roles
}

/// Committed-private wire metadata, written verbatim into `evals` so
/// [`crate::key_extractor`] can set up the Pedersen commitment key.
#[derive(Clone, Debug, Default)]
pub struct EvalsCommitmentInfo {
    /// Wire index reserved for the commitment itself.
    pub commitment_index: u32,
    /// Indices of the committed private wires, in the order `ckk` was built.
    pub committed_wires: Vec<u32>,
}

fn write_commitment_info<W: Write>(
    enc: &mut Encoder<W>,
    info: &Option<EvalsCommitmentInfo>,
) -> Result<(), Phase2Error> {
    match info {
        None => enc.encode_u8(0)?,
        Some(info) => {
            enc.encode_u8(1)?;
            enc.encode_u32(info.commitment_index)?;
            enc.encode_u32(info.committed_wires.len() as u32)?;
            for &w in &info.committed_wires {
                enc.encode_u32(w)?;
            }
        }
    }
    Ok(())
}

fn read_commitment_info<R: Read>(
    dec: &mut Decoder<R>,
) -> Result<Option<EvalsCommitmentInfo>, Phase2Error> {
    match dec.decode_u8()? {
        0 => Ok(None),
        _ => {
            let commitment_index = dec.decode_u32()?;
            let n = dec.decode_u32()? as usize;
            let mut committed_wires = Vec::with_capacity(n);
            for _ in 0..n {
                committed_wires.push(dec.decode_u32()?);
            }
            Ok(Some(EvalsCommitmentInfo {
                commitment_index,
                committed_wires,
            }))
        }
    }
}

/// The `evals` side-file: `[alpha]_1, [beta]_1, [beta]_2`, per-wire `A, B1,
/// B2`, `vkk`, `ckk`, and the commitment metadata (§6).
pub struct Evals {
    /// `[alpha]_1` from the finalized Phase 1 SRS.
    pub alpha_g1: G1Affine,
    /// `[beta]_1`.
    pub beta_g1: G1Affine,
    /// `[beta]_2`.
    pub beta_g2: G2Affine,
    /// Per-wire `A[w]`, length `header.wires`.
    pub a: Vec<G1Affine>,
    /// Per-wire `B1[w]`.
    pub b1: Vec<G1Affine>,
    /// Per-wire `B2[w]`.
    pub b2: Vec<G2Affine>,
    /// Public-wire `L` entries (a copy of the phase2 file's public prefix).
    pub vkk: Vec<G1Affine>,
    /// Committed-private `L` entries.
    pub ckk: Vec<G1Affine>,
    /// Commitment metadata, present iff the R1CS uses one.
    pub commitment_info: Option<EvalsCommitmentInfo>,
}

impl Evals {
    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase2Error> {
        enc.encode_g1(&self.alpha_g1)?;
        enc.encode_g1(&self.beta_g1)?;
        enc.encode_g2(&self.beta_g2)?;
        enc.encode_g1_vec(&self.a)?;
        enc.encode_g1_vec(&self.b1)?;
        enc.encode_g2_vec(&self.b2)?;
        enc.encode_g1_vec(&self.vkk)?;
        enc.encode_g1_vec(&self.ckk)?;
        write_commitment_info(enc, &self.commitment_info)?;
        Ok(())
    }

    /// Read an `evals` file back given the wire counts recorded in the
    /// phase2 [`Header`] that produced it.
    pub fn read<R: Read>(dec: &mut Decoder<R>, header: &Header) -> Result<Self, Phase2Error> {
        let alpha_g1 = dec.decode_g1(Trust::Untrusted)?;
        let beta_g1 = dec.decode_g1(Trust::Untrusted)?;
        let beta_g2 = dec.decode_g2(Trust::Untrusted)?;
        let a = dec.decode_g1_vec(header.wires as usize, Trust::Untrusted)?;
        let b1 = dec.decode_g1_vec(header.wires as usize, Trust::Untrusted)?;
        let b2 = dec.decode_g2_vec(header.wires as usize, Trust::Untrusted)?;
        let vkk = dec.decode_g1_vec(header.public as usize, Trust::Untrusted)?;
        let ckk = dec.decode_g1_vec(header.private_committed as usize, Trust::Untrusted)?;
        let commitment_info = read_commitment_info(dec)?;
        Ok(Evals {
            alpha_g1,
            beta_g1,
            beta_g2,
            a,
            b1,
            b2,
            vkk,
            ckk,
            commitment_info,
        })
    }
}

/// One Phase 2 contribution record: `delta`, a knowledge-of-exponent public
/// key, and the chained hash — all in raw encoding (§6).
#[derive(Clone, Copy)]
pub struct Contribution {
    /// `[delta]_1` at the time of this contribution.
    pub delta: G1Affine,
    /// Knowledge-of-exponent proof for delta.
    pub pk: PublicKey,
    /// SHA-256 over the fields above, excluding this hash.
    pub hash: [u8; 32],
}

impl Contribution {
    fn default_contribution() -> Self {
        Contribution {
            delta: G1Affine::generator(),
            pk: transcript::generate_public_key(Fr::from(1u64), &[], DST_TAU_DELTA),
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
        self.delta
            .serialize_uncompressed(&mut buf)
            .expect("serialize delta");
        self.pk.s.serialize_uncompressed(&mut buf).expect("s");
        self.pk.sx.serialize_uncompressed(&mut buf).expect("sx");
        self.pk.spx.serialize_uncompressed(&mut buf).expect("spx");
        buf
    }

    fn compute_hash(&self) -> [u8; 32] {
        Sha256::digest(self.serialize_for_hash()).into()
    }

    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase2Error> {
        enc.encode_g1(&self.delta)?;
        enc.encode_g1(&self.pk.s)?;
        enc.encode_g1(&self.pk.sx)?;
        enc.encode_g2(&self.pk.spx)?;
        enc.encode_hash(&self.hash)?;
        Ok(())
    }

    fn read<R: Read>(dec: &mut Decoder<R>) -> Result<Self, Phase2Error> {
        let delta = dec.decode_g1(Trust::Untrusted)?;
        let s = dec.decode_g1(Trust::Untrusted)?;
        let sx = dec.decode_g1(Trust::Untrusted)?;
        let spx = dec.decode_g2(Trust::Untrusted)?;
        let hash = dec.decode_hash()?;
        Ok(Contribution {
            delta,
            pk: PublicKey { s, sx, spx },
            hash,
        })
    }
}

/// Per-wire accumulation result feeding both `evals` and the phase2 `L`
/// section.
struct Evaluation {
    a: Vec<G1Projective>,
    b1: Vec<G1Projective>,
    b2: Vec<G2Projective>,
    l: Vec<G1Projective>,
}

fn coeff_scalar(coeff: crate::r1cs::Coeff, table: &[Fr]) -> Fr {
    coeff.apply(Fr::from(1u64), table)
}

fn evaluate_constraints(
    r1cs: &R1cs,
    lag_tau_g1: &[G1Affine],
    lag_tau_g2: &[G2Affine],
    lag_alpha_tau_g1: &[G1Affine],
    lag_beta_tau_g1: &[G1Affine],
) -> Evaluation {
    let wires = r1cs.raw_wires();
    let mut a = vec![G1Projective::zero(); wires];
    let mut b1 = vec![G1Projective::zero(); wires];
    let mut b2 = vec![G2Projective::zero(); wires];
    let mut l = vec![G1Projective::zero(); wires];

    for (i, constraint) in r1cs.constraints.iter().enumerate() {
        let tau_g1_i = lag_tau_g1[i].into_group();
        let tau_g2_i = lag_tau_g2[i].into_group();
        let alpha_i = lag_alpha_tau_g1[i].into_group();
        let beta_i = lag_beta_tau_g1[i].into_group();

        for term in &constraint.l {
            let c = coeff_scalar(term.coeff, &r1cs.coeff_table);
            a[term.wire] += tau_g1_i * c;
            l[term.wire] += beta_i * c;
        }
        for term in &constraint.r {
            let c = coeff_scalar(term.coeff, &r1cs.coeff_table);
            b1[term.wire] += tau_g1_i * c;
            b2[term.wire] += tau_g2_i * c;
            l[term.wire] += alpha_i * c;
        }
        for term in &constraint.o {
            let c = coeff_scalar(term.coeff, &r1cs.coeff_table);
            l[term.wire] += tau_g1_i * c;
        }
    }

    Evaluation { a, b1, b2, l }
}

fn read_monomial_slice_g1<R: Read + Seek>(
    phase1: &mut R,
    offset: u64,
    n: usize,
) -> Result<Vec<G1Affine>, Phase2Error> {
    phase1
        .seek(SeekFrom::Start(offset))
        .map_err(crate::error::CodecError::from)?;
    let mut dec = Decoder::new(phase1, Encoding::Compressed);
    Ok(dec.decode_g1_vec(n, Trust::Untrusted)?)
}

fn read_monomial_slice_g2<R: Read + Seek>(
    phase1: &mut R,
    offset: u64,
    n: usize,
) -> Result<Vec<G2Affine>, Phase2Error> {
    phase1
        .seek(SeekFrom::Start(offset))
        .map_err(crate::error::CodecError::from)?;
    let mut dec = Decoder::new(phase1, Encoding::Compressed);
    Ok(dec.decode_g2_vec(n, Trust::Untrusted)?)
}

/// Build Z: `TauG1[i+d] - TauG1[i]` for `i in [0, d)`, bit-reversed, then
/// truncated to length `d - 1` (§4.6.1).
fn compute_z<R: Read + Seek>(
    phase1: &mut R,
    power: u8,
    domain: u32,
) -> Result<Vec<G1Affine>, Phase2Error> {
    let layout = crate::codec::Phase1Layout::new(power);
    let d = domain as usize;
    let pts = read_monomial_slice_g1(phase1, layout.tau_g1_offset(), 2 * d)?;
    let z_full: Vec<G1Projective> = (0..d)
        .map(|i| pts[i + d].into_group() - pts[i].into_group())
        .collect();
    let mut reversed = bit_reverse(&z_full);
    reversed.truncate(d.saturating_sub(1));
    Ok(reversed.into_iter().map(|p| p.into_affine()).collect())
}

/// Phase 2 Initialize (§4.6.1). Writes the header + delta/Z/L sections to
/// `phase2_out`, the four Lagrange arrays to `lag_out`, and the evaluation
/// side-file to `evals_out`.
pub fn initialize<P1, W1, W2, W3>(
    mut phase1: P1,
    r1cs: &R1cs,
    phase2_out: W1,
    mut lag_out: W2,
    evals_out: W3,
) -> Result<(), Phase2Error>
where
    P1: Read + Seek,
    W1: Write,
    W2: Write,
    W3: Write,
{
    let (phase1_header, alpha_g1, beta_g1, beta_g2) =
        phase1::read_last_contribution_fields(&mut phase1)?;
    let n = 1u64 << phase1_header.power;

    let header = Header::from_r1cs(r1cs);
    if (header.domain as u64) > n {
        return Err(Phase2Error::Capacity {
            power: phase1_header.power,
            capacity: n,
            constraints: header.constraints as u64,
        });
    }
    let d = header.domain as usize;
    let layout = crate::codec::Phase1Layout::new(phase1_header.power);

    let mut lag_tau_g1 = read_monomial_slice_g1(&mut phase1, layout.tau_g1_offset(), d)?;
    let mut lag_alpha_tau_g1 =
        read_monomial_slice_g1(&mut phase1, layout.alpha_tau_g1_offset(), d)?;
    let mut lag_beta_tau_g1 = read_monomial_slice_g1(&mut phase1, layout.beta_tau_g1_offset(), d)?;
    let mut lag_tau_g2 = read_monomial_slice_g2(&mut phase1, layout.tau_g2_offset(), d)?;

    lagrange_g1(&mut lag_tau_g1);
    lagrange_g1(&mut lag_alpha_tau_g1);
    lagrange_g1(&mut lag_beta_tau_g1);
    lagrange_g2(&mut lag_tau_g2);

    {
        let mut lag_enc = Encoder::new(&mut lag_out, Encoding::Raw);
        lag_enc.encode_g1_array(&lag_tau_g1)?;
        lag_enc.encode_g1_array(&lag_alpha_tau_g1)?;
        lag_enc.encode_g1_array(&lag_beta_tau_g1)?;
        lag_enc.encode_g2_array(&lag_tau_g2)?;
        lag_enc.flush()?;
    }

    let eval = evaluate_constraints(
        r1cs,
        &lag_tau_g1,
        &lag_tau_g2,
        &lag_alpha_tau_g1,
        &lag_beta_tau_g1,
    );
    let roles = classify_wires(r1cs);

    let mut public_entries = Vec::with_capacity(header.public as usize);
    let mut witness_entries = Vec::with_capacity(header.witness as usize);
    let mut committed_entries = Vec::with_capacity(header.private_committed as usize);
    let mut committed_wire_indices = Vec::with_capacity(header.private_committed as usize);
    for (w, role) in roles.iter().enumerate() {
        let point = eval.l[w].into_affine();
        match role {
            WireRole::Public => public_entries.push(point),
            WireRole::Witness => witness_entries.push(point),
            WireRole::CommittedPrivate => {
                committed_entries.push(point);
                committed_wire_indices.push(w as u32);
            }
        }
    }

    let a: Vec<G1Affine> = eval.a.into_iter().map(|p| p.into_affine()).collect();
    let b1: Vec<G1Affine> = eval.b1.into_iter().map(|p| p.into_affine()).collect();
    let b2: Vec<G2Affine> = eval.b2.into_iter().map(|p| p.into_affine()).collect();

    let commitment_info = r1cs
        .commitment_info
        .as_ref()
        .map(|info| EvalsCommitmentInfo {
            commitment_index: info.commitment_index as u32,
            committed_wires: committed_wire_indices,
        });

    let evals = Evals {
        alpha_g1,
        beta_g1,
        beta_g2,
        a,
        b1,
        b2,
        vkk: public_entries.clone(),
        ckk: committed_entries,
        commitment_info,
    };
    {
        let mut evals_enc = Encoder::new(evals_out, Encoding::Raw);
        evals.write(&mut evals_enc)?;
        evals_enc.flush()?;
    }

    let z = compute_z(&mut phase1, phase1_header.power, header.domain)?;

    let mut enc = Encoder::new(phase2_out, Encoding::Raw);
    header.write(&mut enc)?;
    enc.encode_g1(&G1Affine::generator())?; // [delta]_1 = g1
    enc.encode_g2(&G2Affine::generator())?; // [delta]_2 = g2
    enc.encode_g1_vec(&z)?;
    enc.encode_g1_vec(&public_entries)?;
    enc.encode_g1_vec(&witness_entries)?;
    enc.flush()?;
    Ok(())
}

/// Phase 2 Contribute (§4.6.2).
pub fn contribute<R: Read + Seek, W: Write>(mut input: R, out: W) -> Result<(), Phase2Error> {
    let mut dec = Decoder::new(&mut input, Encoding::Raw);
    let header = Header::read(&mut dec)?;

    let mut rng = OsRng;
    let delta = Fr::rand(&mut rng);
    let delta_inv = delta.inverse().expect("delta sampled nonzero w.h.p.");
    let one = Fr::from(1u64);

    let old_delta1 = dec.decode_g1(Trust::Untrusted)?;
    let old_delta2 = dec.decode_g2(Trust::Untrusted)?;
    let new_delta1 = (old_delta1 * delta).into_affine();
    let new_delta2 = (old_delta2 * delta).into_affine();

    let mut enc = Encoder::new(out, Encoding::Raw);
    let new_header = Header {
        contributions: header
            .contributions
            .checked_add(1)
            .ok_or(Phase2Error::HeaderMismatch("contributions overflow"))?,
        ..header
    };
    new_header.write(&mut enc)?;
    enc.encode_g1(&new_delta1)?;
    enc.encode_g2(&new_delta2)?;

    let z_len = header.domain.saturating_sub(1) as usize;
    batch_scale_g1(
        &mut dec,
        &mut enc,
        z_len,
        one,
        one,
        delta_inv,
        FirstPointRule::TauOnly,
    )?;

    let public_entries = dec.decode_g1_vec(header.public as usize, Trust::Untrusted)?;
    enc.encode_g1_vec(&public_entries)?;
    batch_scale_g1(
        &mut dec,
        &mut enc,
        header.witness as usize,
        one,
        one,
        delta_inv,
        FirstPointRule::TauOnly,
    )?;

    let mut last_hash: Vec<u8> = Vec::new();
    for _ in 0..header.contributions {
        let c = Contribution::read(&mut dec)?;
        last_hash = c.hash.to_vec();
        c.write(&mut enc)?;
    }

    let pk = transcript::generate_public_key(delta, &last_hash, DST_TAU_DELTA);
    let mut new_contribution = Contribution {
        delta: new_delta1,
        pk,
        hash: [0u8; 32],
    };
    new_contribution.hash = new_contribution.compute_hash();
    new_contribution.write(&mut enc)?;
    enc.flush()?;
    Ok(())
}

fn randomized_section_consistency(
    input_section: &[G1Affine],
    origin_section: &[G1Affine],
    delta2: &G2Affine,
    g2: &G2Affine,
) -> bool {
    if input_section.is_empty() {
        return true;
    }
    let r = random_scalars(input_section.len());
    let in_sum = msm_g1(input_section, &r);
    let or_sum = msm_g1(origin_section, &r);
    same_ratio(&in_sum, &or_sum, delta2, g2)
}

/// Phase 2 Verify (§4.6.3): `input` against the `origin` (the initialized,
/// zero-contribution file).
pub fn verify<R1: Read + Seek, R2: Read + Seek>(
    mut input: R1,
    mut origin: R2,
) -> Result<(), Phase2Error> {
    let mut in_dec = Decoder::new(&mut input, Encoding::Raw);
    let header = Header::read(&mut in_dec)?;
    let mut origin_dec = Decoder::new(&mut origin, Encoding::Raw);
    let origin_header = Header::read(&mut origin_dec)?;
    if !header.matches_ignoring_contributions(&origin_header) {
        return Err(Phase2Error::HeaderMismatch("wires/witness/public/domain"));
    }

    let g1 = G1Affine::generator();
    let g2 = G2Affine::generator();

    let delta1 = in_dec.decode_g1(Trust::Untrusted)?;
    let delta2 = in_dec.decode_g2(Trust::Untrusted)?;
    if !same_ratio(&g1, &delta1, &delta2, &g2) {
        return Err(VerifyError::DeltaInconsistent.into());
    }
    let _origin_delta1 = origin_dec.decode_g1(Trust::Untrusted)?;
    let _origin_delta2 = origin_dec.decode_g2(Trust::Untrusted)?;

    let z_len = header.domain.saturating_sub(1) as usize;
    let input_z = in_dec.decode_g1_vec(z_len, Trust::Untrusted)?;
    let origin_z = origin_dec.decode_g1_vec(z_len, Trust::Untrusted)?;
    if !randomized_section_consistency(&input_z, &origin_z, &delta2, &g2) {
        return Err(VerifyError::PairingCheckFailed("Z consistency").into());
    }

    let input_public = in_dec.decode_g1_vec(header.public as usize, Trust::Untrusted)?;
    let origin_public = origin_dec.decode_g1_vec(header.public as usize, Trust::Untrusted)?;
    if input_public != origin_public {
        return Err(VerifyError::PublicLChanged.into());
    }

    let input_witness = in_dec.decode_g1_vec(header.witness as usize, Trust::Untrusted)?;
    let origin_witness = origin_dec.decode_g1_vec(header.witness as usize, Trust::Untrusted)?;
    if !randomized_section_consistency(&input_witness, &origin_witness, &delta2, &g2) {
        return Err(VerifyError::PairingCheckFailed("witness L consistency").into());
    }

    let mut contributions = Vec::with_capacity(header.contributions as usize);
    for _ in 0..header.contributions {
        contributions.push(Contribution::read(&mut in_dec)?);
    }

    let mut prev = Contribution::default_contribution();
    for cur in &contributions {
        let prev_hash = prev.prev_hash_bytes();
        let sp = transcript::recompute_sp(&cur.pk, &prev_hash, DST_TAU_DELTA);
        if !same_ratio(&cur.pk.s, &cur.pk.sx, &cur.pk.spx, &sp) {
            return Err(VerifyError::PairingCheckFailed("knowledge proof").into());
        }
        if !same_ratio(&cur.delta, &prev.delta, &sp, &cur.pk.spx) {
            return Err(VerifyError::PairingCheckFailed("delta update proof").into());
        }
        if cur.compute_hash() != cur.hash {
            return Err(VerifyError::HashMismatch(0).into());
        }
        prev = *cur;
    }

    let expected_delta1 = if let Some(last) = contributions.last() {
        last.delta
    } else {
        g1
    };
    if expected_delta1 != delta1 {
        return Err(VerifyError::LastDeltaMismatch.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r1cs::{Coeff, Constraint, Term};
    use std::io::Cursor;

    fn mimc_like_r1cs() -> R1cs {
        // One toy constraint: wire1 * wire1 = wire2 (wires: 0 = one, 1 = public
        // output, 2 = secret input), matching the shape of a single-constraint
        // preimage circuit without claiming to be an actual MiMC round.
        let l = vec![Term { wire: 2, coeff: Coeff::One }];
        let r = vec![Term { wire: 2, coeff: Coeff::One }];
        let o = vec![Term { wire: 1, coeff: Coeff::One }];
        R1cs {
            num_public: 2,
            num_internal: 0,
            num_secret: 1,
            constraints: vec![Constraint { l, r, o }],
            coeff_table: vec![],
            commitment_info: None,
        }
    }

    #[test]
    fn initialize_produces_header_with_expected_domain() {
        let r1cs = mimc_like_r1cs();
        let mut phase1_buf = Vec::new();
        phase1::initialize(4, &mut phase1_buf).unwrap();

        let mut phase2_out = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_out = Vec::new();
        initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut phase2_out,
            &mut lag_out,
            &mut evals_out,
        )
        .unwrap();

        let mut dec = Decoder::new(Cursor::new(&phase2_out), Encoding::Raw);
        let header = Header::read(&mut dec).unwrap();
        assert_eq!(header.constraints, 1);
        assert_eq!(header.domain, 1);
        assert_eq!(header.wires, 3);
        assert_eq!(header.public, 2);
        assert_eq!(header.witness, 1);
    }

    #[test]
    fn s6_capacity_error_when_domain_exceeds_phase1_power() {
        let mut r1cs = mimc_like_r1cs();
        // Pad constraints so domain = 8 needs power >= 3; use power = 2 (N=4)
        // to force a capacity failure.
        for _ in 0..8 {
            r1cs.constraints.push(r1cs.constraints[0].clone());
        }
        let mut phase1_buf = Vec::new();
        phase1::initialize(2, &mut phase1_buf).unwrap();

        let mut phase2_out = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_out = Vec::new();
        let err = initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut phase2_out,
            &mut lag_out,
            &mut evals_out,
        )
        .unwrap_err();
        assert!(matches!(err, Phase2Error::Capacity { .. }));
    }

    #[test]
    fn contribute_then_verify_against_origin_succeeds() {
        let r1cs = mimc_like_r1cs();
        let mut phase1_buf = Vec::new();
        phase1::initialize(4, &mut phase1_buf).unwrap();

        let mut origin = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_out = Vec::new();
        initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut origin,
            &mut lag_out,
            &mut evals_out,
        )
        .unwrap();

        let mut contributed = Vec::new();
        contribute(Cursor::new(&origin), &mut contributed).unwrap();

        verify(Cursor::new(&contributed), Cursor::new(&origin)).unwrap();
    }

    #[test]
    fn public_l_prefix_is_invariant_across_contributions() {
        let r1cs = mimc_like_r1cs();
        let mut phase1_buf = Vec::new();
        phase1::initialize(4, &mut phase1_buf).unwrap();

        let mut origin = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_out = Vec::new();
        initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut origin,
            &mut lag_out,
            &mut evals_out,
        )
        .unwrap();

        let mut gen1 = Vec::new();
        contribute(Cursor::new(&origin), &mut gen1).unwrap();
        let mut gen2 = Vec::new();
        contribute(Cursor::new(&gen1), &mut gen2).unwrap();

        let header = Header::from_r1cs(&r1cs);
        let mut dec1 = Decoder::new(Cursor::new(&gen1), Encoding::Raw);
        let h1 = Header::read(&mut dec1).unwrap();
        dec1.decode_g1(Trust::Untrusted).unwrap();
        dec1.decode_g2(Trust::Untrusted).unwrap();
        dec1.decode_g1_vec(h1.domain.saturating_sub(1) as usize, Trust::Untrusted)
            .unwrap();
        let public1 = dec1.decode_g1_vec(h1.public as usize, Trust::Untrusted).unwrap();

        let mut dec2 = Decoder::new(Cursor::new(&gen2), Encoding::Raw);
        let h2 = Header::read(&mut dec2).unwrap();
        dec2.decode_g1(Trust::Untrusted).unwrap();
        dec2.decode_g2(Trust::Untrusted).unwrap();
        dec2.decode_g1_vec(h2.domain.saturating_sub(1) as usize, Trust::Untrusted)
            .unwrap();
        let public2 = dec2.decode_g1_vec(h2.public as usize, Trust::Untrusted).unwrap();

        assert_eq!(public1, public2);
        assert_eq!(public1.len(), header.public as usize);
    }

    #[test]
    fn s4_corrupted_last_delta_fails_verify() {
        let r1cs = mimc_like_r1cs();
        let mut phase1_buf = Vec::new();
        phase1::initialize(4, &mut phase1_buf).unwrap();

        let mut origin = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_out = Vec::new();
        initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut origin,
            &mut lag_out,
            &mut evals_out,
        )
        .unwrap();

        let mut contributed = Vec::new();
        contribute(Cursor::new(&origin), &mut contributed).unwrap();

        // Corrupt a byte inside the final contribution's delta field (right
        // after delta1/delta2/z/l/header, at the start of the contribution).
        let layout = Phase2Layout::new(3, 1);
        let idx = layout.contributions_offset() as usize + 1;
        contributed[idx] ^= 0xFF;

        assert!(verify(Cursor::new(&contributed), Cursor::new(&origin)).is_err());
    }
}
