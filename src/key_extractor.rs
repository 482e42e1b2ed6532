//! Assemble Groth16 proving/verifying key files from a finalized Phase 2
//! file and its `evals` side-file (§4.7).

use crate::codec::{Decoder, Encoder, Encoding, Phase2Layout, Trust};
use crate::error::Phase2Error;
use crate::phase2::{Evals, Header};
use ark_bn254::{G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::Zero;
use std::io::{Read, Seek, Write};

/// A packed bit-vector of length `len`, MSB-first within each byte.
#[derive(Clone, Debug, Default)]
pub struct BitVec {
    bits: Vec<u8>,
    len: usize,
}

impl BitVec {
    fn with_len(len: usize) -> Self {
        BitVec {
            bits: vec![0u8; len.div_ceil(8)],
            len,
        }
    }

    fn set(&mut self, idx: usize) {
        self.bits[idx / 8] |= 1 << (7 - idx % 8);
    }

    fn get(&self, idx: usize) -> bool {
        self.bits[idx / 8] & (1 << (7 - idx % 8)) != 0
    }

    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase2Error> {
        enc.encode_u32(self.len as u32)?;
        for byte in &self.bits {
            enc.encode_u8(*byte)?;
        }
        Ok(())
    }
}

/// Remove identity ("infinity") points from `points`, recording their
/// original indices in a bit-vector of length `points.len()`.
fn filter_infinity_g1(points: &[G1Affine]) -> (Vec<G1Affine>, BitVec) {
    let mut filtered = Vec::with_capacity(points.len());
    let mut flags = BitVec::with_len(points.len());
    for (i, p) in points.iter().enumerate() {
        if p.is_zero() {
            flags.set(i);
        } else {
            filtered.push(*p);
        }
    }
    (filtered, flags)
}

/// Filter B2 by the same wire indices `inf_b` (derived from B1) marks as
/// infinity: the L/R linear combination behind a wire's B1 and B2 entries is
/// identical, so a coefficient set that vanishes in G1 vanishes in G2 too —
/// one shared bit-vector covers both, matching §4.7's single `∞_B`.
fn filter_by_flags_g2(points: &[G2Affine], inf_b: &BitVec) -> Vec<G2Affine> {
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| !inf_b.get(*i))
        .map(|(_, p)| *p)
        .collect()
}

/// Minimal Pedersen commitment key over the committed-private wires: the
/// spec names this component without fixing its internal layout, so this
/// keeps the CKK basis alongside the fixed generator — enough for a
/// consumer to rebuild a vector Pedersen commitment, without inventing a
/// NIZK basis the rest of this exercise has no consumer for.
pub struct CommitmentKey {
    /// CKK basis points, one per committed-private wire.
    pub basis: Vec<G1Affine>,
    /// Fixed G1 generator the commitment is blinded against.
    pub g: G1Affine,
}

impl CommitmentKey {
    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase2Error> {
        enc.encode_g1_array(&self.basis)?;
        enc.encode_g1(&self.g)?;
        Ok(())
    }
}

/// Read a finalized Phase 2 file's header, delta, Z, and L section (public
/// prefix + witness suffix), ignoring any appended contribution records.
fn read_finalized_phase2<R: Read + Seek>(
    mut phase2: R,
) -> Result<(Header, G1Affine, G2Affine, Vec<G1Affine>, Vec<G1Affine>, Vec<G1Affine>), Phase2Error>
{
    let mut dec = Decoder::new(&mut phase2, Encoding::Raw);
    let header = Header::read(&mut dec)?;
    let delta1 = dec.decode_g1(Trust::Untrusted)?;
    let delta2 = dec.decode_g2(Trust::Untrusted)?;
    let z = dec.decode_g1_vec(header.domain.saturating_sub(1) as usize, Trust::Untrusted)?;
    let public_l = dec.decode_g1_vec(header.public as usize, Trust::Untrusted)?;
    let witness_l = dec.decode_g1_vec(header.witness as usize, Trust::Untrusted)?;
    Ok((header, delta1, delta2, z, public_l, witness_l))
}

/// Assemble the monolithic proving key (§4.7 layout) and verifying key,
/// writing each to its own sink.
pub fn extract<R1, R2, W1, W2>(
    phase2: R1,
    evals_in: R2,
    pk_out: W1,
    vk_out: W2,
) -> Result<(), Phase2Error>
where
    R1: Read + Seek,
    R2: Read,
    W1: Write,
    W2: Write,
{
    let (header, delta1, delta2, z, public_l, witness_l) = read_finalized_phase2(phase2)?;

    let mut evals_dec = Decoder::new(evals_in, Encoding::Raw);
    let evals = Evals::read(&mut evals_dec, &header)?;

    let (filtered_a, inf_a) = filter_infinity_g1(&evals.a);
    let (filtered_b1, inf_b) = filter_infinity_g1(&evals.b1);
    let filtered_b2 = filter_by_flags_g2(&evals.b2, &inf_b);

    let mut pk_enc = Encoder::new(pk_out, Encoding::Raw);
    pk_enc.encode_u32(header.domain)?;
    pk_enc.encode_g1(&evals.alpha_g1)?;
    pk_enc.encode_g1(&evals.beta_g1)?;
    pk_enc.encode_g1(&delta1)?;
    pk_enc.encode_g1_array(&filtered_a)?;
    pk_enc.encode_g1_array(&filtered_b1)?;
    pk_enc.encode_g1_vec(&z)?;
    pk_enc.encode_g1_vec(&witness_l)?; // PKK: length `witness`
    pk_enc.encode_g2(&evals.beta_g2)?;
    pk_enc.encode_g2(&delta2)?;
    pk_enc.encode_g2_array(&filtered_b2)?;
    pk_enc.encode_u32(header.wires)?;
    pk_enc.encode_u32(inf_a.len as u32)?;
    pk_enc.encode_u32(inf_b.len as u32)?;
    inf_a.write(&mut pk_enc)?;
    inf_b.write(&mut pk_enc)?;
    pk_enc.flush()?;

    let mut vk_enc = Encoder::new(vk_out, Encoding::Raw);
    vk_enc.encode_g1(&evals.alpha_g1)?;
    vk_enc.encode_g1(&evals.beta_g1)?;
    vk_enc.encode_g2(&evals.beta_g2)?;
    vk_enc.encode_g2(&G2Affine::generator())?; // gamma_2, fixed
    vk_enc.encode_g1(&delta1)?;
    vk_enc.encode_g2(&delta2)?;
    vk_enc.encode_g1_array(&public_l)?; // K = VKK

    match &evals.commitment_info {
        None => vk_enc.encode_u8(0)?,
        Some(info) => {
            vk_enc.encode_u8(1)?;
            let ck = CommitmentKey {
                basis: evals.ckk.clone(),
                g: G1Affine::generator(),
            };
            ck.write(&mut vk_enc)?;
            vk_enc.encode_u32(info.commitment_index)?;
        }
    }
    vk_enc.flush()?;

    Ok(())
}

/// Split-mode envelope: domain, scalar points, and section lengths/infinity
/// bit-vectors, with the bulk arrays (A, B1, B2, Z, PKK, commitment key)
/// written to caller-supplied sinks instead of being inlined.
pub struct SplitEnvelope {
    /// `domain = next_pow2(constraints)`.
    pub domain: u32,
    /// `[alpha]_1, [beta]_1, [delta]_1`.
    pub alpha_g1: G1Affine,
    /// `[beta]_1`.
    pub beta_g1: G1Affine,
    /// `[delta]_1`.
    pub delta1: G1Affine,
    /// `[beta]_2, [delta]_2`.
    pub beta_g2: G2Affine,
    /// `[delta]_2`.
    pub delta2: G2Affine,
    /// Total wire count.
    pub wires: u32,
    /// Infinity bit-vector for A.
    pub inf_a: BitVec,
    /// Infinity bit-vector for B.
    pub inf_b: BitVec,
}

impl SplitEnvelope {
    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> Result<(), Phase2Error> {
        enc.encode_u32(self.domain)?;
        enc.encode_g1(&self.alpha_g1)?;
        enc.encode_g1(&self.beta_g1)?;
        enc.encode_g1(&self.delta1)?;
        enc.encode_g2(&self.beta_g2)?;
        enc.encode_g2(&self.delta2)?;
        enc.encode_u32(self.wires)?;
        self.inf_a.write(enc)?;
        self.inf_b.write(enc)?;
        Ok(())
    }
}

/// Split-mode extraction: the envelope plus each bulk array to its own sink.
#[allow(clippy::too_many_arguments)]
pub fn extract_split<R1, R2, WEnv, WA, WB1, WB2, WZ, WPkk>(
    phase2: R1,
    evals_in: R2,
    env_out: WEnv,
    a_out: WA,
    b1_out: WB1,
    b2_out: WB2,
    z_out: WZ,
    pkk_out: WPkk,
) -> Result<(), Phase2Error>
where
    R1: Read + Seek,
    R2: Read,
    WEnv: Write,
    WA: Write,
    WB1: Write,
    WB2: Write,
    WZ: Write,
    WPkk: Write,
{
    let (header, delta1, delta2, z, _public_l, witness_l) = read_finalized_phase2(phase2)?;
    let mut evals_dec = Decoder::new(evals_in, Encoding::Raw);
    let evals = Evals::read(&mut evals_dec, &header)?;

    let (filtered_a, inf_a) = filter_infinity_g1(&evals.a);
    let (filtered_b1, inf_b) = filter_infinity_g1(&evals.b1);
    let filtered_b2 = filter_by_flags_g2(&evals.b2, &inf_b);

    let env = SplitEnvelope {
        domain: header.domain,
        alpha_g1: evals.alpha_g1,
        beta_g1: evals.beta_g1,
        delta1,
        beta_g2: evals.beta_g2,
        delta2,
        wires: header.wires,
        inf_a,
        inf_b,
    };
    let mut env_enc = Encoder::new(env_out, Encoding::Raw);
    env.write(&mut env_enc)?;
    env_enc.flush()?;

    Encoder::new(a_out, Encoding::Raw).encode_g1_array(&filtered_a)?;
    Encoder::new(b1_out, Encoding::Raw).encode_g1_array(&filtered_b1)?;
    Encoder::new(b2_out, Encoding::Raw).encode_g2_array(&filtered_b2)?;
    Encoder::new(z_out, Encoding::Raw).encode_g1_vec(&z)?;
    Encoder::new(pkk_out, Encoding::Raw).encode_g1_vec(&witness_l)?;
    Ok(())
}

/// Byte offset helper mirroring [`Phase2Layout`], exposed for split-mode
/// readers that need to seek directly to the finalized `L` section without
/// replaying the whole file.
pub fn l_section_offset(header: &Header) -> u64 {
    Phase2Layout::new(header.l_len() as u32, header.domain).l_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase1;
    use crate::phase2;
    use crate::r1cs::{Coeff, Constraint, R1cs, Term};
    use std::io::Cursor;

    fn toy_r1cs() -> R1cs {
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
    fn extract_produces_nonempty_pk_and_vk() {
        let r1cs = toy_r1cs();
        let mut phase1_buf = Vec::new();
        phase1::initialize(4, &mut phase1_buf).unwrap();

        let mut phase2_buf = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_buf = Vec::new();
        phase2::initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut phase2_buf,
            &mut lag_out,
            &mut evals_buf,
        )
        .unwrap();

        let mut pk = Vec::new();
        let mut vk = Vec::new();
        extract(
            Cursor::new(&phase2_buf),
            Cursor::new(&evals_buf),
            &mut pk,
            &mut vk,
        )
        .unwrap();

        assert!(!pk.is_empty());
        assert!(!vk.is_empty());
    }

    /// Decodes the phase2 header's raw `u32`/`u16` fields directly, without
    /// going through `phase2::Header::read` (private to that module), so the
    /// test below has an independent source for `wires`/`witness`/`public`/
    /// `domain` to check the extracted pk/vk field order against.
    fn read_phase2_header_fields(phase2_buf: &[u8]) -> (u32, u32, u32, u32, u32, u32, u16) {
        let mut dec = Decoder::new(phase2_buf, Encoding::Raw);
        let wires = dec.decode_u32().unwrap();
        let witness = dec.decode_u32().unwrap();
        let public = dec.decode_u32().unwrap();
        let private_committed = dec.decode_u32().unwrap();
        let constraints = dec.decode_u32().unwrap();
        let domain = dec.decode_u32().unwrap();
        let contributions = dec.decode_u16().unwrap();
        (
            wires,
            witness,
            public,
            private_committed,
            constraints,
            domain,
            contributions,
        )
    }

    #[test]
    fn extract_writes_fields_in_the_documented_order() {
        let r1cs = toy_r1cs();
        let mut phase1_buf = Vec::new();
        phase1::initialize(4, &mut phase1_buf).unwrap();

        let mut phase2_buf = Vec::new();
        let mut lag_out = Vec::new();
        let mut evals_buf = Vec::new();
        phase2::initialize(
            Cursor::new(&phase1_buf),
            &r1cs,
            &mut phase2_buf,
            &mut lag_out,
            &mut evals_buf,
        )
        .unwrap();

        let (wires, witness, public, _private_committed, _constraints, domain, _contributions) =
            read_phase2_header_fields(&phase2_buf);

        let mut pk = Vec::new();
        let mut vk = Vec::new();
        extract(
            Cursor::new(&phase2_buf),
            Cursor::new(&evals_buf),
            &mut pk,
            &mut vk,
        )
        .unwrap();

        // pk: domain, alpha_g1, beta_g1, delta1, A[], B1[], Z (domain-1, no
        // length prefix), PKK (witness, no length prefix), beta_g2, delta2,
        // B2[], wires, #inf_a, #inf_b, inf_a bitvec, inf_b bitvec.
        let mut pk_dec = Decoder::new(&pk[..], Encoding::Raw);

        let pk_domain = pk_dec.decode_u32().unwrap();
        assert_eq!(pk_domain, domain);

        let _alpha_g1 = pk_dec.decode_g1(Trust::SelfWritten).unwrap();
        let _beta_g1 = pk_dec.decode_g1(Trust::SelfWritten).unwrap();
        let _delta1 = pk_dec.decode_g1(Trust::SelfWritten).unwrap();

        let filtered_a = pk_dec.decode_g1_array(Trust::SelfWritten).unwrap();
        let filtered_b1 = pk_dec.decode_g1_array(Trust::SelfWritten).unwrap();

        let z = pk_dec
            .decode_g1_vec(domain as usize - 1, Trust::SelfWritten)
            .unwrap();
        assert_eq!(z.len(), domain as usize - 1);

        let witness_l = pk_dec
            .decode_g1_vec(witness as usize, Trust::SelfWritten)
            .unwrap();
        assert_eq!(witness_l.len(), witness as usize);

        let _beta_g2 = pk_dec.decode_g2(Trust::SelfWritten).unwrap();
        let _delta2 = pk_dec.decode_g2(Trust::SelfWritten).unwrap();

        let filtered_b2 = pk_dec.decode_g2_array(Trust::SelfWritten).unwrap();
        assert_eq!(filtered_b2.len(), filtered_b1.len());

        let pk_wires = pk_dec.decode_u32().unwrap();
        assert_eq!(pk_wires, wires);

        let inf_a_count = pk_dec.decode_u32().unwrap();
        let inf_b_count = pk_dec.decode_u32().unwrap();
        assert_eq!(filtered_a.len() + inf_a_count as usize, wires as usize);
        assert_eq!(filtered_b1.len() + inf_b_count as usize, wires as usize);

        // `BitVec::write` repeats its own length before the packed bytes;
        // it must agree with the explicit count field just read.
        let inf_a_bitvec_len = pk_dec.decode_u32().unwrap();
        assert_eq!(inf_a_bitvec_len, inf_a_count);
        for _ in 0..inf_a_bitvec_len.div_ceil(8) {
            pk_dec.decode_u8().unwrap();
        }
        let inf_b_bitvec_len = pk_dec.decode_u32().unwrap();
        assert_eq!(inf_b_bitvec_len, inf_b_count);
        for _ in 0..inf_b_bitvec_len.div_ceil(8) {
            pk_dec.decode_u8().unwrap();
        }

        // vk: alpha_g1, beta_g1, beta_g2, gamma_g2, delta1, delta2, K[],
        // commitment tag (+ optional commitment key and index).
        let mut vk_dec = Decoder::new(&vk[..], Encoding::Raw);

        let _alpha_g1 = vk_dec.decode_g1(Trust::SelfWritten).unwrap();
        let _beta_g1 = vk_dec.decode_g1(Trust::SelfWritten).unwrap();
        let _beta_g2 = vk_dec.decode_g2(Trust::SelfWritten).unwrap();

        let gamma_g2 = vk_dec.decode_g2(Trust::SelfWritten).unwrap();
        assert_eq!(gamma_g2, G2Affine::generator());

        let _delta1 = vk_dec.decode_g1(Trust::SelfWritten).unwrap();
        let _delta2 = vk_dec.decode_g2(Trust::SelfWritten).unwrap();

        let public_l = vk_dec.decode_g1_array(Trust::SelfWritten).unwrap();
        assert_eq!(public_l.len(), public as usize);

        // `toy_r1cs` has no commitment info, so the tag byte is 0 and no
        // commitment key or index follows.
        let commitment_tag = vk_dec.decode_u8().unwrap();
        assert_eq!(commitment_tag, 0);
    }
}
