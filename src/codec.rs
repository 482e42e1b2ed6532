//! Deterministic binary serialization for curve points and integers, plus
//! byte-offset bookkeeping for the Phase 1 / Phase 2 file layouts.
//!
//! Two point encodings are in play, selected per file rather than per call:
//! **compressed** (Phase 1: G1 = 32 bytes, G2 = 64 bytes) and **raw**
//! (Phase 2, `evals`, key files: G1 = 64 bytes, G2 = 128 bytes). Arkworks'
//! `CanonicalSerialize`/`CanonicalDeserialize` compressed/uncompressed modes
//! produce exactly these byte widths for BN254, so the codec is a thin,
//! validating wrapper rather than a hand-rolled point format.

use crate::error::CodecError;
use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, Compress, Validate};
use std::io::{Read, Write};

/// Byte width of a compressed G1 point (BN254).
pub const G1_COMPRESSED: usize = 32;
/// Byte width of a compressed G2 point (BN254).
pub const G2_COMPRESSED: usize = 64;
/// Byte width of a raw (uncompressed) G1 point (BN254).
pub const G1_RAW: usize = 64;
/// Byte width of a raw (uncompressed) G2 point (BN254).
pub const G2_RAW: usize = 128;

/// Selects compressed vs. raw point encoding for a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Phase 1 files: G1 = 32B, G2 = 64B.
    Compressed,
    /// Phase 2 files, `evals`, key files: G1 = 64B, G2 = 128B.
    Raw,
}

impl Encoding {
    /// Byte width of a G1 point under this encoding.
    pub const fn g1_size(self) -> usize {
        match self {
            Encoding::Compressed => G1_COMPRESSED,
            Encoding::Raw => G1_RAW,
        }
    }

    /// Byte width of a G2 point under this encoding.
    pub const fn g2_size(self) -> usize {
        match self {
            Encoding::Compressed => G2_COMPRESSED,
            Encoding::Raw => G2_RAW,
        }
    }

    fn compress(self) -> Compress {
        match self {
            Encoding::Compressed => Compress::Yes,
            Encoding::Raw => Compress::No,
        }
    }
}

/// Whether a decode should validate subgroup/curve membership.
///
/// Untrusted input (anything read from a file supplied by another
/// participant) must always use [`Trust::Untrusted`]. [`Trust::SelfWritten`]
/// is only for re-reading data this same process just encoded, e.g. when a
/// streaming pass needs a second look at its own output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trust {
    /// Validate curve equation and subgroup membership (default for reads).
    Untrusted,
    /// Skip validation; only safe for data this process wrote itself.
    SelfWritten,
}

impl Trust {
    fn validate(self) -> Validate {
        match self {
            Trust::Untrusted => Validate::Yes,
            Trust::SelfWritten => Validate::No,
        }
    }
}

/// Reads points and integers from an underlying byte stream in a fixed
/// [`Encoding`].
pub struct Decoder<R> {
    inner: R,
    encoding: Encoding,
}

impl<R: Read> Decoder<R> {
    /// Wrap a reader with the given point encoding.
    pub fn new(inner: R, encoding: Encoding) -> Self {
        Self { inner, encoding }
    }

    /// Encoding this decoder was constructed with.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn read_exact_checked(&mut self, n: usize) -> Result<Vec<u8>, CodecError> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CodecError::Truncated {
                    expected: n,
                    got: 0,
                }
            } else {
                CodecError::Io(e)
            }
        })?;
        Ok(buf)
    }

    /// Decode one G1 point in this decoder's encoding.
    pub fn decode_g1(&mut self, trust: Trust) -> Result<G1Affine, CodecError> {
        let buf = self.read_exact_checked(self.encoding.g1_size())?;
        G1Affine::deserialize_with_mode(&buf[..], self.encoding.compress(), trust.validate())
            .map_err(|_| CodecError::PointNotOnCurve)
    }

    /// Decode one G2 point in this decoder's encoding.
    pub fn decode_g2(&mut self, trust: Trust) -> Result<G2Affine, CodecError> {
        let buf = self.read_exact_checked(self.encoding.g2_size())?;
        G2Affine::deserialize_with_mode(&buf[..], self.encoding.compress(), trust.validate())
            .map_err(|_| CodecError::PointNotOnCurve)
    }

    /// Decode `n` consecutive G1 points.
    pub fn decode_g1_vec(&mut self, n: usize, trust: Trust) -> Result<Vec<G1Affine>, CodecError> {
        (0..n).map(|_| self.decode_g1(trust)).collect()
    }

    /// Decode `n` consecutive G2 points.
    pub fn decode_g2_vec(&mut self, n: usize, trust: Trust) -> Result<Vec<G2Affine>, CodecError> {
        (0..n).map(|_| self.decode_g2(trust)).collect()
    }

    /// Decode a big-endian `u8`.
    pub fn decode_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_exact_checked(1)?[0])
    }

    /// Decode a big-endian `u16`.
    pub fn decode_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.read_exact_checked(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Decode a big-endian `u32`.
    pub fn decode_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.read_exact_checked(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Decode a `[u8; 32]` hash value.
    pub fn decode_hash(&mut self) -> Result<[u8; 32], CodecError> {
        let b = self.read_exact_checked(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&b);
        Ok(out)
    }

    /// Decode a u32-length-prefixed array of G1 points.
    pub fn decode_g1_array(&mut self, trust: Trust) -> Result<Vec<G1Affine>, CodecError> {
        let n = self.decode_u32()? as usize;
        self.decode_g1_vec(n, trust)
    }

    /// Decode a u32-length-prefixed array of G2 points.
    pub fn decode_g2_array(&mut self, trust: Trust) -> Result<Vec<G2Affine>, CodecError> {
        let n = self.decode_u32()? as usize;
        self.decode_g2_vec(n, trust)
    }

    /// Decode an Fr scalar from its canonical 32-byte little-endian form
    /// (used only for side-channel metadata, never for SRS points).
    pub fn decode_fr(&mut self) -> Result<Fr, CodecError> {
        let b = self.read_exact_checked(32)?;
        Fr::deserialize_compressed(&b[..]).map_err(|_| CodecError::PointNotOnCurve)
    }
}

/// Writes points and integers to an underlying byte stream in a fixed
/// [`Encoding`].
pub struct Encoder<W> {
    inner: W,
    encoding: Encoding,
}

impl<W: Write> Encoder<W> {
    /// Wrap a writer with the given point encoding.
    pub fn new(inner: W, encoding: Encoding) -> Self {
        Self { inner, encoding }
    }

    /// Encoding this encoder was constructed with.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Encode one G1 point.
    pub fn encode_g1(&mut self, p: &G1Affine) -> Result<(), CodecError> {
        let mut buf = Vec::with_capacity(self.encoding.g1_size());
        p.serialize_with_mode(&mut buf, self.encoding.compress())
            .map_err(|_| CodecError::PointNotOnCurve)?;
        self.inner.write_all(&buf)?;
        Ok(())
    }

    /// Encode one G2 point.
    pub fn encode_g2(&mut self, p: &G2Affine) -> Result<(), CodecError> {
        let mut buf = Vec::with_capacity(self.encoding.g2_size());
        p.serialize_with_mode(&mut buf, self.encoding.compress())
            .map_err(|_| CodecError::PointNotOnCurve)?;
        self.inner.write_all(&buf)?;
        Ok(())
    }

    /// Encode a slice of G1 points, in order.
    pub fn encode_g1_vec(&mut self, pts: &[G1Affine]) -> Result<(), CodecError> {
        for p in pts {
            self.encode_g1(p)?;
        }
        Ok(())
    }

    /// Encode a slice of G2 points, in order.
    pub fn encode_g2_vec(&mut self, pts: &[G2Affine]) -> Result<(), CodecError> {
        for p in pts {
            self.encode_g2(p)?;
        }
        Ok(())
    }

    /// Encode a big-endian `u8`.
    pub fn encode_u8(&mut self, v: u8) -> Result<(), CodecError> {
        self.inner.write_all(&[v])?;
        Ok(())
    }

    /// Encode a big-endian `u16`.
    pub fn encode_u16(&mut self, v: u16) -> Result<(), CodecError> {
        self.inner.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    /// Encode a big-endian `u32`.
    pub fn encode_u32(&mut self, v: u32) -> Result<(), CodecError> {
        self.inner.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    /// Encode a 32-byte hash value.
    pub fn encode_hash(&mut self, h: &[u8; 32]) -> Result<(), CodecError> {
        self.inner.write_all(h)?;
        Ok(())
    }

    /// Encode a u32-length-prefixed array of G1 points.
    pub fn encode_g1_array(&mut self, pts: &[G1Affine]) -> Result<(), CodecError> {
        self.encode_u32(pts.len() as u32)?;
        self.encode_g1_vec(pts)
    }

    /// Encode a u32-length-prefixed array of G2 points.
    pub fn encode_g2_array(&mut self, pts: &[G2Affine]) -> Result<(), CodecError> {
        self.encode_u32(pts.len() as u32)?;
        self.encode_g2_vec(pts)
    }

    /// Encode an Fr scalar in its canonical 32-byte little-endian form (the
    /// counterpart to [`Decoder::decode_fr`]; never used for SRS points).
    pub fn encode_fr(&mut self, f: &Fr) -> Result<(), CodecError> {
        let mut buf = Vec::with_capacity(32);
        f.serialize_compressed(&mut buf)
            .map_err(|_| CodecError::PointNotOnCurve)?;
        self.inner.write_all(&buf)?;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Byte layout of a Phase 1 file for a given `power`, derived from the
/// section lengths declared in the data model (never a copied literal, per
/// the file-offset discipline).
#[derive(Clone, Copy, Debug)]
pub struct Phase1Layout {
    /// `2^power`.
    pub n: u64,
    header_size: u64,
    tau_g1_len: u64,
    alpha_tau_g1_len: u64,
    beta_tau_g1_len: u64,
    tau_g2_len: u64,
}

/// One Phase 1 contribution record's encoded size: 3 G1 + 2 G2 + 3*(2 G1 + 1
/// G2), plus a 32-byte hash, all in compressed encoding.
pub const PHASE1_CONTRIBUTION_SIZE: u64 = 640;

impl Phase1Layout {
    /// Header is `power: u8` + `contributions: u16` = 3 bytes.
    pub const HEADER_SIZE: u64 = 3;

    /// Derive the layout for a given power.
    pub fn new(power: u8) -> Self {
        let n = 1u64 << power;
        Self {
            n,
            header_size: Self::HEADER_SIZE,
            tau_g1_len: 2 * n - 1,
            alpha_tau_g1_len: n,
            beta_tau_g1_len: n,
            tau_g2_len: n,
        }
    }

    fn section_bytes(&self) -> u64 {
        self.tau_g1_len * G1_COMPRESSED as u64
            + self.alpha_tau_g1_len * G1_COMPRESSED as u64
            + self.beta_tau_g1_len * G1_COMPRESSED as u64
            + self.tau_g2_len * G2_COMPRESSED as u64
            + G2_COMPRESSED as u64 // BetaG2
    }

    /// Absolute offset of the TauG1 section.
    pub fn tau_g1_offset(&self) -> u64 {
        self.header_size
    }

    /// Absolute offset of the AlphaTauG1 section.
    pub fn alpha_tau_g1_offset(&self) -> u64 {
        self.tau_g1_offset() + self.tau_g1_len * G1_COMPRESSED as u64
    }

    /// Absolute offset of the BetaTauG1 section.
    pub fn beta_tau_g1_offset(&self) -> u64 {
        self.alpha_tau_g1_offset() + self.alpha_tau_g1_len * G1_COMPRESSED as u64
    }

    /// Absolute offset of the TauG2 section.
    pub fn tau_g2_offset(&self) -> u64 {
        self.beta_tau_g1_offset() + self.beta_tau_g1_len * G1_COMPRESSED as u64
    }

    /// Absolute offset of the BetaG2 section.
    pub fn beta_g2_offset(&self) -> u64 {
        self.tau_g2_offset() + self.tau_g2_len * G2_COMPRESSED as u64
    }

    /// Absolute offset of the first contribution record (index 0).
    pub fn contributions_offset(&self) -> u64 {
        self.header_size + self.section_bytes()
    }

    /// Absolute offset of the `contributions`-th contribution record (the
    /// most recently appended one, when `contributions` is the header's
    /// current count).
    pub fn last_contribution_offset(&self, contributions: u16) -> u64 {
        self.contributions_offset() + (contributions as u64 - 1) * PHASE1_CONTRIBUTION_SIZE
    }

    /// Total file size once `contributions` records have been appended.
    pub fn total_size(&self, contributions: u16) -> u64 {
        self.contributions_offset() + contributions as u64 * PHASE1_CONTRIBUTION_SIZE
    }
}

/// Byte layout of a Phase 2 file, derived from its header fields.
///
/// `l_len` is the length of the `L` section actually stored in the phase2
/// file: `public + witness` (the committed-private entries live only in the
/// `evals` side-file, never here) — not the header's raw `wires` count.
#[derive(Clone, Copy, Debug)]
pub struct Phase2Layout {
    /// Length of the stored `L` section (`public + witness`).
    pub l_len: u32,
    /// `domain = next_pow2(constraints)`.
    pub domain: u32,
}

/// Header size: six `u32` fields (wires, witness, public, privateCommitted,
/// constraints, domain) plus one `u16` (contributions).
pub const PHASE2_HEADER_SIZE: u64 = 6 * 4 + 2;

/// One Phase 2 contribution record: 1 G1 (delta) + public key (2 G1 + 1 G2)
/// + 32-byte hash, all in raw encoding.
pub const PHASE2_CONTRIBUTION_SIZE: u64 =
    (1 + 2) as u64 * G1_RAW as u64 + G2_RAW as u64 + 32;

impl Phase2Layout {
    /// Derive the layout from the stored `L` section length and `domain`.
    pub fn new(l_len: u32, domain: u32) -> Self {
        Self { l_len, domain }
    }

    /// Absolute offset of `[delta]_1`.
    pub fn delta_g1_offset(&self) -> u64 {
        PHASE2_HEADER_SIZE
    }

    /// Absolute offset of `[delta]_2`.
    pub fn delta_g2_offset(&self) -> u64 {
        self.delta_g1_offset() + G1_RAW as u64
    }

    /// Absolute offset of the Z section (length `domain - 1`).
    pub fn z_offset(&self) -> u64 {
        self.delta_g2_offset() + G2_RAW as u64
    }

    /// Absolute offset of the L section (length `l_len`).
    pub fn l_offset(&self) -> u64 {
        self.z_offset() + (self.domain as u64 - 1) * G1_RAW as u64
    }

    /// Absolute offset of the contribution records.
    pub fn contributions_offset(&self) -> u64 {
        self.l_offset() + self.l_len as u64 * G1_RAW as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use std::io::Cursor;

    #[test]
    fn roundtrip_g1_compressed() {
        let p = G1Affine::generator();
        let mut buf = Vec::new();
        Encoder::new(&mut buf, Encoding::Compressed)
            .encode_g1(&p)
            .unwrap();
        assert_eq!(buf.len(), G1_COMPRESSED);
        let got = Decoder::new(Cursor::new(&buf), Encoding::Compressed)
            .decode_g1(Trust::Untrusted)
            .unwrap();
        assert_eq!(got, p);
    }

    #[test]
    fn roundtrip_g2_raw() {
        let p = G2Affine::generator();
        let mut buf = Vec::new();
        Encoder::new(&mut buf, Encoding::Raw).encode_g2(&p).unwrap();
        assert_eq!(buf.len(), G2_RAW);
        let got = Decoder::new(Cursor::new(&buf), Encoding::Raw)
            .decode_g2(Trust::Untrusted)
            .unwrap();
        assert_eq!(got, p);
    }

    #[test]
    fn truncated_read_is_reported() {
        let buf = vec![0u8; G1_COMPRESSED - 1];
        let err = Decoder::new(Cursor::new(&buf), Encoding::Compressed)
            .decode_g1(Trust::Untrusted)
            .unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn phase1_layout_matches_s1_scenario() {
        let layout = Phase1Layout::new(4);
        assert_eq!(layout.total_size(0), 3107);
    }

    #[test]
    fn phase1_layout_base_offset_is_internally_consistent() {
        // 35 + 192*N, matching both the declared section sizes and the
        // upstream literal for the same quantity (see SPEC_FULL.md DESIGN NOTES).
        let layout = Phase1Layout::new(10);
        let n = 1u64 << 10;
        assert_eq!(layout.contributions_offset(), 35 + 192 * n);
    }
}
