//! Streaming batched scalar multiplication: scale a section of `N` points
//! by the power sequence of an accumulator, optionally folding in a final
//! multiplicand, without materializing the whole section in RAM.

use crate::codec::{Decoder, Encoder, Trust};
use crate::error::CodecError;
use ark_bn254::{Fr, G1Affine, G2Affine};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::One;
use rayon::prelude::*;
use std::io::{Read, Write};

/// Batch size for streaming point scaling: 2^20 elements (§4.3).
pub const BATCH_SIZE: usize = 1 << 20;

/// Which index in the first batch is the "canonical first point" recorded
/// into a Contribution: index 1 for a plain tau scaling (mult = 1), index 0
/// when `mult` is alpha or beta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirstPointRule {
    /// `mult` is the implicit `1`; canonical point is the section's index 1.
    TauOnly,
    /// `mult` is alpha or beta; canonical point is the section's index 0.
    WithMultiplicand,
}

fn power_sequence(start: Fr, ratio: Fr, n: usize) -> Vec<Fr> {
    let mut out = Vec::with_capacity(n);
    let mut acc = start;
    for _ in 0..n {
        out.push(acc);
        acc *= ratio;
    }
    out
}

/// Stream `n` G1 points from `dec` to `enc`, scaling the `i`-th point (0
/// indexed, across the whole section, not just the current batch) by
/// `acc_start * tau^i * mult`. Returns `(next_acc, first_point)` where
/// `next_acc` is `acc_start * tau^n` for chaining across sections and
/// `first_point` is the canonical first point selected by `rule`.
pub fn batch_scale_g1<R: Read, W: Write>(
    dec: &mut Decoder<R>,
    enc: &mut Encoder<W>,
    n: usize,
    acc_start: Fr,
    tau: Fr,
    mult: Fr,
    rule: FirstPointRule,
) -> Result<(Fr, G1Affine), CodecError> {
    let mut acc = acc_start;
    let mut first_point = None;
    let mut remaining = n;

    while remaining > 0 {
        let take = remaining.min(BATCH_SIZE);
        let points = dec.decode_g1_vec(take, Trust::Untrusted)?;
        let scalars = power_sequence(acc, tau, take);
        let scaled: Vec<Fr> = scalars.par_iter().map(|s| *s * mult).collect();
        let out: Vec<G1Affine> = points
            .par_iter()
            .zip(scaled.par_iter())
            .map(|(p, s)| (*p * s).into_affine())
            .collect();

        if first_point.is_none() {
            let local_idx = match rule {
                FirstPointRule::TauOnly => 1usize,
                FirstPointRule::WithMultiplicand => 0usize,
            };
            if local_idx < out.len() {
                first_point = Some(out[local_idx]);
            }
        }

        enc.encode_g1_vec(&out)?;
        acc = *scalars.last().expect("take > 0") * tau;
        remaining -= take;
    }
    Ok((
        acc,
        first_point.unwrap_or_else(|| G1Affine::generator()),
    ))
}

/// Same as [`batch_scale_g1`] but over G2 points.
pub fn batch_scale_g2<R: Read, W: Write>(
    dec: &mut Decoder<R>,
    enc: &mut Encoder<W>,
    n: usize,
    acc_start: Fr,
    tau: Fr,
    mult: Fr,
    rule: FirstPointRule,
) -> Result<(Fr, G2Affine), CodecError> {
    let mut acc = acc_start;
    let mut first_point = None;
    let mut remaining = n;

    while remaining > 0 {
        let take = remaining.min(BATCH_SIZE);
        let points = dec.decode_g2_vec(take, Trust::Untrusted)?;
        let scalars = power_sequence(acc, tau, take);
        let scaled: Vec<Fr> = scalars.par_iter().map(|s| *s * mult).collect();
        let out: Vec<G2Affine> = points
            .par_iter()
            .zip(scaled.par_iter())
            .map(|(p, s)| (*p * s).into_affine())
            .collect();

        if first_point.is_none() {
            let local_idx = match rule {
                FirstPointRule::TauOnly => 1usize,
                FirstPointRule::WithMultiplicand => 0usize,
            };
            if local_idx < out.len() {
                first_point = Some(out[local_idx]);
            }
        }

        enc.encode_g2_vec(&out)?;
        acc = *scalars.last().expect("take > 0") * tau;
        remaining -= take;
    }
    Ok((
        acc,
        first_point.unwrap_or_else(|| G2Affine::generator()),
    ))
}

/// Convenience wrapper for `mult = 1` (plain tau scaling).
pub fn one() -> Fr {
    Fr::one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoding;
    use std::io::Cursor;

    #[test]
    fn batch_scale_g1_matches_manual_powers() {
        let g1 = G1Affine::generator();
        let n = 5usize;
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf, Encoding::Compressed);
            for _ in 0..n {
                enc.encode_g1(&g1).unwrap();
            }
        }
        let tau = Fr::from(3u64);
        let mut out = Vec::new();
        {
            let mut dec = Decoder::new(Cursor::new(&buf), Encoding::Compressed);
            let mut enc = Encoder::new(&mut out, Encoding::Compressed);
            let (_, first) = batch_scale_g1(
                &mut dec,
                &mut enc,
                n,
                Fr::one(),
                tau,
                Fr::one(),
                FirstPointRule::TauOnly,
            )
            .unwrap();
            assert_eq!(first, (g1 * tau).into_affine());
        }
        let mut dec_out = Decoder::new(Cursor::new(&out), Encoding::Compressed);
        let decoded = dec_out.decode_g1_vec(n, Trust::SelfWritten).unwrap();
        let mut acc = Fr::one();
        for p in decoded {
            assert_eq!(p, (g1 * acc).into_affine());
            acc *= tau;
        }
    }

    #[test]
    fn with_multiplicand_rule_selects_index_zero() {
        let g1 = G1Affine::generator();
        let n = 3usize;
        let mut buf = Vec::new();
        {
            let mut enc = Encoder::new(&mut buf, Encoding::Compressed);
            for _ in 0..n {
                enc.encode_g1(&g1).unwrap();
            }
        }
        let tau = Fr::from(5u64);
        let alpha = Fr::from(9u64);
        let mut out = Vec::new();
        let mut dec = Decoder::new(Cursor::new(&buf), Encoding::Compressed);
        let mut enc = Encoder::new(&mut out, Encoding::Compressed);
        let (_, first) = batch_scale_g1(
            &mut dec,
            &mut enc,
            n,
            Fr::one(),
            tau,
            alpha,
            FirstPointRule::WithMultiplicand,
        )
        .unwrap();
        assert_eq!(first, (g1 * alpha).into_affine());
    }
}
