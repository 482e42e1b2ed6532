//! In-place inverse radix-2 DIF FFT over G1/G2 Jacobian points: converts a
//! monomial-basis slice `{[tau^i]}` into the Lagrange basis of the same
//! size (§4.4).

use ark_bn254::{Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{FftField, Field};
use rayon::prelude::*;
use std::ops::{Add, Mul, Sub};

/// Below this half-width, butterflies and the recursive split run
/// sequentially; the parallel overhead isn't worth it for small ranges.
const BUTTERFLY_THRESHOLD: usize = 16;

fn twiddle_table(n: usize) -> Vec<Fr> {
    let root = Fr::get_root_of_unity(n as u64)
        .expect("n must be a power of two supported by Fr's two-adicity")
        .inverse()
        .expect("root of unity is never zero");
    let mut table = Vec::with_capacity(n / 2);
    let mut cur = Fr::from(1u64);
    for _ in 0..n / 2 {
        table.push(cur);
        cur *= root;
    }
    table
}

fn max_splits() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (usize::BITS - cores.max(1).leading_zeros()) as usize
}

fn dif_fft<G>(a: &mut [G], twiddles: &[Fr], stride: usize, depth: usize, max_splits: usize)
where
    G: Copy + Send + Sync + Add<Output = G> + Sub<Output = G> + Mul<Fr, Output = G>,
{
    let n = a.len();
    if n <= 1 {
        return;
    }
    let m = n / 2;

    if m > BUTTERFLY_THRESHOLD && depth < max_splits {
        let (left, right) = a.split_at_mut(m);
        left.par_iter_mut()
            .zip(right.par_iter_mut())
            .enumerate()
            .for_each(|(i, (l, r))| {
                let t = *l;
                let u = *r;
                *l = t + u;
                *r = (t - u) * twiddles[i * stride];
            });
    } else {
        for i in 0..m {
            let t = a[i];
            let u = a[i + m];
            a[i] = t + u;
            a[i + m] = (t - u) * twiddles[i * stride];
        }
    }

    let (left, right) = a.split_at_mut(m);
    if depth < max_splits {
        rayon::join(
            || dif_fft(left, twiddles, stride * 2, depth + 1, max_splits),
            || dif_fft(right, twiddles, stride * 2, depth + 1, max_splits),
        );
    } else {
        dif_fft(left, twiddles, stride * 2, depth + 1, max_splits);
        dif_fft(right, twiddles, stride * 2, depth + 1, max_splits);
    }
}

/// Bit-reversal permutation of `a` into a freshly allocated vector. Exposed
/// crate-wide: [`crate::phase2`] reuses it for the Z-section permutation,
/// which isn't otherwise an FFT step.
pub(crate) fn bit_reverse<G: Copy + Send + Sync>(a: &[G]) -> Vec<G> {
    let n = a.len();
    let log2n = n.trailing_zeros();
    (0..n)
        .into_par_iter()
        .map(|i| a[(i.reverse_bits()) >> (usize::BITS - log2n)])
        .collect()
}

/// Inverse DIF FFT of `a` (length must be a power of two), followed by
/// bit-reversal and scaling by `n^{-1}`, over any group with the given
/// arithmetic operations. Used by [`lagrange_g1`]/[`lagrange_g2`].
fn ifft_in_place<G>(a: &mut Vec<G>)
where
    G: Copy + Send + Sync + Add<Output = G> + Sub<Output = G> + Mul<Fr, Output = G>,
{
    let n = a.len();
    assert!(n.is_power_of_two(), "Lagrange transform size must be a power of two");
    if n <= 1 {
        return;
    }
    let twiddles = twiddle_table(n);
    let splits = max_splits();
    dif_fft(a.as_mut_slice(), &twiddles, 1, 0, splits);
    let reversed = bit_reverse(a.as_slice());
    let n_inv = Fr::from(n as u64)
        .inverse()
        .expect("n fits in Fr and is nonzero");
    *a = reversed.into_par_iter().map(|p| p * n_inv).collect();
}

/// Transform `domain` monomial-basis G1 points (`buff[0..domain]`) into the
/// Lagrange basis of size `domain`, in place.
pub fn lagrange_g1(buff: &mut [G1Affine]) {
    let mut jac: Vec<G1Projective> = buff.iter().map(|p| p.into_group()).collect();
    ifft_in_place(&mut jac);
    let affine: Vec<G1Affine> = jac.into_par_iter().map(|p| p.into_affine()).collect();
    buff.copy_from_slice(&affine);
}

/// Transform `domain` monomial-basis G2 points into the Lagrange basis of
/// size `domain`, in place.
pub fn lagrange_g2(buff: &mut [G2Affine]) {
    let mut jac: Vec<G2Projective> = buff.iter().map(|p| p.into_group()).collect();
    ifft_in_place(&mut jac);
    let affine: Vec<G2Affine> = jac.into_par_iter().map(|p| p.into_affine()).collect();
    buff.copy_from_slice(&affine);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;
    use ark_ff::{One, PrimeField};

    /// The scalar-field instance of the same transform (Fr satisfies the
    /// same Add/Sub/Mul<Fr> bounds as the point groups) evaluated at the
    /// domain's roots of unity must reproduce the original monomial
    /// sequence — the definition of "Lagrange coefficients of the power
    /// sequence" (§8, invariant 7).
    #[test]
    fn lagrange_transform_scalar_instance_evaluates_back_to_monomial() {
        let d = 8usize;
        let tau = Fr::from(5u64);
        let mut powers = Vec::with_capacity(d);
        let mut acc = Fr::one();
        for _ in 0..d {
            powers.push(acc);
            acc *= tau;
        }
        let mut coeffs = powers.clone();
        ifft_in_place(&mut coeffs);

        let root = Fr::get_root_of_unity(d as u64).unwrap();
        for (i, expected) in powers.iter().enumerate() {
            let point = root.pow([i as u64]);
            let mut eval = Fr::from(0u64);
            let mut xp = Fr::one();
            for c in &coeffs {
                eval += *c * xp;
                xp *= point;
            }
            assert_eq!(eval, *expected, "mismatch evaluating at root index {i}");
        }
    }

    #[test]
    fn lagrange_g1_preserves_length_and_validity() {
        let d = 8usize;
        let tau = Fr::from(3u64);
        let mut acc = Fr::one();
        let mut buff = Vec::with_capacity(d);
        for _ in 0..d {
            buff.push((G1Affine::generator() * acc).into_affine());
            acc *= tau;
        }
        let before_len = buff.len();
        lagrange_g1(&mut buff);
        assert_eq!(buff.len(), before_len);
        for p in &buff {
            assert!(p.is_on_curve());
        }
    }
}
