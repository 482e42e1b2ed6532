//! Pairing-based consistency checks: `same_ratio` and the randomized
//! batched powers-consistency check used by Phase 1/Phase 2 `Verify`.

use ark_bn254::{Bn254, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup, VariableBaseMSM};
use ark_ff::{One, UniformRand, Zero};
use rand::rngs::OsRng;

/// `same_ratio(a1, b1, a2, b2) := e(a1, a2) == e(b1, b2)`, computed as a
/// single two-pair pairing product with `a2` negated so the two Miller
/// loops fuse into one final exponentiation. Must never be decomposed into
/// two separate pairing calls (see SPEC_FULL.md §9, "Pairing check fusion").
pub fn same_ratio(a1: &G1Affine, b1: &G1Affine, a2: &G2Affine, b2: &G2Affine) -> bool {
    let neg_a2 = -*a2;
    let pairing_product = Bn254::multi_pairing([*a1, *b1], [neg_a2, *b2]);
    pairing_product.0.is_one()
}

/// Draw `n` independent uniformly random scalars for a randomized batched
/// check. Fresh per call; never reused across invocations (§5, Ordering
/// guarantees).
pub fn random_scalars(n: usize) -> Vec<Fr> {
    let mut rng = OsRng;
    (0..n).map(|_| Fr::rand(&mut rng)).collect()
}

/// Multi-scalar multiplication over G1 affine points, returned in affine
/// form. `points` and `scalars` must have equal length.
pub fn msm_g1(points: &[G1Affine], scalars: &[Fr]) -> G1Affine {
    if points.is_empty() {
        return G1Affine::zero();
    }
    G1Projective::msm(points, scalars)
        .expect("msm_g1: mismatched point/scalar lengths")
        .into_affine()
}

/// The randomized "powers consistency" check of §4.5.3: for a G1 section
/// `s` of length `n`, draw `r` of length `n-1`, compute
/// `L1 = MSM(s[0..n-1], r)`, `L2 = MSM(s[1..n], r)`, and require
/// `same_ratio(L1, L2, tau_g2, g2)`. Returns the `(L1, L2)` pair so callers
/// can fuse multiple checks sharing the same right-hand side.
pub fn powers_consistency_g1(section: &[G1Affine]) -> (G1Affine, G1Affine) {
    assert!(section.len() >= 2, "powers_consistency_g1: section too short");
    let r = random_scalars(section.len() - 1);
    let l1 = msm_g1(&section[..section.len() - 1], &r);
    let l2 = msm_g1(&section[1..], &r);
    (l1, l2)
}

/// Multi-scalar multiplication over G2 affine points, returned in affine
/// form.
pub fn msm_g2(points: &[G2Affine], scalars: &[Fr]) -> G2Affine {
    if points.is_empty() {
        return G2Affine::zero();
    }
    G2Projective::msm(points, scalars)
        .expect("msm_g2: mismatched point/scalar lengths")
        .into_affine()
}

/// Analogous randomized powers-consistency check over a G2 section (used
/// for TauG2 against TauG1 in §4.5.3).
pub fn powers_consistency_g2(section: &[G2Affine]) -> (G2Affine, G2Affine) {
    assert!(section.len() >= 2, "powers_consistency_g2: section too short");
    let r = random_scalars(section.len() - 1);
    let l1 = msm_g2(&section[..section.len() - 1], &r);
    let l2 = msm_g2(&section[1..], &r);
    (l1, l2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::PrimeField;

    #[test]
    fn same_ratio_reflexive() {
        let g1 = G1Affine::generator();
        let g2 = G2Affine::generator();
        assert!(same_ratio(&g1, &g1, &g2, &g2));
    }

    #[test]
    fn same_ratio_detects_mismatch() {
        let g1 = G1Affine::generator();
        let g2 = G2Affine::generator();
        let two_g1 = (g1 + g1).into_affine();
        assert!(!same_ratio(&g1, &two_g1, &g2, &g2));
    }

    #[test]
    fn same_ratio_scaled_pair() {
        let g1 = G1Affine::generator();
        let g2 = G2Affine::generator();
        let x = Fr::from(7u64);
        let a2 = (g2 * x).into_affine();
        let b1 = (g1 * x).into_affine();
        assert!(same_ratio(&g1, &b1, &a2, &g2));
    }

    #[test]
    fn powers_consistency_detects_corrupted_power() {
        let g1 = G1Affine::generator();
        let tau = Fr::from(3u64);
        let mut acc = Fr::one();
        let mut section = Vec::new();
        for _ in 0..8 {
            section.push((g1 * acc).into_affine());
            acc *= tau;
        }
        let g2 = G2Affine::generator();
        let tau_g2 = (g2 * tau).into_affine();
        let (l1, l2) = powers_consistency_g1(&section);
        assert!(same_ratio(&l1, &l2, &tau_g2, &g2));

        section[5] = (g1 * Fr::from(999u64)).into_affine();
        let (l1, l2) = powers_consistency_g1(&section);
        assert!(!same_ratio(&l1, &l2, &tau_g2, &g2));
    }
}
