//! Pairwise linkage model.
//!
//! [`LinkageModel`] holds the symmetric ℓ×ℓ mutual-information matrix
//! computed from the [`FastCounting`] mirror, and derives from it the
//! incremental linkage set: for any seed locus, a nearest-first greedy
//! ordering of all loci used to grow mixing masks.
//!
//! # Complexity
//!
//! `build` is O(ℓ²·P/64) time and the matrix is Θ(ℓ²) memory, which
//! dominates the engine's footprint for large ℓ. `order_from` is O(ℓ²).
//!
//! # References
//!
//! - Hsu & Yu (2015), "Optimization by Pairwise Linkage Detection,
//!   Incremental Linkage Set, and Restricted/Back Mixing: DSMGA-II"

use crate::fastcounting::FastCounting;

/// Symmetric matrix of pairwise mutual information between loci.
#[derive(Debug, Clone)]
pub struct LinkageModel {
    ell: usize,
    mi: Vec<f64>,
}

impl LinkageModel {
    /// Allocates a zeroed model for `ell` loci.
    pub fn new(ell: usize) -> Self {
        assert!(ell > 0, "model needs at least one locus");
        Self {
            ell,
            mi: vec![0.0; ell * ell],
        }
    }

    /// Number of loci.
    pub fn ell(&self) -> usize {
        self.ell
    }

    /// Mutual information between loci `i` and `j` (zero on the diagonal).
    pub fn mi(&self, i: usize, j: usize) -> f64 {
        self.mi[i * self.ell + j]
    }

    /// Recomputes the whole matrix from the population mirror.
    pub fn build(&mut self, counting: &FastCounting) {
        assert_eq!(counting.ell(), self.ell, "mirror shape mismatch");
        let population = counting.population();
        for i in 0..self.ell {
            self.mi[i * self.ell + i] = 0.0;
            for j in (i + 1)..self.ell {
                let (n00, n01, n10, n11) = counting.count_xy(i, j);
                let value = pairwise_mi(n00, n01, n10, n11, population);
                self.mi[i * self.ell + j] = value;
                self.mi[j * self.ell + i] = value;
            }
        }
    }

    /// Greedy nearest-first chain starting at `seed`.
    ///
    /// The first element is `seed`; each next element is the unseen locus
    /// with the largest mutual information to any already-picked locus,
    /// ties broken by the smaller index. Deterministic given the matrix.
    pub fn order_from(&self, seed: usize) -> Vec<usize> {
        assert!(seed < self.ell, "seed locus out of range");
        let mut order = Vec::with_capacity(self.ell);
        let mut picked = vec![false; self.ell];
        let mut connection = vec![f64::NEG_INFINITY; self.ell];

        order.push(seed);
        picked[seed] = true;
        for j in 0..self.ell {
            if !picked[j] {
                connection[j] = self.mi(seed, j);
            }
        }

        while order.len() < self.ell {
            let mut best = usize::MAX;
            for j in 0..self.ell {
                if !picked[j] && (best == usize::MAX || connection[j] > connection[best]) {
                    best = j;
                }
            }
            order.push(best);
            picked[best] = true;
            for j in 0..self.ell {
                if !picked[j] && self.mi(best, j) > connection[j] {
                    connection[j] = self.mi(best, j);
                }
            }
        }
        order
    }
}

/// Mutual information of one locus pair from its joint counts, in bits.
///
/// Uses the convention `0 · log 0 = 0`; rounding noise is clamped so the
/// result is never negative.
pub(crate) fn pairwise_mi(n00: usize, n01: usize, n10: usize, n11: usize, population: usize) -> f64 {
    let total = population as f64;
    let p0x = (n00 + n01) as f64 / total;
    let p1x = (n10 + n11) as f64 / total;
    let px0 = (n00 + n10) as f64 / total;
    let px1 = (n01 + n11) as f64 / total;

    let mut sum = 0.0;
    for (count, pa, pb) in [
        (n00, p0x, px0),
        (n01, p0x, px1),
        (n10, p1x, px0),
        (n11, p1x, px1),
    ] {
        if count > 0 {
            let pab = count as f64 / total;
            sum += pab * (pab / (pa * pb)).log2();
        }
    }
    sum.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chromosome::Chromosome;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn mirror_of(rows: &[Vec<bool>]) -> FastCounting {
        let ell = rows[0].len();
        let pop: Vec<Chromosome> = rows
            .iter()
            .map(|bits| {
                let mut ch = Chromosome::new(ell);
                for (i, &b) in bits.iter().enumerate() {
                    ch.set(i, b);
                }
                ch
            })
            .collect();
        let mut fc = FastCounting::new(ell, pop.len());
        fc.rebuild(&pop);
        fc
    }

    #[test]
    fn test_mi_of_independent_loci_is_zero() {
        // All four joint patterns equally likely: independence.
        let fc = mirror_of(&[
            vec![false, false],
            vec![false, true],
            vec![true, false],
            vec![true, true],
        ]);
        let mut model = LinkageModel::new(2);
        model.build(&fc);
        assert!(model.mi(0, 1).abs() < 1e-12, "independent loci must score 0");
    }

    #[test]
    fn test_mi_of_identical_loci_is_one_bit() {
        let fc = mirror_of(&[
            vec![false, false],
            vec![false, false],
            vec![true, true],
            vec![true, true],
        ]);
        let mut model = LinkageModel::new(2);
        model.build(&fc);
        assert!(
            (model.mi(0, 1) - 1.0).abs() < 1e-12,
            "perfectly correlated fair loci carry one bit, got {}",
            model.mi(0, 1)
        );
    }

    #[test]
    fn test_matrix_is_symmetric_nonnegative_zero_diagonal() {
        let mut rng = StdRng::seed_from_u64(5);
        let rows: Vec<Vec<bool>> = (0..40)
            .map(|_| (0..9).map(|_| rng.random_bool(0.5)).collect())
            .collect();
        let fc = mirror_of(&rows);
        let mut model = LinkageModel::new(9);
        model.build(&fc);
        for i in 0..9 {
            assert_eq!(model.mi(i, i), 0.0);
            for j in 0..9 {
                assert!(model.mi(i, j) >= 0.0, "negative MI at ({i},{j})");
                assert_eq!(model.mi(i, j), model.mi(j, i), "asymmetry at ({i},{j})");
            }
        }
    }

    #[test]
    fn test_order_starts_at_seed_and_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(77);
        let rows: Vec<Vec<bool>> = (0..30)
            .map(|_| (0..12).map(|_| rng.random_bool(0.5)).collect())
            .collect();
        let fc = mirror_of(&rows);
        let mut model = LinkageModel::new(12);
        model.build(&fc);

        for seed in 0..12 {
            let order = model.order_from(seed);
            assert_eq!(order[0], seed);
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..12).collect::<Vec<_>>(), "not a permutation");
        }
    }

    #[test]
    fn test_order_follows_strong_linkage_first() {
        // Loci 0 and 1 always agree; locus 2 is independent noise.
        let mut rows = Vec::new();
        for i in 0..32 {
            let a = i % 2 == 0;
            rows.push(vec![a, a, (i / 2) % 2 == 0]);
        }
        let fc = mirror_of(&rows);
        let mut model = LinkageModel::new(3);
        model.build(&fc);
        let order = model.order_from(0);
        assert_eq!(order, vec![0, 1, 2], "linked locus must be picked before noise");
    }

    #[test]
    fn test_order_ties_break_to_smaller_index() {
        // Uniform population: every pairwise MI is identical (zero).
        let rows: Vec<Vec<bool>> = (0..16).map(|_| vec![false; 5]).collect();
        let fc = mirror_of(&rows);
        let mut model = LinkageModel::new(5);
        model.build(&fc);
        assert_eq!(model.order_from(2), vec![2, 0, 1, 3, 4]);
    }

    #[test]
    fn test_pairwise_mi_handles_empty_cells() {
        // Degenerate column: locus j always zero.
        assert_eq!(pairwise_mi(10, 0, 10, 0, 20), 0.0);
        // All mass in one cell.
        assert_eq!(pairwise_mi(20, 0, 0, 0, 20), 0.0);
    }
}
