//! Column-major mirror of the population bits.
//!
//! [`FastCounting`] duplicates the population in transposed, bit-packed
//! form: one packed row of ⌈P/64⌉ words per locus, where column `j` of row
//! `i` holds bit `i` of chromosome `j`. Pairwise joint counts over the
//! whole population then cost O(P/64) word operations instead of O(P).
//!
//! The mirror is the authoritative source for linkage statistics. Keeping
//! it in sync with the population after every accepted bit flip during
//! mixing is a hard invariant of the engine.

use crate::chromosome::Chromosome;

const WORD_BITS: usize = 64;

/// Transposed population bits: `ell` rows of ⌈`population`/64⌉ words.
#[derive(Debug, Clone)]
pub struct FastCounting {
    words: Vec<u64>,
    words_per_locus: usize,
    ell: usize,
    population: usize,
}

impl FastCounting {
    /// Allocates a zeroed mirror for `ell` loci over `population`
    /// chromosomes.
    ///
    /// # Panics
    /// Panics if either dimension is zero.
    pub fn new(ell: usize, population: usize) -> Self {
        assert!(ell > 0 && population > 0, "dimensions must be positive");
        let words_per_locus = population.div_ceil(WORD_BITS);
        Self {
            words: vec![0u64; ell * words_per_locus],
            words_per_locus,
            ell,
            population,
        }
    }

    /// Number of loci.
    pub fn ell(&self) -> usize {
        self.ell
    }

    /// Number of mirrored chromosomes.
    pub fn population(&self) -> usize {
        self.population
    }

    /// Rewrites the whole mirror from the population.
    ///
    /// # Panics
    /// Panics if the population shape does not match the mirror.
    pub fn rebuild(&mut self, population: &[Chromosome]) {
        assert_eq!(population.len(), self.population, "population size mismatch");
        self.words.fill(0);
        for (j, ch) in population.iter().enumerate() {
            assert_eq!(ch.len(), self.ell, "chromosome length mismatch");
            for i in 0..self.ell {
                if ch.get(i) {
                    self.words[i * self.words_per_locus + j / WORD_BITS] |=
                        1u64 << (j % WORD_BITS);
                }
            }
        }
    }

    /// Writes one bit of the mirror: locus `locus` of chromosome `index`.
    pub fn set(&mut self, locus: usize, index: usize, bit: bool) {
        assert!(locus < self.ell && index < self.population, "out of range");
        let word = &mut self.words[locus * self.words_per_locus + index / WORD_BITS];
        if bit {
            *word |= 1u64 << (index % WORD_BITS);
        } else {
            *word &= !(1u64 << (index % WORD_BITS));
        }
    }

    fn row(&self, locus: usize) -> &[u64] {
        let start = locus * self.words_per_locus;
        &self.words[start..start + self.words_per_locus]
    }

    /// Number of chromosomes with a one at `locus`, in O(P/64).
    pub fn count_one(&self, locus: usize) -> usize {
        self.row(locus).iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Joint counts (n00, n01, n10, n11) of loci `i` and `j` over the
    /// population, where `n_ab` counts chromosomes with bit `a` at `i` and
    /// bit `b` at `j`.
    ///
    /// n00 is derived by subtraction so the padding columns beyond the
    /// population never need masking.
    pub fn count_xy(&self, i: usize, j: usize) -> (usize, usize, usize, usize) {
        let (a, b) = (self.row(i), self.row(j));
        let mut n11 = 0usize;
        let mut n10 = 0usize;
        let mut n01 = 0usize;
        for (wa, wb) in a.iter().zip(b.iter()) {
            n11 += (wa & wb).count_ones() as usize;
            n10 += (wa & !wb).count_ones() as usize;
            n01 += (!wa & wb).count_ones() as usize;
        }
        let n00 = self.population - n11 - n10 - n01;
        (n00, n01, n10, n11)
    }
}
