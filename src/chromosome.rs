//! Bit-packed chromosome representation.
//!
//! A [`Chromosome`] is a fixed-length binary string packed into 64-bit
//! words, together with a cached fitness value and an `evaluated` flag.
//! Any mutation of the gene string invalidates the cache; Hamming distance
//! and one-counts are computed word-wise.
//!
//! The cache invariant: whenever `is_evaluated()` returns `true`, the
//! stored fitness equals a fresh evaluation of the current bits.

use crate::error::{Dsmga2Error, Result};
use crate::fitness::Evaluator;
use rand::Rng;
use std::fmt;

const WORD_BITS: usize = 64;

/// One candidate solution: a packed binary string of fixed length.
///
/// Equality is bit-equality; the cached fitness is not part of identity.
/// Bits at positions `>= len()` inside the last word are always zero.
#[derive(Debug, Clone)]
pub struct Chromosome {
    genes: Vec<u64>,
    length: usize,
    fitness: f64,
    evaluated: bool,
}

impl Chromosome {
    /// Creates an all-zero chromosome of the given length.
    ///
    /// # Panics
    /// Panics if `length == 0`.
    pub fn new(length: usize) -> Self {
        assert!(length > 0, "chromosome length must be positive");
        Self {
            genes: vec![0u64; length.div_ceil(WORD_BITS)],
            length,
            fitness: f64::NEG_INFINITY,
            evaluated: false,
        }
    }

    /// Creates a chromosome with uniformly random bits.
    pub fn random<R: Rng>(length: usize, rng: &mut R) -> Self {
        let mut ch = Self::new(length);
        for i in 0..length {
            if rng.random_bool(0.5) {
                ch.set_unchecked(i, true);
            }
        }
        ch.evaluated = false;
        ch
    }

    /// Number of loci.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Always `false`: chromosomes have at least one locus.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the bit at locus `index`.
    ///
    /// # Panics
    /// Panics if `index >= len()`.
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.length, "locus {index} out of range");
        self.genes[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Sets the bit at locus `index`, invalidating the fitness cache if
    /// the bit actually changes.
    pub fn set(&mut self, index: usize, bit: bool) {
        if self.get(index) == bit {
            return;
        }
        self.set_unchecked(index, bit);
        self.evaluated = false;
    }

    /// Flips the bit at locus `index` and invalidates the fitness cache.
    pub fn flip(&mut self, index: usize) {
        assert!(index < self.length, "locus {index} out of range");
        self.genes[index / WORD_BITS] ^= 1u64 << (index % WORD_BITS);
        self.evaluated = false;
    }

    fn set_unchecked(&mut self, index: usize, bit: bool) {
        assert!(index < self.length, "locus {index} out of range");
        let (q, r) = (index / WORD_BITS, index % WORD_BITS);
        if bit {
            self.genes[q] |= 1u64 << r;
        } else {
            self.genes[q] &= !(1u64 << r);
        }
    }

    /// Number of one-bits, counted word-wise.
    pub fn count_ones(&self) -> usize {
        self.genes.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Hamming distance to another chromosome of the same length.
    ///
    /// # Panics
    /// Panics if the lengths differ.
    pub fn distance(&self, other: &Chromosome) -> usize {
        assert_eq!(self.length, other.length, "length mismatch");
        self.genes
            .iter()
            .zip(other.genes.iter())
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum()
    }

    /// Whether the cached fitness is valid for the current bits.
    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// The cached fitness, if valid.
    pub fn cached_fitness(&self) -> Option<f64> {
        self.evaluated.then_some(self.fitness)
    }

    /// Stores an externally computed fitness for the current bits.
    pub(crate) fn store_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
        self.evaluated = true;
    }

    /// Greedy hill climbing: one sequential pass of single-bit flips,
    /// keeping strict improvements.
    ///
    /// Rejected flips restore the previous cached fitness instead of
    /// re-evaluating, so each locus costs at most one evaluation.
    pub fn greedy_hill_climb(&mut self, evaluator: &mut Evaluator) -> Result<bool> {
        let mut improved = false;
        for i in 0..self.length {
            let before = evaluator.fitness_of(self)?;
            self.flip(i);
            let after = evaluator.fitness_of(self)?;
            if after > before {
                improved = true;
            } else {
                self.flip(i);
                self.store_fitness(before);
            }
        }
        Ok(improved)
    }

    /// The gene string as a `0`/`1` vector in locus order.
    pub fn to_bits(&self) -> Vec<u8> {
        (0..self.length).map(|i| u8::from(self.get(i))).collect()
    }

    /// Parses the most-significant-locus-first text layout produced by
    /// [`Display`](fmt::Display).
    pub fn from_bit_string(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Dsmga2Error::parse("bit string", "empty"));
        }
        let mut ch = Self::new(s.len());
        for (pos, c) in s.chars().enumerate() {
            let bit = match c {
                '0' => false,
                '1' => true,
                other => {
                    return Err(Dsmga2Error::parse(
                        "bit string",
                        format!("unexpected character {other:?} at position {pos}"),
                    ))
                }
            };
            ch.set_unchecked(s.len() - 1 - pos, bit);
        }
        Ok(ch)
    }
}

/// Most-significant-locus-first: locus `len()-1` prints first.
impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.length).rev() {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl PartialEq for Chromosome {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.genes == other.genes
    }
}

impl Eq for Chromosome {}
