//! Donor selection for restricted mixing.
//!
//! Restricted mixing copies bits from one donor chromosome into a target.
//! The donor is never the target itself; selection pressure is applied by
//! a small fitness tournament over uniform draws.

use crate::chromosome::Chromosome;
use rand::Rng;

/// How the donor of a restricted-mixing step is chosen.
///
/// The engine maximizes fitness, so tournaments keep the draw with the
/// higher cached fitness; ties go to the smaller population index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonorSelection {
    /// A single uniform draw.
    Uniform,

    /// Best of `k` uniform draws by fitness.
    ///
    /// k = 2 is the classic low-pressure choice; larger values speed up
    /// takeover at the cost of diversity.
    Tournament(usize),
}

impl Default for DonorSelection {
    fn default() -> Self {
        DonorSelection::Tournament(2)
    }
}

impl DonorSelection {
    /// Selects a donor index distinct from `target`.
    ///
    /// All chromosomes are expected to carry a cached fitness; an
    /// unevaluated one loses every comparison.
    ///
    /// # Panics
    /// Panics if the population holds fewer than two chromosomes.
    pub fn select<R: Rng>(
        &self,
        population: &[Chromosome],
        target: usize,
        rng: &mut R,
    ) -> usize {
        assert!(population.len() > 1, "donor selection needs at least two chromosomes");
        match self {
            DonorSelection::Uniform => draw_excluding(population.len(), target, rng),
            DonorSelection::Tournament(k) => {
                let k = (*k).max(1);
                let mut best = draw_excluding(population.len(), target, rng);
                for _ in 1..k {
                    let challenger = draw_excluding(population.len(), target, rng);
                    if beats(population, challenger, best) {
                        best = challenger;
                    }
                }
                best
            }
        }
    }
}

/// Uniform draw from `0..n` avoiding `excluded`.
fn draw_excluding<R: Rng>(n: usize, excluded: usize, rng: &mut R) -> usize {
    if excluded >= n {
        return rng.random_range(0..n);
    }
    let draw = rng.random_range(0..n - 1);
    if draw >= excluded {
        draw + 1
    } else {
        draw
    }
}

/// Whether `a` wins against `b`: higher fitness, smaller index on ties.
fn beats(population: &[Chromosome], a: usize, b: usize) -> bool {
    let fa = population[a].cached_fitness().unwrap_or(f64::NEG_INFINITY);
    let fb = population[b].cached_fitness().unwrap_or(f64::NEG_INFINITY);
    fa > fb || (fa == fb && a < b)
}
