//! Model-guided mixing operators.
//!
//! Restricted Mixing (RM) grows a crossover mask outward from a seed
//! locus along the linkage chain, copying donor bits into a target and
//! accepting only non-worsening trials. Back Mixing (BM) propagates each
//! pattern that strictly improved some target to the rest of the
//! population.
//!
//! Both operators mutate the population in place and keep the
//! fast-counting mirror in sync on every accepted bit change.

use super::runner::Dsmga2;
use crate::chromosome::Chromosome;
use crate::error::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A mask of loci together with the donor values imposed on them.
#[derive(Debug, Clone)]
pub(super) struct Pattern {
    loci: Vec<usize>,
    bits: Vec<bool>,
}

impl Pattern {
    fn new(loci: Vec<usize>, bits: Vec<bool>) -> Self {
        debug_assert_eq!(loci.len(), bits.len());
        Self { loci, bits }
    }

    /// Order-independent identity of the (mask, values) pair.
    pub(super) fn key(&self) -> u64 {
        let mut pairs: Vec<(usize, bool)> =
            self.loci.iter().copied().zip(self.bits.iter().copied()).collect();
        pairs.sort_unstable_by_key(|&(locus, _)| locus);
        let mut hasher = DefaultHasher::new();
        pairs.hash(&mut hasher);
        hasher.finish()
    }

    /// Whether the chromosome already carries the pattern values.
    pub(super) fn present_in(&self, ch: &Chromosome) -> bool {
        self.pairs().all(|(locus, bit)| ch.get(locus) == bit)
    }

    pub(super) fn pairs(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.loci.iter().copied().zip(self.bits.iter().copied())
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.loci.len()
    }
}

/// Patterns a chromosome has already been offered by back mixing,
/// tagged with the generation they were recorded in.
#[derive(Debug, Clone, Default)]
pub(super) struct PatternHistory {
    seen: HashMap<u64, usize>,
}

impl PatternHistory {
    pub(super) fn contains(&self, key: u64) -> bool {
        self.seen.contains_key(&key)
    }

    pub(super) fn insert(&mut self, key: u64, generation: usize) {
        self.seen.insert(key, generation);
    }

    /// Drops entries older than `window` generations to bound memory.
    pub(super) fn prune(&mut self, current_generation: usize, window: usize) {
        self.seen
            .retain(|_, recorded| current_generation - *recorded < window);
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.seen.len()
    }
}

/// What one restricted-mixing pass produced.
pub(super) struct RmOutcome {
    /// Patterns that strictly improved their target, in discovery order.
    pub(super) patterns: Vec<Pattern>,
    /// Accepted replacements, neutral ones included.
    pub(super) accepted_steps: usize,
}

impl Dsmga2 {
    /// One full restricted-mixing pass over the population in a permuted
    /// order. Updates the orphan set consumed by the next generation.
    pub(super) fn restricted_mixing_pass(&mut self) -> Result<RmOutcome> {
        let mut visit: Vec<usize> = (0..self.population.len()).collect();
        visit.shuffle(&mut self.rng);

        let mut untouched = vec![true; self.ell];
        let mut outcome = RmOutcome {
            patterns: Vec::new(),
            accepted_steps: 0,
        };

        for target in visit {
            let (accepted, pattern) = self.restricted_mixing(target)?;
            if accepted {
                outcome.accepted_steps += 1;
            }
            if let Some(pattern) = pattern {
                for (locus, _) in pattern.pairs() {
                    untouched[locus] = false;
                }
                outcome.patterns.push(pattern);
            }
        }

        self.orphans = untouched;
        Ok(outcome)
    }

    /// Restricted mixing against one target chromosome.
    ///
    /// Grows the mask along the linkage chain from a seed locus; a trial
    /// is evaluated only when an extension actually changes a bit. A
    /// strictly improving trial replaces the target, records the pattern
    /// and stops; a neutral-with-change trial replaces the target and
    /// keeps growing; a strictly worsening trial stops the extension
    /// without replacing.
    fn restricted_mixing(&mut self, target: usize) -> Result<(bool, Option<Pattern>)> {
        let seed = self.pick_seed_locus();
        let selection = self.config.donor_selection;
        let donor = selection.select(&self.population, target, &mut self.rng);
        let chain = self.linkage.order_from(seed);

        let mut current = self.evaluator.fitness_of(&mut self.population[target])?;
        let mut trial = self.population[target].clone();
        let mut mask: Vec<usize> = Vec::new();
        let mut accepted: Vec<usize> = Vec::new();
        let mut improving_pattern = None;

        for &locus in &chain {
            mask.push(locus);
            let donor_bit = self.population[donor].get(locus);
            if trial.get(locus) == donor_bit {
                continue;
            }
            trial.set(locus, donor_bit);
            let fitness = self.evaluator.fitness_of(&mut trial)?;
            if fitness > current {
                accepted.push(locus);
                current = fitness;
                let bits = mask.iter().map(|&i| trial.get(i)).collect();
                improving_pattern = Some(Pattern::new(mask.clone(), bits));
                break;
            } else if fitness == current {
                accepted.push(locus);
            } else {
                trial.flip(locus);
                trial.store_fitness(current);
                break;
            }
        }

        if accepted.is_empty() {
            return Ok((false, None));
        }

        for &locus in &accepted {
            let bit = trial.get(locus);
            self.population[target].set(locus, bit);
            self.counting.set(locus, target, bit);
        }
        self.population[target].store_fitness(current);
        Ok((true, improving_pattern))
    }

    /// Seed locus for mask growth, drawn from the previous generation's
    /// orphans when any remain.
    fn pick_seed_locus(&mut self) -> usize {
        let orphans: Vec<usize> = self
            .orphans
            .iter()
            .enumerate()
            .filter_map(|(i, &orphan)| orphan.then_some(i))
            .collect();
        if orphans.is_empty() {
            self.rng.random_range(0..self.ell)
        } else {
            orphans[self.rng.random_range(0..orphans.len())]
        }
    }

    /// Offers every pattern recorded by the generation's restricted
    /// mixing to every chromosome not already carrying it.
    ///
    /// A chromosome keeps the imposed bits when its fitness does not
    /// drop; either way the pattern enters its history and is never
    /// re-imposed within the history window.
    pub(super) fn back_mixing_pass(&mut self, patterns: &[Pattern]) -> Result<()> {
        for pattern in patterns {
            let key = pattern.key();
            for index in 0..self.population.len() {
                if pattern.present_in(&self.population[index]) {
                    continue;
                }
                if self.histories[index].contains(key) {
                    continue;
                }

                let before = self.evaluator.fitness_of(&mut self.population[index])?;
                let mut trial = self.population[index].clone();
                for (locus, bit) in pattern.pairs() {
                    trial.set(locus, bit);
                }
                let after = self.evaluator.fitness_of(&mut trial)?;
                if after >= before {
                    for (locus, bit) in pattern.pairs() {
                        if self.population[index].get(locus) != bit {
                            self.counting.set(locus, index, bit);
                        }
                    }
                    self.population[index] = trial;
                }
                self.histories[index].insert(key, self.generation);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Dsmga2Config;
    use crate::fitness::Objective;

    fn chromosome_of(bits: &[u8]) -> Chromosome {
        let mut ch = Chromosome::new(bits.len());
        for (i, &b) in bits.iter().enumerate() {
            ch.set(i, b == 1);
        }
        ch
    }

    fn chromosome_from(row: &str) -> Chromosome {
        let mut ch = Chromosome::new(row.len());
        for (i, c) in row.chars().enumerate() {
            ch.set(i, c == '1');
        }
        ch
    }

    /// Engine whose population is exactly `rows` (locus order), mirror
    /// and model rebuilt to match.
    fn engine_with_population(objective: Objective, rows: &[&str]) -> Dsmga2 {
        let config = Dsmga2Config::new(rows[0].len())
            .with_population_size(rows.len())
            .with_seed(7);
        let mut engine = Dsmga2::new(config, objective).unwrap();
        for (i, row) in rows.iter().enumerate() {
            engine.population[i] = chromosome_from(row);
        }
        engine.counting.rebuild(&engine.population);
        engine.linkage.build(&engine.counting);
        engine
    }

    // Nine all-ones donors guarantee what any donor draw hands back.
    const DONORS: [&str; 9] = ["11111"; 9];

    #[test]
    fn test_worsening_extension_stops_without_replacing() {
        // Target is the deceptive trap optimum; every single-bit donor
        // copy strictly worsens it, so the very first evaluated trial
        // must end the extension with the target untouched.
        let mut rows = vec!["00000"];
        rows.extend(DONORS);
        let mut engine = engine_with_population(Objective::mk_trap(), &rows);

        let (accepted, pattern) = engine.restricted_mixing(0).unwrap();

        assert!(!accepted, "a worsening trial must not replace the target");
        assert!(pattern.is_none());
        assert_eq!(engine.population[0].count_ones(), 0, "target bits changed");
        assert_eq!(engine.counting.count_one(0), 9, "mirror changed");
        assert_eq!(
            engine.evaluator.nfe(),
            2,
            "target plus exactly one trial: growth must stop at the worsening prefix"
        );
    }

    #[test]
    fn test_improving_extension_replaces_and_records() {
        // One bit short of the trap optimum: the single differing donor
        // bit strictly improves, so the trial commits and the pattern is
        // recorded.
        let mut rows = vec!["11110"];
        rows.extend(DONORS);
        let mut engine = engine_with_population(Objective::mk_trap(), &rows);

        let (accepted, pattern) = engine.restricted_mixing(0).unwrap();

        assert!(accepted);
        let pattern = pattern.expect("strict improvement must record its pattern");
        assert!(pattern.pairs().all(|(_, bit)| bit), "pattern carries donor values");
        assert_eq!(engine.population[0].count_ones(), 5);
        assert_eq!(engine.population[0].cached_fitness(), Some(5.0));
        assert_eq!(engine.counting.count_one(4), 10, "mirror must follow the commit");
    }

    #[test]
    fn test_neutral_extension_replaces_and_keeps_growing() {
        // A constant objective makes every change neutral: the whole
        // chain is walked, every donor bit is taken, no pattern recorded.
        let mut rows = vec!["00000"];
        rows.extend(DONORS);
        let mut engine = engine_with_population(Objective::custom(), &rows);
        engine.evaluator.set_custom_fn(Box::new(|_| 1.0)).unwrap();

        let (accepted, pattern) = engine.restricted_mixing(0).unwrap();

        assert!(accepted, "neutral-with-change is an accepted replacement");
        assert!(pattern.is_none(), "neutral steps are not successful patterns");
        assert_eq!(engine.population[0].count_ones(), 5);
        assert_eq!(engine.evaluator.nfe(), 6, "target plus one trial per changed locus");
    }

    #[test]
    fn test_pattern_key_is_order_independent() {
        let a = Pattern::new(vec![3, 1, 7], vec![true, false, true]);
        let b = Pattern::new(vec![1, 3, 7], vec![false, true, true]);
        assert_eq!(a.key(), b.key());

        let different = Pattern::new(vec![1, 3, 7], vec![true, true, true]);
        assert_ne!(a.key(), different.key());
    }

    #[test]
    fn test_pattern_presence() {
        let pattern = Pattern::new(vec![0, 2], vec![true, false]);
        assert!(pattern.present_in(&chromosome_of(&[1, 1, 0, 0])));
        assert!(!pattern.present_in(&chromosome_of(&[1, 1, 1, 0])));
        assert_eq!(pattern.len(), 2);
    }

    #[test]
    fn test_history_window_pruning() {
        let mut history = PatternHistory::default();
        history.insert(1, 0);
        history.insert(2, 3);
        history.insert(3, 4);
        assert_eq!(history.len(), 3);

        history.prune(5, 5);
        assert!(!history.contains(1), "generation 0 is outside a window of 5 at generation 5");
        assert!(history.contains(2));
        assert!(history.contains(3));
    }
}
