//! The DSMGA-II engine and its generational loop.
//!
//! [`Dsmga2`] owns everything a run needs — population, fast-counting
//! mirror, linkage model, evaluator and RNG — so independent engines are
//! trivially safe to run concurrently. The population is steady-state:
//! mixing mutates it in place and no separate mating pool exists.
//!
//! A generation is: rebuild the linkage model from the mirror, one
//! permuted restricted-mixing pass, back mixing of the pass's successful
//! patterns, then the termination tests.

use super::config::Dsmga2Config;
use super::mixing::PatternHistory;
use crate::chromosome::Chromosome;
use crate::error::{Dsmga2Error, Result};
use crate::fastcounting::FastCounting;
use crate::fitness::{Evaluator, Objective, ObjectiveFn};
use crate::linkage::LinkageModel;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of one optimization run.
///
/// Exactly one of the status flags explains why the run stopped; when
/// none is set, a generation or evaluation budget ran out.
#[derive(Debug, Clone)]
pub struct Dsmga2Result {
    /// The best chromosome ever observed.
    pub best: Chromosome,

    /// Fitness of the best chromosome.
    pub best_fitness: f64,

    /// Generations executed.
    pub generations: usize,

    /// Fitness evaluations performed, local search included.
    pub nfe: u64,

    /// Whether the target fitness (the known optimum by default) was
    /// reached.
    pub reached_optimum: bool,

    /// Whether the population converged (identical bits or negligible
    /// fitness variance).
    pub converged: bool,

    /// Whether the run stopped after `stagnation_bound` generations
    /// without an accepted restricted-mixing step.
    pub stagnated: bool,

    /// Whether the run was cancelled externally.
    pub cancelled: bool,

    /// Whether a user objective returned a non-finite value; the result
    /// still carries the best solution observed before the failure.
    pub evaluator_failed: bool,

    /// Best-ever fitness after initialization and after each generation.
    pub fitness_history: Vec<f64>,
}

/// The DSMGA-II engine.
///
/// # Usage
///
/// ```
/// use dsmga2::engine::{Dsmga2, Dsmga2Config};
/// use dsmga2::fitness::Objective;
///
/// let config = Dsmga2Config::new(40).with_seed(1).with_max_generations(50);
/// let mut engine = Dsmga2::new(config, Objective::OneMax).unwrap();
/// let result = engine.optimize().unwrap();
/// assert!(result.best_fitness <= 40.0);
/// ```
#[derive(Debug)]
pub struct Dsmga2 {
    pub(super) config: Dsmga2Config,
    pub(super) ell: usize,
    pub(super) population: Vec<Chromosome>,
    pub(super) counting: FastCounting,
    pub(super) linkage: LinkageModel,
    pub(super) evaluator: Evaluator,
    pub(super) rng: StdRng,
    pub(super) generation: usize,
    pub(super) orphans: Vec<bool>,
    pub(super) histories: Vec<PatternHistory>,
    best: Option<Chromosome>,
    best_fitness: f64,
    fitness_history: Vec<f64>,
    stagnant_generations: usize,
    initialized: bool,
}

impl Dsmga2 {
    /// Builds an engine with a random population.
    ///
    /// Validates the configuration and the objective's expected problem
    /// size; allocates the mirror and the linkage matrix once. No fitness
    /// evaluation happens until [`optimize`](Dsmga2::optimize) runs.
    pub fn new(config: Dsmga2Config, objective: Objective) -> Result<Self> {
        config.validate()?;
        if let Some(expected) = objective.expected_length() {
            if expected != config.problem_size {
                return Err(Dsmga2Error::Config(format!(
                    "objective '{}' is defined over {expected} loci, problem_size is {}",
                    objective.kind(),
                    config.problem_size
                )));
            }
        }

        let ell = config.problem_size;
        let population_size = config.effective_population();
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let population: Vec<Chromosome> = (0..population_size)
            .map(|_| Chromosome::random(ell, &mut rng))
            .collect();

        Ok(Self {
            counting: FastCounting::new(ell, population_size),
            linkage: LinkageModel::new(ell),
            evaluator: Evaluator::new(objective),
            histories: vec![PatternHistory::default(); population_size],
            orphans: vec![true; ell],
            population,
            config,
            ell,
            rng,
            generation: 0,
            best: None,
            best_fitness: f64::NEG_INFINITY,
            fitness_history: Vec::new(),
            stagnant_generations: 0,
            initialized: false,
        })
    }

    /// Installs the callback of a custom objective.
    ///
    /// Errors when the engine was built with a predefined objective.
    pub fn set_objective_function(&mut self, f: ObjectiveFn) -> Result<()> {
        self.evaluator.set_custom_fn(f)
    }

    /// Generations executed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Fitness evaluations performed so far.
    pub fn nfe(&self) -> u64 {
        self.evaluator.nfe()
    }

    /// The best chromosome observed so far, if any evaluation happened.
    pub fn best(&self) -> Option<(&Chromosome, f64)> {
        self.best.as_ref().map(|ch| (ch, self.best_fitness))
    }

    /// Runs the search to termination.
    pub fn optimize(&mut self) -> Result<Dsmga2Result> {
        self.optimize_with_cancel(None)
    }

    /// Runs the search with an optional cancellation token.
    ///
    /// When the flag is set the engine stops at the top of the next
    /// generation and returns the best result found so far.
    pub fn optimize_with_cancel(
        &mut self,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Dsmga2Result> {
        self.evaluator.ensure_ready()?;

        let mut reached_optimum = false;
        let mut converged = false;
        let mut stagnated = false;
        let mut cancelled = false;
        let mut failure: Option<Dsmga2Error> = None;

        if !self.initialized {
            match self.initialize() {
                Ok(()) => {}
                Err(e @ Dsmga2Error::Evaluator { .. }) => failure = Some(e),
                Err(e) => return Err(e),
            }
        }

        while failure.is_none() {
            if let Some(flag) = &cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }
            if self.target_reached() {
                reached_optimum = true;
                break;
            }
            if self.population_converged() {
                converged = true;
                break;
            }
            if self.config.stagnation_bound > 0
                && self.stagnant_generations >= self.config.stagnation_bound
            {
                stagnated = true;
                break;
            }
            if self
                .config
                .max_generations
                .is_some_and(|cap| self.generation >= cap)
            {
                break;
            }
            if self
                .config
                .max_evaluations
                .is_some_and(|cap| self.evaluator.nfe() >= cap)
            {
                break;
            }

            if let Err(e) = self.run_generation() {
                match e {
                    e @ Dsmga2Error::Evaluator { .. } => failure = Some(e),
                    other => return Err(other),
                }
            }
        }

        let Some(best) = self.best.clone() else {
            // Nothing was ever evaluated; the failure is all there is.
            return Err(failure.unwrap_or_else(|| {
                Dsmga2Error::Mode("optimize observed no evaluated chromosome".into())
            }));
        };

        Ok(Dsmga2Result {
            best,
            best_fitness: self.best_fitness,
            generations: self.generation,
            nfe: self.evaluator.nfe(),
            reached_optimum,
            converged,
            stagnated,
            cancelled,
            evaluator_failed: failure.is_some(),
            fitness_history: self.fitness_history.clone(),
        })
    }

    /// First-call setup: local search over the random population, then
    /// the initial mirror and linkage model.
    fn initialize(&mut self) -> Result<()> {
        for index in 0..self.population.len() {
            self.population[index].greedy_hill_climb(&mut self.evaluator)?;
            self.observe(index)?;
        }
        self.counting.rebuild(&self.population);
        self.linkage.build(&self.counting);
        self.fitness_history.push(self.best_fitness);
        self.initialized = true;
        Ok(())
    }

    /// One generation: model rebuild, restricted mixing, back mixing,
    /// statistics.
    fn run_generation(&mut self) -> Result<()> {
        if self.generation > 0 {
            self.counting.rebuild(&self.population);
            self.linkage.build(&self.counting);
        }
        let generation = self.generation;
        let window = self.config.history_window;
        for history in &mut self.histories {
            history.prune(generation, window);
        }

        let outcome = self.restricted_mixing_pass()?;
        self.back_mixing_pass(&outcome.patterns)?;

        self.generation += 1;
        if outcome.accepted_steps == 0 {
            self.stagnant_generations += 1;
        } else {
            self.stagnant_generations = 0;
        }
        for index in 0..self.population.len() {
            self.observe(index)?;
        }
        self.fitness_history.push(self.best_fitness);
        log::debug!(
            "generation {}: best {:.6}, accepted {}, nfe {}",
            self.generation,
            self.best_fitness,
            outcome.accepted_steps,
            self.evaluator.nfe()
        );
        Ok(())
    }

    /// Records the chromosome at `index` as best-ever when it wins.
    fn observe(&mut self, index: usize) -> Result<()> {
        let fitness = self.evaluator.fitness_of(&mut self.population[index])?;
        if fitness > self.best_fitness {
            self.best_fitness = fitness;
            self.best = Some(self.population[index].clone());
        }
        Ok(())
    }

    fn target_reached(&self) -> bool {
        let target = self
            .config
            .target_fitness
            .or_else(|| self.evaluator.known_optimum(self.ell));
        match target {
            Some(target) => self.best_fitness >= target - 1e-9,
            None => false,
        }
    }

    /// Identical bits across the population, or fitness variance at most
    /// 1e-6 relative to the magnitude of the best fitness.
    fn population_converged(&self) -> bool {
        if self.population.iter().all(|ch| *ch == self.population[0]) {
            return true;
        }
        let fitnesses: Vec<f64> = self
            .population
            .iter()
            .filter_map(|ch| ch.cached_fitness())
            .collect();
        if fitnesses.len() < self.population.len() {
            return false;
        }
        let n = fitnesses.len() as f64;
        let mean = fitnesses.iter().sum::<f64>() / n;
        let variance = fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n;
        variance <= 1e-6 * self.best_fitness.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DonorSelection;

    fn onemax_config(ell: usize, population: usize, seed: u64) -> Dsmga2Config {
        Dsmga2Config::new(ell)
            .with_population_size(population)
            .with_seed(seed)
    }

    #[test]
    fn test_onemax_reaches_optimum() {
        // OneMax, 100 loci, population 50: the optimum within 50
        // generations and a modest evaluation budget.
        let config = onemax_config(100, 50, 1).with_max_generations(50);
        let mut engine = Dsmga2::new(config, Objective::OneMax).unwrap();
        let result = engine.optimize().unwrap();

        assert!(result.reached_optimum, "expected the optimum, got {result:?}");
        assert_eq!(result.best_fitness, 100.0);
        assert_eq!(result.best.count_ones(), 100, "optimum must be all ones");
        assert!(result.generations <= 50);
        assert!(
            result.nfe <= 50 * 50 * 4,
            "evaluation budget blown: {} evaluations",
            result.nfe
        );
    }

    #[test]
    fn test_small_population_result_is_consistent() {
        // A population this small may or may not converge; the reported
        // fitness must match the reported chromosome either way.
        let config = onemax_config(100, 20, 1).with_max_generations(50);
        let mut engine = Dsmga2::new(config, Objective::OneMax).unwrap();
        let result = engine.optimize().unwrap();

        assert!(result.best_fitness <= 100.0);
        assert_eq!(
            result.best.count_ones() as f64,
            result.best_fitness,
            "best chromosome and reported fitness disagree"
        );
    }

    #[test]
    fn test_mktrap_terminates_at_trap_local_optima() {
        // Local search drives every trap block to one of its two optima,
        // after which any single-bit donor copy strictly worsens the
        // target and restricted mixing stops without replacing. The run
        // must end by stagnation with every block still at an optimum.
        let config = Dsmga2Config::new(100)
            .with_population_size(200)
            .with_seed(42)
            .with_max_generations(200);
        let mut engine = Dsmga2::new(config, Objective::mk_trap()).unwrap();
        let result = engine.optimize().unwrap();

        assert!(result.generations <= 200);
        assert!(
            result.best_fitness >= 80.0 && result.best_fitness <= 100.0,
            "20 blocks each worth 4 or 5, got {}",
            result.best_fitness
        );
        if !result.reached_optimum {
            assert!(
                result.stagnated || result.converged,
                "without an optimum the run must end by stagnation or convergence: {result:?}"
            );
        }
    }

    #[test]
    fn test_custom_callback_on_predefined_objective_errors() {
        let mut engine =
            Dsmga2::new(onemax_config(100, 50, 1), Objective::OneMax).unwrap();
        let err = engine
            .set_objective_function(Box::new(|ch| ch.count_ones() as f64))
            .unwrap_err();
        assert!(matches!(err, Dsmga2Error::Mode(_)));
        assert_eq!(engine.nfe(), 0, "mode errors must precede evaluation");
    }

    #[test]
    fn test_optimize_without_callback_errors() {
        let mut engine =
            Dsmga2::new(onemax_config(100, 50, 1), Objective::custom()).unwrap();
        let err = engine.optimize().unwrap_err();
        assert!(matches!(err, Dsmga2Error::Mode(_)));
        assert_eq!(engine.nfe(), 0);
    }

    #[test]
    fn test_custom_objective_runs() {
        // No known optimum for custom objectives: supply the target.
        let config = onemax_config(60, 30, 9)
            .with_max_generations(60)
            .with_target_fitness(60.0);
        let mut engine = Dsmga2::new(config, Objective::custom()).unwrap();
        engine
            .set_objective_function(Box::new(|ch| ch.count_ones() as f64))
            .unwrap();
        let result = engine.optimize().unwrap();
        assert!(result.best_fitness >= 50.0, "got {}", result.best_fitness);
    }

    #[test]
    fn test_failing_callback_keeps_best_ever() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let calls = Arc::new(AtomicU64::new(0));
        let calls_in_cb = calls.clone();

        // The budget dies partway through initialization: earlier
        // chromosomes have been observed, later ones have not.
        let config = onemax_config(20, 10, 5).with_max_generations(100);
        let mut engine = Dsmga2::new(config, Objective::custom()).unwrap();
        engine
            .set_objective_function(Box::new(move |ch| {
                if calls_in_cb.fetch_add(1, Ordering::Relaxed) >= 100 {
                    f64::INFINITY
                } else {
                    ch.count_ones() as f64
                }
            }))
            .unwrap();

        let result = engine.optimize().unwrap();
        assert!(result.evaluator_failed, "expected the evaluator error marker");
        assert!(result.best_fitness >= 0.0, "best-ever must survive the failure");
    }

    #[test]
    fn test_callback_failing_immediately_is_an_error() {
        let config = onemax_config(20, 10, 5);
        let mut engine = Dsmga2::new(config, Objective::custom()).unwrap();
        engine.set_objective_function(Box::new(|_| f64::NAN)).unwrap();
        let err = engine.optimize().unwrap_err();
        assert!(matches!(err, Dsmga2Error::Evaluator { .. }));
    }

    #[test]
    fn test_generation_budget_stops_the_run() {
        // Deceptive traps survive local search, so the run actually has
        // generations to spend.
        let config = Dsmga2Config::new(200)
            .with_population_size(10)
            .with_seed(3)
            .with_max_generations(2);
        let mut engine = Dsmga2::new(config, Objective::mk_trap()).unwrap();
        let result = engine.optimize().unwrap();
        assert!(result.generations <= 2);
        if !result.reached_optimum && !result.converged && !result.stagnated {
            assert_eq!(result.generations, 2);
        }
    }

    #[test]
    fn test_evaluation_budget_stops_the_run() {
        // Stagnation disabled so the evaluation cap is the only finite
        // bound left once the trap blocks stop accepting trials.
        let config = Dsmga2Config::new(100)
            .with_population_size(50)
            .with_seed(3)
            .with_stagnation_bound(0)
            .with_max_evaluations(6_000);
        let mut engine = Dsmga2::new(config, Objective::mk_trap()).unwrap();
        let result = engine.optimize().unwrap();
        if !result.reached_optimum && !result.converged {
            assert!(!result.stagnated);
            assert!(result.nfe >= 6_000, "budget exit requires an exhausted budget");
        }
    }

    #[test]
    fn test_determinism_same_seed_same_trajectory() {
        let run = || {
            let config = onemax_config(60, 20, 1234)
                .with_max_generations(30)
                .with_donor_selection(DonorSelection::Tournament(2));
            let mut engine = Dsmga2::new(config, Objective::mk_trap()).unwrap();
            engine.optimize().unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.best, b.best);
        assert_eq!(a.best_fitness, b.best_fitness);
        assert_eq!(a.generations, b.generations);
        assert_eq!(a.nfe, b.nfe);
        assert_eq!(a.fitness_history, b.fitness_history);
    }

    #[test]
    fn test_cancellation_returns_best_so_far() {
        let cancel = Arc::new(AtomicBool::new(true));
        let config = onemax_config(100, 50, 8);
        let mut engine = Dsmga2::new(config, Objective::OneMax).unwrap();
        let result = engine.optimize_with_cancel(Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert!(result.best_fitness >= 0.0);
    }

    #[test]
    fn test_fitness_history_is_monotone() {
        let config = onemax_config(80, 30, 17).with_max_generations(40);
        let mut engine = Dsmga2::new(config, Objective::OneMax).unwrap();
        let result = engine.optimize().unwrap();
        for window in result.fitness_history.windows(2) {
            assert!(
                window[1] >= window[0],
                "best-ever fitness regressed: {} -> {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn test_accepted_steps_never_lose_fitness() {
        // Acceptance monotonicity: mixing keeps or improves the fitness
        // of every chromosome it touches, so with the same seed the
        // population minimum of a longer run dominates a shorter one.
        let population_min = |generations: usize| {
            let config = Dsmga2Config::new(50)
                .with_population_size(20)
                .with_seed(21)
                .with_stagnation_bound(0)
                .with_max_generations(generations);
            let mut engine = Dsmga2::new(config, Objective::mk_trap()).unwrap();
            engine.optimize().unwrap();
            engine
                .population
                .iter()
                .filter_map(|ch| ch.cached_fitness())
                .fold(f64::INFINITY, f64::min)
        };
        assert!(population_min(6) >= population_min(2));
    }

    #[test]
    fn test_mirror_matches_population_after_run() {
        let config = onemax_config(40, 16, 33).with_max_generations(10);
        let mut engine = Dsmga2::new(config, Objective::OneMax).unwrap();
        engine.optimize().unwrap();

        for locus in 0..40 {
            let expected = engine
                .population
                .iter()
                .filter(|ch| ch.get(locus))
                .count();
            assert_eq!(
                engine.counting.count_one(locus),
                expected,
                "mirror out of sync at locus {locus}"
            );
        }
    }

    #[test]
    fn test_odd_population_is_corrected() {
        let config = onemax_config(30, 15, 2).with_max_generations(1);
        let engine = Dsmga2::new(config, Objective::OneMax).unwrap();
        assert_eq!(engine.population.len(), 16);
    }

    #[test]
    fn test_mismatched_instance_length_is_a_config_error() {
        let sat = crate::fitness::SatInstance::parse("p cnf 3 1\n1 2 3 0\n").unwrap();
        let err = Dsmga2::new(onemax_config(100, 50, 1), Objective::Sat(sat)).unwrap_err();
        assert!(matches!(err, Dsmga2Error::Config(_)));
    }

    #[test]
    fn test_sat_objective_end_to_end() {
        let sat = crate::fitness::SatInstance::parse(
            "p cnf 6 4\n1 2 0\n-1 3 0\n4 -5 0\n5 6 0\n",
        )
        .unwrap();
        let config = Dsmga2Config::new(6)
            .with_population_size(20)
            .with_seed(4)
            .with_max_generations(50);
        let mut engine = Dsmga2::new(config, Objective::Sat(sat)).unwrap();
        let result = engine.optimize().unwrap();
        assert!(result.reached_optimum, "satisfiable toy formula must be solved");
        assert_eq!(result.best_fitness, 1.0);
    }
}
