//! Population-size sweep.
//!
//! Bisection search for the smallest population size that reaches the
//! known optimum in a fixed number of consecutive independent runs. The
//! upper bound is verified first; each probe then halves the bracket
//! until it is no wider than `step`.
//!
//! Trials are independent engines with deterministically derived seeds,
//! so a seeded sweep is reproducible whether the trials run sequentially
//! or in parallel.

use crate::engine::{Dsmga2, Dsmga2Config};
use crate::error::{Dsmga2Error, Result};
use crate::fitness::Objective;
use rayon::prelude::*;

/// Sweep parameters.
///
/// # Examples
///
/// ```
/// use dsmga2::sweep::SweepConfig;
///
/// let sweep = SweepConfig::new(20, 200, 20).with_num_convergence(5);
/// assert!(sweep.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Smallest population size considered.
    pub min_population: usize,

    /// Largest population size considered; must itself converge.
    pub max_population: usize,

    /// Bracket width at which bisection stops.
    pub step: usize,

    /// Consecutive independent successful runs a size must deliver.
    pub num_convergence: usize,

    /// Whether to run the trials of one size in parallel.
    pub parallel: bool,
}

impl SweepConfig {
    /// A sweep over `[min_population, max_population]` with the given
    /// final bracket width.
    pub fn new(min_population: usize, max_population: usize, step: usize) -> Self {
        Self {
            min_population,
            max_population,
            step,
            num_convergence: 10,
            parallel: true,
        }
    }

    /// Sets the number of consecutive successful runs required.
    pub fn with_num_convergence(mut self, n: usize) -> Self {
        self.num_convergence = n;
        self
    }

    /// Enables or disables parallel trials.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the sweep parameters.
    pub fn validate(&self) -> Result<()> {
        if self.min_population < 10 {
            return Err(Dsmga2Error::Config(
                "min_population must be at least 10".into(),
            ));
        }
        if self.max_population < self.min_population {
            return Err(Dsmga2Error::Config(
                "max_population must not be below min_population".into(),
            ));
        }
        if self.step == 0 {
            return Err(Dsmga2Error::Config("step must be at least 1".into()));
        }
        if self.num_convergence == 0 {
            return Err(Dsmga2Error::Config(
                "num_convergence must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a sweep: the smallest reliable population size and the
/// mean cost of its successful runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    /// Smallest population size that converged in every trial.
    pub optimal_population: usize,

    /// Mean generations over that size's successful runs.
    pub generations: f64,

    /// Mean fitness evaluations over that size's successful runs.
    pub nfe: f64,
}

/// Standalone form of the sweep.
///
/// Identical semantics to [`Dsmga2::sweep`], which is the canonical
/// entry point.
pub struct SweepRunner;

impl SweepRunner {
    /// Runs the sweep. See [`Dsmga2::sweep`].
    pub fn run(
        config: &Dsmga2Config,
        objective: &Objective,
        sweep: &SweepConfig,
    ) -> Result<SweepResult> {
        Dsmga2::sweep(config, objective, sweep)
    }
}

impl Dsmga2 {
    /// Finds the smallest population size in the sweep range for which
    /// `num_convergence` consecutive independent runs all reach the
    /// target fitness.
    ///
    /// `config` supplies everything but the population size; its seed (or
    /// a random one) anchors the per-trial seeds. The objective must have
    /// a known optimum or the config an explicit target, and must not be
    /// a custom callback, since every trial needs its own copy.
    pub fn sweep(
        config: &Dsmga2Config,
        objective: &Objective,
        sweep: &SweepConfig,
    ) -> Result<SweepResult> {
        config.validate()?;
        sweep.validate()?;
        if config.target_fitness.is_none()
            && objective.known_optimum(config.problem_size).is_none()
        {
            return Err(Dsmga2Error::Mode(format!(
                "sweep needs a target fitness; objective '{}' has no known optimum",
                objective.kind()
            )));
        }
        if objective.try_clone().is_none() {
            return Err(Dsmga2Error::Mode(
                "sweep cannot duplicate a custom objective across trials".into(),
            ));
        }

        let base_seed = config.seed.unwrap_or_else(rand::random);
        let mut lo = sweep.min_population;
        let mut hi = sweep.max_population;

        let Some(mut stats) = run_trials(config, objective, sweep, base_seed, hi)? else {
            return Err(Dsmga2Error::Sweep {
                min: sweep.min_population,
                max: sweep.max_population,
                trials: sweep.num_convergence,
            });
        };

        while hi - lo > sweep.step {
            let mut mid = (lo + hi) / 2;
            if mid % 2 == 1 {
                mid += 1;
            }
            if mid <= lo || mid >= hi {
                break;
            }
            match run_trials(config, objective, sweep, base_seed, mid)? {
                Some(mid_stats) => {
                    hi = mid;
                    stats = mid_stats;
                }
                None => lo = mid,
            }
        }

        log::info!(
            "sweep: population {hi}, mean generations {:.2}, mean nfe {:.1}",
            stats.0,
            stats.1
        );
        Ok(SweepResult {
            optimal_population: hi,
            generations: stats.0,
            nfe: stats.1,
        })
    }
}

/// Runs `num_convergence` independent trials at one population size.
///
/// Returns the mean (generations, nfe) over the trials when every one of
/// them reaches the target, `None` otherwise.
fn run_trials(
    config: &Dsmga2Config,
    objective: &Objective,
    sweep: &SweepConfig,
    base_seed: u64,
    population: usize,
) -> Result<Option<(f64, f64)>> {
    let trial = |index: usize| -> Result<Option<(usize, u64)>> {
        let objective = objective.try_clone().ok_or_else(|| {
            Dsmga2Error::Mode("sweep cannot duplicate a custom objective across trials".into())
        })?;
        let trial_config = config
            .clone()
            .with_population_size(population)
            .with_seed(trial_seed(base_seed, population, index));
        let mut engine = Dsmga2::new(trial_config, objective)?;
        let result = engine.optimize()?;
        Ok(result
            .reached_optimum
            .then_some((result.generations, result.nfe)))
    };

    let outcomes: Vec<Option<(usize, u64)>> = if sweep.parallel {
        (0..sweep.num_convergence)
            .into_par_iter()
            .map(trial)
            .collect::<Result<_>>()?
    } else {
        let mut collected = Vec::with_capacity(sweep.num_convergence);
        for index in 0..sweep.num_convergence {
            let outcome = trial(index)?;
            let failed = outcome.is_none();
            collected.push(outcome);
            if failed {
                break;
            }
        }
        collected
    };

    if outcomes.len() < sweep.num_convergence || outcomes.iter().any(Option::is_none) {
        log::debug!("sweep: population {population} -");
        return Ok(None);
    }
    let n = outcomes.len() as f64;
    let (generations, nfe) = outcomes
        .iter()
        .flatten()
        .fold((0.0, 0.0), |(g, e), &(gen, nfe)| {
            (g + gen as f64, e + nfe as f64)
        });
    log::debug!("sweep: population {population} +");
    Ok(Some((generations / n, nfe / n)))
}

/// Deterministic per-trial seed derived from the sweep seed, the probed
/// population size and the trial index (splitmix64 finalizer).
fn trial_seed(base: u64, population: usize, trial: usize) -> u64 {
    let mut z = base ^ ((population as u64) << 32) ^ trial as u64;
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
