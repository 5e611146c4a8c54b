//! Engine configuration.
//!
//! [`Dsmga2Config`] holds all parameters that control the generational
//! loop and the mixing operators.

use super::selection::DonorSelection;
use crate::error::{Dsmga2Error, Result};

/// Configuration for the DSMGA-II engine.
///
/// # Defaults
///
/// ```
/// use dsmga2::engine::Dsmga2Config;
///
/// let config = Dsmga2Config::new(100);
/// assert_eq!(config.population_size, 50);
/// assert_eq!(config.stagnation_bound, 10);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use dsmga2::engine::{DonorSelection, Dsmga2Config};
///
/// let config = Dsmga2Config::new(100)
///     .with_population_size(200)
///     .with_max_generations(500)
///     .with_donor_selection(DonorSelection::Uniform)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone)]
pub struct Dsmga2Config {
    /// Problem size ℓ: the number of loci.
    pub problem_size: usize,

    /// Number of chromosomes in the population.
    ///
    /// Must be at least 10 and even; odd values are raised to the next
    /// even number at engine construction, with a warning.
    pub population_size: usize,

    /// Generation cap; `None` means unbounded.
    pub max_generations: Option<usize>,

    /// Evaluation cap (NFE); `None` means unbounded.
    pub max_evaluations: Option<u64>,

    /// How the donor of a restricted-mixing step is chosen.
    pub donor_selection: DonorSelection,

    /// Generations without an accepted restricted-mixing step before
    /// the run is declared stagnant. Set to 0 to disable.
    pub stagnation_bound: usize,

    /// How many generations an imposed pattern stays in a chromosome's
    /// back-mixing history before it may be tried again.
    pub history_window: usize,

    /// Fitness value that counts as reaching the optimum.
    ///
    /// `None` uses the objective's known optimum, when it has one.
    pub target_fitness: Option<f64>,

    /// Random seed for reproducibility; `None` draws one at construction.
    pub seed: Option<u64>,
}

impl Dsmga2Config {
    /// A configuration with defaults for the given problem size.
    pub fn new(problem_size: usize) -> Self {
        Self {
            problem_size,
            population_size: 50,
            max_generations: None,
            max_evaluations: None,
            donor_selection: DonorSelection::default(),
            stagnation_bound: 10,
            history_window: 5,
            target_fitness: None,
            seed: None,
        }
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the generation cap.
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = Some(n);
        self
    }

    /// Sets the evaluation cap.
    pub fn with_max_evaluations(mut self, n: u64) -> Self {
        self.max_evaluations = Some(n);
        self
    }

    /// Sets the donor selection strategy.
    pub fn with_donor_selection(mut self, selection: DonorSelection) -> Self {
        self.donor_selection = selection;
        self
    }

    /// Sets the stagnation bound (0 to disable).
    pub fn with_stagnation_bound(mut self, generations: usize) -> Self {
        self.stagnation_bound = generations;
        self
    }

    /// Sets the back-mixing history window in generations.
    pub fn with_history_window(mut self, generations: usize) -> Self {
        self.history_window = generations;
        self
    }

    /// Sets an explicit target fitness.
    pub fn with_target_fitness(mut self, target: f64) -> Self {
        self.target_fitness = Some(target);
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    ///
    /// Errors surface before any search begins. An odd population size is
    /// not an error here because the engine auto-corrects it.
    pub fn validate(&self) -> Result<()> {
        if self.problem_size == 0 {
            return Err(Dsmga2Error::Config("problem_size must be at least 1".into()));
        }
        if self.population_size < 10 {
            return Err(Dsmga2Error::Config(format!(
                "population_size must be at least 10, got {}",
                self.population_size
            )));
        }
        if self.max_generations == Some(0) {
            return Err(Dsmga2Error::Config("max_generations must not be zero".into()));
        }
        if self.max_evaluations == Some(0) {
            return Err(Dsmga2Error::Config("max_evaluations must not be zero".into()));
        }
        Ok(())
    }

    /// The population size the engine will actually use.
    pub(crate) fn effective_population(&self) -> usize {
        if self.population_size % 2 == 1 {
            log::warn!(
                "population_size {} is odd; raising to {}",
                self.population_size,
                self.population_size + 1
            );
            self.population_size + 1
        } else {
            self.population_size
        }
    }
}
