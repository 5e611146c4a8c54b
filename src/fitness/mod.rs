//! Fitness dispatch and evaluation accounting.
//!
//! The engine maximizes a scalar objective over binary strings. The
//! objective is a closed tagged variant over the known benchmark kinds
//! plus a `Custom` arm carrying an owned callback; dispatch is a `match`,
//! not virtual calls, and the number-of-fitness-evaluations (NFE) counter
//! lives in the [`Evaluator`] rather than in any global.
//!
//! # Key Types
//!
//! - [`Objective`]: the fitness kind and its static data
//! - [`Evaluator`]: owns the objective and the NFE counter
//!
//! # References
//!
//! - Deb & Goldberg (1993), "Analyzing Deception in Trap Functions"
//! - Kauffman (1993), *The Origins of Order* (NK landscapes)

mod nk;
mod sat;
mod spin;

pub use nk::NkLandscape;
pub use sat::SatInstance;
pub use spin::SpinGlass;

use crate::chromosome::Chromosome;
use crate::error::{Dsmga2Error, Result};
use std::fmt;

/// Trap block size used by the `mk_trap`/`cyc_trap` constructors.
pub const DEFAULT_TRAP_K: usize = 5;

/// Owned custom objective callback.
///
/// Must be pure and non-blocking; a non-finite return value is a fatal
/// evaluator error.
pub type ObjectiveFn = Box<dyn Fn(&Chromosome) -> f64 + Send + Sync>;

/// The objective function being maximized.
pub enum Objective {
    /// Number of one-bits.
    OneMax,
    /// Concatenated deceptive traps over consecutive blocks of `k` loci.
    MkTrap { k: usize },
    /// Bimodal folded trap over blocks of six loci.
    FTrap,
    /// Overlapping traps of `k` loci strided `k - 1`, wrapping at the end.
    CycTrap { k: usize },
    /// NK landscape loaded from an instance file.
    Nk(NkLandscape),
    /// MAX-SAT instance in DIMACS form; fitness is the satisfied fraction.
    Sat(SatInstance),
    /// Ising spin glass; fitness is the coupling sum over listed edges.
    Spin(SpinGlass),
    /// User-supplied callback, set after construction via
    /// [`Evaluator::set_custom_fn`].
    Custom(Option<ObjectiveFn>),
}

impl Objective {
    /// MK-trap with the default block size.
    pub fn mk_trap() -> Self {
        Objective::MkTrap { k: DEFAULT_TRAP_K }
    }

    /// Cyclic trap with the default block size.
    pub fn cyc_trap() -> Self {
        Objective::CycTrap { k: DEFAULT_TRAP_K }
    }

    /// An empty custom objective awaiting its callback.
    pub fn custom() -> Self {
        Objective::Custom(None)
    }

    /// Short tag naming the kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Objective::OneMax => "onemax",
            Objective::MkTrap { .. } => "mktrap",
            Objective::FTrap => "ftrap",
            Objective::CycTrap { .. } => "cyctrap",
            Objective::Nk(_) => "nk",
            Objective::Sat(_) => "sat",
            Objective::Spin(_) => "spin",
            Objective::Custom(_) => "custom",
        }
    }

    /// Whether this is the custom arm.
    pub fn is_custom(&self) -> bool {
        matches!(self, Objective::Custom(_))
    }

    /// Problem size the static data dictates, if any.
    pub fn expected_length(&self) -> Option<usize> {
        match self {
            Objective::Nk(nk) => Some(nk.ell()),
            Objective::Sat(sat) => Some(sat.num_vars()),
            Objective::Spin(spin) => Some(spin.ell()),
            _ => None,
        }
    }

    /// The known global optimum for a problem of `ell` loci, if one exists.
    pub fn known_optimum(&self, ell: usize) -> Option<f64> {
        match self {
            Objective::OneMax => Some(ell as f64),
            Objective::MkTrap { k } => Some(((ell / k) * k) as f64),
            Objective::FTrap => Some((ell / 6) as f64),
            Objective::CycTrap { k } => Some((ell / (k - 1) * k) as f64),
            Objective::Sat(_) => Some(1.0),
            Objective::Nk(_) | Objective::Spin(_) | Objective::Custom(_) => None,
        }
    }

    /// Clone of the objective for an independent engine, when possible.
    ///
    /// The custom arm owns an opaque callback and cannot be duplicated.
    pub fn try_clone(&self) -> Option<Objective> {
        match self {
            Objective::OneMax => Some(Objective::OneMax),
            Objective::MkTrap { k } => Some(Objective::MkTrap { k: *k }),
            Objective::FTrap => Some(Objective::FTrap),
            Objective::CycTrap { k } => Some(Objective::CycTrap { k: *k }),
            Objective::Nk(nk) => Some(Objective::Nk(nk.clone())),
            Objective::Sat(sat) => Some(Objective::Sat(sat.clone())),
            Objective::Spin(spin) => Some(Objective::Spin(spin.clone())),
            Objective::Custom(_) => None,
        }
    }

    fn raw_fitness(&self, ch: &Chromosome) -> Result<f64> {
        let value = match self {
            Objective::OneMax => ch.count_ones() as f64,
            Objective::MkTrap { k } => mk_trap_fitness(ch, *k),
            Objective::FTrap => f_trap_fitness(ch),
            Objective::CycTrap { k } => cyc_trap_fitness(ch, *k),
            Objective::Nk(nk) => nk.evaluate(ch),
            Objective::Sat(sat) => sat.evaluate(ch),
            Objective::Spin(spin) => spin.evaluate(ch),
            Objective::Custom(Some(f)) => f(ch),
            Objective::Custom(None) => {
                return Err(Dsmga2Error::Mode(
                    "custom objective has no callback set".into(),
                ))
            }
        };
        if !value.is_finite() {
            return Err(Dsmga2Error::Evaluator { value });
        }
        Ok(value)
    }
}

impl fmt::Debug for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::Custom(cb) => f
                .debug_struct("Custom")
                .field("callback_set", &cb.is_some())
                .finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Owns the objective and counts fitness evaluations.
///
/// NFE is incremented exactly when a chromosome transitions from
/// unevaluated to evaluated; cached reads are free.
#[derive(Debug)]
pub struct Evaluator {
    objective: Objective,
    nfe: u64,
}

impl Evaluator {
    /// Wraps an objective with a zeroed evaluation counter.
    pub fn new(objective: Objective) -> Self {
        Self { objective, nfe: 0 }
    }

    /// The wrapped objective.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Evaluations performed so far.
    pub fn nfe(&self) -> u64 {
        self.nfe
    }

    /// Installs (or replaces) the callback of a custom objective.
    ///
    /// Replacing drops the previous callback. Setting a callback on a
    /// predefined objective is a mode error.
    pub fn set_custom_fn(&mut self, f: ObjectiveFn) -> Result<()> {
        match &mut self.objective {
            Objective::Custom(slot) => {
                *slot = Some(f);
                Ok(())
            }
            other => Err(Dsmga2Error::Mode(format!(
                "cannot set a custom callback on the predefined objective '{}'",
                other.kind()
            ))),
        }
    }

    /// Errors if the objective cannot be evaluated yet.
    pub fn ensure_ready(&self) -> Result<()> {
        if let Objective::Custom(None) = self.objective {
            return Err(Dsmga2Error::Mode(
                "custom objective has no callback set".into(),
            ));
        }
        Ok(())
    }

    /// Fitness of a chromosome, from cache when valid.
    pub fn fitness_of(&mut self, ch: &mut Chromosome) -> Result<f64> {
        if let Some(cached) = ch.cached_fitness() {
            return Ok(cached);
        }
        let value = self.objective.raw_fitness(ch)?;
        self.nfe += 1;
        ch.store_fitness(value);
        Ok(value)
    }

    /// The known optimum for a problem of `ell` loci, if any.
    pub fn known_optimum(&self, ell: usize) -> Option<f64> {
        self.objective.known_optimum(ell)
    }
}

/// Deceptive trap contribution of one block with `unitary` one-bits.
///
/// The block scores `f_high` only when fully set; otherwise the score
/// decreases linearly from `f_low` as ones accumulate, which points
/// hill climbers away from the optimum.
fn trap(unitary: usize, f_high: f64, f_low: f64, k: usize) -> f64 {
    if unitary == k {
        f_high
    } else {
        f_low - unitary as f64 * f_low / (k - 1) as f64
    }
}

fn mk_trap_fitness(ch: &Chromosome, k: usize) -> f64 {
    let blocks = ch.len() / k;
    let mut result = 0.0;
    for block in 0..blocks {
        let unitary = (0..k).filter(|j| ch.get(block * k + j)).count();
        result += trap(unitary, k as f64, (k - 1) as f64, k);
    }
    result
}

fn f_trap_fitness(ch: &Chromosome) -> f64 {
    let mut result = 0.0;
    for block in 0..ch.len() / 6 {
        let unitary = (0..6).filter(|j| ch.get(block * 6 + j)).count();
        result += match unitary {
            0 | 6 => 1.0,
            1 | 5 => 0.0,
            2 | 4 => 0.4,
            _ => 0.8,
        };
    }
    result
}

fn cyc_trap_fitness(ch: &Chromosome, k: usize) -> f64 {
    let ell = ch.len();
    let blocks = ell / (k - 1);
    let mut result = 0.0;
    for block in 0..blocks {
        let start = block * (k - 1);
        let unitary = (0..k).filter(|j| ch.get((start + j) % ell)).count();
        result += trap(unitary, k as f64, (k - 1) as f64, k);
    }
    result
}
