//! Crate-wide error type.
//!
//! Configuration and mode errors surface before any search begins;
//! evaluator failures surface at the end of the mixing step that observed
//! them. Budget exhaustion and stagnation are regular run outcomes, not
//! errors — see [`Dsmga2Result`](crate::engine::Dsmga2Result).

use std::path::PathBuf;
use thiserror::Error;

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Dsmga2Error>;

/// Errors reported by the DSMGA-II engine and its collaborators.
#[derive(Debug, Error)]
pub enum Dsmga2Error {
    /// Inconsistent construction parameters (e.g. `problem_size == 0`,
    /// `population_size < 10`, a zero evaluation budget).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An operation that contradicts the engine's objective mode, such as
    /// setting a custom callback on a predefined objective or optimizing a
    /// custom objective with no callback set.
    #[error("objective mode error: {0}")]
    Mode(String),

    /// A user-supplied objective returned NaN or ±∞.
    #[error("objective returned a non-finite fitness: {value}")]
    Evaluator { value: f64 },

    /// A problem file could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A problem file or bit string was syntactically invalid.
    #[error("malformed input {context}: {reason}")]
    Parse { context: String, reason: String },

    /// The sweep could not find any population size in range that reaches
    /// the optimum reliably.
    #[error("no population size in {min}..={max} converged in {trials} consecutive runs")]
    Sweep { min: usize, max: usize, trials: usize },
}

impl Dsmga2Error {
    pub(crate) fn parse(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Dsmga2Error::Parse {
            context: context.into(),
            reason: reason.into(),
        }
    }
}
