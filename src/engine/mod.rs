//! The DSMGA-II evolutionary engine.
//!
//! A steady-state generational loop over a population of bit-packed
//! chromosomes. Each generation rebuilds the pairwise mutual-information
//! model from the population, then applies two model-guided operators:
//! Restricted Mixing grows linkage-ordered masks against single targets,
//! and Back Mixing propagates the masks that worked to everyone else.
//!
//! # Key Types
//!
//! - [`Dsmga2Config`]: construction parameters and termination budgets
//! - [`Dsmga2`]: the engine; owns population, model, evaluator and RNG
//! - [`Dsmga2Result`]: best solution plus run statistics
//! - [`DonorSelection`]: how restricted mixing picks its donor
//!
//! # References
//!
//! - Hsu & Yu (2015), "Optimization by Pairwise Linkage Detection,
//!   Incremental Linkage Set, and Restricted/Back Mixing: DSMGA-II"
//! - Goldberg (2002), *The Design of Innovation*

mod config;
mod mixing;
mod runner;
mod selection;

pub use config::Dsmga2Config;
pub use runner::{Dsmga2, Dsmga2Result};
pub use selection::DonorSelection;
