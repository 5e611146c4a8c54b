//! MAX-SAT instances in DIMACS CNF form.
//!
//! The parser accepts the usual SATLIB shape: `c` comment lines, a
//! `p cnf <vars> <clauses>` header, then space-separated signed literals
//! with `0` terminating each clause. Trailing `%`/`0` footer lines are
//! ignored once all clauses are read.

use crate::chromosome::Chromosome;
use crate::error::{Dsmga2Error, Result};
use std::path::Path;

const CONTEXT: &str = "DIMACS CNF";

/// A CNF formula; fitness is the fraction of satisfied clauses.
#[derive(Debug, Clone)]
pub struct SatInstance {
    num_vars: usize,
    clauses: Vec<Vec<i32>>,
}

impl SatInstance {
    /// Loads a formula from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Dsmga2Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            Dsmga2Error::Parse { reason, .. } => {
                Dsmga2Error::parse(path.display().to_string(), reason)
            }
            other => other,
        })
    }

    /// Parses DIMACS CNF text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut header: Option<(usize, usize)> = None;
        let mut clauses: Vec<Vec<i32>> = Vec::new();
        let mut current: Vec<i32> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('c') || line.starts_with('%') {
                continue;
            }
            if line.starts_with('p') {
                if header.is_some() {
                    return Err(Dsmga2Error::parse(CONTEXT, "duplicate problem line"));
                }
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() != 4 || fields[1] != "cnf" {
                    return Err(Dsmga2Error::parse(
                        CONTEXT,
                        format!("malformed problem line {line:?}"),
                    ));
                }
                let vars = fields[2]
                    .parse::<usize>()
                    .map_err(|_| Dsmga2Error::parse(CONTEXT, "invalid variable count"))?;
                let count = fields[3]
                    .parse::<usize>()
                    .map_err(|_| Dsmga2Error::parse(CONTEXT, "invalid clause count"))?;
                if vars == 0 {
                    return Err(Dsmga2Error::parse(CONTEXT, "variable count must be positive"));
                }
                header = Some((vars, count));
                continue;
            }

            let Some((vars, count)) = header else {
                return Err(Dsmga2Error::parse(CONTEXT, "literals before problem line"));
            };
            if clauses.len() == count {
                continue; // footer noise after the declared clauses
            }
            for token in line.split_whitespace() {
                let literal = token
                    .parse::<i32>()
                    .map_err(|_| Dsmga2Error::parse(CONTEXT, format!("invalid literal {token:?}")))?;
                if literal == 0 {
                    if !current.is_empty() {
                        clauses.push(std::mem::take(&mut current));
                    }
                } else {
                    if literal.unsigned_abs() as usize > vars {
                        return Err(Dsmga2Error::parse(
                            CONTEXT,
                            format!("literal {literal} out of range for {vars} variables"),
                        ));
                    }
                    current.push(literal);
                }
            }
        }

        let Some((vars, count)) = header else {
            return Err(Dsmga2Error::parse(CONTEXT, "missing problem line"));
        };
        if !current.is_empty() {
            clauses.push(current);
        }
        if clauses.len() != count {
            return Err(Dsmga2Error::parse(
                CONTEXT,
                format!("expected {count} clauses, found {}", clauses.len()),
            ));
        }
        Ok(Self {
            num_vars: vars,
            clauses,
        })
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Number of clauses.
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Fraction of clauses satisfied by the chromosome's assignment
    /// (locus `i` ↦ variable `i + 1`).
    pub fn evaluate(&self, ch: &Chromosome) -> f64 {
        let satisfied = self
            .clauses
            .iter()
            .filter(|clause| {
                clause.iter().any(|&literal| {
                    let value = ch.get(literal.unsigned_abs() as usize - 1);
                    if literal > 0 {
                        value
                    } else {
                        !value
                    }
                })
            })
            .count();
        satisfied as f64 / self.clauses.len() as f64
    }
}
