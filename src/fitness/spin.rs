//! Ising spin-glass instances.
//!
//! File layout: one line per locus, each listing `neighbour coupling`
//! pairs with couplings in {+1, −1}. Fitness is the sum of
//! `coupling · s_i · s_j` over the listed pairs, with spins
//! `s = 2·bit − 1`. Each pair contributes once per listing.

use crate::chromosome::Chromosome;
use crate::error::{Dsmga2Error, Result};
use std::path::Path;

const CONTEXT: &str = "spin-glass instance";

/// Coupling lists of an Ising spin glass.
#[derive(Debug, Clone)]
pub struct SpinGlass {
    couplings: Vec<Vec<(usize, i8)>>,
}

impl SpinGlass {
    /// Loads an instance from disk.
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

    /// Parses the instance text; the number of non-empty lines is the
    /// problem size.
    pub fn parse(text: &str) -> Result<Self> {
        let mut couplings = Vec::new();
        for (row, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() % 2 != 0 {
                return Err(Dsmga2Error::parse(
                    CONTEXT,
                    format!("line {row} holds an odd number of tokens"),
                ));
            }
            let mut edges = Vec::with_capacity(tokens.len() / 2);
            for pair in tokens.chunks(2) {
                let neighbor: usize = pair[0].parse().map_err(|_| {
                    Dsmga2Error::parse(CONTEXT, format!("invalid neighbour {:?} on line {row}", pair[0]))
                })?;
                let coupling: i8 = pair[1].parse().map_err(|_| {
                    Dsmga2Error::parse(CONTEXT, format!("invalid coupling {:?} on line {row}", pair[1]))
                })?;
                if coupling != 1 && coupling != -1 {
                    return Err(Dsmga2Error::parse(
                        CONTEXT,
                        format!("coupling {coupling} on line {row} is not ±1"),
                    ));
                }
                edges.push((neighbor, coupling));
            }
            couplings.push(edges);
        }
        if couplings.is_empty() {
            return Err(Dsmga2Error::parse(CONTEXT, "no locus lines"));
        }
        let ell = couplings.len();
        for (row, edges) in couplings.iter().enumerate() {
            for &(neighbor, _) in edges {
                if neighbor >= ell {
                    return Err(Dsmga2Error::parse(
                        CONTEXT,
                        format!("neighbour {neighbor} on line {row} out of range for {ell} loci"),
                    ));
                }
            }
        }
        Ok(Self { couplings })
    }

    /// Problem size.
    pub fn ell(&self) -> usize {
        self.couplings.len()
    }

    /// Coupling sum for the chromosome's spin assignment.
    pub fn evaluate(&self, ch: &Chromosome) -> f64 {
        let spin = |i: usize| if ch.get(i) { 1.0 } else { -1.0 };
        let mut energy = 0.0;
        for (i, edges) in self.couplings.iter().enumerate() {
            for &(j, coupling) in edges {
                energy += f64::from(coupling) * spin(i) * spin(j);
            }
        }
        energy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Three spins on a line: 0-1 ferromagnetic, 1-2 antiferromagnetic,
    // the second edge listed from both ends.
    const CHAIN: &str = "1 1\n2 -1\n1 -1\n";

    #[test]
    fn test_parse_chain() {
        let spin = SpinGlass::parse(CHAIN).expect("parse");
        assert_eq!(spin.ell(), 3);
    }

    #[test]
    fn test_evaluate_spins() {
        let spin = SpinGlass::parse("1 1\n0 1\n").expect("parse");
        // Aligned spins on a ferromagnetic pair listed from both ends.
        let mut ch = Chromosome::new(2);
        assert_eq!(spin.evaluate(&ch), 2.0);
        ch.set(0, true);
        assert_eq!(spin.evaluate(&ch), -2.0);
        ch.set(1, true);
        assert_eq!(spin.evaluate(&ch), 2.0);
    }

    #[test]
    fn test_parse_rejects_bad_coupling() {
        assert!(matches!(
            SpinGlass::parse("1 3\n0 1\n").unwrap_err(),
            Dsmga2Error::Parse { .. }
        ));
    }

    #[test]
    fn test_parse_rejects_out_of_range_neighbour() {
        assert!(matches!(
            SpinGlass::parse("5 1\n0 1\n").unwrap_err(),
            Dsmga2Error::Parse { .. }
        ));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            SpinGlass::parse("\n\n").unwrap_err(),
            Dsmga2Error::Parse { .. }
        ));
    }
}
