//! NK-landscape instances.
//!
//! File layout: a header line `ell K`, then for each of the `ell`
//! subfunctions `2^(K+1)` contribution values (one per line), then `ell`
//! lines each listing the `K+1` locus indices of that subfunction, first
//! index most significant when forming the lookup pattern.

use crate::chromosome::Chromosome;
use crate::error::{Dsmga2Error, Result};
use std::path::Path;

const CONTEXT: &str = "NK instance";

/// A loaded NK landscape: per-subfunction contribution tables plus
/// neighbour index lists.
#[derive(Debug, Clone)]
pub struct NkLandscape {
    ell: usize,
    k: usize,
    contributions: Vec<Vec<f64>>,
    neighbors: Vec<Vec<usize>>,
}

impl NkLandscape {
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

    /// Parses the instance text layout.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();

        let ell = parse_next::<usize>(&mut tokens, "problem size")?;
        let k = parse_next::<usize>(&mut tokens, "K")?;
        if ell == 0 {
            return Err(Dsmga2Error::parse(CONTEXT, "problem size must be positive"));
        }
        if k + 1 > ell {
            return Err(Dsmga2Error::parse(
                CONTEXT,
                format!("K + 1 = {} exceeds problem size {ell}", k + 1),
            ));
        }
        if k >= 30 {
            return Err(Dsmga2Error::parse(CONTEXT, format!("K = {k} is out of range")));
        }

        let table_len = 1usize << (k + 1);
        let mut contributions = Vec::with_capacity(ell);
        for sub in 0..ell {
            let mut table = Vec::with_capacity(table_len);
            for entry in 0..table_len {
                let what = format!("contribution {entry} of subfunction {sub}");
                table.push(parse_next::<f64>(&mut tokens, &what)?);
            }
            contributions.push(table);
        }

        let mut neighbors = Vec::with_capacity(ell);
        for sub in 0..ell {
            let mut loci = Vec::with_capacity(k + 1);
            for _ in 0..=k {
                let what = format!("locus index of subfunction {sub}");
                let locus = parse_next::<usize>(&mut tokens, &what)?;
                if locus >= ell {
                    return Err(Dsmga2Error::parse(
                        CONTEXT,
                        format!("locus {locus} out of range in subfunction {sub}"),
                    ));
                }
                loci.push(locus);
            }
            neighbors.push(loci);
        }

        Ok(Self {
            ell,
            k,
            contributions,
            neighbors,
        })
    }

    /// Problem size.
    pub fn ell(&self) -> usize {
        self.ell
    }

    /// Epistasis degree K.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Sum of subfunction contributions for the chromosome's bits.
    pub fn evaluate(&self, ch: &Chromosome) -> f64 {
        let mut result = 0.0;
        for (table, loci) in self.contributions.iter().zip(self.neighbors.iter()) {
            let mut pattern = 0usize;
            for &locus in loci {
                pattern = (pattern << 1) | usize::from(ch.get(locus));
            }
            result += table[pattern];
        }
        result
    }
}

fn parse_next<'a, T: std::str::FromStr>(
    tokens: &mut impl Iterator<Item = &'a str>,
    what: &str,
) -> Result<T> {
    let token = tokens
        .next()
        .ok_or_else(|| Dsmga2Error::parse(CONTEXT, format!("missing {what}")))?;
    token
        .parse::<T>()
        .map_err(|_| Dsmga2Error::parse(CONTEXT, format!("invalid {what}: {token:?}")))
}
