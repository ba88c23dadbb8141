//! Posterior draws container.

use std::collections::BTreeMap;

use crate::error::{ChangePointError, Result};

/// Per-parameter, per-chain, per-draw samples produced by one sampling run.
///
/// Immutable once built; every parameter has the same chain/draw shape so
/// draw `d` of chain `c` is one joint sample across all parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorDraws {
    params: BTreeMap<String, Vec<Vec<f64>>>,
    n_chains: usize,
    n_draws: usize,
    divergences: usize,
}

impl PosteriorDraws {
    /// Build from `name -> chains[chain][draw]`, checking the shape is rectangular
    /// and shared by all parameters.
    pub fn new(params: BTreeMap<String, Vec<Vec<f64>>>, divergences: usize) -> Result<Self> {
        let mut shape: Option<(usize, usize)> = None;
        for (name, chains) in &params {
            let n_chains = chains.len();
            let n_draws = chains.first().map(Vec::len).unwrap_or(0);
            if chains.iter().any(|c| c.len() != n_draws) {
                return Err(ChangePointError::InvalidInput(format!(
                    "ragged chains for parameter '{name}'"
                )));
            }
            match shape {
                None => shape = Some((n_chains, n_draws)),
                Some(s) if s != (n_chains, n_draws) => {
                    return Err(ChangePointError::InvalidInput(format!(
                        "parameter '{name}' has shape {n_chains}x{n_draws}, expected {}x{}",
                        s.0, s.1
                    )));
                }
                Some(_) => {}
            }
        }
        let (n_chains, n_draws) = shape.unwrap_or((0, 0));
        Ok(Self {
            params,
            n_chains,
            n_draws,
            divergences,
        })
    }

    /// Build from per-chain joint draws: `chains[chain][draw][param]`.
    pub(crate) fn from_joint(
        names: &[&str],
        chains: Vec<Vec<Vec<f64>>>,
        divergences: usize,
    ) -> Result<Self> {
        let mut params = BTreeMap::new();
        for (j, name) in names.iter().enumerate() {
            let per_chain: Vec<Vec<f64>> = chains
                .iter()
                .map(|draws| draws.iter().map(|theta| theta[j]).collect())
                .collect();
            params.insert((*name).to_string(), per_chain);
        }
        Self::new(params, divergences)
    }

    pub fn n_chains(&self) -> usize {
        self.n_chains
    }

    pub fn n_draws(&self) -> usize {
        self.n_draws
    }

    /// Divergent transitions recorded after warmup.
    pub fn divergences(&self) -> usize {
        self.divergences
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Chains for one parameter.
    pub fn chains(&self, name: &str) -> Result<&[Vec<f64>]> {
        self.params
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ChangePointError::InvalidInput(format!("no draws for parameter '{name}'")))
    }

    /// All chains concatenated in chain order.
    ///
    /// The flattening order is the same for every parameter, so index `k` of
    /// two pooled vectors refers to the same joint draw.
    pub fn pooled(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.chains(name)?.iter().flatten().copied().collect())
    }
}
