//! Joint transition over the composite exogenous state.
//!
//! Shocks are independent Markov processes, so the probability of a composite
//! move is the product of the per-shock probabilities. Rows are laid out with
//! [`CompositeIndex`], first shock fastest.

use serde::Serialize;

use crate::error::SovereignDefaultError;
use crate::exogenous::composite::CompositeIndex;
use crate::exogenous::markov_chain::{MarkovChain, STOCHASTIC_TOLERANCE};
use crate::SovereignDefaultResult;

#[derive(Debug, Clone, Serialize)]
pub struct JointTransition {
    index: CompositeIndex,
    /// Row-major `len x len` probabilities.
    probabilities: Vec<f64>,
}

impl JointTransition {
    /// Compose 2 or 3 independent shock chains, in enumeration order.
    pub fn compose(chains: &[&MarkovChain]) -> SovereignDefaultResult<Self> {
        if !(2..=3).contains(&chains.len()) {
            return Err(SovereignDefaultError::config(
                "shocks",
                format!("expected 2 or 3 shock chains, got {}", chains.len()),
            ));
        }
        for chain in chains {
            if chain.max_row_error() > STOCHASTIC_TOLERANCE {
                return Err(SovereignDefaultError::transition(
                    chain.name(),
                    format!("row sums deviate from 1 by {}", chain.max_row_error()),
                ));
            }
        }

        let dims: Vec<usize> = chains.iter().map(|c| c.len()).collect();
        let index = CompositeIndex::new(&dims)?;
        let n = index.len();

        let mut probabilities = vec![0.0; n * n];
        for from in 0..n {
            let from_coords = index.unflatten(from);
            let row = &mut probabilities[from * n..(from + 1) * n];
            for (to, p) in row.iter_mut().enumerate() {
                *p = chains
                    .iter()
                    .enumerate()
                    .map(|(d, chain)| {
                        chain.probability(from_coords[d], index.coordinate(to, d))
                    })
                    .product();
            }
        }

        Ok(Self {
            index,
            probabilities,
        })
    }

    pub fn index(&self) -> &CompositeIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Distribution over next composite states given `state` today.
    #[inline]
    pub fn row(&self, state: usize) -> &[f64] {
        let n = self.index.len();
        &self.probabilities[state * n..(state + 1) * n]
    }

    #[inline]
    pub fn probability(&self, state: usize, next: usize) -> f64 {
        self.probabilities[state * self.index.len() + next]
    }

    /// Conditional expectation `Σ_{s'} P(state, s') values[s']`.
    #[inline]
    pub fn expect(&self, state: usize, values: &[f64]) -> f64 {
        debug_assert_eq!(values.len(), self.len());
        self.row(state)
            .iter()
            .zip(values)
            .map(|(p, v)| p * v)
            .sum()
    }

    /// Largest deviation of any row sum from one.
    pub fn max_row_error(&self) -> f64 {
        (0..self.len())
            .map(|s| (self.row(s).iter().sum::<f64>() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
