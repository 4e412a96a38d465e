//! Lender pricing kernels.
//!
//! A kernel supplies the factor `M(s, s')` that discounts a unit bond payoff
//! received in composite state `s'` when the bond is issued in state `s`.
//! Bond prices are then `q(s, a') = Σ_{s'} P(s, s') M(s, s') (1 - D(s', a'))`.

use std::fmt;

use serde::Serialize;

use crate::error::SovereignDefaultError;
use crate::exogenous::composite::CompositeIndex;
use crate::types::Rate;
use crate::SovereignDefaultResult;

pub trait LenderPricingKernel: fmt::Debug + Send + Sync {
    /// Discount factor applied to a payoff in `next` given `state` today.
    fn discount(&self, state: usize, next: usize) -> f64;

    /// Short label for reports.
    fn label(&self) -> &'static str;

    /// Number of composite states the kernel is defined over, when fixed.
    fn covered_states(&self) -> Option<usize> {
        None
    }
}

// ---------------------------------------------------------------------------
// Risk-neutral lender
// ---------------------------------------------------------------------------

/// Discounts every payoff at the world interest rate.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RiskNeutralLender {
    rate: Rate,
    factor: f64,
}

impl RiskNeutralLender {
    pub fn new(rate: Rate) -> SovereignDefaultResult<Self> {
        if !(rate > -1.0 && rate.is_finite()) {
            return Err(SovereignDefaultError::config(
                "world_interest_rate",
                "must be greater than -100%",
            ));
        }
        Ok(Self {
            rate,
            factor: 1.0 / (1.0 + rate),
        })
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }
}

impl LenderPricingKernel for RiskNeutralLender {
    #[inline]
    fn discount(&self, _state: usize, _next: usize) -> f64 {
        self.factor
    }

    fn label(&self) -> &'static str {
        "risk_neutral"
    }
}

// ---------------------------------------------------------------------------
// Precomputed stochastic discount factor
// ---------------------------------------------------------------------------

/// Dense `n x n` stochastic discount factor over composite states, supplied
/// by an external lender model.
#[derive(Debug, Clone, Serialize)]
pub struct StochasticDiscountTable {
    states: usize,
    factors: Vec<f64>,
}

impl StochasticDiscountTable {
    /// Table indexed directly by composite states: `factors[s][s']`.
    pub fn new(factors: Vec<Vec<f64>>) -> SovereignDefaultResult<Self> {
        let states = factors.len();
        if states == 0 || factors.iter().any(|row| row.len() != states) {
            return Err(SovereignDefaultError::config(
                "discount_factors",
                "table must be square and non-empty",
            ));
        }
        let flat: Vec<f64> = factors.into_iter().flatten().collect();
        check_entries(&flat)?;
        Ok(Self {
            states,
            factors: flat,
        })
    }

    /// Expand a table defined over one shock dimension (the lender's
    /// long-run-risk state) to every composite state pair, reading the
    /// coordinate along `dim` through `index`.
    pub fn from_dimension(
        index: &CompositeIndex,
        dim: usize,
        table: &[Vec<f64>],
    ) -> SovereignDefaultResult<Self> {
        if dim >= index.ndim() {
            return Err(SovereignDefaultError::config(
                "discount_factors",
                format!("dimension {dim} does not exist in the exogenous state"),
            ));
        }
        let n_dim = index.dims()[dim];
        if table.len() != n_dim || table.iter().any(|row| row.len() != n_dim) {
            return Err(SovereignDefaultError::config(
                "discount_factors",
                format!("expected a {n_dim}x{n_dim} table"),
            ));
        }

        let states = index.len();
        let mut factors = Vec::with_capacity(states * states);
        for s in 0..states {
            let x = index.coordinate(s, dim);
            for next in 0..states {
                factors.push(table[x][index.coordinate(next, dim)]);
            }
        }
        check_entries(&factors)?;
        Ok(Self { states, factors })
    }

    pub fn states(&self) -> usize {
        self.states
    }
}

impl LenderPricingKernel for StochasticDiscountTable {
    #[inline]
    fn discount(&self, state: usize, next: usize) -> f64 {
        self.factors[state * self.states + next]
    }

    fn label(&self) -> &'static str {
        "stochastic_discount_factor"
    }

    fn covered_states(&self) -> Option<usize> {
        Some(self.states)
    }
}

fn check_entries(factors: &[f64]) -> SovereignDefaultResult<()> {
    if factors.iter().any(|m| !m.is_finite() || *m < 0.0) {
        return Err(SovereignDefaultError::config(
            "discount_factors",
            "entries must be finite and non-negative",
        ));
    }
    Ok(())
}
