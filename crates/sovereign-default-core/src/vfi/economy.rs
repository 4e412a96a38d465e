//! Immutable model environment for one calibration.
//!
//! Holds the debt grid, the per-shock chains, the joint transition, the
//! endowment and trend adjustment per composite state, and the lender kernel.
//! Built once and shared read-only by every sweep.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::validate_preferences;
use crate::error::SovereignDefaultError;
use crate::exogenous::{CompositeIndex, JointTransition, MarkovChain};
use crate::pricing::LenderPricingKernel;
use crate::types::{Probability, Rate};
use crate::vfi::utility::crra;
use crate::SovereignDefaultResult;

/// Composite-index dimension of each shock.
pub const TREND_DIM: usize = 0;
pub const TRANSITORY_DIM: usize = 1;
pub const LONG_RUN_RISK_DIM: usize = 2;

/// Borrower preferences and default costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// CRRA curvature γ
    pub risk_aversion: f64,
    /// Discount factor β
    pub discount_factor: f64,
    /// Output loss in autarky δ
    pub autarky_penalty: f64,
    /// Re-entry probability λ
    pub reentry_probability: Probability,
}

#[derive(Debug)]
pub struct Economy {
    preferences: Preferences,
    world_interest_rate: Rate,
    debt_grid: Vec<f64>,
    zero_debt_index: usize,
    trend: MarkovChain,
    transitory: MarkovChain,
    long_run_risk: Option<MarkovChain>,
    transition: JointTransition,
    endowment: Vec<f64>,
    trend_factor: Vec<f64>,
    autarky_utility: Vec<f64>,
    lender: Box<dyn LenderPricingKernel>,
}

impl Economy {
    /// Assemble an economy from externally built shock chains.
    ///
    /// `debt_grid` must be ordered by debt owed, ascending (index 0 is the
    /// least debt) with every entry `<= 0`. `long_run_risk` adds a third
    /// exogenous dimension that affects only the lender's kernel.
    pub fn new(
        preferences: Preferences,
        world_interest_rate: Rate,
        debt_grid: Vec<f64>,
        trend: MarkovChain,
        transitory: MarkovChain,
        long_run_risk: Option<MarkovChain>,
        lender: Box<dyn LenderPricingKernel>,
    ) -> SovereignDefaultResult<Self> {
        validate_preferences(
            preferences.risk_aversion,
            preferences.discount_factor,
            world_interest_rate,
            preferences.autarky_penalty,
            preferences.reentry_probability,
        )?;
        validate_debt_grid(&debt_grid)?;

        let transition = match &long_run_risk {
            Some(x) => JointTransition::compose(&[&trend, &transitory, x])?,
            None => JointTransition::compose(&[&trend, &transitory])?,
        };
        let index = transition.index().clone();
        let states = index.len();

        if let Some(n) = lender.covered_states() {
            if n != states {
                return Err(SovereignDefaultError::config(
                    "lender",
                    format!("discount table covers {n} states, economy has {states}"),
                ));
            }
        }

        let mut endowment = Vec::with_capacity(states);
        let mut trend_factor = Vec::with_capacity(states);
        for s in 0..states {
            let g = trend.grid()[index.coordinate(s, TREND_DIM)];
            let z = transitory.grid()[index.coordinate(s, TRANSITORY_DIM)];
            endowment.push((g + z).exp());
            trend_factor.push(g.exp());
        }

        let gamma = preferences.risk_aversion;
        let autarky_utility = endowment
            .iter()
            .map(|y| crra((1.0 - preferences.autarky_penalty) * y, gamma))
            .collect();

        let zero_debt_index = debt_grid
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);

        debug!(
            states,
            debt_points = debt_grid.len(),
            lender = lender.label(),
            "economy assembled"
        );

        Ok(Self {
            preferences,
            world_interest_rate,
            debt_grid,
            zero_debt_index,
            trend,
            transitory,
            long_run_risk,
            transition,
            endowment,
            trend_factor,
            autarky_utility,
            lender,
        })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn world_interest_rate(&self) -> Rate {
        self.world_interest_rate
    }

    /// Number of composite exogenous states.
    pub fn states(&self) -> usize {
        self.transition.len()
    }

    pub fn debt_points(&self) -> usize {
        self.debt_grid.len()
    }

    pub fn debt_grid(&self) -> &[f64] {
        &self.debt_grid
    }

    /// Grid index of the asset position closest to zero.
    pub fn zero_debt_index(&self) -> usize {
        self.zero_debt_index
    }

    pub fn index(&self) -> &CompositeIndex {
        self.transition.index()
    }

    pub fn transition(&self) -> &JointTransition {
        &self.transition
    }

    pub fn trend_chain(&self) -> &MarkovChain {
        &self.trend
    }

    pub fn transitory_chain(&self) -> &MarkovChain {
        &self.transitory
    }

    pub fn long_run_risk_chain(&self) -> Option<&MarkovChain> {
        self.long_run_risk.as_ref()
    }

    pub fn lender(&self) -> &dyn LenderPricingKernel {
        self.lender.as_ref()
    }

    /// Detrended endowment `exp(g + z)` in composite state `s`.
    #[inline]
    pub fn endowment(&self, s: usize) -> f64 {
        self.endowment[s]
    }

    pub fn endowments(&self) -> &[f64] {
        &self.endowment
    }

    /// Growth adjustment `exp(g)` applied to next-period debt.
    #[inline]
    pub fn trend_factor(&self, s: usize) -> f64 {
        self.trend_factor[s]
    }

    /// Period utility of autarky consumption `(1 - δ) y(s)`.
    #[inline]
    pub fn autarky_utility(&self, s: usize) -> f64 {
        self.autarky_utility[s]
    }
}

fn validate_debt_grid(grid: &[f64]) -> SovereignDefaultResult<()> {
    if grid.is_empty() {
        return Err(SovereignDefaultError::config(
            "debt_grid.points",
            "grid size must be positive",
        ));
    }
    if grid.iter().any(|a| !a.is_finite() || *a > 0.0) {
        return Err(SovereignDefaultError::config(
            "debt_grid",
            "asset positions must be finite and non-positive",
        ));
    }
    if grid.windows(2).any(|w| w[1] >= w[0]) {
        return Err(SovereignDefaultError::config(
            "debt_grid",
            "grid must be ordered by debt owed, ascending (strictly decreasing assets)",
        ));
    }
    Ok(())
}
