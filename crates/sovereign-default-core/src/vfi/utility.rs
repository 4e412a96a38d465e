//! CRRA period utility and the lazily evaluated utility surface.

use crate::vfi::economy::Economy;
use crate::vfi::tables::StateDebtTable;

/// Recorded in place of utility when consumption is not positive.
pub const INFEASIBLE_UTILITY: f64 = -1.0e10;

/// `c^(1-γ) / (1-γ)`, or [`INFEASIBLE_UTILITY`] when `c <= 0`.
#[inline]
pub fn crra(consumption: f64, gamma: f64) -> f64 {
    if consumption <= 0.0 {
        INFEASIBLE_UTILITY
    } else {
        consumption.powf(1.0 - gamma) / (1.0 - gamma)
    }
}

/// Period utility `u(s, a, a')` for a given bond price schedule.
///
/// The surface is evaluated on demand rather than stored: a dense
/// `states x debt x debt` array grows too quickly with the grids.
#[derive(Debug, Clone, Copy)]
pub struct UtilitySurface<'a> {
    economy: &'a Economy,
    price: &'a StateDebtTable,
}

impl<'a> UtilitySurface<'a> {
    pub fn new(economy: &'a Economy, price: &'a StateDebtTable) -> Self {
        Self { economy, price }
    }

    pub fn economy(&self) -> &'a Economy {
        self.economy
    }

    /// `y(s) + a - q(s, a') a' exp(g(s))`.
    #[inline]
    pub fn consumption(&self, s: usize, debt: usize, next_debt: usize) -> f64 {
        let grid = self.economy.debt_grid();
        self.economy.endowment(s) + grid[debt]
            - self.price.get(s, next_debt) * grid[next_debt] * self.economy.trend_factor(s)
    }

    /// Utility, or `None` when consumption is not positive.
    #[inline]
    pub fn feasible(&self, s: usize, debt: usize, next_debt: usize) -> Option<f64> {
        let c = self.consumption(s, debt, next_debt);
        if c > 0.0 {
            Some(crra(c, self.economy.preferences().risk_aversion))
        } else {
            None
        }
    }

    /// Utility with the infeasible sentinel filled in.
    #[inline]
    pub fn at(&self, s: usize, debt: usize, next_debt: usize) -> f64 {
        self.feasible(s, debt, next_debt)
            .unwrap_or(INFEASIBLE_UTILITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crra_values() {
        assert!((crra(1.0, 2.0) + 1.0).abs() < 1e-15);
        assert!((crra(2.0, 2.0) + 0.5).abs() < 1e-15);
        assert!((crra(4.0, 0.5) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_crra_sentinel_for_non_positive_consumption() {
        assert_eq!(crra(0.0, 2.0), INFEASIBLE_UTILITY);
        assert_eq!(crra(-0.3, 2.0), INFEASIBLE_UTILITY);
        assert!(!crra(-0.3, 2.0).is_nan());
    }

    #[test]
    fn test_crra_increasing() {
        assert!(crra(1.1, 3.0) > crra(1.0, 3.0));
        assert!(crra(1.1, 0.5) > crra(1.0, 0.5));
    }
}
