//! Dense tables over (exogenous state, debt) and the per-sweep snapshot.
//!
//! Layout is state-major, debt-minor: entry `(s, a)` lives at
//! `s * debt_points + a`, with `s` the composite exogenous index.

use serde::Serialize;

use crate::vfi::economy::Economy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDebtTable {
    states: usize,
    debt_points: usize,
    values: Vec<f64>,
}

impl StateDebtTable {
    pub fn filled(states: usize, debt_points: usize, value: f64) -> Self {
        Self {
            states,
            debt_points,
            values: vec![value; states * debt_points],
        }
    }

    /// Build from one row per state.
    pub fn from_rows(debt_points: usize, rows: Vec<Vec<f64>>) -> Self {
        let states = rows.len();
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        debug_assert_eq!(values.len(), states * debt_points);
        Self {
            states,
            debt_points,
            values,
        }
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn debt_points(&self) -> usize {
        self.debt_points
    }

    #[inline]
    pub fn get(&self, s: usize, debt: usize) -> f64 {
        self.values[s * self.debt_points + debt]
    }

    #[inline]
    pub fn row(&self, s: usize) -> &[f64] {
        &self.values[s * self.debt_points..(s + 1) * self.debt_points]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Sum of absolute entry-wise differences.
    pub fn l1_distance(&self, other: &StateDebtTable) -> f64 {
        l1_distance(&self.values, &other.values)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Default decisions over (state, debt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultTable {
    states: usize,
    debt_points: usize,
    flags: Vec<bool>,
}

impl DefaultTable {
    pub fn none(states: usize, debt_points: usize) -> Self {
        Self {
            states,
            debt_points,
            flags: vec![false; states * debt_points],
        }
    }

    /// `D(s, a) = VG(s, a) < VB(s)`; indifference keeps the country in
    /// good standing.
    pub fn from_values(good: &StateDebtTable, bad: &[f64]) -> Self {
        let debt_points = good.debt_points();
        let flags = (0..good.states())
            .flat_map(|s| good.row(s).iter().map(move |&vg| vg < bad[s]))
            .collect();
        Self {
            states: good.states(),
            debt_points,
            flags,
        }
    }

    #[inline]
    pub fn get(&self, s: usize, debt: usize) -> bool {
        self.flags[s * self.debt_points + debt]
    }

    pub fn row(&self, s: usize) -> &[bool] {
        &self.flags[s * self.debt_points..(s + 1) * self.debt_points]
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn into_flags(self) -> Vec<bool> {
        self.flags
    }

    /// Fraction of (state, debt) cells in default.
    pub fn share(&self) -> f64 {
        if self.flags.is_empty() {
            return 0.0;
        }
        self.flags.iter().filter(|&&d| d).count() as f64 / self.flags.len() as f64
    }
}

/// Everything one sweep reads and the next sweep replaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Good-standing value VG(s, a)
    pub good: StateDebtTable,
    /// Autarky value VB(s)
    pub bad: Vec<f64>,
    /// Default indicator consistent with `good` and `bad`
    pub default: DefaultTable,
    /// Bond price q(s, a') implied by `default`
    pub price: StateDebtTable,
}

impl Snapshot {
    /// Zero values, no default, default-free prices.
    pub fn initial(economy: &Economy) -> Self {
        let (n_s, n_a) = (economy.states(), economy.debt_points());
        let default = DefaultTable::none(n_s, n_a);
        let price = crate::vfi::sweep::price_schedule(economy, &default);
        Self {
            good: StateDebtTable::filled(n_s, n_a, 0.0),
            bad: vec![0.0; n_s],
            default,
            price,
        }
    }

    /// `V(s, a) = max(VG(s, a), VB(s))`.
    pub fn combined(&self) -> StateDebtTable {
        let n_a = self.good.debt_points();
        let rows = (0..self.good.states())
            .map(|s| self.good.row(s).iter().map(|&vg| vg.max(self.bad[s])).collect())
            .collect();
        StateDebtTable::from_rows(n_a, rows)
    }

    /// Autarky value broadcast over the debt dimension.
    pub fn bad_by_debt(&self) -> StateDebtTable {
        let n_a = self.good.debt_points();
        let rows = self.bad.iter().map(|&vb| vec![vb; n_a]).collect();
        StateDebtTable::from_rows(n_a, rows)
    }

    /// `max(L1(VG - VG_other), L1(VB - VB_other))`.
    pub fn distance(&self, other: &Snapshot) -> f64 {
        self.good
            .l1_distance(&other.good)
            .max(l1_distance(&self.bad, &other.bad))
    }
}

pub fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}
