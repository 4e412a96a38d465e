//! One application of the Bellman operator.
//!
//! A sweep reads a [`Snapshot`] and returns a new one; nothing in the input
//! is mutated. Per-state work is independent within a sweep, so with the
//! `parallel` feature it is spread across rayon workers. Every worker reads
//! only the previous snapshot.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::vfi::economy::Economy;
use crate::vfi::policy::best_choice;
use crate::vfi::tables::{DefaultTable, Snapshot, StateDebtTable};
use crate::vfi::utility::UtilitySurface;
use crate::SovereignDefaultResult;

/// Result of one sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// The updated snapshot.
    pub snapshot: Snapshot,
    /// `EV(s, a')` computed from the input snapshot.
    pub continuation: StateDebtTable,
    /// `max(L1(ΔVG), L1(ΔVB))` against the input snapshot.
    pub delta: f64,
}

/// Apply the Bellman operator to `previous`.
pub fn sweep(economy: &Economy, previous: &Snapshot) -> SovereignDefaultResult<SweepOutcome> {
    let prefs = economy.preferences();
    let beta = prefs.discount_factor;
    let lambda = prefs.reentry_probability;
    let n_a = economy.debt_points();
    let transition = economy.transition();

    // Continuation values over the combined value function
    let combined = previous.combined();
    let continuation = expected_continuation(economy, &combined);

    // Good standing: maximize over next-period debt at last sweep's prices
    let utility = UtilitySurface::new(economy, &previous.price);
    let good_rows = map_states(economy.states(), |s| {
        (0..n_a)
            .map(|debt| best_choice(&utility, &continuation, beta, s, debt).map(|(_, v)| v))
            .collect::<SovereignDefaultResult<Vec<f64>>>()
    })
    .into_iter()
    .collect::<SovereignDefaultResult<Vec<_>>>()?;
    let good = StateDebtTable::from_rows(n_a, good_rows);

    // Autarky: redemption at zero debt with probability λ
    let zero = economy.zero_debt_index();
    let good_at_zero: Vec<f64> = (0..economy.states())
        .map(|s| previous.good.get(s, zero))
        .collect();
    let bad: Vec<f64> = (0..economy.states())
        .map(|s| {
            let redeemed = transition.expect(s, &good_at_zero);
            let excluded = transition.expect(s, &previous.bad);
            economy.autarky_utility(s) + beta * (lambda * redeemed + (1.0 - lambda) * excluded)
        })
        .collect();

    let default = DefaultTable::from_values(&good, &bad);
    let price = price_schedule(economy, &default);

    let snapshot = Snapshot {
        good,
        bad,
        default,
        price,
    };
    let delta = snapshot.distance(previous);

    Ok(SweepOutcome {
        snapshot,
        continuation,
        delta,
    })
}

/// `EV(s, a') = Σ_{s'} P(s, s') V(s', a')`.
pub fn expected_continuation(economy: &Economy, values: &StateDebtTable) -> StateDebtTable {
    let n_a = values.debt_points();
    let transition = economy.transition();
    let rows = map_states(economy.states(), |s| {
        let mut row = vec![0.0; n_a];
        for (next, &p) in transition.row(s).iter().enumerate() {
            if p == 0.0 {
                continue;
            }
            for (acc, &v) in row.iter_mut().zip(values.row(next)) {
                *acc += p * v;
            }
        }
        row
    });
    StateDebtTable::from_rows(n_a, rows)
}

/// `q(s, a') = Σ_{s'} P(s, s') M(s, s') (1 - D(s', a'))`.
pub fn price_schedule(economy: &Economy, default: &DefaultTable) -> StateDebtTable {
    let n_a = economy.debt_points();
    let transition = economy.transition();
    let lender = economy.lender();
    let rows = map_states(economy.states(), |s| {
        let mut row = vec![0.0; n_a];
        for (next, &p) in transition.row(s).iter().enumerate() {
            if p == 0.0 {
                continue;
            }
            let weight = p * lender.discount(s, next);
            for (q, &defaults) in row.iter_mut().zip(default.row(next)) {
                if !defaults {
                    *q += weight;
                }
            }
        }
        row
    });
    StateDebtTable::from_rows(n_a, rows)
}

#[cfg(feature = "parallel")]
fn map_states<T, F>(states: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..states).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_states<T, F>(states: usize, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..states).map(f).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
