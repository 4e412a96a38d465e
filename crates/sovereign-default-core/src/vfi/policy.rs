//! Policy extraction: the next-period debt choice that attains the Bellman
//! maximum in good standing.

use serde::Serialize;

use crate::error::SovereignDefaultError;
use crate::vfi::tables::StateDebtTable;
use crate::vfi::utility::UtilitySurface;
use crate::SovereignDefaultResult;

/// Choices within this distance of the maximum count as tied; the
/// smallest tied index (lowest debt) wins.
pub const TIE_TOLERANCE: f64 = 1e-12;

/// Optimal next-period debt index for every (state, debt).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyTable {
    states: usize,
    debt_points: usize,
    choices: Vec<usize>,
}

impl PolicyTable {
    #[inline]
    pub fn get(&self, s: usize, debt: usize) -> usize {
        self.choices[s * self.debt_points + debt]
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn debt_points(&self) -> usize {
        self.debt_points
    }

    pub fn choices(&self) -> &[usize] {
        &self.choices
    }

    /// Chosen next-period asset positions.
    pub fn levels(&self, debt_grid: &[f64]) -> Vec<f64> {
        self.choices.iter().map(|&i| debt_grid[i]).collect()
    }

    pub fn into_choices(self) -> Vec<usize> {
        self.choices
    }
}

/// Maximize `u(s, a, a') + β EV(s, a')` over `a'`.
///
/// Returns the first index whose value is within [`TIE_TOLERANCE`] of the
/// maximum, together with that value. Fails with `CalibrationError` when no
/// `a'` yields positive consumption.
#[inline]
pub(crate) fn best_choice(
    utility: &UtilitySurface<'_>,
    continuation: &StateDebtTable,
    beta: f64,
    s: usize,
    debt: usize,
) -> SovereignDefaultResult<(usize, f64)> {
    let value_of = |next: usize| {
        utility
            .feasible(s, debt, next)
            .map(|u| u + beta * continuation.get(s, next))
    };
    let n = continuation.debt_points();

    let max = (0..n)
        .filter_map(&value_of)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));

    let Some(max) = max else {
        let economy = utility.economy();
        return Err(SovereignDefaultError::CalibrationError(format!(
            "no debt choice gives positive consumption in state {s} (endowment {:.6}) at asset level {:.6}; widen or shift the debt grid",
            economy.endowment(s),
            economy.debt_grid()[debt],
        )));
    };

    // The maximizer itself always qualifies
    let chosen = (0..n)
        .find_map(|next| {
            value_of(next)
                .filter(|&v| v >= max - TIE_TOLERANCE)
                .map(|v| (next, v))
        })
        .unwrap_or((0, max));
    Ok(chosen)
}

/// Recover the optimal debt policy from a sweep's utility surface and
/// continuation values, using the same maximization and tie-break as the
/// good-standing update.
pub fn extract_policy(
    utility: &UtilitySurface<'_>,
    continuation: &StateDebtTable,
    beta: f64,
) -> SovereignDefaultResult<PolicyTable> {
    let states = continuation.states();
    let debt_points = continuation.debt_points();
    let mut choices = Vec::with_capacity(states * debt_points);
    for s in 0..states {
        for debt in 0..debt_points {
            let (next, _) = best_choice(utility, continuation, beta, s, debt)?;
            choices.push(next);
        }
    }
    Ok(PolicyTable {
        states,
        debt_points,
        choices,
    })
}
