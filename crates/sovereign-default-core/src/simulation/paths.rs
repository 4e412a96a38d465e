//! Period-by-period path of a solved economy.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::ModelSolution;
use crate::vfi::economy::Economy;

/// One simulated period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub period: usize,
    /// Composite exogenous state
    pub state: usize,
    /// Asset position at the start of the period
    pub assets: f64,
    pub endowment: f64,
    pub consumption: f64,
    /// Excluded from credit markets this period
    pub excluded: bool,
    /// Defaulted at the start of this period
    pub defaulted: bool,
    /// Asset position chosen for next period (good standing only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_assets: Option<f64>,
    /// Price of the bond issued this period (good standing only), read from
    /// the schedule the policy was optimized against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
enum Standing {
    Good { debt: usize },
    Excluded,
}

/// Draw the next composite state from row `state` of the joint transition.
pub(crate) fn draw_next_state(economy: &Economy, state: usize, rng: &mut StdRng) -> usize {
    let u: f64 = rng.gen();
    let row = economy.transition().row(state);
    let mut cumulative = 0.0;
    for (next, &p) in row.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return next;
        }
    }
    // Rounding left the cumulative sum a hair below 1
    row.iter().rposition(|&p| p > 0.0).unwrap_or(state)
}

/// Simulate `periods` periods starting in `initial_state` with zero debt
/// and good standing.
pub(crate) fn simulate_path(
    economy: &Economy,
    solution: &ModelSolution,
    initial_state: usize,
    periods: usize,
    rng: &mut StdRng,
) -> Vec<PathPoint> {
    let prefs = economy.preferences();
    let grid = economy.debt_grid();
    let zero = economy.zero_debt_index();

    let mut path = Vec::with_capacity(periods);
    let mut state = initial_state;
    let mut standing = Standing::Good { debt: zero };

    for period in 0..periods {
        let y = economy.endowment(state);
        let point = match standing {
            Standing::Good { debt } if solution.defaults_at(state, debt) => {
                standing = Standing::Excluded;
                PathPoint {
                    period,
                    state,
                    assets: grid[debt],
                    endowment: y,
                    consumption: (1.0 - prefs.autarky_penalty) * y,
                    excluded: true,
                    defaulted: true,
                    next_assets: None,
                    price: None,
                }
            }
            Standing::Good { debt } => {
                let next = solution.policy_at(state, debt);
                // The schedule the policy was chosen against
                let q = solution.policy_price_at(state, next);
                let consumption = y + grid[debt] - q * grid[next] * economy.trend_factor(state);
                standing = Standing::Good { debt: next };
                PathPoint {
                    period,
                    state,
                    assets: grid[debt],
                    endowment: y,
                    consumption,
                    excluded: false,
                    defaulted: false,
                    next_assets: Some(grid[next]),
                    price: Some(q),
                }
            }
            Standing::Excluded => PathPoint {
                period,
                state,
                assets: grid[zero],
                endowment: y,
                consumption: (1.0 - prefs.autarky_penalty) * y,
                excluded: true,
                defaulted: false,
                next_assets: None,
                price: None,
            },
        };

        // Exclusion that starts or continues this period ends with
        // probability λ; re-entry is with zero debt.
        if point.excluded && rng.gen::<f64>() < prefs.reentry_probability {
            standing = Standing::Good { debt: zero };
        }

        path.push(point);
        state = draw_next_state(economy, state, rng);
    }
    path
}
