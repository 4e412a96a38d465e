//! Sovereign default model: calibration in, solved tables out.
//!
//! Builds the [`Economy`] from a [`Calibration`] (Tauchen grids for every
//! active shock, the lender kernel, the debt grid), runs value function
//! iteration, extracts the debt policy and packages everything in a
//! serializable [`ModelSolution`].

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, LenderSpec};
use crate::error::SovereignDefaultError;
use crate::exogenous::tauchen;
use crate::pricing::{LenderPricingKernel, RiskNeutralLender, StochasticDiscountTable};
use crate::types::{with_metadata, ComputationOutput};
use crate::vfi::economy::{Economy, Preferences, LONG_RUN_RISK_DIM};
use crate::vfi::solver::{BellmanSolver, SolverOptions, SolverStatus};
use crate::SovereignDefaultResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Headline numbers for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSummary {
    /// Share of (state, debt) cells in the default region
    pub default_region_share: f64,
    /// True when no state defaults at the lowest debt level
    pub no_default_at_zero_debt: bool,
    pub min_price: f64,
    pub max_price: f64,
    /// Largest spread `1/q - (1 + r)` over cells with a positive price
    pub max_spread: Option<f64>,
    /// Deepest asset position that still commands a positive price in
    /// every state, if any
    pub max_sustainable_debt: Option<f64>,
    /// Widest spread across states at `max_sustainable_debt`
    pub spread_at_max_sustainable_debt: Option<f64>,
}

/// Converged (or best-effort) solution. Dense tables are state-major,
/// debt-minor; the composite exogenous index has the trend shock varying
/// fastest, then the transitory shock, then the long-run-risk state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSolution {
    pub status: SolverStatus,
    pub iterations: u32,
    pub last_delta: f64,
    pub exogenous_dims: Vec<usize>,
    pub trend_grid: Vec<f64>,
    pub transitory_grid: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_run_risk_grid: Option<Vec<f64>>,
    /// Ordered by debt owed, ascending
    pub debt_grid: Vec<f64>,
    pub endowment: Vec<f64>,
    pub good_value: Vec<f64>,
    pub bad_value: Vec<f64>,
    pub default: Vec<bool>,
    /// Price schedule implied by the final default table
    pub price: Vec<f64>,
    /// Price schedule the policy was optimized against (the input of the
    /// last sweep). Equal to `price` at a fixed point.
    pub policy_price: Vec<f64>,
    pub policy_index: Vec<usize>,
    pub policy_debt: Vec<f64>,
    pub summary: SolutionSummary,
}

impl ModelSolution {
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    /// Turn a best-effort solution into a hard `NonConvergence` error.
    pub fn require_converged(self) -> SovereignDefaultResult<Self> {
        if self.converged() {
            Ok(self)
        } else {
            Err(SovereignDefaultError::NonConvergence {
                iterations: self.iterations,
                last_delta: self.last_delta,
            })
        }
    }

    pub fn states(&self) -> usize {
        self.bad_value.len()
    }

    pub fn debt_points(&self) -> usize {
        self.debt_grid.len()
    }

    #[inline]
    fn cell(&self, s: usize, debt: usize) -> usize {
        s * self.debt_grid.len() + debt
    }

    pub fn good_value_at(&self, s: usize, debt: usize) -> f64 {
        self.good_value[self.cell(s, debt)]
    }

    pub fn defaults_at(&self, s: usize, debt: usize) -> bool {
        self.default[self.cell(s, debt)]
    }

    pub fn price_at(&self, s: usize, next_debt: usize) -> f64 {
        self.price[self.cell(s, next_debt)]
    }

    pub fn policy_price_at(&self, s: usize, next_debt: usize) -> f64 {
        self.policy_price[self.cell(s, next_debt)]
    }

    pub fn policy_at(&self, s: usize, debt: usize) -> usize {
        self.policy_index[self.cell(s, debt)]
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Discretize every shock in `calibration` and assemble the economy.
pub fn build_economy(calibration: &Calibration) -> SovereignDefaultResult<Economy> {
    calibration.validate()?;

    let debt_grid = calibration.debt_grid.build()?;
    let trend = tauchen::discretize("trend_shock", &calibration.effective_trend())?;
    let transitory = tauchen::discretize("transitory_shock", &calibration.effective_transitory())?;

    let preferences = Preferences {
        risk_aversion: calibration.risk_aversion,
        discount_factor: calibration.discount_factor,
        autarky_penalty: calibration.autarky_penalty,
        reentry_probability: calibration.reentry_probability,
    };

    match &calibration.lender {
        LenderSpec::RiskNeutral => Economy::new(
            preferences,
            calibration.world_interest_rate,
            debt_grid,
            trend,
            transitory,
            None,
            Box::new(RiskNeutralLender::new(calibration.world_interest_rate)?),
        ),
        LenderSpec::RiskAverse {
            long_run_risk,
            discount_factors,
        } => {
            let x = tauchen::discretize("long_run_risk", long_run_risk)?;
            let index = crate::exogenous::CompositeIndex::new(&[
                trend.len(),
                transitory.len(),
                x.len(),
            ])?;
            let sdf =
                StochasticDiscountTable::from_dimension(&index, LONG_RUN_RISK_DIM, discount_factors)?;
            Economy::new(
                preferences,
                calibration.world_interest_rate,
                debt_grid,
                trend,
                transitory,
                Some(x),
                Box::new(sdf),
            )
        }
    }
}

/// Solve an already assembled economy.
pub fn solve_economy(
    economy: &Economy,
    options: SolverOptions,
) -> SovereignDefaultResult<ModelSolution> {
    let result = BellmanSolver::new(economy, options)?.run()?;
    let policy = result.policy(economy)?;
    let snapshot = &result.snapshot;

    let summary = summarize(economy, snapshot);

    Ok(ModelSolution {
        status: result.status,
        iterations: result.iterations,
        last_delta: result.last_delta,
        exogenous_dims: economy.index().dims().to_vec(),
        trend_grid: economy.trend_chain().grid().to_vec(),
        transitory_grid: economy.transitory_chain().grid().to_vec(),
        long_run_risk_grid: economy.long_run_risk_chain().map(|c| c.grid().to_vec()),
        debt_grid: economy.debt_grid().to_vec(),
        endowment: economy.endowments().to_vec(),
        good_value: snapshot.good.values().to_vec(),
        bad_value: snapshot.bad.clone(),
        default: snapshot.default.flags().to_vec(),
        price: snapshot.price.values().to_vec(),
        policy_price: result.previous.price.values().to_vec(),
        policy_debt: policy.levels(economy.debt_grid()),
        policy_index: policy.into_choices(),
        summary,
    })
}

/// Solve the sovereign default model for `calibration`.
pub fn solve_sovereign_default(
    calibration: &Calibration,
) -> SovereignDefaultResult<ComputationOutput<ModelSolution>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let economy = build_economy(calibration)?;
    let solution = solve_economy(&economy, calibration.solver)?;

    if !solution.converged() {
        warnings.push(format!(
            "Value function iteration stopped after {} sweeps with delta {:e} (tolerance {:e}); tables are a best-effort approximation",
            solution.iterations, solution.last_delta, calibration.solver.tolerance
        ));
    }
    if !solution.summary.no_default_at_zero_debt {
        warnings.push("Default occurs at the lowest debt level in some state".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sovereign default model, value function iteration with endogenous bond pricing",
        &serde_json::json!({
            "mode": calibration.mode,
            "lender": economy.lender().label(),
            "exogenous_dims": economy.index().dims(),
            "debt_points": economy.debt_points(),
            "tolerance": calibration.solver.tolerance,
            "max_iterations": calibration.solver.max_iterations,
        }),
        warnings,
        elapsed,
        solution,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn summarize(economy: &Economy, snapshot: &crate::vfi::tables::Snapshot) -> SolutionSummary {
    let n_s = economy.states();
    let zero = economy.zero_debt_index();
    let gross = 1.0 + economy.world_interest_rate();

    let max_spread = snapshot
        .price
        .values()
        .iter()
        .filter(|&&q| q > 0.0)
        .map(|&q| 1.0 / q - gross)
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))));

    // Debt owed grows with the index, so the deepest level is the last one
    let deepest = (0..economy.debt_points())
        .rev()
        .find(|&a| (0..n_s).all(|s| snapshot.price.get(s, a) > 0.0));
    let max_sustainable_debt = deepest.map(|a| economy.debt_grid()[a]);
    let spread_at_max_sustainable_debt = deepest.map(|a| {
        (0..n_s)
            .map(|s| 1.0 / snapshot.price.get(s, a) - gross)
            .fold(f64::NEG_INFINITY, f64::max)
    });

    SolutionSummary {
        default_region_share: snapshot.default.share(),
        no_default_at_zero_debt: (0..n_s).all(|s| !snapshot.default.get(s, zero)),
        min_price: snapshot.price.min(),
        max_price: snapshot.price.max(),
        max_spread,
        max_sustainable_debt,
        spread_at_max_sustainable_debt,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{DebtGridSpec, ShockMode, ShockProcess};

    fn shock(mean: f64, points: usize) -> ShockProcess {
        ShockProcess {
            mean,
            persistence: 0.5,
            volatility: 0.02,
            span: 2.0,
            points,
        }
    }

    fn calibration() -> Calibration {
        Calibration {
            risk_aversion: 2.0,
            discount_factor: 0.8,
            world_interest_rate: 0.01,
            autarky_penalty: 0.02,
            reentry_probability: 0.1,
            debt_grid: DebtGridSpec {
                min: -0.2,
                max: 0.0,
                points: 5,
            },
            mode: ShockMode::Complete,
            trend_shock: shock(0.0, 1),
            transitory_shock: shock(0.0, 1),
            lender: LenderSpec::RiskNeutral,
            solver: SolverOptions::default(),
        }
    }

    #[test]
    fn test_envelope_metadata() {
        let out = solve_sovereign_default(&calibration()).unwrap();
        assert_eq!(out.metadata.precision, "ieee754_f64");
        assert!(out.warnings.is_empty());
        assert!(out.result.converged());
        assert_eq!(out.result.exogenous_dims, vec![1, 1]);
    }

    #[test]
    fn test_mode_drives_dimensions() {
        let cal = Calibration {
            mode: ShockMode::Transitory,
            trend_shock: shock(0.0, 3),
            transitory_shock: shock(0.0, 3),
            ..calibration()
        };
        let economy = build_economy(&cal).unwrap();
        assert_eq!(economy.index().dims(), &[1, 3]);

        let cal = Calibration {
            mode: ShockMode::Permanent,
            ..cal
        };
        let economy = build_economy(&cal).unwrap();
        assert_eq!(economy.index().dims(), &[3, 1]);
    }

    #[test]
    fn test_non_convergence_warning_and_strict_conversion() {
        let cal = Calibration {
            solver: SolverOptions {
                max_iterations: 2,
                ..SolverOptions::default()
            },
            ..calibration()
        };
        let out = solve_sovereign_default(&cal).unwrap();
        assert_eq!(out.result.status, SolverStatus::MaxIterationsExceeded);
        assert!(out.warnings.iter().any(|w| w.contains("best-effort")));
        match out.result.require_converged().unwrap_err() {
            SovereignDefaultError::NonConvergence { iterations, .. } => assert_eq!(iterations, 2),
            other => panic!("Expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_risk_averse_dimensions() {
        let cal = Calibration {
            lender: LenderSpec::RiskAverse {
                long_run_risk: shock(0.0, 2),
                discount_factors: vec![vec![0.99, 0.98], vec![0.985, 0.99]],
            },
            ..calibration()
        };
        let economy = build_economy(&cal).unwrap();
        assert_eq!(economy.index().dims(), &[1, 1, 2]);
        assert_eq!(economy.lender().label(), "stochastic_discount_factor");
    }

    #[test]
    fn test_spread_reported_at_deepest_priced_level() {
        let out = solve_sovereign_default(&calibration()).unwrap();
        let sol = &out.result;
        // No default anywhere in this economy: every level is priced at 1/(1+r).
        assert_eq!(sol.summary.max_sustainable_debt, Some(-0.2));
        let spread = sol.summary.spread_at_max_sustainable_debt.unwrap();
        assert!(spread.abs() < 1e-12);
    }

    #[test]
    fn test_spread_at_deepest_level_reflects_default_risk() {
        let economy = build_economy(&calibration()).unwrap();
        let n_a = economy.debt_points();
        // Default in the only state at the two deepest levels.
        let good = crate::vfi::tables::StateDebtTable::from_rows(
            n_a,
            vec![vec![0.0, 0.0, 0.0, -1.0, -1.0]],
        );
        let default = crate::vfi::tables::DefaultTable::from_values(&good, &[-0.5]);
        let price = crate::vfi::sweep::price_schedule(&economy, &default);
        let snapshot = crate::vfi::tables::Snapshot {
            good,
            bad: vec![-0.5],
            default,
            price,
        };
        let summary = summarize(&economy, &snapshot);
        assert_eq!(summary.max_sustainable_debt, Some(economy.debt_grid()[2]));
        assert!(summary.spread_at_max_sustainable_debt.unwrap().abs() < 1e-12);
        assert!((summary.default_region_share - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_policy_prices_are_last_sweep_inputs() {
        let economy = build_economy(&calibration()).unwrap();
        let options = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };
        let sol = solve_economy(&economy, options).unwrap();
        // One sweep reads the default-free initial schedule.
        for &q in &sol.policy_price {
            assert!((q - 1.0 / 1.01).abs() < 1e-12);
        }
        assert_eq!(sol.policy_price.len(), sol.price.len());
    }

    #[test]
    fn test_solution_accessors_follow_layout() {
        let out = solve_sovereign_default(&calibration()).unwrap();
        let sol = &out.result;
        assert_eq!(sol.states(), 1);
        assert_eq!(sol.debt_points(), 5);
        assert_eq!(sol.good_value_at(0, 3), sol.good_value[3]);
        assert_eq!(sol.policy_debt[2], sol.debt_grid[sol.policy_at(0, 2)]);
    }
}
