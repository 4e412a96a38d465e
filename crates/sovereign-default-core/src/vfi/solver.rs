//! Value function iteration driver.
//!
//! The solver owns the current snapshot. Each step hands it to [`sweep`] by
//! shared reference, publishes the result as a whole and hands back the
//! snapshot it replaced together with that sweep's continuation values.
//!
//! States: `Initializing -> Iterating -> Converged`, or
//! `Iterating -> MaxIterationsExceeded`. Exhausting the iteration budget is
//! not an error; the best available snapshot is returned with
//! [`SolverStatus::MaxIterationsExceeded`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SovereignDefaultError;
use crate::vfi::economy::Economy;
use crate::vfi::policy::{extract_policy, PolicyTable};
use crate::vfi::sweep::sweep;
use crate::vfi::tables::{Snapshot, StateDebtTable};
use crate::vfi::utility::UtilitySurface;
use crate::SovereignDefaultResult;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Stop once `max(L1(ΔVG), L1(ΔVB))` falls below this.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Sweep budget.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Emit a debug event every this many sweeps (0 disables).
    #[serde(default = "default_log_every")]
    pub log_every: u32,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> u32 {
    10_000
}

fn default_log_every() -> u32 {
    100
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            log_every: default_log_every(),
        }
    }
}

impl SolverOptions {
    pub(crate) fn validate(&self) -> SovereignDefaultResult<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(SovereignDefaultError::config(
                "solver.tolerance",
                "must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(SovereignDefaultError::config(
                "solver.max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Initializing,
    Iterating,
    Converged,
    MaxIterationsExceeded,
}

/// Terminal outcome reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Converged,
    MaxIterationsExceeded,
}

/// Final snapshot plus what the policy extractor needs from the last sweep.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub iterations: u32,
    pub last_delta: f64,
    /// Output of the last sweep.
    pub snapshot: Snapshot,
    /// Input of the last sweep; its prices define the final utility surface.
    pub previous: Snapshot,
    /// Continuation values of the last sweep.
    pub continuation: StateDebtTable,
}

impl SolverResult {
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    /// Utility surface evaluated at the prices the last sweep used.
    pub fn utility_surface<'a>(&'a self, economy: &'a Economy) -> UtilitySurface<'a> {
        UtilitySurface::new(economy, &self.previous.price)
    }

    /// Debt policy at the fixed point.
    pub fn policy(&self, economy: &Economy) -> SovereignDefaultResult<PolicyTable> {
        extract_policy(
            &self.utility_surface(economy),
            &self.continuation,
            economy.preferences().discount_factor,
        )
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// What one step leaves behind besides the published snapshot.
struct Step {
    previous: Snapshot,
    continuation: StateDebtTable,
    delta: f64,
}

pub struct BellmanSolver<'e> {
    economy: &'e Economy,
    options: SolverOptions,
    current: Snapshot,
    iteration: u32,
    last_delta: f64,
    state: SolverState,
}

impl<'e> BellmanSolver<'e> {
    /// Start from zero values and default-free prices.
    pub fn new(economy: &'e Economy, options: SolverOptions) -> SovereignDefaultResult<Self> {
        let initial = Snapshot::initial(economy);
        Self::from_snapshot(economy, options, initial)
    }

    /// Warm start from an existing snapshot (e.g. a neighbouring
    /// calibration's solution).
    pub fn from_snapshot(
        economy: &'e Economy,
        options: SolverOptions,
        snapshot: Snapshot,
    ) -> SovereignDefaultResult<Self> {
        options.validate()?;
        let (n_s, n_a) = (economy.states(), economy.debt_points());
        if snapshot.good.states() != n_s
            || snapshot.good.debt_points() != n_a
            || snapshot.bad.len() != n_s
            || snapshot.price.states() != n_s
            || snapshot.price.debt_points() != n_a
        {
            return Err(SovereignDefaultError::config(
                "snapshot",
                format!("tables do not match the economy ({n_s} states x {n_a} debt points)"),
            ));
        }
        Ok(Self {
            economy,
            options,
            current: snapshot,
            iteration: 0,
            last_delta: f64::INFINITY,
            state: SolverState::Initializing,
        })
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Run one sweep and publish its snapshot. Returns the sweep's delta.
    pub fn step(&mut self) -> SovereignDefaultResult<f64> {
        self.advance().map(|step| step.delta)
    }

    fn advance(&mut self) -> SovereignDefaultResult<Step> {
        let outcome = sweep(self.economy, &self.current)?;
        let previous = std::mem::replace(&mut self.current, outcome.snapshot);
        self.iteration += 1;
        self.last_delta = outcome.delta;
        if self.state == SolverState::Initializing {
            self.state = SolverState::Iterating;
        }
        Ok(Step {
            previous,
            continuation: outcome.continuation,
            delta: outcome.delta,
        })
    }

    /// Iterate until the tolerance or the sweep budget is reached.
    pub fn run(mut self) -> SovereignDefaultResult<SolverResult> {
        info!(
            states = self.economy.states(),
            debt_points = self.economy.debt_points(),
            tolerance = self.options.tolerance,
            max_iterations = self.options.max_iterations,
            "starting value function iteration"
        );

        let every = self.options.log_every;
        let last = loop {
            let step = self.advance()?;
            if every > 0 && self.iteration % every == 0 {
                debug!(iteration = self.iteration, delta = step.delta, "sweep");
            }
            if step.delta < self.options.tolerance {
                self.state = SolverState::Converged;
                break step;
            }
            if self.iteration >= self.options.max_iterations {
                self.state = SolverState::MaxIterationsExceeded;
                break step;
            }
        };

        let status = if self.state == SolverState::Converged {
            info!(iterations = self.iteration, delta = self.last_delta, "converged");
            SolverStatus::Converged
        } else {
            warn!(
                iterations = self.iteration,
                delta = self.last_delta,
                tolerance = self.options.tolerance,
                "iteration budget exhausted before convergence"
            );
            SolverStatus::MaxIterationsExceeded
        };

        Ok(SolverResult {
            status,
            iterations: self.iteration,
            last_delta: self.last_delta,
            snapshot: self.current,
            previous: last.previous,
            continuation: last.continuation,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exogenous::MarkovChain;
    use crate::pricing::RiskNeutralLender;
    use crate::vfi::economy::Preferences;

    fn scenario_economy() -> Economy {
        Economy::new(
            Preferences {
                risk_aversion: 2.0,
                discount_factor: 0.8,
                autarky_penalty: 0.02,
                reentry_probability: 0.1,
            },
            0.01,
            vec![0.0, -0.05, -0.1, -0.15, -0.2],
            MarkovChain::degenerate("g", 0.0),
            MarkovChain::degenerate("z", 0.0),
            None,
            Box::new(RiskNeutralLender::new(0.01).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let economy = scenario_economy();
        let mut solver = BellmanSolver::new(&economy, SolverOptions::default()).unwrap();
        assert_eq!(solver.state(), SolverState::Initializing);
        solver.step().unwrap();
        assert_eq!(solver.state(), SolverState::Iterating);
        assert_eq!(solver.iteration(), 1);
    }

    #[test]
    fn test_converges_on_single_state_scenario() {
        let economy = scenario_economy();
        let result = BellmanSolver::new(&economy, SolverOptions::default())
            .unwrap()
            .run()
            .unwrap();
        assert!(result.converged());
        assert!(result.iterations < 10_000);
        assert!(result.last_delta < 1e-6);
    }

    #[test]
    fn test_budget_exhaustion_is_soft() {
        let economy = scenario_economy();
        let options = SolverOptions {
            max_iterations: 3,
            ..SolverOptions::default()
        };
        let result = BellmanSolver::new(&economy, options).unwrap().run().unwrap();
        assert_eq!(result.status, SolverStatus::MaxIterationsExceeded);
        assert_eq!(result.iterations, 3);
        assert!(result.last_delta >= 1e-6);
    }

    #[test]
    fn test_result_carries_last_sweep_inputs() {
        let economy = scenario_economy();
        let options = SolverOptions {
            max_iterations: 2,
            ..SolverOptions::default()
        };
        let result = BellmanSolver::new(&economy, options).unwrap().run().unwrap();
        // Re-running the final sweep from `previous` reproduces both outputs.
        let replay = sweep(&economy, &result.previous).unwrap();
        assert_eq!(replay.snapshot, result.snapshot);
        assert_eq!(replay.continuation, result.continuation);
        assert_eq!(replay.delta, result.last_delta);
    }

    #[test]
    fn test_single_sweep_budget() {
        let economy = scenario_economy();
        let options = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };
        let result = BellmanSolver::new(&economy, options).unwrap().run().unwrap();
        assert_eq!(result.iterations, 1);
        assert_eq!(result.previous, Snapshot::initial(&economy));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let economy = scenario_economy();
        let options = SolverOptions {
            tolerance: 0.0,
            ..SolverOptions::default()
        };
        assert!(BellmanSolver::new(&economy, options).is_err());
    }

    #[test]
    fn test_extra_sweep_at_fixed_point_is_idempotent() {
        let economy = scenario_economy();
        let result = BellmanSolver::new(&economy, SolverOptions::default())
            .unwrap()
            .run()
            .unwrap();
        let again = sweep(&economy, &result.snapshot).unwrap();
        assert!(again.delta < 1e-6);
        assert_eq!(again.snapshot.default, result.snapshot.default);
    }

    #[test]
    fn test_warm_start_dimension_check() {
        let economy = scenario_economy();
        let other = Economy::new(
            *economy.preferences(),
            0.01,
            vec![0.0, -0.1],
            MarkovChain::degenerate("g", 0.0),
            MarkovChain::degenerate("z", 0.0),
            None,
            Box::new(RiskNeutralLender::new(0.01).unwrap()),
        )
        .unwrap();
        let snapshot = Snapshot::initial(&other);
        assert!(BellmanSolver::from_snapshot(&economy, SolverOptions::default(), snapshot).is_err());
    }
}
