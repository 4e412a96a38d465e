//! Simulated moments of a solved sovereign default model.
//!
//! Draws a path of the composite exogenous chain, follows the debt policy
//! and default decisions of the solution, ends exclusion spells with the
//! re-entry probability, and summarizes the path after a burn-in.

pub mod paths;

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibration::Calibration;
use crate::error::SovereignDefaultError;
use crate::model::{build_economy, solve_economy, ModelSolution};
use crate::types::{with_metadata, ComputationOutput};
use crate::vfi::economy::Economy;
use crate::SovereignDefaultResult;

pub use paths::PathPoint;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    /// Total simulated periods, burn-in included.
    #[serde(default = "default_periods")]
    pub periods: usize,
    /// Leading periods dropped before computing moments.
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
    /// Starting composite state. Defaults to the state whose endowment is
    /// closest to 1.
    pub initial_state: Option<usize>,
    /// Return the post-burn-in path alongside the moments.
    #[serde(default)]
    pub include_path: bool,
}

fn default_periods() -> usize {
    10_000
}

fn default_burn_in() -> usize {
    1_000
}

impl Default for SimulationInput {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            burn_in: default_burn_in(),
            seed: None,
            initial_state: None,
            include_path: false,
        }
    }
}

/// Calibration plus simulation settings, as read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub calibration: Calibration,
    #[serde(default)]
    pub simulation: SimulationInput,
}

/// Moments over the post-burn-in sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedMoments {
    pub observations: usize,
    pub defaults: usize,
    /// Default events per 100 periods
    pub default_frequency: f64,
    /// Share of periods spent excluded from credit markets
    pub share_excluded: f64,
    /// Mean of `-a / y` over periods in good standing
    pub mean_debt_to_output: Option<f64>,
    /// Mean of `1/q - (1 + r)` over bonds issued at a positive price
    pub mean_spread: Option<f64>,
    pub spread_std_dev: Option<f64>,
    pub mean_consumption: f64,
    pub consumption_std_dev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub moments: SimulatedMoments,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathPoint>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate an economy that has already been solved.
pub fn simulate(
    economy: &Economy,
    solution: &ModelSolution,
    input: &SimulationInput,
) -> SovereignDefaultResult<SimulationOutput> {
    validate_input(economy, solution, input)?;

    let mut rng = match input.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let initial_state = match input.initial_state {
        Some(s) => s,
        None => central_state(economy),
    };

    let mut path = paths::simulate_path(economy, solution, initial_state, input.periods, &mut rng);
    let kept = path.split_off(input.burn_in);
    let moments = compute_moments(&kept, economy.world_interest_rate());

    info!(
        observations = moments.observations,
        defaults = moments.defaults,
        default_frequency = moments.default_frequency,
        "simulation finished"
    );

    Ok(SimulationOutput {
        moments,
        path: input.include_path.then_some(kept),
    })
}

/// Solve the model for `request.calibration` and simulate it.
pub fn simulate_sovereign_default(
    request: &SimulationRequest,
) -> SovereignDefaultResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let economy = build_economy(&request.calibration)?;
    let solution = solve_economy(&economy, request.calibration.solver)?;
    if !solution.converged() {
        warnings.push(format!(
            "Simulating a non-converged solution ({} sweeps, delta {:e})",
            solution.iterations, solution.last_delta
        ));
    }

    let output = simulate(&economy, &solution, &request.simulation)?;
    if output.moments.mean_spread.is_none() {
        warnings.push("No bonds were issued at a positive price after burn-in".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sovereign default model, simulated moments",
        &serde_json::json!({
            "mode": request.calibration.mode,
            "periods": request.simulation.periods,
            "burn_in": request.simulation.burn_in,
            "seed": request.simulation.seed,
            "solver_iterations": solution.iterations,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_input(
    economy: &Economy,
    solution: &ModelSolution,
    input: &SimulationInput,
) -> SovereignDefaultResult<()> {
    if input.periods == 0 {
        return Err(SovereignDefaultError::config(
            "simulation.periods",
            "must be positive",
        ));
    }
    if input.burn_in >= input.periods {
        return Err(SovereignDefaultError::config(
            "simulation.burn_in",
            "must be smaller than simulation.periods",
        ));
    }
    if let Some(s) = input.initial_state {
        if s >= economy.states() {
            return Err(SovereignDefaultError::config(
                "simulation.initial_state",
                format!("state {s} out of range (economy has {})", economy.states()),
            ));
        }
    }
    if solution.states() != economy.states() || solution.debt_points() != economy.debt_points() {
        return Err(SovereignDefaultError::config(
            "solution",
            "does not belong to this economy",
        ));
    }
    Ok(())
}

fn central_state(economy: &Economy) -> usize {
    economy
        .endowments()
        .iter()
        .enumerate()
        .min_by(|a, b| (a.1 - 1.0).abs().total_cmp(&(b.1 - 1.0).abs()))
        .map(|(s, _)| s)
        .unwrap_or(0)
}

fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

fn compute_moments(path: &[PathPoint], world_rate: f64) -> SimulatedMoments {
    let n = path.len();
    let defaults = path.iter().filter(|p| p.defaulted).count();
    let excluded = path.iter().filter(|p| p.excluded).count();

    let debt_to_output: Vec<f64> = path
        .iter()
        .filter(|p| !p.excluded)
        .map(|p| -p.assets / p.endowment)
        .collect();

    // Spreads only on bonds actually issued
    let spreads: Vec<f64> = path
        .iter()
        .filter(|p| p.next_assets.is_some_and(|a| a < 0.0))
        .filter_map(|p| p.price)
        .filter(|&q| q > 0.0)
        .map(|q| 1.0 / q - (1.0 + world_rate))
        .collect();

    let consumption: Vec<f64> = path.iter().map(|p| p.consumption).collect();
    let (mean_consumption, consumption_std_dev) = mean_and_std(&consumption).unwrap_or((0.0, 0.0));
    let spread_stats = mean_and_std(&spreads);

    SimulatedMoments {
        observations: n,
        defaults,
        default_frequency: if n > 0 {
            100.0 * defaults as f64 / n as f64
        } else {
            0.0
        },
        share_excluded: if n > 0 { excluded as f64 / n as f64 } else { 0.0 },
        mean_debt_to_output: mean_and_std(&debt_to_output).map(|(m, _)| m),
        mean_spread: spread_stats.map(|(m, _)| m),
        spread_std_dev: spread_stats.map(|(_, s)| s),
        mean_consumption,
        consumption_std_dev,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{DebtGridSpec, LenderSpec, ShockMode, ShockProcess};
    use crate::vfi::solver::SolverOptions;

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
                points: 11,
            },
            mode: ShockMode::Transitory,
            trend_shock: ShockProcess {
                mean: 0.0,
                persistence: 0.5,
                volatility: 0.01,
                span: 2.0,
                points: 1,
            },
            transitory_shock: ShockProcess {
                mean: 0.0,
                persistence: 0.9,
                volatility: 0.03,
                span: 2.0,
                points: 5,
            },
            lender: LenderSpec::RiskNeutral,
            solver: SolverOptions::default(),
        }
    }

    fn request(seed: u64) -> SimulationRequest {
        SimulationRequest {
            calibration: calibration(),
            simulation: SimulationInput {
                periods: 600,
                burn_in: 100,
                seed: Some(seed),
                initial_state: None,
                include_path: true,
            },
        }
    }

    #[test]
    fn test_same_seed_same_moments() {
        let a = simulate_sovereign_default(&request(42)).unwrap();
        let b = simulate_sovereign_default(&request(42)).unwrap();
        assert_eq!(a.result.path, b.result.path);
        assert_eq!(a.result.moments.defaults, b.result.moments.defaults);
        assert_eq!(
            a.result.moments.mean_consumption,
            b.result.moments.mean_consumption
        );
    }

    #[test]
    fn test_moments_are_consistent_with_path() {
        let out = simulate_sovereign_default(&request(7)).unwrap().result;
        let path = out.path.unwrap();
        assert_eq!(path.len(), 500);
        assert_eq!(out.moments.observations, 500);
        assert_eq!(path[0].period, 100);
        let defaults = path.iter().filter(|p| p.defaulted).count();
        assert_eq!(out.moments.defaults, defaults);
        assert!((0.0..=1.0).contains(&out.moments.share_excluded));
        assert!(path.iter().all(|p| p.consumption > 0.0));
        if let Some(spread) = out.moments.mean_spread {
            assert!(spread >= -1e-12);
        }
    }

    #[test]
    fn test_burn_in_must_leave_observations() {
        let mut req = request(1);
        req.simulation.burn_in = req.simulation.periods;
        match simulate_sovereign_default(&req).unwrap_err() {
            SovereignDefaultError::InvalidConfiguration { field, .. } => {
                assert_eq!(field, "simulation.burn_in")
            }
            other => panic!("Expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_initial_state_out_of_range() {
        let mut req = request(1);
        req.simulation.initial_state = Some(99);
        assert!(simulate_sovereign_default(&req).is_err());
    }

    #[test]
    fn test_path_omitted_unless_requested() {
        let mut req = request(3);
        req.simulation.include_path = false;
        let out = simulate_sovereign_default(&req).unwrap().result;
        assert!(out.path.is_none());
    }

    #[test]
    fn test_moment_helpers() {
        assert_eq!(mean_and_std(&[]), None);
        let (m, s) = mean_and_std(&[1.0, 3.0]).unwrap();
        assert!((m - 2.0).abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-12);
    }
}
