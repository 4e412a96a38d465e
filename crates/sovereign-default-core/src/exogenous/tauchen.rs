//! Tauchen (1986) discretization of a Gaussian AR(1) process
//!
//!   x' = (1 - ρ) μ + ρ x + σ ε,   ε ~ N(0, 1)
//!
//! onto an evenly spaced grid spanning `span` unconditional standard
//! deviations either side of the mean.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::calibration::ShockProcess;
use crate::error::SovereignDefaultError;
use crate::exogenous::markov_chain::MarkovChain;
use crate::SovereignDefaultResult;

/// Discretize `process` into a validated Markov chain named `name`.
pub fn discretize(name: &str, process: &ShockProcess) -> SovereignDefaultResult<MarkovChain> {
    process.validate(name)?;

    let n = process.points;
    if n == 1 {
        return Ok(MarkovChain::degenerate(name, process.mean));
    }

    let rho = process.persistence;
    let sigma = process.volatility;
    let unconditional_sd = sigma / (1.0 - rho * rho).sqrt();
    let lower = process.mean - process.span * unconditional_sd;
    let step = 2.0 * process.span * unconditional_sd / (n - 1) as f64;
    let grid: Vec<f64> = (0..n).map(|i| lower + i as f64 * step).collect();

    let std_normal = Normal::new(0.0, 1.0).map_err(|e| {
        SovereignDefaultError::config(name, format!("standard normal unavailable: {e}"))
    })?;
    let cdf = |x: f64| std_normal.cdf(x / sigma);

    let half = step / 2.0;
    let transition: Vec<Vec<f64>> = grid
        .iter()
        .map(|&x| {
            let conditional_mean = (1.0 - rho) * process.mean + rho * x;
            (0..n)
                .map(|j| {
                    let distance = grid[j] - conditional_mean;
                    if j == 0 {
                        cdf(distance + half)
                    } else if j == n - 1 {
                        1.0 - cdf(distance - half)
                    } else {
                        cdf(distance + half) - cdf(distance - half)
                    }
                })
                .collect()
        })
        .collect();

    MarkovChain::new(name, grid, transition)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exogenous::markov_chain::STOCHASTIC_TOLERANCE;

    fn process(points: usize) -> ShockProcess {
        ShockProcess {
            mean: 0.0,
            persistence: 0.9,
            volatility: 0.03,
            span: 3.0,
            points,
        }
    }

    #[test]
    fn test_rows_sum_to_one() {
        let chain = discretize("z", &process(9)).unwrap();
        assert_eq!(chain.len(), 9);
        assert!(chain.max_row_error() < STOCHASTIC_TOLERANCE);
    }

    #[test]
    fn test_grid_symmetric_about_mean() {
        let p = ShockProcess {
            mean: 0.006,
            ..process(7)
        };
        let chain = discretize("g", &p).unwrap();
        let grid = chain.grid();
        for i in 0..grid.len() {
            let mirrored = grid[grid.len() - 1 - i];
            assert!(((grid[i] - 0.006) + (mirrored - 0.006)).abs() < 1e-12);
        }
        assert!((grid[3] - 0.006).abs() < 1e-12);
    }

    #[test]
    fn test_grid_span() {
        let chain = discretize("z", &process(5)).unwrap();
        let sd = 0.03 / (1.0_f64 - 0.81).sqrt();
        assert!((chain.grid()[0] + 3.0 * sd).abs() < 1e-12);
        assert!((chain.grid()[4] - 3.0 * sd).abs() < 1e-12);
    }

    #[test]
    fn test_persistence_concentrates_mass_on_diagonal() {
        let chain = discretize("z", &process(5)).unwrap();
        let middle = &chain.transition()[2];
        let argmax = middle
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(argmax, 2);
    }

    #[test]
    fn test_single_point_is_degenerate() {
        let p = ShockProcess {
            mean: 0.01,
            ..process(1)
        };
        let chain = discretize("g", &p).unwrap();
        assert_eq!(chain.grid(), &[0.01]);
        assert_eq!(chain.probability(0, 0), 1.0);
    }

    #[test]
    fn test_zero_points_rejected() {
        let err = discretize("z", &process(0)).unwrap_err();
        assert!(matches!(
            err,
            SovereignDefaultError::InvalidConfiguration { .. }
        ));
    }
}
