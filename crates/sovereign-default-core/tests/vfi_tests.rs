use pretty_assertions::assert_eq;
use sovereign_default_core::exogenous::{JointTransition, MarkovChain};
use sovereign_default_core::pricing::RiskNeutralLender;
use sovereign_default_core::vfi::{BellmanSolver, Economy, Preferences, SolverOptions};
use sovereign_default_core::SovereignDefaultError;

// ===========================================================================
// Helpers
// ===========================================================================

fn preferences() -> Preferences {
    Preferences {
        risk_aversion: 2.0,
        discount_factor: 0.8,
        autarky_penalty: 0.02,
        reentry_probability: 0.1,
    }
}

fn single_state(debt_grid: Vec<f64>) -> Economy {
    Economy::new(
        preferences(),
        0.01,
        debt_grid,
        MarkovChain::degenerate("g", 0.0),
        MarkovChain::degenerate("z", 0.0),
        None,
        Box::new(RiskNeutralLender::new(0.01).unwrap()),
    )
    .unwrap()
}

fn two_by_two() -> Economy {
    let g = MarkovChain::new("g", vec![-0.01, 0.01], vec![vec![0.7, 0.3], vec![0.4, 0.6]])
        .unwrap();
    let z = MarkovChain::new("z", vec![-0.06, 0.06], vec![vec![0.9, 0.1], vec![0.2, 0.8]])
        .unwrap();
    let grid: Vec<f64> = (0..21).map(|i| -0.02 * i as f64).collect();
    Economy::new(
        preferences(),
        0.01,
        grid,
        g,
        z,
        None,
        Box::new(RiskNeutralLender::new(0.01).unwrap()),
    )
    .unwrap()
}

// ===========================================================================
// Convergence
// ===========================================================================

#[test]
fn test_single_state_scenario_converges_without_default() {
    let economy = single_state(vec![0.0, -0.05, -0.1, -0.15, -0.2]);
    let result = BellmanSolver::new(&economy, SolverOptions::default())
        .unwrap()
        .run()
        .unwrap();

    assert!(result.converged());
    assert!(result.last_delta < 1e-6);
    assert!(result.snapshot.default.flags().iter().all(|&d| !d));
    for &q in result.snapshot.price.values() {
        assert!((q - 1.0 / 1.01).abs() < 1e-12);
    }
}

#[test]
fn test_good_value_non_increasing_in_debt() {
    let economy = two_by_two();
    let result = BellmanSolver::new(&economy, SolverOptions::default())
        .unwrap()
        .run()
        .unwrap();
    for s in 0..economy.states() {
        let row = result.snapshot.good.row(s);
        for pair in row.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9, "state {s}: {pair:?}");
        }
    }
}

#[test]
fn test_default_region_is_a_debt_threshold() {
    let economy = two_by_two();
    let result = BellmanSolver::new(&economy, SolverOptions::default())
        .unwrap()
        .run()
        .unwrap();
    for s in 0..economy.states() {
        let row = result.snapshot.default.row(s);
        if let Some(first) = row.iter().position(|&d| d) {
            assert!(row[first..].iter().all(|&d| d), "state {s}: {row:?}");
        }
    }
}

#[test]
fn test_prices_bounded_by_risk_free() {
    let economy = two_by_two();
    let result = BellmanSolver::new(&economy, SolverOptions::default())
        .unwrap()
        .run()
        .unwrap();
    let ceiling = 1.0 / 1.01;
    for &q in result.snapshot.price.values() {
        assert!((0.0..=ceiling + 1e-12).contains(&q));
    }
}

// ===========================================================================
// Policy
// ===========================================================================

#[test]
fn test_policy_attains_good_value() {
    let economy = two_by_two();
    let result = BellmanSolver::new(&economy, SolverOptions::default())
        .unwrap()
        .run()
        .unwrap();
    let policy = result.policy(&economy).unwrap();
    let utility = result.utility_surface(&economy);
    let beta = economy.preferences().discount_factor;

    for s in 0..economy.states() {
        for a in 0..economy.debt_points() {
            let next = policy.get(s, a);
            let value = utility.at(s, a, next) + beta * result.continuation.get(s, next);
            assert!((value - result.snapshot.good.get(s, a)).abs() < 1e-12);
        }
    }
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn test_infeasible_debt_level_is_calibration_error() {
    // Defaulting at -10 after the first sweep shuts the market at that level,
    // leaving no a' with positive consumption there.
    let economy = single_state(vec![0.0, -5.0, -10.0]);
    let err = BellmanSolver::new(&economy, SolverOptions::default())
        .unwrap()
        .run()
        .unwrap_err();
    match err {
        SovereignDefaultError::CalibrationError(msg) => {
            assert!(msg.contains("state 0"), "{msg}");
        }
        other => panic!("Expected CalibrationError, got {other:?}"),
    }
}

#[test]
fn test_column_sums_off_by_one_percent_rejected() {
    let err = MarkovChain::from_column_stochastic(
        "z",
        vec![-0.1, 0.1],
        vec![vec![0.5, 0.49], vec![0.5, 0.5]],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SovereignDefaultError::InvalidTransitionMatrix { .. }
    ));
}

// ===========================================================================
// Composite ordering
// ===========================================================================

#[test]
fn test_joint_transition_first_shock_fastest() {
    let g = MarkovChain::new("g", vec![0.0, 0.1], vec![vec![0.6, 0.4], vec![0.1, 0.9]])
        .unwrap();
    let z = MarkovChain::new(
        "z",
        vec![-0.1, 0.0, 0.1],
        vec![
            vec![0.5, 0.3, 0.2],
            vec![0.2, 0.6, 0.2],
            vec![0.1, 0.2, 0.7],
        ],
    )
    .unwrap();
    let joint = JointTransition::compose(&[&g, &z]).unwrap();
    assert_eq!(joint.len(), 6);

    for from in 0..6 {
        for to in 0..6 {
            let (ig, iz) = (from % 2, from / 2);
            let (jg, jz) = (to % 2, to / 2);
            let expected = g.probability(ig, jg) * z.probability(iz, jz);
            assert!((joint.probability(from, to) - expected).abs() < 1e-15);
        }
    }
    assert!(joint.max_row_error() < 1e-12);
}
