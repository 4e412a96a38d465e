//! Finite-state Markov chain for a single exogenous shock.
//!
//! Matrices are stored row-stochastic: `transition[i][j]` is the probability
//! of moving to grid point `j` next period given grid point `i` today.

use serde::Serialize;

use crate::error::SovereignDefaultError;
use crate::SovereignDefaultResult;

/// Maximum tolerated deviation of a row (or column) sum from one.
pub const STOCHASTIC_TOLERANCE: f64 = 1e-8;

/// A validated grid + transition matrix pair for one shock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkovChain {
    name: String,
    grid: Vec<f64>,
    transition: Vec<Vec<f64>>,
}

impl MarkovChain {
    /// Build a chain from a row-stochastic matrix.
    pub fn new(
        name: &str,
        grid: Vec<f64>,
        transition: Vec<Vec<f64>>,
    ) -> SovereignDefaultResult<Self> {
        validate_grid(name, &grid)?;
        validate_stochastic(name, grid.len(), &transition, "row")?;
        Ok(Self {
            name: name.to_string(),
            grid,
            transition,
        })
    }

    /// Build a chain from a column-stochastic matrix, where `columns[i][j]`
    /// is the probability of moving to `i` given `j`. The columns are
    /// validated before the matrix is transposed into row form.
    pub fn from_column_stochastic(
        name: &str,
        grid: Vec<f64>,
        matrix: Vec<Vec<f64>>,
    ) -> SovereignDefaultResult<Self> {
        validate_grid(name, &grid)?;
        validate_square(name, grid.len(), &matrix)?;
        let n = grid.len();
        let transposed: Vec<Vec<f64>> = (0..n)
            .map(|j| (0..n).map(|i| matrix[i][j]).collect())
            .collect();
        validate_stochastic(name, n, &transposed, "column")?;
        Ok(Self {
            name: name.to_string(),
            grid,
            transition: transposed,
        })
    }

    /// A one-point chain that always stays at `value`.
    pub fn degenerate(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            grid: vec![value],
            transition: vec![vec![1.0]],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn transition(&self) -> &[Vec<f64>] {
        &self.transition
    }

    /// Probability of moving from grid point `from` to grid point `to`.
    #[inline]
    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.transition[from][to]
    }

    /// Largest deviation of any row sum from one.
    pub fn max_row_error(&self) -> f64 {
        self.transition
            .iter()
            .map(|row| (row.iter().sum::<f64>() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_grid(name: &str, grid: &[f64]) -> SovereignDefaultResult<()> {
    if grid.is_empty() {
        return Err(SovereignDefaultError::transition(
            name,
            "grid must contain at least one point",
        ));
    }
    if let Some(bad) = grid.iter().find(|v| !v.is_finite()) {
        return Err(SovereignDefaultError::transition(
            name,
            format!("grid contains a non-finite value ({bad})"),
        ));
    }
    Ok(())
}

fn validate_square(name: &str, n: usize, matrix: &[Vec<f64>]) -> SovereignDefaultResult<()> {
    if matrix.len() != n {
        return Err(SovereignDefaultError::transition(
            name,
            format!("expected {n} rows to match the grid, got {}", matrix.len()),
        ));
    }
    for (i, row) in matrix.iter().enumerate() {
        if row.len() != n {
            return Err(SovereignDefaultError::transition(
                name,
                format!("row {i} has {} entries, expected {n}", row.len()),
            ));
        }
    }
    Ok(())
}

/// Check that `matrix` is square of size `n`, non-negative, and that each of
/// its rows sums to one. `axis` names the axis in the caller's convention for
/// error messages.
fn validate_stochastic(
    name: &str,
    n: usize,
    matrix: &[Vec<f64>],
    axis: &str,
) -> SovereignDefaultResult<()> {
    validate_square(name, n, matrix)?;
    for (i, row) in matrix.iter().enumerate() {
        for (j, &p) in row.iter().enumerate() {
            if !p.is_finite() || p < 0.0 {
                return Err(SovereignDefaultError::transition(
                    name,
                    format!("entry ({i}, {j}) = {p} is not a probability"),
                ));
            }
        }
        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > STOCHASTIC_TOLERANCE {
            return Err(SovereignDefaultError::transition(
                name,
                format!("{axis} {i} sums to {sum}, expected 1"),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state() -> MarkovChain {
        MarkovChain::new("z", vec![-0.1, 0.1], vec![vec![0.9, 0.1], vec![0.2, 0.8]]).unwrap()
    }

    #[test]
    fn test_valid_chain_accessors() {
        let chain = two_state();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.name(), "z");
        assert_eq!(chain.probability(1, 0), 0.2);
        assert!(chain.max_row_error() < STOCHASTIC_TOLERANCE);
    }

    #[test]
    fn test_degenerate_chain() {
        let chain = MarkovChain::degenerate("g", 0.006);
        assert_eq!(chain.grid(), &[0.006]);
        assert_eq!(chain.probability(0, 0), 1.0);
    }

    #[test]
    fn test_rows_not_summing_to_one_rejected() {
        let err = MarkovChain::new("z", vec![0.0, 1.0], vec![vec![0.5, 0.49], vec![0.5, 0.5]])
            .unwrap_err();
        match err {
            SovereignDefaultError::InvalidTransitionMatrix { shock, reason } => {
                assert_eq!(shock, "z");
                assert!(reason.contains("row 0"), "unexpected reason: {reason}");
            }
            other => panic!("Expected InvalidTransitionMatrix, got {other:?}"),
        }
    }

    #[test]
    fn test_columns_summing_to_099_rejected() {
        // Column convention: each column should sum to one; column 1 sums to 0.99.
        let matrix = vec![vec![0.7, 0.49], vec![0.3, 0.5]];
        let err = MarkovChain::from_column_stochastic("g", vec![0.0, 1.0], matrix).unwrap_err();
        match err {
            SovereignDefaultError::InvalidTransitionMatrix { reason, .. } => {
                assert!(reason.contains("column 1"), "unexpected reason: {reason}");
            }
            other => panic!("Expected InvalidTransitionMatrix, got {other:?}"),
        }
    }

    #[test]
    fn test_column_stochastic_is_transposed() {
        let matrix = vec![vec![0.7, 0.4], vec![0.3, 0.6]];
        let chain = MarkovChain::from_column_stochastic("g", vec![0.0, 1.0], matrix).unwrap();
        // Pr(next = 1 | current = 0) is entry (1, 0) of the column matrix.
        assert_eq!(chain.probability(0, 1), 0.3);
        assert_eq!(chain.probability(1, 0), 0.4);
    }

    #[test]
    fn test_negative_entry_rejected() {
        let err = MarkovChain::new("z", vec![0.0, 1.0], vec![vec![1.1, -0.1], vec![0.5, 0.5]])
            .unwrap_err();
        assert!(matches!(
            err,
            SovereignDefaultError::InvalidTransitionMatrix { .. }
        ));
    }

    #[test]
    fn test_non_square_rejected() {
        let err = MarkovChain::new("z", vec![0.0, 1.0], vec![vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            SovereignDefaultError::InvalidTransitionMatrix { .. }
        ));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let err = MarkovChain::new("z", vec![], vec![]).unwrap_err();
        assert!(matches!(
            err,
            SovereignDefaultError::InvalidTransitionMatrix { .. }
        ));
    }
}
