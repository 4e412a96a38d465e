//! Model calibration: preferences, lender, debt grid, and shock processes.
//!
//! A [`Calibration`] deserializes from JSON or YAML and is validated in full
//! before any grid or transition is built. All parameters are per period.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SovereignDefaultError;
use crate::types::{Probability, Rate};
use crate::vfi::solver::SolverOptions;
use crate::SovereignDefaultResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which endowment shocks are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShockMode {
    /// Trend-growth shock only; the transitory shock sits at its mean.
    Permanent,
    /// Transitory shock only; the trend shock sits at its mean.
    Transitory,
    /// Both shocks active.
    #[default]
    Complete,
}

impl ShockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShockMode::Permanent => "permanent",
            ShockMode::Transitory => "transitory",
            ShockMode::Complete => "complete",
        }
    }

    pub fn trend_active(&self) -> bool {
        matches!(self, ShockMode::Permanent | ShockMode::Complete)
    }

    pub fn transitory_active(&self) -> bool {
        matches!(self, ShockMode::Transitory | ShockMode::Complete)
    }
}

impl FromStr for ShockMode {
    type Err = SovereignDefaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permanent" => Ok(ShockMode::Permanent),
            "transitory" => Ok(ShockMode::Transitory),
            "complete" | "both" => Ok(ShockMode::Complete),
            other => Err(SovereignDefaultError::config(
                "mode",
                format!("unknown shock mode '{other}' (expected permanent, transitory or complete)"),
            )),
        }
    }
}

impl TryFrom<String> for ShockMode {
    type Error = SovereignDefaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShockMode> for String {
    fn from(mode: ShockMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ShockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gaussian AR(1) process in logs, discretized onto `points` grid points
/// spanning `span` unconditional standard deviations around `mean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockProcess {
    pub mean: f64,
    pub persistence: f64,
    pub volatility: f64,
    #[serde(default = "default_span")]
    pub span: f64,
    pub points: usize,
}

fn default_span() -> f64 {
    3.0
}

impl ShockProcess {
    /// A process pinned at its mean, used for inactive shocks.
    pub fn collapsed(&self) -> ShockProcess {
        ShockProcess {
            points: 1,
            ..self.clone()
        }
    }

    pub(crate) fn validate(&self, name: &str) -> SovereignDefaultResult<()> {
        let field = |f: &str| format!("{name}.{f}");
        if self.points == 0 {
            return Err(SovereignDefaultError::config(
                &field("points"),
                "grid size must be positive",
            ));
        }
        if !self.mean.is_finite() {
            return Err(SovereignDefaultError::config(&field("mean"), "must be finite"));
        }
        if !(self.persistence.abs() < 1.0) {
            return Err(SovereignDefaultError::config(
                &field("persistence"),
                "must lie strictly inside (-1, 1)",
            ));
        }
        if !(self.volatility >= 0.0 && self.volatility.is_finite()) {
            return Err(SovereignDefaultError::config(
                &field("volatility"),
                "must be finite and non-negative",
            ));
        }
        if self.points > 1 {
            if self.volatility == 0.0 {
                return Err(SovereignDefaultError::config(
                    &field("volatility"),
                    "must be positive when more than one grid point is requested",
                ));
            }
            if !(self.span > 0.0 && self.span.is_finite()) {
                return Err(SovereignDefaultError::config(&field("span"), "must be positive"));
            }
        }
        Ok(())
    }
}

/// Bounds and size of the debt (asset) grid. Asset positions are `<= 0`;
/// negative values are debt owed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtGridSpec {
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    pub points: usize,
}

impl DebtGridSpec {
    /// Build the grid ordered by debt owed, ascending: index 0 holds `max`
    /// (least debt), the last index holds `min`.
    pub fn build(&self) -> SovereignDefaultResult<Vec<f64>> {
        self.validate()?;
        if self.points == 1 {
            return Ok(vec![self.max]);
        }
        let step = (self.max - self.min) / (self.points - 1) as f64;
        let mut grid: Vec<f64> = (0..self.points)
            .map(|i| self.max - i as f64 * step)
            .collect();
        grid[self.points - 1] = self.min;
        Ok(grid)
    }

    fn validate(&self) -> SovereignDefaultResult<()> {
        if self.points == 0 {
            return Err(SovereignDefaultError::config(
                "debt_grid.points",
                "grid size must be positive",
            ));
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(SovereignDefaultError::config(
                "debt_grid",
                "bounds must be finite",
            ));
        }
        if self.max > 0.0 {
            return Err(SovereignDefaultError::config(
                "debt_grid.max",
                "positive asset positions (savings) are not modeled",
            ));
        }
        if self.min > self.max || (self.points > 1 && self.min == self.max) {
            return Err(SovereignDefaultError::config(
                "debt_grid.min",
                "must lie strictly below debt_grid.max",
            ));
        }
        Ok(())
    }
}

/// International lender.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LenderSpec {
    /// Discounts at the world interest rate.
    #[default]
    RiskNeutral,
    /// Discounts with a precomputed stochastic discount factor over the
    /// lender's long-run-risk state. `discount_factors[x][x']` is the
    /// factor applied to payoffs in `x'` given `x` today.
    RiskAverse {
        long_run_risk: ShockProcess,
        discount_factors: Vec<Vec<f64>>,
    },
}

/// Full model calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// CRRA curvature γ (> 0, ≠ 1)
    pub risk_aversion: f64,
    /// Borrower discount factor β
    pub discount_factor: f64,
    /// World risk-free rate r
    pub world_interest_rate: Rate,
    /// Output loss in autarky δ
    pub autarky_penalty: f64,
    /// Per-period probability of re-entering credit markets λ
    pub reentry_probability: Probability,
    pub debt_grid: DebtGridSpec,
    #[serde(default)]
    pub mode: ShockMode,
    /// Trend growth shock g
    pub trend_shock: ShockProcess,
    /// Transitory output shock z
    pub transitory_shock: ShockProcess,
    #[serde(default)]
    pub lender: LenderSpec,
    #[serde(default)]
    pub solver: SolverOptions,
}

impl Calibration {
    /// Trend process after applying the shock mode.
    pub fn effective_trend(&self) -> ShockProcess {
        if self.mode.trend_active() {
            self.trend_shock.clone()
        } else {
            self.trend_shock.collapsed()
        }
    }

    /// Transitory process after applying the shock mode.
    pub fn effective_transitory(&self) -> ShockProcess {
        if self.mode.transitory_active() {
            self.transitory_shock.clone()
        } else {
            self.transitory_shock.collapsed()
        }
    }

    pub fn validate(&self) -> SovereignDefaultResult<()> {
        validate_preferences(
            self.risk_aversion,
            self.discount_factor,
            self.world_interest_rate,
            self.autarky_penalty,
            self.reentry_probability,
        )?;
        self.debt_grid.validate()?;
        self.effective_trend().validate("trend_shock")?;
        self.effective_transitory().validate("transitory_shock")?;
        self.solver.validate()?;

        if let LenderSpec::RiskAverse {
            long_run_risk,
            discount_factors,
        } = &self.lender
        {
            long_run_risk.validate("lender.long_run_risk")?;
            let n = long_run_risk.points;
            if discount_factors.len() != n || discount_factors.iter().any(|row| row.len() != n) {
                return Err(SovereignDefaultError::config(
                    "lender.discount_factors",
                    format!("expected a {n}x{n} table matching the long-run-risk grid"),
                ));
            }
            if discount_factors
                .iter()
                .flatten()
                .any(|m| !m.is_finite() || *m < 0.0)
            {
                return Err(SovereignDefaultError::config(
                    "lender.discount_factors",
                    "entries must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// Checks shared by every entry point that takes raw preference parameters.
pub(crate) fn validate_preferences(
    gamma: f64,
    beta: f64,
    r: f64,
    delta: f64,
    lambda: f64,
) -> SovereignDefaultResult<()> {
    if !(gamma > 0.0 && gamma.is_finite()) {
        return Err(SovereignDefaultError::config(
            "risk_aversion",
            "must be positive",
        ));
    }
    if (gamma - 1.0).abs() < 1e-12 {
        return Err(SovereignDefaultError::config(
            "risk_aversion",
            "γ = 1 (log utility) is not supported by the CRRA kernel",
        ));
    }
    if !(beta > 0.0 && beta < 1.0) {
        return Err(SovereignDefaultError::config(
            "discount_factor",
            "must lie in (0, 1)",
        ));
    }
    if !(r > -1.0 && r.is_finite()) {
        return Err(SovereignDefaultError::config(
            "world_interest_rate",
            "must be greater than -100%",
        ));
    }
    if !(0.0..1.0).contains(&delta) {
        return Err(SovereignDefaultError::config(
            "autarky_penalty",
            "must lie in [0, 1)",
        ));
    }
    if !(0.0..=1.0).contains(&lambda) {
        return Err(SovereignDefaultError::config(
            "reentry_probability",
            "must lie in [0, 1]",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
