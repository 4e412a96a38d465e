use thiserror::Error;

#[derive(Debug, Error)]
pub enum SovereignDefaultError {
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Invalid transition matrix for {shock}: {reason}")]
    InvalidTransitionMatrix { shock: String, reason: String },

    #[error("Calibration error: {0}")]
    CalibrationError(String),

    #[error("Non-convergence: value function iteration stopped after {iterations} sweeps (delta: {last_delta:e})")]
    NonConvergence { iterations: u32, last_delta: f64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SovereignDefaultError {
    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        SovereignDefaultError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transition(shock: &str, reason: impl Into<String>) -> Self {
        SovereignDefaultError::InvalidTransitionMatrix {
            shock: shock.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SovereignDefaultError {
    fn from(e: serde_json::Error) -> Self {
        SovereignDefaultError::SerializationError(e.to_string())
    }
}
