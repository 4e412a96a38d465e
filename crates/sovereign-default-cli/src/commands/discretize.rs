use std::time::Instant;

use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sovereign_default_core::calibration::ShockProcess;
use sovereign_default_core::exogenous::tauchen;
use sovereign_default_core::with_metadata;

use crate::input;

/// Arguments for discretizing one shock process
#[derive(Args)]
pub struct DiscretizeArgs {
    /// Path to a JSON or YAML shock process
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscretizeInput {
    #[serde(default = "default_name")]
    name: String,
    #[serde(flatten)]
    process: ShockProcess,
}

fn default_name() -> String {
    "shock".to_string()
}

#[derive(Debug, Serialize)]
struct DiscretizeOutput {
    name: String,
    grid: Vec<f64>,
    transition: Vec<Vec<f64>>,
    max_row_error: f64,
}

pub fn run_discretize(args: DiscretizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request: DiscretizeInput = input::read_input(args.input.as_deref(), "discretize")?;
    let chain = tauchen::discretize(&request.name, &request.process)?;

    let output = DiscretizeOutput {
        name: chain.name().to_string(),
        grid: chain.grid().to_vec(),
        transition: chain.transition().to_vec(),
        max_row_error: chain.max_row_error(),
    };
    let result = with_metadata(
        "Tauchen discretization of a Gaussian AR(1) process",
        &request.process,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        output,
    );
    Ok(serde_json::to_value(result)?)
}
